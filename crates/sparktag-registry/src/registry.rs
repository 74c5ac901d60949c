//! Tag registry - creation-ordered collection of live tags
//!
//! Tags live in an insertion-ordered map keyed by [`TagId`]. Position in the
//! map is the stable index handed to encoders: index 0 is the oldest live
//! tag, and indices only shift when a tag is deleted.

use std::fmt;

use indexmap::IndexMap;
use sparktag_core::{Alias, Fit, Snapshot, TagError, TagId, TagResult, Timestamp};
use sparktag_tag::{Tag, TagDefinition};
use tracing::debug;

use crate::{RegistryConfig, TimestampSource};

/// The set of live tags
///
/// Callbacks fired from [`TagRegistry::read_all`] and
/// [`TagRegistry::write`] run while the registry is mutably borrowed; they
/// may inspect the tag they are given but must not reach back into the
/// registry.
pub struct TagRegistry {
    tags: IndexMap<TagId, Tag>,
    next_id: TagId,
    config: RegistryConfig,
    clock: Option<Box<dyn TimestampSource>>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        TagRegistry {
            tags: IndexMap::new(),
            next_id: TagId::new(1),
            config,
            clock: None,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Install the source of bulk-read timestamps
    pub fn set_timestamp_source(&mut self, source: impl TimestampSource + 'static) {
        self.clock = Some(Box::new(source));
    }

    /// Current tick, or [`Timestamp::NEVER`] without a source
    pub fn now(&mut self) -> Timestamp {
        self.clock
            .as_mut()
            .map_or(Timestamp::NEVER, |clock| clock.now())
    }

    /// Create and register a tag
    ///
    /// A requested alias that a live tag already holds is silently replaced
    /// by [`next_alias`](Self::next_alias). Nothing is registered if buffer
    /// allocation or host validation fails.
    pub fn create(&mut self, definition: TagDefinition) -> TagResult<TagId> {
        let requested = definition.alias;
        let alias = if self.alias_in_use(requested) {
            let assigned = self.next_alias();
            debug!(
                tag = %definition.name,
                requested,
                assigned,
                "alias in use, reassigned"
            );
            assigned
        } else {
            requested
        };

        let tag = Tag::allocate(definition, alias)?;
        let id = self.next_id;
        self.next_id = id.next();

        debug!(
            %id,
            tag = tag.name(),
            alias,
            datatype = %tag.datatype(),
            capacity = tag.capacity(),
            "tag created"
        );
        self.tags.insert(id, tag);
        Ok(id)
    }

    /// Remove a tag and release its buffers
    ///
    /// Tags created after it move down one index.
    pub fn delete(&mut self, id: TagId) -> TagResult<()> {
        let tag = self.tags.shift_remove(&id).ok_or(TagError::UnknownTag(id))?;
        debug!(%id, tag = tag.name(), alias = tag.alias(), "tag deleted");
        tag.release()
    }

    /// Number of live tags
    #[inline]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn contains(&self, id: TagId) -> bool {
        self.tags.contains_key(&id)
    }

    pub fn get(&self, id: TagId) -> Option<&Tag> {
        self.tags.get(&id)
    }

    pub fn get_mut(&mut self, id: TagId) -> Option<&mut Tag> {
        self.tags.get_mut(&id)
    }

    /// Tag at a stable index, `0..len()` in creation order
    pub fn get_by_index(&self, index: usize) -> Option<&Tag> {
        self.tags.get_index(index).map(|(_, tag)| tag)
    }

    pub fn get_by_index_mut(&mut self, index: usize) -> Option<&mut Tag> {
        self.tags.get_index_mut(index).map(|(_, tag)| tag)
    }

    /// Handle of the tag at `index`
    pub fn id_at(&self, index: usize) -> Option<TagId> {
        self.tags.get_index(index).map(|(id, _)| *id)
    }

    /// Current index of a tag
    pub fn index_of(&self, id: TagId) -> Option<usize> {
        self.tags.get_index_of(&id)
    }

    /// First tag, in creation order, accepted by `matcher`
    pub fn find(&self, mut matcher: impl FnMut(&Tag) -> bool) -> Option<TagId> {
        self.tags
            .iter()
            .find(|(_, tag)| matcher(tag))
            .map(|(id, _)| *id)
    }

    /// First tag with this name; names need not be unique
    pub fn find_by_name(&self, name: &str) -> Option<TagId> {
        self.find(|tag| tag.name() == name)
    }

    pub fn find_by_alias(&self, alias: Alias) -> Option<TagId> {
        self.find(|tag| tag.alias() == alias)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Tag> {
        self.find_by_name(name).and_then(|id| self.get(id))
    }

    pub fn get_by_alias(&self, alias: Alias) -> Option<&Tag> {
        self.find_by_alias(alias).and_then(|id| self.get(id))
    }

    /// Live tags with their handles, in creation order
    pub fn iter(&self) -> impl Iterator<Item = (TagId, &Tag)> {
        self.tags.iter().map(|(id, tag)| (*id, tag))
    }

    /// Live tags in creation order
    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values()
    }

    /// Tags whose last read detected a change
    pub fn changed_tags(&self) -> impl Iterator<Item = &Tag> {
        self.tags.values().filter(|tag| tag.changed())
    }

    /// Call `f` on every tag in creation order
    pub fn for_each(&self, f: impl FnMut(&Tag)) {
        self.tags.values().for_each(f);
    }

    /// Whether a live tag holds `alias`
    pub fn alias_in_use(&self, alias: Alias) -> bool {
        self.tags.values().any(|tag| tag.alias() == alias)
    }

    /// One past the highest alias in use, or the configured first alias
    /// when no tag is live
    pub fn next_alias(&self) -> Alias {
        let highest = self.tags.values().map(Tag::alias).max();
        match highest {
            None => self.config.first_auto_alias,
            Some(max) => match max.checked_add(1) {
                Some(next) => next,
                // Alias space exhausted at the top; take the lowest free one
                None => (self.config.first_auto_alias..=Alias::MAX)
                    .find(|&a| !self.alias_in_use(a))
                    .unwrap_or(self.config.first_auto_alias),
            },
        }
    }

    /// Read one tag at the current tick
    pub fn read(&mut self, id: TagId) -> TagResult<bool> {
        let timestamp = self.now();
        let tag = self.tags.get_mut(&id).ok_or(TagError::UnknownTag(id))?;
        Ok(tag.read(timestamp))
    }

    /// Read every tag at the current tick
    ///
    /// See [`read_all_at`](Self::read_all_at).
    pub fn read_all(&mut self) -> bool {
        let timestamp = self.now();
        self.read_all_at(timestamp)
    }

    /// Read every tag, in index order, with a shared timestamp
    ///
    /// Returns true if any tag at or above the publish threshold changed.
    /// Tags below the threshold are still read and flagged individually.
    pub fn read_all_at(&mut self, timestamp: Timestamp) -> bool {
        let mut any_changed = false;
        for tag in self.tags.values_mut() {
            if tag.read(timestamp) && self.config.publishes(tag.alias()) {
                any_changed = true;
            }
        }
        any_changed
    }

    /// Write through a tag to its host variable
    pub fn write(&mut self, id: TagId, value: &Snapshot) -> TagResult<Fit> {
        self.tags
            .get_mut(&id)
            .ok_or(TagError::UnknownTag(id))?
            .write(value)
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TagRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagRegistry")
            .field("tags", &self.tags.len())
            .field("next_id", &self.next_id)
            .field("config", &self.config)
            .field("clock", &self.clock.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use proptest::prelude::*;
    use sparktag_core::{DataType, Value};
    use sparktag_tag::{Access, HostCell, HostText};

    use super::*;
    use crate::ManualClock;

    fn int_tag(name: &str, alias: Alias) -> TagDefinition {
        TagDefinition::int32(name, HostCell::new(0)).alias(alias)
    }

    #[test]
    fn test_alias_collision_reassigns() {
        let mut registry = TagRegistry::new();
        let a = registry.create(int_tag("a", 5)).unwrap();
        let b = registry.create(int_tag("b", 5)).unwrap();
        let c = registry.create(int_tag("c", 5)).unwrap();

        assert_eq!(registry.get(a).unwrap().alias(), 5);
        assert_eq!(registry.get(b).unwrap().alias(), 6);
        assert_eq!(registry.get(c).unwrap().alias(), 7);
    }

    #[test]
    fn test_next_alias() {
        let mut registry = TagRegistry::new();
        assert_eq!(registry.next_alias(), 1);
        registry.create(int_tag("a", 40)).unwrap();
        registry.create(int_tag("b", -3)).unwrap();
        assert_eq!(registry.next_alias(), 41);
        assert!(registry.alias_in_use(-3));
        assert!(!registry.alias_in_use(41));
    }

    #[test]
    fn test_alias_exhaustion_picks_free() {
        let mut registry = TagRegistry::new();
        registry.create(int_tag("top", Alias::MAX)).unwrap();
        let id = registry.create(int_tag("dup", Alias::MAX)).unwrap();
        assert_eq!(registry.get(id).unwrap().alias(), 1);
    }

    #[test]
    fn test_failed_create_registers_nothing() {
        let mut registry = TagRegistry::new();
        let def = TagDefinition::new("bad", DataType::String).bind(HostCell::new(1u8));
        assert!(matches!(
            registry.create(def),
            Err(TagError::TypeMismatch { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_index_order_and_delete() {
        let mut registry = TagRegistry::new();
        let ids: Vec<_> = (0..4)
            .map(|i| registry.create(int_tag(&format!("t{i}"), i)).unwrap())
            .collect();

        assert_eq!(registry.get_by_index(0).unwrap().name(), "t0");
        assert_eq!(registry.get_by_index(3).unwrap().name(), "t3");
        assert!(registry.get_by_index(4).is_none());

        registry.delete(ids[1]).unwrap();
        assert_eq!(registry.len(), 3);
        let names: Vec<_> = registry.tags().map(|t| t.name().to_owned()).collect();
        assert_eq!(names, ["t0", "t2", "t3"]);
        assert_eq!(registry.index_of(ids[3]), Some(2));
        assert_eq!(registry.id_at(1), Some(ids[2]));

        assert_eq!(registry.delete(ids[1]), Err(TagError::UnknownTag(ids[1])));
    }

    #[test]
    fn test_lookup() {
        let mut registry = TagRegistry::new();
        let first = registry.create(int_tag("pump", 10)).unwrap();
        let _second = registry.create(int_tag("pump", 11)).unwrap();
        let valve = registry.create(int_tag("valve", 12)).unwrap();

        // First match wins for duplicate names
        assert_eq!(registry.find_by_name("pump"), Some(first));
        assert_eq!(registry.find_by_alias(12), Some(valve));
        assert_eq!(registry.get_by_alias(11).unwrap().name(), "pump");
        assert!(registry.get_by_name("missing").is_none());

        let threshold = 10;
        let found = registry.find(|tag| tag.alias() > threshold);
        assert_eq!(found, registry.id_at(1));
    }

    #[test]
    fn test_read_all_threshold() {
        let mut registry = TagRegistry::new();
        let housekeeping = HostCell::new(0i32);
        let process = HostCell::new(0i32);
        registry
            .create(TagDefinition::int32("uptime", housekeeping.clone()).alias(-1))
            .unwrap();
        registry
            .create(TagDefinition::int32("level", process.clone()).alias(1))
            .unwrap();

        assert!(registry.read_all_at(Timestamp(100)));
        assert!(!registry.read_all_at(Timestamp(200)));

        housekeeping.set(1);
        assert!(!registry.read_all_at(Timestamp(300)));
        // Still read and flagged individually
        let uptime = registry.get_by_name("uptime").unwrap();
        assert!(uptime.changed());
        assert_eq!(uptime.current().value, Value::Int32(1));

        process.set(1);
        assert!(registry.read_all_at(Timestamp(400)));
        assert_eq!(registry.changed_tags().count(), 1);
    }

    #[test]
    fn test_read_all_include_all() {
        let mut registry = TagRegistry::with_config(RegistryConfig::include_all());
        let host = HostCell::new(0u32);
        registry
            .create(TagDefinition::uint32("hk", host.clone()).alias(-100))
            .unwrap();
        registry.read_all_at(Timestamp(1));
        host.set(9);
        assert!(registry.read_all_at(Timestamp(2)));
    }

    #[test]
    fn test_without_clock_reads_are_unobserved() {
        let mut registry = TagRegistry::new();
        let id = registry.create(int_tag("x", 1)).unwrap();
        assert_eq!(registry.now(), Timestamp::NEVER);
        assert!(registry.read_all());
        // Every read stays a first observation
        assert!(registry.read_all());
        assert_eq!(registry.get(id).unwrap().last_read(), Timestamp::NEVER);
    }

    #[test]
    fn test_clock_drives_reads() {
        let mut registry = TagRegistry::new();
        let clock = ManualClock::new(1000);
        registry.set_timestamp_source(clock.clone());
        let id = registry.create(int_tag("x", 1)).unwrap();

        assert_eq!(registry.read(id), Ok(true));
        clock.set(2000);
        assert_eq!(registry.read(id), Ok(false));
        let tag = registry.get(id).unwrap();
        assert_eq!(tag.last_read(), Timestamp(2000));
        assert_eq!(tag.current().timestamp, Timestamp(1000));
    }

    #[test]
    fn test_write_through_registry() {
        let mut registry = TagRegistry::new();
        let host = HostText::with_capacity(16).unwrap();
        let id = registry
            .create(
                TagDefinition::string("cmd", host.clone(), 16).access(Access::REMOTE),
            )
            .unwrap();
        let value = Snapshot::of(Value::string("start").unwrap(), Timestamp(1));
        assert_eq!(registry.write(id, &value), Ok(Fit::Complete));
        assert_eq!(host.get(), "start");
        assert_eq!(
            registry.write(TagId::new(999), &value),
            Err(TagError::UnknownTag(TagId::new(999)))
        );
    }

    #[test]
    fn test_on_change_during_bulk_read() {
        let mut registry = TagRegistry::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let host = HostCell::new(1i8);
        let id = registry
            .create(TagDefinition::int8("seq", host.clone()).alias(3))
            .unwrap();
        let sink = Rc::clone(&log);
        registry
            .get_mut(id)
            .unwrap()
            .add_on_change(move |tag| sink.borrow_mut().push(tag.alias()));

        registry.read_all_at(Timestamp(1));
        registry.read_all_at(Timestamp(2));
        host.set(2);
        registry.read_all_at(Timestamp(3));
        assert_eq!(*log.borrow(), vec![3, 3]);
    }

    #[derive(Clone, Debug)]
    enum Op {
        Create,
        Delete(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![Just(Op::Create), (0usize..16).prop_map(Op::Delete)]
    }

    proptest! {
        #[test]
        fn prop_index_matches_creation_order(ops in proptest::collection::vec(op(), 1..64)) {
            let mut registry = TagRegistry::new();
            let mut model: Vec<(TagId, String)> = Vec::new();
            let mut created = 0;

            for op in ops {
                match op {
                    Op::Create => {
                        let name = format!("tag{created}");
                        created += 1;
                        let id = registry.create(int_tag(&name, 1)).unwrap();
                        model.push((id, name));
                    }
                    Op::Delete(i) if !model.is_empty() => {
                        let (id, _) = model.remove(i % model.len());
                        registry.delete(id).unwrap();
                    }
                    Op::Delete(_) => {}
                }
            }

            prop_assert_eq!(registry.len(), model.len());
            for (index, (id, name)) in model.iter().enumerate() {
                prop_assert_eq!(registry.id_at(index), Some(*id));
                prop_assert_eq!(registry.get_by_index(index).unwrap().name(), name.as_str());
            }
            prop_assert!(registry.get_by_index(model.len()).is_none());

            let mut aliases: Vec<_> = registry.tags().map(Tag::alias).collect();
            aliases.sort_unstable();
            aliases.dedup();
            prop_assert_eq!(aliases.len(), registry.len());
        }
    }
}
