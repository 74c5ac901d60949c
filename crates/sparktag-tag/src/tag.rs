//! Tag entity - a named, typed binding to a host variable
//!
//! Tags are built from a [`TagDefinition`] by the registry, which owns
//! alias assignment. Building allocates the tag's owned snapshot buffers;
//! [`Tag::release`] tears them down again.

use std::fmt;

use sparktag_core::{Alias, DataType, Snapshot, TagError, TagResult, Timestamp};

use crate::{
    ChangeDetector, DefaultDetector, HostBytes, HostCell, HostText, HostVariable,
};

/// Advisory writability flags
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Access {
    /// Writable by the local application
    pub local: bool,
    /// Writable by a remote peer (e.g. an upstream command)
    pub remote: bool,
}

impl Access {
    pub const READ_ONLY: Access = Access {
        local: false,
        remote: false,
    };
    pub const LOCAL: Access = Access {
        local: true,
        remote: false,
    };
    pub const REMOTE: Access = Access {
        local: false,
        remote: true,
    };
    pub const READ_WRITE: Access = Access {
        local: true,
        remote: true,
    };

    pub fn new(local: bool, remote: bool) -> Self {
        Access { local, remote }
    }

    /// Writable by anyone. Local-vs-remote authority is not arbitrated here.
    #[inline]
    pub fn is_writable(self) -> bool {
        self.local || self.remote
    }
}

/// Callback fired after a read detects a change
pub type OnChange = Box<dyn FnMut(&Tag)>;

/// Callback that can veto a write
pub type ValidateWrite = Box<dyn FnMut(&Snapshot) -> bool>;

/// Everything needed to create a tag
pub struct TagDefinition {
    pub name: String,
    /// Requested alias; reassigned by the registry on collision
    pub alias: Alias,
    pub datatype: DataType,
    pub access: Access,
    /// Buffer capacity for string/text/bytes kinds. UUID forces 36.
    pub capacity: usize,
    pub host: Option<Box<dyn HostVariable>>,
}

impl TagDefinition {
    /// Unbound, read-only definition with alias 0
    pub fn new(name: impl Into<String>, datatype: DataType) -> Self {
        TagDefinition {
            name: name.into(),
            alias: 0,
            datatype,
            access: Access::READ_ONLY,
            capacity: 0,
            host: None,
        }
    }

    /// Tag with no host binding; every read observes null
    pub fn unbound(name: impl Into<String>, datatype: DataType, capacity: usize) -> Self {
        TagDefinition::new(name, datatype).capacity(capacity)
    }

    pub fn alias(mut self, alias: Alias) -> Self {
        self.alias = alias;
        self
    }

    pub fn access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn bind(mut self, host: impl HostVariable + 'static) -> Self {
        self.host = Some(Box::new(host));
        self
    }

    pub fn int8(name: impl Into<String>, host: HostCell<i8>) -> Self {
        TagDefinition::new(name, DataType::Int8).bind(host)
    }

    pub fn int16(name: impl Into<String>, host: HostCell<i16>) -> Self {
        TagDefinition::new(name, DataType::Int16).bind(host)
    }

    pub fn int32(name: impl Into<String>, host: HostCell<i32>) -> Self {
        TagDefinition::new(name, DataType::Int32).bind(host)
    }

    pub fn int64(name: impl Into<String>, host: HostCell<i64>) -> Self {
        TagDefinition::new(name, DataType::Int64).bind(host)
    }

    pub fn uint8(name: impl Into<String>, host: HostCell<u8>) -> Self {
        TagDefinition::new(name, DataType::UInt8).bind(host)
    }

    pub fn uint16(name: impl Into<String>, host: HostCell<u16>) -> Self {
        TagDefinition::new(name, DataType::UInt16).bind(host)
    }

    pub fn uint32(name: impl Into<String>, host: HostCell<u32>) -> Self {
        TagDefinition::new(name, DataType::UInt32).bind(host)
    }

    pub fn uint64(name: impl Into<String>, host: HostCell<u64>) -> Self {
        TagDefinition::new(name, DataType::UInt64).bind(host)
    }

    /// Epoch-millisecond timestamp tag
    pub fn date_time(name: impl Into<String>, host: HostCell<u64>) -> Self {
        TagDefinition::new(name, DataType::DateTime).bind(host)
    }

    pub fn float(name: impl Into<String>, host: HostCell<f32>) -> Self {
        TagDefinition::new(name, DataType::Float).bind(host)
    }

    pub fn double(name: impl Into<String>, host: HostCell<f64>) -> Self {
        TagDefinition::new(name, DataType::Double).bind(host)
    }

    pub fn boolean(name: impl Into<String>, host: HostCell<bool>) -> Self {
        TagDefinition::new(name, DataType::Boolean).bind(host)
    }

    pub fn string(name: impl Into<String>, host: HostText, capacity: usize) -> Self {
        TagDefinition::new(name, DataType::String)
            .capacity(capacity)
            .bind(host)
    }

    pub fn text(name: impl Into<String>, host: HostText, capacity: usize) -> Self {
        TagDefinition::new(name, DataType::Text)
            .capacity(capacity)
            .bind(host)
    }

    pub fn uuid(name: impl Into<String>, host: HostText) -> Self {
        TagDefinition::new(name, DataType::Uuid)
            .capacity(sparktag_core::UUID_CAPACITY)
            .bind(host)
    }

    pub fn bytes(name: impl Into<String>, host: HostBytes, capacity: usize) -> Self {
        TagDefinition::new(name, DataType::Bytes)
            .capacity(capacity)
            .bind(host)
    }
}

impl fmt::Debug for TagDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagDefinition")
            .field("name", &self.name)
            .field("alias", &self.alias)
            .field("datatype", &self.datatype)
            .field("access", &self.access)
            .field("capacity", &self.capacity)
            .field("bound", &self.host.is_some())
            .finish()
    }
}

/// A live tag
pub struct Tag {
    pub(crate) name: String,
    pub(crate) alias: Alias,
    pub(crate) datatype: DataType,
    pub(crate) access: Access,
    pub(crate) capacity: usize,
    pub(crate) host: Option<Box<dyn HostVariable>>,
    pub(crate) current: Snapshot,
    pub(crate) previous: Snapshot,
    /// Scratch observation, same capacity as the history snapshots
    pub(crate) incoming: Snapshot,
    pub(crate) detector: Box<dyn ChangeDetector>,
    pub(crate) on_change: Option<OnChange>,
    pub(crate) validate_write: Option<ValidateWrite>,
    pub(crate) last_read: Timestamp,
    pub(crate) changed: bool,
}

impl Tag {
    /// Build a tag under `alias`, allocating its owned buffers
    ///
    /// Called by the registry after alias resolution; a tag built any other
    /// way is not enumerated or read in bulk.
    pub fn allocate(definition: TagDefinition, alias: Alias) -> TagResult<Tag> {
        let TagDefinition {
            name,
            datatype,
            access,
            capacity,
            host,
            ..
        } = definition;

        if let Some(host) = host.as_ref() {
            if !host.supports(datatype) {
                return Err(TagError::TypeMismatch {
                    expected: datatype,
                    found: host_kind(host.as_ref(), datatype),
                });
            }
        }

        let capacity = datatype.effective_capacity(capacity);

        Ok(Tag {
            name,
            alias,
            datatype,
            access,
            capacity,
            host,
            current: Snapshot::unobserved(datatype, capacity)?,
            previous: Snapshot::unobserved(datatype, capacity)?,
            incoming: Snapshot::unobserved(datatype, capacity)?,
            detector: Box::new(DefaultDetector),
            on_change: None,
            validate_write: None,
            last_read: Timestamp::NEVER,
            changed: false,
        })
    }

    /// Release the owned snapshot buffers
    pub fn release(mut self) -> TagResult<()> {
        if self.datatype.is_scalar() {
            return Ok(());
        }
        self.current.value.release_buffer()?;
        self.previous.value.release_buffer()?;
        self.incoming.value.release_buffer()?;
        Ok(())
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn alias(&self) -> Alias {
        self.alias
    }

    #[inline]
    pub fn datatype(&self) -> DataType {
        self.datatype
    }

    #[inline]
    pub fn access(&self) -> Access {
        self.access
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        self.access.is_writable()
    }

    /// Allocated buffer capacity (zero for scalars)
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.host.is_some()
    }

    #[inline]
    pub fn current(&self) -> &Snapshot {
        &self.current
    }

    #[inline]
    pub fn previous(&self) -> &Snapshot {
        &self.previous
    }

    /// Timestamp passed to the most recent read
    #[inline]
    pub fn last_read(&self) -> Timestamp {
        self.last_read
    }

    /// Whether the most recent read detected a change
    #[inline]
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Replace the change comparator
    pub fn set_detector(&mut self, detector: impl ChangeDetector + 'static) {
        self.detector = Box::new(detector);
    }

    /// Register the on-change callback, replacing any previous one
    ///
    /// The callback runs synchronously at the end of a read that detected a
    /// change, after both snapshots are updated.
    pub fn add_on_change(&mut self, callback: impl FnMut(&Tag) + 'static) {
        self.on_change = Some(Box::new(callback));
    }

    /// Register the write validation callback, replacing any previous one
    pub fn add_validate_write(&mut self, callback: impl FnMut(&Snapshot) -> bool + 'static) {
        self.validate_write = Some(Box::new(callback));
    }
}

/// Best guess at the datatype an incompatible host accessor serves
fn host_kind(host: &dyn HostVariable, requested: DataType) -> DataType {
    DataType::ALL
        .into_iter()
        .find(|&d| host.supports(d))
        .unwrap_or(requested)
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tag")
            .field("name", &self.name)
            .field("alias", &self.alias)
            .field("datatype", &self.datatype)
            .field("access", &self.access)
            .field("capacity", &self.capacity)
            .field("bound", &self.host.is_some())
            .field("current", &self.current)
            .field("previous", &self.previous)
            .field("last_read", &self.last_read)
            .field("changed", &self.changed)
            .finish()
    }
}
