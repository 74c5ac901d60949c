//! Identity types for tags
//!
//! A tag has two identities: a `TagId` handed out by its registry and never
//! reused, and an `Alias`, the compact integer used for wire addressing.

use std::fmt;

/// Compact wire identifier, unique among live tags of a registry
pub type Alias = i32;

/// Registry handle for a live tag
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TagId(pub u64);

impl TagId {
    #[inline]
    pub fn new(id: u64) -> Self {
        TagId(id)
    }

    /// Next handle in sequence
    #[inline]
    pub fn next(self) -> Self {
        TagId(self.0.wrapping_add(1))
    }
}

impl fmt::Debug for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self.0)
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_id_sequence() {
        let id = TagId::new(41);
        assert_eq!(id.next(), TagId::new(42));
        assert!(id < id.next());
    }

    #[test]
    fn test_tag_id_format() {
        assert_eq!(format!("{:?}", TagId::new(7)), "Tag(7)");
        assert_eq!(TagId::new(7).to_string(), "7");
    }
}
