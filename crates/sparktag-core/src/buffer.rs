//! Owned, capacity-bounded buffers for string and byte values
//!
//! Both buffers start out empty (unallocated). Allocation reserves the full
//! capacity up front, zero-filled, and the capacity never changes until the
//! buffer is released. Every copy into a buffer is bounded by its capacity:
//! overlong input is truncated and reported through [`Fit`].

use bytes::Bytes;
use tracing::warn;

use crate::{TagError, TagResult};

/// Outcome of a bounded copy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Fit {
    /// Source fit entirely
    #[default]
    Complete,
    /// Source exceeded the capacity; `dropped` trailing bytes were discarded
    Truncated { dropped: usize },
}

impl Fit {
    fn of(source_len: usize, copied: usize) -> Self {
        if copied < source_len {
            Fit::Truncated {
                dropped: source_len - copied,
            }
        } else {
            Fit::Complete
        }
    }

    #[inline]
    pub fn is_truncated(self) -> bool {
        matches!(self, Fit::Truncated { .. })
    }
}

fn reserve_zeroed(len: usize) -> TagResult<Vec<u8>> {
    let mut storage = Vec::new();
    storage
        .try_reserve_exact(len)
        .map_err(|_| TagError::AllocationFailed { requested: len })?;
    storage.resize(len, 0);
    Ok(storage)
}

/// Null-terminated string buffer of fixed capacity
///
/// Allocating capacity `N` reserves `N + 1` bytes so a terminator always
/// fits after the longest content.
#[derive(Clone, Debug, Default)]
pub struct StringBuffer {
    storage: Option<Vec<u8>>,
}

impl StringBuffer {
    /// An unallocated buffer
    pub const fn empty() -> Self {
        StringBuffer { storage: None }
    }

    /// Allocate a fresh buffer of the given capacity
    pub fn with_capacity(capacity: usize) -> TagResult<Self> {
        let mut buffer = StringBuffer::empty();
        buffer.allocate(capacity)?;
        Ok(buffer)
    }

    /// Allocate a buffer sized exactly to hold `content`
    pub fn holding(content: &str) -> TagResult<Self> {
        let mut buffer = StringBuffer::with_capacity(content.len())?;
        if !content.is_empty() {
            buffer.set(content)?;
        }
        Ok(buffer)
    }

    /// Reserve `capacity + 1` zeroed bytes. Fails on an already allocated buffer.
    pub fn allocate(&mut self, capacity: usize) -> TagResult<()> {
        if self.storage.is_some() {
            return Err(TagError::AlreadyAllocated);
        }
        let len = capacity
            .checked_add(1)
            .ok_or(TagError::AllocationFailed { requested: capacity })?;
        self.storage = Some(reserve_zeroed(len)?);
        Ok(())
    }

    /// Release the storage and return to the empty state
    pub fn release(&mut self) -> TagResult<()> {
        self.storage.take().map(|_| ()).ok_or(TagError::NotAllocated)
    }

    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.storage.is_some()
    }

    /// Usable capacity, excluding the terminator
    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.as_ref().map_or(0, |s| s.len() - 1)
    }

    /// Content bytes up to the first terminator
    pub fn as_bytes(&self) -> &[u8] {
        match &self.storage {
            Some(storage) => {
                let end = storage.iter().position(|&b| b == 0).unwrap_or(storage.len());
                &storage[..end]
            }
            None => &[],
        }
    }

    /// Content as text
    pub fn as_str(&self) -> &str {
        // Content is only ever written from &str at char boundaries.
        std::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Copy `content` in, truncated to capacity at a char boundary
    ///
    /// The remainder of the storage is zeroed, so the content is always
    /// followed by a terminator. Fails without mutation when the buffer is
    /// unallocated or has zero capacity.
    pub fn set(&mut self, content: &str) -> TagResult<Fit> {
        let storage = self.storage.as_mut().ok_or(TagError::NotAllocated)?;
        let capacity = storage.len() - 1;
        if capacity == 0 {
            return Err(TagError::ZeroCapacity);
        }

        let mut end = content.len().min(capacity);
        while !content.is_char_boundary(end) {
            end -= 1;
        }

        storage[..end].copy_from_slice(&content.as_bytes()[..end]);
        storage[end..].fill(0);

        let fit = Fit::of(content.len(), end);
        if fit.is_truncated() {
            warn!(capacity, source_len = content.len(), "string value truncated");
        }
        Ok(fit)
    }

    /// Bounded copy from another string buffer
    pub fn copy_from(&mut self, source: &StringBuffer) -> TagResult<Fit> {
        self.set(source.as_str())
    }

    /// Zero-fill the full capacity
    pub fn clear(&mut self) {
        if let Some(storage) = self.storage.as_mut() {
            storage.fill(0);
        }
    }
}

impl PartialEq for StringBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for StringBuffer {}

/// Byte buffer of fixed capacity with a written-length marker
///
/// Capacity zero is allowed: the buffer is allocated but every copy into it
/// fails.
#[derive(Clone, Debug, Default)]
pub struct ByteBuffer {
    storage: Option<Vec<u8>>,
    written: usize,
}

impl ByteBuffer {
    /// An unallocated buffer
    pub const fn empty() -> Self {
        ByteBuffer {
            storage: None,
            written: 0,
        }
    }

    /// Allocate a fresh buffer of the given capacity
    pub fn with_capacity(capacity: usize) -> TagResult<Self> {
        let mut buffer = ByteBuffer::empty();
        buffer.allocate(capacity)?;
        Ok(buffer)
    }

    /// Allocate a buffer sized exactly to hold `content`
    pub fn holding(content: &[u8]) -> TagResult<Self> {
        let mut buffer = ByteBuffer::with_capacity(content.len())?;
        if !content.is_empty() {
            buffer.set(content)?;
        }
        Ok(buffer)
    }

    /// Reserve `capacity` zeroed bytes. Fails on an already allocated buffer.
    pub fn allocate(&mut self, capacity: usize) -> TagResult<()> {
        if self.storage.is_some() {
            return Err(TagError::AlreadyAllocated);
        }
        self.storage = Some(reserve_zeroed(capacity)?);
        self.written = 0;
        Ok(())
    }

    /// Release the storage and return to the empty state
    pub fn release(&mut self) -> TagResult<()> {
        self.storage.take().ok_or(TagError::NotAllocated)?;
        self.written = 0;
        Ok(())
    }

    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.storage.is_some()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.storage.as_ref().map_or(0, Vec::len)
    }

    /// Number of bytes written
    #[inline]
    pub fn len(&self) -> usize {
        self.written
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    /// Written bytes
    pub fn as_slice(&self) -> &[u8] {
        match &self.storage {
            Some(storage) => &storage[..self.written],
            None => &[],
        }
    }

    /// Immutable copy of the written bytes, for handing to an encoder
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_slice())
    }

    /// Copy `content` in, truncated to capacity
    ///
    /// Empty content zero-fills the buffer. Fails without mutation when the
    /// buffer is unallocated or has zero capacity.
    pub fn set(&mut self, content: &[u8]) -> TagResult<Fit> {
        let storage = self.storage.as_mut().ok_or(TagError::NotAllocated)?;
        if storage.is_empty() {
            return Err(TagError::ZeroCapacity);
        }

        let len = content.len().min(storage.len());
        storage[..len].copy_from_slice(&content[..len]);
        storage[len..].fill(0);
        self.written = len;

        let fit = Fit::of(content.len(), len);
        if fit.is_truncated() {
            warn!(
                capacity = storage.len(),
                source_len = content.len(),
                "byte value truncated"
            );
        }
        Ok(fit)
    }

    /// Bounded copy from another byte buffer
    pub fn copy_from(&mut self, source: &ByteBuffer) -> TagResult<Fit> {
        self.set(source.as_slice())
    }

    /// Zero-fill the full capacity
    pub fn clear(&mut self) {
        if let Some(storage) = self.storage.as_mut() {
            storage.fill(0);
        }
        self.written = 0;
    }
}

impl PartialEq for ByteBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for ByteBuffer {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_string_allocate_reserves_terminator() {
        let buffer = StringBuffer::with_capacity(8).unwrap();
        assert!(buffer.is_allocated());
        assert_eq!(buffer.capacity(), 8);
        assert!(buffer.is_empty());
        assert_eq!(buffer.storage.as_ref().unwrap().len(), 9);
    }

    #[test]
    fn test_string_double_allocate_fails() {
        let mut buffer = StringBuffer::with_capacity(4).unwrap();
        buffer.set("abcd").unwrap();
        assert_eq!(buffer.allocate(16), Err(TagError::AlreadyAllocated));
        // Untouched
        assert_eq!(buffer.capacity(), 4);
        assert_eq!(buffer.as_str(), "abcd");
    }

    #[test]
    fn test_string_release() {
        let mut buffer = StringBuffer::with_capacity(4).unwrap();
        assert!(buffer.release().is_ok());
        assert!(!buffer.is_allocated());
        assert_eq!(buffer.release(), Err(TagError::NotAllocated));
        assert_eq!(buffer.capacity(), 0);
    }

    #[test]
    fn test_string_truncation() {
        let mut buffer = StringBuffer::with_capacity(5).unwrap();
        let fit = buffer.set("temperature").unwrap();
        assert_eq!(fit, Fit::Truncated { dropped: 6 });
        assert_eq!(buffer.as_str(), "tempe");
        // Terminator right after the content
        assert_eq!(buffer.storage.as_ref().unwrap()[5], 0);
    }

    #[test]
    fn test_string_shorter_overwrite_leaves_no_garbage() {
        let mut buffer = StringBuffer::with_capacity(8).unwrap();
        buffer.set("abcdefgh").unwrap();
        buffer.set("xy").unwrap();
        assert_eq!(buffer.as_str(), "xy");
        assert!(buffer.storage.as_ref().unwrap()[2..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_string_truncates_at_char_boundary() {
        let mut buffer = StringBuffer::with_capacity(3).unwrap();
        // 'é' is two bytes; the third byte would split it
        let fit = buffer.set("aéb").unwrap();
        assert_eq!(buffer.as_str(), "aé");
        assert_eq!(fit, Fit::Truncated { dropped: 1 });

        let mut narrow = StringBuffer::with_capacity(2).unwrap();
        narrow.set("aé").unwrap();
        assert_eq!(narrow.as_str(), "a");
    }

    #[test]
    fn test_string_zero_capacity_copy_fails_without_mutation() {
        let mut buffer = StringBuffer::with_capacity(0).unwrap();
        assert!(buffer.is_allocated());
        assert_eq!(buffer.set("x"), Err(TagError::ZeroCapacity));
        assert!(buffer.is_empty());

        let mut unallocated = StringBuffer::empty();
        assert_eq!(unallocated.set("x"), Err(TagError::NotAllocated));
        assert!(!unallocated.is_allocated());
    }

    #[test]
    fn test_string_empty_source_clears() {
        let mut buffer = StringBuffer::with_capacity(4).unwrap();
        buffer.set("abc").unwrap();
        let empty = StringBuffer::with_capacity(4).unwrap();
        assert_eq!(buffer.copy_from(&empty), Ok(Fit::Complete));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_string_equality_ignores_capacity() {
        let a = StringBuffer::holding("pump").unwrap();
        let mut b = StringBuffer::with_capacity(32).unwrap();
        b.set("pump").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_bytes_zero_capacity_is_allocated_but_unusable() {
        let mut buffer = ByteBuffer::with_capacity(0).unwrap();
        assert!(buffer.is_allocated());
        assert_eq!(buffer.set(&[1]), Err(TagError::ZeroCapacity));
        assert_eq!(buffer.len(), 0);
    }

    #[test]
    fn test_bytes_truncation_updates_written() {
        let mut buffer = ByteBuffer::with_capacity(3).unwrap();
        let fit = buffer.set(&[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(fit, Fit::Truncated { dropped: 2 });
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_bytes_empty_source_zero_fills() {
        let mut buffer = ByteBuffer::with_capacity(4).unwrap();
        buffer.set(&[9, 9, 9, 9]).unwrap();
        buffer.copy_from(&ByteBuffer::with_capacity(2).unwrap()).unwrap();
        assert!(buffer.is_empty());
        assert!(buffer.storage.as_ref().unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_bytes_lifecycle() {
        let mut buffer = ByteBuffer::empty();
        assert_eq!(buffer.release(), Err(TagError::NotAllocated));
        buffer.allocate(8).unwrap();
        assert_eq!(buffer.allocate(8), Err(TagError::AlreadyAllocated));
        buffer.set(b"abc").unwrap();
        assert_eq!(buffer.to_bytes(), Bytes::from_static(b"abc"));
        buffer.release().unwrap();
        assert!(!buffer.is_allocated());
        assert!(buffer.is_empty());
    }

    proptest! {
        #[test]
        fn prop_string_never_exceeds_capacity(content in ".{0,64}", capacity in 1usize..32) {
            let mut buffer = StringBuffer::with_capacity(capacity).unwrap();
            buffer.set(&content).unwrap();
            prop_assert!(buffer.len() <= capacity);
            prop_assert!(content.starts_with(buffer.as_str()));
            prop_assert_eq!(buffer.storage.as_ref().unwrap().len(), capacity + 1);
        }

        #[test]
        fn prop_bytes_never_exceed_capacity(content in proptest::collection::vec(any::<u8>(), 0..64), capacity in 1usize..32) {
            let mut buffer = ByteBuffer::with_capacity(capacity).unwrap();
            buffer.set(&content).unwrap();
            prop_assert_eq!(buffer.len(), content.len().min(capacity));
            prop_assert_eq!(buffer.as_slice(), &content[..buffer.len()]);
            prop_assert_eq!(buffer.capacity(), capacity);
        }
    }
}
