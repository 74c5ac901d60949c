//! Tagged values and timestamped snapshots
//!
//! A [`Value`] is a sum type over the supported datatypes. Scalar kinds are
//! stored inline; string-like and byte kinds own a capacity-bounded buffer.
//! A [`Snapshot`] pairs a value with its observation time and null flag.

use tracing::warn;

use crate::{ByteBuffer, DataType, Fit, StringBuffer, TagError, TagResult, Timestamp};

/// A typed tag value
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(StringBuffer),
    /// Epoch milliseconds
    DateTime(u64),
    Text(StringBuffer),
    Uuid(StringBuffer),
    Bytes(ByteBuffer),
}

impl Value {
    /// Zero value of a datatype; buffer kinds are left unallocated
    pub fn zero(datatype: DataType) -> Self {
        match datatype {
            DataType::Int8 => Value::Int8(0),
            DataType::Int16 => Value::Int16(0),
            DataType::Int32 => Value::Int32(0),
            DataType::Int64 => Value::Int64(0),
            DataType::UInt8 => Value::UInt8(0),
            DataType::UInt16 => Value::UInt16(0),
            DataType::UInt32 => Value::UInt32(0),
            DataType::UInt64 => Value::UInt64(0),
            DataType::Float => Value::Float(0.0),
            DataType::Double => Value::Double(0.0),
            DataType::Boolean => Value::Boolean(false),
            DataType::String => Value::String(StringBuffer::empty()),
            DataType::DateTime => Value::DateTime(0),
            DataType::Text => Value::Text(StringBuffer::empty()),
            DataType::Uuid => Value::Uuid(StringBuffer::empty()),
            DataType::Bytes => Value::Bytes(ByteBuffer::empty()),
        }
    }

    /// Zero value with its buffer allocated
    ///
    /// UUID always allocates 36 regardless of `capacity`.
    pub fn allocate(datatype: DataType, capacity: usize) -> TagResult<Self> {
        let mut value = Value::zero(datatype);
        value.allocate_buffer(datatype.effective_capacity(capacity))?;
        Ok(value)
    }

    /// String value sized to its content
    pub fn string(content: &str) -> TagResult<Self> {
        Ok(Value::String(StringBuffer::holding(content)?))
    }

    /// Text value sized to its content
    pub fn text(content: &str) -> TagResult<Self> {
        Ok(Value::Text(StringBuffer::holding(content)?))
    }

    /// UUID value, truncated to 36 characters
    pub fn uuid(content: &str) -> TagResult<Self> {
        let mut buffer = StringBuffer::with_capacity(crate::UUID_CAPACITY)?;
        if !content.is_empty() {
            buffer.set(content)?;
        }
        Ok(Value::Uuid(buffer))
    }

    /// Byte value sized to its content
    pub fn bytes(content: &[u8]) -> TagResult<Self> {
        Ok(Value::Bytes(ByteBuffer::holding(content)?))
    }

    pub fn datatype(&self) -> DataType {
        match self {
            Value::Int8(_) => DataType::Int8,
            Value::Int16(_) => DataType::Int16,
            Value::Int32(_) => DataType::Int32,
            Value::Int64(_) => DataType::Int64,
            Value::UInt8(_) => DataType::UInt8,
            Value::UInt16(_) => DataType::UInt16,
            Value::UInt32(_) => DataType::UInt32,
            Value::UInt64(_) => DataType::UInt64,
            Value::Float(_) => DataType::Float,
            Value::Double(_) => DataType::Double,
            Value::Boolean(_) => DataType::Boolean,
            Value::String(_) => DataType::String,
            Value::DateTime(_) => DataType::DateTime,
            Value::Text(_) => DataType::Text,
            Value::Uuid(_) => DataType::Uuid,
            Value::Bytes(_) => DataType::Bytes,
        }
    }

    /// Allocate the owned buffer of a buffer kind. No-op for scalars.
    pub fn allocate_buffer(&mut self, capacity: usize) -> TagResult<()> {
        match self {
            Value::String(s) | Value::Text(s) | Value::Uuid(s) => s.allocate(capacity),
            Value::Bytes(b) => b.allocate(capacity),
            _ => Ok(()),
        }
    }

    /// Release the owned buffer of a buffer kind. No-op for scalars.
    pub fn release_buffer(&mut self) -> TagResult<()> {
        match self {
            Value::String(s) | Value::Text(s) | Value::Uuid(s) => s.release(),
            Value::Bytes(b) => b.release(),
            _ => Ok(()),
        }
    }

    /// Allocated capacity of the owned buffer, zero for scalars
    pub fn capacity(&self) -> usize {
        match self {
            Value::String(s) | Value::Text(s) | Value::Uuid(s) => s.capacity(),
            Value::Bytes(b) => b.capacity(),
            _ => 0,
        }
    }

    /// Empty string or zero-length bytes. Scalars are never empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::String(s) | Value::Text(s) | Value::Uuid(s) => s.is_empty(),
            Value::Bytes(b) => b.is_empty(),
            _ => false,
        }
    }

    /// Reset to the zero value, keeping any buffer allocated
    pub fn clear(&mut self) {
        match self {
            Value::String(s) | Value::Text(s) | Value::Uuid(s) => s.clear(),
            Value::Bytes(b) => b.clear(),
            other => *other = Value::zero(other.datatype()),
        }
    }

    /// Bounded copy from a value of the same datatype
    ///
    /// Scalars are assigned directly; buffers are truncated to this value's
    /// capacity. Fails without mutation on a datatype mismatch or an
    /// unusable target buffer.
    pub fn copy_from(&mut self, source: &Value) -> TagResult<Fit> {
        match (self, source) {
            (Value::String(dst), Value::String(src))
            | (Value::Text(dst), Value::Text(src))
            | (Value::Uuid(dst), Value::Uuid(src)) => dst.copy_from(src),
            (Value::Bytes(dst), Value::Bytes(src)) => dst.copy_from(src),
            (dst, src) if dst.datatype() == src.datatype() => {
                *dst = src.clone();
                Ok(Fit::Complete)
            }
            (dst, src) => Err(TagError::TypeMismatch {
                expected: dst.datatype(),
                found: src.datatype(),
            }),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Text(s) | Value::Uuid(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    /// Exact view of the integer and datetime kinds
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Value::Int8(v) => Some(v.into()),
            Value::Int16(v) => Some(v.into()),
            Value::Int32(v) => Some(v.into()),
            Value::Int64(v) => Some(v.into()),
            Value::UInt8(v) => Some(v.into()),
            Value::UInt16(v) => Some(v.into()),
            Value::UInt32(v) => Some(v.into()),
            Value::UInt64(v) | Value::DateTime(v) => Some(v.into()),
            _ => None,
        }
    }

    /// Numeric view, for tolerance-based comparison
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Int8(v) => Some(v as f64),
            Value::Int16(v) => Some(v as f64),
            Value::Int32(v) => Some(v as f64),
            Value::Int64(v) => Some(v as f64),
            Value::UInt8(v) => Some(v as f64),
            Value::UInt16(v) => Some(v as f64),
            Value::UInt32(v) => Some(v as f64),
            Value::UInt64(v) | Value::DateTime(v) => Some(v as f64),
            Value::Float(v) => Some(v as f64),
            Value::Double(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_scalar! {
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
    bool => Boolean,
}

/// Timestamped, nullable observation of a tag value
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub timestamp: Timestamp,
    pub value: Value,
    pub is_null: bool,
}

impl Snapshot {
    /// A never-observed null snapshot with its buffer allocated
    pub fn unobserved(datatype: DataType, capacity: usize) -> TagResult<Self> {
        Ok(Snapshot {
            timestamp: Timestamp::NEVER,
            value: Value::allocate(datatype, capacity)?,
            is_null: true,
        })
    }

    /// A non-null snapshot of `value`
    pub fn of(value: impl Into<Value>, timestamp: Timestamp) -> Self {
        Snapshot {
            timestamp,
            value: value.into(),
            is_null: false,
        }
    }

    /// A null snapshot of the given datatype
    pub fn null(datatype: DataType, timestamp: Timestamp) -> Self {
        Snapshot {
            timestamp,
            value: Value::zero(datatype),
            is_null: true,
        }
    }

    #[inline]
    pub fn datatype(&self) -> DataType {
        self.value.datatype()
    }

    /// Whether this snapshot has been filled by a read
    #[inline]
    pub fn is_observed(&self) -> bool {
        !self.timestamp.is_never()
    }

    /// Null, or a buffer kind with empty content
    #[inline]
    pub fn is_null_or_empty(&self) -> bool {
        self.is_null || self.value.is_empty()
    }

    /// Bounded copy of another snapshot into this one
    ///
    /// Timestamp and null flag are always copied. A null source clears this
    /// value; a value copy that fails leaves this snapshot null.
    pub fn copy_from(&mut self, source: &Snapshot) -> TagResult<Fit> {
        if self.datatype() != source.datatype() {
            return Err(TagError::TypeMismatch {
                expected: self.datatype(),
                found: source.datatype(),
            });
        }

        self.timestamp = source.timestamp;
        self.is_null = source.is_null;

        if source.is_null {
            self.value.clear();
            return Ok(Fit::Complete);
        }

        match self.value.copy_from(&source.value) {
            Ok(fit) => Ok(fit),
            Err(e) => {
                warn!(datatype = %self.datatype(), error = %e, "snapshot copy failed");
                self.value.clear();
                self.is_null = true;
                Err(e)
            }
        }
    }
}

impl From<Value> for Snapshot {
    fn from(value: Value) -> Self {
        Snapshot::of(value, Timestamp::NEVER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_matches_datatype() {
        for datatype in DataType::ALL {
            let value = Value::allocate(datatype, 8).unwrap();
            assert_eq!(value.datatype(), datatype);
            let expected = datatype.effective_capacity(8);
            assert_eq!(value.capacity(), expected);
        }
    }

    #[test]
    fn test_uuid_forces_capacity() {
        let value = Value::allocate(DataType::Uuid, 4).unwrap();
        assert_eq!(value.capacity(), 36);
        let uuid = Value::uuid("123e4567-e89b-12d3-a456-426614174000-extra").unwrap();
        assert_eq!(uuid.as_str(), Some("123e4567-e89b-12d3-a456-426614174000"));
    }

    #[test]
    fn test_scalar_copy() {
        let mut dst = Value::Int32(0);
        assert_eq!(dst.copy_from(&Value::Int32(42)), Ok(Fit::Complete));
        assert_eq!(dst, Value::Int32(42));
    }

    #[test]
    fn test_copy_type_mismatch_leaves_target() {
        let mut dst = Value::Int32(7);
        let err = dst.copy_from(&Value::Int64(1)).unwrap_err();
        assert_eq!(
            err,
            TagError::TypeMismatch {
                expected: DataType::Int32,
                found: DataType::Int64
            }
        );
        assert_eq!(dst, Value::Int32(7));

        // Same buffer shape, different kind
        let mut text = Value::allocate(DataType::Text, 8).unwrap();
        assert!(text.copy_from(&Value::string("x").unwrap()).is_err());
    }

    #[test]
    fn test_string_copy_truncates_to_target() {
        let mut dst = Value::allocate(DataType::String, 4).unwrap();
        let fit = dst.copy_from(&Value::string("overflowing").unwrap()).unwrap();
        assert!(fit.is_truncated());
        assert_eq!(dst.as_str(), Some("over"));
        assert_eq!(dst.capacity(), 4);
    }

    #[test]
    fn test_copy_into_unallocated_fails() {
        let mut dst = Value::zero(DataType::Bytes);
        assert_eq!(
            dst.copy_from(&Value::bytes(&[1, 2]).unwrap()),
            Err(TagError::NotAllocated)
        );
    }

    #[test]
    fn test_release_buffer() {
        let mut value = Value::allocate(DataType::Bytes, 16).unwrap();
        assert!(value.release_buffer().is_ok());
        assert_eq!(value.release_buffer(), Err(TagError::NotAllocated));
        assert!(Value::Int8(1).release_buffer().is_ok());
    }

    #[test]
    fn test_snapshot_copy_null_clears() {
        let mut dst = Snapshot::unobserved(DataType::String, 8).unwrap();
        dst.copy_from(&Snapshot::of(Value::string("abc").unwrap(), Timestamp(5)))
            .unwrap();
        assert_eq!(dst.value.as_str(), Some("abc"));
        assert!(!dst.is_null);

        dst.copy_from(&Snapshot::null(DataType::String, Timestamp(6)))
            .unwrap();
        assert!(dst.is_null);
        assert_eq!(dst.timestamp, Timestamp(6));
        assert_eq!(dst.value.as_str(), Some(""));
        assert_eq!(dst.value.capacity(), 8);
    }

    #[test]
    fn test_snapshot_copy_failure_goes_null() {
        let mut dst = Snapshot::unobserved(DataType::Bytes, 0).unwrap();
        let src = Snapshot::of(Value::bytes(&[1]).unwrap(), Timestamp(9));
        assert_eq!(dst.copy_from(&src), Err(TagError::ZeroCapacity));
        assert!(dst.is_null);
    }

    #[test]
    fn test_as_f64() {
        assert_eq!(Value::from(-3i8).as_f64(), Some(-3.0));
        assert_eq!(Value::DateTime(1000).as_f64(), Some(1000.0));
        assert_eq!(Value::Boolean(true).as_f64(), None);
    }
}
