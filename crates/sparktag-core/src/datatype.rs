//! Tag datatype definitions
//!
//! Datatype codes follow the Sparkplug numbering and are part of the wire
//! contract: once assigned a code never changes. Composite and array kinds
//! occupy reserved codes and are rejected rather than coerced.

use std::fmt;

use crate::{TagError, TagResult};

/// Fixed capacity of a UUID string (8-4-4-4-12 hex form)
pub const UUID_CAPACITY: usize = 36;

/// Supported tag datatypes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DataType {
    Int8 = 1,
    Int16 = 2,
    Int32 = 3,
    Int64 = 4,
    UInt8 = 5,
    UInt16 = 6,
    UInt32 = 7,
    UInt64 = 8,
    Float = 9,
    Double = 10,
    Boolean = 11,
    String = 12,
    /// Epoch milliseconds stored as u64
    DateTime = 13,
    Text = 14,
    /// String of exactly 36 characters
    Uuid = 15,
    /// Opaque byte buffer
    Bytes = 17,
}

impl DataType {
    /// Every supported datatype, in code order
    pub const ALL: [DataType; 16] = [
        DataType::Int8,
        DataType::Int16,
        DataType::Int32,
        DataType::Int64,
        DataType::UInt8,
        DataType::UInt16,
        DataType::UInt32,
        DataType::UInt64,
        DataType::Float,
        DataType::Double,
        DataType::Boolean,
        DataType::String,
        DataType::DateTime,
        DataType::Text,
        DataType::Uuid,
        DataType::Bytes,
    ];

    /// Parse from a wire code
    pub fn from_code(code: u32) -> TagResult<Self> {
        match code {
            1 => Ok(DataType::Int8),
            2 => Ok(DataType::Int16),
            3 => Ok(DataType::Int32),
            4 => Ok(DataType::Int64),
            5 => Ok(DataType::UInt8),
            6 => Ok(DataType::UInt16),
            7 => Ok(DataType::UInt32),
            8 => Ok(DataType::UInt64),
            9 => Ok(DataType::Float),
            10 => Ok(DataType::Double),
            11 => Ok(DataType::Boolean),
            12 => Ok(DataType::String),
            13 => Ok(DataType::DateTime),
            14 => Ok(DataType::Text),
            15 => Ok(DataType::Uuid),
            17 => Ok(DataType::Bytes),
            // DataSet, File, Template, PropertySet(List) and the array kinds
            16 | 18..=34 => Err(TagError::ReservedDataType(code)),
            _ => Err(TagError::UnknownDataType(code)),
        }
    }

    /// Convert to wire code
    #[inline]
    pub fn code(self) -> u32 {
        self as u32
    }

    /// String-like kinds own a null-terminated buffer
    #[inline]
    pub fn is_string(self) -> bool {
        matches!(self, DataType::String | DataType::Text | DataType::Uuid)
    }

    /// Kinds that own a buffer allocated at tag creation
    #[inline]
    pub fn is_buffered(self) -> bool {
        self.is_string() || self == DataType::Bytes
    }

    /// Scalar kinds stored inline
    #[inline]
    pub fn is_scalar(self) -> bool {
        !self.is_buffered()
    }

    /// Numeric kinds (deadband filtering applies to these)
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
                | DataType::Float
                | DataType::Double
                | DataType::DateTime
        )
    }

    /// Buffer capacity a tag of this kind actually allocates
    ///
    /// UUID forces 36; scalar kinds carry no buffer.
    pub fn effective_capacity(self, requested: usize) -> usize {
        match self {
            DataType::Uuid => UUID_CAPACITY,
            DataType::String | DataType::Text | DataType::Bytes => requested,
            _ => 0,
        }
    }
}

impl TryFrom<u32> for DataType {
    type Error = TagError;

    fn try_from(code: u32) -> TagResult<Self> {
        DataType::from_code(code)
    }
}

impl From<DataType> for u32 {
    fn from(datatype: DataType) -> u32 {
        datatype.code()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Int8 => "Int8",
            DataType::Int16 => "Int16",
            DataType::Int32 => "Int32",
            DataType::Int64 => "Int64",
            DataType::UInt8 => "UInt8",
            DataType::UInt16 => "UInt16",
            DataType::UInt32 => "UInt32",
            DataType::UInt64 => "UInt64",
            DataType::Float => "Float",
            DataType::Double => "Double",
            DataType::Boolean => "Boolean",
            DataType::String => "String",
            DataType::DateTime => "DateTime",
            DataType::Text => "Text",
            DataType::Uuid => "UUID",
            DataType::Bytes => "Bytes",
        };
        f.write_str(name)
    }
}
