//! Host bindings - typed accessors into host-owned memory
//!
//! The embedding system owns the process variables. A tag holds a clone of
//! a shared handle and reads or writes through it; neither side owns the
//! other. Handles are `Rc`-based: the whole model is single-threaded.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use sparktag_core::{ByteBuffer, DataType, Fit, StringBuffer, TagError, TagResult, Value};

/// Typed accessor for one host variable
pub trait HostVariable {
    /// Whether this accessor can back a tag of `datatype`
    fn supports(&self, datatype: DataType) -> bool;

    /// Current host content as a value of `datatype`, or `None` when the
    /// host holds nothing readable
    fn read(&self, datatype: DataType) -> Option<Value>;

    /// Bounded copy of the host content into a preallocated `target`
    ///
    /// `Ok(None)` means the host holds nothing readable (empty content reads
    /// as null). Buffer-backed hosts override this to skip the intermediate
    /// value built by [`read`](Self::read).
    fn read_into(&self, datatype: DataType, target: &mut Value) -> TagResult<Option<Fit>> {
        match self.read(datatype).filter(|value| !value.is_empty()) {
            Some(value) => target.copy_from(&value).map(Some),
            None => Ok(None),
        }
    }

    /// Store `value`, bounded by `capacity` for buffer kinds
    fn write(&self, value: &Value, capacity: usize) -> TagResult<Fit>;

    /// Zero the host variable
    fn clear(&self) -> TagResult<()>;
}

/// Rust primitive that backs a scalar datatype
pub trait Scalar: Copy + Default + 'static {
    /// Natural datatype of this primitive
    const DATATYPE: DataType;

    fn supports(datatype: DataType) -> bool {
        datatype == Self::DATATYPE
    }

    fn to_value(self, datatype: DataType) -> Option<Value>;

    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! impl_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const DATATYPE: DataType = DataType::$variant;

                fn to_value(self, datatype: DataType) -> Option<Value> {
                    (datatype == Self::DATATYPE).then_some(Value::$variant(self))
                }

                fn from_value(value: &Value) -> Option<Self> {
                    match *value {
                        Value::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_scalar! {
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    f32 => Float,
    f64 => Double,
    bool => Boolean,
}

// u64 backs both UInt64 and DateTime (epoch milliseconds)
impl Scalar for u64 {
    const DATATYPE: DataType = DataType::UInt64;

    fn supports(datatype: DataType) -> bool {
        matches!(datatype, DataType::UInt64 | DataType::DateTime)
    }

    fn to_value(self, datatype: DataType) -> Option<Value> {
        match datatype {
            DataType::UInt64 => Some(Value::UInt64(self)),
            DataType::DateTime => Some(Value::DateTime(self)),
            _ => None,
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match *value {
            Value::UInt64(v) | Value::DateTime(v) => Some(v),
            _ => None,
        }
    }
}

/// Shared scalar host variable
#[derive(Default)]
pub struct HostCell<T>(Rc<Cell<T>>);

impl<T: Scalar> HostCell<T> {
    pub fn new(value: T) -> Self {
        HostCell(Rc::new(Cell::new(value)))
    }

    pub fn get(&self) -> T {
        self.0.get()
    }

    pub fn set(&self, value: T) {
        self.0.set(value)
    }
}

impl<T: Scalar + fmt::Debug> fmt::Debug for HostCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HostCell").field(&self.get()).finish()
    }
}

impl<T> Clone for HostCell<T> {
    fn clone(&self) -> Self {
        HostCell(Rc::clone(&self.0))
    }
}

impl<T: Scalar> HostVariable for HostCell<T> {
    fn supports(&self, datatype: DataType) -> bool {
        T::supports(datatype)
    }

    fn read(&self, datatype: DataType) -> Option<Value> {
        self.get().to_value(datatype)
    }

    fn write(&self, value: &Value, _capacity: usize) -> TagResult<Fit> {
        let v = T::from_value(value).ok_or(TagError::TypeMismatch {
            expected: T::DATATYPE,
            found: value.datatype(),
        })?;
        self.set(v);
        Ok(Fit::Complete)
    }

    fn clear(&self) -> TagResult<()> {
        self.set(T::default());
        Ok(())
    }
}

/// Largest prefix of `s` no longer than `max` bytes, ending on a char boundary
fn bounded_str(s: &str, max: usize) -> &str {
    let mut end = s.len().min(max);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Merge a pre-bound truncation with the host buffer's own result
fn combine(source_len: usize, bounded_len: usize, inner: Fit) -> Fit {
    let outer = source_len - bounded_len;
    match inner {
        Fit::Complete if outer == 0 => Fit::Complete,
        Fit::Complete => Fit::Truncated { dropped: outer },
        Fit::Truncated { dropped } => Fit::Truncated {
            dropped: dropped + outer,
        },
    }
}

/// Shared host character array of fixed capacity
///
/// Backs string, text and UUID tags. An empty string reads as null.
#[derive(Clone, Debug)]
pub struct HostText(Rc<RefCell<StringBuffer>>);

impl HostText {
    pub fn with_capacity(capacity: usize) -> TagResult<Self> {
        Ok(HostText(Rc::new(RefCell::new(StringBuffer::with_capacity(
            capacity,
        )?))))
    }

    /// Host array of `capacity` initialised with `content`
    pub fn new(content: &str, capacity: usize) -> TagResult<Self> {
        let host = HostText::with_capacity(capacity)?;
        if !content.is_empty() {
            host.set(content)?;
        }
        Ok(host)
    }

    pub fn get(&self) -> String {
        self.0.borrow().as_str().to_owned()
    }

    pub fn set(&self, content: &str) -> TagResult<Fit> {
        self.0.borrow_mut().set(content)
    }

    pub fn capacity(&self) -> usize {
        self.0.borrow().capacity()
    }
}

impl HostVariable for HostText {
    fn supports(&self, datatype: DataType) -> bool {
        datatype.is_string()
    }

    fn read(&self, datatype: DataType) -> Option<Value> {
        let buffer = self.0.borrow();
        if buffer.is_empty() {
            return None;
        }
        let content = buffer.as_str();
        match datatype {
            DataType::String => Value::string(content).ok(),
            DataType::Text => Value::text(content).ok(),
            DataType::Uuid => Value::uuid(content).ok(),
            _ => None,
        }
    }

    fn read_into(&self, datatype: DataType, target: &mut Value) -> TagResult<Option<Fit>> {
        let buffer = self.0.borrow();
        if buffer.is_empty() || !datatype.is_string() {
            return Ok(None);
        }
        match (datatype, target) {
            (DataType::String, Value::String(dst))
            | (DataType::Text, Value::Text(dst))
            | (DataType::Uuid, Value::Uuid(dst)) => dst.copy_from(&buffer).map(Some),
            (_, other) => Err(TagError::TypeMismatch {
                expected: datatype,
                found: other.datatype(),
            }),
        }
    }

    fn write(&self, value: &Value, capacity: usize) -> TagResult<Fit> {
        let content = value.as_str().ok_or(TagError::TypeMismatch {
            expected: DataType::String,
            found: value.datatype(),
        })?;
        let bounded = bounded_str(content, capacity);
        let inner = self.0.borrow_mut().set(bounded)?;
        Ok(combine(content.len(), bounded.len(), inner))
    }

    fn clear(&self) -> TagResult<()> {
        self.0.borrow_mut().clear();
        Ok(())
    }
}

/// Shared host byte buffer descriptor
///
/// Backs bytes tags. An unallocated or zero-length buffer reads as null.
#[derive(Clone, Debug)]
pub struct HostBytes(Rc<RefCell<ByteBuffer>>);

impl HostBytes {
    pub fn with_capacity(capacity: usize) -> TagResult<Self> {
        Ok(HostBytes(Rc::new(RefCell::new(ByteBuffer::with_capacity(
            capacity,
        )?))))
    }

    /// Host buffer of `capacity` initialised with `content`
    pub fn new(content: &[u8], capacity: usize) -> TagResult<Self> {
        let host = HostBytes::with_capacity(capacity)?;
        if !content.is_empty() {
            host.set(content)?;
        }
        Ok(host)
    }

    pub fn get(&self) -> Vec<u8> {
        self.0.borrow().as_slice().to_vec()
    }

    pub fn set(&self, content: &[u8]) -> TagResult<Fit> {
        self.0.borrow_mut().set(content)
    }

    pub fn capacity(&self) -> usize {
        self.0.borrow().capacity()
    }
}

impl HostVariable for HostBytes {
    fn supports(&self, datatype: DataType) -> bool {
        datatype == DataType::Bytes
    }

    fn read(&self, datatype: DataType) -> Option<Value> {
        let buffer = self.0.borrow();
        if datatype != DataType::Bytes || buffer.is_empty() {
            return None;
        }
        Value::bytes(buffer.as_slice()).ok()
    }

    fn read_into(&self, datatype: DataType, target: &mut Value) -> TagResult<Option<Fit>> {
        let buffer = self.0.borrow();
        if datatype != DataType::Bytes || buffer.is_empty() {
            return Ok(None);
        }
        match target {
            Value::Bytes(dst) => dst.copy_from(&buffer).map(Some),
            other => Err(TagError::TypeMismatch {
                expected: DataType::Bytes,
                found: other.datatype(),
            }),
        }
    }

    fn write(&self, value: &Value, capacity: usize) -> TagResult<Fit> {
        let content = value.as_bytes().ok_or(TagError::TypeMismatch {
            expected: DataType::Bytes,
            found: value.datatype(),
        })?;
        let bounded = &content[..content.len().min(capacity)];
        let inner = self.0.borrow_mut().set(bounded)?;
        Ok(combine(content.len(), bounded.len(), inner))
    }

    fn clear(&self) -> TagResult<()> {
        self.0.borrow_mut().clear();
        Ok(())
    }
}
