//! Change detection
//!
//! A [`ChangeDetector`] decides whether a new observation counts as a
//! change. It is only consulted when both snapshots are non-null and of the
//! same datatype; first observations and null transitions are decided
//! before the detector is reached (see [`evaluate`]).

use sparktag_core::{Snapshot, Value};

/// Per-tag change comparator
pub trait ChangeDetector {
    /// Return true if `incoming` should replace `current`
    fn changed(&mut self, current: &Snapshot, incoming: &Snapshot) -> bool;
}

impl<F> ChangeDetector for F
where
    F: FnMut(&Snapshot, &Snapshot) -> bool,
{
    fn changed(&mut self, current: &Snapshot, incoming: &Snapshot) -> bool {
        self(current, incoming)
    }
}

/// Exact inequality: numeric for scalars, content for strings and bytes
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultDetector;

impl ChangeDetector for DefaultDetector {
    fn changed(&mut self, current: &Snapshot, incoming: &Snapshot) -> bool {
        values_differ(&current.value, &incoming.value)
    }
}

/// Default comparison between two values of the same datatype
///
/// Floats compare with `!=`, so NaN always reads as changed.
pub fn values_differ(current: &Value, incoming: &Value) -> bool {
    match (current, incoming) {
        (Value::Int8(a), Value::Int8(b)) => a != b,
        (Value::Int16(a), Value::Int16(b)) => a != b,
        (Value::Int32(a), Value::Int32(b)) => a != b,
        (Value::Int64(a), Value::Int64(b)) => a != b,
        (Value::UInt8(a), Value::UInt8(b)) => a != b,
        (Value::UInt16(a), Value::UInt16(b)) => a != b,
        (Value::UInt32(a), Value::UInt32(b)) => a != b,
        (Value::UInt64(a), Value::UInt64(b)) | (Value::DateTime(a), Value::DateTime(b)) => a != b,
        (Value::Float(a), Value::Float(b)) => a != b,
        (Value::Double(a), Value::Double(b)) => a != b,
        (Value::Boolean(a), Value::Boolean(b)) => a != b,
        (Value::String(a), Value::String(b))
        | (Value::Text(a), Value::Text(b))
        | (Value::Uuid(a), Value::Uuid(b)) => a.as_bytes() != b.as_bytes(),
        (Value::Bytes(a), Value::Bytes(b)) => {
            a.len() != b.len() || a.as_slice() != b.as_slice()
        }
        // Mixed kinds never reach a detector; treat as changed regardless
        _ => true,
    }
}

/// Numeric deadband: changes within `tolerance` are ignored
///
/// The comparison is against the last reported value, so slow drift is
/// reported once it accumulates past the tolerance. Non-numeric kinds fall
/// back to [`values_differ`].
#[derive(Clone, Copy, Debug)]
pub struct Deadband {
    tolerance: f64,
}

impl Deadband {
    pub fn new(tolerance: f64) -> Self {
        Deadband {
            tolerance: tolerance.abs(),
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

impl ChangeDetector for Deadband {
    fn changed(&mut self, current: &Snapshot, incoming: &Snapshot) -> bool {
        if !current.datatype().is_numeric() {
            return values_differ(&current.value, &incoming.value);
        }
        // Integers compare exactly; a difference is an integer, so it
        // exceeds the tolerance iff it exceeds the tolerance's floor.
        if let (Some(a), Some(b)) = (current.value.as_i128(), incoming.value.as_i128()) {
            return a.abs_diff(b) > self.tolerance as u128;
        }
        match (current.value.as_f64(), incoming.value.as_f64()) {
            (Some(a), Some(b)) if a.is_finite() && b.is_finite() => (a - b).abs() > self.tolerance,
            _ => values_differ(&current.value, &incoming.value),
        }
    }
}

/// Report every observation as a change
#[derive(Clone, Copy, Debug, Default)]
pub struct ReportAlways;

impl ChangeDetector for ReportAlways {
    fn changed(&mut self, _current: &Snapshot, _incoming: &Snapshot) -> bool {
        true
    }
}

/// Decide whether `incoming` is a change relative to `current`
///
/// - A never-observed `current` is always a change (seeds initial state)
/// - A null/non-null transition in either direction is always a change
/// - Two nulls are never a change
/// - Otherwise the detector decides
pub fn evaluate(current: &Snapshot, incoming: &Snapshot, detector: &mut dyn ChangeDetector) -> bool {
    if !current.is_observed() {
        return true;
    }
    if current.is_null || incoming.is_null {
        return current.is_null != incoming.is_null;
    }
    if current.datatype() != incoming.datatype() {
        return true;
    }
    detector.changed(current, incoming)
}
