//! Read/write dispatch between host memory and a tag's snapshots

use std::mem;

use sparktag_core::{Fit, Snapshot, TagError, TagResult, Timestamp};
use tracing::{debug, trace, warn};

use crate::{evaluate, Tag};

impl Tag {
    /// Observe the host variable at `timestamp`
    ///
    /// Returns true if the observation counts as a change. On a change the
    /// current snapshot moves to previous, the observation becomes current,
    /// the changed flag is set and the on-change callback fires. Without a
    /// change only the last-read timestamp and the changed flag are updated.
    pub fn read(&mut self, timestamp: Timestamp) -> bool {
        self.last_read = timestamp;
        self.observe(timestamp);

        let changed = evaluate(&self.current, &self.incoming, self.detector.as_mut());
        self.changed = changed;
        if !changed {
            return false;
        }

        // All three snapshots share one capacity, so rotating them is the
        // bounded copy previous <- current <- incoming.
        mem::swap(&mut self.previous, &mut self.current);
        mem::swap(&mut self.current, &mut self.incoming);

        trace!(
            tag = %self.name,
            alias = self.alias,
            null = self.current.is_null,
            timestamp = self.current.timestamp.as_millis(),
            "tag changed"
        );

        if let Some(mut callback) = self.on_change.take() {
            callback(self);
            self.on_change = Some(callback);
        }
        true
    }

    /// Fill the scratch snapshot from the host variable
    fn observe(&mut self, timestamp: Timestamp) {
        let incoming = &mut self.incoming;
        incoming.timestamp = timestamp;

        let observed = match self.host.as_ref() {
            Some(host) => host.read_into(self.datatype, &mut incoming.value),
            None => Ok(None),
        };

        match observed {
            Ok(Some(fit)) => {
                incoming.is_null = false;
                if fit.is_truncated() {
                    debug!(tag = %self.name, ?fit, "host value exceeds tag capacity");
                }
            }
            Ok(None) => {
                incoming.is_null = true;
                incoming.value.clear();
            }
            Err(e) => {
                // Zero capacity or a host of the wrong kind: unreadable
                debug!(tag = %self.name, error = %e, "host value unreadable");
                incoming.is_null = true;
                incoming.value.clear();
            }
        }
    }

    /// Write `value` through to the host variable
    ///
    /// Rejected without side effects when the tag is unbound, not writable,
    /// of another datatype, vetoed by the validation callback, or a buffer
    /// kind declared with zero capacity. A null or empty value for a buffer
    /// kind zero-fills the host. The returned [`Fit`] reports truncation of
    /// overlong content.
    pub fn write(&mut self, value: &Snapshot) -> TagResult<Fit> {
        let host = self.host.as_ref().ok_or(TagError::HostUnbound)?;
        if !self.access.is_writable() {
            return Err(TagError::NotWritable);
        }
        if value.datatype() != self.datatype {
            return Err(TagError::TypeMismatch {
                expected: self.datatype,
                found: value.datatype(),
            });
        }
        if let Some(validate) = self.validate_write.as_mut() {
            if !validate(value) {
                return Err(TagError::WriteRejected);
            }
        }

        if self.datatype.is_buffered() {
            if self.capacity == 0 {
                return Err(TagError::ZeroCapacity);
            }
            if value.is_null_or_empty() {
                host.clear()?;
                return Ok(Fit::Complete);
            }
        } else if value.is_null {
            return Err(TagError::NullScalar);
        }

        let fit = host.write(&value.value, self.capacity)?;
        if fit.is_truncated() {
            warn!(tag = %self.name, alias = self.alias, ?fit, "write truncated");
        }
        Ok(fit)
    }
}
