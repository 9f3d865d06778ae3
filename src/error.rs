//! Errors reported by field updates and by the barrier hook slot.
//!
//! A losing compare-and-swap is not an error; it is `Ok(false)`.  Everything
//! here points at a bug in the caller and is never retried.

use thiserror::Error;

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FieldError {
    /// Reported before any memory is touched.
    #[error("field index {index} out of range for object with {field_count} fields")]
    IndexOutOfRange { index: usize, field_count: usize },

    /// Integer arithmetic was requested on a field holding a reference (or
    /// the empty word).  The field is left as it was.
    #[error("field {index} holds {value:?}, not an immediate integer")]
    NotAnInteger { index: usize, value: Value },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HookError {
    #[error("a write barrier hook is already installed")]
    AlreadyInstalled,

    /// The slot was read while empty, so writes have already gone out with
    /// no barrier.  Installing now would leave the collector with a partial
    /// view of the heap.
    #[error("the write barrier hook slot was sealed before a hook was installed")]
    Sealed,
}
