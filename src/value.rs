//! The tagged machine word stored in every field of a [`ManagedObject`].
//!
//! The low bit tells the collector what it is looking at:
//!
//! ```text
//!  ...nnnnnnn1   immediate integer, n = value >> 1 (one bit narrower than isize)
//!  ...aaaaaaa0   reference to a ManagedObject (address, never zero)
//!  0000...0000   EMPTY, never traced
//! ```
//!
//! Only references are edges in the object graph, so only they need a
//! write barrier.

use std::{fmt, ptr::NonNull};

use crate::object::ManagedObject;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Value(usize);

impl Value {
    const INT_TAG: usize = 0b1;

    /// The zero word.  Not an integer and not a reference.
    pub const EMPTY: Value = Value(0);
    pub const UNIT: Value = Value::int(0);
    pub const FALSE: Value = Value::int(0);
    pub const TRUE: Value = Value::int(1);

    /// Tags `n` as an immediate.  The top bit of `n` does not survive.
    pub const fn int(n: isize) -> Value {
        Value(((n << 1) as usize) | Self::INT_TAG)
    }

    pub const fn from_bool(b: bool) -> Value {
        if b {
            Value::TRUE
        } else {
            Value::FALSE
        }
    }

    pub fn from_object(obj: &ManagedObject) -> Value {
        let addr = obj as *const ManagedObject as usize;
        debug_assert_eq!(addr & Self::INT_TAG, 0);
        Value(addr)
    }

    /// Reinterprets a word received from foreign code.
    pub const fn from_raw(bits: usize) -> Value {
        Value(bits)
    }

    pub const fn to_raw(self) -> usize {
        self.0
    }

    pub const fn is_int(self) -> bool {
        self.0 & Self::INT_TAG == Self::INT_TAG
    }

    pub const fn is_reference(self) -> bool {
        self.0 & Self::INT_TAG == 0 && self.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn as_int(self) -> Option<isize> {
        if self.is_int() {
            Some((self.0 as isize) >> 1)
        } else {
            None
        }
    }

    /// Zero is false, any other integer is true.
    pub const fn as_bool(self) -> Option<bool> {
        match self.as_int() {
            Some(n) => Some(n != 0),
            None => None,
        }
    }

    pub fn as_ptr(self) -> Option<NonNull<ManagedObject>> {
        if self.is_reference() {
            NonNull::new(self.0 as *mut ManagedObject)
        } else {
            None
        }
    }

    /// Follows a reference.
    ///
    /// # Safety
    ///
    /// The referent must still be alive for `'a`: the caller holds a root
    /// to it, or the collector cannot run for the duration of the borrow.
    pub unsafe fn as_object<'a>(self) -> Option<&'a ManagedObject> {
        self.as_ptr().map(|ptr| unsafe { &*ptr.as_ptr() })
    }
}

impl From<isize> for Value {
    fn from(n: isize) -> Self {
        Value::int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::from_bool(b)
    }
}

impl<'a> From<&'a ManagedObject> for Value {
    fn from(obj: &'a ManagedObject) -> Self {
        Value::from_object(obj)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(n) = self.as_int() {
            write!(f, "Int({n})")
        } else if self.is_empty() {
            write!(f, "Empty")
        } else {
            write!(f, "Ref({:#x})", self.0)
        }
    }
}
