//! Heap blocks owned by the collector.
//!
//! A [`ManagedObject`] is a header followed by a fixed number of one-word
//! fields.  This crate never allocates or frees objects on behalf of the
//! runtime; constructors exist so the runtime binding (and tests) can build
//! blocks with the layout the updater expects.

use std::fmt;

use crossbeam_utils::atomic::AtomicCell;

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    tag: u8,
    field_count: usize,
}

impl Header {
    pub fn tag(&self) -> u8 {
        self.tag
    }
    pub fn field_count(&self) -> usize {
        self.field_count
    }
}

/// Aligned to eight bytes so a reference to it never has the integer tag bit
/// set, whatever the target's pointer width.
#[repr(align(8))]
pub struct ManagedObject {
    header: Header,
    /// Boxed slice: the length is fixed for the life of the block.
    fields: Box<[AtomicCell<Value>]>,
}

impl ManagedObject {
    /// A block with every field set to `Value::UNIT`.
    pub fn new(tag: u8, field_count: usize) -> Self {
        Self::filled(tag, field_count, Value::UNIT)
    }

    pub fn filled(tag: u8, field_count: usize, init: Value) -> Self {
        Self::from_values(tag, std::iter::repeat(init).take(field_count))
    }

    pub fn from_values<I>(tag: u8, values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let fields: Box<[AtomicCell<Value>]> = values.into_iter().map(AtomicCell::new).collect();
        Self {
            header: Header {
                tag,
                field_count: fields.len(),
            },
            fields,
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn tag(&self) -> u8 {
        self.header.tag
    }

    pub fn field_count(&self) -> usize {
        self.header.field_count
    }

    pub fn as_value(&self) -> Value {
        Value::from_object(self)
    }

    /// Current contents of every field, each loaded atomically.  The vector as
    /// a whole is not a consistent snapshot if writers are running.
    pub fn fields(&self) -> Vec<Value> {
        self.fields.iter().map(AtomicCell::load).collect()
    }

    pub(crate) fn slot(&self, index: usize) -> Option<&AtomicCell<Value>> {
        self.fields.get(index)
    }

    /// Panics when `index` is out of range.
    pub(crate) fn slot_or_trap(&self, index: usize) -> &AtomicCell<Value> {
        &self.fields[index]
    }

    /// # Safety
    ///
    /// `index < self.field_count()`.
    pub(crate) unsafe fn slot_unchecked(&self, index: usize) -> &AtomicCell<Value> {
        debug_assert!(index < self.fields.len());
        unsafe { self.fields.get_unchecked(index) }
    }
}

impl fmt::Debug for ManagedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedObject")
            .field("addr", &(self as *const Self))
            .field("tag", &self.header.tag)
            .field("fields", &self.fields())
            .finish()
    }
}
