//! The collector's write-barrier hook.
//!
//! Generational and concurrent collectors assume they see every store of a
//! reference into a heap object.  A compare-and-swap that installs a
//! reference is such a store, so the updater reports it through
//! [`WriteBarrier`] once the new word is in place.
use std::sync::Arc;

use crate::{object::ManagedObject, value::Value};

/// Implemented by the collector (or by a recorder standing in for it).
///
/// Called on whichever mutator thread performed the write, after the new
/// word is visible and before the write operation returns.  Implementations
/// must be lock-free: the updater's own progress guarantee only holds if the
/// hook cannot block.
pub trait WriteBarrier: Send + Sync {
    /// `referent` is the reference now stored at `container.fields[index]`.
    /// It is always a reference, never an immediate.
    fn notify_field_write(&self, container: &ManagedObject, index: usize, referent: Value);
}

/// For collectors that do not need to hear about stores, such as a
/// non-generational stop-the-world collector.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBarrier;

impl WriteBarrier for NoBarrier {
    fn notify_field_write(&self, _container: &ManagedObject, _index: usize, _referent: Value) {}
}

/// Adapts a closure into a barrier.
///
/// ```
/// # use atomic_field_update::{FnBarrier, FieldUpdater, ManagedObject};
/// # use std::sync::atomic::{AtomicUsize, Ordering};
/// let calls = AtomicUsize::new(0);
/// let updater = FieldUpdater::new(FnBarrier::new(|_, _, _| {
///     calls.fetch_add(1, Ordering::Relaxed);
/// }));
/// # let obj = ManagedObject::new(0, 1);
/// # updater.store_field(&obj, 0, obj.as_value()).unwrap();
/// # assert_eq!(calls.load(Ordering::Relaxed), 1);
/// ```
pub struct FnBarrier<F>(pub F);

impl<F> FnBarrier<F>
where
    F: Fn(&ManagedObject, usize, Value) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        FnBarrier(f)
    }
}

impl<F> WriteBarrier for FnBarrier<F>
where
    F: Fn(&ManagedObject, usize, Value) + Send + Sync,
{
    fn notify_field_write(&self, container: &ManagedObject, index: usize, referent: Value) {
        (self.0)(container, index, referent)
    }
}

impl<B: WriteBarrier + ?Sized> WriteBarrier for &B {
    fn notify_field_write(&self, container: &ManagedObject, index: usize, referent: Value) {
        (**self).notify_field_write(container, index, referent)
    }
}

impl<B: WriteBarrier + ?Sized> WriteBarrier for Box<B> {
    fn notify_field_write(&self, container: &ManagedObject, index: usize, referent: Value) {
        (**self).notify_field_write(container, index, referent)
    }
}

impl<B: WriteBarrier + ?Sized> WriteBarrier for Arc<B> {
    fn notify_field_write(&self, container: &ManagedObject, index: usize, referent: Value) {
        (**self).notify_field_write(container, index, referent)
    }
}
