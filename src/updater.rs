//! Atomic read-modify-write operations on a single field of a
//! [`ManagedObject`], coupled to the collector's write barrier.
//!
//! Every operation here follows the same two steps: one atomic instruction on
//! the field's word (acquire-release ordering), then, if that instruction
//! stored a reference, one call to [`WriteBarrier::notify_field_write`].  The
//! barrier call is sequenced after the atomic write and before the operation
//! returns, so no caller can observe the result of a reference store whose
//! edge the collector has not been told about yet.
//!
//! Nothing here blocks.  A compare-and-swap that loses a race simply reports
//! `false`; the retrying operations (`update_field`, `fetch_and_add_field`)
//! are lock-free rather than wait-free.
use crossbeam_utils::atomic::AtomicCell;
use log::{trace, warn};

use crate::{
    barrier::{NoBarrier, WriteBarrier},
    config::UpdaterConfig,
    error::FieldError,
    object::ManagedObject,
    value::Value,
};

pub struct FieldUpdater<B> {
    barrier: B,
    config: UpdaterConfig,
}

impl Default for FieldUpdater<NoBarrier> {
    fn default() -> Self {
        Self::new(NoBarrier)
    }
}

impl<B: WriteBarrier> FieldUpdater<B> {
    pub fn new(barrier: B) -> Self {
        Self::with_config(barrier, UpdaterConfig::default())
    }

    pub fn with_config(barrier: B, config: UpdaterConfig) -> Self {
        Self { barrier, config }
    }

    pub fn barrier(&self) -> &B {
        &self.barrier
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// Atomically replaces field `index` of `obj` with `desired` if it holds
    /// exactly `expected`.
    ///
    /// Returns `Ok(true)` if the swap happened and `Ok(false)` if the field held
    /// something else, in which case it is left untouched.  Of any number of
    /// racing calls that expect the same current value, at most one succeeds.
    ///
    /// On success, when `desired` is a reference, the barrier is told about
    /// `(obj, index, desired)` before this returns.
    ///
    /// Retry loops should re-read the field with [`load_field`](Self::load_field)
    /// after a `false` and recompute `desired` from the fresh value.
    pub fn compare_and_swap_field(
        &self,
        obj: &ManagedObject,
        index: usize,
        expected: Value,
        desired: Value,
    ) -> Result<bool, FieldError> {
        let slot = self.slot(obj, index)?;
        Ok(self.cas_slot(obj, slot, index, expected, desired))
    }

    /// [`compare_and_swap_field`](Self::compare_and_swap_field) without the
    /// index check, for callers that validated the index themselves.
    ///
    /// # Safety
    ///
    /// `index < obj.field_count()`.
    pub unsafe fn compare_and_swap_field_unchecked(
        &self,
        obj: &ManagedObject,
        index: usize,
        expected: Value,
        desired: Value,
    ) -> bool {
        let slot = unsafe { obj.slot_unchecked(index) };
        self.cas_slot(obj, slot, index, expected, desired)
    }

    pub fn load_field(&self, obj: &ManagedObject, index: usize) -> Result<Value, FieldError> {
        Ok(self.slot(obj, index)?.load())
    }

    /// Atomic store.  Barrier rules are the same as for a successful
    /// compare-and-swap.
    pub fn store_field(&self, obj: &ManagedObject, index: usize, value: Value) -> Result<(), FieldError> {
        self.slot(obj, index)?.store(value);
        self.after_write(obj, index, value);
        Ok(())
    }

    /// Atomic swap; returns the value that was replaced.
    pub fn exchange_field(&self, obj: &ManagedObject, index: usize, value: Value) -> Result<Value, FieldError> {
        let previous = self.slot(obj, index)?.swap(value);
        self.after_write(obj, index, value);
        Ok(previous)
    }

    /// Compare-and-swap retry loop on one field.
    ///
    /// `func` gets a copy of the current value and returns `(commit, result)`.
    /// If `commit` is false nothing is written and `result` is returned.
    /// Otherwise the modified copy is compare-and-swapped against the value
    /// `func` was shown; on a lost race the field is re-read and `func` runs
    /// again.  The barrier runs once, after the swap that succeeds.
    ///
    /// `func` may run many times and must not have side effects beyond
    /// computing its return value.  Values are plain words, so unlike
    /// [`atomic_try_update`](crate::atomic_try_update) a stale input cannot
    /// cause unsoundness here, only a wasted iteration.
    pub fn update_field<F, R>(&self, obj: &ManagedObject, index: usize, mut func: F) -> Result<R, FieldError>
    where
        F: FnMut(&mut Value) -> (bool, R),
    {
        let slot = self.slot(obj, index)?;
        let mut old = slot.load();
        let mut failures: u32 = 0;
        loop {
            let mut new = old;
            let (commit, result) = func(&mut new);
            if !commit {
                return Ok(result);
            }
            match slot.compare_exchange(old, new) {
                Ok(_) => {
                    self.after_write(obj, index, new);
                    return Ok(result);
                }
                Err(current) => {
                    old = current;
                    failures = failures.saturating_add(1);
                    if failures == self.config.contention_warn_threshold {
                        warn!(
                            "field {} of {:p} still contended after {} compare-and-swap attempts",
                            index, obj, failures
                        );
                    }
                }
            }
        }
    }

    /// Adds `delta` to the immediate integer in field `index` and returns the
    /// integer it held before.  Wraps on overflow of the immediate range.
    ///
    /// Fails with `NotAnInteger` without writing if the field holds a
    /// reference or the empty word.
    pub fn fetch_and_add_field(&self, obj: &ManagedObject, index: usize, delta: isize) -> Result<isize, FieldError> {
        self.update_field(obj, index, |value| match value.as_int() {
            Some(n) => {
                *value = Value::int(n.wrapping_add(delta));
                (true, Ok(n))
            }
            None => (false, Err(FieldError::NotAnInteger { index, value: *value })),
        })?
    }

    fn slot<'o>(&self, obj: &'o ManagedObject, index: usize) -> Result<&'o AtomicCell<Value>, FieldError> {
        if self.config.bounds_check {
            obj.slot(index).ok_or(FieldError::IndexOutOfRange {
                index,
                field_count: obj.field_count(),
            })
        } else {
            Ok(obj.slot_or_trap(index))
        }
    }

    fn cas_slot(
        &self,
        obj: &ManagedObject,
        slot: &AtomicCell<Value>,
        index: usize,
        expected: Value,
        desired: Value,
    ) -> bool {
        match slot.compare_exchange(expected, desired) {
            Ok(_) => {
                self.after_write(obj, index, desired);
                true
            }
            Err(_) => false,
        }
    }

    fn after_write(&self, obj: &ManagedObject, index: usize, written: Value) {
        if written.is_reference() {
            trace!("write barrier: {:p}[{}] <- {:?}", obj, index, written);
            self.barrier.notify_field_write(obj, index, written);
        }
    }
}
