//! Barrier-aware atomic updates on the fields of garbage-collected objects.
//!
//! The central operation is [`FieldUpdater::compare_and_swap_field`]: replace
//! field `index` of a [`ManagedObject`] with `desired`, but only if it still
//! holds `expected`, and tell the collector about the new edge when `desired`
//! is a heap reference.  Lock-free data structures in the managed runtime are
//! built out of retry loops around that call.
//!
//! ```
//! use atomic_field_update::{FieldUpdater, ManagedObject, RememberedSet, Value};
//!
//! let remset = RememberedSet::new();
//! let updater = FieldUpdater::new(&remset);
//! let cell = ManagedObject::new(0, 2);
//! let target = ManagedObject::new(0, 0);
//!
//! assert_eq!(updater.compare_and_swap_field(&cell, 1, Value::UNIT, target.as_value()), Ok(true));
//! assert_eq!(updater.compare_and_swap_field(&cell, 1, Value::UNIT, Value::int(7)), Ok(false));
//! assert_eq!(remset.len(), 1);
//! ```
use std::marker::PhantomData;

// Field slots and `Atom` both go through AtomicCell.  For word-sized payloads
// it compiles down to the native compare-exchange; wider payloads would fall
// back to its internal lock, which is why everything here stays word-sized.
use crossbeam_utils::atomic::AtomicCell;

pub mod barrier;
pub mod config;
pub mod error;
pub mod ffi;
pub mod hook;
pub mod object;
pub mod remset;
pub mod updater;
pub mod value;

pub use barrier::{FnBarrier, NoBarrier, WriteBarrier};
pub use config::UpdaterConfig;
pub use error::{FieldError, HookError};
pub use hook::{install_write_barrier, seal_write_barrier, write_barrier, GlobalBarrier, HookSlot};
pub use object::{Header, ManagedObject};
pub use remset::{Edge, RememberedSet};
pub use updater::FieldUpdater;
pub use value::Value;

/// A word of shared state that is read as a `T` and compared as a `U`.
///
/// `T` is a plain-old-data view of the bits (a pointer plus tag bits, say),
/// `U` is the integer the hardware knows how to compare-and-swap.
pub struct Atom<T, U> {
    union: PhantomData<T>,
    inner: AtomicCell<U>,
}

impl<T, U> Atom<T, U>
where
    U: Default + Send,
{
    pub fn new() -> Atom<T, U> {
        Default::default()
    }
}

impl<T> Atom<T, usize> {
    /// Zero-initialized atom usable in a `static`.
    pub const fn zeroed() -> Atom<T, usize> {
        assert!(std::mem::size_of::<T>() <= std::mem::size_of::<usize>());
        Atom {
            union: PhantomData,
            inner: AtomicCell::new(0),
        }
    }
}

impl<T, U> Default for Atom<T, U>
where
    U: Default + Send,
{
    fn default() -> Self {
        assert!(std::mem::size_of::<T>() <= std::mem::size_of::<U>());
        assert!(
            std::mem::size_of::<U>() <= 4
                || std::mem::size_of::<T>() > std::mem::size_of::<U>() / 2
        );
        Self {
            union: Default::default(),
            inner: Default::default(),
        }
    }
}

// TODO: Bound T so that only pointer-and-tag layouts qualify; today any T
// that fits in U is accepted.
unsafe impl<T, U> Sync for Atom<T, U> {}
unsafe impl<T, U> Send for Atom<T, U> {}

/// Compare-and-swap loop over an [`Atom`].
///
/// Loads the word, reinterprets its bits as a `T`, and hands a mutable copy to
/// `func`.  `func` returns `(commit, result)`.  With `commit == false` the loop
/// stops and `result` is returned without writing anything.  With
/// `commit == true` the modified copy is compare-and-swapped against the word
/// that was loaded; if another thread got there first the loop reloads and
/// calls `func` again.
///
/// # Safety
///
/// `func` is handed a `T` built from raw bits, and may be handed stale bits on
/// any iteration but the last.  Callers must make sure that:
///
/// 1. `func` has no side effects that survive a retry, and tolerates stale
///    input without crashing.
/// 2. Nothing `func` computes from a speculative read escapes the iteration
///    that computed it; only the `result` of the committing (or aborting)
///    iteration reaches the caller.
/// 3. Every value `func` reads outside of the `T` it was handed is either
///    immutable or guaranteed to still hold the observed bits when the
///    compare-and-swap succeeds.  The CAS only validates the word itself.
///
/// Ownership carried in `T` (a `Box`, for instance) is not tracked: if `func`
/// overwrites an owning value the old one is leaked or double-freed.
pub unsafe fn atomic_try_update<T, U, F, R>(state: &Atom<T, U>, func: F) -> R
where
    F: Fn(&mut T) -> (bool, R),
    U: Copy + Eq,
{
    let mut old = state.inner.load();
    let mut newval = old;
    loop {
        let newval_ptr: *mut U = &mut newval;
        let res;
        unsafe {
            let newval_ptr: *mut T = newval_ptr as *mut T;
            res = func(&mut *newval_ptr);
            if !res.0 {
                return res.1;
            }
        }
        match state.inner.compare_exchange(old, newval) {
            Ok(_) => return res.1,
            Err(val) => {
                old = val;
                newval = old;
            }
        }
    }
}
