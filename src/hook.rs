//! A wait-free, install-once slot for the process-wide write barrier.
//!
//! The runtime installs its collector's hook during startup with
//! [`install_write_barrier`].  Foreign calls, which cannot carry a barrier
//! value of their own, reach it through [`GlobalBarrier`].
//!
//! Reading the slot while it is still empty *seals* it.  From then on
//! installs fail with [`HookError::Sealed`]: reference stores have already
//! happened without a barrier, and a collector that trusted its remembered
//! set after that point would miss edges.
use std::marker::PhantomData;
use std::ptr::null_mut;

use log::debug;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{
    atomic_try_update, barrier::WriteBarrier, error::HookError, object::ManagedObject,
    value::Value, Atom,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(usize)]
enum Lifecycle {
    Empty = 0,
    Installed,
    Sealed,
    Dead,
}

/// Keeps the three low bits of the hook's address free for the lifecycle.
#[repr(align(8))]
struct Aligned<T> {
    hook: T,
}

/// Hook address in the high bits, `Lifecycle` in the low three.
struct SlotWord<T> {
    bits: usize,
    _hook: PhantomData<T>,
}

impl<T> SlotWord<T> {
    const MASK: usize = 0b111;

    fn lifecycle(&self) -> Lifecycle {
        match Lifecycle::try_from(self.bits & Self::MASK) {
            Ok(Lifecycle::Dead) => panic!("write barrier slot used after it was dropped"),
            Ok(lifecycle) => lifecycle,
            Err(_) => panic!("torn read of write barrier slot"),
        }
    }

    fn hook(&self) -> *mut Aligned<T> {
        (self.bits & !Self::MASK) as *mut Aligned<T>
    }

    fn set(&mut self, lifecycle: Lifecycle, hook: *mut Aligned<T>) {
        let addr = hook as usize;
        assert_eq!(addr & Self::MASK, 0);
        self.bits = addr | usize::from(lifecycle);
    }
}

pub struct HookSlot<T> {
    word: Atom<SlotWord<T>, usize>,
    /// Ties the slot's Send/Sync to `T`'s; `Atom` itself claims both.
    _owns: PhantomData<Box<T>>,
}

impl<T> HookSlot<T> {
    pub const fn new() -> Self {
        Self {
            word: Atom::zeroed(),
            _owns: PhantomData,
        }
    }
}

impl<T> Default for HookSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync> HookSlot<T> {
    /// Stores `hook` if the slot is empty.  Wait free.
    ///
    /// On error `hook` is dropped.
    pub fn install(&self, hook: T) -> Result<&T, HookError> {
        let ptr = Box::into_raw(Box::new(Aligned { hook }));
        let installed = unsafe {
            atomic_try_update(&self.word, |w| match w.lifecycle() {
                Lifecycle::Empty => {
                    w.set(Lifecycle::Installed, ptr);
                    (true, Ok(()))
                }
                Lifecycle::Installed => (false, Err(HookError::AlreadyInstalled)),
                Lifecycle::Sealed | Lifecycle::Dead => (false, Err(HookError::Sealed)),
            })
        };
        match installed {
            Ok(()) => Ok(unsafe { &(*ptr).hook }),
            Err(err) => {
                drop(unsafe { Box::from_raw(ptr) });
                Err(err)
            }
        }
    }

    /// The installed hook, if any.  Never seals.
    pub fn get(&self) -> Option<&T> {
        unsafe {
            atomic_try_update(&self.word, |w| match w.lifecycle() {
                Lifecycle::Installed => (false, w.hook()),
                _ => (false, null_mut()),
            })
            .as_ref()
            .map(|aligned| &aligned.hook)
        }
    }

    /// The installed hook, or `None` after sealing the slot against any
    /// later install.
    pub fn get_or_seal(&self) -> Option<&T> {
        let (hook, sealed_now) = unsafe {
            atomic_try_update(&self.word, |w| match w.lifecycle() {
                Lifecycle::Empty => {
                    w.set(Lifecycle::Sealed, null_mut());
                    (true, (null_mut(), true))
                }
                Lifecycle::Installed => (false, (w.hook(), false)),
                _ => (false, (null_mut(), false)),
            })
        };
        if sealed_now {
            debug!("write barrier slot sealed with no hook installed");
        }
        unsafe { hook.as_ref() }.map(|aligned| &aligned.hook)
    }

    pub fn seal(&self) {
        self.get_or_seal();
    }

    pub fn is_sealed(&self) -> bool {
        unsafe { atomic_try_update(&self.word, |w| (false, w.lifecycle() == Lifecycle::Sealed)) }
    }
}

impl<T> Drop for HookSlot<T> {
    fn drop(&mut self) {
        let hook = unsafe {
            atomic_try_update(&self.word, |w| {
                let hook = match w.lifecycle() {
                    Lifecycle::Installed => w.hook(),
                    _ => null_mut(),
                };
                w.set(Lifecycle::Dead, null_mut());
                (true, hook)
            })
        };
        if !hook.is_null() {
            drop(unsafe { Box::from_raw(hook) });
        }
    }
}

static WRITE_BARRIER: HookSlot<Box<dyn WriteBarrier>> = HookSlot::new();

/// Installs the process-wide barrier used by [`GlobalBarrier`].
pub fn install_write_barrier<B>(barrier: B) -> Result<(), HookError>
where
    B: WriteBarrier + 'static,
{
    WRITE_BARRIER.install(Box::new(barrier))?;
    debug!("installed process-wide write barrier");
    Ok(())
}

/// The process-wide barrier.  Seals the slot if nothing is installed yet.
pub fn write_barrier() -> Option<&'static dyn WriteBarrier> {
    WRITE_BARRIER.get_or_seal().map(|hook| &**hook)
}

/// Declares that the runtime runs without a write barrier.
pub fn seal_write_barrier() {
    WRITE_BARRIER.seal();
}

/// Forwards to whatever [`install_write_barrier`] installed.
///
/// A reference store made through it while nothing is installed seals the
/// slot.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalBarrier;

impl WriteBarrier for GlobalBarrier {
    fn notify_field_write(&self, container: &ManagedObject, index: usize, referent: Value) {
        if let Some(hook) = write_barrier() {
            hook.notify_field_write(container, index, referent);
        }
    }
}
