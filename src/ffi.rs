//! Entry points for foreign calls from managed code.
//!
//! Managed code passes every argument as a tagged [`Value`], including the
//! field index, and expects tagged results back.  This module unboxes the
//! index, forwards to a [`FieldUpdater`] that uses the process-wide
//! [`GlobalBarrier`], and boxes the boolean outcome.  Raw object pointers
//! appear nowhere else in the crate.
//!
//! Contract violations (a null object, an index that is not a non-negative
//! immediate or is out of range) abort the process: there is no managed
//! exception to raise from here and unwinding across the boundary is not an
//! option.
use log::error;

use crate::{hook::GlobalBarrier, object::ManagedObject, updater::FieldUpdater, value::Value};

fn updater() -> FieldUpdater<GlobalBarrier> {
    FieldUpdater::new(GlobalBarrier)
}

fn unbox_index(field: Value) -> usize {
    match field.as_int().map(usize::try_from) {
        Some(Ok(index)) => index,
        _ => {
            error!("foreign call passed {:?} as a field index", field);
            std::process::abort();
        }
    }
}

unsafe fn deref_object<'a>(obj: *const ManagedObject) -> &'a ManagedObject {
    match unsafe { obj.as_ref() } {
        Some(obj) => obj,
        None => {
            error!("foreign call passed a null object");
            std::process::abort();
        }
    }
}

/// `compare_and_swap_field(obj, field, oldval, newval)` for managed code.
///
/// Returns `Value::TRUE` if the field held `oldval` and now holds `newval`,
/// `Value::FALSE` otherwise.
///
/// # Safety
///
/// `obj` must point to a live `ManagedObject` that stays alive for the
/// duration of the call.
#[no_mangle]
pub unsafe extern "C" fn afu_compare_and_swap_field(
    obj: *const ManagedObject,
    field: Value,
    oldval: Value,
    newval: Value,
) -> Value {
    let obj = unsafe { deref_object(obj) };
    let index = unbox_index(field);
    match updater().compare_and_swap_field(obj, index, oldval, newval) {
        Ok(swapped) => Value::from_bool(swapped),
        Err(err) => {
            error!("foreign compare-and-swap on {:p}: {}", obj, err);
            std::process::abort();
        }
    }
}

/// Tagged field count of `obj`.
///
/// # Safety
///
/// `obj` must point to a live `ManagedObject`.
#[no_mangle]
pub unsafe extern "C" fn afu_field_count(obj: *const ManagedObject) -> Value {
    let obj = unsafe { deref_object(obj) };
    Value::int(obj.field_count() as isize)
}
