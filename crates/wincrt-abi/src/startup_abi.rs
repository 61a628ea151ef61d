//! CRT startup ABI plumbing.
//!
//! Exposes the table walkers the entry trampolines call on the linker-collected
//! `.CRT$X?A`..`.CRT$X?Z` ranges, plus the app-type latch set before `main`.

use std::ffi::c_int;
use std::sync::atomic::{AtomicI32, Ordering};

use wincrt_core::startup::{AppType, run_checked_initializers, run_initializers};

use crate::startup_helpers::{Pifv, Pvfv, app_type_from_raw, table_slice};

static APP_TYPE: AtomicI32 = AtomicI32::new(AppType::Console as i32);

/// Invoke every non-null slot in `[first, last)`.
#[cfg_attr(feature = "export-symbols", unsafe(no_mangle))]
pub unsafe extern "C" fn _initterm(first: *const Pvfv, last: *const Pvfv) {
    // SAFETY: the caller passes the bounds of a linker-collected table.
    let table = unsafe { table_slice(first, last) };
    run_initializers(table.iter().map(|slot| slot.map(|f| move || f())));
}

/// Invoke non-null slots in `[first, last)` until one returns non-zero.
///
/// Returns 0 when every initializer succeeded, otherwise the failing code.
#[cfg_attr(feature = "export-symbols", unsafe(no_mangle))]
pub unsafe extern "C" fn _initterm_e(first: *const Pifv, last: *const Pifv) -> c_int {
    // SAFETY: the caller passes the bounds of a linker-collected table.
    let table = unsafe { table_slice(first, last) };
    match run_checked_initializers(table.iter().map(|slot| slot.map(|f| move || f()))) {
        Ok(_) => 0,
        Err(err) => err.code(),
    }
}

/// Record the image flavour the entry trampoline was built for.
#[cfg_attr(feature = "export-symbols", unsafe(no_mangle))]
pub unsafe extern "C" fn __set_app_type(app_type: c_int) {
    APP_TYPE.store(app_type_from_raw(app_type).as_raw(), Ordering::Release);
}

/// Raw value last stored by [`__set_app_type`] (console by default).
#[cfg_attr(feature = "export-symbols", unsafe(no_mangle))]
pub unsafe extern "C" fn __wincrt_app_type() -> c_int {
    APP_TYPE.load(Ordering::Acquire)
}

/// Typed view of the app-type latch.
#[must_use]
pub fn current_app_type() -> AppType {
    app_type_from_raw(APP_TYPE.load(Ordering::Acquire))
}
