//! ABI entry points for process-exit callbacks.
//!
//! Implements `atexit`, `_onexit`, and the shutdown hook `term_atexit` on top
//! of the process registry in `wincrt-core`.

use std::ffi::c_int;

use wincrt_core::stdlib::exit::{DrainError, DrainReport, process_registry};

type AtexitFn = unsafe extern "C" fn();
type OnexitFn = unsafe extern "C" fn() -> c_int;

// ---------------------------------------------------------------------------
// atexit
// ---------------------------------------------------------------------------

/// Returns 0 on success, -1 for a null function or when no storage is left.
#[cfg_attr(feature = "export-symbols", unsafe(no_mangle))]
pub unsafe extern "C" fn atexit(func: Option<AtexitFn>) -> c_int {
    let Some(f) = func else {
        return -1;
    };
    // SAFETY: the caller registers a valid function pointer that stays
    // callable until shutdown.
    match process_registry().register(move || unsafe { f() }) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

// ---------------------------------------------------------------------------
// _onexit
// ---------------------------------------------------------------------------

/// Returns `func` on success, null on failure. The callback's return value is
/// ignored at shutdown.
#[cfg_attr(feature = "export-symbols", unsafe(no_mangle))]
pub unsafe extern "C" fn _onexit(func: Option<OnexitFn>) -> Option<OnexitFn> {
    let f = func?;
    // SAFETY: same contract as `atexit`.
    let registered = process_registry().register(move || {
        unsafe { f() };
    });
    registered.ok().map(|()| f)
}

// ---------------------------------------------------------------------------
// term_atexit
// ---------------------------------------------------------------------------

/// Drain the process registry. Called once by the shutdown trampoline.
#[cfg_attr(feature = "export-symbols", unsafe(no_mangle))]
pub unsafe extern "C" fn term_atexit() {
    // Nothing above this frame can act on a stopped drain; entries it left
    // pending are abandoned with the process.
    let _ = term_atexit_report();
}

/// Safe counterpart of [`term_atexit`] that keeps the drain result.
pub fn term_atexit_report() -> Result<DrainReport, DrainError> {
    process_registry().drain()
}
