//! CRT startup and shutdown sequencing.
//!
//! The linker-section scaffolding and loader hand-off stay outside this crate;
//! callers hand in the collected tables as [`CrtSections`] and the user entry
//! point as a closure.

pub mod initterm;
pub mod lifecycle;

pub use initterm::{InitError, run_checked_initializers, run_initializers};
pub use lifecycle::{
    AppType, CheckedInitializer, CrtSections, DllOutcome, DllReason, ExitOutcome, Initializer,
    TEARDOWN_FAILURE_EXIT_CODE, initialize, run_dll, run_executable, show_window_mode, shutdown,
};
