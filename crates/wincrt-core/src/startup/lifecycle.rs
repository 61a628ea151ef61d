//! Executable and DLL entry sequencing.
//!
//! Executable (console or GUI):
//!
//! ```text
//! C initializers (checked) -> C++ constructors -> main
//!   -> exit callbacks -> pre-terminators -> terminators -> exit code
//! ```
//!
//! DLL: initializers on process attach, [`shutdown`] on process detach or on
//! an attach that the user entry point rejected.

use crate::stdlib::exit::{DrainError, DrainReport, ExitRegistry};

use super::initterm::{InitError, run_checked_initializers, run_initializers};

/// Plain initializer or terminator slot.
pub type Initializer = fn();
/// Initializer that reports failure with a non-zero code.
pub type CheckedInitializer = fn() -> i32;

/// Exit code used when `main` succeeded but exit callbacks did not.
pub const TEARDOWN_FAILURE_EXIT_CODE: i32 = 255;

/// `STARTUPINFO::dwFlags` bit that makes `wShowWindow` meaningful.
pub const STARTF_USESHOWWINDOW: u32 = 0x0000_0001;
/// `ShowWindow` command used when the creator did not pick one.
pub const SW_SHOWDEFAULT: i32 = 10;

/// Image flavour selected at build time (`__set_app_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum AppType {
    Dll = 0,
    Console = 1,
    Gui = 2,
}

impl AppType {
    #[must_use]
    pub const fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Dll),
            1 => Some(Self::Console),
            2 => Some(Self::Gui),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_raw(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub const fn is_executable(self) -> bool {
        !matches!(self, Self::Dll)
    }
}

/// Loader notification passed to a DLL entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DllReason {
    ProcessDetach = 0,
    ProcessAttach = 1,
    ThreadAttach = 2,
    ThreadDetach = 3,
}

impl DllReason {
    #[must_use]
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::ProcessDetach),
            1 => Some(Self::ProcessAttach),
            2 => Some(Self::ThreadAttach),
            3 => Some(Self::ThreadDetach),
            _ => None,
        }
    }
}

/// The four linker-collected tables of an image.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrtSections<'a> {
    pub c_init: &'a [Option<CheckedInitializer>],
    pub cxx_init: &'a [Option<Initializer>],
    pub pre_terminators: &'a [Option<Initializer>],
    pub terminators: &'a [Option<Initializer>],
}

impl CrtSections<'static> {
    pub const EMPTY: Self = CrtSections {
        c_init: &[],
        cxx_init: &[],
        pre_terminators: &[],
        terminators: &[],
    };
}

/// Result of running an executable image to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitOutcome {
    pub exit_code: i32,
    /// Set when a C initializer failed and `main` was skipped.
    pub init_failure: Option<InitError>,
    pub drain: Result<DrainReport, DrainError>,
}

/// Result of a DLL entry notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DllOutcome {
    /// Value returned to the loader.
    pub accepted: bool,
    pub init_failure: Option<InitError>,
    /// Present when the notification tore the image down.
    pub drain: Option<Result<DrainReport, DrainError>>,
}

/// Run C initializers (stopping on failure), then C++ constructors.
pub fn initialize(sections: &CrtSections<'_>) -> Result<(), InitError> {
    run_checked_initializers(sections.c_init.iter().copied())?;
    run_initializers(sections.cxx_init.iter().copied());
    Ok(())
}

/// Drain exit callbacks, then run pre-terminators and terminators.
///
/// The terminator tables run even when the drain stopped on a failing
/// callback.
pub fn shutdown(
    sections: &CrtSections<'_>,
    registry: &ExitRegistry,
) -> Result<DrainReport, DrainError> {
    let drain = registry.drain();
    run_initializers(sections.pre_terminators.iter().copied());
    run_initializers(sections.terminators.iter().copied());
    drain
}

/// `mainCRTStartup` / `WinMainCRTStartup` body, minus the final process exit.
///
/// C initializers run as a checked (`_initterm_e`) table. A failing one skips
/// `main`, still runs [`shutdown`], and becomes the exit code. The mingw-style
/// stub instead walks this table with plain `_initterm` and always enters
/// `main`.
pub fn run_executable<M>(
    sections: &CrtSections<'_>,
    registry: &ExitRegistry,
    main: M,
) -> ExitOutcome
where
    M: FnOnce() -> i32,
{
    let (exit_code, init_failure) = match initialize(sections) {
        Ok(()) => (main(), None),
        Err(err) => (err.code(), Some(err)),
    };

    let drain = shutdown(sections, registry);
    let exit_code = if exit_code == 0 && drain.is_err() {
        TEARDOWN_FAILURE_EXIT_CODE
    } else {
        exit_code
    };

    ExitOutcome {
        exit_code,
        init_failure,
        drain,
    }
}

/// `DllMainCRTStartup` body.
///
/// A failing C initializer on process attach rejects the load without calling
/// `dll_main`, then runs [`shutdown`]. The mingw-style stub ignores the
/// `_initterm_e` result there and calls `DllMain` regardless.
pub fn run_dll<D>(
    sections: &CrtSections<'_>,
    registry: &ExitRegistry,
    reason: DllReason,
    dll_main: D,
) -> DllOutcome
where
    D: FnOnce(DllReason) -> bool,
{
    if reason == DllReason::ProcessAttach
        && let Err(err) = initialize(sections)
    {
        return DllOutcome {
            accepted: false,
            init_failure: Some(err),
            drain: Some(shutdown(sections, registry)),
        };
    }

    let accepted = dll_main(reason);

    let tear_down = match reason {
        DllReason::ProcessDetach => true,
        DllReason::ProcessAttach => !accepted,
        DllReason::ThreadAttach | DllReason::ThreadDetach => false,
    };

    DllOutcome {
        accepted,
        init_failure: None,
        drain: tear_down.then(|| shutdown(sections, registry)),
    }
}

/// `nCmdShow` for `WinMain`, derived from the process startup info.
#[must_use]
pub const fn show_window_mode(flags: u32, show_window: u16) -> i32 {
    if flags & STARTF_USESHOWWINDOW != 0 {
        show_window as i32
    } else {
        SW_SHOWDEFAULT
    }
}
