//! Initializer/terminator table walkers.
//!
//! A CRT table is a contiguous run of optional function pointers collected by
//! the linker. Empty slots are padding and are skipped.

use thiserror::Error;

/// A checked initializer returned a non-zero code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InitError {
    #[error("initializer in slot {slot} failed with code {code}")]
    Failed { slot: usize, code: i32 },
}

impl InitError {
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Failed { code, .. } => code,
        }
    }
}

/// Invoke every non-empty slot in table order (`_initterm`).
///
/// Slots may be plain Rust function pointers, closures, or wrappers around
/// foreign function pointers. Returns the number of functions called.
pub fn run_initializers<I, F>(slots: I) -> usize
where
    I: IntoIterator<Item = Option<F>>,
    F: FnOnce(),
{
    let mut called = 0usize;
    for f in slots.into_iter().flatten() {
        f();
        called += 1;
    }
    called
}

/// Invoke non-empty slots in order, stopping at the first non-zero return
/// (`_initterm_e`).
///
/// Returns the number of functions called on success.
pub fn run_checked_initializers<I, F>(slots: I) -> Result<usize, InitError>
where
    I: IntoIterator<Item = Option<F>>,
    F: FnOnce() -> i32,
{
    let mut called = 0usize;
    for (slot, f) in slots.into_iter().enumerate() {
        let Some(f) = f else {
            continue;
        };
        called += 1;
        let code = f();
        if code != 0 {
            return Err(InitError::Failed { slot, code });
        }
    }
    Ok(called)
}
