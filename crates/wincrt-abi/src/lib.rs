// All extern "C" ABI exports accept raw pointers from C callers; validation is
// done at runtime, so per-function safety docs would be redundant boilerplate.
#![allow(clippy::missing_safety_doc)]
//! # wincrt-abi
//!
//! `extern "C"` boundary layer for wincrt.
//!
//! This crate produces a `cdylib` exposing the CRT support symbols that entry
//! trampolines and C code link against. Each function converts raw pointers
//! into safe values and delegates to `wincrt-core`.
//!
//! ```text
//! C caller -> ABI entry (this crate) -> wincrt-core -> return code
//! ```
//!
//! Symbols are only `#[no_mangle]` with the `export-symbols` feature, which the
//! DLL build turns on. Test and bench binaries link the rlib without it, in
//! debug and release alike, so they never interpose the host CRT.

// Unit tests built with `--features export-symbols` would otherwise export
// `atexit` over the host symbol.
#[cfg(not(test))]
pub mod stdlib_abi;

pub mod startup_abi;
pub mod startup_helpers;
