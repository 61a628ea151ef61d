//! # wincrt-core
//!
//! Safe Rust implementation of the Windows C-runtime support layer: the
//! process exit-callback registry (`atexit` / `term_atexit`) and the
//! initializer/terminator sequencing performed by the executable and DLL
//! entry trampolines.
//!
//! No `unsafe` code is permitted at the crate level. Raw function-pointer
//! tables and `extern "C"` symbols live in `wincrt-abi`.

#![deny(unsafe_code)]

pub mod config;
pub mod startup;
pub mod stdlib;

pub use config::DrainPolicy;
