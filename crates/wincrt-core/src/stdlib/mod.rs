//! `<stdlib.h>` process-termination support.

pub mod exit;

pub use exit::{
    CallbackFailure, DrainError, DrainReport, ExitCallback, ExitEntry, ExitRegistry,
    RegisterError, RegistryConfig, atexit, exit, process_registry, term_atexit,
};
