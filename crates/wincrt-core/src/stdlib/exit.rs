//! Process termination callbacks (`atexit` / `term_atexit`).
//!
//! ## Design
//!
//! - **Storage**: pending entries live in a `Vec` guarded by a
//!   `parking_lot::Mutex`. The top of the vector is the most recently
//!   registered entry, so popping yields LIFO order.
//!
//! - **Locking**: the mutex is held only to splice entries in or out. It is
//!   never held while a callback runs, so a callback may call
//!   [`ExitRegistry::register`] (or even drain again) without deadlocking.
//!
//! - **Batches**: a drain takes every pending entry at once and runs that batch
//!   newest-first. Entries registered by a callback while the batch runs form
//!   the next batch. The drain loops until it observes an empty registry.
//!
//! - **Failures**: a panicking callback is caught at the drain boundary and
//!   handled per [`DrainPolicy`]. Under `StopOnFailure` the entries that were
//!   not reached are put back, beneath anything registered during the drain.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use parking_lot::Mutex;
use thiserror::Error;

use crate::config::{self, DrainPolicy};

/// A registered shutdown action.
pub type ExitCallback = Box<dyn FnOnce() + Send + 'static>;

/// One pending shutdown action, owned by the registry until it runs.
pub struct ExitEntry {
    label: Option<Cow<'static, str>>,
    action: ExitCallback,
}

impl ExitEntry {
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    // Consumes the entry: its storage is released as soon as the action returns.
    fn invoke(self) {
        (self.action)();
    }
}

impl fmt::Debug for ExitEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExitEntry")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Per-registry configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Upper bound on pending entries. Reaching it fails registration the same
    /// way an allocation failure does.
    pub max_pending: Option<usize>,
    /// Pinned drain policy. `None` defers to [`config::drain_policy`].
    pub policy: Option<DrainPolicy>,
}

impl RegistryConfig {
    /// No storage budget, policy from the environment.
    pub const UNBOUNDED: Self = Self {
        max_pending: None,
        policy: None,
    };

    #[must_use]
    pub const fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = Some(max_pending);
        self
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: DrainPolicy) -> Self {
        self.policy = Some(policy);
        self
    }
}

/// Registration failure. The registry is left exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("no storage for another exit callback ({pending} already pending)")]
    AllocationFailure { pending: usize },
}

/// A callback that panicked while being drained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackFailure {
    /// Zero-based position of the callback in the drain's invocation order.
    pub sequence: usize,
    pub label: Option<String>,
    pub message: String,
}

/// Summary of a completed drain.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DrainReport {
    /// Callbacks invoked, including ones that panicked.
    pub invoked: usize,
    /// Number of times the pending set was taken. Greater than one when
    /// callbacks registered further callbacks.
    pub batches: usize,
    /// Panics recorded under [`DrainPolicy::BestEffort`].
    pub failures: Vec<CallbackFailure>,
}

impl DrainReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A drain that ended early.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrainError {
    #[error(
        "exit callback #{sequence} panicked: {message} ({invoked} invoked, {remaining} left pending)"
    )]
    Stopped {
        sequence: usize,
        label: Option<String>,
        message: String,
        invoked: usize,
        remaining: usize,
    },
}

/// Registry of callbacks to run at orderly process shutdown.
pub struct ExitRegistry {
    entries: Mutex<Vec<ExitEntry>>,
    config: RegistryConfig,
}

impl ExitRegistry {
    #[must_use]
    pub const fn new() -> Self {
        Self::with_config(RegistryConfig::UNBOUNDED)
    }

    #[must_use]
    pub const fn with_config(config: RegistryConfig) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> RegistryConfig {
        self.config
    }

    /// Register `action` to run at the next drain, ahead of everything
    /// registered before it.
    pub fn register<F>(&self, action: F) -> Result<(), RegisterError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.push(ExitEntry {
            label: None,
            action: Box::new(action),
        })
    }

    /// Like [`register`](Self::register), with a label carried into drain
    /// diagnostics.
    pub fn register_named<F>(
        &self,
        label: impl Into<Cow<'static, str>>,
        action: F,
    ) -> Result<(), RegisterError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.push(ExitEntry {
            label: Some(label.into()),
            action: Box::new(action),
        })
    }

    fn push(&self, entry: ExitEntry) -> Result<(), RegisterError> {
        let mut entries = self.entries.lock();
        let pending = entries.len();
        if self.config.max_pending.is_some_and(|max| pending >= max) {
            return Err(RegisterError::AllocationFailure { pending });
        }
        entries
            .try_reserve(1)
            .map_err(|_| RegisterError::AllocationFailure { pending })?;
        entries.push(entry);
        Ok(())
    }

    /// Number of entries waiting for a drain.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Labels of pending entries in the order a drain would reach them.
    #[must_use]
    pub fn pending_labels(&self) -> Vec<Option<String>> {
        self.entries
            .lock()
            .iter()
            .rev()
            .map(|entry| entry.label().map(str::to_owned))
            .collect()
    }

    /// The policy [`drain`](Self::drain) applies.
    #[must_use]
    pub fn policy(&self) -> DrainPolicy {
        self.config.policy.unwrap_or_else(config::drain_policy)
    }

    /// Invoke and remove every pending entry, newest first, until the registry
    /// is observed empty.
    pub fn drain(&self) -> Result<DrainReport, DrainError> {
        self.drain_with(self.policy())
    }

    /// [`drain`](Self::drain) with an explicit failure policy.
    pub fn drain_with(&self, policy: DrainPolicy) -> Result<DrainReport, DrainError> {
        let mut report = DrainReport::default();

        loop {
            let mut batch = {
                let mut entries = self.entries.lock();
                if entries.is_empty() {
                    break;
                }
                std::mem::take(&mut *entries)
            };
            report.batches += 1;

            while let Some(entry) = batch.pop() {
                let sequence = report.invoked;
                let label = entry.label().map(str::to_owned);
                let outcome = panic::catch_unwind(AssertUnwindSafe(move || entry.invoke()));
                report.invoked += 1;

                let Err(payload) = outcome else {
                    continue;
                };
                let message = panic_message(payload.as_ref());

                if policy.stops_on_failure() {
                    let remaining = batch.len();
                    self.restore(batch);
                    return Err(DrainError::Stopped {
                        sequence,
                        label,
                        message,
                        invoked: report.invoked,
                        remaining,
                    });
                }

                report.failures.push(CallbackFailure {
                    sequence,
                    label,
                    message,
                });
            }
        }

        Ok(report)
    }

    // Unreached entries go back underneath anything registered mid-drain, so
    // a later drain still sees newest-first order.
    fn restore(&self, mut older: Vec<ExitEntry>) {
        if older.is_empty() {
            return;
        }
        let mut entries = self.entries.lock();
        older.append(&mut entries);
        *entries = older;
    }
}

impl Default for ExitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ExitRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExitRegistry")
            .field("pending", &self.pending())
            .field("config", &self.config)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

// ---------------------------------------------------------------------------
// Process-wide registry
// ---------------------------------------------------------------------------

static PROCESS_REGISTRY: ExitRegistry = ExitRegistry::new();

/// The registry drained by the process shutdown trampoline.
#[must_use]
pub fn process_registry() -> &'static ExitRegistry {
    &PROCESS_REGISTRY
}

/// Register a callback with the process registry.
pub fn atexit<F>(action: F) -> Result<(), RegisterError>
where
    F: FnOnce() + Send + 'static,
{
    PROCESS_REGISTRY.register(action)
}

/// Drain the process registry using the configured policy.
pub fn term_atexit() -> Result<DrainReport, DrainError> {
    PROCESS_REGISTRY.drain()
}

/// Run exit callbacks, then terminate the process with `status`.
pub fn exit(status: i32) -> ! {
    // A stopped drain leaves entries pending; there is nobody left to report
    // them to once the process is going away.
    let _ = term_atexit();
    std::process::exit(status)
}
