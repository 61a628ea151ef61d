//! Drain policy configuration.
//!
//! The process-wide policy is set via the `WINCRT_DRAIN_POLICY` environment
//! variable:
//! - `stop` (default): a panicking exit callback stops the drain. Entries that
//!   were not reached stay pending and the failure is reported to the caller.
//! - `best-effort`: a panicking exit callback is recorded and the drain moves
//!   on to the next entry.
//!
//! Individual registries may pin a policy through
//! [`RegistryConfig`](crate::stdlib::exit::RegistryConfig), which takes
//! precedence over the environment.

use std::sync::atomic::{AtomicU8, Ordering};

/// Environment variable consulted by [`drain_policy`].
pub const DRAIN_POLICY_ENV: &str = "WINCRT_DRAIN_POLICY";

/// What a drain does when an exit callback panics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrainPolicy {
    /// Stop at the first failing callback. Remaining entries stay registered.
    #[default]
    StopOnFailure,
    /// Record the failure and keep invoking the remaining entries.
    BestEffort,
}

impl DrainPolicy {
    /// Parse from string (case-insensitive). Unknown values map to the default.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "best-effort" | "best_effort" | "besteffort" | "continue" | "lenient" => {
                Self::BestEffort
            }
            _ => Self::StopOnFailure,
        }
    }

    /// Returns true if a failing callback ends the drain.
    #[must_use]
    pub const fn stops_on_failure(self) -> bool {
        matches!(self, Self::StopOnFailure)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StopOnFailure => "stop",
            Self::BestEffort => "best-effort",
        }
    }
}

// Atomic cache: 0=unresolved, 1=StopOnFailure, 2=BestEffort.
static CACHED_POLICY: AtomicU8 = AtomicU8::new(POLICY_UNRESOLVED);

const POLICY_UNRESOLVED: u8 = 0;
const POLICY_STOP: u8 = 1;
const POLICY_BEST_EFFORT: u8 = 2;

fn policy_to_u8(policy: DrainPolicy) -> u8 {
    match policy {
        DrainPolicy::StopOnFailure => POLICY_STOP,
        DrainPolicy::BestEffort => POLICY_BEST_EFFORT,
    }
}

fn u8_to_policy(v: u8) -> DrainPolicy {
    match v {
        POLICY_BEST_EFFORT => DrainPolicy::BestEffort,
        _ => DrainPolicy::StopOnFailure,
    }
}

fn policy_from_env() -> DrainPolicy {
    std::env::var(DRAIN_POLICY_ENV)
        .map(|v| DrainPolicy::from_str_loose(&v))
        .unwrap_or_default()
}

/// Get the configured drain policy (reads env var on first call, caches thereafter).
#[must_use]
pub fn drain_policy() -> DrainPolicy {
    let cached = CACHED_POLICY.load(Ordering::Acquire);
    if cached != POLICY_UNRESOLVED {
        return u8_to_policy(cached);
    }

    // Racing resolvers compute the same value. Whichever store lands first
    // wins, including an earlier `set_drain_policy`.
    let resolved = policy_from_env();
    match CACHED_POLICY.compare_exchange(
        POLICY_UNRESOLVED,
        policy_to_u8(resolved),
        Ordering::AcqRel,
        Ordering::Acquire,
    ) {
        Ok(_) => resolved,
        Err(current) => u8_to_policy(current),
    }
}

/// Override the cached process-wide policy.
///
/// Takes effect for every later [`drain_policy`] call, whether or not the
/// environment was already consulted.
pub fn set_drain_policy(policy: DrainPolicy) {
    CACHED_POLICY.store(policy_to_u8(policy), Ordering::Release);
}
