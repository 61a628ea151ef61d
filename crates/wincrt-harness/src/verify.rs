//! Output comparison and verification.

use serde::{Deserialize, Serialize};

/// Result of verifying a single fixture case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Name of the test case.
    pub case_name: String,
    /// C standard / CRT contract reference.
    pub spec_section: String,
    /// Drain policy the case ran under.
    pub policy: String,
    /// Whether the case passed.
    pub passed: bool,
    /// Expected observation, one field per line.
    pub expected: String,
    /// Actual observation, one field per line.
    pub actual: String,
    /// Diff if the case failed.
    pub diff: Option<String>,
    /// Callbacks invoked across all drains of the case.
    pub invoked: usize,
    /// Entries left pending after the last step.
    pub pending: usize,
    pub latency_ns: u64,
}

/// Aggregate verification summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<VerificationResult>,
}

impl VerificationSummary {
    #[must_use]
    pub fn from_results(results: Vec<VerificationResult>) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            total,
            passed,
            failed: total - passed,
            results,
        }
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Line-by-line diff between expected and actual output.
#[must_use]
pub fn render_diff(expected: &str, actual: &str) -> String {
    if expected == actual {
        return String::from("[identical]");
    }
    let mut out = String::from("--- expected\n+++ actual\n");
    for (i, (e, a)) in expected.lines().zip(actual.lines()).enumerate() {
        if e != a {
            out.push_str(&format!("@@ line {} @@\n-{e}\n+{a}\n", i + 1));
        }
    }
    out
}
