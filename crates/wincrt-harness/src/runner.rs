//! Test execution engine.
//!
//! Each case runs against its own [`ExitRegistry`], so cases are independent
//! of each other and of the process registry.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use wincrt_core::DrainPolicy;
use wincrt_core::stdlib::exit::{DrainError, ExitRegistry, RegistryConfig};

use crate::fixtures::{Expected, FixtureCase, FixtureSet, Step};
use crate::verify::VerificationResult;

type Trace = Arc<Mutex<Vec<String>>>;

/// Runs a fixture set and collects verification results.
#[derive(Debug, Default, Clone, Copy)]
pub struct TestRunner;

impl TestRunner {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Run all cases in a set and return results.
    pub fn run(&self, fixture_set: &FixtureSet) -> Vec<VerificationResult> {
        fixture_set.cases.iter().map(run_case).collect()
    }
}

/// Execute one case and compare against its expectation.
pub fn run_case(case: &FixtureCase) -> VerificationResult {
    let policy = DrainPolicy::from_str_loose(&case.policy);
    let t0 = Instant::now();
    let (actual, invoked) = execute(case, policy);
    let latency_ns = u64::try_from(t0.elapsed().as_nanos()).unwrap_or(u64::MAX);

    let expected = render(&case.expected);
    let actual_text = render(&actual);
    let passed = actual == case.expected;
    VerificationResult {
        case_name: case.name.clone(),
        spec_section: case.spec_section.clone(),
        policy: policy.as_str().to_string(),
        passed,
        diff: (!passed).then(|| crate::verify::render_diff(&expected, &actual_text)),
        expected,
        actual: actual_text,
        invoked,
        pending: actual.pending,
        latency_ns,
    }
}

fn execute(case: &FixtureCase, policy: DrainPolicy) -> (Expected, usize) {
    let mut config = RegistryConfig::UNBOUNDED.with_policy(policy);
    if let Some(max) = case.max_pending {
        config = config.with_max_pending(max);
    }
    let registry = Arc::new(ExitRegistry::with_config(config));
    let trace: Trace = Arc::new(Mutex::new(Vec::new()));

    let mut rejected = Vec::new();
    let mut failures = 0usize;
    let mut invoked = 0usize;

    for step in &case.steps {
        match step {
            Step::Register { id, panics, on_run } => {
                let action = recorder(&registry, &trace, id.clone(), *panics, on_run.clone());
                if registry.register_named(id.clone(), action).is_err() {
                    rejected.push(id.clone());
                }
            }
            Step::Drain => match registry.drain() {
                Ok(report) => {
                    invoked += report.invoked;
                    failures += report.failures.len();
                }
                Err(DrainError::Stopped {
                    invoked: stopped_after,
                    ..
                }) => {
                    invoked += stopped_after;
                    failures += 1;
                }
            },
        }
    }

    let order = trace.lock().map(|t| t.clone()).unwrap_or_default();
    let actual = Expected {
        order,
        rejected,
        failures,
        pending: registry.pending(),
    };
    (actual, invoked)
}

fn recorder(
    registry: &Arc<ExitRegistry>,
    trace: &Trace,
    id: String,
    panics: bool,
    on_run: Vec<String>,
) -> impl FnOnce() + Send + 'static {
    let registry = Arc::clone(registry);
    let trace = Arc::clone(trace);
    move || {
        if let Ok(mut t) = trace.lock() {
            t.push(id.clone());
        }
        for nested in on_run {
            let nested_trace = Arc::clone(&trace);
            let nested_id = nested.clone();
            // A refused nested registration simply never shows up in the order.
            let _ = registry.register_named(nested, move || {
                if let Ok(mut t) = nested_trace.lock() {
                    t.push(nested_id);
                }
            });
        }
        if panics {
            panic!("fixture callback {id} failed");
        }
    }
}

fn render(e: &Expected) -> String {
    format!(
        "order=[{}]\nrejected=[{}]\nfailures={}\npending={}",
        e.order.join(","),
        e.rejected.join(","),
        e.failures,
        e.pending
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FixtureSet;

    #[test]
    fn runner_executes_lifo_and_nested_cases() {
        let fixture = FixtureSet::from_json(
            r#"{
                "version":"v1",
                "family":"stdlib/atexit",
                "captured_at":"2026-10-16T00:00:00Z",
                "cases":[
                    {"name":"abc","spec_section":"C11 7.22.4.2",
                     "steps":[{"op":"register","id":"a"},{"op":"register","id":"b"},{"op":"register","id":"c"},{"op":"drain"}],
                     "expected":{"order":["c","b","a"]}},
                    {"name":"nested","spec_section":"C11 7.22.4.2",
                     "steps":[{"op":"register","id":"a","on_run":["d"]},{"op":"drain"}],
                     "expected":{"order":["a","d"]}}
                ]
            }"#,
        )
        .expect("valid fixture json");

        let results = TestRunner::new().run(&fixture);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.passed), "{results:?}");
        assert_eq!(results[0].invoked, 3);
        assert_eq!(results[1].invoked, 2);
    }

    #[test]
    fn stop_and_best_effort_policies_diverge() {
        let steps = r#"[{"op":"register","id":"a"},{"op":"register","id":"boom","panics":true},{"op":"register","id":"c"},{"op":"drain"}]"#;
        let fixture = FixtureSet::from_json(&format!(
            r#"{{"version":"v1","family":"stdlib/atexit","captured_at":"t","cases":[
                {{"name":"stop","spec_section":"s","policy":"stop","steps":{steps},
                  "expected":{{"order":["c","boom"],"failures":1,"pending":1}}}},
                {{"name":"best","spec_section":"s","policy":"best-effort","steps":{steps},
                  "expected":{{"order":["c","boom","a"],"failures":1,"pending":0}}}}
            ]}}"#
        ))
        .expect("valid fixture json");

        let results = TestRunner::new().run(&fixture);
        assert!(results.iter().all(|r| r.passed), "{results:?}");
        assert_eq!(results[0].policy, "stop");
        assert_eq!(results[1].policy, "best-effort");
    }

    #[test]
    fn mismatch_produces_diff() {
        let fixture = FixtureSet::from_json(
            r#"{"version":"v1","family":"f","captured_at":"t","cases":[
                {"name":"wrong","spec_section":"s",
                 "steps":[{"op":"register","id":"a"},{"op":"register","id":"b"},{"op":"drain"}],
                 "expected":{"order":["a","b"]}}
            ]}"#,
        )
        .expect("valid fixture json");

        let results = TestRunner::new().run(&fixture);
        assert!(!results[0].passed);
        assert!(results[0].actual.contains("order=[b,a]"));
        assert!(results[0].diff.is_some());
    }

    #[test]
    fn budget_rejections_are_reported() {
        let fixture = FixtureSet::from_json(
            r#"{"version":"v1","family":"f","captured_at":"t","cases":[
                {"name":"budget","spec_section":"s","max_pending":1,
                 "steps":[{"op":"register","id":"a"},{"op":"register","id":"b"},{"op":"drain"}],
                 "expected":{"order":["a"],"rejected":["b"]}}
            ]}"#,
        )
        .expect("valid fixture json");

        let results = TestRunner::new().run(&fixture);
        assert!(results[0].passed, "{:?}", results[0]);
    }
}
