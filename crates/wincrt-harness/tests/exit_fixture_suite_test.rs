//! Integration test: exit-registry fixture suite.
//!
//! Replays every case in tests/conformance/fixtures against a fresh registry,
//! writes the structured log under target/conformance, and validates it.
//!
//! Run: cargo test -p wincrt-harness --test exit_fixture_suite_test

use std::path::{Path, PathBuf};

use wincrt_harness::fixtures::{self, FixtureSet, Step};
use wincrt_harness::structured_log::{
    ArtifactIndex, LogEmitter, LogEntry, LogLevel, Outcome, StreamKind, validate_log_file,
};
use wincrt_harness::{TestRunner, VerificationSummary};

fn workspace_root() -> PathBuf {
    let manifest = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest)
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf()
}

fn fixture_dir() -> PathBuf {
    workspace_root().join("tests/conformance/fixtures")
}

fn load_all() -> Vec<FixtureSet> {
    fixtures::discover(&fixture_dir())
        .expect("fixture directory should contain json files")
        .iter()
        .map(|p| FixtureSet::from_file(p).expect("fixture should parse"))
        .collect()
}

#[test]
fn fixture_files_are_well_formed() {
    let sets = load_all();
    assert!(!sets.is_empty());
    for set in &sets {
        assert_eq!(set.version, "v1");
        assert!(!set.cases.is_empty(), "{} has no cases", set.family);
        for case in &set.cases {
            assert!(!case.name.is_empty());
            assert!(!case.spec_section.is_empty(), "{} lacks spec_section", case.name);
            assert!(
                matches!(case.policy.as_str(), "stop" | "best-effort"),
                "{} has unknown policy {}",
                case.name,
                case.policy
            );
            assert!(
                case.steps.iter().any(|s| matches!(s, Step::Drain)),
                "{} never drains",
                case.name
            );
        }
    }
}

#[test]
fn fixture_case_names_are_unique() {
    let mut names: Vec<String> = load_all()
        .into_iter()
        .flat_map(|s| s.cases.into_iter().map(|c| c.name))
        .collect();
    let total = names.len();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), total, "duplicate case names in fixtures");
}

#[test]
fn fixtures_cover_both_policies() {
    let sets = load_all();
    let cases: Vec<_> = sets.iter().flat_map(|s| &s.cases).collect();
    assert!(cases.iter().any(|c| c.policy == "stop" && c.expected.failures > 0));
    assert!(cases.iter().any(|c| c.policy == "best-effort" && c.expected.failures > 0));
    assert!(cases.iter().any(|c| !c.expected.rejected.is_empty()));
}

#[test]
fn all_fixture_cases_pass_and_log_validates() {
    let out_dir = workspace_root().join("target/conformance");
    std::fs::create_dir_all(&out_dir).unwrap();
    let log_path = out_dir.join("exit_fixture_suite.log.jsonl");
    let index_path = out_dir.join("exit_fixture_suite.artifact_index.json");

    let paths = fixtures::discover(&fixture_dir()).unwrap();
    let mut index = ArtifactIndex::new("test", "exit_registry");
    let mut emitter = LogEmitter::to_file(&log_path, "exit_registry", "test").unwrap();
    let runner = TestRunner::new();

    let mut results = Vec::new();
    for path in &paths {
        index.add_bytes(
            path.display().to_string(),
            "fixture",
            &std::fs::read(path).unwrap(),
        );
        let set = FixtureSet::from_file(path).unwrap();
        for result in runner.run(&set) {
            let outcome = if result.passed {
                Outcome::Pass
            } else {
                Outcome::Fail
            };
            emitter
                .emit_entry(
                    LogEntry::new("", LogLevel::Info, "case_result")
                        .with_stream(StreamKind::Conformance)
                        .with_symbol(set.family.as_str())
                        .with_case(result.case_name.as_str())
                        .with_policy(result.policy.as_str())
                        .with_outcome(outcome)
                        .with_counts(result.invoked as u64, result.pending as u64)
                        .with_latency_ns(result.latency_ns),
                )
                .unwrap();
            results.push(result);
        }
    }
    emitter.flush().unwrap();
    drop(emitter);
    std::fs::write(&index_path, index.to_json().unwrap()).unwrap();

    let summary = VerificationSummary::from_results(results);
    let failures: Vec<_> = summary
        .results
        .iter()
        .filter(|r| !r.passed)
        .map(|r| format!("{}: {}", r.case_name, r.diff.clone().unwrap_or_default()))
        .collect();
    assert!(summary.all_passed(), "failing cases:\n{}", failures.join("\n"));

    let (lines, errors) = validate_log_file(&log_path).unwrap();
    assert_eq!(lines, summary.total);
    assert!(errors.is_empty(), "log errors: {errors:?}");
}

#[test]
fn invoked_count_matches_expected_order() {
    let runner = TestRunner::new();
    for set in load_all() {
        for (case, result) in set.cases.iter().zip(runner.run(&set)) {
            assert_eq!(
                result.invoked,
                case.expected.order.len(),
                "{}: invoked count differs from order length",
                case.name
            );
            assert_eq!(result.pending, case.expected.pending, "{}", case.name);
        }
    }
}
