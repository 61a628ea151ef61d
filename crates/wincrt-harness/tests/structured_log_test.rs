//! Integration test: structured logging contract.
//!
//! Validates that:
//! 1. log_schema.json exists and its examples pass the validator.
//! 2. LogEmitter writes JSONL that validates and carries sequenced trace ids.
//! 3. The validator catches missing fields and bad enum values.
//! 4. ArtifactIndex serializes with digests.
//!
//! Run: cargo test -p wincrt-harness --test structured_log_test

use std::path::{Path, PathBuf};

use wincrt_harness::structured_log::{
    ArtifactIndex, LogEmitter, LogEntry, LogLevel, Outcome, StreamKind, sha256_hex,
    validate_log_file, validate_log_line,
};

fn workspace_root() -> PathBuf {
    let manifest = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest)
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf()
}

fn load_schema() -> serde_json::Value {
    let path = workspace_root().join("tests/conformance/log_schema.json");
    let content = std::fs::read_to_string(&path).expect("log_schema.json must exist");
    serde_json::from_str(&content).expect("log_schema.json should be valid JSON")
}

#[test]
fn log_schema_declares_required_fields() {
    let schema = load_schema();
    for key in [
        "schema_version",
        "required_fields",
        "optional_fields",
        "artifact_index_schema",
        "examples",
    ] {
        assert!(!schema[key].is_null(), "Schema missing key: {key}");
    }
    let req = schema["required_fields"].as_object().unwrap();
    for field in ["timestamp", "trace_id", "level", "event"] {
        assert!(req.contains_key(field), "Missing required field: {field}");
    }
}

#[test]
fn schema_examples_validate() {
    let schema = load_schema();
    for (name, example) in schema["examples"].as_object().unwrap() {
        if name == "artifact_index" {
            let idx: ArtifactIndex = serde_json::from_value(example.clone())
                .expect("artifact_index example should deserialize");
            assert_eq!(idx.index_version, 1);
            continue;
        }
        let json = serde_json::to_string(example).unwrap();
        let result = validate_log_line(&json, 0);
        assert!(
            result.is_ok(),
            "Schema example '{name}' should validate: {:?}",
            result.err()
        );
    }
}

#[test]
fn emitter_writes_valid_jsonl() {
    let dir = std::env::temp_dir().join("wincrt_log_test");
    std::fs::create_dir_all(&dir).unwrap();
    let log_path = dir.join("test_output.jsonl");

    {
        let mut emitter = LogEmitter::to_file(&log_path, "exit_registry", "run-integ").unwrap();
        emitter.emit(LogLevel::Info, "run_start").unwrap();
        emitter
            .emit_entry(
                LogEntry::new("", LogLevel::Info, "case_result")
                    .with_stream(StreamKind::Conformance)
                    .with_symbol("term_atexit")
                    .with_case("lifo_three")
                    .with_policy("stop")
                    .with_outcome(Outcome::Pass)
                    .with_counts(3, 0)
                    .with_latency_ns(15),
            )
            .unwrap();
        emitter.emit(LogLevel::Info, "run_end").unwrap();
        emitter.flush().unwrap();
    }

    let (line_count, errors) = validate_log_file(&log_path).unwrap();
    assert_eq!(line_count, 3);
    assert!(errors.is_empty(), "Emitter output should validate: {errors:?}");

    let content = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<serde_json::Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert!(lines[0]["trace_id"].as_str().unwrap().ends_with("::001"));
    assert!(lines[1]["trace_id"].as_str().unwrap().ends_with("::002"));
    assert!(lines[2]["trace_id"].as_str().unwrap().ends_with("::003"));
    assert_eq!(lines[1]["suite"], "exit_registry");
    assert_eq!(lines[1]["invoked"], 3);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn validation_catches_missing_fields() {
    let line = r#"{"timestamp":"2026-01-01T00:00:00Z","level":"info","event":"test"}"#;
    let errors = validate_log_line(line, 1).unwrap_err();
    assert!(errors.iter().any(|e| e.field == "trace_id"));

    let line = r#"{"trace_id":"a::b::c","level":"info","event":"test"}"#;
    let errors = validate_log_line(line, 2).unwrap_err();
    assert!(errors.iter().any(|e| e.field == "timestamp"));

    let line = r#"{"timestamp":"2026-01-01T00:00:00Z","trace_id":"a::b::c"}"#;
    let errors = validate_log_line(line, 3).unwrap_err();
    assert!(errors.len() >= 2);

    assert!(validate_log_line("not json", 4).is_err());
    assert!(validate_log_line("[1,2]", 5).is_err());
}

#[test]
fn validation_catches_invalid_enums() {
    let line = r#"{"timestamp":"T","trace_id":"a::b::c","level":"critical","event":"e"}"#;
    assert!(validate_log_line(line, 1).is_err());

    let line =
        r#"{"timestamp":"T","trace_id":"a::b::c","level":"info","event":"e","policy":"ignore"}"#;
    assert!(validate_log_line(line, 2).is_err());

    let line = r#"{"timestamp":"T","trace_id":"a::b::c","level":"info","event":"e","case":"x","outcome":"maybe"}"#;
    assert!(validate_log_line(line, 3).is_err());

    let line =
        r#"{"timestamp":"T","trace_id":"a::b::c","level":"info","event":"e","stream":"fuzz"}"#;
    assert!(validate_log_line(line, 4).is_err());
}

#[test]
fn artifact_index_roundtrip() {
    let mut idx = ArtifactIndex::new("run-001", "exit_registry");
    idx.add("logs/test.jsonl", "log", "abc123def456");
    idx.add_bytes("fixtures/exit_registry.v1.json", "fixture", b"{}");

    let json = idx.to_json().unwrap();
    let restored: ArtifactIndex = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.index_version, 1);
    assert_eq!(restored.run_id, "run-001");
    assert_eq!(restored.suite, "exit_registry");
    assert_eq!(restored.artifacts.len(), 2);
    assert_eq!(restored.artifacts[0].kind, "log");
    assert_eq!(restored.artifacts[0].size_bytes, None);
    assert_eq!(restored.artifacts[1].sha256, sha256_hex(b"{}"));
    assert_eq!(restored.artifacts[1].size_bytes, Some(2));
}
