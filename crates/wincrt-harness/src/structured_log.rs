//! Structured logging contract for wincrt conformance runs.
//!
//! Provides:
//! - [`LogEntry`]: canonical JSONL log record with required + optional fields.
//! - [`ArtifactIndex`]: links logs to fixture inputs with SHA-256 integrity.
//! - [`LogEmitter`]: writes JSONL lines to a file or an in-memory buffer.
//! - [`validate_log_line`]: validates a single JSONL line against the schema.
//! - [`validate_log_file`]: validates an entire JSONL file.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::Path;

// ---------------------------------------------------------------------------
// Log entry
// ---------------------------------------------------------------------------

/// Severity level for log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

/// Verification outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
    Skip,
    Error,
}

/// Workflow that produced the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Unit,
    Conformance,
    Perf,
}

const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "fatal"];
const OUTCOMES: [&str; 4] = ["pass", "fail", "skip", "error"];
const STREAMS: [&str; 3] = ["unit", "conformance", "perf"];
const POLICIES: [&str; 2] = ["stop", "best-effort"];

/// Canonical structured log entry.
///
/// Required fields: `timestamp`, `trace_id`, `level`, `event`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    // Required
    pub timestamp: String,
    pub trace_id: String,
    pub level: LogLevel,
    pub event: String,

    // Optional
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suite: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<StreamKind>,
    /// Drain policy in effect (`stop` or `best-effort`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    /// Fixture case name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case: Option<String>,
    /// CRT entry point exercised (e.g. `atexit`, `term_atexit`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    /// Callbacks invoked by the drain(s) of a case.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoked: Option<u64>,
    /// Entries still pending when the case finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ns: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_refs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEntry {
    /// Create a new log entry with required fields only.
    #[must_use]
    pub fn new(trace_id: impl Into<String>, level: LogLevel, event: impl Into<String>) -> Self {
        Self {
            timestamp: now_utc(),
            trace_id: trace_id.into(),
            level,
            event: event.into(),
            suite: None,
            stream: None,
            policy: None,
            case: None,
            symbol: None,
            outcome: None,
            invoked: None,
            pending: None,
            exit_code: None,
            latency_ns: None,
            artifact_refs: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_suite(mut self, suite: impl Into<String>) -> Self {
        self.suite = Some(suite.into());
        self
    }

    #[must_use]
    pub fn with_stream(mut self, stream: StreamKind) -> Self {
        self.stream = Some(stream);
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: impl Into<String>) -> Self {
        self.policy = Some(policy.into());
        self
    }

    #[must_use]
    pub fn with_case(mut self, case: impl Into<String>) -> Self {
        self.case = Some(case.into());
        self
    }

    #[must_use]
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    #[must_use]
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Record drain counters.
    #[must_use]
    pub fn with_counts(mut self, invoked: u64, pending: u64) -> Self {
        self.invoked = Some(invoked);
        self.pending = Some(pending);
        self
    }

    #[must_use]
    pub fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = Some(exit_code);
        self
    }

    #[must_use]
    pub fn with_latency_ns(mut self, ns: u64) -> Self {
        self.latency_ns = Some(ns);
        self
    }

    #[must_use]
    pub fn with_artifacts(mut self, refs: Vec<String>) -> Self {
        self.artifact_refs = Some(refs);
        self
    }

    /// Set free-form details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Serialize to a single JSONL line (no trailing newline).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Artifact index
// ---------------------------------------------------------------------------

/// A single artifact entry in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub path: String,
    pub kind: String,
    pub sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

/// Artifact index linking a log to the inputs it was produced from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactIndex {
    pub index_version: u32,
    pub run_id: String,
    pub suite: String,
    pub generated_utc: String,
    pub artifacts: Vec<ArtifactEntry>,
}

impl ArtifactIndex {
    #[must_use]
    pub fn new(run_id: impl Into<String>, suite: impl Into<String>) -> Self {
        Self {
            index_version: 1,
            run_id: run_id.into(),
            suite: suite.into(),
            generated_utc: now_utc(),
            artifacts: Vec::new(),
        }
    }

    /// Add an artifact entry with a precomputed digest.
    pub fn add(
        &mut self,
        path: impl Into<String>,
        kind: impl Into<String>,
        sha256: impl Into<String>,
    ) -> &mut Self {
        self.artifacts.push(ArtifactEntry {
            path: path.into(),
            kind: kind.into(),
            sha256: sha256.into(),
            size_bytes: None,
        });
        self
    }

    /// Add an artifact, hashing its bytes.
    pub fn add_bytes(
        &mut self,
        path: impl Into<String>,
        kind: impl Into<String>,
        bytes: &[u8],
    ) -> &mut Self {
        self.artifacts.push(ArtifactEntry {
            path: path.into(),
            kind: kind.into(),
            sha256: sha256_hex(bytes),
            size_bytes: Some(bytes.len() as u64),
        });
        self
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

// ---------------------------------------------------------------------------
// Log emitter
// ---------------------------------------------------------------------------

/// Writes structured JSONL log entries to a file or buffer.
pub struct LogEmitter {
    writer: Box<dyn Write>,
    seq: u64,
    suite: String,
    run_id: String,
}

impl LogEmitter {
    /// Create an emitter that writes to a file.
    pub fn to_file(path: &Path, suite: &str, run_id: &str) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self {
            writer: Box::new(std::io::BufWriter::new(file)),
            seq: 0,
            suite: suite.to_string(),
            run_id: run_id.to_string(),
        })
    }

    /// Create an emitter that discards output (trace ids are still sequenced).
    #[must_use]
    pub fn to_sink(suite: &str, run_id: &str) -> Self {
        Self {
            writer: Box::new(std::io::sink()),
            seq: 0,
            suite: suite.to_string(),
            run_id: run_id.to_string(),
        }
    }

    fn next_trace_id(&mut self) -> String {
        self.seq += 1;
        format!("{}::{}::{:03}", self.suite, self.run_id, self.seq)
    }

    /// Emit a log entry with auto-generated trace_id and suite.
    pub fn emit(&mut self, level: LogLevel, event: &str) -> std::io::Result<LogEntry> {
        let trace_id = self.next_trace_id();
        let entry = LogEntry::new(&trace_id, level, event).with_suite(&self.suite);
        let line = serde_json::to_string(&entry).map_err(std::io::Error::other)?;
        writeln!(self.writer, "{line}")?;
        Ok(entry)
    }

    /// Emit a fully-populated log entry, filling in trace_id and suite if unset.
    pub fn emit_entry(&mut self, mut entry: LogEntry) -> std::io::Result<()> {
        if entry.trace_id.is_empty() {
            entry.trace_id = self.next_trace_id();
        }
        if entry.suite.is_none() {
            entry.suite = Some(self.suite.clone());
        }
        let line = serde_json::to_string(&entry).map_err(std::io::Error::other)?;
        writeln!(self.writer, "{line}")
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validation error for a log line.
#[derive(Debug)]
pub struct LogValidationError {
    pub line_number: usize,
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for LogValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}: field '{}': {}",
            self.line_number, self.field, self.message
        )
    }
}

/// Validate a single JSONL line against the schema.
pub fn validate_log_line(
    line: &str,
    line_number: usize,
) -> Result<LogEntry, Vec<LogValidationError>> {
    let mut errors = Vec::new();
    let mut fail = |field: &str, message: String| {
        errors.push(LogValidationError {
            line_number,
            field: field.to_string(),
            message,
        });
    };

    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            fail("<json>", format!("invalid JSON: {e}"));
            return Err(errors);
        }
    };

    let Some(obj) = value.as_object() else {
        fail("<root>", "expected JSON object".to_string());
        return Err(errors);
    };

    for field in ["timestamp", "trace_id", "level", "event"] {
        if !obj.contains_key(field) {
            fail(field, "required field missing".to_string());
        }
    }

    let enums: [(&str, &[&str]); 4] = [
        ("level", &LEVELS),
        ("outcome", &OUTCOMES),
        ("stream", &STREAMS),
        ("policy", &POLICIES),
    ];
    for (field, allowed) in enums {
        if let Some(v) = obj.get(field).and_then(|v| v.as_str())
            && !allowed.contains(&v)
        {
            fail(field, format!("invalid {field}: '{v}'"));
        }
    }

    if let Some(trace_id) = obj.get("trace_id").and_then(|v| v.as_str())
        && !trace_id.contains("::")
    {
        fail(
            "trace_id",
            format!("trace_id should follow <suite>::<run_id>::<seq> format, got: '{trace_id}'"),
        );
    }

    // Outcome records describe a finished case and must say which one.
    if obj.contains_key("outcome") && !obj.get("case").is_some_and(serde_json::Value::is_string) {
        fail("case", "outcome records must name their case".to_string());
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    serde_json::from_value::<LogEntry>(value).map_err(|e| {
        vec![LogValidationError {
            line_number,
            field: "<deserialization>".to_string(),
            message: format!("failed to deserialize: {e}"),
        }]
    })
}

/// Validate an entire JSONL file.
///
/// Returns the non-empty line count and any validation errors found.
pub fn validate_log_file(path: &Path) -> Result<(usize, Vec<LogValidationError>), std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    let mut all_errors = Vec::new();
    let mut line_count = 0;

    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        line_count += 1;
        if let Err(errs) = validate_log_line(line, i + 1) {
            all_errors.extend(errs);
        }
    }

    Ok((line_count, all_errors))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn now_utc() -> String {
    let duration = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format_utc(duration.as_secs(), duration.subsec_millis())
}

/// Format seconds since the Unix epoch as RFC 3339 UTC with milliseconds.
fn format_utc(secs: u64, millis: u32) -> String {
    let days = (secs / 86_400) as i64;
    let rem = secs % 86_400;

    // Civil-from-days over 400-year eras.
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);

    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        year,
        month,
        day,
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60,
        millis,
    )
}
