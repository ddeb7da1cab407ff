//! Per-check outcome accumulation.
//!
//! A [`Reporter`] is the sink a check writes its findings to. Instead of
//! aborting on the first problem, a check appends records of varying severity
//! and the reporter derives a single verdict from the record histogram. A
//! fresh reporter reports [`CheckState::Success`] until something is appended.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::panic::Location;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// Default cap on the number of records returned per check.
pub const MAX_MESSAGES_PER_CHECK: usize = 25;

static FILE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[Ff]ile:\s*[.0-9a-zA-Z\\/_-]*").expect("valid file pattern"));
static LINE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[Ll]ine\s*\w*:\s*\d*").expect("valid line pattern"));

/// The verdict of a check, which doubles as the kind of a single record.
///
/// Variants are declared in descending severity, so the derived ordering is
/// the severity precedence: when deriving a verdict the first kind with a
/// non-zero record count wins, and record retrieval sorts worst-first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CheckState {
    /// The check itself misbehaved (a defect in the check, not the artifact).
    Error,
    /// A problem the artifact cannot be accepted with.
    Failure,
    /// A human needs to look at this finding.
    ManualCheck,
    /// The check does not apply to this artifact.
    NotApplicable,
    /// Worth flagging, not blocking.
    Warning,
    /// The check was not run at all.
    Skipped,
    /// Nothing was reported.
    Success,
}

impl CheckState {
    /// All states in severity order, most severe first.
    pub const ALL: [CheckState; 7] = [
        CheckState::Error,
        CheckState::Failure,
        CheckState::ManualCheck,
        CheckState::NotApplicable,
        CheckState::Warning,
        CheckState::Skipped,
        CheckState::Success,
    ];

    /// Returns the snake_case name used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckState::Error => "error",
            CheckState::Failure => "failure",
            CheckState::ManualCheck => "manual_check",
            CheckState::NotApplicable => "not_applicable",
            CheckState::Warning => "warning",
            CheckState::Skipped => "skipped",
            CheckState::Success => "success",
        }
    }

    /// Returns true for the states the packaging gate blocks on.
    pub fn is_blocking(&self) -> bool {
        matches!(self, CheckState::Error | CheckState::Failure)
    }
}

impl std::fmt::Display for CheckState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One appended finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRecord {
    /// The record kind.
    pub state: CheckState,
    /// The message text the check emitted.
    pub message: String,
    /// Source file of the emission call site.
    pub filename: Option<String>,
    /// Source line of the emission call site.
    pub line: Option<u32>,
    /// Artifact file referenced by the message, if one could be extracted.
    pub message_filename: Option<String>,
    /// Artifact line referenced by the message, if one could be extracted.
    pub message_line: Option<u64>,
}

/// Timing metrics for one check execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReporterMetrics {
    /// When the check started.
    pub start_time: Option<DateTime<Utc>>,
    /// When the check completed.
    pub end_time: Option<DateTime<Utc>>,
    /// Wall time in seconds, set on completion.
    pub execution_time: Option<f64>,
}

/// Best-effort extraction of a `File: <path>` / `Line: <n>` fragment.
///
/// Check messages conventionally embed the artifact location they refer to;
/// pulling it into structured fields lets downstream tooling link findings
/// to files without parsing prose. Absence is not an error.
pub fn extract_filename_lineno(message: &str) -> (Option<String>, Option<u64>) {
    let filename = FILE_PATTERN
        .find(message)
        .and_then(|m| m.as_str().split_once(':'))
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty());
    let lineno = LINE_PATTERN
        .find(message)
        .and_then(|m| m.as_str().split_once(':'))
        .and_then(|(_, value)| value.trim().parse::<u64>().ok());
    (filename, lineno)
}

/// The per-check outcome accumulator and verdict calculator.
///
/// A reporter is created per (artifact, check) pair, started, appended to
/// during the check's execution, completed, and then frozen inside the
/// report tree. Emission never fails and never panics the check.
///
/// # Examples
///
/// ```rust
/// use appvet::report::{CheckState, Reporter};
///
/// let reporter = Reporter::new();
/// assert_eq!(reporter.state(), CheckState::Success);
///
/// reporter.warn("props.conf sets a deprecated option File: default/props.conf Line: 12");
/// reporter.fail("app.conf is missing a [launcher] stanza");
/// assert_eq!(reporter.state(), CheckState::Failure);
/// ```
#[derive(Debug, Default)]
pub struct Reporter {
    records: Mutex<Vec<ReportRecord>>,
    metrics: Mutex<ReporterMetrics>,
}

impl Reporter {
    /// Creates an empty reporter in the `success` state.
    pub fn new() -> Self {
        Self::default()
    }

    fn save(
        &self,
        state: CheckState,
        message: String,
        location: &Location<'_>,
        message_filename: Option<String>,
        message_line: Option<u64>,
    ) {
        let printable: String = message
            .chars()
            .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
            .collect();
        let filename = Path::new(location.file())
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        let record = ReportRecord {
            state,
            message: printable,
            filename,
            line: Some(location.line()),
            message_filename,
            message_line,
        };
        self.records
            .lock()
            .expect("reporter record lock poisoned")
            .push(record);
    }

    fn format_message(message: &str, file_name: Option<&str>, line_number: Option<u64>) -> String {
        match (file_name, line_number) {
            (Some(file), Some(line)) => format!("{message} File: {file} Line Number: {line}"),
            (Some(file), None) => format!("{message} File: {file}"),
            _ => message.to_string(),
        }
    }

    #[track_caller]
    fn emit(&self, state: CheckState, message: String) {
        let (message_filename, message_line) = extract_filename_lineno(&message);
        self.save(
            state,
            message,
            Location::caller(),
            message_filename,
            message_line,
        );
    }

    /// Reports a problem the artifact cannot be accepted with.
    #[track_caller]
    pub fn fail(&self, message: impl Into<String>) {
        self.emit(CheckState::Failure, message.into());
    }

    /// Reports a failure referring to a location inside the artifact.
    #[track_caller]
    pub fn fail_at(&self, message: impl Into<String>, file_name: &str, line_number: Option<u64>) {
        let formatted = Self::format_message(&message.into(), Some(file_name), line_number);
        self.save(
            CheckState::Failure,
            formatted,
            Location::caller(),
            Some(file_name.to_string()),
            line_number,
        );
    }

    /// Reports a failure when `assertion` does not hold.
    #[track_caller]
    pub fn fail_unless(&self, assertion: bool, message: impl Into<String>) {
        if !assertion {
            self.emit(CheckState::Failure, message.into());
        }
    }

    /// Flags a finding worth a human glance, like a todo item.
    #[track_caller]
    pub fn warn(&self, message: impl Into<String>) {
        self.emit(CheckState::Warning, message.into());
    }

    /// Reports a warning referring to a location inside the artifact.
    #[track_caller]
    pub fn warn_at(&self, message: impl Into<String>, file_name: &str, line_number: Option<u64>) {
        let formatted = Self::format_message(&message.into(), Some(file_name), line_number);
        self.save(
            CheckState::Warning,
            formatted,
            Location::caller(),
            Some(file_name.to_string()),
            line_number,
        );
    }

    /// Reports a warning when `assertion` does not hold.
    #[track_caller]
    pub fn warn_unless(&self, assertion: bool, message: impl Into<String>) {
        if !assertion {
            self.emit(CheckState::Warning, message.into());
        }
    }

    /// Declares that this finding requires a human to validate.
    #[track_caller]
    pub fn manual_check(&self, message: impl Into<String>) {
        self.emit(CheckState::ManualCheck, message.into());
    }

    /// Queues a manual review when `assertion` does not hold.
    #[track_caller]
    pub fn manual_check_unless(&self, assertion: bool, message: impl Into<String>) {
        if !assertion {
            self.emit(CheckState::ManualCheck, message.into());
        }
    }

    /// Reports that this check does not apply to the artifact at hand.
    #[track_caller]
    pub fn not_applicable(&self, message: impl Into<String>) {
        let message = message.into();
        debug!(reason = %message, "check not applicable");
        self.emit(CheckState::NotApplicable, message);
    }

    /// Reports that this check was not run.
    #[track_caller]
    pub fn skip(&self, message: impl Into<String>) {
        let message = message.into();
        debug!(reason = %message, "check skipped");
        self.emit(CheckState::Skipped, message);
    }

    /// Records a defect in the check itself.
    ///
    /// Check authors normally never call this; the engine maps unexpected
    /// routine failures here so a broken check cannot take its siblings down.
    #[track_caller]
    pub fn error(&self, message: impl Into<String>) {
        self.emit(CheckState::Error, message.into());
    }

    /// Returns the derived verdict: the most severe kind present.
    ///
    /// The verdict is a pure function of the record-kind histogram and does
    /// not depend on emission order. No records means `success`.
    pub fn state(&self) -> CheckState {
        let records = self.records.lock().expect("reporter record lock poisoned");
        let mut counts = [0usize; CheckState::ALL.len()];
        for record in records.iter() {
            counts[record.state as usize] += 1;
        }
        for state in [
            CheckState::Error,
            CheckState::Failure,
            CheckState::ManualCheck,
            CheckState::NotApplicable,
            CheckState::Warning,
            CheckState::Skipped,
        ] {
            if counts[state as usize] > 0 {
                return state;
            }
        }
        CheckState::Success
    }

    /// Returns the accumulated records, worst first, capped at `max_records`.
    ///
    /// Only records of the requested kinds are returned. When the cap
    /// truncates the list, the final returned record is a synthetic
    /// `warning` summarizing the suppressed count per kind, so the payload
    /// stays bounded while the worst findings survive verbatim.
    #[track_caller]
    pub fn report_records(
        &self,
        max_records: usize,
        states_to_return: &[CheckState],
    ) -> Vec<ReportRecord> {
        if max_records == 0 {
            return Vec::new();
        }
        let mut filtered: Vec<ReportRecord> = {
            let records = self.records.lock().expect("reporter record lock poisoned");
            records
                .iter()
                .filter(|record| states_to_return.contains(&record.state))
                .cloned()
                .collect()
        };
        // Stable sort keeps emission order within a severity.
        filtered.sort_by_key(|record| record.state);

        if filtered.len() <= max_records {
            return filtered;
        }

        let mut records: Vec<ReportRecord> = filtered;
        let remainder = records.split_off(max_records - 1);
        let mut counts: BTreeMap<CheckState, usize> = BTreeMap::new();
        for record in &remainder {
            *counts.entry(record.state).or_insert(0) += 1;
        }
        let summary = counts
            .iter()
            .map(|(state, count)| format!("{count} {state} messages"))
            .collect::<Vec<_>>()
            .join(", ");

        let location = Location::caller();
        let filename = Path::new(location.file())
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        records.push(ReportRecord {
            state: CheckState::Warning,
            message: format!("Suppressed {summary}"),
            filename,
            line: Some(location.line()),
            message_filename: None,
            message_line: None,
        });
        records
    }

    /// Returns every record in emission order.
    pub fn records(&self) -> Vec<ReportRecord> {
        self.records
            .lock()
            .expect("reporter record lock poisoned")
            .clone()
    }

    /// Marks the start of the check execution.
    pub fn start(&self) {
        let mut metrics = self.metrics.lock().expect("reporter metrics lock poisoned");
        metrics.start_time = Some(Utc::now());
    }

    /// Marks the completion of the check execution.
    pub fn complete(&self) {
        let mut metrics = self.metrics.lock().expect("reporter metrics lock poisoned");
        let end = Utc::now();
        metrics.end_time = Some(end);
        match metrics.start_time {
            Some(start) => {
                metrics.execution_time = Some((end - start).num_milliseconds() as f64 / 1000.0);
            }
            None => debug!("reporter completed without a recorded start"),
        }
    }

    /// Returns a snapshot of the timing metrics.
    pub fn metrics(&self) -> ReporterMetrics {
        self.metrics
            .lock()
            .expect("reporter metrics lock poisoned")
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_reporter_is_success() {
        let reporter = Reporter::new();
        assert_eq!(reporter.state(), CheckState::Success);
        assert!(reporter.records().is_empty());
    }

    #[test]
    fn test_state_follows_severity_precedence() {
        let reporter = Reporter::new();
        reporter.skip("skipped");
        assert_eq!(reporter.state(), CheckState::Skipped);
        reporter.warn("warned");
        assert_eq!(reporter.state(), CheckState::Warning);
        reporter.not_applicable("n/a");
        assert_eq!(reporter.state(), CheckState::NotApplicable);
        reporter.manual_check("look at this");
        assert_eq!(reporter.state(), CheckState::ManualCheck);
        reporter.fail("broken");
        assert_eq!(reporter.state(), CheckState::Failure);
        reporter.error("check blew up");
        assert_eq!(reporter.state(), CheckState::Error);
    }

    #[test]
    fn test_state_is_order_independent() {
        let forward = Reporter::new();
        forward.fail("a");
        forward.warn("b");
        let backward = Reporter::new();
        backward.warn("b");
        backward.fail("a");
        assert_eq!(forward.state(), backward.state());
    }

    #[test]
    fn test_unless_helpers_only_emit_on_false() {
        let reporter = Reporter::new();
        reporter.fail_unless(true, "should not appear");
        reporter.warn_unless(true, "should not appear");
        assert_eq!(reporter.state(), CheckState::Success);
        reporter.fail_unless(false, "appears");
        assert_eq!(reporter.state(), CheckState::Failure);
    }

    #[test]
    fn test_fail_at_formats_and_extracts_location() {
        let reporter = Reporter::new();
        reporter.fail_at("bad stanza", "default/app.conf", Some(14));
        let records = reporter.records();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].message,
            "bad stanza File: default/app.conf Line Number: 14"
        );
        assert_eq!(records[0].message_filename.as_deref(), Some("default/app.conf"));
        assert_eq!(records[0].message_line, Some(14));
        // Emission call site is this test file.
        assert_eq!(records[0].filename.as_deref(), Some("reporter.rs"));
    }

    #[test]
    fn test_extract_filename_lineno_from_message_text() {
        let (file, line) =
            extract_filename_lineno("deprecated option File: default/props.conf Line: 12");
        assert_eq!(file.as_deref(), Some("default/props.conf"));
        assert_eq!(line, Some(12));

        let (file, line) = extract_filename_lineno("no location here");
        assert!(file.is_none());
        assert!(line.is_none());
    }

    #[test]
    fn test_report_records_cap_and_summary() {
        let reporter = Reporter::new();
        for i in 0..30 {
            reporter.fail(format!("failure {i}"));
        }
        let records = reporter.report_records(5, &CheckState::ALL);
        assert_eq!(records.len(), 5);
        assert!(records[..4]
            .iter()
            .all(|record| record.state == CheckState::Failure));
        let summary = records.last().unwrap();
        assert_eq!(summary.state, CheckState::Warning);
        assert_eq!(summary.message, "Suppressed 26 failure messages");
    }

    #[test]
    fn test_report_records_sorts_worst_first() {
        let reporter = Reporter::new();
        reporter.warn("w");
        reporter.error("e");
        reporter.fail("f");
        let records = reporter.report_records(MAX_MESSAGES_PER_CHECK, &CheckState::ALL);
        let states: Vec<CheckState> = records.iter().map(|record| record.state).collect();
        assert_eq!(
            states,
            vec![CheckState::Error, CheckState::Failure, CheckState::Warning]
        );
    }

    #[test]
    fn test_report_records_filters_kinds() {
        let reporter = Reporter::new();
        reporter.fail("f");
        reporter.warn("w");
        let records = reporter.report_records(MAX_MESSAGES_PER_CHECK, &[CheckState::Warning]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].state, CheckState::Warning);
    }

    #[test]
    fn test_timing_metrics() {
        let reporter = Reporter::new();
        reporter.start();
        reporter.complete();
        let metrics = reporter.metrics();
        assert!(metrics.start_time.is_some());
        assert!(metrics.end_time.is_some());
        assert!(metrics.execution_time.unwrap() >= 0.0);
    }
}
