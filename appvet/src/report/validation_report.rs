//! Aggregated results of a validation run.
//!
//! A [`ValidationReport`] covers one engine invocation; it owns one
//! [`ApplicationValidationReport`] per artifact, each holding the frozen
//! [`Reporter`] of every executed check. Both levels carry a
//! [`RunStatus`] lifecycle and wall-clock metrics.

use super::reporter::{Reporter, ReporterMetrics};
use super::CheckState;
use crate::core::{Check, CheckFilter, Group, PACKAGING_STANDARDS_TAG};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::error;

/// Lifecycle position of a run or a per-artifact sub-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Constructed but not started.
    NotExecuted,
    /// Execution underway.
    InProgress,
    /// Execution finished without an engine-level error.
    Completed,
    /// Execution aborted by an engine-level error.
    Error,
}

/// One executed check: where it came from and what it reported.
#[derive(Debug, Clone)]
pub struct CheckRun {
    /// The group the check ran under.
    pub group: Arc<Group>,
    /// The check that ran.
    pub check: Arc<Check>,
    /// The frozen per-check reporter.
    pub reporter: Arc<Reporter>,
}

impl CheckRun {
    /// The check's verdict state.
    pub fn state(&self) -> CheckState {
        self.reporter.state()
    }
}

/// Descriptive metadata captured from the artifact's own declarations.
///
/// Everything here is best effort: an artifact that declares nothing, or
/// whose `app.conf` was never parsed, leaves the fields unset.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AppInfo {
    /// The `[launcher] author` value.
    pub author: Option<String>,
    /// The `[launcher] description` value.
    pub description: Option<String>,
    /// The `[ui] label` value.
    pub label: Option<String>,
    /// The `[launcher] version` value.
    pub version: Option<String>,
    /// SHA-256 digest over the artifact's contents.
    pub hash: Option<String>,
}

/// Results for one artifact.
#[derive(Debug)]
pub struct ApplicationValidationReport {
    app_name: String,
    app_info: AppInfo,
    filter: CheckFilter,
    status: RunStatus,
    metrics: ReporterMetrics,
    results: Vec<CheckRun>,
    errors: Vec<String>,
    unreadable: bool,
}

impl ApplicationValidationReport {
    /// Creates a report in the `NotExecuted` state.
    pub fn new(app_name: impl Into<String>, filter: CheckFilter) -> Self {
        Self {
            app_name: app_name.into(),
            app_info: AppInfo::default(),
            filter,
            status: RunStatus::NotExecuted,
            metrics: ReporterMetrics::default(),
            results: Vec::new(),
            errors: Vec::new(),
            unreadable: false,
        }
    }

    /// The artifact's name.
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// The artifact's declared metadata.
    pub fn app_info(&self) -> &AppInfo {
        &self.app_info
    }

    /// Records the artifact's declared metadata.
    pub fn record_app_info(&mut self, info: AppInfo) {
        self.app_info = info;
    }

    /// The filter this run was scoped to.
    pub fn filter(&self) -> &CheckFilter {
        &self.filter
    }

    /// Current lifecycle status.
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Timing metrics for the artifact's run.
    pub fn metrics(&self) -> &ReporterMetrics {
        &self.metrics
    }

    /// All executed checks in execution order.
    pub fn results(&self) -> &[CheckRun] {
        &self.results
    }

    /// Engine-level error messages recorded against this artifact.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Marks the run started.
    pub fn validation_start(&mut self) {
        self.status = RunStatus::InProgress;
        self.metrics.start_time = Some(Utc::now());
    }

    /// Records one executed check.
    pub fn add_result(&mut self, group: Arc<Group>, check: Arc<Check>, reporter: Arc<Reporter>) {
        self.results.push(CheckRun {
            group,
            check,
            reporter,
        });
    }

    /// Marks the run finished.
    pub fn validation_completed(&mut self) {
        let now = Utc::now();
        if let Some(start) = self.metrics.start_time {
            self.metrics.execution_time = Some((now - start).num_milliseconds() as f64 / 1000.0);
        }
        self.metrics.end_time = Some(now);
        self.status = RunStatus::Completed;
    }

    /// Records an engine-level error and moves to the `Error` status.
    pub fn validation_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!(app.name = %self.app_name, error = %message, "artifact validation errored");
        self.errors.push(message);
        let now = Utc::now();
        if let Some(start) = self.metrics.start_time {
            self.metrics.execution_time = Some((now - start).num_milliseconds() as f64 / 1000.0);
        }
        self.metrics.end_time = Some(now);
        self.status = RunStatus::Error;
    }

    /// Records that the artifact could not be opened at all. Implies the
    /// `Error` status.
    pub fn artifact_unreadable(&mut self, message: impl Into<String>) {
        self.unreadable = true;
        self.validation_error(message);
    }

    /// True when the artifact could not be opened.
    pub fn is_unreadable(&self) -> bool {
        self.unreadable
    }

    /// Groups results by their originating group, preserving the order in
    /// which groups first produced a result.
    pub fn groups(&self) -> Vec<(Arc<Group>, Vec<&CheckRun>)> {
        let mut order: Vec<Arc<Group>> = Vec::new();
        let mut by_group: BTreeMap<String, Vec<&CheckRun>> = BTreeMap::new();
        for run in &self.results {
            if !order.iter().any(|g| g.name() == run.group.name()) {
                order.push(Arc::clone(&run.group));
            }
            by_group
                .entry(run.group.name().to_string())
                .or_default()
                .push(run);
        }
        order
            .into_iter()
            .map(|group| {
                let runs = by_group.remove(group.name()).unwrap_or_default();
                (group, runs)
            })
            .collect()
    }

    /// Per-state counts across all executed checks. Every state appears,
    /// zero counts included.
    pub fn get_summary(&self) -> BTreeMap<CheckState, usize> {
        let mut summary: BTreeMap<CheckState, usize> =
            CheckState::ALL.iter().map(|s| (*s, 0)).collect();
        for run in &self.results {
            *summary.entry(run.state()).or_insert(0) += 1;
        }
        summary
    }

    /// True when any check carrying `tag` ended in a blocking state.
    pub fn has_invalid_results_for_tag(&self, tag: &str) -> bool {
        self.results.iter().any(|run| {
            run.check.tags().iter().any(|t| t == tag) && run.state().is_blocking()
        })
    }

    /// True when a packaging-tagged check ended in a blocking state.
    pub fn has_invalid_package(&self) -> bool {
        self.has_invalid_results_for_tag(PACKAGING_STANDARDS_TAG)
    }

    /// True when any check at all ended in a blocking state.
    pub fn has_blocking_results(&self) -> bool {
        self.results.iter().any(|run| run.state().is_blocking())
    }
}

/// Results of one whole engine invocation.
#[derive(Debug)]
pub struct ValidationReport {
    status: RunStatus,
    metrics: ReporterMetrics,
    application_reports: Vec<ApplicationValidationReport>,
    errors: Vec<String>,
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationReport {
    /// Creates a report in the `NotExecuted` state.
    pub fn new() -> Self {
        Self {
            status: RunStatus::NotExecuted,
            metrics: ReporterMetrics::default(),
            application_reports: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Current lifecycle status.
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Timing metrics for the whole run.
    pub fn metrics(&self) -> &ReporterMetrics {
        &self.metrics
    }

    /// Per-artifact reports in run order.
    pub fn application_reports(&self) -> &[ApplicationValidationReport] {
        &self.application_reports
    }

    /// Marks the run started.
    pub fn validation_start(&mut self) {
        self.status = RunStatus::InProgress;
        self.metrics.start_time = Some(Utc::now());
    }

    /// Adds one artifact's finished report. An artifact that errored pulls
    /// the whole run into the `Error` status.
    pub fn add_application_report(&mut self, report: ApplicationValidationReport) {
        if report.status() == RunStatus::Error {
            self.status = RunStatus::Error;
        }
        self.application_reports.push(report);
    }

    /// Marks the run finished, unless an artifact already errored.
    pub fn validation_completed(&mut self) {
        let now = Utc::now();
        if let Some(start) = self.metrics.start_time {
            self.metrics.execution_time = Some((now - start).num_milliseconds() as f64 / 1000.0);
        }
        self.metrics.end_time = Some(now);
        if self.status != RunStatus::Error {
            self.status = RunStatus::Completed;
        }
    }

    /// Records a run-level error and moves to the `Error` status.
    pub fn validation_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!(error = %message, "validation run errored");
        self.errors.push(message);
        let now = Utc::now();
        if let Some(start) = self.metrics.start_time {
            self.metrics.execution_time = Some((now - start).num_milliseconds() as f64 / 1000.0);
        }
        self.metrics.end_time = Some(now);
        self.status = RunStatus::Error;
    }

    /// Run-level errors plus every artifact's errors, in order.
    pub fn errors(&self) -> Vec<&str> {
        self.errors
            .iter()
            .map(String::as_str)
            .chain(
                self.application_reports
                    .iter()
                    .flat_map(|r| r.errors().iter().map(String::as_str)),
            )
            .collect()
    }

    /// Per-state counts aggregated across all artifacts.
    pub fn get_summary(&self) -> BTreeMap<CheckState, usize> {
        let mut summary: BTreeMap<CheckState, usize> =
            CheckState::ALL.iter().map(|s| (*s, 0)).collect();
        for report in &self.application_reports {
            for (state, count) in report.get_summary() {
                *summary.entry(state).or_insert(0) += count;
            }
        }
        summary
    }

    /// True when any artifact produced an error-severity finding.
    pub fn has_error_findings(&self) -> bool {
        self.application_reports.iter().any(|report| {
            report
                .results()
                .iter()
                .any(|run| run.state() == CheckState::Error)
        })
    }

    /// True when any artifact produced a blocking (error or failure)
    /// finding.
    pub fn has_blocking_findings(&self) -> bool {
        self.application_reports
            .iter()
            .any(ApplicationValidationReport::has_blocking_results)
    }

    /// True when any artifact could not be opened at all.
    pub fn has_unreadable_artifacts(&self) -> bool {
        self.application_reports
            .iter()
            .any(ApplicationValidationReport::is_unreadable)
    }

    /// True when any artifact failed packaging validation.
    pub fn has_invalid_packages(&self) -> bool {
        self.application_reports
            .iter()
            .any(ApplicationValidationReport::has_invalid_package)
    }

    /// The process exit code for this run.
    ///
    /// Precedence, worst first: `3` an artifact could not be opened or
    /// failed packaging validation, `2` the run itself errored, `1` a check
    /// produced an error-severity finding, `0` otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.has_unreadable_artifacts() || self.has_invalid_packages() {
            3
        } else if self.status == RunStatus::Error || !self.errors().is_empty() {
            2
        } else if self.has_error_findings() {
            1
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CheckBuilder, GroupBuilder};

    fn run_with_states(states: &[(&str, CheckState)]) -> ApplicationValidationReport {
        let mut report = ApplicationValidationReport::new("demo_app", CheckFilter::new());
        report.validation_start();
        let group = Arc::new(
            GroupBuilder::new("demo_group")
                .doc("Demo checks")
                .build(),
        );
        for (name, state) in states {
            let check = Arc::new(
                CheckBuilder::new(*name)
                    .tags(["cert"])
                    .build(),
            );
            let reporter = Reporter::new();
            match state {
                CheckState::Error => reporter.error("boom"),
                CheckState::Failure => reporter.fail("bad"),
                CheckState::ManualCheck => reporter.manual_check("look"),
                CheckState::NotApplicable => reporter.not_applicable("n/a"),
                CheckState::Warning => reporter.warn("meh"),
                CheckState::Skipped => reporter.skip("later"),
                CheckState::Success => {}
            }
            report.add_result(Arc::clone(&group), check, Arc::new(reporter));
        }
        report.validation_completed();
        report
    }

    #[test]
    fn test_summary_counts_every_state() {
        let report = run_with_states(&[
            ("check_a", CheckState::Success),
            ("check_b", CheckState::Failure),
            ("check_c", CheckState::Failure),
        ]);
        let summary = report.get_summary();
        assert_eq!(summary[&CheckState::Failure], 2);
        assert_eq!(summary[&CheckState::Success], 1);
        assert_eq!(summary[&CheckState::Error], 0);
        assert_eq!(summary.len(), CheckState::ALL.len());
    }

    #[test]
    fn test_status_lifecycle() {
        let mut report = ValidationReport::new();
        assert_eq!(report.status(), RunStatus::NotExecuted);
        report.validation_start();
        assert_eq!(report.status(), RunStatus::InProgress);
        report.validation_completed();
        assert_eq!(report.status(), RunStatus::Completed);
        assert!(report.metrics().execution_time.is_some());
    }

    #[test]
    fn test_artifact_error_poisons_run_status() {
        let mut run = ValidationReport::new();
        run.validation_start();
        let mut artifact = ApplicationValidationReport::new("broken_app", CheckFilter::new());
        artifact.validation_start();
        artifact.validation_error("cannot enumerate artifact contents");
        run.add_application_report(artifact);
        run.validation_completed();

        assert_eq!(run.status(), RunStatus::Error);
        assert_eq!(run.errors(), vec!["cannot enumerate artifact contents"]);
        assert_eq!(run.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_precedence() {
        let clean = ValidationReport::new();
        assert_eq!(clean.exit_code(), 0);

        let mut errored_check = ValidationReport::new();
        errored_check.validation_start();
        errored_check.add_application_report(run_with_states(&[("check_a", CheckState::Error)]));
        errored_check.validation_completed();
        assert_eq!(errored_check.exit_code(), 1);

        let mut unreadable = ValidationReport::new();
        unreadable.validation_start();
        let mut artifact = ApplicationValidationReport::new("gone_app", CheckFilter::new());
        artifact.validation_start();
        artifact.artifact_unreadable("no such file");
        unreadable.add_application_report(artifact);
        unreadable.validation_completed();
        assert_eq!(unreadable.exit_code(), 3);
    }

    #[test]
    fn test_blocking_detection_per_tag() {
        let mut report = ApplicationValidationReport::new("demo_app", CheckFilter::new());
        report.validation_start();
        let group = Arc::new(GroupBuilder::new("packaging").build());
        let check = Arc::new(
            CheckBuilder::new("check_archive_is_readable")
                .tags(["packaging_standards"])
                .build(),
        );
        let reporter = Reporter::new();
        reporter.fail("archive truncated");
        report.add_result(group, check, Arc::new(reporter));
        report.validation_completed();

        assert!(report.has_invalid_results_for_tag("packaging_standards"));
        assert!(!report.has_invalid_results_for_tag("cloud"));
        assert!(report.has_invalid_package());
        assert!(report.has_blocking_results());

        let mut run = ValidationReport::new();
        run.validation_start();
        run.add_application_report(report);
        run.validation_completed();
        assert!(run.has_invalid_packages());
        assert_eq!(run.exit_code(), 3);
    }

    #[test]
    fn test_app_info_defaults_empty_and_records() {
        let mut report = ApplicationValidationReport::new("meta_app", CheckFilter::new());
        assert!(report.app_info().version.is_none());

        report.record_app_info(AppInfo {
            author: Some("Example Corp".to_string()),
            version: Some("2.1.0".to_string()),
            hash: Some("deadbeef".to_string()),
            ..AppInfo::default()
        });
        assert_eq!(report.app_info().author.as_deref(), Some("Example Corp"));
        assert_eq!(report.app_info().version.as_deref(), Some("2.1.0"));
    }

    #[test]
    fn test_groups_preserve_first_seen_order() {
        let report = run_with_states(&[("check_a", CheckState::Success)]);
        let groups = report.groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0.name(), "demo_group");
        assert_eq!(groups[0].1.len(), 1);
    }
}
