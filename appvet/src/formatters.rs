//! Report formatting for validation runs.
//!
//! This module turns a [`ValidationReport`] into output for people or for
//! machines: pretty JSON for programmatic consumption, and a readable text
//! rendering for terminals. Both honor the per-check message cap so output
//! stays bounded no matter how noisy a check was.
//!
//! # Examples
//!
//! ```rust
//! use appvet::formatters::{HumanFormatter, JsonFormatter, ReportFormatter};
//! use appvet::report::ValidationReport;
//!
//! let report = ValidationReport::new();
//! let formatter = HumanFormatter::new();
//! let output = formatter.format(&report).unwrap();
//! assert!(output.contains("Summary"));
//! ```

use crate::error::Result;
use crate::report::{CheckState, ValidationReport, MAX_MESSAGES_PER_CHECK};
use serde_json::json;
use std::fmt::Write;

/// Configuration options shared by the formatters.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Maximum records emitted per check before truncation kicks in.
    pub max_messages: usize,
    /// Record kinds to include; empty means every kind.
    pub states: Vec<CheckState>,
    /// Whether the human formatter colorizes output.
    pub use_colors: bool,
    /// Whether timing metrics are included.
    pub include_metrics: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            max_messages: MAX_MESSAGES_PER_CHECK,
            states: Vec::new(),
            use_colors: true,
            include_metrics: true,
        }
    }
}

impl FormatterConfig {
    /// A configuration suitable for CI logs: no colors, no timing.
    pub fn ci() -> Self {
        Self {
            use_colors: false,
            include_metrics: false,
            ..Self::default()
        }
    }

    /// Sets the per-check message cap.
    pub fn with_max_messages(mut self, max: usize) -> Self {
        self.max_messages = max;
        self
    }

    /// Restricts output to the given record kinds.
    pub fn with_states(mut self, states: impl IntoIterator<Item = CheckState>) -> Self {
        self.states = states.into_iter().collect();
        self
    }

    /// Sets whether the human formatter colorizes output.
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    fn effective_states(&self) -> Vec<CheckState> {
        if self.states.is_empty() {
            CheckState::ALL.to_vec()
        } else {
            self.states.clone()
        }
    }
}

/// Trait for rendering a validation report into an output format.
pub trait ReportFormatter {
    /// Formats a report with the formatter's own configuration.
    fn format(&self, report: &ValidationReport) -> Result<String>;

    /// Formats a report with an explicit configuration.
    fn format_with_config(
        &self,
        report: &ValidationReport,
        _config: &FormatterConfig,
    ) -> Result<String> {
        self.format(report)
    }
}

/// Renders the full report tree as JSON.
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    config: FormatterConfig,
}

impl JsonFormatter {
    /// Creates a JSON formatter with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a JSON formatter with the specified configuration.
    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &ValidationReport) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(
        &self,
        report: &ValidationReport,
        config: &FormatterConfig,
    ) -> Result<String> {
        let states = config.effective_states();
        let applications: Vec<serde_json::Value> = report
            .application_reports()
            .iter()
            .map(|app| {
                let groups: Vec<serde_json::Value> = app
                    .groups()
                    .into_iter()
                    .map(|(group, runs)| {
                        let checks: Vec<serde_json::Value> = runs
                            .iter()
                            .map(|run| {
                                json!({
                                    "name": run.check.name(),
                                    "description": run.check.doc(),
                                    "tags": run.check.tags(),
                                    "result": run.state().as_str(),
                                    "messages": run
                                        .reporter
                                        .report_records(config.max_messages, &states),
                                    "metrics": run.reporter.metrics(),
                                })
                            })
                            .collect();
                        json!({
                            "name": group.name(),
                            "description": group.doc(),
                            "checks": checks,
                        })
                    })
                    .collect();
                json!({
                    "app_name": app.app_name(),
                    "app_author": app.app_info().author,
                    "app_description": app.app_info().description,
                    "app_label": app.app_info().label,
                    "app_version": app.app_info().version,
                    "app_hash": app.app_info().hash,
                    "status": app.status(),
                    "summary": summary_json(app.get_summary()),
                    "errors": app.errors(),
                    "metrics": app.metrics(),
                    "groups": groups,
                })
            })
            .collect();

        let document = json!({
            "status": report.status(),
            "summary": summary_json(report.get_summary()),
            "errors": report.errors(),
            "metrics": report.metrics(),
            "exit_code": report.exit_code(),
            "reports": applications,
        });
        Ok(serde_json::to_string_pretty(&document)?)
    }
}

fn summary_json(
    summary: std::collections::BTreeMap<CheckState, usize>,
) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (state, count) in summary {
        map.insert(state.as_str().to_string(), json!(count));
    }
    serde_json::Value::Object(map)
}

/// Renders the report as readable terminal output.
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    /// Creates a human formatter with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a human formatter with the specified configuration.
    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }

    fn paint(state: CheckState, text: &str, use_colors: bool) -> String {
        if !use_colors {
            return text.to_string();
        }
        let code = match state {
            CheckState::Error | CheckState::Failure => "31",
            CheckState::Warning | CheckState::ManualCheck => "33",
            CheckState::Success => "32",
            CheckState::Skipped | CheckState::NotApplicable => "36",
        };
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

impl ReportFormatter for HumanFormatter {
    fn format(&self, report: &ValidationReport) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(
        &self,
        report: &ValidationReport,
        config: &FormatterConfig,
    ) -> Result<String> {
        let states = config.effective_states();
        let mut out = String::new();

        for app in report.application_reports() {
            writeln!(out)?;
            match &app.app_info().version {
                Some(version) => {
                    writeln!(out, "Validating: {} Version: {version}", app.app_name())?
                }
                None => writeln!(out, "Validating: {}", app.app_name())?,
            }
            writeln!(out, "{}", "=".repeat(60))?;

            for error in app.errors() {
                writeln!(out, "ERROR: {error}")?;
            }

            for (group, runs) in app.groups() {
                writeln!(out)?;
                writeln!(out, "{}", group.doc())?;
                for run in runs {
                    let state = run.state();
                    let label = Self::paint(state, state.as_str(), config.use_colors);
                    writeln!(out, "  [{label}] {}", run.check.name())?;
                    for record in run.reporter.report_records(config.max_messages, &states) {
                        writeln!(out, "      {}: {}", record.state, record.message)?;
                        if let Some(file) = &record.message_filename {
                            match record.message_line {
                                Some(line) => writeln!(out, "        at {file}:{line}")?,
                                None => writeln!(out, "        at {file}")?,
                            }
                        }
                    }
                }
            }
        }

        writeln!(out)?;
        writeln!(out, "Summary")?;
        writeln!(out, "{}", "-".repeat(60))?;
        for (state, count) in report.get_summary() {
            let label = Self::paint(state, state.as_str(), config.use_colors);
            writeln!(out, "  {label:>14}: {count}")?;
        }
        if config.include_metrics {
            if let Some(seconds) = report.metrics().execution_time {
                writeln!(out, "  execution time: {seconds:.2}s")?;
            }
        }
        for error in report.errors() {
            writeln!(out, "  run error: {error}")?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CheckBuilder, CheckFilter, GroupBuilder};
    use crate::report::{AppInfo, ApplicationValidationReport, Reporter};
    use std::sync::Arc;

    fn sample_report() -> ValidationReport {
        let mut run = ValidationReport::new();
        run.validation_start();
        let mut app = ApplicationValidationReport::new("sample_app", CheckFilter::new());
        app.validation_start();
        app.record_app_info(AppInfo {
            version: Some("1.2.0".to_string()),
            ..AppInfo::default()
        });

        let group = Arc::new(GroupBuilder::new("packaging").doc("Packaging checks").build());
        let check = Arc::new(
            CheckBuilder::new("check_archive_is_readable")
                .tags(["packaging_standards"])
                .build(),
        );
        let reporter = Reporter::new();
        reporter.fail("archive member is corrupt File: default/app.conf Line: 3");
        app.add_result(group, check, Arc::new(reporter));

        app.validation_completed();
        run.add_application_report(app);
        run.validation_completed();
        run
    }

    #[test]
    fn test_json_output_is_valid_and_complete() {
        let report = sample_report();
        let output = JsonFormatter::new().format(&report).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        // The sample's failing check carries the packaging tag.
        assert_eq!(parsed["exit_code"], 3);
        assert_eq!(parsed["summary"]["failure"], 1);
        assert_eq!(parsed["reports"][0]["app_version"], "1.2.0");
        assert!(parsed["reports"][0]["app_author"].is_null());
        let check = &parsed["reports"][0]["groups"][0]["checks"][0];
        assert_eq!(check["name"], "check_archive_is_readable");
        assert_eq!(check["result"], "failure");
        assert_eq!(check["messages"][0]["message_filename"], "default/app.conf");
    }

    #[test]
    fn test_human_output_names_check_and_state() {
        let report = sample_report();
        let output = HumanFormatter::with_config(FormatterConfig::ci())
            .format(&report)
            .unwrap();
        assert!(output.contains("Validating: sample_app Version: 1.2.0"));
        assert!(output.contains("[failure] check_archive_is_readable"));
        assert!(output.contains("at default/app.conf:3"));
        assert!(!output.contains('\x1b'));
    }

    #[test]
    fn test_message_cap_applies_per_check() {
        let mut run = ValidationReport::new();
        run.validation_start();
        let mut app = ApplicationValidationReport::new("noisy_app", CheckFilter::new());
        app.validation_start();
        let group = Arc::new(GroupBuilder::new("noise").build());
        let check = Arc::new(CheckBuilder::new("check_noisy").build());
        let reporter = Reporter::new();
        for i in 0..40 {
            reporter.fail(format!("finding {i}"));
        }
        app.add_result(group, check, Arc::new(reporter));
        app.validation_completed();
        run.add_application_report(app);
        run.validation_completed();

        let output = JsonFormatter::with_config(FormatterConfig::default().with_max_messages(5))
            .format(&run)
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        let messages = parsed["reports"][0]["groups"][0]["checks"][0]["messages"]
            .as_array()
            .unwrap();
        assert_eq!(messages.len(), 5);
        assert_eq!(
            messages[4]["message"],
            "Suppressed 36 failure messages"
        );
    }
}
