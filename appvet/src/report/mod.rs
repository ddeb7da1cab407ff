//! Finding collection and run-level aggregation.
//!
//! [`Reporter`] accumulates one check's findings and computes its verdict;
//! [`ValidationReport`] and [`ApplicationValidationReport`] aggregate frozen
//! reporters across a run.

mod reporter;
mod validation_report;

pub use reporter::{
    extract_filename_lineno, CheckState, ReportRecord, Reporter, ReporterMetrics,
    MAX_MESSAGES_PER_CHECK,
};
pub use validation_report::{
    AppInfo, ApplicationValidationReport, CheckRun, RunStatus, ValidationReport,
};
