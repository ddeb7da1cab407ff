//! Prelude for commonly used types and traits in appvet.

pub use crate::app::Application;
pub use crate::core::{Check, CheckBuilder, CheckFilter, Group, GroupBuilder, GroupRegistry};
pub use crate::engine::{Validator, ValidatorBuilder};
pub use crate::error::{AppVetError, Result};
pub use crate::formatters::{FormatterConfig, ReportFormatter};
pub use crate::logging::LoggingConfig;
pub use crate::report::{CheckState, Reporter, ValidationReport};
pub use crate::version::CertVersion;
