//! Error types for the appvet engine.

use std::path::PathBuf;
use thiserror::Error;

/// Result type used throughout the engine.
pub type Result<T> = std::result::Result<T, AppVetError>;

/// Errors that can occur while preparing or running a validation.
///
/// Check-level problems never surface here; they are contained at the
/// invocation boundary and recorded on the check's [`Reporter`]. A variant of
/// this enum escaping [`Validator::validate`] means the run itself failed.
///
/// [`Reporter`]: crate::report::Reporter
/// [`Validator::validate`]: crate::engine::Validator::validate
#[derive(Error, Debug)]
pub enum AppVetError {
    /// The artifact path does not exist or is not an unpacked directory.
    #[error("artifact is not readable: {}", path.display())]
    ArtifactUnreadable {
        /// The path that could not be opened.
        path: PathBuf,
    },

    /// A configuration file was requested that the artifact does not carry.
    #[error("no configuration file named '{name}' in artifact")]
    MissingConfig {
        /// The logical configuration name, e.g. `app`.
        name: String,
    },

    /// A configuration section was requested that the file does not contain.
    #[error("no section [{section}] in configuration file '{file}'")]
    MissingSection {
        /// The configuration file name.
        file: String,
        /// The section that was looked up.
        section: String,
    },

    /// A configuration option was requested that the section does not contain.
    #[error("no option '{option}' in section [{section}] of '{file}'")]
    MissingOption {
        /// The configuration file name.
        file: String,
        /// The section that was looked up.
        section: String,
        /// The option that was looked up.
        option: String,
    },

    /// A version string could not be parsed as a dotted numeric tuple.
    #[error("invalid version string: '{0}'")]
    InvalidVersion(String),

    /// Construction of a shared run resource failed.
    #[error("failed to set up resource '{name}': {reason}")]
    ResourceSetup {
        /// The resource name declared in the provider table.
        name: String,
        /// Why setup failed.
        reason: String,
    },

    /// A spawned check task could not be joined back.
    #[error("check task failed: {0}")]
    TaskJoin(String),

    /// Filesystem access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An invalid search pattern was supplied to the application facade.
    #[error("invalid search pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// An invalid glob pattern was supplied to the application facade.
    #[error("invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    /// Report serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Writing formatted report text failed.
    #[error("formatting error: {0}")]
    Format(#[from] std::fmt::Error),

    /// Generic engine error with a custom message.
    #[error("{0}")]
    Custom(String),
}

impl AppVetError {
    /// Creates a resource setup error with the given name and reason.
    pub fn resource_setup(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ResourceSetup {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a custom error with the given message.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppVetError::MissingSection {
            file: "server".into(),
            section: "general".into(),
        };
        assert_eq!(
            err.to_string(),
            "no section [general] in configuration file 'server'"
        );

        let err = AppVetError::resource_setup("cluster", "no licence available");
        assert_eq!(
            err.to_string(),
            "failed to set up resource 'cluster': no licence available"
        );
    }
}
