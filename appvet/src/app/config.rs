//! Structured configuration data for an artifact.
//!
//! The engine does not parse configuration grammars itself; parsed files are
//! handed to the [`Application`](super::Application) facade as
//! [`ConfigFile`] values exposing sections, options, and the line numbers
//! checks cite in their findings. Absence is an expected condition: lookups
//! return errors the caller is supposed to test for first.

use crate::error::{AppVetError, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// One `key = value` option with the line it was declared on.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigOption {
    /// The option name.
    pub name: String,
    /// The option value, verbatim.
    pub value: String,
    /// The 1-based line the option was declared on.
    pub lineno: u64,
}

/// One `[section]` with its options.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSection {
    /// The section name without brackets.
    pub name: String,
    /// The 1-based line the section header appears on.
    pub lineno: u64,
    options: BTreeMap<String, ConfigOption>,
}

impl ConfigSection {
    /// Creates an empty section declared at `lineno`.
    pub fn new(name: impl Into<String>, lineno: u64) -> Self {
        Self {
            name: name.into(),
            lineno,
            options: BTreeMap::new(),
        }
    }

    /// Returns true if the option exists.
    pub fn has_option(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    /// Returns the option, or an absence error to test for.
    pub fn option(&self, name: &str) -> Result<&ConfigOption> {
        self.options
            .get(name)
            .ok_or_else(|| AppVetError::MissingOption {
                file: String::new(),
                section: self.name.clone(),
                option: name.to_string(),
            })
    }

    /// Returns all options in name order.
    pub fn options(&self) -> impl Iterator<Item = &ConfigOption> {
        self.options.values()
    }

    /// Adds an option, replacing any previous value.
    pub fn set_option(&mut self, name: impl Into<String>, value: impl Into<String>, lineno: u64) {
        let name = name.into();
        self.options.insert(
            name.clone(),
            ConfigOption {
                name,
                value: value.into(),
                lineno,
            },
        );
    }
}

/// A parsed configuration file: named sections of named options.
///
/// # Examples
///
/// ```rust
/// use appvet::app::ConfigFile;
///
/// let mut config = ConfigFile::new("app");
/// config.add_section("launcher", 1);
/// config.set_option("launcher", "version", "2.1.0", 2);
///
/// assert!(config.has_section("launcher"));
/// let option = config.section("launcher").unwrap().option("version").unwrap();
/// assert_eq!(option.value, "2.1.0");
/// assert_eq!(option.lineno, 2);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ConfigFile {
    /// The logical file name, e.g. `app` for `app.conf`.
    pub name: String,
    sections: BTreeMap<String, ConfigSection>,
}

impl ConfigFile {
    /// Creates an empty configuration file.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sections: BTreeMap::new(),
        }
    }

    /// Returns true if the section exists.
    pub fn has_section(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    /// Returns true if the section exists and carries the option.
    pub fn has_option(&self, section: &str, option: &str) -> bool {
        self.sections
            .get(section)
            .map_or(false, |s| s.has_option(option))
    }

    /// Returns the section, or an absence error to test for.
    pub fn section(&self, name: &str) -> Result<&ConfigSection> {
        self.sections
            .get(name)
            .ok_or_else(|| AppVetError::MissingSection {
                file: self.name.clone(),
                section: name.to_string(),
            })
    }

    /// Returns an option's value, or an absence error to test for.
    pub fn option_value(&self, section: &str, option: &str) -> Result<&str> {
        let option = self
            .section(section)?
            .option(option)
            .map_err(|_| AppVetError::MissingOption {
                file: self.name.clone(),
                section: section.to_string(),
                option: option.to_string(),
            })?;
        Ok(&option.value)
    }

    /// Returns all sections in name order.
    pub fn sections(&self) -> impl Iterator<Item = &ConfigSection> {
        self.sections.values()
    }

    /// Returns the section names in name order.
    pub fn section_names(&self) -> Vec<&str> {
        self.sections.keys().map(String::as_str).collect()
    }

    /// Adds an empty section, keeping an existing one untouched.
    pub fn add_section(&mut self, name: impl Into<String>, lineno: u64) -> &mut ConfigSection {
        let name = name.into();
        self.sections
            .entry(name.clone())
            .or_insert_with(|| ConfigSection::new(name, lineno))
    }

    /// Sets an option, creating the section if needed.
    pub fn set_option(
        &mut self,
        section: impl Into<String>,
        option: impl Into<String>,
        value: impl Into<String>,
        lineno: u64,
    ) {
        let section = section.into();
        self.sections
            .entry(section.clone())
            .or_insert_with(|| ConfigSection::new(section, lineno))
            .set_option(option, value, lineno);
    }
}

/// The seam to an external configuration-file parser.
///
/// Implementations turn raw file text into a [`ConfigFile`]; the grammar
/// itself is outside this crate.
pub trait ConfigParser: Send + Sync {
    /// Parses `text` into a structured configuration file named `name`.
    fn parse(&self, name: &str, text: &str) -> Result<ConfigFile>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConfigFile {
        let mut config = ConfigFile::new("server");
        config.set_option("general", "serverName", "vetbox", 3);
        config.set_option("tls", "enableServerSSL", "true", 7);
        config
    }

    #[test]
    fn test_section_and_option_lookup() {
        let config = sample();
        assert!(config.has_section("general"));
        assert!(config.has_option("general", "serverName"));
        assert_eq!(config.option_value("general", "serverName").unwrap(), "vetbox");
    }

    #[test]
    fn test_absence_errors_name_the_missing_piece() {
        let config = sample();
        let err = config.section("replication").unwrap_err();
        assert!(err.to_string().contains("[replication]"));

        let err = config.option_value("general", "pass4SymmKey").unwrap_err();
        assert!(err.to_string().contains("pass4SymmKey"));
    }

    #[test]
    fn test_line_numbers_survive() {
        let config = sample();
        let option = config
            .section("tls")
            .unwrap()
            .option("enableServerSSL")
            .unwrap();
        assert_eq!(option.lineno, 7);
    }
}
