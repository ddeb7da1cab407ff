//! Check selection criteria.

use crate::version::CertVersion;

/// Tag and version criteria used to select checks from a catalog.
///
/// The default filter matches every check.
///
/// # Examples
///
/// ```rust
/// use appvet::core::CheckFilter;
///
/// let filter = CheckFilter::new()
///     .include_tag("cloud")
///     .exclude_tag("manual")
///     .target_version("1.5".parse().unwrap());
/// assert_eq!(filter.included_tags(), ["cloud"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CheckFilter {
    included_tags: Vec<String>,
    excluded_tags: Vec<String>,
    target_version: Option<CertVersion>,
}

impl CheckFilter {
    /// Creates a filter that matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tag checks must carry to be selected.
    pub fn include_tag(mut self, tag: impl Into<String>) -> Self {
        self.included_tags.push(tag.into());
        self
    }

    /// Adds several included tags at once.
    pub fn include_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.included_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Adds a tag that deselects the checks carrying it.
    pub fn exclude_tag(mut self, tag: impl Into<String>) -> Self {
        self.excluded_tags.push(tag.into());
        self
    }

    /// Adds several excluded tags at once.
    pub fn exclude_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Sets the certification version the run targets.
    pub fn target_version(mut self, version: CertVersion) -> Self {
        self.target_version = Some(version);
        self
    }

    /// Returns the included tags.
    pub fn included_tags(&self) -> &[String] {
        &self.included_tags
    }

    /// Returns the excluded tags.
    pub fn excluded_tags(&self) -> &[String] {
        &self.excluded_tags
    }

    /// Returns the targeted version, if any.
    pub fn version(&self) -> Option<&CertVersion> {
        self.target_version.as_ref()
    }
}
