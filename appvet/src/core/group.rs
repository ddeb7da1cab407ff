//! Named, ordered collections of checks.

use crate::core::check::Check;
use crate::core::filter::CheckFilter;
use std::sync::Arc;

/// Display-order offset applied to custom groups so built-ins sort first.
pub const CUSTOM_GROUP_ORDER_OFFSET: i64 = 10_000;

/// Default display order assigned when a group does not set one.
pub const DEFAULT_GROUP_DISPLAY_ORDER: i64 = 1000;

/// A named, ordered collection of checks sharing documentation and source.
///
/// Built-in and custom groups carry the same shape; a custom group's display
/// order is bumped so built-in groups always sort first in reports.
///
/// # Examples
///
/// ```rust
/// use appvet::core::{Check, CheckFilter, Group};
///
/// let group = Group::builder("check_configuration_files")
///     .doc("### Configuration file standards")
///     .check(
///         Check::builder("check_app_conf_exists")
///             .tags(["cloud"])
///             .routine_fn(|_ctx| Box::pin(async { Ok(()) }))
///             .build(),
///     )
///     .build();
///
/// let filter = CheckFilter::new().include_tag("cloud");
/// assert_eq!(group.checks(&filter).len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Group {
    name: String,
    doc: Option<String>,
    checks: Vec<Arc<Check>>,
    report_display_order: i64,
    custom: bool,
}

impl Group {
    /// Starts building a group with the given source name.
    pub fn builder(name: impl Into<String>) -> GroupBuilder {
        GroupBuilder::new(name)
    }

    /// Creates a group with the same identity and ordering as `self` but a
    /// different check collection. Used when partitioning a catalog.
    pub(crate) fn derived(&self, checks: Vec<Arc<Check>>) -> Group {
        Group {
            name: self.name.clone(),
            doc: self.doc.clone(),
            checks,
            report_display_order: self.report_display_order,
            custom: self.custom,
        }
    }

    /// The group's source name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The group's documentation, or its name when undocumented. Custom
    /// groups are labelled as such.
    pub fn doc(&self) -> String {
        let text = self.doc.as_deref().unwrap_or(&self.name);
        if self.custom {
            format!("{text} (CUSTOM CHECK GROUP)")
        } else {
            text.to_string()
        }
    }

    /// Where this group sorts in report output.
    pub fn report_display_order(&self) -> i64 {
        self.report_display_order
    }

    /// True if this group was registered as a custom group.
    pub fn is_custom(&self) -> bool {
        self.custom
    }

    /// Returns the checks matching `filter`, re-sorted by display order.
    pub fn checks(&self, filter: &CheckFilter) -> Vec<Arc<Check>> {
        let mut selected: Vec<Arc<Check>> = self
            .checks
            .iter()
            .filter(|check| check.matches(filter))
            .cloned()
            .collect();
        selected.sort_by_key(|check| check.report_display_order());
        selected
    }

    /// Returns every check regardless of filtering, in display order.
    pub fn all_checks(&self) -> Vec<Arc<Check>> {
        self.checks(&CheckFilter::default())
    }

    /// Returns the number of checks matching `filter`.
    pub fn check_count(&self, filter: &CheckFilter) -> usize {
        self.checks(filter).len()
    }

    /// True when at least one check matches `filter`.
    pub fn has_checks(&self, filter: &CheckFilter) -> bool {
        self.checks.iter().any(|check| check.matches(filter))
    }

    /// True when a check with the given name exists, filters aside.
    pub fn has_check(&self, name: &str) -> bool {
        self.checks.iter().any(|check| check.name() == name)
    }

    /// Appends a check to the group.
    pub fn add_check(&mut self, check: Arc<Check>) {
        self.checks.push(check);
    }

    /// Returns the number of matching checks that inspect the artifact
    /// statically.
    pub fn count_static_checks(&self, filter: &CheckFilter) -> usize {
        self.checks(filter)
            .iter()
            .filter(|check| !check.is_dynamic())
            .count()
    }

    /// Returns the number of matching checks that need a live target
    /// instance.
    pub fn count_dynamic_checks(&self, filter: &CheckFilter) -> usize {
        self.checks(filter)
            .iter()
            .filter(|check| check.is_dynamic())
            .count()
    }

    /// Returns the unique tags across all checks in the group, in first-seen
    /// order.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for check in &self.checks {
            for tag in check.tags() {
                if !tags.contains(tag) {
                    tags.push(tag.clone());
                }
            }
        }
        tags
    }
}

/// Builder for [`Group`] instances.
#[derive(Debug)]
pub struct GroupBuilder {
    name: String,
    doc: Option<String>,
    checks: Vec<Arc<Check>>,
    report_display_order: Option<i64>,
    custom: bool,
}

impl GroupBuilder {
    /// Creates a new builder for a group with the given source name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            checks: Vec::new(),
            report_display_order: None,
            custom: false,
        }
    }

    /// Sets the group's documentation.
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Sets the group's display order.
    pub fn display_order(mut self, order: i64) -> Self {
        self.report_display_order = Some(order);
        self
    }

    /// Marks the group as custom; custom groups sort after every built-in.
    pub fn custom(mut self, custom: bool) -> Self {
        self.custom = custom;
        self
    }

    /// Adds a check to the group.
    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(Arc::new(check));
        self
    }

    /// Adds multiple checks to the group.
    pub fn checks<I>(mut self, checks: I) -> Self
    where
        I: IntoIterator<Item = Check>,
    {
        self.checks.extend(checks.into_iter().map(Arc::new));
        self
    }

    /// Builds the group.
    pub fn build(self) -> Group {
        let mut order = self
            .report_display_order
            .unwrap_or(DEFAULT_GROUP_DISPLAY_ORDER);
        if self.custom {
            order += CUSTOM_GROUP_ORDER_OFFSET;
        }
        Group {
            name: self.name,
            doc: self.doc,
            checks: self.checks,
            report_display_order: order,
            custom: self.custom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::check::Check;

    fn check_with_tags(name: &str, tags: &[&str]) -> Check {
        Check::builder(name)
            .tags(tags.to_vec())
            .routine_fn(|_ctx| Box::pin(async { Ok(()) }))
            .build()
    }

    #[test]
    fn test_filtering_selects_matching_checks() {
        let group = Group::builder("check_cloud_group")
            .check(check_with_tags("check_a", &["cloud"]))
            .check(check_with_tags("check_b", &["appapproval"]))
            .build();

        let filter = CheckFilter::new().include_tag("cloud");
        let selected = group.checks(&filter);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name(), "check_a");
    }

    #[test]
    fn test_checks_sorted_by_display_order() {
        let group = Group::builder("check_ordering")
            .check(
                Check::builder("check_last")
                    .display_order(2000)
                    .routine_fn(|_ctx| Box::pin(async { Ok(()) }))
                    .build(),
            )
            .check(
                Check::builder("check_first")
                    .display_order(10)
                    .routine_fn(|_ctx| Box::pin(async { Ok(()) }))
                    .build(),
            )
            .build();

        let checks = group.all_checks();
        let names: Vec<&str> = checks.iter().map(|check| check.name()).collect();
        assert_eq!(names, vec!["check_first", "check_last"]);
    }

    #[test]
    fn test_custom_groups_sort_after_builtins() {
        let builtin = Group::builder("check_builtin").build();
        let custom = Group::builder("check_custom").custom(true).build();
        assert!(custom.report_display_order() > builtin.report_display_order());
        assert!(custom.doc().ends_with("(CUSTOM CHECK GROUP)"));
    }

    #[test]
    fn test_tags_are_unique_in_first_seen_order() {
        let group = Group::builder("check_tags")
            .check(check_with_tags("check_a", &["cloud", "manual"]))
            .check(check_with_tags("check_b", &["cloud", "appapproval"]))
            .build();
        assert_eq!(group.tags(), vec!["cloud", "manual", "appapproval"]);
    }

    #[test]
    fn test_static_dynamic_counting() {
        let group = Group::builder("check_mixed")
            .check(check_with_tags("check_static", &[]))
            .check(
                Check::builder("check_dynamic")
                    .requires(["standalone"])
                    .routine_fn(|_ctx| Box::pin(async { Ok(()) }))
                    .build(),
            )
            .build();

        let filter = CheckFilter::default();
        assert_eq!(group.count_static_checks(&filter), 1);
        assert_eq!(group.count_dynamic_checks(&filter), 1);
    }
}
