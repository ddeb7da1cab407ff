//! Explicit registration of check groups.
//!
//! Rule sources are registered through this API rather than discovered by
//! walking directories and loading code at run time: each source contributes
//! one [`Group`] carrying its checks and metadata. Built-in groups come from
//! the engine or the embedding application; custom groups come from
//! submitters extending the catalog.

use crate::core::filter::CheckFilter;
use crate::core::group::Group;
use std::sync::Arc;
use tracing::debug;

/// The catalog of registered check groups.
///
/// # Examples
///
/// ```rust
/// use appvet::core::{Check, CheckFilter, Group, GroupRegistry};
///
/// let mut registry = GroupRegistry::new();
/// registry.register(
///     Group::builder("check_packaging_standards")
///         .check(
///             Check::builder("check_package_extracts")
///                 .tags(["packaging_standards"])
///                 .routine_fn(|_ctx| Box::pin(async { Ok(()) }))
///                 .build(),
///         )
///         .build(),
/// );
///
/// let groups = registry.groups(&CheckFilter::new().include_tag("packaging_standards"));
/// assert_eq!(groups.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct GroupRegistry {
    groups: Vec<Arc<Group>>,
}

impl GroupRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a built-in group.
    pub fn register(&mut self, group: Group) {
        debug!(group.name = %group.name(), group.custom = group.is_custom(), "registering group");
        self.groups.push(Arc::new(group));
    }

    /// Registers a custom group, forcing its custom ordering.
    ///
    /// Prefer building the group with `.custom(true)`; this method exists so
    /// submitter-supplied groups cannot accidentally masquerade as
    /// built-ins.
    pub fn register_custom(&mut self, group: Group) {
        let group = if group.is_custom() {
            group
        } else {
            let mut rebuilt = Group::builder(group.name()).custom(true);
            if !group.doc().is_empty() {
                rebuilt = rebuilt.doc(group.doc());
            }
            let mut rebuilt = rebuilt.build();
            for check in group.all_checks() {
                rebuilt.add_check(check);
            }
            rebuilt
        };
        self.register(group);
    }

    /// Returns the groups with at least one check matching `filter`.
    ///
    /// Each returned group contains only its matching checks; groups left
    /// empty by the filter are dropped. Groups are sorted by display order,
    /// then name, so built-ins come first and output is stable.
    pub fn groups(&self, filter: &CheckFilter) -> Vec<Arc<Group>> {
        let mut selected: Vec<Arc<Group>> = self
            .groups
            .iter()
            .filter_map(|group| {
                let checks = group.checks(filter);
                if checks.is_empty() {
                    None
                } else {
                    Some(Arc::new(group.derived(checks)))
                }
            })
            .collect();
        selected.sort_by(|a, b| {
            a.report_display_order()
                .cmp(&b.report_display_order())
                .then_with(|| a.name().cmp(b.name()))
        });
        selected
    }

    /// Returns every registered group unfiltered.
    pub fn all_groups(&self) -> &[Arc<Group>] {
        &self.groups
    }

    /// Returns the unique tags across all registered checks, sorted.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self
            .groups
            .iter()
            .flat_map(|group| group.tags())
            .collect();
        tags.sort();
        tags.dedup();
        tags
    }

    /// Returns the number of checks matching `filter` across all groups.
    pub fn check_count(&self, filter: &CheckFilter) -> usize {
        self.groups
            .iter()
            .map(|group| group.check_count(filter))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::check::Check;

    fn group_with_check(group_name: &str, check_name: &str, tags: &[&str]) -> Group {
        Group::builder(group_name)
            .check(
                Check::builder(check_name)
                    .tags(tags.to_vec())
                    .routine_fn(|_ctx| Box::pin(async { Ok(()) }))
                    .build(),
            )
            .build()
    }

    #[test]
    fn test_empty_groups_are_dropped() {
        let mut registry = GroupRegistry::new();
        registry.register(group_with_check("check_cloud", "check_a", &["cloud"]));
        registry.register(group_with_check("check_manual", "check_b", &["manual"]));

        let groups = registry.groups(&CheckFilter::new().include_tag("cloud"));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name(), "check_cloud");
    }

    #[test]
    fn test_groups_sorted_builtins_first() {
        let mut registry = GroupRegistry::new();
        registry.register_custom(group_with_check("check_zz_custom", "check_c", &[]));
        registry.register(group_with_check("check_builtin", "check_a", &[]));

        let groups = registry.groups(&CheckFilter::default());
        let names: Vec<&str> = groups.iter().map(|g| g.name()).collect();
        assert_eq!(names, vec!["check_builtin", "check_zz_custom"]);
    }

    #[test]
    fn test_register_custom_forces_custom_flag() {
        let mut registry = GroupRegistry::new();
        registry.register_custom(group_with_check("check_submitted", "check_a", &[]));
        let groups = registry.groups(&CheckFilter::default());
        assert!(groups[0].is_custom());
    }

    #[test]
    fn test_tags_sorted_unique() {
        let mut registry = GroupRegistry::new();
        registry.register(group_with_check("check_one", "check_a", &["cloud", "manual"]));
        registry.register(group_with_check("check_two", "check_b", &["appapproval", "cloud"]));
        assert_eq!(registry.tags(), vec!["appapproval", "cloud", "manual"]);
    }
}
