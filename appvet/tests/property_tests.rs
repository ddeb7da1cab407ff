//! Property-based tests for the certification engine.
//!
//! This module uses proptest to verify selection and reporting invariants
//! across a wide range of inputs, including edge cases and boundary
//! conditions.
//!
//! ## Test Categories
//!
//! ### 1. Tag Selection
//! - A tag on both the included and excluded list counts as included only
//! - Empty selections match everything
//!
//! ### 2. Version Selection
//! - Dotted numeric versions compare as zero-padded tuples
//! - A check with no declared minimum matches every target
//!
//! ### 3. Report Truncation
//! - Retrieval never returns more than the requested cap
//! - The worst findings always survive truncation verbatim

use appvet::core::CheckBuilder;
use appvet::report::{CheckState, Reporter};
use appvet::version::CertVersion;
use proptest::prelude::*;

fn tag_set() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-e]", 0..4)
}

proptest! {
    /// An included tag always beats its own exclusion, no matter what else
    /// is on either list.
    #[test]
    fn included_tag_wins_over_its_own_exclusion(
        check_tags in tag_set(),
        shared in "[a-e]",
        extra_excluded in tag_set(),
    ) {
        let check = CheckBuilder::new("check_prop")
            .tags(check_tags.iter().cloned().chain([shared.clone()]))
            .build();

        let included = vec![shared.clone()];
        let mut excluded = extra_excluded.clone();
        excluded.push(shared.clone());
        // The check carries the shared tag, so with it included the
        // exclusion list cannot veto the match.
        prop_assert!(check.matches_tags(&included, &excluded));
    }

    #[test]
    fn empty_selection_matches_every_check(check_tags in tag_set()) {
        let check = CheckBuilder::new("check_prop").tags(check_tags).build();
        prop_assert!(check.matches_tags(&[], &[]));
    }

    #[test]
    fn excluded_only_selection_is_disjointness(
        check_tags in tag_set(),
        excluded in tag_set(),
    ) {
        let check = CheckBuilder::new("check_prop")
            .tags(check_tags.clone())
            .build();
        let expected = !check_tags.iter().any(|t| excluded.contains(t));
        prop_assert_eq!(check.matches_tags(&[], &excluded), expected);
    }

    /// Trailing zero components never change a version's ordering.
    #[test]
    fn version_comparison_ignores_trailing_zeros(
        components in prop::collection::vec(0u64..100, 1..4),
        padding in 0usize..3,
    ) {
        let short = components
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".");
        let long = components
            .iter()
            .copied()
            .chain(std::iter::repeat(0).take(padding))
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(".");

        let short: CertVersion = short.parse().unwrap();
        let long: CertVersion = long.parse().unwrap();
        prop_assert_eq!(short.cmp(&long), std::cmp::Ordering::Equal);
    }

    #[test]
    fn version_display_round_trips(components in prop::collection::vec(0u64..100, 1..5)) {
        let text = components
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".");
        let version: CertVersion = text.parse().unwrap();
        prop_assert_eq!(version.to_string(), text);
    }

    /// Retrieval is bounded by the cap and keeps the worst findings.
    #[test]
    fn report_records_never_exceed_the_cap(
        failures in 0usize..60,
        warnings in 0usize..60,
        max in 1usize..30,
    ) {
        let reporter = Reporter::new();
        for i in 0..failures {
            reporter.fail(format!("failure {i}"));
        }
        for i in 0..warnings {
            reporter.warn(format!("warning {i}"));
        }

        let records = reporter.report_records(max, &CheckState::ALL);
        let total = failures + warnings;
        prop_assert!(records.len() <= max);
        prop_assert_eq!(records.len(), total.min(max));

        // Failures outrank warnings, so they fill the cap first.
        let surviving_failures = records
            .iter()
            .filter(|r| r.state == CheckState::Failure)
            .count();
        let expected_failures = if total > max {
            failures.min(max - 1)
        } else {
            failures
        };
        prop_assert_eq!(surviving_failures, expected_failures);

        if total > max {
            let last = records.last().unwrap();
            prop_assert_eq!(last.state, CheckState::Warning);
            prop_assert!(last.message.starts_with("Suppressed "));
        }
    }
}
