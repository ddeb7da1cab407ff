//! # AppVet - Artifact Certification Engine for Rust
//!
//! AppVet runs registered groups of certification checks against unpacked
//! application artifacts and aggregates every outcome into a structured
//! report. It was built for pre-publication vetting pipelines: packaging
//! problems gate the run, noisy checks are capped, and a check can never
//! take the engine down with it.
//!
//! ## Overview
//!
//! A validation run walks four stages: open each artifact, run the
//! packaging gate, fan the selected checks out over a bounded worker pool,
//! and aggregate every verdict into a [`report::ValidationReport`]. Checks
//! are plain async routines registered in groups; tag and version filters
//! decide which of them a given run selects.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use appvet::checks::default_registry;
//! use appvet::core::{CheckBuilder, CheckFilter, GroupBuilder};
//! use appvet::engine::Validator;
//! use futures::FutureExt;
//!
//! # async fn example() -> appvet::error::Result<()> {
//! let mut registry = default_registry();
//! registry.register(
//!     GroupBuilder::new("saved_searches")
//!         .doc("Saved search hygiene")
//!         .check(
//!             CheckBuilder::new("check_searches_are_not_realtime")
//!                 .tags(["cert", "cloud"])
//!                 .routine_fn(|ctx| {
//!                     async move {
//!                         for hit in ctx
//!                             .app()
//!                             .search_for_pattern(r"^\s*rtsearch", "default/*.conf")?
//!                         {
//!                             ctx.reporter().fail(format!(
//!                                 "Real-time search found. File: {}",
//!                                 hit.file_ref
//!                             ));
//!                         }
//!                         Ok(())
//!                     }
//!                     .boxed()
//!                 })
//!                 .build(),
//!         )
//!         .build(),
//! );
//!
//! let validator = Validator::builder(registry)
//!     .filter(CheckFilter::new().include_tag("cloud"))
//!     .build();
//! let report = validator.validate(&["./my_app".into()]).await;
//!
//! for app_report in report.application_reports() {
//!     for (state, count) in app_report.get_summary() {
//!         println!("{state}: {count}");
//!     }
//! }
//! std::process::exit(report.exit_code());
//! # }
//! ```
//!
//! ## Key Features
//!
//! - **Tag and version selection**: every check carries tags and an
//!   optional certification version range; runs select by both.
//! - **Severity-ordered verdicts**: a check's verdict is its worst
//!   recorded finding, from `error` down to `success`.
//! - **Packaging gate**: blocking packaging findings suppress the rest of
//!   the run instead of producing noise against a broken artifact.
//! - **Bounded concurrency**: checks run on a tunable worker pool;
//!   deferred checks are held back until the whole batch is submitted.
//! - **Containment**: a panicking or defective check records an `error`
//!   verdict and the run keeps going.
//! - **Resource injection**: checks declare the shared resources they
//!   need; missing resources skip the check rather than fail the run.
//!
//! ## Architecture
//!
//! - **`core`**: `Check`, `Group`, `GroupRegistry`, and the selection
//!   filter.
//! - **`app`**: the read-only artifact facade checks inspect.
//! - **`report`**: per-check reporters and run-level aggregation.
//! - **`engine`**: the validator, its worker pool, and lifecycle hooks.
//! - **`resource`**: the shared-resource provider table.
//! - **`formatters`**: JSON and terminal renderings of a finished run.

pub mod app;
pub mod checks;
pub mod core;
pub mod engine;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod prelude;
pub mod report;
pub mod resource;
pub mod version;
