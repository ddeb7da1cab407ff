//! Core check model for the appvet certification engine.
//!
//! The building blocks of a validation catalog:
//!
//! - **[`Check`]**: one verification routine plus its selection metadata
//!   (tags, version range, display order, deferred flag, declared resources)
//! - **[`Group`]**: a named, ordered collection of checks sharing
//!   documentation and source
//! - **[`GroupRegistry`]**: the explicit registration API rule sources are
//!   collected through
//! - **[`CheckFilter`]**: tag and version selection criteria
//! - **[`CheckContext`]**: the named-resource view a routine runs against
//!
//! ## Architecture
//!
//! ```text
//! GroupRegistry
//!     ├── Group "check_configuration_files"
//!     │   ├── Check (tags: cloud, appapproval)
//!     │   └── Check (tags: cloud; requires: standalone)
//!     └── Group "check_packaging_standards"
//!         └── Check (tags: packaging_standards)
//! ```
//!
//! A check is created once at registration, is immutable, and is reused
//! across every artifact in a run; each execution gets its own
//! [`Reporter`](crate::report::Reporter).

mod check;
mod context;
mod filter;
mod group;
mod registry;

pub use check::{
    Check, CheckBuilder, CheckFailure, CheckResult, CheckRoutine, CLUSTER_RESOURCE,
    DEFAULT_DISPLAY_ORDER, PACKAGING_STANDARDS_TAG, STANDALONE_RESOURCE,
};
pub use context::CheckContext;
pub use filter::CheckFilter;
pub use group::{Group, GroupBuilder, CUSTOM_GROUP_ORDER_OFFSET, DEFAULT_GROUP_DISPLAY_ORDER};
pub use registry::GroupRegistry;
