//! The check unit: one verification routine plus its selection metadata.

use crate::app::Application;
use crate::core::context::CheckContext;
use crate::core::filter::CheckFilter;
use crate::error::AppVetError;
use crate::report::Reporter;
use crate::resource::{ResourceContext, ResourceValue};
use crate::version::CertVersion;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Display order assigned when a check does not set one.
pub const DEFAULT_DISPLAY_ORDER: i64 = 1000;

/// The tag marking checks that gate the rest of the run.
pub const PACKAGING_STANDARDS_TAG: &str = "packaging_standards";

/// Resource name identifying a live standalone target instance.
pub const STANDALONE_RESOURCE: &str = "standalone";

/// Resource name identifying a live clustered target instance.
pub const CLUSTER_RESOURCE: &str = "cluster";

/// How a check routine signals an exceptional end.
///
/// Anything a routine wants to tell the submitter goes through the
/// [`Reporter`]; this type only covers the ways a routine can stop without
/// completing, and the engine maps each variant onto a record kind.
#[derive(Debug, Error)]
pub enum CheckFailure {
    /// An intentionally unhandled case; recorded as `failure`.
    #[error("not implemented: {0}")]
    Unimplemented(String),

    /// A required resource could not be provided; recorded as `skipped`.
    #[error("{0}")]
    ResourceUnavailable(String),

    /// Anything else that went wrong in the routine; recorded as `error`.
    #[error("{0}")]
    Defect(String),
}

impl From<AppVetError> for CheckFailure {
    fn from(err: AppVetError) -> Self {
        CheckFailure::Defect(err.to_string())
    }
}

impl From<std::io::Error> for CheckFailure {
    fn from(err: std::io::Error) -> Self {
        CheckFailure::Defect(format!("I/O error: {err}"))
    }
}

/// What a check routine returns.
pub type CheckResult = std::result::Result<(), CheckFailure>;

/// A verification routine.
///
/// Routines are independently authored, stateless, and reused across every
/// artifact in a run. Most findings should be emitted through
/// [`CheckContext::reporter`] rather than returned.
#[async_trait]
pub trait CheckRoutine: Send + Sync {
    /// Runs the verification against the given context.
    async fn run(&self, ctx: &CheckContext<'_>) -> CheckResult;
}

type RoutineFn =
    Box<dyn for<'a> Fn(&'a CheckContext<'a>) -> BoxFuture<'a, CheckResult> + Send + Sync>;

struct FnRoutine(RoutineFn);

#[async_trait]
impl CheckRoutine for FnRoutine {
    async fn run(&self, ctx: &CheckContext<'_>) -> CheckResult {
        (self.0)(ctx).await
    }
}

struct UnimplementedRoutine;

#[async_trait]
impl CheckRoutine for UnimplementedRoutine {
    async fn run(&self, _ctx: &CheckContext<'_>) -> CheckResult {
        Err(CheckFailure::Unimplemented(
            "this check has no routine".to_string(),
        ))
    }
}

/// One independently authored check: a routine wrapped with the metadata
/// used to select, order, and schedule it.
///
/// Checks are created once at registration, are immutable, and are reused
/// across every target artifact in a run.
///
/// # Examples
///
/// ```rust
/// use appvet::core::Check;
///
/// let check = Check::builder("check_app_conf_has_launcher_stanza")
///     .description("app.conf must declare a [launcher] stanza.")
///     .tags(["cloud", "appapproval"])
///     .min_version("1.0".parse().unwrap())
///     .routine_fn(|ctx| {
///         Box::pin(async move {
///             let config = ctx.app().config("app")?;
///             ctx.reporter()
///                 .fail_unless(config.has_section("launcher"), "no [launcher] stanza");
///             Ok(())
///         })
///     })
///     .build();
///
/// assert!(check.matches_tags(&["cloud".into()], &[]));
/// assert!(!check.is_dynamic());
/// ```
pub struct Check {
    name: String,
    doc: Option<String>,
    tags: Vec<String>,
    min_version: Option<CertVersion>,
    max_version: Option<CertVersion>,
    report_display_order: i64,
    deferred: bool,
    required_resources: Vec<String>,
    routine: Arc<dyn CheckRoutine>,
}

impl Check {
    /// Starts building a check with the given name.
    pub fn builder(name: impl Into<String>) -> CheckBuilder {
        CheckBuilder::new(name)
    }

    /// The check's name, unique within its group.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The check's documentation, or its name when undocumented.
    pub fn doc(&self) -> &str {
        self.doc.as_deref().unwrap_or(&self.name)
    }

    /// The check's tag set. Order carries no meaning.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// The inclusive lower bound of the version range, if declared.
    pub fn min_version(&self) -> Option<&CertVersion> {
        self.min_version.as_ref()
    }

    /// The inclusive upper bound of the version range, if declared.
    pub fn max_version(&self) -> Option<&CertVersion> {
        self.max_version.as_ref()
    }

    /// Where this check sorts within its group's report output.
    pub fn report_display_order(&self) -> i64 {
        self.report_display_order
    }

    /// True if this check runs only after all non-deferred checks have been
    /// submitted.
    pub fn deferred(&self) -> bool {
        self.deferred
    }

    /// The resource names this check declares needing.
    pub fn required_resources(&self) -> &[String] {
        &self.required_resources
    }

    /// True if this check needs a live clustered target instance.
    pub fn is_cluster_check(&self) -> bool {
        self.required_resources
            .iter()
            .any(|name| name == CLUSTER_RESOURCE)
    }

    /// True if this check needs a live standalone target instance.
    pub fn is_standalone_check(&self) -> bool {
        self.required_resources
            .iter()
            .any(|name| name == STANDALONE_RESOURCE)
    }

    /// True if this check needs any live target instance; false means the
    /// check inspects the artifact statically.
    pub fn is_dynamic(&self) -> bool {
        self.is_cluster_check() || self.is_standalone_check()
    }

    /// Returns whether this check's tags match the given selection.
    ///
    /// A tag present in both lists counts as included only. With both lists
    /// empty everything matches; with only included tags the check must
    /// share at least one; with only excluded tags it must share none; with
    /// both, both conditions apply.
    pub fn matches_tags(&self, included_tags: &[String], excluded_tags: &[String]) -> bool {
        let check_tags: HashSet<&str> = self.tags.iter().map(String::as_str).collect();
        let included: HashSet<&str> = included_tags.iter().map(String::as_str).collect();
        let mut excluded: HashSet<&str> = excluded_tags.iter().map(String::as_str).collect();

        // Included wins when the same tag appears on both sides.
        excluded.retain(|tag| !included.contains(tag));

        match (included.is_empty(), excluded.is_empty()) {
            (true, true) => true,
            (false, true) => !check_tags.is_disjoint(&included),
            (true, false) => check_tags.is_disjoint(&excluded),
            (false, false) => {
                !check_tags.is_disjoint(&included) && check_tags.is_disjoint(&excluded)
            }
        }
    }

    /// Returns whether the targeted version falls in this check's range.
    ///
    /// An unset target, or a check with no declared minimum, always matches.
    pub fn matches_version(&self, target: Option<&CertVersion>) -> bool {
        let (Some(target), Some(min)) = (target, self.min_version.as_ref()) else {
            return true;
        };
        target >= min
            && self
                .max_version
                .as_ref()
                .map_or(true, |max| target <= max)
    }

    /// Returns whether this check passes the given filter.
    pub fn matches(&self, filter: &CheckFilter) -> bool {
        self.matches_tags(filter.included_tags(), filter.excluded_tags())
            && self.matches_version(filter.version())
    }

    /// Runs this check against one artifact and returns its frozen reporter.
    ///
    /// Every declared resource is resolved before the routine body runs; a
    /// name absent from the context yields a `skipped` verdict without
    /// invoking the body. A routine defect, whether returned or panicked, is
    /// contained here and recorded as `error` without disturbing sibling
    /// checks.
    pub async fn run(&self, app: Arc<Application>, resources: &ResourceContext) -> Reporter {
        let reporter = Reporter::new();
        reporter.start();
        debug!(check.name = %self.name, "executing check");

        match self.resolve_resources(resources) {
            Ok(resolved) => {
                let ctx = CheckContext::new(app, &reporter, resolved);
                let outcome = AssertUnwindSafe(self.routine.run(&ctx))
                    .catch_unwind()
                    .await;
                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(CheckFailure::Unimplemented(message))) => reporter.fail(message),
                    Ok(Err(CheckFailure::ResourceUnavailable(message))) => reporter.skip(message),
                    Ok(Err(CheckFailure::Defect(message))) => reporter.error(message),
                    Err(panic) => {
                        let message = panic
                            .downcast_ref::<&str>()
                            .map(|s| s.to_string())
                            .or_else(|| panic.downcast_ref::<String>().cloned())
                            .unwrap_or_else(|| "check panicked".to_string());
                        reporter.error(format!("check '{}' panicked: {message}", self.name));
                    }
                }
            }
            Err(CheckFailure::ResourceUnavailable(message)) => reporter.skip(message),
            Err(failure) => reporter.error(failure.to_string()),
        }

        debug!(check.name = %self.name, check.state = %reporter.state(), "check finished");
        reporter.complete();
        reporter
    }

    fn resolve_resources(
        &self,
        resources: &ResourceContext,
    ) -> std::result::Result<HashMap<String, ResourceValue>, CheckFailure> {
        let mut resolved = HashMap::new();
        for name in &self.required_resources {
            if !resources.contains(name) {
                return Err(CheckFailure::ResourceUnavailable(format!(
                    "{} has been skipped because resource '{}' is not provided. \
                     Resources provided: {:?}.",
                    self.name,
                    name,
                    resources.keys(),
                )));
            }
            let value = resources
                .get(name)
                .map_err(|err| CheckFailure::Defect(err.to_string()))?;
            resolved.insert(name.clone(), value);
        }
        Ok(resolved)
    }
}

impl std::fmt::Debug for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Check")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("deferred", &self.deferred)
            .field("requires", &self.required_resources)
            .finish()
    }
}

/// Builder for [`Check`] instances.
pub struct CheckBuilder {
    name: String,
    doc: Option<String>,
    tags: Vec<String>,
    min_version: Option<CertVersion>,
    max_version: Option<CertVersion>,
    report_display_order: i64,
    deferred: bool,
    required_resources: Vec<String>,
    routine: Option<Arc<dyn CheckRoutine>>,
}

impl CheckBuilder {
    /// Creates a new builder for a check with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            tags: Vec::new(),
            min_version: None,
            max_version: None,
            report_display_order: DEFAULT_DISPLAY_ORDER,
            deferred: false,
            required_resources: Vec::new(),
            routine: None,
        }
    }

    /// Sets the check's documentation.
    pub fn description(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Sets the check's tags.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Sets the inclusive minimum certification version.
    pub fn min_version(mut self, version: CertVersion) -> Self {
        self.min_version = Some(version);
        self
    }

    /// Sets the inclusive maximum certification version.
    pub fn max_version(mut self, version: CertVersion) -> Self {
        self.max_version = Some(version);
        self
    }

    /// Sets where the check sorts within its group's report output.
    pub fn display_order(mut self, order: i64) -> Self {
        self.report_display_order = order;
        self
    }

    /// Defers this check until all non-deferred checks have been submitted.
    ///
    /// There is still no order among deferred checks, merely tiers; checks
    /// relying on a finer order make for a fragile catalog.
    pub fn deferred(mut self, deferred: bool) -> Self {
        self.deferred = deferred;
        self
    }

    /// Declares the resource names this check needs injected.
    pub fn requires<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_resources
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Sets the verification routine from a trait implementation.
    pub fn routine(mut self, routine: impl CheckRoutine + 'static) -> Self {
        self.routine = Some(Arc::new(routine));
        self
    }

    /// Sets the verification routine from an async closure.
    pub fn routine_fn<F>(mut self, f: F) -> Self
    where
        F: for<'a> Fn(&'a CheckContext<'a>) -> BoxFuture<'a, CheckResult>
            + Send
            + Sync
            + 'static,
    {
        self.routine = Some(Arc::new(FnRoutine(Box::new(f))));
        self
    }

    /// Builds the check.
    ///
    /// A check built without a routine reports `failure` when run, flagging
    /// the unimplemented assertion path.
    pub fn build(self) -> Check {
        Check {
            name: self.name,
            doc: self.doc,
            tags: self.tags,
            min_version: self.min_version,
            max_version: self.max_version,
            report_display_order: self.report_display_order,
            deferred: self.deferred,
            required_resources: self.required_resources,
            routine: self
                .routine
                .unwrap_or_else(|| Arc::new(UnimplementedRoutine)),
        }
    }
}
