//! Concurrent validation orchestration.
//!
//! The [`Validator`] drives a run end to end: open each artifact, run the
//! packaging gate, then fan the remaining checks out over a bounded worker
//! pool, deferred checks held back until the full immediate batch has
//! finished. Every check's outcome lands in a [`ValidationReport`] no
//! matter how the check ends.

use super::hooks::{RunPhase, ValidationEvent, ValidationHooks};
use crate::app::{Application, ConfigParser};
use crate::core::{Check, CheckFilter, Group, GroupRegistry};
use crate::report::{AppInfo, ApplicationValidationReport, Reporter, ValidationReport};
use crate::resource::{ResourceContext, ResourceManager, RunArgs};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

pub use crate::core::PACKAGING_STANDARDS_TAG;

/// Default worker pool width.
pub const DEFAULT_WORKERS: usize = 2;

/// The message recorded for every check suppressed by the packaging gate.
pub const PACKAGING_GATE_SKIP_MESSAGE: &str = "Skipping due to package validation issues.";

type PlanEntry = (Arc<Group>, Arc<Check>);
type RunResult = (Arc<Group>, Arc<Check>, Arc<Reporter>);

/// Builder for [`Validator`] instances.
///
/// # Examples
///
/// ```rust,no_run
/// use appvet::core::{CheckFilter, GroupRegistry};
/// use appvet::engine::Validator;
///
/// # async fn demo(registry: GroupRegistry) -> appvet::error::Result<()> {
/// let validator = Validator::builder(registry)
///     .filter(CheckFilter::new().include_tag("cloud"))
///     .workers(4)
///     .build();
/// let report = validator.validate(&["./my_app".into()]).await;
/// std::process::exit(report.exit_code());
/// # }
/// ```
pub struct ValidatorBuilder {
    registry: GroupRegistry,
    resources: ResourceManager,
    filter: CheckFilter,
    workers: usize,
    hooks: Vec<Arc<dyn ValidationHooks>>,
    config_parser: Option<Arc<dyn ConfigParser>>,
}

impl ValidatorBuilder {
    /// Starts a builder over the given registry.
    pub fn new(registry: GroupRegistry) -> Self {
        Self {
            registry,
            resources: ResourceManager::new(),
            filter: CheckFilter::new(),
            workers: DEFAULT_WORKERS,
            hooks: Vec::new(),
            config_parser: None,
        }
    }

    /// Sets the shared run resources.
    pub fn resources(mut self, resources: ResourceManager) -> Self {
        self.resources = resources;
        self
    }

    /// Sets the parser used to read each artifact's `default/app.conf`, so
    /// declared metadata lands on the per-artifact report.
    pub fn config_parser(mut self, parser: Arc<dyn ConfigParser>) -> Self {
        self.config_parser = Some(parser);
        self
    }

    /// Sets the check selection filter.
    pub fn filter(mut self, filter: CheckFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the worker pool width. Zero is clamped to one.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Sizes the pool to the host's logical CPU count.
    pub fn workers_per_cpu(self) -> Self {
        let cpus = num_cpus::get();
        self.workers(cpus)
    }

    /// Adds a lifecycle observer.
    pub fn hook(mut self, hook: Arc<dyn ValidationHooks>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Finalizes the validator.
    pub fn build(self) -> Validator {
        Validator {
            registry: Arc::new(self.registry),
            resources: self.resources,
            filter: self.filter,
            workers: self.workers,
            hooks: self.hooks,
            config_parser: self.config_parser,
        }
    }
}

/// Runs registered check groups against artifacts.
pub struct Validator {
    registry: Arc<GroupRegistry>,
    resources: ResourceManager,
    filter: CheckFilter,
    workers: usize,
    hooks: Vec<Arc<dyn ValidationHooks>>,
    config_parser: Option<Arc<dyn ConfigParser>>,
}

impl Validator {
    /// Starts a [`ValidatorBuilder`] over the given registry.
    pub fn builder(registry: GroupRegistry) -> ValidatorBuilder {
        ValidatorBuilder::new(registry)
    }

    /// The registry this validator runs from.
    pub fn registry(&self) -> &GroupRegistry {
        &self.registry
    }

    /// The filter this validator selects checks with.
    pub fn filter(&self) -> &CheckFilter {
        &self.filter
    }

    /// Validates each artifact path in order and returns the aggregated
    /// report. Never panics and never aborts early: an artifact that cannot
    /// be opened is recorded and the run moves on.
    ///
    /// The resource context is opened once here and shared by every
    /// artifact, so a lazily built resource survives the whole run.
    #[instrument(skip(self, paths), fields(artifacts = paths.len(), workers = self.workers))]
    pub async fn validate(&self, paths: &[std::path::PathBuf]) -> ValidationReport {
        let mut report = ValidationReport::new();
        report.validation_start();
        self.emit(&ValidationEvent::RunStarted {
            artifact_count: paths.len(),
        });
        info!(artifacts = paths.len(), "validation run started");

        let resources = Arc::new(self.open_resources());
        for path in paths {
            let app_report = self.run_artifact(path, Arc::clone(&resources)).await;
            report.add_application_report(app_report);
        }

        report.validation_completed();
        self.emit(&ValidationEvent::RunCompleted);
        info!(exit_code = report.exit_code(), "validation run finished");
        report
    }

    /// Validates one artifact in a resource context of its own.
    pub async fn validate_artifact(&self, path: &Path) -> ApplicationValidationReport {
        let resources = Arc::new(self.open_resources());
        self.run_artifact(path, resources).await
    }

    fn open_resources(&self) -> ResourceContext {
        self.resources.context(RunArgs {
            target_version: self.filter.version().cloned(),
            extra: Default::default(),
        })
    }

    #[instrument(skip(self, resources), fields(artifact = %path.display()))]
    async fn run_artifact(
        &self,
        path: &Path,
        resources: Arc<ResourceContext>,
    ) -> ApplicationValidationReport {
        let fallback_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let app = match Application::open(path) {
            Ok(app) => Arc::new(app),
            Err(err) => {
                let mut report =
                    ApplicationValidationReport::new(fallback_name, self.filter.clone());
                report.validation_start();
                report.artifact_unreadable(err.to_string());
                return report;
            }
        };

        if let Some(parser) = &self.config_parser {
            if app.file_exists("default/app.conf") {
                if let Err(err) = app.load_config("app", parser.as_ref()) {
                    debug!(app.name = %app.name(), error = %err, "could not parse app.conf");
                }
            }
        }

        let mut report =
            ApplicationValidationReport::new(app.name(), self.filter.clone());
        report.validation_start();
        self.emit(&ValidationEvent::ArtifactStarted {
            app_name: app.name().to_string(),
        });

        // Packaging gate first: its verdict decides whether anything else
        // actually executes.
        self.emit(&ValidationEvent::PhaseStarted {
            app_name: app.name().to_string(),
            phase: RunPhase::Packaging,
        });
        let packaging = self
            .run_plan(Arc::clone(&app), Arc::clone(&resources), self.packaging_plan())
            .await;
        let gate_failed = packaging
            .iter()
            .any(|(_, _, reporter)| reporter.state().is_blocking());
        for (group, check, reporter) in packaging {
            report.add_result(group, check, reporter);
        }
        self.emit(&ValidationEvent::PhaseCompleted {
            app_name: app.name().to_string(),
            phase: RunPhase::Packaging,
        });

        let plan = self.validation_plan();
        self.emit(&ValidationEvent::PhaseStarted {
            app_name: app.name().to_string(),
            phase: RunPhase::Validation,
        });
        if gate_failed {
            warn!(app.name = %app.name(), "packaging gate failed, skipping remaining checks");
            self.emit(&ValidationEvent::PackagingGateFailed {
                app_name: app.name().to_string(),
            });
            self.skip_plan(app.name(), plan, &mut report);
        } else {
            let results = self
                .run_plan(Arc::clone(&app), Arc::clone(&resources), plan)
                .await;
            for (group, check, reporter) in results {
                report.add_result(group, check, reporter);
            }
        }
        self.emit(&ValidationEvent::PhaseCompleted {
            app_name: app.name().to_string(),
            phase: RunPhase::Validation,
        });

        report.record_app_info(self.collect_app_info(&app));
        report.validation_completed();
        self.emit(&ValidationEvent::ArtifactCompleted {
            app_name: app.name().to_string(),
        });
        report
    }

    /// Records every planned check as skipped, walking the same lifecycle
    /// edges a real execution would.
    fn skip_plan(
        &self,
        app_name: &str,
        plan: Vec<PlanEntry>,
        report: &mut ApplicationValidationReport,
    ) {
        let mut current_group: Option<String> = None;
        for (group, check) in plan {
            if current_group.as_deref() != Some(group.name()) {
                if let Some(previous) = current_group.take() {
                    self.emit(&ValidationEvent::GroupCompleted {
                        app_name: app_name.to_string(),
                        group_name: previous,
                    });
                }
                current_group = Some(group.name().to_string());
                self.emit(&ValidationEvent::GroupStarted {
                    app_name: app_name.to_string(),
                    group_name: group.name().to_string(),
                });
            }
            self.emit(&ValidationEvent::CheckStarted {
                app_name: app_name.to_string(),
                group_name: group.name().to_string(),
                check_name: check.name().to_string(),
            });
            let reporter = Reporter::new();
            reporter.start();
            reporter.skip(PACKAGING_GATE_SKIP_MESSAGE);
            reporter.complete();
            self.emit(&ValidationEvent::CheckCompleted {
                app_name: app_name.to_string(),
                group_name: group.name().to_string(),
                check_name: check.name().to_string(),
                state: reporter.state(),
            });
            report.add_result(group, check, Arc::new(reporter));
        }
        if let Some(previous) = current_group {
            self.emit(&ValidationEvent::GroupCompleted {
                app_name: app_name.to_string(),
                group_name: previous,
            });
        }
    }

    fn collect_app_info(&self, app: &Application) -> AppInfo {
        let hash = match app.content_hash() {
            Ok(hash) => Some(hash),
            Err(err) => {
                warn!(app.name = %app.name(), error = %err, "could not hash artifact contents");
                None
            }
        };
        AppInfo {
            author: app.author(),
            description: app.description(),
            label: app.label(),
            version: app.version(),
            hash,
        }
    }

    /// The packaging execution plan: every packaging-tagged check, built-in
    /// groups first. A custom check shadowed by a built-in check of the same
    /// name is dropped so the built-in verdict is the one that gates.
    fn packaging_plan(&self) -> Vec<PlanEntry> {
        let mut filter = CheckFilter::new().include_tag(PACKAGING_STANDARDS_TAG);
        if let Some(version) = self.filter.version() {
            filter = filter.target_version(version.clone());
        }

        let groups = self.registry.groups(&filter);
        let mut plan = Vec::new();
        let mut builtin_names: HashSet<String> = HashSet::new();
        for group in groups.iter().filter(|g| !g.is_custom()) {
            for check in group.checks(&filter) {
                builtin_names.insert(check.name().to_string());
                plan.push((Arc::clone(group), check));
            }
        }
        for group in groups.iter().filter(|g| g.is_custom()) {
            for check in group.checks(&filter) {
                if builtin_names.contains(check.name()) {
                    debug!(
                        check.name = %check.name(),
                        group.name = %group.name(),
                        "custom packaging check shadowed by built-in check"
                    );
                    continue;
                }
                plan.push((Arc::clone(group), check));
            }
        }
        plan
    }

    /// The main execution plan: every check selected by the run filter,
    /// minus packaging-tagged checks, which already ran in the gate.
    fn validation_plan(&self) -> Vec<PlanEntry> {
        let mut plan = Vec::new();
        for group in self.registry.groups(&self.filter) {
            for check in group.checks(&self.filter) {
                if check.tags().iter().any(|t| t == PACKAGING_STANDARDS_TAG) {
                    continue;
                }
                plan.push((Arc::clone(&group), check));
            }
        }
        plan
    }

    /// Runs a plan through the bounded worker pool.
    ///
    /// Every task is spawned up front, but deferred checks sit behind a
    /// gate that is raised only once the whole immediate batch has
    /// finished, so a deferred check can never overtake one. Results come
    /// back in submission order. A group's start event fires when its first
    /// check is submitted; its completion event fires when its last result
    /// is joined.
    async fn run_plan(
        &self,
        app: Arc<Application>,
        resources: Arc<ResourceContext>,
        plan: Vec<PlanEntry>,
    ) -> Vec<RunResult> {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let (gate_tx, gate_rx) = watch::channel(false);

        let (immediate, deferred): (Vec<_>, Vec<_>) =
            plan.into_iter().partition(|(_, check)| !check.deferred());

        let mut checks_left: HashMap<String, usize> = HashMap::new();
        for (group, _) in immediate.iter().chain(deferred.iter()) {
            *checks_left.entry(group.name().to_string()).or_insert(0) += 1;
        }

        let mut groups_started: HashSet<String> = HashSet::new();
        let mut spawn = |batch: Vec<PlanEntry>, gate: Option<watch::Receiver<bool>>| {
            batch
                .into_iter()
                .map(|(group, check)| {
                    if groups_started.insert(group.name().to_string()) {
                        self.emit(&ValidationEvent::GroupStarted {
                            app_name: app.name().to_string(),
                            group_name: group.name().to_string(),
                        });
                    }
                    let handle = self.spawn_check(
                        Arc::clone(&app),
                        Arc::clone(&resources),
                        Arc::clone(&group),
                        Arc::clone(&check),
                        Arc::clone(&semaphore),
                        gate.clone(),
                    );
                    (group, check, handle)
                })
                .collect::<Vec<_>>()
        };
        let immediate_handles = spawn(immediate, None);
        let deferred_handles = spawn(deferred, Some(gate_rx));

        let mut results = Vec::with_capacity(immediate_handles.len() + deferred_handles.len());
        self.join_batch(app.name(), immediate_handles, &mut results, &mut checks_left)
            .await;
        // Immediate batch done; release the deferred checks.
        let _ = gate_tx.send(true);
        self.join_batch(app.name(), deferred_handles, &mut results, &mut checks_left)
            .await;
        results
    }

    async fn join_batch(
        &self,
        app_name: &str,
        handles: Vec<(Arc<Group>, Arc<Check>, JoinHandle<Reporter>)>,
        results: &mut Vec<RunResult>,
        checks_left: &mut HashMap<String, usize>,
    ) {
        for (group, check, handle) in handles {
            let reporter = match handle.await {
                Ok(reporter) => reporter,
                Err(join_err) => {
                    let reporter = Reporter::new();
                    reporter.start();
                    reporter.error(format!(
                        "check '{}' execution failed: {join_err}",
                        check.name()
                    ));
                    reporter.complete();
                    reporter
                }
            };
            let group_done = checks_left
                .get_mut(group.name())
                .map(|count| {
                    *count -= 1;
                    *count == 0
                })
                .unwrap_or(false);
            if group_done {
                self.emit(&ValidationEvent::GroupCompleted {
                    app_name: app_name.to_string(),
                    group_name: group.name().to_string(),
                });
            }
            results.push((group, check, Arc::new(reporter)));
        }
    }

    fn spawn_check(
        &self,
        app: Arc<Application>,
        resources: Arc<ResourceContext>,
        group: Arc<Group>,
        check: Arc<Check>,
        semaphore: Arc<Semaphore>,
        gate: Option<watch::Receiver<bool>>,
    ) -> JoinHandle<Reporter> {
        let hooks = self.hooks.clone();
        tokio::spawn(async move {
            if let Some(mut gate) = gate {
                while !*gate.borrow_and_update() {
                    if gate.changed().await.is_err() {
                        break;
                    }
                }
            }
            let _permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    let reporter = Reporter::new();
                    reporter.start();
                    reporter.error(format!(
                        "worker pool closed before check '{}' could run",
                        check.name()
                    ));
                    reporter.complete();
                    return reporter;
                }
            };
            emit(
                &hooks,
                &ValidationEvent::CheckStarted {
                    app_name: app.name().to_string(),
                    group_name: group.name().to_string(),
                    check_name: check.name().to_string(),
                },
            );
            let reporter = check.run(Arc::clone(&app), resources.as_ref()).await;
            emit(
                &hooks,
                &ValidationEvent::CheckCompleted {
                    app_name: app.name().to_string(),
                    group_name: group.name().to_string(),
                    check_name: check.name().to_string(),
                    state: reporter.state(),
                },
            );
            reporter
        })
    }

    fn emit(&self, event: &ValidationEvent) {
        emit(&self.hooks, event);
    }
}

fn emit(hooks: &[Arc<dyn ValidationHooks>], event: &ValidationEvent) {
    for hook in hooks {
        hook.on_event(event);
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("workers", &self.workers)
            .field("filter", &self.filter)
            .field("groups", &self.registry.all_groups().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CheckBuilder, GroupBuilder};

    fn registry_with(groups: Vec<crate::core::Group>) -> GroupRegistry {
        let mut registry = GroupRegistry::new();
        for group in groups {
            registry.register(group);
        }
        registry
    }

    #[test]
    fn test_packaging_plan_prefers_builtin_on_name_conflict() {
        let builtin = GroupBuilder::new("packaging")
            .check(
                CheckBuilder::new("check_archive_is_readable")
                    .tags([PACKAGING_STANDARDS_TAG])
                    .build(),
            )
            .build();
        let custom = GroupBuilder::new("custom_packaging")
            .check(
                CheckBuilder::new("check_archive_is_readable")
                    .tags([PACKAGING_STANDARDS_TAG])
                    .build(),
            )
            .check(
                CheckBuilder::new("check_vendor_manifest")
                    .tags([PACKAGING_STANDARDS_TAG])
                    .build(),
            )
            .build();

        let mut registry = GroupRegistry::new();
        registry.register(builtin);
        registry.register_custom(custom);
        let validator = Validator::builder(registry).build();

        let plan = validator.packaging_plan();
        let names: Vec<(&str, &str)> = plan
            .iter()
            .map(|(g, c)| (g.name(), c.name()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("packaging", "check_archive_is_readable"),
                ("custom_packaging", "check_vendor_manifest"),
            ]
        );
    }

    #[test]
    fn test_validation_plan_excludes_packaging_checks() {
        let registry = registry_with(vec![GroupBuilder::new("mixed")
            .check(
                CheckBuilder::new("check_gate")
                    .tags([PACKAGING_STANDARDS_TAG])
                    .build(),
            )
            .check(CheckBuilder::new("check_main").tags(["cert"]).build())
            .build()]);
        let validator = Validator::builder(registry).build();

        let plan = validator.validation_plan();
        let names: Vec<&str> = plan.iter().map(|(_, c)| c.name()).collect();
        assert_eq!(names, vec!["check_main"]);
    }

    #[test]
    fn test_builder_clamps_workers() {
        let validator = Validator::builder(GroupRegistry::new()).workers(0).build();
        assert_eq!(validator.workers, 1);
    }
}
