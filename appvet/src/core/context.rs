//! The named-resource context a check routine runs against.

use crate::app::Application;
use crate::core::check::CheckFailure;
use crate::report::Reporter;
use crate::resource::ResourceValue;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Everything a check routine may touch during one invocation.
///
/// The context always binds `app` and `reporter`; any resource name the
/// check declared in its metadata has already been resolved (and lazily
/// constructed) by the engine before the routine runs, so lookups here
/// cannot block on construction.
pub struct CheckContext<'a> {
    app: Arc<Application>,
    reporter: &'a Reporter,
    resources: HashMap<String, ResourceValue>,
}

impl<'a> CheckContext<'a> {
    pub(crate) fn new(
        app: Arc<Application>,
        reporter: &'a Reporter,
        resources: HashMap<String, ResourceValue>,
    ) -> Self {
        Self {
            app,
            reporter,
            resources,
        }
    }

    /// The artifact under validation.
    pub fn app(&self) -> &Application {
        &self.app
    }

    /// The sink this check's findings go to.
    pub fn reporter(&self) -> &Reporter {
        self.reporter
    }

    /// Returns true if the named resource was resolved for this invocation.
    pub fn has_resource(&self, name: &str) -> bool {
        self.resources.contains_key(name)
    }

    /// Fetches a declared resource, downcast to its concrete type.
    ///
    /// Only names the check declared in its `requires` list are present;
    /// anything else yields a missing-resource failure, which the engine
    /// records as `skipped`.
    pub fn resource<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, CheckFailure> {
        let value = self.resources.get(name).ok_or_else(|| {
            CheckFailure::ResourceUnavailable(format!(
                "resource '{name}' was not declared by this check"
            ))
        })?;
        Arc::clone(value).downcast::<T>().map_err(|_| {
            CheckFailure::Defect(format!(
                "resource '{name}' has an unexpected type for this check"
            ))
        })
    }
}

impl std::fmt::Debug for CheckContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckContext")
            .field("app", &self.app.name())
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .finish()
    }
}
