//! Shared run resources and scoped dependency injection.
//!
//! Some checks need more than the artifact on disk, typically a live target
//! instance keyed `standalone` or `cluster`. The [`ResourceManager`] holds an
//! explicit name→provider table; opening a [`ResourceContext`] scopes those
//! resources to one validation run. Construction is lazy (a provider runs the
//! first time its name is requested) and teardown happens on every exit path
//! when the context drops.

use crate::error::{AppVetError, Result};
use crate::version::CertVersion;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// A type-erased resource value handed to checks.
pub type ResourceValue = Arc<dyn Any + Send + Sync>;

/// Arguments available to providers when a run context is opened.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    /// The certification version the run targets, if any.
    pub target_version: Option<CertVersion>,
    /// Free-form key/value arguments forwarded from the caller.
    pub extra: HashMap<String, String>,
}

/// A live resource plus its teardown.
///
/// Providers return one of these per construction; `release` is called
/// exactly once when the owning [`ResourceContext`] goes out of scope.
pub trait ResourceHandle: Send + Sync {
    /// Returns the value injected into checks.
    fn value(&self) -> ResourceValue;

    /// Tears the resource down.
    fn release(&self) {}
}

/// A handle around a plain value with no teardown.
pub struct PlainResource(ResourceValue);

impl PlainResource {
    /// Wraps an already-constructed value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }
}

impl ResourceHandle for PlainResource {
    fn value(&self) -> ResourceValue {
        Arc::clone(&self.0)
    }
}

type Provider = Arc<dyn Fn(&RunArgs) -> Result<Box<dyn ResourceHandle>> + Send + Sync>;

/// The name→provider table resources are resolved against.
///
/// # Examples
///
/// ```rust
/// use appvet::resource::{PlainResource, ResourceManager, RunArgs};
///
/// let mut manager = ResourceManager::new();
/// manager.register("standalone", |_args| {
///     Ok(Box::new(PlainResource::new("https://localhost:8089".to_string())))
/// });
///
/// let context = manager.context(RunArgs::default());
/// assert!(context.contains("standalone"));
/// let endpoint = context.get("standalone").unwrap();
/// assert_eq!(
///     endpoint.downcast_ref::<String>().unwrap(),
///     "https://localhost:8089"
/// );
/// ```
#[derive(Clone, Default)]
pub struct ResourceManager {
    providers: HashMap<String, Provider>,
}

impl ResourceManager {
    /// Creates an empty provider table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, provider: F)
    where
        F: Fn(&RunArgs) -> Result<Box<dyn ResourceHandle>> + Send + Sync + 'static,
    {
        self.providers.insert(name.into(), Arc::new(provider));
    }

    /// Registers an already-constructed value under `name`.
    pub fn register_value<T: Any + Send + Sync + Clone>(
        &mut self,
        name: impl Into<String>,
        value: T,
    ) {
        self.register(name, move |_args| Ok(Box::new(PlainResource::new(value.clone()))));
    }

    /// Returns the registered resource names.
    pub fn available_resources(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    /// Returns true if a provider is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Opens a run-scoped resource context.
    ///
    /// Nothing is constructed up front; each resource is built by its
    /// provider on first request and released when the context drops.
    pub fn context(&self, args: RunArgs) -> ResourceContext {
        ResourceContext {
            providers: self.providers.clone(),
            args,
            live: Mutex::new(HashMap::new()),
        }
    }
}

impl std::fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceManager")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A scoped view of the shared resources for one validation run.
///
/// Shared by all concurrently running checks; read-only from a check's
/// perspective. Dropping the context releases every constructed resource.
pub struct ResourceContext {
    providers: HashMap<String, Provider>,
    args: RunArgs,
    live: Mutex<HashMap<String, Arc<Box<dyn ResourceHandle>>>>,
}

impl ResourceContext {
    /// Returns true if `name` can be resolved in this context.
    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Returns the registered resource names.
    pub fn keys(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    /// Resolves `name`, constructing the resource on first use.
    ///
    /// Fails with [`AppVetError::ResourceSetup`] when the provider itself
    /// fails; an unknown name is reported as a setup failure too, but the
    /// engine checks [`contains`](Self::contains) first and maps that case
    /// to a missing-resource skip instead.
    pub fn get(&self, name: &str) -> Result<ResourceValue> {
        let mut live = self.live.lock().expect("resource table lock poisoned");
        if let Some(handle) = live.get(name) {
            return Ok(handle.value());
        }
        let provider = self.providers.get(name).ok_or_else(|| {
            AppVetError::resource_setup(name, "no such resource defined in context")
        })?;
        debug!(resource.name = %name, "constructing run resource");
        let handle = provider(&self.args)
            .map_err(|err| AppVetError::resource_setup(name, err.to_string()))?;
        let handle = Arc::new(handle);
        live.insert(name.to_string(), Arc::clone(&handle));
        Ok(handle.value())
    }

    /// Returns the run arguments this context was opened with.
    pub fn args(&self) -> &RunArgs {
        &self.args
    }
}

impl Drop for ResourceContext {
    fn drop(&mut self) {
        let mut live = self.live.lock().expect("resource table lock poisoned");
        for (name, handle) in live.drain() {
            debug!(resource.name = %name, "releasing run resource");
            handle.release();
        }
    }
}

impl std::fmt::Debug for ResourceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceContext")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandle {
        value: ResourceValue,
        released: Arc<AtomicUsize>,
    }

    impl ResourceHandle for CountingHandle {
        fn value(&self) -> ResourceValue {
            Arc::clone(&self.value)
        }

        fn release(&self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_lazy_construction_happens_once() {
        let constructed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&constructed);
        let mut manager = ResourceManager::new();
        manager.register("standalone", move |_args| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(PlainResource::new(42u32)))
        });

        let context = manager.context(RunArgs::default());
        assert_eq!(constructed.load(Ordering::SeqCst), 0);
        context.get("standalone").unwrap();
        context.get("standalone").unwrap();
        assert_eq!(constructed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let released_counter = Arc::clone(&released);
        let mut manager = ResourceManager::new();
        manager.register("cluster", move |_args| {
            Ok(Box::new(CountingHandle {
                value: Arc::new("cluster endpoint".to_string()),
                released: Arc::clone(&released_counter),
            }))
        });

        {
            let context = manager.context(RunArgs::default());
            context.get("cluster").unwrap();
        }
        assert_eq!(released.load(Ordering::SeqCst), 1);

        // Untouched resources are never constructed, so never released.
        drop(manager.context(RunArgs::default()));
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unknown_name_fails() {
        let manager = ResourceManager::new();
        let context = manager.context(RunArgs::default());
        assert!(!context.contains("cluster"));
        assert!(context.get("cluster").is_err());
    }

    #[test]
    fn test_provider_failure_is_reported() {
        let mut manager = ResourceManager::new();
        manager.register("cluster", |_args| {
            Err(AppVetError::custom("no licence available"))
        });
        let context = manager.context(RunArgs::default());
        let err = context.get("cluster").unwrap_err();
        assert!(err.to_string().contains("no licence available"));
    }
}
