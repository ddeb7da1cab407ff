//! Built-in check groups.
//!
//! The packaging group is the one every run depends on: its checks carry the
//! gating tag, so a blocking finding here suppresses the rest of the run.
//! Deployments register their own domain groups next to it.

use crate::core::{CheckBuilder, Group, GroupBuilder, GroupRegistry};
use crate::engine::PACKAGING_STANDARDS_TAG;
use futures::FutureExt;

const NESTED_ARTIFACT_PATTERNS: &[&str] =
    &["**/*.tar.gz", "**/*.tgz", "**/*.spl", "**/*.zip"];

/// The built-in packaging standards group.
pub fn packaging_group() -> Group {
    GroupBuilder::new("packaging")
        .doc("Artifact packaging standards")
        .display_order(0)
        .check(
            CheckBuilder::new("check_artifact_is_not_empty")
                .description("The artifact must contain at least one file.")
                .tags([PACKAGING_STANDARDS_TAG])
                .routine_fn(|ctx| {
                    async move {
                        let files = ctx.app().iterate_files("**/*")?;
                        ctx.reporter().fail_unless(
                            !files.is_empty(),
                            "The artifact contains no files.",
                        );
                        Ok(())
                    }
                    .boxed()
                })
                .build(),
        )
        .check(
            CheckBuilder::new("check_no_nested_artifacts")
                .description(
                    "The artifact must not contain packaged archives of itself \
                     or of other artifacts.",
                )
                .tags([PACKAGING_STANDARDS_TAG])
                .routine_fn(|ctx| {
                    async move {
                        for pattern in NESTED_ARTIFACT_PATTERNS {
                            for path in ctx.app().iterate_files(pattern)? {
                                ctx.reporter().fail(format!(
                                    "Nested artifact found. File: {}",
                                    path.display()
                                ));
                            }
                        }
                        Ok(())
                    }
                    .boxed()
                })
                .build(),
        )
        .check(
            CheckBuilder::new("check_app_conf_is_declared")
                .description("The artifact must declare itself in default/app.conf.")
                .tags([PACKAGING_STANDARDS_TAG])
                .routine_fn(|ctx| {
                    async move {
                        ctx.reporter().fail_unless(
                            ctx.app().file_exists("default/app.conf"),
                            "No default/app.conf declared. File: default/app.conf",
                        );
                        Ok(())
                    }
                    .boxed()
                })
                .build(),
        )
        .build()
}

/// A registry seeded with the built-in groups.
pub fn default_registry() -> GroupRegistry {
    let mut registry = GroupRegistry::new();
    registry.register(packaging_group());
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Application;
    use crate::report::CheckState;
    use crate::resource::{ResourceManager, RunArgs};
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn artifact(with_app_conf: bool, with_nested: bool) -> (TempDir, Arc<Application>) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("packaged_app");
        fs::create_dir_all(root.join("default")).unwrap();
        fs::write(root.join("default/props.conf"), "[source::sample]\n").unwrap();
        if with_app_conf {
            fs::write(root.join("default/app.conf"), "[launcher]\n").unwrap();
        }
        if with_nested {
            fs::write(root.join("inner.tgz"), b"not really an archive").unwrap();
        }
        let app = Arc::new(Application::open(root).unwrap());
        (dir, app)
    }

    async fn run_check(name: &str, app: Arc<Application>) -> CheckState {
        let group = packaging_group();
        let check = group
            .all_checks()
            .into_iter()
            .find(|c| c.name() == name)
            .unwrap();
        let resources = ResourceManager::new().context(RunArgs::default());
        check.run(app, &resources).await.state()
    }

    #[tokio::test]
    async fn test_clean_artifact_passes_packaging() {
        let (_dir, app) = artifact(true, false);
        for check in packaging_group().all_checks() {
            let resources = ResourceManager::new().context(RunArgs::default());
            let reporter = check.run(Arc::clone(&app), &resources).await;
            assert_eq!(reporter.state(), CheckState::Success, "{}", check.name());
        }
    }

    #[tokio::test]
    async fn test_nested_archive_is_a_failure() {
        let (_dir, app) = artifact(true, true);
        let state = run_check("check_no_nested_artifacts", app).await;
        assert_eq!(state, CheckState::Failure);
    }

    #[tokio::test]
    async fn test_missing_app_conf_is_a_failure() {
        let (_dir, app) = artifact(false, false);
        let state = run_check("check_app_conf_is_declared", app).await;
        assert_eq!(state, CheckState::Failure);
    }
}
