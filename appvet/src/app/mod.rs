//! The artifact facade handed to every check.
//!
//! An [`Application`] wraps one extracted artifact directory and exposes the
//! read-only operations checks build findings from: existence queries, file
//! iteration, line-oriented pattern search, parsed configuration lookup, and
//! a content hash identifying the package. Checks never touch the filesystem
//! directly; everything flows through this facade so findings cite paths
//! relative to the artifact root.

mod config;

pub use config::{ConfigFile, ConfigOption, ConfigParser, ConfigSection};

use crate::error::{AppVetError, Result};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// One pattern hit from [`Application::search_for_patterns`].
#[derive(Debug, Clone)]
pub struct PatternMatch {
    /// Path relative to the artifact root, with the 1-based line appended
    /// as `path:lineno` for direct citation in findings.
    pub file_ref: String,
    /// The pattern that matched.
    pub pattern: String,
    /// The matched text.
    pub matched: String,
}

/// A read-only view of one artifact under validation.
///
/// # Examples
///
/// ```rust,no_run
/// use appvet::app::Application;
///
/// let app = Application::open("/tmp/extracted/my_app")?;
/// if app.file_exists("default/savedsearches.conf") {
///     println!("{} ships saved searches", app.name());
/// }
/// # Ok::<(), appvet::error::AppVetError>(())
/// ```
#[derive(Debug)]
pub struct Application {
    name: String,
    root: PathBuf,
    configs: RwLock<BTreeMap<String, Arc<ConfigFile>>>,
}

impl Application {
    /// Opens an extracted artifact directory.
    ///
    /// # Errors
    ///
    /// Returns [`AppVetError::ArtifactUnreadable`] when the path does not
    /// exist or is not a directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(AppVetError::ArtifactUnreadable { path: root });
        }
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());
        debug!(app.name = %name, app.root = %root.display(), "opened artifact");
        Ok(Self {
            name,
            root,
            configs: RwLock::new(BTreeMap::new()),
        })
    }

    /// Creates a facade over a nonexistent directory, for unit tests that
    /// exercise check plumbing without a real artifact on disk.
    pub fn for_tests(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            root: PathBuf::from(format!("/nonexistent/{name}")),
            name,
            configs: RwLock::new(BTreeMap::new()),
        }
    }

    /// The artifact's directory name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The artifact root on disk.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `[launcher] author` value from `app.conf`, if present.
    pub fn author(&self) -> Option<String> {
        self.app_info("launcher", "author")
    }

    /// The `[launcher] version` value from `app.conf`, if present.
    pub fn version(&self) -> Option<String> {
        self.app_info("launcher", "version")
    }

    /// The `[ui] label` value from `app.conf`, if present.
    pub fn label(&self) -> Option<String> {
        self.app_info("ui", "label")
    }

    /// The `[launcher] description` value from `app.conf`, if present.
    pub fn description(&self) -> Option<String> {
        self.app_info("launcher", "description")
    }

    fn app_info(&self, section: &str, option: &str) -> Option<String> {
        let configs = self.configs.read().expect("config lock poisoned");
        let config = configs.get("app")?;
        config.option_value(section, option).ok().map(str::to_owned)
    }

    /// Returns true if `relative_path` names an existing file.
    pub fn file_exists(&self, relative_path: impl AsRef<Path>) -> bool {
        self.resolve(relative_path.as_ref())
            .map_or(false, |p| p.is_file())
    }

    /// Returns true if `relative_path` names an existing directory.
    pub fn directory_exists(&self, relative_path: impl AsRef<Path>) -> bool {
        self.resolve(relative_path.as_ref())
            .map_or(false, |p| p.is_dir())
    }

    /// Reads a file's contents as UTF-8 text, lossily.
    pub fn read_file(&self, relative_path: impl AsRef<Path>) -> Result<String> {
        let path = self.resolve(relative_path.as_ref())?;
        let bytes = fs::read(&path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Iterates files under the artifact matching a glob pattern relative to
    /// the root, e.g. `default/*.conf` or `**/*.py`. Returned paths are
    /// relative to the root, sorted.
    pub fn iterate_files(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let full = self.root.join(pattern);
        let full = full.to_string_lossy();
        let mut out = Vec::new();
        for entry in glob::glob(&full)? {
            let path = match entry {
                Ok(path) => path,
                Err(err) => {
                    debug!(app.name = %self.name, error = %err, "skipping unreadable entry");
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }
            if let Ok(rel) = path.strip_prefix(&self.root) {
                out.push(rel.to_path_buf());
            }
        }
        out.sort();
        Ok(out)
    }

    /// Searches files matching `file_pattern` for each regex in `patterns`,
    /// line by line. Every hit yields a [`PatternMatch`] citing
    /// `relative/path:lineno`.
    pub fn search_for_patterns(
        &self,
        patterns: &[&str],
        file_pattern: &str,
    ) -> Result<Vec<PatternMatch>> {
        let compiled: Vec<Regex> = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<_, _>>()?;

        let mut hits = Vec::new();
        for rel in self.iterate_files(file_pattern)? {
            let text = match self.read_file(&rel) {
                Ok(text) => text,
                Err(err) => {
                    debug!(app.name = %self.name, file = %rel.display(), error = %err,
                        "skipping unreadable file during pattern search");
                    continue;
                }
            };
            for (lineno, line) in text.lines().enumerate() {
                for (pattern, regex) in patterns.iter().zip(&compiled) {
                    if let Some(found) = regex.find(line) {
                        hits.push(PatternMatch {
                            file_ref: format!("{}:{}", rel.display(), lineno + 1),
                            pattern: (*pattern).to_string(),
                            matched: found.as_str().to_string(),
                        });
                    }
                }
            }
        }
        Ok(hits)
    }

    /// Searches for a single regex. A convenience over
    /// [`search_for_patterns`](Self::search_for_patterns).
    pub fn search_for_pattern(
        &self,
        pattern: &str,
        file_pattern: &str,
    ) -> Result<Vec<PatternMatch>> {
        self.search_for_patterns(&[pattern], file_pattern)
    }

    /// A SHA-256 digest over every file's relative path and contents, in
    /// path order. Identifies the package contents independent of where the
    /// artifact was extracted.
    pub fn content_hash(&self) -> Result<String> {
        let mut hasher = Sha256::new();
        for rel in self.iterate_files("**/*")? {
            hasher.update(rel.to_string_lossy().as_bytes());
            let mut file = fs::File::open(self.root.join(&rel))?;
            let mut buf = [0u8; 8192];
            loop {
                let n = file.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
            }
        }
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Registers a parsed configuration file under its logical name,
    /// replacing any previous registration.
    pub fn register_config(&self, config: ConfigFile) {
        let mut configs = self.configs.write().expect("config lock poisoned");
        configs.insert(config.name.clone(), Arc::new(config));
    }

    /// Parses `default/<name>.conf` with the given parser and registers the
    /// result.
    pub fn load_config(&self, name: &str, parser: &dyn ConfigParser) -> Result<Arc<ConfigFile>> {
        let text = self.read_file(format!("default/{name}.conf"))?;
        let config = parser.parse(name, &text)?;
        self.register_config(config);
        self.config(name)
    }

    /// Returns a registered configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`AppVetError::MissingConfig`] when nothing was registered
    /// under `name`.
    pub fn config(&self, name: &str) -> Result<Arc<ConfigFile>> {
        let configs = self.configs.read().expect("config lock poisoned");
        configs
            .get(name)
            .cloned()
            .ok_or_else(|| AppVetError::MissingConfig {
                name: name.to_string(),
            })
    }

    /// Returns true if a configuration file was registered under `name`.
    pub fn has_config(&self, name: &str) -> bool {
        let configs = self.configs.read().expect("config lock poisoned");
        configs.contains_key(name)
    }

    fn resolve(&self, relative: &Path) -> Result<PathBuf> {
        // Reject traversal out of the artifact root.
        for component in relative.components() {
            if matches!(component, std::path::Component::ParentDir) {
                return Err(AppVetError::ArtifactUnreadable {
                    path: relative.to_path_buf(),
                });
            }
        }
        Ok(self.root.join(relative))
    }
}
