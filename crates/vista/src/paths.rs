//! Search-path registration and template file lookup.
//!
//! Templates are looked up by file name across an ordered list of view
//! directories. Two steps are involved:
//!
//! 1. Registration: a configured path is turned into an absolute directory by
//!    [`PathEnv::resolve`] and added to [`SearchPaths`].
//! 2. Lookup: [`resolve`] walks the directories in order and reads the first
//!    matching regular file.
//!
//! # Relative Path Resolution
//!
//! A relative entry such as `"views"` is checked against several candidate
//! locations, in this order:
//!
//! | Order | Candidate |
//! |-------|-----------|
//! | 1 | `<root>/vendor/<path>` |
//! | 2 | `<lib>/src/<path>` for each library root |
//! | 3 | `<path>` made absolute against the working directory |
//! | 4 | `<root>/<path>` |
//!
//! Every candidate that exists as a directory replaces the previous match, so
//! the last one wins. Entries with no match are dropped.
//!
//! # Priority
//!
//! Registration puts a directory in front of everything registered before
//! it. When two directories contain the same file, the one registered later
//! is returned. Register the most specific directories last.
//!
//! # Environment
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `WEB_ROOT` | Working root override (defaults to the process working directory) |
//! | `VIEW_LIBRARY_PATH` | Library search roots, separated like `PATH` |

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::ViewError;

/// Variable overriding the working root.
pub const ROOT_ENV_VAR: &str = "WEB_ROOT";

/// Variable listing library search roots.
pub const LIBRARY_PATH_ENV_VAR: &str = "VIEW_LIBRARY_PATH";

/// Subdirectory of the working root holding vendored view packages.
pub const VENDOR_DIR: &str = "vendor";

/// Subdirectory of each library root that view paths are joined onto.
pub const LIBRARY_SOURCE_DIR: &str = "src";

/// Abstraction over environment variables.
pub trait EnvReader: Send + Sync {
    /// Get an environment variable value.
    fn var(&self, name: &str) -> Option<String>;
}

/// Real environment variable reader.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealEnv;

impl EnvReader for RealEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Mock environment variable reader for testing.
#[derive(Debug, Clone, Default)]
pub struct MockEnv {
    vars: HashMap<String, String>,
}

impl MockEnv {
    /// Create an empty mock environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an environment variable.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl EnvReader for MockEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

/// Locations used to resolve relative view paths.
///
/// Captured once when the service is built and reused for every later
/// registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEnv {
    /// The working root (`WEB_ROOT`, or the process working directory).
    pub root: PathBuf,
    /// Library search roots, in the order they were listed.
    pub library_roots: Vec<PathBuf>,
}

impl PathEnv {
    /// Creates a path environment from explicit locations.
    pub fn new(root: impl Into<PathBuf>, library_roots: Vec<PathBuf>) -> Self {
        Self {
            root: root.into(),
            library_roots,
        }
    }

    /// Reads the path environment from the process environment.
    pub fn from_env() -> Self {
        Self::from_reader(&RealEnv)
    }

    /// Reads the path environment through the given reader.
    ///
    /// An unset or empty library-root variable is not an error, it only
    /// leaves the library roots empty.
    pub fn from_reader(env: &dyn EnvReader) -> Self {
        let root = match env.var(ROOT_ENV_VAR).filter(|v| !v.is_empty()) {
            Some(root) => PathBuf::from(root),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };

        let library_roots = match env.var(LIBRARY_PATH_ENV_VAR).filter(|v| !v.is_empty()) {
            Some(list) => std::env::split_paths(&list)
                .filter(|p| !p.as_os_str().is_empty())
                .collect(),
            None => {
                tracing::warn!(
                    "{} is not set, library view paths are disabled",
                    LIBRARY_PATH_ENV_VAR
                );
                Vec::new()
            }
        };

        Self {
            root,
            library_roots,
        }
    }

    /// Resolves a configured view path to an absolute directory.
    ///
    /// Absolute paths are returned unchanged without checking the disk.
    /// Relative paths go through the candidate search described in the
    /// [module docs](self); `None` means no candidate exists.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Option<PathBuf> {
        let path = path.as_ref();
        if path.is_absolute() {
            return Some(path.to_path_buf());
        }

        let mut resolved = None;

        let vendored = self.root.join(VENDOR_DIR).join(path);
        if vendored.is_dir() {
            resolved = Some(vendored);
        }

        for lib in &self.library_roots {
            let candidate = lib.join(LIBRARY_SOURCE_DIR).join(path);
            if candidate.is_dir() {
                resolved = Some(candidate);
            }
        }

        if let Ok(absolute) = std::path::absolute(path) {
            if absolute.is_dir() {
                resolved = Some(absolute);
            }
        }

        let rooted = self.root.join(path);
        if rooted.is_dir() {
            resolved = Some(rooted);
        }

        resolved
    }
}

/// Ordered list of resolved view directories.
///
/// Iteration order is lookup order: the most recently registered directory
/// comes first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPaths {
    dirs: Vec<PathBuf>,
}

impl SearchPaths {
    /// Creates an empty search path list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an already resolved directory ahead of all existing ones.
    pub fn push(&mut self, dir: impl Into<PathBuf>) {
        self.dirs.insert(0, dir.into());
    }

    /// Resolves `path` through `env` and registers the result.
    ///
    /// Returns the registered directory, or `None` if the path was dropped.
    pub fn register(&mut self, env: &PathEnv, path: impl AsRef<Path>) -> Option<PathBuf> {
        let path = path.as_ref();
        match env.resolve(path) {
            Some(dir) => {
                self.push(dir.clone());
                Some(dir)
            }
            None => {
                tracing::debug!("dropping view path {}: no matching directory", path.display());
                None
            }
        }
    }

    /// Directories in lookup order.
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Reads `name` from the first directory containing it.
    pub fn find(&self, name: &str) -> Result<Vec<u8>, ViewError> {
        resolve(&self.dirs, name)
    }
}

/// Reads the first `directory/name` that exists as a regular file.
///
/// Nothing is cached; every call touches the file system.
///
/// # Errors
///
/// Returns [`ViewError::NotFound`] naming `name` when no directory has the
/// file, or [`ViewError::Read`] when the file exists but can't be read.
pub fn resolve<P: AsRef<Path>>(directories: &[P], name: &str) -> Result<Vec<u8>, ViewError> {
    for dir in directories {
        let candidate = dir.as_ref().join(name);
        if candidate.is_file() {
            return std::fs::read(&candidate).map_err(|source| ViewError::Read {
                path: candidate,
                source,
            });
        }
    }
    Err(ViewError::not_found(name))
}
