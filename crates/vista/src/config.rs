//! View service configuration.
//!
//! [`Config`] is read once when the service is built. Empty values fall back
//! to the built-in defaults during construction:
//!
//! | Field | Default |
//! |-------|---------|
//! | `extension` | [`DEFAULT_EXTENSION`] (`.html`) |
//! | `default_layout` | [`DEFAULT_LAYOUT`] (`application`) |
//!
//! The configuration can also be loaded from YAML:
//!
//! ```rust
//! use vista::Config;
//!
//! let config = Config::from_yaml(r#"
//! extension: .tmpl
//! view_paths:
//!   - themes/base
//!   - themes/custom
//! "#).unwrap();
//!
//! assert_eq!(config.extension, ".tmpl");
//! assert_eq!(config.default_layout, "application");
//! ```

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::ViewError;
use crate::helpers::HelperProvider;

/// Layout used when a render asks for the default layout.
pub const DEFAULT_LAYOUT: &str = "application";

/// Conventional view directory, always registered last.
pub const DEFAULT_VIEW_PATH: &str = "views";

/// Extension appended to logical template names.
pub const DEFAULT_EXTENSION: &str = ".html";

/// Subdirectory of each view path that holds layouts.
pub const LAYOUTS_DIR: &str = "layouts";

/// Options for [`ViewService`](crate::ViewService).
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File extension appended to every logical template name.
    pub extension: String,

    /// View directories, registered in order before any extra paths.
    pub view_paths: Vec<PathBuf>,

    /// Layout name used by default-layout renders.
    pub default_layout: String,

    /// Per-request helper source, consulted on every render.
    #[serde(skip)]
    pub helper_provider: Option<Arc<dyn HelperProvider>>,
}

impl Config {
    /// Creates an empty configuration (defaults are applied at construction).
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from YAML.
    ///
    /// Missing keys keep their empty defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ViewError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config.normalized())
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_view_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.view_paths.push(path.into());
        self
    }

    pub fn with_default_layout(mut self, layout: impl Into<String>) -> Self {
        self.default_layout = layout.into();
        self
    }

    /// Sets the dynamic helper provider.
    ///
    /// Closures of the form `|ctx: &RenderContext| -> HelperMap` are accepted.
    pub fn with_helper_provider(mut self, provider: impl HelperProvider + 'static) -> Self {
        self.helper_provider = Some(Arc::new(provider));
        self
    }

    /// Returns the configuration with empty values replaced by defaults.
    pub fn normalized(mut self) -> Self {
        if self.extension.is_empty() {
            self.extension = DEFAULT_EXTENSION.to_string();
        }
        if self.default_layout.is_empty() {
            self.default_layout = DEFAULT_LAYOUT.to_string();
        }
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("extension", &self.extension)
            .field("view_paths", &self.view_paths)
            .field("default_layout", &self.default_layout)
            .field("helper_provider", &self.helper_provider.is_some())
            .finish()
    }
}
