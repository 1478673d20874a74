//! The view service facade.

use std::path::{Path, PathBuf};

use http::request::Parts;
use serde::Serialize;

use crate::config::{Config, DEFAULT_VIEW_PATH};
use crate::error::ViewError;
use crate::helpers::{Helper, HelperMap, HelperRegistry};
use crate::paths::{PathEnv, SearchPaths};
use crate::response::ResponseWriter;
use crate::template::Template;

/// Owns the configuration, search paths and registered helpers, and hands
/// out [`Template`]s for rendering.
///
/// Set up the service (paths, helpers) first, then share it, typically in an
/// `Arc`, across request handlers. Rendering only needs `&self`.
///
/// # Example
///
/// ```rust,ignore
/// use vista::{Config, Helper, ViewService};
///
/// let mut views = ViewService::new(Config::new(), ["themes/default"]);
/// views.register_helper("year", Helper::new(|| 2024));
///
/// // Inside a handler:
/// views.execute("home/index", &page, &mut response, &request_parts)?;
/// ```
#[derive(Debug)]
pub struct ViewService {
    config: Config,
    path_env: PathEnv,
    search_paths: SearchPaths,
    helpers: HelperRegistry,
}

impl ViewService {
    /// Builds a service with an empty helper registry.
    ///
    /// See [`ViewService::with_env`] for how paths are registered.
    pub fn new<I, P>(config: Config, extra_paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::with_registry(config, HelperRegistry::new(), extra_paths)
    }

    /// Builds a service around an existing helper registry.
    pub fn with_registry<I, P>(config: Config, helpers: HelperRegistry, extra_paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::with_env(config, helpers, PathEnv::from_env(), extra_paths)
    }

    /// Builds a service resolving relative paths against `path_env`.
    ///
    /// Empty configuration values are replaced by their defaults. The
    /// configured view paths, then `extra_paths`, then `views` are registered
    /// in that order.
    pub fn with_env<I, P>(
        config: Config,
        helpers: HelperRegistry,
        path_env: PathEnv,
        extra_paths: I,
    ) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut config = config.normalized();
        let mut view_paths = std::mem::take(&mut config.view_paths);
        view_paths.extend(extra_paths.into_iter().map(Into::into));
        view_paths.push(PathBuf::from(DEFAULT_VIEW_PATH));

        let mut service = Self {
            config,
            path_env,
            search_paths: SearchPaths::new(),
            helpers,
        };
        for path in &view_paths {
            service.register_view_path(path);
        }
        service.config.view_paths = view_paths;
        service
    }

    /// Resolves and registers another view directory.
    ///
    /// The new directory takes priority over every directory registered
    /// before it. Returns `None` if the path could not be resolved.
    pub fn register_view_path(&mut self, path: impl AsRef<Path>) -> Option<PathBuf> {
        self.search_paths.register(&self.path_env, path)
    }

    /// Registers a service-wide helper.
    pub fn register_helper(&mut self, name: impl Into<String>, helper: Helper) {
        self.helpers.register(name, helper);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn path_env(&self) -> &PathEnv {
        &self.path_env
    }

    pub fn search_paths(&self) -> &SearchPaths {
        &self.search_paths
    }

    pub fn helpers(&self) -> &HelperRegistry {
        &self.helpers
    }

    /// Reads a file (name including extension) from the search paths.
    pub fn asset(&self, name: &str) -> Result<Vec<u8>, ViewError> {
        self.search_paths.find(name)
    }

    /// A template wrapped in the named layout.
    pub fn layout(&self, name: impl Into<String>) -> Template<'_> {
        Template::new(self, false).layout(name)
    }

    /// A template using the default layout and the given helper overrides.
    pub fn funcs(&self, helpers: HelperMap) -> Template<'_> {
        Template::new(self, true).funcs(helpers)
    }

    pub fn with_default_layout(&self) -> Template<'_> {
        Template::new(self, true)
    }

    pub fn without_layout(&self) -> Template<'_> {
        Template::new(self, false)
    }

    /// Renders `name` inside the default layout.
    pub fn render<T: Serialize + ?Sized>(&self, name: &str, data: &T) -> Result<String, ViewError> {
        self.with_default_layout().render(name, data)
    }

    /// Renders `name` inside the default layout and writes it to `response`.
    ///
    /// Nothing is written if rendering fails; choosing a status code or error
    /// page is left to the caller.
    pub fn execute<T, W>(
        &self,
        name: &str,
        data: &T,
        response: &mut W,
        request: &Parts,
    ) -> Result<(), ViewError>
    where
        T: Serialize + ?Sized,
        W: ResponseWriter + ?Sized,
    {
        self.with_default_layout()
            .execute(name, data, response, request)
    }
}
