//! # Vista - Layout-Aware HTML Views
//!
//! `vista` finds templates across a list of view directories, wraps them in a
//! layout, exposes helper functions to them, and writes the result to an HTTP
//! response. Template parsing and execution are done by [`minijinja`].
//!
//! ## Core Concepts
//!
//! - [`ViewService`]: Owns configuration, search paths and helpers
//! - [`Template`]: One render configuration (layout choice + helper overrides)
//! - [`HelperRegistry`] / [`HelperProvider`]: Service-wide and per-request helpers
//! - [`SearchPaths`] / [`PathEnv`]: Where templates are looked up
//! - [`ResponseWriter`]: Where rendered output goes
//!
//! ## Quick Start
//!
//! ```rust
//! use vista::{Config, HelperRegistry, PathEnv, ViewService};
//! use serde::Serialize;
//!
//! # let dir = tempfile::TempDir::new().unwrap();
//! # std::fs::create_dir_all(dir.path().join("views/layouts")).unwrap();
//! # std::fs::write(dir.path().join("views/hello.html"), "Hi {{ name }}").unwrap();
//! # std::fs::write(dir.path().join("views/layouts/application.html"), "<main>{{ yield() }}</main>").unwrap();
//! #[derive(Serialize)]
//! struct Page { name: String }
//!
//! let views = ViewService::with_env(
//!     Config::new(),
//!     HelperRegistry::new(),
//!     PathEnv::new(dir.path(), Vec::new()),
//!     Vec::<std::path::PathBuf>::new(),
//! );
//!
//! let html = views.render("hello", &Page { name: "Ada".into() }).unwrap();
//! assert_eq!(html, "<main>Hi Ada</main>");
//! ```
//!
//! ## Template Layout on Disk
//!
//! ```text
//! views/
//! ├── layouts/
//! │   └── application.html     default layout, calls {{ yield() }}
//! ├── home/index.html          rendered as "home/index"
//! └── shared/footer.html       included via {{ view('shared/footer') }}
//! ```
//!
//! ## Helpers
//!
//! Helpers resolve in three layers (later wins): the service registry, the
//! configured [`HelperProvider`], then overrides passed to
//! [`Template::funcs`]. `view` and `yield` are always the built-in fragment
//! helpers. See the [`helpers`] module.

pub mod config;
mod error;
pub mod helpers;
pub mod paths;
pub mod response;
mod service;
pub mod template;

pub use config::{Config, DEFAULT_EXTENSION, DEFAULT_LAYOUT, DEFAULT_VIEW_PATH, LAYOUTS_DIR};
pub use error::ViewError;
pub use helpers::{
    Helper, HelperMap, HelperProvider, HelperRegistry, RenderContext, RESERVED_HELPERS,
};
pub use paths::{
    resolve, EnvReader, MockEnv, PathEnv, RealEnv, SearchPaths, LIBRARY_PATH_ENV_VAR,
    ROOT_ENV_VAR,
};
pub use response::{write_html, ResponseWriter, TEXT_HTML};
pub use service::ViewService;
pub use template::{LayoutSelection, Template, MAX_FRAGMENT_DEPTH};
