//! Template helper functions and their precedence rules.
//!
//! Helpers are callables exposed to templates as global functions. Every
//! render builds a fresh [`HelperMap`] by layering three sources, each one
//! overwriting same-named entries from the layers before it:
//!
//! 1. The service-wide [`HelperRegistry`]
//! 2. The configured [`HelperProvider`], called with the current [`RenderContext`]
//! 3. Per-call overrides passed to [`Template::funcs`](crate::Template::funcs)
//!
//! The composer then injects `view` and `yield` on top of the merged map, so
//! those two names always refer to the built-in fragment helpers.
//!
//! # Example
//!
//! ```rust
//! use vista::{Helper, HelperMap, HelperRegistry};
//!
//! let mut registry = HelperRegistry::new();
//! registry.register("shout", Helper::new(|s: String| s.to_uppercase()));
//!
//! let overrides = HelperMap::new().with("year", || 2024);
//! assert!(registry.contains("shout"));
//! assert!(overrides.contains("year"));
//! ```

use std::collections::hash_map;
use std::collections::HashMap;
use std::fmt;

use http::request::Parts;
use http::HeaderMap;
use minijinja::functions::Function;
use minijinja::value::{FunctionArgs, FunctionResult, Value};
use minijinja::Environment;

use crate::service::ViewService;

/// Helper names injected by the composer on every render.
pub const RESERVED_HELPERS: &[&str] = &["view", "yield"];

/// A callable that templates can invoke.
///
/// Only functions can become helpers, so a non-callable value can never be
/// registered under a helper name.
#[derive(Clone)]
pub struct Helper(Value);

impl Helper {
    /// Wraps a function as a helper.
    ///
    /// Any function minijinja can call is accepted: arguments are converted
    /// from template values, and the return value may be a plain value or a
    /// `Result<_, minijinja::Error>`.
    pub fn new<F, Rv, Args>(f: F) -> Self
    where
        F: Function<Rv, Args>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        Self(Value::from_function(f))
    }

    /// The callable as a template value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl fmt::Debug for Helper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Helper(..)")
    }
}

/// Flat mapping from helper name to helper.
#[derive(Debug, Clone, Default)]
pub struct HelperMap {
    entries: HashMap<String, Helper>,
}

impl HelperMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a helper, returning the one it replaced.
    pub fn insert(&mut self, name: impl Into<String>, helper: Helper) -> Option<Helper> {
        self.entries.insert(name.into(), helper)
    }

    /// Builder-style insert of a function.
    pub fn with<F, Rv, Args>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Function<Rv, Args>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        self.insert(name, Helper::new(f));
        self
    }

    /// Builder-style insert of an existing helper.
    pub fn with_helper(mut self, name: impl Into<String>, helper: Helper) -> Self {
        self.insert(name, helper);
        self
    }

    /// Copies every entry of `other` into this map, overwriting on collision.
    pub fn extend_from(&mut self, other: &HelperMap) {
        for (name, helper) in &other.entries {
            self.entries.insert(name.clone(), helper.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&Helper> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|s| s.as_str())
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, Helper> {
        self.entries.iter()
    }

    /// Registers every helper as a global of `env`.
    pub(crate) fn install(&self, env: &mut Environment<'_>) {
        for (name, helper) in &self.entries {
            env.add_global(name.clone(), helper.0.clone());
        }
    }
}

impl FromIterator<(String, Helper)> for HelperMap {
    fn from_iter<I: IntoIterator<Item = (String, Helper)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for HelperMap {
    type Item = (String, Helper);
    type IntoIter = hash_map::IntoIter<String, Helper>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a HelperMap {
    type Item = (&'a String, &'a Helper);
    type IntoIter = hash_map::Iter<'a, String, Helper>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// What a [`HelperProvider`] can see about the render in progress.
///
/// Renders that don't come from an HTTP request have no request head and no
/// response headers.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// The service performing the render.
    pub view: &'a ViewService,

    /// The incoming request, when rendering for one.
    pub request: Option<&'a Parts>,

    /// Headers already set on the outgoing response.
    pub response_headers: Option<&'a HeaderMap>,
}

impl<'a> RenderContext<'a> {
    /// Creates a context with no request attached.
    pub fn new(view: &'a ViewService) -> Self {
        Self {
            view,
            request: None,
            response_headers: None,
        }
    }

    pub fn with_request(mut self, request: &'a Parts) -> Self {
        self.request = Some(request);
        self
    }

    pub fn with_response_headers(mut self, headers: &'a HeaderMap) -> Self {
        self.response_headers = Some(headers);
        self
    }

    /// Looks up a request header as a string.
    pub fn request_header(&self, name: &str) -> Option<&'a str> {
        self.request?.headers.get(name)?.to_str().ok()
    }
}

/// Source of request-scoped helpers.
///
/// Called once per render. A typical provider builds helpers that close over
/// request data, such as a CSRF token helper.
///
/// A blanket implementation covers closures:
///
/// ```rust
/// use vista::{Config, HelperMap, RenderContext};
///
/// let config = Config::new().with_helper_provider(|ctx: &RenderContext| {
///     let token = ctx.request_header("x-csrf-token").unwrap_or_default().to_string();
///     HelperMap::new().with("csrf_token", move || token.clone())
/// });
/// # let _ = config;
/// ```
pub trait HelperProvider: Send + Sync {
    /// Produce the helpers for this render; an empty map is fine.
    fn provide(&self, ctx: &RenderContext<'_>) -> HelperMap;
}

impl<F> HelperProvider for F
where
    F: Fn(&RenderContext<'_>) -> HelperMap + Send + Sync,
{
    fn provide(&self, ctx: &RenderContext<'_>) -> HelperMap {
        (self)(ctx)
    }
}

/// Service-wide helpers.
///
/// Mutation needs `&mut self`: register everything while building the
/// service, then share it read-only across requests.
#[derive(Debug, Clone, Default)]
pub struct HelperRegistry {
    global: HelperMap,
}

impl HelperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a helper under `name`; the last registration wins.
    pub fn register(&mut self, name: impl Into<String>, helper: Helper) {
        let name = name.into();
        if RESERVED_HELPERS.contains(&name.as_str()) {
            tracing::warn!(
                "helper '{}' is reserved and will be replaced at render time",
                name
            );
        }
        self.global.insert(name, helper);
    }

    pub fn get(&self, name: &str) -> Option<&Helper> {
        self.global.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.global.contains(name)
    }

    pub fn len(&self) -> usize {
        self.global.len()
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
    }

    /// The registered helpers.
    pub fn helpers(&self) -> &HelperMap {
        &self.global
    }

    /// Builds the merged map for one render.
    ///
    /// Layers, lowest precedence first: registered helpers, the provider's
    /// output, then `overrides`.
    pub fn merge(
        &self,
        provider: Option<&dyn HelperProvider>,
        ctx: &RenderContext<'_>,
        overrides: &HelperMap,
    ) -> HelperMap {
        let mut merged = self.global.clone();

        if let Some(provider) = provider {
            let provided = provider.provide(ctx);
            for name in RESERVED_HELPERS.iter().filter(|name| provided.contains(name)) {
                tracing::warn!("provided helper '{}' is shadowed by the built-in", name);
            }
            merged.extend_from(&provided);
        }

        merged.extend_from(overrides);
        merged
    }
}
