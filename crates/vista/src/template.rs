//! Layout composition and rendering.
//!
//! A [`Template`] is a short-lived render configuration created from a
//! [`ViewService`]. It decides which layout, if any, wraps the content
//! template, and which helpers are visible to both.
//!
//! # Layout Selection
//!
//! | Created via | Selection |
//! |-------------|-----------|
//! | [`ViewService::layout`] / [`Template::layout`] with a name | [`LayoutSelection::Named`] |
//! | [`ViewService::funcs`], [`ViewService::with_default_layout`], [`ViewService::execute`] | [`LayoutSelection::Default`] |
//! | [`ViewService::without_layout`], or an empty layout name | [`LayoutSelection::None`] |
//!
//! An explicit name always beats the default-layout flag.
//!
//! # Missing Layouts
//!
//! The two layout kinds fail differently when `layouts/<name>` is absent:
//!
//! - Default layout: the render fails with [`ViewError::MissingLayout`].
//! - Named layout: the layout is skipped and the bare content template is
//!   rendered instead.
//!
//! # Built-in Helpers
//!
//! Every template of a render, fragments included, can call:
//!
//! - `view(name)` / `view(name, data)`: renders another template in its own
//!   environment. Without `data` the render's data object is reused; with
//!   several data arguments only the first is used. Failures are logged and
//!   produce an empty fragment, as does nesting deeper than
//!   [`MAX_FRAGMENT_DEPTH`].
//! - `yield()`: same as `view(<content template>)`. Layouts call it to place
//!   the wrapped content.
//!
//! Every template is HTML-escaped regardless of its extension; fragment output
//! is inserted as-is.
//!
//! ```jinja
//! <html><body>{{ yield() }}<footer>{{ view('footer', site) }}</footer></body></html>
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use http::request::Parts;
use minijinja::value::{Rest, Value};
use minijinja::{AutoEscape, Environment};
use serde::Serialize;

use crate::config::LAYOUTS_DIR;
use crate::error::ViewError;
use crate::helpers::{HelperMap, RenderContext};
use crate::paths;
use crate::response::{write_html, ResponseWriter};
use crate::service::ViewService;

/// How deeply `view` and `yield` calls may nest before a fragment is refused.
pub const MAX_FRAGMENT_DEPTH: usize = 16;

/// Which layout, if any, wraps the content template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutSelection {
    /// Render the content template alone.
    None,
    /// Wrap in an explicitly chosen layout; fall back to no layout if missing.
    Named(String),
    /// Wrap in the configured default layout; fail if missing.
    Default(String),
}

/// A render configuration bound to a [`ViewService`].
///
/// # Example
///
/// ```rust,ignore
/// let html = service
///     .layout("admin")
///     .funcs(HelperMap::new().with("title", || "Dashboard"))
///     .render("dashboard/index", &data)?;
/// ```
#[derive(Debug, Clone)]
pub struct Template<'v> {
    view: &'v ViewService,
    layout: Option<String>,
    use_default_layout: bool,
    helpers: HelperMap,
}

impl<'v> Template<'v> {
    pub(crate) fn new(view: &'v ViewService, use_default_layout: bool) -> Self {
        Self {
            view,
            layout: None,
            use_default_layout,
            helpers: HelperMap::new(),
        }
    }

    /// Selects a layout by name; an empty name clears the selection.
    pub fn layout(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.layout = if name.is_empty() { None } else { Some(name) };
        self
    }

    /// Sets the per-call helper overrides, replacing earlier ones.
    pub fn funcs(mut self, helpers: HelperMap) -> Self {
        self.helpers = helpers;
        self
    }

    /// The layout this template will use.
    pub fn selection(&self) -> LayoutSelection {
        match &self.layout {
            Some(name) => LayoutSelection::Named(name.clone()),
            None if self.use_default_layout => {
                LayoutSelection::Default(self.view.config().default_layout.clone())
            }
            None => LayoutSelection::None,
        }
    }

    /// Renders `name` with `data`, outside of any HTTP request.
    pub fn render<T: Serialize + ?Sized>(&self, name: &str, data: &T) -> Result<String, ViewError> {
        self.render_with(name, data, &RenderContext::new(self.view))
    }

    /// Renders `name` with `data`, handing `ctx` to the helper provider.
    ///
    /// Failures are logged before being returned.
    pub fn render_with<T: Serialize + ?Sized>(
        &self,
        name: &str,
        data: &T,
        ctx: &RenderContext<'_>,
    ) -> Result<String, ViewError> {
        let result = self.compose(name, Value::from_serialize(data), ctx);
        if let Err(err) = &result {
            tracing::error!(template = name, "{}", err);
        }
        result
    }

    /// Renders `name` as a standalone fragment, without any layout.
    ///
    /// Unlike the `view` template helper, failures are returned rather than
    /// degraded to empty output.
    pub fn view<T: Serialize + ?Sized>(&self, name: &str, data: &T) -> Result<String, ViewError> {
        let ctx = RenderContext::new(self.view);
        let scope = self.scope(name, Value::from_serialize(data), &ctx);
        let result = scope.fragment(name, &scope.data);
        if let Err(err) = &result {
            tracing::error!(fragment = name, "{}", err);
        }
        result
    }

    /// Renders `name` and writes it to `response`.
    ///
    /// On success `Content-Type: text/html` is set unless the response already
    /// has a content type. On failure the response is left untouched.
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
        let output = {
            let ctx = RenderContext::new(self.view)
                .with_request(request)
                .with_response_headers(response.headers());
            self.render_with(name, data, &ctx)?
        };
        write_html(response, output.as_bytes())
    }

    fn scope(&self, content: &str, data: Value, ctx: &RenderContext<'_>) -> Arc<RenderScope> {
        let helpers = self.view.helpers().merge(
            self.view.config().helper_provider.as_deref(),
            ctx,
            &self.helpers,
        );

        Arc::new(RenderScope {
            dirs: self.view.search_paths().dirs().to_vec(),
            extension: self.view.config().extension.clone(),
            helpers,
            data,
            content: content.to_string(),
            depth: 0,
        })
    }

    fn compose(
        &self,
        name: &str,
        data: Value,
        ctx: &RenderContext<'_>,
    ) -> Result<String, ViewError> {
        let scope = self.scope(name, data, ctx);

        match self.selection() {
            LayoutSelection::Named(layout) => match scope.load(&layout_path(&layout)) {
                Ok((file, source)) => return scope.render_source(file, source, &scope.data),
                Err(err) => {
                    tracing::debug!(
                        layout = %layout,
                        "layout unavailable, rendering {} without it: {}",
                        name,
                        err
                    );
                }
            },
            LayoutSelection::Default(layout) => {
                tracing::debug!(layout = %layout, "using default layout");
                let path = layout_path(&layout);
                let (file, source) = scope.load(&path).map_err(|err| ViewError::MissingLayout {
                    layout: path.clone(),
                    source: Box::new(err),
                })?;
                return scope.render_source(file, source, &scope.data);
            }
            LayoutSelection::None => {}
        }

        let (file, source) = scope.load(name)?;
        scope.render_source(file, source, &scope.data)
    }
}

fn layout_path(layout: &str) -> String {
    format!("{}/{}", LAYOUTS_DIR, layout.trim())
}

/// Everything one render call needs, owned so the `view` and `yield`
/// helpers can hold on to it.
struct RenderScope {
    dirs: Vec<PathBuf>,
    extension: String,
    helpers: HelperMap,
    data: Value,
    content: String,
    depth: usize,
}

impl RenderScope {
    /// Reads a logical template name, returning its file name and source.
    fn load(&self, logical: &str) -> Result<(String, String), ViewError> {
        let file = format!("{}{}", logical.trim(), self.extension);
        let bytes = paths::resolve(&self.dirs, &file)?;
        let source = String::from_utf8(bytes).map_err(|source| ViewError::InvalidUtf8 {
            name: file.clone(),
            source,
        })?;
        Ok((file, source))
    }

    /// A fresh environment carrying the merged helpers plus `view` and `yield`.
    fn environment(self: &Arc<Self>) -> Environment<'static> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        self.helpers.install(&mut env);

        let scope = Arc::clone(self);
        env.add_function("view", move |name: String, data: Rest<Value>| {
            scope.fragment_helper(&name, data.first())
        });

        let scope = Arc::clone(self);
        env.add_function("yield", move || scope.fragment_helper(&scope.content, None));

        env
    }

    fn render_source(
        self: &Arc<Self>,
        file: String,
        source: String,
        data: &Value,
    ) -> Result<String, ViewError> {
        let mut env = self.environment();
        if let Err(source) = env.add_template_owned(file.clone(), source) {
            return Err(ViewError::Parse { name: file, source });
        }

        let rendered = match env.get_template(&file) {
            Ok(template) => template.render(data),
            Err(source) => return Err(ViewError::Parse { name: file, source }),
        };
        rendered.map_err(|source| ViewError::Execute { name: file, source })
    }

    fn fragment(self: &Arc<Self>, name: &str, data: &Value) -> Result<String, ViewError> {
        let (file, source) = self.load(name)?;
        self.render_source(file, source, data)
    }

    /// The scope fragments called from this one render in.
    fn nested(&self) -> Result<Arc<Self>, ViewError> {
        let depth = self.depth + 1;
        if depth > MAX_FRAGMENT_DEPTH {
            return Err(ViewError::TooDeep {
                limit: MAX_FRAGMENT_DEPTH,
            });
        }
        Ok(Arc::new(RenderScope {
            dirs: self.dirs.clone(),
            extension: self.extension.clone(),
            helpers: self.helpers.clone(),
            data: self.data.clone(),
            content: self.content.clone(),
            depth,
        }))
    }

    fn fragment_helper(&self, name: &str, data: Option<&Value>) -> Value {
        let data = data.unwrap_or(&self.data);
        let result = self.nested().and_then(|scope| scope.fragment(name, data));
        match result {
            Ok(output) => Value::from_safe_string(output),
            Err(err) => {
                tracing::error!(fragment = name, "{}", err);
                Value::from_safe_string(String::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::helpers::HelperRegistry;
    use crate::paths::PathEnv;
    use serde_json::json;
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;

    fn create_file(dir: &Path, relative_path: &str, content: &str) {
        let full_path = dir.join(relative_path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut file = std::fs::File::create(&full_path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    fn service(dir: &Path) -> ViewService {
        ViewService::with_env(
            Config::new(),
            HelperRegistry::new(),
            PathEnv::new(dir, Vec::new()),
            vec![dir.to_path_buf()],
        )
    }

    #[test]
    fn test_selection_rules() {
        let temp_dir = TempDir::new().unwrap();
        let view = service(temp_dir.path());

        assert_eq!(view.without_layout().selection(), LayoutSelection::None);
        assert_eq!(
            view.with_default_layout().selection(),
            LayoutSelection::Default("application".into())
        );
        assert_eq!(
            view.layout("admin").selection(),
            LayoutSelection::Named("admin".into())
        );
        assert_eq!(
            view.with_default_layout().layout("admin").selection(),
            LayoutSelection::Named("admin".into())
        );
        assert_eq!(view.layout("").selection(), LayoutSelection::None);
        assert_eq!(
            view.funcs(HelperMap::new()).selection(),
            LayoutSelection::Default("application".into())
        );
    }

    #[test]
    fn test_render_without_layout() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "hello.html", "Hi {{ Name }}");

        let view = service(temp_dir.path());
        let output = view
            .without_layout()
            .render("hello", &json!({"Name": "Ada"}))
            .unwrap();
        assert_eq!(output, "Hi Ada");
    }

    #[test]
    fn test_render_trims_name() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "hello.html", "Hi {{ Name }}");

        let view = service(temp_dir.path());
        let output = view
            .without_layout()
            .render("  hello\n", &json!({"Name": "Ada"}))
            .unwrap();
        assert_eq!(output, "Hi Ada");
    }

    #[test]
    fn test_default_layout_wraps_content_unescaped() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "hello.html", "<p>Hi {{ Name }}</p>");
        create_file(
            temp_dir.path(),
            "layouts/application.html",
            "<main>{{ yield() }}</main>",
        );

        let view = service(temp_dir.path());
        let output = view
            .with_default_layout()
            .render("hello", &json!({"Name": "Ada"}))
            .unwrap();
        assert_eq!(output, "<main><p>Hi Ada</p></main>");
    }

    #[test]
    fn test_default_layout_missing_fails() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "hello.html", "Hi {{ Name }}");

        let view = service(temp_dir.path());
        let err = view
            .with_default_layout()
            .render("hello", &json!({"Name": "Ada"}))
            .unwrap_err();

        match &err {
            ViewError::MissingLayout { layout, .. } => assert_eq!(layout, "layouts/application"),
            other => panic!("expected missing layout, got {:?}", other),
        }
        assert!(err.is_not_found());
    }

    #[test]
    fn test_named_layout_missing_falls_back() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "hello.html", "Hi {{ Name }}");

        let view = service(temp_dir.path());
        let output = view
            .layout("foo")
            .render("hello", &json!({"Name": "Ada"}))
            .unwrap();
        assert_eq!(output, "Hi Ada");
    }

    #[test]
    fn test_named_layout_used_when_present() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "hello.html", "Hi {{ Name }}");
        create_file(temp_dir.path(), "layouts/admin.html", "[admin]{{ yield() }}");

        let view = service(temp_dir.path());
        let output = view
            .layout("admin")
            .render("hello", &json!({"Name": "Ada"}))
            .unwrap();
        assert_eq!(output, "[admin]Hi Ada");
    }

    #[test]
    fn test_layout_parse_error_is_returned() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "hello.html", "Hi {{ Name }}");
        create_file(temp_dir.path(), "layouts/admin.html", "{% if %}");

        let view = service(temp_dir.path());
        let err = view
            .layout("admin")
            .render("hello", &json!({"Name": "Ada"}))
            .unwrap_err();
        assert!(matches!(err, ViewError::Parse { ref name, .. } if name == "layouts/admin.html"));
    }

    #[test]
    fn test_content_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let view = service(temp_dir.path());

        let err = view.without_layout().render("nope", &json!({})).unwrap_err();
        assert!(matches!(err, ViewError::NotFound { ref name } if name == "nope.html"));
    }

    #[test]
    fn test_missing_field_is_execution_failure() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "broken.html", "{{ Missing.Field }}");

        let view = service(temp_dir.path());
        let err = view
            .without_layout()
            .render("broken", &json!({"Name": "Ada"}))
            .unwrap_err();
        assert!(matches!(err, ViewError::Execute { .. }));
    }

    #[test]
    fn test_view_helper_reuses_outer_data() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "page.html", "<{{ view('name') }}>");
        create_file(temp_dir.path(), "name.html", "{{ Name }}");

        let view = service(temp_dir.path());
        let output = view
            .without_layout()
            .render("page", &json!({"Name": "Ada"}))
            .unwrap();
        assert_eq!(output, "<Ada>");
    }

    #[test]
    fn test_view_helper_uses_first_data_argument() {
        let temp_dir = TempDir::new().unwrap();
        create_file(
            temp_dir.path(),
            "page.html",
            "{{ Name }}|{{ view('name', first, second) }}|{{ Name }}",
        );
        create_file(temp_dir.path(), "name.html", "{{ Name }}");

        let view = service(temp_dir.path());
        let data = json!({
            "Name": "Ada",
            "first": {"Name": "Grace"},
            "second": {"Name": "Linus"},
        });
        let output = view.without_layout().render("page", &data).unwrap();
        assert_eq!(output, "Ada|Grace|Ada");
    }

    #[test]
    fn test_view_helper_failure_degrades_to_empty() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "page.html", "a{{ view('missing') }}b");

        let view = service(temp_dir.path());
        let output = view.without_layout().render("page", &json!({})).unwrap();
        assert_eq!(output, "ab");
    }

    #[test]
    fn test_fragments_see_merged_helpers() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "page.html", "{{ view('inner') }}");
        create_file(temp_dir.path(), "inner.html", "{{ shout('hi') }}");

        let view = service(temp_dir.path());
        let output = view
            .without_layout()
            .funcs(HelperMap::new().with("shout", |s: String| s.to_uppercase()))
            .render("page", &json!({}))
            .unwrap();
        assert_eq!(output, "HI");
    }

    #[test]
    fn test_direct_view_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "card.html", "[{{ title }}]");

        let view = service(temp_dir.path());
        let template = view.without_layout();
        assert_eq!(template.view("card", &json!({"title": "x"})).unwrap(), "[x]");
        assert!(template.view("absent", &json!({})).unwrap_err().is_not_found());
    }

    #[test]
    fn test_funcs_replaces_previous_overrides() {
        let temp_dir = TempDir::new().unwrap();
        create_file(
            temp_dir.path(),
            "page.html",
            "{% if a is defined %}a{% endif %}{% if b is defined %}b{% endif %}",
        );

        let view = service(temp_dir.path());
        let output = view
            .without_layout()
            .funcs(HelperMap::new().with("a", || 1))
            .funcs(HelperMap::new().with("b", || 2))
            .render("page", &json!({}))
            .unwrap();
        assert_eq!(output, "b");
    }

    #[test]
    fn test_self_yield_degrades_to_empty_fragment() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "page.html", "x{{ yield() }}");

        let view = service(temp_dir.path());
        let output = view.without_layout().render("page", &json!({})).unwrap();
        assert_eq!(output, "x".repeat(MAX_FRAGMENT_DEPTH + 1));
    }

    #[test]
    fn test_self_referencing_view_is_cut_off() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "loop.html", "<{{ view('loop') }}>");

        let view = service(temp_dir.path());
        let output = view.without_layout().view("loop", &json!({})).unwrap();
        let depth = MAX_FRAGMENT_DEPTH + 1;
        assert_eq!(output, format!("{}{}", "<".repeat(depth), ">".repeat(depth)));
    }

    #[test]
    fn test_custom_extension_still_escapes() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "hello.tmpl", "Hi {{ Name }}");

        let view = ViewService::with_env(
            Config::new().with_extension(".tmpl"),
            HelperRegistry::new(),
            PathEnv::new(temp_dir.path(), Vec::new()),
            vec![temp_dir.path().to_path_buf()],
        );
        let output = view
            .without_layout()
            .render("hello", &json!({"Name": "<b>x</b>"}))
            .unwrap();
        assert_eq!(output, "Hi &lt;b&gt;x&lt;&#x2f;b&gt;");
    }
}
