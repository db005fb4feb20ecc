//! Template loading and rendering on top of minijinja.
//!
//! ## Template Set
//!
//! [`load_templates`] expands a filesystem glob and parses every match
//! into one [`TemplateSet`]. Templates are named by file basename, so
//! `templates/page.html` is rendered as `"page.html"` and may be
//! `{% extends %}`-ed or `{% include %}`-d by that name from its
//! siblings. Helpers (see [`template_helpers`]) are bound before any
//! template is parsed.
//!
//! ## Escaping
//!
//! Names ending in `.html`, `.htm` or `.xml` autoescape their output.
//! Values that already hold markup (rendered markdown) must be passed as
//! [`minijinja::Value::from_safe_string`].
//!
//! ## Output
//!
//! [`render_template`] returns exactly the bytes the engine produced,
//! including a template's trailing newline.

mod glob;
mod helpers;

pub use helpers::{HelperFn, Helpers, template_helpers};

use crate::error::{FoundryError, Result};
use minijinja::Environment;
use serde::Serialize;
use std::fmt;
use std::fs;

/// A parsed, immutable collection of named templates.
///
/// Safe to share across fan-out workers by reference.
pub struct TemplateSet {
    env: Environment<'static>,
    names: Vec<String>,
}

impl TemplateSet {
    /// Template names in load order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

impl fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateSet")
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

/// Parse every file matching `glob` into a template set.
pub fn load_templates(glob: &str, helpers: Option<&Helpers>) -> Result<TemplateSet> {
    if glob.is_empty() {
        return Err(FoundryError::invalid("template glob is empty"));
    }
    let paths = glob::expand(glob)?;
    if paths.is_empty() {
        return Err(FoundryError::NotFound(format!(
            "no templates matched glob {glob:?}"
        )));
    }

    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    if let Some(helpers) = helpers {
        helpers.bind(&mut env);
    }

    let mut names = Vec::with_capacity(paths.len());
    for path in &paths {
        let source = fs::read_to_string(path)
            .map_err(|e| FoundryError::io(format!("read template {}", path.display()), e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        env.add_template_owned(name.clone(), source)
            .map_err(|e| FoundryError::parse("parse templates", format!("{e:#}")))?;
        names.push(name);
    }

    tracing::debug!(glob, count = names.len(), "loaded templates");
    Ok(TemplateSet { env, names })
}

/// Execute template `name` with `data` as its context.
pub fn render_template(set: &TemplateSet, name: &str, data: impl Serialize) -> Result<Vec<u8>> {
    if name.is_empty() {
        return Err(FoundryError::invalid("template name is empty"));
    }
    let context = format!("execute template {name:?}");
    let template = set
        .env
        .get_template(name)
        .map_err(|e| FoundryError::render(context.as_str(), format!("{e:#}")))?;
    let output = template
        .render(data)
        .map_err(|e| FoundryError::render(context.as_str(), format!("{e:#}")))?;
    Ok(output.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::i18n::Translations;
    use minijinja::context;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    fn glob_in(dir: &Path, pattern: &str) -> String {
        format!("{}/{pattern}", dir.display())
    }

    #[test]
    fn renders_with_translation_helper() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "greet.txt", "Hello {{ t('name') }}!");
        let table: Translations = [("name", "World")].into_iter().collect();
        let helpers = template_helpers(&table);

        let set = load_templates(&glob_in(tmp.path(), "*.txt"), Some(&helpers)).unwrap();
        let out = render_template(&set, "greet.txt", context! {}).unwrap();

        assert_eq!(out, b"Hello World!");
    }

    #[test]
    fn helper_arguments_are_formatted() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "page.txt",
            "{{ t('welcome', user) }} / {{ tf('footer', 'Built %d', 2024) }}\
             {% if hasTranslation('banner') %} banner{% endif %}",
        );
        let table: Translations = [("welcome", "Welcome %s")].into_iter().collect();
        let helpers = template_helpers(&table);

        let set = load_templates(&glob_in(tmp.path(), "*.txt"), Some(&helpers)).unwrap();
        let out = render_template(&set, "page.txt", context! { user => "Ben" }).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "Welcome Ben / Built 2024");
    }

    #[test]
    fn templates_named_by_basename_and_can_include_each_other() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "base.html", "<main>{% block body %}{% endblock %}</main>\n");
        write(
            tmp.path(),
            "page.html",
            "{% extends 'base.html' %}{% block body %}{{ title }}{% endblock %}",
        );

        let set = load_templates(&glob_in(tmp.path(), "*.html"), None).unwrap();
        assert_eq!(set.names(), ["base.html", "page.html"]);

        let out = render_template(&set, "page.html", context! { title => "Hi" }).unwrap();
        assert_eq!(out, b"<main>Hi</main>\n");
    }

    #[test]
    fn keeps_trailing_newline() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.txt", "line\n");
        let set = load_templates(&glob_in(tmp.path(), "*.txt"), None).unwrap();
        assert_eq!(render_template(&set, "a.txt", context! {}).unwrap(), b"line\n");
    }

    #[test]
    fn html_autoescapes_unless_safe() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "p.html", "{{ raw }}|{{ safe }}");
        let set = load_templates(&glob_in(tmp.path(), "*.html"), None).unwrap();

        let out = render_template(
            &set,
            "p.html",
            context! {
                raw => "<b>",
                safe => minijinja::Value::from_safe_string("<b>".into()),
            },
        )
        .unwrap();

        assert_eq!(out, b"&lt;b&gt;|<b>");
    }

    #[test]
    fn empty_glob_is_invalid() {
        assert_eq!(
            load_templates("", None).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn no_matches_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = load_templates(&glob_in(tmp.path(), "*.html"), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn malformed_glob_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_templates(&glob_in(tmp.path(), "[.html"), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn template_syntax_error_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "bad.html", "{% if %}");
        let err = load_templates(&glob_in(tmp.path(), "*.html"), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.to_string().starts_with("foundry: parse templates: "));
    }

    #[test]
    fn unknown_helper_fails_at_render() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.txt", "{{ t('x') }}");
        let set = load_templates(&glob_in(tmp.path(), "*.txt"), None).unwrap();
        let err = render_template(&set, "a.txt", context! {}).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Render);
    }

    #[test]
    fn render_rejects_empty_and_unknown_names() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.txt", "x");
        let set = load_templates(&glob_in(tmp.path(), "*.txt"), None).unwrap();

        assert_eq!(
            render_template(&set, "", context! {}).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        let err = render_template(&set, "missing.txt", context! {}).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Render);
        assert!(err.to_string().contains("execute template \"missing.txt\""));
    }
}
