//! The full build pipeline: markdown pages and static assets into a
//! per-language output tree.
//!
//! ```text
//! content/en/index.md ─┐
//! content/en/about.md ─┼─ markdown ─▶ Page ─▶ page.html ─▶ dist/en/index.html
//!                      │                      (t / tf)      dist/en/about.html
//! i18n/en.json ────────┘
//! assets/css/site.css ──────────── copy ─────────────────▶ dist/assets/css/site.css
//! ```
//!
//! Each language is one step (`build en`, `build es`, …). Within a step the
//! translation table, helpers and templates are loaded once, every page is
//! converted to HTML up front, then rendering and writing fan out across
//! workers. Assets are copied in a final `copy assets` step.
//!
//! Every output goes through [`write_if_changed`], so a rebuild over
//! unchanged inputs touches nothing and the returned [`BuildReport`] counts
//! every output as unchanged.

use crate::config::{BuildConfig, effective_workers};
use crate::error::{FoundryError, IoContext, Result};
use crate::fileio::{WriteOutcome, copy_file_if_changed, write_if_changed};
use crate::i18n::load_translations;
use crate::markdown::{extract_title, markdown_to_html};
use crate::parallel::for_each_parallel;
use crate::step::with_step;
use crate::templating::{TemplateSet, load_templates, render_template, template_helpers};
use minijinja::{Value, context};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One markdown source, converted and ready to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    /// Text of the first `# ` heading, or the file stem when there is none.
    pub title: String,
    pub body_html: String,
    pub lang: String,
    /// Output path relative to the language directory (`about.html`).
    pub url: String,
    pub source: PathBuf,
}

/// Tally of outputs produced by one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub written: usize,
    pub unchanged: usize,
}

impl BuildReport {
    pub fn record(&mut self, outcome: WriteOutcome) {
        match outcome {
            WriteOutcome::Written => self.written += 1,
            WriteOutcome::Unchanged => self.unchanged += 1,
        }
    }

    pub fn merge(&mut self, other: BuildReport) {
        self.written += other.written;
        self.unchanged += other.unchanged;
    }

    pub fn total(&self) -> usize {
        self.written + self.unchanged
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} written, {} unchanged ({} total)",
            self.written,
            self.unchanged,
            self.total()
        )
    }
}

/// Build every language and copy assets.
///
/// A page or asset that fails to render, write or copy inside the fan-out
/// is returned as [`FoundryError::ActionPanic`] carrying the original error
/// text. The default panic hook still prints a `foundry-worker-N panicked`
/// line to stderr for each failure; that output is expected.
pub fn build_site(config: &BuildConfig) -> Result<BuildReport> {
    with_step("build site", || {
        let workers = effective_workers(&config.processing);
        let mut report = BuildReport::default();

        for lang in &config.languages {
            let step = format!("build {lang}");
            report.merge(with_step(&step, || build_language(config, lang, workers))?);
        }
        report.merge(with_step("copy assets", || copy_assets(config, workers))?);

        tracing::debug!(%report, "site built");
        Ok(report)
    })
}

fn build_language(config: &BuildConfig, lang: &str, workers: usize) -> Result<BuildReport> {
    let table = load_translations(&config.i18n_dir, lang)?;
    let helpers = template_helpers(&table);
    let templates = load_templates(&config.templates, Some(&helpers))?;
    let pages = load_pages(&config.content_dir.join(lang), lang)?;

    let out_dir = config.dist_dir.join(lang);
    let report = Mutex::new(BuildReport::default());
    for_each_parallel(&pages, workers, |page| {
        match publish_page(&templates, &config.page_template, page, &out_dir) {
            Ok(outcome) => report.lock().record(outcome),
            Err(e) => std::panic::panic_any(e),
        }
    })?;
    Ok(report.into_inner())
}

/// Read and convert every `*.md` directly inside `dir`, sorted by path.
///
/// A language without a content directory has no pages.
pub fn load_pages(dir: &Path, lang: &str) -> Result<Vec<Page>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(lang, dir = %dir.display(), "no content directory");
            return Ok(Vec::new());
        }
        Err(e) => return Err(FoundryError::io("read content dir", e)),
    };

    let mut sources = Vec::new();
    for entry in entries {
        let path = entry.io_context("read content dir")?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "md") {
            sources.push(path);
        }
    }
    sources.sort();

    sources
        .into_iter()
        .map(|source| load_page(source, lang))
        .collect()
}

fn load_page(source: PathBuf, lang: &str) -> Result<Page> {
    let raw = fs::read(&source)
        .map_err(|e| FoundryError::io(format!("read page {}", source.display()), e))?;
    let body_html = String::from_utf8_lossy(&markdown_to_html(&raw)?).into_owned();

    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let title = extract_title(&String::from_utf8_lossy(&raw)).unwrap_or_else(|| stem.clone());

    Ok(Page {
        title,
        body_html,
        lang: lang.to_string(),
        url: format!("{stem}.html"),
        source,
    })
}

fn publish_page(
    templates: &TemplateSet,
    template: &str,
    page: &Page,
    out_dir: &Path,
) -> Result<WriteOutcome> {
    let html = render_template(
        templates,
        template,
        context! {
            page => page,
            title => &page.title,
            lang => &page.lang,
            url => &page.url,
            body => Value::from_safe_string(page.body_html.clone()),
        },
    )?;
    write_if_changed(out_dir.join(&page.url), html)
}

fn copy_assets(config: &BuildConfig, workers: usize) -> Result<BuildReport> {
    let src_root = &config.assets_dir;
    if !src_root.is_dir() {
        tracing::debug!(dir = %src_root.display(), "no assets directory, skipping");
        return Ok(BuildReport::default());
    }
    let dst_root = config.dist_dir.join("assets");

    let mut jobs = Vec::new();
    for entry in WalkDir::new(src_root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| FoundryError::io("walk assets", io::Error::from(e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(src_root)
            .map_err(|e| FoundryError::io("walk assets", io::Error::other(e)))?;
        jobs.push((entry.path().to_path_buf(), dst_root.join(rel)));
    }

    let report = Mutex::new(BuildReport::default());
    for_each_parallel(&jobs, workers, |(src, dst)| {
        match copy_file_if_changed(src, dst) {
            Ok(outcome) => report.lock().record(outcome),
            Err(e) => std::panic::panic_any(e),
        }
    })?;
    Ok(report.into_inner())
}
