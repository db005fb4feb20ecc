//! Build configuration.
//!
//! One `foundry.toml` describes one pipeline run. Every key is optional;
//! defaults are shown below:
//!
//! ```toml
//! content_dir = "content"          # pages live in <content_dir>/<lang>/*.md
//! templates = "templates/*.html"   # glob of templates to load
//! i18n_dir = "i18n"                # <i18n_dir>/<lang>.{json,yaml,yml}
//! assets_dir = "assets"            # copied verbatim to <dist_dir>/assets
//! dist_dir = "dist"                # output root
//! languages = ["en"]               # one output tree per language
//! page_template = "page.html"      # template every page is rendered with
//!
//! [processing]
//! workers = 4                      # omit for auto = CPU cores
//! ```
//!
//! Unknown keys are rejected to catch typos early. Relative paths are
//! taken as-is until [`BuildConfig::resolve`] anchors them to a base
//! directory, usually the one holding the config file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Settings for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Root of the markdown sources, one subdirectory per language.
    pub content_dir: PathBuf,
    /// Glob matching every template file.
    pub templates: String,
    /// Directory holding the translation files.
    pub i18n_dir: PathBuf,
    /// Static files copied into the output unchanged.
    pub assets_dir: PathBuf,
    /// Output root.
    pub dist_dir: PathBuf,
    /// Languages to build, in order.
    pub languages: Vec<String>,
    /// Template name (basename) each page is rendered with.
    pub page_template: String,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("content"),
            templates: "templates/*.html".to_string(),
            i18n_dir: PathBuf::from("i18n"),
            assets_dir: PathBuf::from("assets"),
            dist_dir: PathBuf::from("dist"),
            languages: vec!["en".to_string()],
            page_template: "page.html".to_string(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl BuildConfig {
    /// Read, parse and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: BuildConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.languages.is_empty() {
            return Err(ConfigError::Validation(
                "languages must not be empty".into(),
            ));
        }
        if self.languages.iter().any(|lang| lang.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "languages must not contain empty tags".into(),
            ));
        }
        if self.templates.is_empty() {
            return Err(ConfigError::Validation(
                "templates glob must not be empty".into(),
            ));
        }
        if self.page_template.is_empty() {
            return Err(ConfigError::Validation(
                "page_template must not be empty".into(),
            ));
        }
        if self.processing.workers == Some(0) {
            return Err(ConfigError::Validation(
                "processing.workers must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Anchor every relative path (and the template glob) at `base`.
    pub fn resolve(&self, base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        let anchor = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base.join(p)
            }
        };
        let templates = if Path::new(&self.templates).is_absolute() {
            self.templates.clone()
        } else {
            base.join(&self.templates).to_string_lossy().into_owned()
        };

        Self {
            content_dir: anchor(&self.content_dir),
            templates,
            i18n_dir: anchor(&self.i18n_dir),
            assets_dir: anchor(&self.assets_dir),
            dist_dir: anchor(&self.dist_dir),
            ..self.clone()
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of fan-out workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub workers: Option<usize>,
}

/// Resolve the effective worker count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_workers(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.workers.map(|n| n.min(cores)).unwrap_or(cores)
}

/// A fully commented `foundry.toml` with every key at its default.
pub fn stock_config_toml() -> &'static str {
    r#"# Foundry build configuration
# ===========================
# Every key is optional. Relative paths are resolved against the
# directory containing this file.

# Markdown sources: <content_dir>/<lang>/*.md
content_dir = "content"

# Templates to load. Each is addressed by its file name.
templates = "templates/*.html"

# Translation tables: <i18n_dir>/<lang>.json, .yaml or .yml
i18n_dir = "i18n"

# Copied unchanged to <dist_dir>/assets/
assets_dir = "assets"

# Output root. Pages land in <dist_dir>/<lang>/<page>.html
dist_dir = "dist"

# One output tree per language.
languages = ["en"]

# Template used for every page.
page_template = "page.html"

[processing]
# Maximum parallel workers. Omit for auto (= CPU cores).
# workers = 4
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = BuildConfig::default();
        assert_eq!(config.content_dir, PathBuf::from("content"));
        assert_eq!(config.templates, "templates/*.html");
        assert_eq!(config.languages, vec!["en"]);
        assert_eq!(config.page_template, "page.html");
        assert_eq!(config.processing.workers, None);
    }

    #[test]
    fn stock_config_matches_defaults() {
        let config = BuildConfig::from_toml_str(stock_config_toml()).unwrap();
        assert_eq!(config, BuildConfig::default());
    }

    #[test]
    fn parse_partial_config() {
        let config = BuildConfig::from_toml_str(
            r#"
languages = ["en", "es"]
dist_dir = "public"
"#,
        )
        .unwrap();
        assert_eq!(config.languages, vec!["en", "es"]);
        assert_eq!(config.dist_dir, PathBuf::from("public"));
        // Unspecified values keep their defaults
        assert_eq!(config.i18n_dir, PathBuf::from("i18n"));
    }

    #[test]
    fn parse_processing_config() {
        let config = BuildConfig::from_toml_str("[processing]\nworkers = 4\n").unwrap();
        assert_eq!(config.processing.workers, Some(4));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = BuildConfig::from_toml_str("langauges = [\"en\"]\n");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn validation_failures() {
        for toml in [
            "languages = []",
            "languages = [\"en\", \"\"]",
            "templates = \"\"",
            "page_template = \"\"",
            "[processing]\nworkers = 0",
        ] {
            let result = BuildConfig::from_toml_str(toml);
            assert!(
                matches!(result, Err(ConfigError::Validation(_))),
                "expected validation error for {toml:?}"
            );
        }
    }

    #[test]
    fn load_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("foundry.toml");
        fs::write(&path, "page_template = \"article.html\"\n").unwrap();

        let config = BuildConfig::load(&path).unwrap();
        assert_eq!(config.page_template, "article.html");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let result = BuildConfig::load(tmp.path().join("nope.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn resolve_anchors_relative_paths() {
        let base = Path::new("/srv/site");
        let mut config = BuildConfig::default();
        config.assets_dir = PathBuf::from("/opt/shared/assets");

        let resolved = config.resolve(base);

        assert_eq!(resolved.content_dir, base.join("content"));
        assert_eq!(resolved.dist_dir, base.join("dist"));
        assert_eq!(resolved.assets_dir, PathBuf::from("/opt/shared/assets"));
        assert_eq!(resolved.templates, "/srv/site/templates/*.html");
        assert_eq!(resolved.languages, config.languages);
    }

    #[test]
    fn effective_workers_auto() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_workers(&ProcessingConfig { workers: None }), cores);
        assert_eq!(
            effective_workers(&ProcessingConfig {
                workers: Some(99999)
            }),
            cores
        );
    }

    #[test]
    fn effective_workers_user_constrains_down() {
        assert_eq!(effective_workers(&ProcessingConfig { workers: Some(1) }), 1);
    }
}
