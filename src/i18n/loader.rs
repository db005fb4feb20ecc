//! Locating and parsing translation files.
//!
//! For language `es` in `i18n/` the candidates are probed in order:
//!
//! ```text
//! i18n/es.json   ← parsed as JSON
//! i18n/es.yaml   ← parsed as YAML
//! i18n/es.yml    ← parsed as YAML
//! ```
//!
//! The first file that exists wins; the others are never read. A language
//! with no file at all gets an empty table, not an error.

use super::Translations;
use crate::error::{FoundryError, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Probe order for `<lang>.<ext>`.
pub const TRANSLATION_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// Load the translation table for `lang` from `dir`.
///
/// An empty `dir` means the current directory.
pub fn load_translations(dir: impl AsRef<Path>, lang: &str) -> Result<Translations> {
    if lang.is_empty() {
        return Err(FoundryError::invalid("lang is empty"));
    }
    let dir = dir.as_ref();
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };

    let Some((path, data)) = read_first_candidate(dir, lang)? else {
        tracing::debug!(lang, dir = %dir.display(), "no translation file, using empty table");
        return Ok(Translations::default());
    };

    let table = parse(&path, &data)?;
    tracing::debug!(lang, path = %path.display(), keys = table.len(), "loaded translations");
    Ok(table)
}

fn read_first_candidate(dir: &Path, lang: &str) -> Result<Option<(PathBuf, Vec<u8>)>> {
    for ext in TRANSLATION_EXTENSIONS {
        let candidate = dir.join(format!("{lang}.{ext}"));
        match fs::read(&candidate) {
            Ok(data) => return Ok(Some((candidate, data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(FoundryError::io("load translations", e)),
        }
    }
    Ok(None)
}

fn parse(path: &Path, data: &[u8]) -> Result<Translations> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("yaml" | "yml") => {
            // An empty YAML document is an empty table, not a parse error.
            if data.iter().all(u8::is_ascii_whitespace) {
                return Ok(Translations::default());
            }
            serde_yaml::from_slice(data)
                .map_err(|e| FoundryError::parse("parse translations yaml", e))
        }
        _ => serde_json::from_slice(data)
            .map_err(|e| FoundryError::parse("parse translations json", e)),
    }
}
