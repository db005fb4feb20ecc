//! Filesystem glob expansion for template discovery.
//!
//! The pattern is split into a literal base directory and a wildcard tail:
//!
//! ```text
//! site/templates/*.html      → walk site/templates (depth 1)
//! site/templates/**/*.html   → walk site/templates (any depth)
//! *.html                     → walk .              (depth 1)
//! ```
//!
//! Only the base directory is walked and every file below it is matched
//! against the full pattern. `*` and `?` never cross a `/`. Matches are
//! returned sorted.

use crate::error::{FoundryError, Result};
use globset::GlobBuilder;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const META: [char; 4] = ['*', '?', '[', '{'];

pub(crate) fn expand(pattern: &str) -> Result<Vec<PathBuf>> {
    let matcher = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| FoundryError::parse("invalid template glob", e))?
        .compile_matcher();

    let (base, depth) = split_pattern(pattern);
    if depth == Some(0) {
        // No wildcards: the pattern names a single file.
        let path = PathBuf::from(pattern);
        return Ok(if path.is_file() { vec![path] } else { Vec::new() });
    }

    let implicit_base = base.as_os_str().is_empty();
    let root = if implicit_base {
        PathBuf::from(".")
    } else {
        base
    };

    let mut walker = WalkDir::new(&root).min_depth(1).follow_links(true);
    if let Some(depth) = depth {
        walker = walker.max_depth(depth);
    }

    let mut matches: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let path = entry.into_path();
            if implicit_base {
                path.strip_prefix(".").map(Path::to_path_buf).unwrap_or(path)
            } else {
                path
            }
        })
        .filter(|path| matcher.is_match(path))
        .collect();
    matches.sort();
    Ok(matches)
}

/// Literal directory prefix of `pattern`, and how many components below it
/// the walk must reach (`None` when `**` allows any depth).
fn split_pattern(pattern: &str) -> (PathBuf, Option<usize>) {
    let mut base = PathBuf::new();
    let mut tail = 0;
    let mut recursive = false;
    let mut in_tail = false;

    for component in Path::new(pattern).components() {
        let text = component.as_os_str().to_string_lossy();
        if !in_tail && text.contains(META) {
            in_tail = true;
        }
        if in_tail {
            tail += 1;
            recursive |= text.contains("**");
        } else {
            base.push(component);
        }
    }

    if !in_tail {
        return (base, Some(0));
    }
    (base, if recursive { None } else { Some(tail) })
}
