//! Translation tables: key → localized string.
//!
//! | Piece | Role |
//! |---|---|
//! | [`Translations`] | In-memory table with lookup, fallback and printf helpers |
//! | [`load_translations`] | Finds `<lang>.json`, `<lang>.yaml` or `<lang>.yml` and parses it |
//! | [`printf`] | `%s`/`%d`/… substitution used by [`Translations::format`] |
//!
//! Lookups never fail. A missing key renders as the key itself, so an
//! untranslated string shows up in the page as a visible tag
//! (`nav.about`) instead of disappearing.

mod loader;
pub mod printf;

pub use loader::{TRANSLATION_EXTENSIONS, load_translations};
pub use printf::{FormatArg, sprintf};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A flat map of translation keys to localized strings.
///
/// `Clone` produces an independent copy; mutating it never affects the
/// source. `Default` is the empty table, which is also what loading a
/// language with no translation file yields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Translations(HashMap<String, String>);

impl Translations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `key`, else `fallback`, else `key` itself.
    pub fn lookup<'a>(&'a self, key: &'a str, fallback: Option<&'a str>) -> &'a str {
        match self.0.get(key) {
            Some(value) => value,
            None => fallback.unwrap_or(key),
        }
    }

    /// Look up `key` and substitute `args` into it.
    ///
    /// A missing key is used as the pattern itself. With no arguments the
    /// value is returned as-is, percent signs included.
    pub fn format(&self, key: &str, args: &[FormatArg]) -> String {
        sprintf(self.lookup(key, None), args)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<HashMap<String, String>> for Translations {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Translations {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
