//! Translation helpers exposed to templates.
//!
//! | Helper | Call | Result |
//! |---|---|---|
//! | `t` | `{{ t("welcome", user) }}` | lookup + printf |
//! | `tf` | `{{ tf("footer", "Default Footer", year) }}` | lookup with fallback + printf |
//! | `hasTranslation` | `{% if hasTranslation("banner") %}` | key present? |
//!
//! [`template_helpers`] copies the table once and every helper closes over
//! that copy. Later changes to the caller's table are invisible to
//! templates, so pages rendered on different workers always see the same
//! strings.

use crate::i18n::{FormatArg, Translations, sprintf};
use minijinja::value::{Value, ValueKind};
use minijinja::{Environment, Error, ErrorKind};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Signature shared by every template helper.
pub type HelperFn = dyn Fn(&[Value]) -> Result<Value, Error> + Send + Sync;

/// Named template functions, bound into a template set before parsing.
#[derive(Clone, Default)]
pub struct Helpers {
    funcs: BTreeMap<String, Arc<HelperFn>>,
}

impl Helpers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `func` under `name`, replacing any helper of the same name.
    pub fn insert<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    {
        self.funcs.insert(name.into(), Arc::new(func));
    }

    /// Add every helper from `other`; `other` wins on name clashes.
    pub fn extend(&mut self, other: &Helpers) {
        for (name, func) in &other.funcs {
            self.funcs.insert(name.clone(), Arc::clone(func));
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.funcs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    /// Invoke a helper directly, outside any template.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, Error> {
        let func = self.funcs.get(name).ok_or_else(|| {
            Error::new(ErrorKind::UnknownFunction, format!("no helper named {name:?}"))
        })?;
        func(args)
    }

    pub(crate) fn bind(&self, env: &mut Environment<'static>) {
        for (name, func) in &self.funcs {
            let func = Arc::clone(func);
            env.add_function(name.clone(), move |args: minijinja::value::Rest<Value>| {
                func(args.0.as_slice())
            });
        }
    }
}

impl fmt::Debug for Helpers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.funcs.keys()).finish()
    }
}

/// Build the `t`, `tf` and `hasTranslation` helpers over a snapshot of `table`.
pub fn template_helpers(table: &Translations) -> Helpers {
    let snapshot = Arc::new(table.clone());
    let mut helpers = Helpers::new();

    let t = Arc::clone(&snapshot);
    helpers.insert("t", move |args: &[Value]| {
        let (key, rest) = split_string_arg(args, "t", "key")?;
        Ok(Value::from(sprintf(t.lookup(&key, None), &printf_args(rest))))
    });

    let tf = Arc::clone(&snapshot);
    helpers.insert("tf", move |args: &[Value]| {
        let (key, rest) = split_string_arg(args, "tf", "key")?;
        let (fallback, rest) = split_string_arg(rest, "tf", "fallback")?;
        Ok(Value::from(sprintf(
            tf.lookup(&key, Some(fallback.as_str())),
            &printf_args(rest),
        )))
    });

    let has = snapshot;
    helpers.insert("hasTranslation", move |args: &[Value]| {
        let (key, _) = split_string_arg(args, "hasTranslation", "key")?;
        Ok(Value::from(has.contains_key(&key)))
    });

    helpers
}

fn split_string_arg<'a>(
    args: &'a [Value],
    helper: &str,
    what: &str,
) -> Result<(String, &'a [Value]), Error> {
    let (first, rest) = args.split_first().ok_or_else(|| {
        Error::new(
            ErrorKind::MissingArgument,
            format!("{helper}: missing {what} argument"),
        )
    })?;
    let value = match first.as_str() {
        Some(s) => s.to_string(),
        None => first.to_string(),
    };
    Ok((value, rest))
}

/// Convert template values into printf arguments.
fn printf_args(values: &[Value]) -> Vec<FormatArg> {
    values.iter().map(to_format_arg).collect()
}

fn to_format_arg(value: &Value) -> FormatArg {
    match value.kind() {
        ValueKind::Bool => FormatArg::Bool(value.is_true()),
        ValueKind::Number => match serde_json::to_value(value) {
            Ok(serde_json::Value::Number(n)) => n
                .as_i64()
                .map(FormatArg::Int)
                .or_else(|| n.as_f64().map(FormatArg::Float))
                .unwrap_or_else(|| FormatArg::Str(value.to_string())),
            _ => FormatArg::Str(value.to_string()),
        },
        _ => match value.as_str() {
            Some(s) => FormatArg::Str(s.to_string()),
            None => FormatArg::Str(value.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Translations {
        [("hello", "Hello"), ("welcome", "Welcome %s"), ("count", "%d items")]
            .into_iter()
            .collect()
    }

    fn call(helpers: &Helpers, name: &str, args: &[Value]) -> Value {
        helpers.call(name, args).unwrap()
    }

    #[test]
    fn exactly_three_helpers() {
        let helpers = template_helpers(&table());
        assert_eq!(helpers.names().collect::<Vec<_>>(), ["hasTranslation", "t", "tf"]);
    }

    #[test]
    fn t_looks_up_and_formats() {
        let helpers = template_helpers(&table());
        assert_eq!(call(&helpers, "t", &["hello".into()]).as_str(), Some("Hello"));
        assert_eq!(
            call(&helpers, "t", &["welcome".into(), "Ben".into()]).as_str(),
            Some("Welcome Ben")
        );
        assert_eq!(
            call(&helpers, "t", &["count".into(), Value::from(3)]).as_str(),
            Some("3 items")
        );
        assert_eq!(call(&helpers, "t", &["missing".into()]).as_str(), Some("missing"));
    }

    #[test]
    fn tf_uses_fallback() {
        let helpers = template_helpers(&table());
        assert_eq!(
            call(&helpers, "tf", &["missing".into(), "Fallback".into()]).as_str(),
            Some("Fallback")
        );
        assert_eq!(
            call(&helpers, "tf", &["missing".into(), "Built in %s".into(), "test".into()]).as_str(),
            Some("Built in test")
        );
        assert_eq!(
            call(&helpers, "tf", &["hello".into(), "Fallback".into()]).as_str(),
            Some("Hello")
        );
    }

    #[test]
    fn has_translation_checks_presence() {
        let helpers = template_helpers(&table());
        assert!(call(&helpers, "hasTranslation", &["hello".into()]).is_true());
        assert!(!call(&helpers, "hasTranslation", &["nope".into()]).is_true());
    }

    #[test]
    fn helpers_see_a_snapshot() {
        let mut source = table();
        let helpers = template_helpers(&source);
        source.insert("late", "Late value");
        source.insert("hello", "Changed");

        assert!(!call(&helpers, "hasTranslation", &["late".into()]).is_true());
        assert_eq!(call(&helpers, "t", &["late".into()]).as_str(), Some("late"));
        assert_eq!(call(&helpers, "t", &["hello".into()]).as_str(), Some("Hello"));
        assert_eq!(
            call(&helpers, "tf", &["late".into(), "fb".into()]).as_str(),
            Some("fb")
        );
    }

    #[test]
    fn missing_key_argument_is_an_error() {
        let helpers = template_helpers(&table());
        let err = helpers.call("t", &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingArgument);
        let err = helpers.call("tf", &["only-key".into()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingArgument);
    }

    #[test]
    fn unknown_helper() {
        let helpers = Helpers::new();
        assert_eq!(
            helpers.call("t", &[]).unwrap_err().kind(),
            ErrorKind::UnknownFunction
        );
    }

    #[test]
    fn values_convert_to_printf_args() {
        assert_eq!(to_format_arg(&Value::from(7)), FormatArg::Int(7));
        assert_eq!(to_format_arg(&Value::from(2.5)), FormatArg::Float(2.5));
        assert_eq!(to_format_arg(&Value::from(true)), FormatArg::Bool(true));
        assert_eq!(to_format_arg(&Value::from("x")), FormatArg::Str("x".into()));
    }
}
