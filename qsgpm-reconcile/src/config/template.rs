//! Environment placeholders inside configuration files.
//!
//! Supported forms:
//! - `{{ env "NAME" }}` expands to the variable, or an empty string when unset
//! - `{{ env "NAME" "fallback" }}` expands to the variable, or `fallback`
//! - `{{ must_env "NAME" }}` expands to the variable and fails when unset

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{QsgpmError, QsgpmResult};

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        #[allow(clippy::unwrap_used)]
        Regex::new(r#"\{\{\s*(env|must_env)\s+"([^"]*)"(?:\s+"([^"]*)")?\s*\}\}"#).unwrap()
    })
}

/// Expand placeholders using `lookup` to resolve variable names.
pub(crate) fn expand_with<F>(source: &str, lookup: F) -> QsgpmResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut expanded = String::with_capacity(source.len());
    let mut last = 0;
    for caps in placeholder_pattern().captures_iter(source) {
        let (Some(whole), Some(func), Some(name)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        expanded.push_str(&source[last..whole.start()]);
        let value = match (lookup(name.as_str()), func.as_str()) {
            (Some(value), _) => value,
            (None, "must_env") => {
                return Err(QsgpmError::config(format!(
                    "environment variable {} is not defined",
                    name.as_str()
                )))
            }
            (None, _) => caps
                .get(3)
                .map(|fallback| fallback.as_str().to_string())
                .unwrap_or_default(),
        };
        expanded.push_str(&value);
        last = whole.end();
    }
    expanded.push_str(&source[last..]);
    Ok(expanded)
}

/// Expand placeholders from the process environment.
pub(crate) fn expand_env(source: &str) -> QsgpmResult<String> {
    expand_with(source, |name| std::env::var(name).ok())
}
