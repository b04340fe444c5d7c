//! Placeholder substitution.
//!
//! `:name` tokens are replaced by escaped, double-quoted literals. The SQL
//! text is scanned once, so substituted values are never scanned again.

use crate::error::{DbError, DbResult};
use crate::models::{ParamValue, Placeholders, QueryParam};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-zA-Z_]+$").expect("valid regex"));

static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":([0-9a-zA-Z_]+)").expect("valid regex"));

/// Check that a placeholder name is usable.
pub fn validate_name(name: &str) -> DbResult<()> {
    if NAME_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(DbError::invalid_argument(format!(
            "Invalid placeholder name: '{name}'"
        )))
    }
}

/// Replace every bound `:name` token in `sql`.
///
/// All names are validated before anything is replaced. Tokens without a
/// binding are left as they are.
pub fn substitute<F>(sql: &str, placeholders: &Placeholders, escape: F) -> DbResult<String>
where
    F: Fn(&str) -> String,
{
    if placeholders.is_empty() {
        return Ok(sql.to_string());
    }
    for (name, _) in placeholders.iter() {
        validate_name(name)?;
    }

    let substituted = TOKEN_REGEX.replace_all(sql, |caps: &Captures| {
        match placeholders.get(&caps[1]) {
            Some(value) => render_value(value, &escape),
            None => caps[0].to_string(),
        }
    });
    Ok(substituted.into_owned())
}

fn render_value<F>(value: &ParamValue, escape: &F) -> String
where
    F: Fn(&str) -> String,
{
    match value {
        ParamValue::Scalar(param) => render_scalar(param, escape),
        // An empty list matches nothing
        ParamValue::List(items) if items.is_empty() => "NULL".to_string(),
        ParamValue::List(items) => items
            .iter()
            .map(|param| render_scalar(param, escape))
            .collect::<Vec<_>>()
            .join(","),
    }
}

fn render_scalar<F>(param: &QueryParam, escape: &F) -> String
where
    F: Fn(&str) -> String,
{
    if param.is_null() {
        return "NULL".to_string();
    }
    let text = param.as_text().unwrap_or_default();
    format!("\"{}\"", escape(&text))
}
