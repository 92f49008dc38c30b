//! Input predicates shared by the route handlers.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z0-9_\-\.]+)@([a-zA-Z0-9_\-\.]+)\.([a-zA-Z]{2,5})$")
        .expect("email pattern compiles")
});

const PASSWORD_SPECIALS: &str = "@$!%*?&";

/// True if the parameter is present and non-empty.
pub fn is_string_provided(param: Option<&str>) -> bool {
    param.is_some_and(|p| !p.is_empty())
}

/// The parameter itself when [`is_string_provided`] holds.
pub fn required(param: Option<&str>) -> Option<&str> {
    param.filter(|p| !p.is_empty())
}

/// At least six characters drawn from letters, digits and `@$!%*?&`, with at
/// least one lowercase letter, one uppercase letter, one digit and one special.
pub fn is_valid_password(param: &str) -> bool {
    let allowed = param
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c));

    allowed
        && param.chars().count() >= 6
        && param.chars().any(|c| c.is_ascii_lowercase())
        && param.chars().any(|c| c.is_ascii_uppercase())
        && param.chars().any(|c| c.is_ascii_digit())
        && param.chars().any(|c| PASSWORD_SPECIALS.contains(c))
}

pub fn is_valid_email(param: &str) -> bool {
    EMAIL_RE.is_match(param)
}

/// Emails are compared case-insensitively everywhere.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A JSON value that is a non-empty string or a number.
pub fn is_value_provided(value: Option<&Value>) -> bool {
    match value {
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(_)) => true,
        _ => false,
    }
}

/// Integer carried by a JSON number or a numeric string.
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
