//! Custom validators for API request validation

use once_cell::sync::Lazy;
use regex::Regex;

/// App names are upper-snake-case identifiers (`GOOGLE`, `AGENT_SECRETS_MANAGER`).
pub static APP_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("invalid app name regex"));

/// Function names are `APP__METHOD`, each half following the app-name
/// convention (§4.8: the connector registry and REST executor both key off
/// this exact shape).
pub static FUNCTION_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*__[A-Z][A-Z0-9_]*$").expect("invalid function name regex"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_name_regex_accepts_upper_snake_case() {
        assert!(APP_NAME_REGEX.is_match("GOOGLE"));
        assert!(APP_NAME_REGEX.is_match("AGENT_SECRETS_MANAGER"));
    }

    #[test]
    fn app_name_regex_rejects_lowercase_and_leading_digit() {
        assert!(!APP_NAME_REGEX.is_match("google"));
        assert!(!APP_NAME_REGEX.is_match("1GOOGLE"));
        assert!(!APP_NAME_REGEX.is_match(""));
    }

    #[test]
    fn function_name_regex_accepts_app_dunder_method() {
        assert!(FUNCTION_NAME_REGEX.is_match("GOOGLE__SEND_EMAIL"));
        assert!(FUNCTION_NAME_REGEX.is_match("AGENT_SECRETS_MANAGER__CREATE_SECRET"));
    }

    #[test]
    fn function_name_regex_rejects_missing_separator() {
        assert!(!FUNCTION_NAME_REGEX.is_match("GOOGLE_SEND_EMAIL"));
        assert!(!FUNCTION_NAME_REGEX.is_match("GOOGLE__"));
    }
}
