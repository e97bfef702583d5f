//! Small text helpers for config values, URLs and error bodies.

const ERROR_BODY_LIMIT: usize = 180;

/// Trimmed value, or `None` when absent or blank.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

fn is_http_url(value: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| value.starts_with(scheme))
}

/// Base URL without surrounding whitespace or trailing `/`. Only http(s) is accepted.
pub fn normalize_base_url(raw: &str) -> Option<String> {
    let base = raw.trim().trim_end_matches('/');
    is_http_url(base).then(|| base.to_string())
}

/// Response body shortened for inclusion in an error message.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(ERROR_BODY_LIMIT).collect()
}
