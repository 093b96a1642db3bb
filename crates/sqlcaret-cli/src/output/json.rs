//! JSON output formatting.

use serde::Serialize;

/// Format any result as JSON.
///
/// If `compact` is true, outputs minified JSON without whitespace.
pub fn format_json<T: Serialize + ?Sized>(value: &T, compact: bool) -> serde_json::Result<String> {
    if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlcaret_core::{complete, CompletionRequest, NoMetadata};

    #[test]
    fn test_json_pretty_and_compact() {
        let candidates = complete(&CompletionRequest::new("SEL", 1, 3), &NoMetadata).unwrap();

        let pretty = format_json(&candidates, false).unwrap();
        assert!(pretty.contains('\n'));
        assert!(pretty.contains("\"kind\": \"keyword\""));

        let compact = format_json(&candidates, true).unwrap();
        assert!(!compact.contains('\n'));
    }
}
