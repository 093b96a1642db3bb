//! Built-in functions offered where a function name may appear.

use std::sync::LazyLock;

use crate::types::{Candidate, CandidateKind};

const BUILTIN_FUNCTIONS: &[&str] = &[
    "abs",
    "approximate_count_distinct",
    "avg",
    "cast",
    "ceil",
    "coalesce",
    "convert",
    "count",
    "current_date",
    "current_timestamp",
    "date_part",
    "dense_rank",
    "extract",
    "floor",
    "lag",
    "lead",
    "length",
    "listagg",
    "lower",
    "ltrim",
    "max",
    "median",
    "min",
    "nullif",
    "percentile_cont",
    "rank",
    "round",
    "row_number",
    "rtrim",
    "substring",
    "sum",
    "trim",
    "upper",
];

/// Functions written without parentheses.
const KEYWORD_STYLE_FUNCTIONS: &[&str] = &["current_date", "current_timestamp"];

static FUNCTION_CANDIDATES: LazyLock<Vec<Candidate>> = LazyLock::new(|| {
    BUILTIN_FUNCTIONS
        .iter()
        .map(|name| {
            let text = if KEYWORD_STYLE_FUNCTIONS.contains(name) {
                name.to_string()
            } else {
                format!("{name}()")
            };
            Candidate::new(CandidateKind::Function, text)
        })
        .collect()
});

pub(crate) fn function_candidates() -> Vec<Candidate> {
    FUNCTION_CANDIDATES.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_candidates() {
        let candidates = function_candidates();
        assert_eq!(candidates.len(), BUILTIN_FUNCTIONS.len());
        assert!(candidates.iter().any(|c| c.text == "count()"));
        assert!(candidates.iter().any(|c| c.text == "current_date"));
        assert!(candidates.iter().all(|c| c.kind == CandidateKind::Function));
    }
}
