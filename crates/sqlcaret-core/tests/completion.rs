mod common;

use common::{request_at_caret, sample_catalog};
use rstest::rstest;
use sqlcaret_core::{
    complete, Candidate, CandidateKind, CompletionError, DatabaseMetadata, Dialect,
    MetadataError, NoMetadata, Scene, MAX_SQL_LENGTH,
};

fn candidates(sql: &str) -> Vec<Candidate> {
    complete(&request_at_caret(sql), &sample_catalog()).unwrap()
}

fn texts_of(candidates: &[Candidate], kind: CandidateKind) -> Vec<String> {
    candidates
        .iter()
        .filter(|c| c.kind == kind)
        .map(|c| c.text.clone())
        .collect()
}

fn has(candidates: &[Candidate], kind: CandidateKind, text: &str) -> bool {
    candidates.iter().any(|c| c.kind == kind && c.text == text)
}

#[test]
fn test_statement_start_offers_statement_keywords() {
    let result = candidates("|");
    assert!(has(&result, CandidateKind::Keyword, "SELECT"));
    assert!(has(&result, CandidateKind::Keyword, "INSERT INTO"));
    assert!(has(&result, CandidateKind::Keyword, "DELETE FROM"));
    assert!(texts_of(&result, CandidateKind::Column).is_empty());
    assert!(texts_of(&result, CandidateKind::Table).is_empty());
}

#[test]
fn test_query_scene_only_offers_queries() {
    let request = request_at_caret("|").with_scene(Scene::Query);
    let result = complete(&request, &NoMetadata).unwrap();
    assert!(has(&result, CandidateKind::Keyword, "SELECT"));
    assert!(!has(&result, CandidateKind::Keyword, "INSERT INTO"));
}

#[test]
fn test_relations_after_from_without_selected_schema() {
    let result = candidates("SELECT * FROM |");
    assert_eq!(texts_of(&result, CandidateKind::Schema), vec!["public", "sales"]);
    assert_eq!(
        texts_of(&result, CandidateKind::Table),
        vec!["\"Audit Log\"", "orders", "sales.invoices", "users"]
    );
    assert_eq!(texts_of(&result, CandidateKind::View), vec!["active_users"]);
    assert_eq!(
        texts_of(&result, CandidateKind::MaterializedView),
        vec!["sales.monthly_totals"]
    );
    assert!(texts_of(&result, CandidateKind::Function).is_empty());
}

#[test]
fn test_relations_in_selected_schema() {
    let request = request_at_caret("SELECT * FROM |").with_schema("sales");
    let result = complete(&request, &sample_catalog()).unwrap();
    assert!(texts_of(&result, CandidateKind::Schema).is_empty());
    assert_eq!(texts_of(&result, CandidateKind::Table), vec!["invoices"]);
    assert_eq!(
        texts_of(&result, CandidateKind::MaterializedView),
        vec!["monthly_totals"]
    );
}

#[test]
fn test_schema_qualified_relations() {
    let result = candidates("SELECT * FROM sales.|");
    assert_eq!(texts_of(&result, CandidateKind::Table), vec!["invoices"]);
    assert!(texts_of(&result, CandidateKind::Schema).is_empty());
    assert!(!has(&result, CandidateKind::Table, "users"));
}

#[test]
fn test_database_qualified_relations_require_default_database() {
    let result = candidates("SELECT * FROM shop.public.|");
    assert!(has(&result, CandidateKind::Table, "users"));
    let result = candidates("SELECT * FROM other.public.|");
    assert!(texts_of(&result, CandidateKind::Table).is_empty());
}

#[test]
fn test_columns_of_qualified_table() {
    let result = candidates("SELECT users.| FROM users");
    let columns: Vec<(&str, &str, &str)> = result
        .iter()
        .map(|c| (c.text.as_str(), c.definition.as_str(), c.comment.as_str()))
        .collect();
    assert_eq!(
        columns,
        vec![
            ("email", "public.users | varchar", ""),
            ("id", "public.users | int4, NOT NULL", "primary key"),
        ]
    );
    assert!(result.iter().all(|c| c.kind == CandidateKind::Column));
}

#[rstest]
#[case::alias_after_caret("SELECT u.| FROM users u")]
#[case::alias_with_as("SELECT u.| FROM users AS u")]
#[case::alias_before_caret("SELECT * FROM users u WHERE u.|")]
#[case::joined("SELECT * FROM orders o JOIN users u ON u.| = o.user_id")]
fn test_columns_through_alias(#[case] sql: &str) {
    let result = candidates(sql);
    assert_eq!(texts_of(&result, CandidateKind::Column), vec!["email", "id"]);
}

#[test]
fn test_renamed_alias_columns() {
    let result = candidates("SELECT u.| FROM users AS u (user_id, mail)");
    assert_eq!(texts_of(&result, CandidateKind::Column), vec!["mail", "user_id"]);
}

#[test]
fn test_unqualified_columns_offer_visible_tables_and_columns() {
    let result = candidates("SELECT * FROM orders o WHERE |");
    assert!(has(&result, CandidateKind::Table, "o"));
    assert_eq!(
        texts_of(&result, CandidateKind::Column),
        vec!["id", "total", "user_id"]
    );
    assert!(has(&result, CandidateKind::Function, "count()"));
    assert!(has(&result, CandidateKind::Keyword, "NOT"));
}

#[test]
fn test_subquery_columns_are_virtual() {
    let result = candidates("SELECT s.| FROM (SELECT id, email AS mail FROM users) s");
    let columns: Vec<(&str, &str)> = result
        .iter()
        .filter(|c| c.kind == CandidateKind::Column)
        .map(|c| (c.text.as_str(), c.definition.as_str()))
        .collect();
    assert_eq!(columns, vec![("id", "s | "), ("mail", "s | ")]);
}

#[test]
fn test_cte_columns_and_names() {
    let sql = "WITH recent (order_id, amount) AS (SELECT id, total FROM orders) SELECT r.| FROM recent r";
    let result = candidates(sql);
    assert_eq!(
        texts_of(&result, CandidateKind::Column),
        vec!["amount", "order_id"]
    );

    let result = candidates("WITH recent AS (SELECT id FROM orders) SELECT * FROM |");
    assert!(has(&result, CandidateKind::Table, "recent"));
    assert!(has(&result, CandidateKind::Table, "orders"));
}

#[test]
fn test_select_aliases_in_order_by_only() {
    let result = candidates("SELECT total AS amount FROM orders ORDER BY |");
    let alias = result
        .iter()
        .find(|c| c.text == "amount")
        .expect("alias offered in ORDER BY");
    assert_eq!(alias.definition, "alias");

    let result = candidates("SELECT total AS amount FROM orders WHERE |");
    assert!(!result.iter().any(|c| c.definition == "alias"));
}

#[test]
fn test_caret_in_later_statement() {
    let result = candidates("SELECT 1;\nSELECT * FROM users;\nSELECT * FROM orders WHERE |");
    assert_eq!(
        texts_of(&result, CandidateKind::Column),
        vec!["id", "total", "user_id"]
    );
}

#[test]
fn test_missing_terminator_retries_from_line_leading_select() {
    let result = candidates("SELECT 1\nSELECT * FROM |");
    assert!(has(&result, CandidateKind::Table, "users"));
}

#[test]
fn test_names_inside_quoted_identifier_are_unquoted() {
    let result = candidates("SELECT * FROM \"Aud|it\"");
    assert!(has(&result, CandidateKind::Table, "Audit Log"));
    assert!(!has(&result, CandidateKind::Table, "\"Audit Log\""));
}

#[test]
fn test_unclosed_literal_elsewhere_does_not_block_completion() {
    let result = candidates("SELECT * FROM users u WHERE u.|;\nSELECT 'never closed");
    assert_eq!(texts_of(&result, CandidateKind::Column), vec!["email", "id"]);
}

#[test]
fn test_unknown_database_still_offers_keywords() {
    let request = request_at_caret("SELECT * FROM users WHERE |").with_database("missing");
    let result = complete(&request, &sample_catalog()).unwrap();
    assert!(has(&result, CandidateKind::Table, "users"));
    assert!(texts_of(&result, CandidateKind::Column).is_empty());
    assert!(has(&result, CandidateKind::Keyword, "NOT"));
}

#[test]
fn test_provider_failure_fails_request() {
    let failing = |name: &str| -> Result<Option<DatabaseMetadata>, MetadataError> {
        Err(MetadataError::new(name, "timed out"))
    };
    let err = complete(&request_at_caret("SELECT * FROM |"), &failing).unwrap_err();
    assert!(matches!(err, CompletionError::Metadata(ref e) if e.database == "shop"));
}

#[test]
fn test_oversized_input_is_rejected() {
    let sql = format!("SELECT {}|", "x".repeat(MAX_SQL_LENGTH));
    let err = complete(&request_at_caret(&sql), &NoMetadata).unwrap_err();
    assert!(matches!(err, CompletionError::InputTooLarge { .. }));
}

#[test]
fn test_results_are_sorted_unique_and_repeatable() {
    let sql = "SELECT * FROM users u JOIN orders o ON o.user_id = u.id WHERE |";
    let first = candidates(sql);
    let mut sorted = first.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(first, sorted);
    assert_eq!(first, candidates(sql));
}

#[test]
fn test_redshift_completes_like_postgres() {
    let request = request_at_caret("SELECT * FROM |").with_dialect(Dialect::Redshift);
    let result = complete(&request, &sample_catalog()).unwrap();
    assert!(has(&result, CandidateKind::Table, "users"));
}
