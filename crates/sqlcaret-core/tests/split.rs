use rstest::rstest;
use sqlcaret_core::{split_sql, Dialect, SplitError};

fn texts(sql: &str, dialect: Dialect) -> Vec<String> {
    split_sql(sql, dialect)
        .unwrap()
        .into_iter()
        .map(|s| s.text)
        .collect()
}

#[rstest]
#[case::plain("SELECT 1; SELECT 2;", &["SELECT 1;", " SELECT 2;"])]
#[case::unterminated_tail("SELECT 1;\nSELECT 2", &["SELECT 1;", "\nSELECT 2"])]
#[case::trailing_comment("SELECT 1; -- bye", &["SELECT 1; -- bye"])]
#[case::semicolon_in_string("SELECT ';'; SELECT 2;", &["SELECT ';';", " SELECT 2;"])]
#[case::semicolon_in_comment("SELECT 1 /* ; */; SELECT 2;", &["SELECT 1 /* ; */;", " SELECT 2;"])]
#[case::block(
    "BEGIN SELECT 1; SELECT 2; END; SELECT 3;",
    &["BEGIN SELECT 1; SELECT 2; END;", " SELECT 3;"]
)]
#[case::transaction(
    "BEGIN; UPDATE t SET a = 1; COMMIT;",
    &["BEGIN;", " UPDATE t SET a = 1;", " COMMIT;"]
)]
#[case::case_end_and_in_block(
    "BEGIN SELECT CASE WHEN a THEN 1 END AND b; END; SELECT 2;",
    &["BEGIN SELECT CASE WHEN a THEN 1 END AND b; END;", " SELECT 2;"]
)]
#[case::end_and_chain(
    "BEGIN; SELECT 1; END AND CHAIN;",
    &["BEGIN;", " SELECT 1;", " END AND CHAIN;"]
)]
fn test_split_texts(#[case] sql: &str, #[case] expected: &[&str]) {
    for dialect in Dialect::all() {
        assert_eq!(texts(sql, *dialect), expected, "dialect {dialect:?}");
    }
}

#[rstest]
#[case::string("SELECT 1; SELECT 'abc", " SELECT 'abc")]
#[case::dollar_string("SELECT 1; SELECT $$abc", " SELECT $$abc")]
#[case::quoted_identifier("SELECT 1; SELECT \"ab", " SELECT \"ab")]
#[case::comment("SELECT 1; /* open", " /* open")]
fn test_unterminated_literal_stays_in_last_statement(#[case] sql: &str, #[case] last: &str) {
    assert_eq!(texts(sql, Dialect::Postgres), vec!["SELECT 1;", last]);
}

#[test]
fn test_split_pieces_rebuild_input() {
    let sql = "-- head\nSELECT 1;\n\nBEGIN\n  IF x THEN SELECT 2; END IF;\nEND;\nSELECT 3";
    let statements = split_sql(sql, Dialect::Postgres).unwrap();
    let joined: String = statements.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(joined, sql);
    for statement in &statements {
        assert_eq!(&sql[statement.span.start..statement.span.end], statement.text);
    }
}

#[test]
fn test_first_statement_position_skips_comments() {
    let statements = split_sql("SELECT 1;\n-- note\n  SELECT 2;", Dialect::Postgres).unwrap();
    let second = &statements[1];
    assert_eq!(second.base_line, 0);
    assert_eq!((second.first_statement_line, second.first_statement_column), (2, 2));
    assert_eq!((second.last_line, second.last_column), (2, 10));
}

#[test]
fn test_lone_terminators_are_flagged_empty() {
    let statements = split_sql("SELECT 1; ;", Dialect::Postgres).unwrap();
    let flags: Vec<bool> = statements.iter().map(|s| s.empty).collect();
    assert_eq!(flags, vec![false, true]);
}

#[test]
fn test_whitespace_only_input_yields_no_statements() {
    assert!(split_sql("", Dialect::Postgres).unwrap().is_empty());
    let statements = split_sql("  \n ", Dialect::Postgres).unwrap();
    assert!(statements.iter().all(|s| s.empty));
}

#[test]
fn test_unmatched_end_reports_malformed_nesting() {
    // Block nesting fails first, then the statement parser rejects the
    // stray `END IF` as well.
    let err = split_sql("SELECT 1;\nEND IF;", Dialect::Redshift).unwrap_err();
    assert!(matches!(err, SplitError::Grammar(_)), "{err:?}");
}

#[test]
fn test_procedural_block_survives_inner_terminators() {
    let sql = "CREATE PROCEDURE p() AS $$\nBEGIN\n  LOOP\n    EXIT;\n  END LOOP;\nEND;\n$$ LANGUAGE plpgsql;\nSELECT 1;";
    let statements = split_sql(sql, Dialect::Postgres).unwrap();
    assert_eq!(statements.len(), 2);
    assert!(statements[1].text.ends_with("SELECT 1;"));
}
