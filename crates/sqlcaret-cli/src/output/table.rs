//! Human-readable table output formatting.

use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use sqlcaret_core::{Candidate, CandidateKind};
use std::fmt::Write;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::FileStatements;

#[derive(Tabled)]
struct StatementRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "End")]
    end: String,
    #[tabled(rename = "Statement")]
    text: String,
}

#[derive(Tabled)]
struct CandidateRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Text")]
    text: String,
    #[tabled(rename = "Definition")]
    definition: String,
    #[tabled(rename = "Comment")]
    comment: String,
}

/// Lists statements per input. Positions are printed 1-based.
pub fn format_statements(files: &[FileStatements], use_colors: bool) -> String {
    let colored = use_colors && std::io::stdout().is_terminal();
    let mut out = String::new();

    for file in files {
        let title = format!("{} ({} statements)", file.name, file.statements.len());
        if colored {
            writeln!(out, "{}", title.bold()).unwrap();
        } else {
            writeln!(out, "{title}").unwrap();
        }

        let rows: Vec<StatementRow> = file
            .statements
            .iter()
            .filter(|s| !s.empty)
            .enumerate()
            .map(|(i, s)| StatementRow {
                index: i + 1,
                start: format!(
                    "{}:{}",
                    s.first_statement_line + 1,
                    s.first_statement_column + 1
                ),
                end: format!("{}:{}", s.last_line + 1, s.last_column + 1),
                text: preview(s.text.trim(), 60),
            })
            .collect();
        writeln!(out, "{}", Table::new(rows).with(Style::rounded())).unwrap();
    }

    out
}

pub fn format_candidates(candidates: &[Candidate], use_colors: bool) -> String {
    let colored = use_colors && std::io::stdout().is_terminal();
    if candidates.is_empty() {
        let message = "No candidates";
        return if colored {
            format!("{}\n", message.dimmed())
        } else {
            format!("{message}\n")
        };
    }

    let rows: Vec<CandidateRow> = candidates
        .iter()
        .map(|c| CandidateRow {
            kind: kind_label(c.kind, colored),
            text: c.text.clone(),
            definition: c.definition.clone(),
            comment: c.comment.clone(),
        })
        .collect();
    format!("{}\n", Table::new(rows).with(Style::rounded()))
}

fn kind_label(kind: CandidateKind, colored: bool) -> String {
    let label = format!("{kind:?}").to_lowercase();
    if !colored {
        return label;
    }
    match kind {
        CandidateKind::Keyword => label.blue().to_string(),
        CandidateKind::Function => label.magenta().to_string(),
        CandidateKind::Column => label.green().to_string(),
        _ => label.cyan().to_string(),
    }
}

/// First line of `text`, cut to `max` characters.
fn preview(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    let mut preview: String = line.chars().take(max).collect();
    if line.chars().count() > max || text.lines().nth(1).is_some() {
        preview.push('…');
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlcaret_core::{split_sql, Dialect};

    #[test]
    fn test_statement_table_skips_empty_statements() {
        let statements = split_sql("SELECT 1;\n;\nSELECT 2;", Dialect::Postgres).unwrap();
        let files = [FileStatements {
            name: "script.sql".to_string(),
            statements,
        }];
        let out = format_statements(&files, false);
        assert!(out.starts_with("script.sql (3 statements)"));
        assert!(out.contains("SELECT 2;"));
        assert!(out.contains("3:1"));
        assert!(!out.contains("│ 3 "));
    }

    #[test]
    fn test_candidate_table() {
        let candidates = vec![
            Candidate::new(CandidateKind::Column, "id").with_definition("public.t | int4"),
        ];
        let out = format_candidates(&candidates, false);
        assert!(out.contains("column"));
        assert!(out.contains("public.t | int4"));
        assert_eq!(format_candidates(&[], false), "No candidates\n");
    }

    #[test]
    fn test_preview_marks_cut_text() {
        assert_eq!(preview("SELECT 1", 60), "SELECT 1");
        assert_eq!(preview("SELECT\n1", 60), "SELECT…");
        assert_eq!(preview("abcdef", 3), "abc…");
    }
}
