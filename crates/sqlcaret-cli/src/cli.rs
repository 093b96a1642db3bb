//! CLI argument parsing using clap.

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// sqlcaret - SQL statement splitting and caret completion
#[derive(Parser, Debug)]
#[command(name = "sqlcaret")]
#[command(about = "Split SQL scripts and complete SQL at a caret", long_about = None)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Split scripts into statements
    Split(SplitArgs),
    /// List completion candidates at a caret position
    Complete(CompleteArgs),
}

/// Options shared by every subcommand.
#[derive(ClapArgs, Debug, Clone)]
pub struct CommonArgs {
    /// SQL dialect
    #[arg(short, long, default_value = "postgres", value_enum)]
    pub dialect: DialectArg,

    /// Output format
    #[arg(short, long, default_value = "table", value_enum)]
    pub format: OutputFormat,

    /// Compact JSON output (no pretty-printing)
    #[arg(short, long)]
    pub compact: bool,
}

#[derive(ClapArgs, Debug)]
pub struct SplitArgs {
    /// SQL files to split (reads from stdin if none provided)
    #[arg(value_name = "FILES")]
    pub files: Vec<PathBuf>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(ClapArgs, Debug)]
pub struct CompleteArgs {
    /// SQL file holding the caret (reads from stdin if omitted)
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Caret line, 1-based
    #[arg(short, long, value_name = "N")]
    pub line: usize,

    /// Caret column on that line, 0-based and counted in characters
    #[arg(long, value_name = "N")]
    pub column: usize,

    /// Catalog JSON file: one database object or an array of them
    #[arg(short, long, value_name = "FILE")]
    pub metadata: Option<PathBuf>,

    /// Database looked up in the catalog (defaults to the only one it holds)
    #[arg(long, value_name = "NAME")]
    pub database: Option<String>,

    /// Selected schema; without it every schema is searched
    #[arg(short, long, value_name = "NAME")]
    pub schema: Option<String>,

    /// Grammar entry point
    #[arg(long, default_value = "all", value_enum)]
    pub scene: SceneArg,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// SQL dialect options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DialectArg {
    Postgres,
    Redshift,
}

impl From<DialectArg> for sqlcaret_core::Dialect {
    fn from(d: DialectArg) -> Self {
        match d {
            DialectArg::Postgres => sqlcaret_core::Dialect::Postgres,
            DialectArg::Redshift => sqlcaret_core::Dialect::Redshift,
        }
    }
}

/// Completion entry point options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SceneArg {
    /// Any statement
    All,
    /// A single query
    Query,
}

impl From<SceneArg> for sqlcaret_core::Scene {
    fn from(s: SceneArg) -> Self {
        match s {
            SceneArg::All => sqlcaret_core::Scene::All,
            SceneArg::Query => sqlcaret_core::Scene::Query,
        }
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_split_defaults() {
        let args = Args::parse_from(["sqlcaret", "split", "a.sql", "b.sql"]);
        let Command::Split(split) = args.command else {
            panic!("expected split");
        };
        assert_eq!(split.files.len(), 2);
        assert_eq!(split.common.dialect, DialectArg::Postgres);
        assert_eq!(split.common.format, OutputFormat::Table);
    }

    #[test]
    fn test_parse_complete() {
        let args = Args::parse_from([
            "sqlcaret",
            "complete",
            "--line",
            "2",
            "--column",
            "7",
            "-d",
            "redshift",
            "--scene",
            "query",
            "-f",
            "json",
        ]);
        let Command::Complete(complete) = args.command else {
            panic!("expected complete");
        };
        assert!(complete.file.is_none());
        assert_eq!((complete.line, complete.column), (2, 7));
        assert_eq!(complete.scene, SceneArg::Query);
        assert_eq!(complete.common.format, OutputFormat::Json);
        assert_eq!(
            sqlcaret_core::Dialect::from(complete.common.dialect),
            sqlcaret_core::Dialect::Redshift
        );
    }

    #[test]
    fn test_complete_requires_caret() {
        assert!(Args::try_parse_from(["sqlcaret", "complete", "--line", "1"]).is_err());
    }
}
