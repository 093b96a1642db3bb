//! sqlcaret CLI - SQL statement splitting and caret completion

use sqlcaret_cli::cli;
use sqlcaret_cli::input;
use sqlcaret_cli::metadata::{self, CatalogError};
use sqlcaret_cli::output;

use anyhow::{Context, Result};
use clap::Parser;
use is_terminal::IsTerminal;
use sqlcaret_core::{complete, split_sql, CompletionRequest, MetadataProvider, NoMetadata};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use cli::{Args, Command, CompleteArgs, OutputFormat, SplitArgs};
use output::{format_candidates, format_json, format_statements, FileStatements};

/// Splitting or completion failed.
const EXIT_FAILURE: u8 = 1;
/// The catalog file could not be read or parsed.
const EXIT_CONFIG_ERROR: u8 = 66;

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    let result = match args.command {
        Command::Split(args) => run_split(args),
        Command::Complete(args) => run_complete(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("sqlcaret: error: {e:#}");
            if e.downcast_ref::<CatalogError>().is_some() {
                ExitCode::from(EXIT_CONFIG_ERROR)
            } else {
                ExitCode::from(EXIT_FAILURE)
            }
        }
    }
}

/// Logs go to stderr, filtered by `SQLCARET_LOG` (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_env("SQLCARET_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_split(args: SplitArgs) -> Result<()> {
    let sources = input::read_input(&args.files)?;
    let dialect = args.common.dialect.into();

    let files = sources
        .into_iter()
        .map(|source| {
            let statements = split_sql(&source.content, dialect)
                .with_context(|| format!("Failed to split {}", source.name))?;
            Ok(FileStatements {
                name: source.name,
                statements,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let rendered = match args.common.format {
        OutputFormat::Json => format_json(&files, args.common.compact)?,
        OutputFormat::Table => format_statements(&files, use_colors()),
    };
    print_output(&rendered);
    Ok(())
}

fn run_complete(args: CompleteArgs) -> Result<()> {
    let source = input::read_one(args.file.as_deref())?;

    let catalog = args
        .metadata
        .as_deref()
        .map(metadata::load_catalog)
        .transpose()?;
    let database = match &catalog {
        Some(catalog) => metadata::default_database(catalog, args.database.as_deref()),
        None => args.database.clone().unwrap_or_default(),
    };
    let provider: &dyn MetadataProvider = match &catalog {
        Some(catalog) => catalog,
        None => &NoMetadata,
    };

    let mut request = CompletionRequest::new(source.content, args.line, args.column)
        .with_dialect(args.common.dialect.into())
        .with_database(database)
        .with_scene(args.scene.into());
    if let Some(schema) = args.schema {
        request = request.with_schema(schema);
    }

    let candidates = complete(&request, provider)
        .with_context(|| format!("Failed to complete {}", source.name))?;

    let rendered = match args.common.format {
        OutputFormat::Json => format_json(&candidates, args.common.compact)?,
        OutputFormat::Table => format_candidates(&candidates, use_colors()),
    };
    print_output(&rendered);
    Ok(())
}

fn use_colors() -> bool {
    std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
}

fn print_output(rendered: &str) {
    if rendered.ends_with('\n') {
        print!("{rendered}");
    } else {
        println!("{rendered}");
    }
}
