//! Input handling for file reading and stdin support.

use anyhow::{Context, Result};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// One SQL input and the name it is reported under.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

/// Read SQL input from files or stdin.
///
/// If no files are provided, reads from stdin.
pub fn read_input(files: &[PathBuf]) -> Result<Vec<SourceFile>> {
    if files.is_empty() {
        Ok(vec![read_from_stdin()?])
    } else {
        files.iter().map(|path| read_file(path)).collect()
    }
}

/// Read a single SQL input, from `file` or stdin.
pub fn read_one(file: Option<&Path>) -> Result<SourceFile> {
    match file {
        Some(path) => read_file(path),
        None => read_from_stdin(),
    }
}

fn read_from_stdin() -> Result<SourceFile> {
    let mut content = String::new();
    io::stdin()
        .read_to_string(&mut content)
        .context("Failed to read from stdin")?;

    Ok(SourceFile {
        name: "<stdin>".to_string(),
        content,
    })
}

fn read_file(path: &Path) -> Result<SourceFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    Ok(SourceFile {
        name: path.display().to_string(),
        content,
    })
}
