//! Quoting and normalization of identifiers.

use std::sync::LazyLock;

use regex::Regex;

use crate::grammar::Kw;

static UNQUOTED_IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z_][a-z0-9_$]*$").expect("Invalid regex pattern")
});

/// Double-quotes `name` unless it can be written bare: lowercase, not a
/// reserved keyword and made of identifier characters only.
pub fn quote_identifier_if_needed(name: &str) -> String {
    let reserved = Kw::from_word(name).is_some_and(Kw::is_reserved);
    if !reserved && UNQUOTED_IDENTIFIER.is_match(name) {
        return name.to_string();
    }
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Turns identifier text as typed into the name it denotes. Quoted text
/// loses its quotes, unquoted text folds to lowercase.
pub fn normalize_identifier(text: &str) -> String {
    match text.strip_prefix('"') {
        Some(rest) => rest
            .strip_suffix('"')
            .unwrap_or(rest)
            .replace("\"\"", "\""),
        None => text.to_lowercase(),
    }
}

/// Same as [`normalize_identifier`] for identifiers parsed by sqlparser.
pub(crate) fn normalize_ident(ident: &sqlparser::ast::Ident) -> String {
    if ident.quote_style.is_some() {
        ident.value.clone()
    } else {
        ident.value.to_lowercase()
    }
}
