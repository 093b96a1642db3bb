//! Keyword vocabulary of the PostgreSQL-family grammar.

use std::collections::HashMap;
use std::sync::OnceLock;

macro_rules! keywords {
    ($($variant:ident => $text:literal, $class:ident;)*) => {
        /// A keyword known to the grammar.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Kw {
            $($variant,)*
        }

        impl Kw {
            pub const ALL: &'static [Kw] = &[$(Kw::$variant,)*];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Kw::$variant => $text,)*
                }
            }

            /// Reserved keywords never stand in for a column or table name.
            pub fn is_reserved(self) -> bool {
                match self {
                    $(Kw::$variant => keywords!(@class $class),)*
                }
            }
        }
    };
    (@class reserved) => { true };
    (@class unreserved) => { false };
}

keywords! {
    Abort => "ABORT", unreserved;
    All => "ALL", reserved;
    And => "AND", reserved;
    Any => "ANY", reserved;
    As => "AS", reserved;
    Asc => "ASC", reserved;
    Begin => "BEGIN", unreserved;
    Between => "BETWEEN", reserved;
    By => "BY", unreserved;
    Case => "CASE", reserved;
    Cast => "CAST", reserved;
    Chain => "CHAIN", unreserved;
    Commit => "COMMIT", unreserved;
    Committed => "COMMITTED", unreserved;
    Cross => "CROSS", reserved;
    CurrentDate => "CURRENT_DATE", reserved;
    CurrentTime => "CURRENT_TIME", reserved;
    CurrentTimestamp => "CURRENT_TIMESTAMP", reserved;
    CurrentUser => "CURRENT_USER", reserved;
    Default => "DEFAULT", reserved;
    Deferrable => "DEFERRABLE", unreserved;
    Delete => "DELETE", unreserved;
    Desc => "DESC", reserved;
    Distinct => "DISTINCT", reserved;
    Else => "ELSE", reserved;
    End => "END", reserved;
    Except => "EXCEPT", reserved;
    Exists => "EXISTS", reserved;
    False => "FALSE", reserved;
    Fetch => "FETCH", reserved;
    First => "FIRST", unreserved;
    For => "FOR", reserved;
    From => "FROM", reserved;
    Full => "FULL", reserved;
    Group => "GROUP", reserved;
    Having => "HAVING", reserved;
    If => "IF", unreserved;
    Ilike => "ILIKE", reserved;
    In => "IN", reserved;
    Inner => "INNER", reserved;
    Insert => "INSERT", unreserved;
    Intersect => "INTERSECT", reserved;
    Into => "INTO", reserved;
    Is => "IS", reserved;
    Isolation => "ISOLATION", unreserved;
    Join => "JOIN", reserved;
    Last => "LAST", unreserved;
    Lateral => "LATERAL", reserved;
    Left => "LEFT", reserved;
    Level => "LEVEL", unreserved;
    Like => "LIKE", reserved;
    Limit => "LIMIT", reserved;
    Loop => "LOOP", unreserved;
    Materialized => "MATERIALIZED", unreserved;
    Natural => "NATURAL", reserved;
    Next => "NEXT", unreserved;
    No => "NO", unreserved;
    Not => "NOT", reserved;
    Null => "NULL", reserved;
    Nulls => "NULLS", unreserved;
    Offset => "OFFSET", reserved;
    On => "ON", reserved;
    Only => "ONLY", reserved;
    Or => "OR", reserved;
    Order => "ORDER", reserved;
    Outer => "OUTER", reserved;
    Read => "READ", unreserved;
    Recursive => "RECURSIVE", unreserved;
    Repeatable => "REPEATABLE", unreserved;
    Returning => "RETURNING", reserved;
    Right => "RIGHT", reserved;
    Rollback => "ROLLBACK", unreserved;
    Row => "ROW", unreserved;
    Rows => "ROWS", unreserved;
    Select => "SELECT", reserved;
    Serializable => "SERIALIZABLE", unreserved;
    Set => "SET", unreserved;
    Start => "START", unreserved;
    Table => "TABLE", reserved;
    Then => "THEN", reserved;
    Transaction => "TRANSACTION", unreserved;
    True => "TRUE", reserved;
    Uncommitted => "UNCOMMITTED", unreserved;
    Union => "UNION", reserved;
    Update => "UPDATE", unreserved;
    Using => "USING", reserved;
    Values => "VALUES", unreserved;
    When => "WHEN", reserved;
    Where => "WHERE", reserved;
    With => "WITH", reserved;
    Work => "WORK", unreserved;
    Write => "WRITE", unreserved;
}

impl Kw {
    /// Looks up an unquoted word, ignoring ASCII case.
    pub fn from_word(word: &str) -> Option<Kw> {
        static LOOKUP: OnceLock<HashMap<&'static str, Kw>> = OnceLock::new();
        let lookup = LOOKUP.get_or_init(|| Kw::ALL.iter().map(|kw| (kw.as_str(), *kw)).collect());
        if word.len() > 32 {
            return None;
        }
        lookup.get(word.to_ascii_uppercase().as_str()).copied()
    }
}
