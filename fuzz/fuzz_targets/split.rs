#![no_main]

use libfuzzer_sys::fuzz_target;
use sqlcaret_core::{split_sql, Dialect};

fuzz_target!(|data: &[u8]| {
    if let Ok(sql) = std::str::from_utf8(data) {
        if let Ok(statements) = split_sql(sql, Dialect::Postgres) {
            let joined: String = statements.iter().map(|s| s.text.as_str()).collect();
            assert_eq!(joined, sql);
        }
    }
});
