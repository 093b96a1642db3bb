#![no_main]

use libfuzzer_sys::fuzz_target;
use sqlcaret_core::{complete, CompletionRequest, NoMetadata};

fuzz_target!(|data: &[u8]| {
    if let Some((&caret, rest)) = data.split_first() {
        if let Ok(sql) = std::str::from_utf8(rest) {
            let line = sql.lines().count().max(1);
            let request = CompletionRequest::new(sql, line, usize::from(caret));
            let _ = complete(&request, &NoMetadata);
        }
    }
});
