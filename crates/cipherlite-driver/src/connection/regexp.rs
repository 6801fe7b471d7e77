//! `regexp(pattern, subject)` SQL function, which also backs `X REGEXP Y`.
//! Compiled patterns live in a bounded Moka cache (TinyLFU admission).

use std::panic::AssertUnwindSafe;

use moka::sync::Cache;
use regex::Regex;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use tracing::debug;

/// Compiled-pattern cache keyed by pattern text.
pub(crate) struct RegexCache {
    inner: Cache<String, Regex>,
}

impl RegexCache {
    pub(crate) fn new(capacity: u64) -> Self {
        Self {
            inner: Cache::new(capacity),
        }
    }

    /// Whether `subject` matches `pattern` anywhere. An invalid pattern
    /// matches nothing and is not cached.
    pub(crate) fn is_match(&self, pattern: &str, subject: &str) -> bool {
        if let Some(re) = self.inner.get(pattern) {
            return re.is_match(subject);
        }
        match Regex::new(pattern) {
            Ok(re) => {
                let matched = re.is_match(subject);
                self.inner.insert(pattern.to_string(), re);
                matched
            }
            Err(e) => {
                debug!(pattern, error = %e, "invalid regexp pattern");
                false
            }
        }
    }

    #[cfg(test)]
    fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }
}

/// Register `regexp` on `conn` with a cache of `capacity` compiled patterns.
pub(crate) fn install(conn: &rusqlite::Connection, capacity: u64) -> rusqlite::Result<()> {
    let cache = AssertUnwindSafe(RegexCache::new(capacity));
    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        move |ctx| {
            let pattern = lossy_text(ctx.get_raw(0));
            let subject = lossy_text(ctx.get_raw(1));
            Ok(cache.is_match(&pattern, &subject))
        },
    )
}

/// NULL reads as the empty string.
fn lossy_text(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_reuses_compiled_patterns() {
        let cache = RegexCache::new(4);
        assert!(cache.is_match("^a+$", "aaa"));
        assert!(!cache.is_match("^a+$", "aab"));
        assert_eq!(cache.entry_count(), 1);
    }

    #[test]
    fn invalid_pattern_matches_nothing() {
        let cache = RegexCache::new(4);
        assert!(!cache.is_match("(", "("));
        assert_eq!(cache.entry_count(), 0);
    }

    #[test]
    fn sql_operator_uses_function() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        install(&conn, 2).unwrap();
        let hit: bool = conn
            .query_row("SELECT 'cipher' REGEXP '^ci'", [], |row| row.get(0))
            .unwrap();
        let miss: bool = conn
            .query_row("SELECT regexp('^x', 'cipher')", [], |row| row.get(0))
            .unwrap();
        assert!(hit);
        assert!(!miss);
    }

    #[test]
    fn null_subject_reads_as_empty() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        install(&conn, 2).unwrap();
        let matched: bool = conn
            .query_row("SELECT regexp('^$', NULL)", [], |row| row.get(0))
            .unwrap();
        assert!(matched);
    }
}
