//! Connection option string parsing.
//!
//! The option string is a `;`-separated list of tokens, e.g.
//! `"BUSY_TIMEOUT=2000;OPEN_READONLY;ENABLE_REGEXP=50"`. Parsing never fails:
//! unknown tokens are ignored and malformed numbers keep the previous value.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Busy timeout applied when no `BUSY_TIMEOUT` token parses.
pub const DEFAULT_BUSY_TIMEOUT_MS: i32 = 5000;
/// Compiled-pattern cache size for a bare `ENABLE_REGEXP`.
pub const DEFAULT_REGEXP_CACHE_SIZE: u64 = 25;

/// Older hosts spell every key with this prefix.
const LEGACY_PREFIX: &str = "QSQLITE_";

const BUSY_TIMEOUT: &str = "BUSY_TIMEOUT";
const OPEN_READONLY: &str = "OPEN_READONLY";
const OPEN_URI: &str = "OPEN_URI";
const ENABLE_SHARED_CACHE: &str = "ENABLE_SHARED_CACHE";
const ENABLE_REGEXP: &str = "ENABLE_REGEXP";

/// Typed connection options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectOptions {
    /// Milliseconds to wait on a locked database. Default: 5000.
    /// Zero or negative disables the wait.
    pub busy_timeout_ms: i32,
    /// Open without write access.
    pub read_only: bool,
    /// Interpret the path as a `file:` URI.
    pub uri: bool,
    /// Shared-cache mode instead of private cache.
    pub shared_cache: bool,
    /// `Some(n)` installs the `regexp` SQL function with an n-entry pattern cache.
    pub regexp_cache_size: Option<u64>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            read_only: false,
            uri: false,
            shared_cache: false,
            regexp_cache_size: None,
        }
    }
}

impl ConnectOptions {
    /// Parse an option string. See the module docs for the grammar.
    pub fn parse(options: &str) -> Self {
        let mut parsed = Self::default();

        for token in options.split(';') {
            let token = token.trim();
            let key = token.strip_prefix(LEGACY_PREFIX).unwrap_or(token);

            if let Some(rest) = key.strip_prefix(BUSY_TIMEOUT) {
                if let Some(ms) = numeric_suffix::<i32>(rest) {
                    parsed.busy_timeout_ms = ms;
                }
            } else if key == OPEN_READONLY {
                parsed.read_only = true;
            } else if key == OPEN_URI {
                parsed.uri = true;
            } else if key == ENABLE_SHARED_CACHE {
                parsed.shared_cache = true;
            } else if let Some(rest) = key.strip_prefix(ENABLE_REGEXP) {
                let current = parsed.regexp_cache_size.unwrap_or(DEFAULT_REGEXP_CACHE_SIZE);
                let rest = rest.trim();
                if rest.is_empty() {
                    parsed.regexp_cache_size = Some(current);
                } else if let Some(size) = numeric_suffix::<i64>(rest) {
                    let size = if size > 0 { size as u64 } else { current };
                    parsed.regexp_cache_size = Some(size);
                }
            }
        }

        parsed
    }

    /// Busy timeout as a `Duration`; negative values clamp to zero.
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms.max(0) as u64)
    }

    /// Whether the `regexp` SQL function should be installed.
    pub fn regexp_enabled(&self) -> bool {
        self.regexp_cache_size.is_some()
    }

    /// Returns the effective pattern cache size, defaulting to 25.
    pub fn effective_regexp_cache_size(&self) -> u64 {
        self.regexp_cache_size.unwrap_or(DEFAULT_REGEXP_CACHE_SIZE)
    }
}

/// Parses `= N` (whitespace allowed around both parts). `None` when the
/// `=` is missing or N is not a number of type `T`.
fn numeric_suffix<T: FromStr>(rest: &str) -> Option<T> {
    rest.trim().strip_prefix('=')?.trim().parse().ok()
}

impl FromStr for ConnectOptions {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for ConnectOptions {
    /// Renders the canonical option string; parsing it yields `self` again.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{BUSY_TIMEOUT}={}", self.busy_timeout_ms)?;
        if self.read_only {
            write!(f, ";{OPEN_READONLY}")?;
        }
        if self.uri {
            write!(f, ";{OPEN_URI}")?;
        }
        if self.shared_cache {
            write!(f, ";{ENABLE_SHARED_CACHE}")?;
        }
        if let Some(size) = self.regexp_cache_size {
            write!(f, ";{ENABLE_REGEXP}={size}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_gives_defaults() {
        let opts = ConnectOptions::parse("");
        assert_eq!(opts, ConnectOptions::default());
        assert_eq!(opts.busy_timeout(), Duration::from_millis(5000));
        assert!(!opts.regexp_enabled());
    }

    #[test]
    fn timeout_and_readonly() {
        let opts = ConnectOptions::parse("BUSY_TIMEOUT=2000;OPEN_READONLY");
        assert_eq!(opts.busy_timeout_ms, 2000);
        assert!(opts.read_only);
        assert!(!opts.uri);
        assert!(!opts.shared_cache);
    }

    #[test]
    fn malformed_timeout_keeps_default() {
        assert_eq!(ConnectOptions::parse("BUSY_TIMEOUT=abc").busy_timeout_ms, 5000);
        assert_eq!(ConnectOptions::parse("BUSY_TIMEOUT").busy_timeout_ms, 5000);
        assert_eq!(ConnectOptions::parse("BUSY_TIMEOUT 100").busy_timeout_ms, 5000);
    }

    #[test]
    fn last_valid_timeout_wins() {
        let opts = ConnectOptions::parse("BUSY_TIMEOUT=10; BUSY_TIMEOUT = 20 ;BUSY_TIMEOUT=x");
        assert_eq!(opts.busy_timeout_ms, 20);
    }

    #[test]
    fn tokens_are_trimmed_and_unknown_ignored() {
        let opts = ConnectOptions::parse("  OPEN_URI ; FOO=1;;ENABLE_SHARED_CACHE  ");
        assert!(opts.uri);
        assert!(opts.shared_cache);
        assert!(!opts.read_only);
    }

    #[test]
    fn keys_are_case_sensitive() {
        let opts = ConnectOptions::parse("open_readonly;busy_timeout=1");
        assert_eq!(opts, ConnectOptions::default());
    }

    #[test]
    fn legacy_prefix_accepted() {
        let opts = ConnectOptions::parse("QSQLITE_BUSY_TIMEOUT=750;QSQLITE_OPEN_READONLY");
        assert_eq!(opts.busy_timeout_ms, 750);
        assert!(opts.read_only);
    }

    #[test]
    fn regexp_variants() {
        assert_eq!(ConnectOptions::parse("ENABLE_REGEXP").regexp_cache_size, Some(25));
        assert_eq!(ConnectOptions::parse("ENABLE_REGEXP=100").regexp_cache_size, Some(100));
        // Non-positive size enables with the default size.
        assert_eq!(ConnectOptions::parse("ENABLE_REGEXP=0").regexp_cache_size, Some(25));
        // Malformed size leaves the helper disabled.
        assert_eq!(ConnectOptions::parse("ENABLE_REGEXP=big").regexp_cache_size, None);
        assert_eq!(ConnectOptions::parse("ENABLE_REGEXPS").regexp_cache_size, None);
        // A later bare token keeps the earlier size.
        assert_eq!(
            ConnectOptions::parse("ENABLE_REGEXP=7;ENABLE_REGEXP").regexp_cache_size,
            Some(7)
        );
    }

    #[test]
    fn display_round_trips() {
        let opts = ConnectOptions::parse("BUSY_TIMEOUT=42;OPEN_URI;ENABLE_REGEXP=3");
        assert_eq!(opts.to_string(), "BUSY_TIMEOUT=42;OPEN_URI;ENABLE_REGEXP=3");
        assert_eq!(ConnectOptions::parse(&opts.to_string()), opts);
    }

    #[test]
    fn negative_timeout_clamps_duration() {
        let opts = ConnectOptions::parse("BUSY_TIMEOUT=-1");
        assert_eq!(opts.busy_timeout_ms, -1);
        assert_eq!(opts.busy_timeout(), Duration::ZERO);
    }
}
