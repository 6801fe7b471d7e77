//! Engine open: flags, the SQLCipher key handshake, busy timeout and the
//! optional `regexp` function.

use std::path::Path;

use cipherlite_core::{ConnectOptions, DriverError, DriverResult};
use rusqlite::OpenFlags;

use super::regexp;

const OPEN_CONTEXT: &str = "Error opening database";
const KEY_CONTEXT: &str = "Error opening database by key";
const CONFIGURE_CONTEXT: &str = "Error configuring database";

/// Flags derived from the connection options. The engine mutex is always
/// off; a connection is confined to one thread.
pub(crate) fn open_flags(options: &ConnectOptions) -> OpenFlags {
    let mut flags = if options.read_only {
        OpenFlags::SQLITE_OPEN_READ_ONLY
    } else {
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
    };
    flags |= if options.shared_cache {
        OpenFlags::SQLITE_OPEN_SHARED_CACHE
    } else {
        OpenFlags::SQLITE_OPEN_PRIVATE_CACHE
    };
    if options.uri {
        flags |= OpenFlags::SQLITE_OPEN_URI;
    }
    flags | OpenFlags::SQLITE_OPEN_NO_MUTEX
}

/// Open and configure an engine connection.
///
/// A non-empty `key` is applied before anything else touches the file and
/// verified by reading the schema. Every failure closes the new handle.
pub(crate) fn open_engine(
    path: &Path,
    key: Option<&str>,
    options: &ConnectOptions,
) -> DriverResult<rusqlite::Connection> {
    let conn = rusqlite::Connection::open_with_flags(path, open_flags(options))
        .map_err(|e| engine_error(OPEN_CONTEXT, &e))?;

    if let Some(key) = key.filter(|k| !k.is_empty()) {
        if let Err(e) = apply_key(&conn, key).and_then(|()| verify_key(&conn)) {
            close_quietly(conn);
            return Err(engine_error(KEY_CONTEXT, &e));
        }
    }

    if let Err(e) = conn.busy_timeout(options.busy_timeout()) {
        close_quietly(conn);
        return Err(engine_error(CONFIGURE_CONTEXT, &e));
    }

    if options.regexp_enabled() {
        if let Err(e) = regexp::install(&conn, options.effective_regexp_cache_size()) {
            close_quietly(conn);
            return Err(engine_error(CONFIGURE_CONTEXT, &e));
        }
    }

    Ok(conn)
}

/// Set the SQLCipher key. Newer SQLCipher builds answer the pragma with a
/// row, older ones with none; both are drained.
fn apply_key(conn: &rusqlite::Connection, key: &str) -> rusqlite::Result<()> {
    let sql = format!("PRAGMA key = '{}'", key.replace('\'', "''"));
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while rows.next()?.is_some() {}
    Ok(())
}

/// The key pragma itself never fails; a wrong key shows up on first read.
fn verify_key(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
        .map(|_| ())
}

fn close_quietly(conn: rusqlite::Connection) {
    if let Err((_, e)) = conn.close() {
        tracing::warn!(error = %e, "failed to close rejected connection");
    }
}

/// Map an engine error onto `DriverError::Connection`, keeping the
/// extended result code when there is one.
pub(crate) fn engine_error(context: &str, err: &rusqlite::Error) -> DriverError {
    let code = match err {
        rusqlite::Error::SqliteFailure(failure, _) => Some(failure.extended_code),
        _ => None,
    };
    let message = match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => message.clone(),
        other => other.to_string(),
    };
    DriverError::connection(context, message, code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_flags_read_write_private() {
        let flags = open_flags(&ConnectOptions::default());
        assert!(flags.contains(OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE));
        assert!(flags.contains(OpenFlags::SQLITE_OPEN_PRIVATE_CACHE));
        assert!(flags.contains(OpenFlags::SQLITE_OPEN_NO_MUTEX));
        assert!(!flags.contains(OpenFlags::SQLITE_OPEN_URI));
    }

    #[test]
    fn read_only_shared_uri_flags() {
        let opts = ConnectOptions::parse("OPEN_READONLY;ENABLE_SHARED_CACHE;OPEN_URI");
        let flags = open_flags(&opts);
        assert!(flags.contains(OpenFlags::SQLITE_OPEN_READ_ONLY));
        assert!(!flags.contains(OpenFlags::SQLITE_OPEN_CREATE));
        assert!(flags.contains(OpenFlags::SQLITE_OPEN_SHARED_CACHE));
        assert!(flags.contains(OpenFlags::SQLITE_OPEN_URI));
    }

    #[test]
    fn missing_read_only_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");
        let err = open_engine(&path, None, &ConnectOptions::parse("OPEN_READONLY")).unwrap_err();
        assert!(matches!(err, DriverError::Connection { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn quoted_key_is_accepted() {
        let conn = open_engine(Path::new(":memory:"), Some("it's"), &ConnectOptions::default());
        assert!(conn.is_ok());
    }
}
