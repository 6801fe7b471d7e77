//! Connection manager: owns the engine handle and composes the result
//! adapters, catalog queries, transactions and the notification bridge.

pub mod catalog;
pub(crate) mod open;
pub(crate) mod regexp;

use std::path::Path;
use std::rc::Rc;

use cipherlite_core::{ConnectOptions, DriverError, DriverResult, Notification, NumericPrecision};
use tracing::{info, warn};

use crate::features::DriverFeature;
use crate::notify::{Listener, NotificationBridge};
use crate::session::Session;
use crate::statement::{BoundValues, SqlResult};

pub use catalog::{escape_identifier, TableKind};

const CLOSE_CONTEXT: &str = "Error closing database";

/// An open (or closed) SQLCipher database.
///
/// Single-threaded: neither this type nor the `SqlResult`s it creates are
/// `Send`. Dropping an open connection closes it.
pub struct Connection {
    session: Rc<Session>,
    options: ConnectOptions,
    notifications: NotificationBridge,
    precision: NumericPrecision,
}

impl Connection {
    /// Open `path`, keying it with `key` when one is given.
    ///
    /// A wrong key fails here rather than on first use: the schema is read
    /// once right after keying.
    pub fn open(
        path: impl AsRef<Path>,
        key: Option<&str>,
        options: &ConnectOptions,
    ) -> DriverResult<Self> {
        let path = path.as_ref();
        let conn = open::open_engine(path, key, options)?;
        info!(
            path = %path.display(),
            keyed = key.is_some_and(|k| !k.is_empty()),
            read_only = options.read_only,
            "database opened"
        );
        Ok(Self::with_options(conn, options.clone()))
    }

    /// Parse `options` and open; see `Connection::open`.
    pub fn open_with_options_str(
        path: impl AsRef<Path>,
        key: Option<&str>,
        options: &str,
    ) -> DriverResult<Self> {
        Self::open(path, key, &ConnectOptions::parse(options))
    }

    /// Adopt an engine connection opened elsewhere.
    pub fn from_handle(conn: rusqlite::Connection) -> Self {
        Self::with_options(conn, ConnectOptions::default())
    }

    fn with_options(conn: rusqlite::Connection, options: ConnectOptions) -> Self {
        Self {
            session: Session::new(conn),
            options,
            notifications: NotificationBridge::new(),
            precision: NumericPrecision::default(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.is_open()
    }

    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }

    pub(crate) fn ensure_open(&self) -> DriverResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(DriverError::NotOpen)
        }
    }

    /// Finalize every live result, drop the update hook and close the
    /// handle. Closing twice is a no-op. The connection counts as closed
    /// even when the engine reports a failure.
    pub fn close(&mut self) -> DriverResult<()> {
        if !self.is_open() {
            return Ok(());
        }
        let finalized = self.session.finalize_all();
        let notifications = &mut self.notifications;
        self.session.with_conn(|conn| {
            notifications.detach(conn);
            Ok(())
        })?;

        let Some(conn) = self.session.take_connection() else {
            return Ok(());
        };
        match conn.close() {
            Ok(()) => {
                info!(finalized, "database closed");
                Ok(())
            }
            Err((_conn, e)) => Err(open::engine_error(CLOSE_CONTEXT, &e)),
        }
    }

    /// A new, unprepared result adapter bound to this connection.
    pub fn create_result(&self) -> SqlResult {
        SqlResult::new(Rc::clone(&self.session), self.precision)
    }

    /// Prepare `sql` on a new result adapter.
    pub fn prepare(&self, sql: &str) -> DriverResult<SqlResult> {
        let mut result = self.create_result();
        result.prepare(sql)?;
        Ok(result)
    }

    /// Prepare and execute `sql` on a new result adapter.
    pub fn query(&self, sql: &str, values: &BoundValues) -> DriverResult<SqlResult> {
        let mut result = self.create_result();
        result.exec_direct(sql, values)?;
        Ok(result)
    }

    pub fn begin_transaction(&self) -> DriverResult<()> {
        self.transaction_control("BEGIN", "begin")
    }

    pub fn commit_transaction(&self) -> DriverResult<()> {
        self.transaction_control("COMMIT", "commit")
    }

    pub fn rollback_transaction(&self) -> DriverResult<()> {
        self.transaction_control("ROLLBACK", "rollback")
    }

    fn transaction_control(&self, sql: &str, operation: &'static str) -> DriverResult<()> {
        self.ensure_open()?;
        let mut control = self.create_result();
        control
            .exec_direct(sql, &BoundValues::new())
            .map_err(|e| DriverError::Transaction {
                operation,
                message: match e {
                    DriverError::Statement { message, .. } => message,
                    other => other.to_string(),
                },
            })
    }

    /// Start delivering changes to `table`.
    pub fn subscribe(&mut self, table: &str) -> DriverResult<()> {
        let notifications = &mut self.notifications;
        self.session.with_conn(|conn| notifications.subscribe(conn, table))
    }

    pub fn unsubscribe(&mut self, table: &str) -> DriverResult<()> {
        let notifications = &mut self.notifications;
        self.session.with_conn(|conn| notifications.unsubscribe(conn, table))
    }

    /// Subscribed table names in subscription order.
    pub fn subscribed_names(&self) -> Vec<String> {
        self.notifications.subscribed()
    }

    /// Deliver changes queued since the last poll.
    pub fn poll_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain()
    }

    /// Register a callback run by `poll_notifications` for each notification.
    pub fn on_notification(&mut self, listener: impl FnMut(&Notification) + 'static) {
        self.notifications.add_listener(Box::new(listener) as Listener);
    }

    pub fn has_feature(&self, feature: DriverFeature) -> bool {
        feature.is_supported()
    }

    pub fn numeric_precision(&self) -> NumericPrecision {
        self.precision
    }

    /// Default precision policy for results created from now on.
    pub fn set_numeric_precision(&mut self, precision: NumericPrecision) {
        self.precision = precision;
    }

    /// Run `f` against the underlying engine connection.
    pub fn with_handle<F, T>(&self, f: F) -> DriverResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> DriverResult<T>,
    {
        self.session.with_conn(f)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close database on drop");
        }
    }
}
