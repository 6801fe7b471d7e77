//! Shared connection state: the engine handle plus the registry of live
//! statements that must be finalized before the handle may close.
//!
//! A `Session` is shared (via `Rc`) between a `Connection` and every
//! `SqlResult` it created. Nothing here is `Send`; one connection belongs to
//! one thread.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use cipherlite_core::{DriverError, DriverResult};
use rusqlite::ffi;

use crate::statement::raw::RawStatement;

/// Storage for one adapter's statement. `None` once finalized.
pub(crate) type StatementSlot = RefCell<Option<RawStatement>>;

pub(crate) struct Session {
    conn: RefCell<Option<rusqlite::Connection>>,
    statements: RefCell<Vec<Weak<StatementSlot>>>,
}

impl Session {
    pub(crate) fn new(conn: rusqlite::Connection) -> Rc<Self> {
        Rc::new(Self {
            conn: RefCell::new(Some(conn)),
            statements: RefCell::new(Vec::new()),
        })
    }

    pub(crate) fn is_open(&self) -> bool {
        self.conn.borrow().is_some()
    }

    /// Run `f` against the open engine connection.
    pub(crate) fn with_conn<F, T>(&self, f: F) -> DriverResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> DriverResult<T>,
    {
        let conn = self.conn.borrow();
        let conn = conn.as_ref().ok_or(DriverError::NotOpen)?;
        f(conn)
    }

    /// Raw engine handle. Only valid until `take_connection`.
    pub(crate) fn raw_handle(&self) -> DriverResult<*mut ffi::sqlite3> {
        // SAFETY: the pointer is only handed to statements registered with
        // this session, and those are finalized before the handle closes.
        self.with_conn(|conn| Ok(unsafe { conn.handle() }))
    }

    /// Track a statement slot so `finalize_all` can reach it.
    pub(crate) fn register(&self, slot: &Rc<StatementSlot>) {
        let mut statements = self.statements.borrow_mut();
        statements.retain(|weak| weak.strong_count() > 0);
        statements.push(Rc::downgrade(slot));
    }

    /// Finalize every live statement. Returns how many were still allocated.
    pub(crate) fn finalize_all(&self) -> usize {
        let statements = std::mem::take(&mut *self.statements.borrow_mut());
        statements
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|slot| slot.borrow_mut().take().is_some())
            .count()
    }

    /// Remove the engine connection, leaving the session closed.
    pub(crate) fn take_connection(&self) -> Option<rusqlite::Connection> {
        self.conn.borrow_mut().take()
    }

    /// Rows changed by the most recent INSERT/UPDATE/DELETE on this connection.
    pub(crate) fn changes(&self) -> i64 {
        self.with_conn(|conn| Ok(i64::try_from(conn.changes()).unwrap_or(i64::MAX)))
            .unwrap_or(0)
    }

    pub(crate) fn last_insert_rowid(&self) -> Option<i64> {
        self.with_conn(|conn| Ok(conn.last_insert_rowid())).ok()
    }
}
