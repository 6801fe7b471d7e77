//! Result adapter: prepare, bind, execute and fetch over one statement.
//!
//! Execution always steps once ahead. The first row (or end-of-rows) is held
//! in a lookahead buffer, so a statement that fails on its first step fails
//! `execute` instead of the first `fetch`, and `is_select` is known as soon
//! as `execute` returns.

pub mod params;
pub(crate) mod raw;

use std::cell::RefCell;
use std::rc::Rc;

use cipherlite_core::{classify, Column, DriverError, DriverResult, NumericPrecision, Value};
use rusqlite::ffi;
use tracing::debug;

use crate::session::{Session, StatementSlot};

pub use params::{BoundValue, BoundValues};
use raw::RawStatement;

const FETCH_CONTEXT: &str = "Unable to fetch row";
const RESET_CONTEXT: &str = "Unable to reset statement";

/// Lifecycle of a result adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultState {
    Unprepared,
    Prepared,
    Executed,
    Fetching,
    Exhausted,
    Error,
    Finalized,
}

/// Outcome of one `fetch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    RowAvailable,
    NoMoreRows,
}

enum Lookahead {
    Row(Vec<Value>),
    Done,
}

/// One statement and its cursor, created by `Connection::create_result`.
///
/// Not `Send`: it shares the connection's session. Dropping the adapter
/// finalizes its statement; closing the connection finalizes it early.
pub struct SqlResult {
    session: Rc<Session>,
    slot: Rc<StatementSlot>,
    state: ResultState,
    columns: Option<Vec<Column>>,
    lookahead: Option<Lookahead>,
    select: bool,
    active: bool,
    precision: NumericPrecision,
}

impl SqlResult {
    pub(crate) fn new(session: Rc<Session>, precision: NumericPrecision) -> Self {
        let slot = Rc::new(RefCell::new(None));
        session.register(&slot);
        Self {
            session,
            slot,
            state: ResultState::Unprepared,
            columns: None,
            lookahead: None,
            select: false,
            active: false,
            precision,
        }
    }

    /// Compile `sql`, replacing any previous statement.
    ///
    /// Exactly one statement is accepted; trailing text other than
    /// whitespace fails with `MultipleStatements`.
    pub fn prepare(&mut self, sql: &str) -> DriverResult<()> {
        self.finalize();
        self.state = ResultState::Unprepared;
        let db = self.session.raw_handle()?;
        // SAFETY: the slot is registered with the session, which finalizes
        // it before the handle closes.
        let raw = unsafe { RawStatement::prepare(db, sql) }.map_err(|err| {
            debug!(error = %err, "prepare failed");
            err
        })?;
        *self.slot.borrow_mut() = Some(raw);
        self.state = ResultState::Prepared;
        debug!(sql, "statement prepared");
        Ok(())
    }

    /// Bind `values` and run the statement up to its first row.
    ///
    /// Re-executing a prepared statement rewinds it first. A parameter
    /// mismatch leaves the statement prepared; any other failure finalizes it.
    pub fn execute(&mut self, values: &BoundValues) -> DriverResult<()> {
        self.lookahead = None;
        self.columns = None;
        self.select = false;
        self.active = false;

        let bound = {
            let slot = self.slot.borrow();
            match slot.as_ref() {
                None => Err(DriverError::statement(
                    RESET_CONTEXT,
                    "No query",
                    ffi::SQLITE_MISUSE,
                )),
                Some(stmt) => {
                    let rc = stmt.reset();
                    if rc == ffi::SQLITE_OK {
                        params::bind_all(stmt, values)
                    } else {
                        Err(DriverError::statement(RESET_CONTEXT, stmt.errmsg(), rc))
                    }
                }
            }
        };
        if let Err(err) = bound {
            if !matches!(err, DriverError::ParameterMismatch { .. }) {
                self.finalize();
            }
            self.state = match self.state {
                ResultState::Finalized => ResultState::Finalized,
                _ => ResultState::Error,
            };
            return Err(err);
        }

        let mut first = Vec::new();
        let pending = match self.step_into(&mut first)? {
            FetchStatus::RowAvailable => Lookahead::Row(first),
            FetchStatus::NoMoreRows => Lookahead::Done,
        };
        self.lookahead = Some(pending);
        self.select = self.columns.is_some();
        self.active = true;
        self.state = ResultState::Executed;
        Ok(())
    }

    /// Prepare and execute in one call.
    pub fn exec_direct(&mut self, sql: &str, values: &BoundValues) -> DriverResult<()> {
        self.prepare(sql)?;
        self.execute(values)
    }

    /// Execute once per parameter set, draining each run. Stops at the first
    /// failure. Returns the number of runs.
    pub fn execute_batch(&mut self, runs: &[BoundValues]) -> DriverResult<usize> {
        let mut scratch = Vec::new();
        for values in runs {
            self.execute(values)?;
            while self.fetch(&mut scratch)? == FetchStatus::RowAvailable {}
        }
        Ok(runs.len())
    }

    /// Write the next row into `row`.
    ///
    /// `row` is replaced, not appended to. After `NoMoreRows` or an error the
    /// statement must be executed again before fetching resumes.
    pub fn fetch(&mut self, row: &mut Vec<Value>) -> DriverResult<FetchStatus> {
        if self.state() == ResultState::Finalized {
            self.lookahead = None;
            return Err(DriverError::statement(FETCH_CONTEXT, "No query", ffi::SQLITE_MISUSE));
        }
        if let Some(pending) = self.lookahead.take() {
            return Ok(match pending {
                Lookahead::Row(values) => {
                    *row = values;
                    self.state = ResultState::Fetching;
                    FetchStatus::RowAvailable
                }
                Lookahead::Done => {
                    self.state = ResultState::Exhausted;
                    FetchStatus::NoMoreRows
                }
            });
        }
        match self.state() {
            ResultState::Executed | ResultState::Fetching => self.step_into(row),
            ResultState::Exhausted | ResultState::Error => Ok(FetchStatus::NoMoreRows),
            ResultState::Unprepared | ResultState::Prepared | ResultState::Finalized => Err(
                DriverError::statement(FETCH_CONTEXT, "statement not executed", ffi::SQLITE_MISUSE),
            ),
        }
    }

    /// Iterator-style fetch: `Ok(None)` once the rows run out.
    pub fn next_row(&mut self) -> DriverResult<Option<Vec<Value>>> {
        let mut row = Vec::new();
        Ok(match self.fetch(&mut row)? {
            FetchStatus::RowAvailable => Some(row),
            FetchStatus::NoMoreRows => None,
        })
    }

    /// Step the statement once, filling `row` from the new current row.
    fn step_into(&mut self, row: &mut Vec<Value>) -> DriverResult<FetchStatus> {
        let slot = self.slot.borrow();
        let Some(stmt) = slot.as_ref() else {
            self.state = ResultState::Error;
            return Err(DriverError::statement(FETCH_CONTEXT, "No query", ffi::SQLITE_MISUSE));
        };

        let rc = stmt.step();
        // Extended result codes are on; the primary code is the low byte.
        match rc & 0xff {
            ffi::SQLITE_ROW => {
                if self.columns.is_none() {
                    self.columns = describe(stmt, false);
                }
                row.clear();
                row.extend((0..stmt.column_count()).map(|col| stmt.read_value(col, self.precision)));
                self.state = ResultState::Fetching;
                Ok(FetchStatus::RowAvailable)
            }
            ffi::SQLITE_DONE => {
                if self.columns.is_none() {
                    self.columns = describe(stmt, true);
                }
                stmt.reset();
                self.state = ResultState::Exhausted;
                Ok(FetchStatus::NoMoreRows)
            }
            ffi::SQLITE_CONSTRAINT | ffi::SQLITE_ERROR => {
                // The step code is generic here; reset reports the specific one.
                let code = stmt.reset();
                let err = DriverError::statement(FETCH_CONTEXT, stmt.errmsg(), code);
                self.state = ResultState::Error;
                Err(err)
            }
            _ => {
                let err = DriverError::statement(FETCH_CONTEXT, stmt.errmsg(), rc);
                stmt.reset();
                self.state = ResultState::Error;
                Err(err)
            }
        }
    }

    /// Rewind the cursor but keep the statement for re-execution.
    pub fn detach(&mut self) {
        if let Some(stmt) = self.slot.borrow().as_ref() {
            stmt.reset();
        }
        self.lookahead = None;
        self.active = false;
        if matches!(self.state, ResultState::Executed | ResultState::Fetching) {
            self.state = ResultState::Exhausted;
        }
    }

    /// Release the statement. Safe to call repeatedly.
    pub fn finalize(&mut self) {
        if self.slot.borrow_mut().take().is_some() {
            debug!("statement finalized");
        }
        self.lookahead = None;
        self.columns = None;
        self.select = false;
        self.active = false;
        self.state = ResultState::Finalized;
    }

    pub fn state(&self) -> ResultState {
        match self.state {
            ResultState::Unprepared | ResultState::Finalized => self.state,
            // The connection may have finalized the statement underneath us.
            _ if self.slot.borrow().is_none() => ResultState::Finalized,
            state => state,
        }
    }

    /// True between a successful `execute` and `detach`/`finalize`.
    pub fn is_active(&self) -> bool {
        self.active && self.state() != ResultState::Finalized
    }

    /// The executed statement produces columns.
    pub fn is_select(&self) -> bool {
        self.select
    }

    /// Column descriptors of the executed statement; empty unless it is an
    /// active select.
    pub fn columns(&self) -> &[Column] {
        match (&self.columns, self.is_active() && self.select) {
            (Some(columns), true) => columns,
            _ => &[],
        }
    }

    /// Rows changed by the most recent INSERT, UPDATE or DELETE on the connection.
    pub fn rows_affected(&self) -> i64 {
        self.session.changes()
    }

    /// Row id of the most recent insert, while this result is active.
    pub fn last_insert_id(&self) -> Option<i64> {
        if !self.is_active() {
            return None;
        }
        self.session.last_insert_rowid().filter(|id| *id != 0)
    }

    /// Row counts are not known ahead of a full scan.
    pub fn size(&self) -> Option<usize> {
        None
    }

    pub fn numeric_precision(&self) -> NumericPrecision {
        self.precision
    }

    pub fn set_numeric_precision(&mut self, precision: NumericPrecision) {
        self.precision = precision;
    }
}

impl Drop for SqlResult {
    fn drop(&mut self) {
        self.slot.borrow_mut().take();
    }
}

/// Column descriptors for the statement's current row, or `None` when it
/// produces no columns. Storage tags are absent when there is no row.
fn describe(stmt: &RawStatement, empty: bool) -> Option<Vec<Column>> {
    let count = stmt.column_count();
    if count == 0 {
        return None;
    }
    let columns = (0..count)
        .map(|col| {
            let declared_type = stmt.column_decltype(col);
            let storage_tag = (!empty).then(|| stmt.column_tag(col));
            let mut column = Column::new(
                stmt.column_name(col).replace('"', ""),
                classify(&declared_type, storage_tag),
                stmt.column_table_name(col).replace('"', ""),
            );
            column.declared_type = declared_type;
            column.storage_tag = storage_tag;
            column
        })
        .collect();
    Some(columns)
}
