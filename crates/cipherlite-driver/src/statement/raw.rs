//! Owned compiled statement over the engine's C interface.
//!
//! The safe rusqlite `Statement`/`Rows` pair borrows the connection and
//! cannot keep its step position across calls, so a result adapter drives
//! the statement directly. A `RawStatement` is finalized on drop.

use std::ffi::{c_char, c_int, c_void, CStr};
use std::ptr::{self, NonNull};
use std::slice;

use cipherlite_core::{DriverError, DriverResult, NumericPrecision, StorageTag, Value};
use rusqlite::ffi;

const PREPARE_CONTEXT: &str = "Unable to execute statement";
const BIND_CONTEXT: &str = "Unable to bind parameters";

/// A compiled statement.
///
/// Invariant: `db` outlives the statement. The owning session finalizes
/// every registered statement before closing the handle.
pub(crate) struct RawStatement {
    stmt: NonNull<ffi::sqlite3_stmt>,
    db: *mut ffi::sqlite3,
}

impl RawStatement {
    /// Compile exactly one statement from `sql`.
    ///
    /// Fails with `MultipleStatements` when anything but whitespace follows
    /// the first statement; the compiled statement is released in that case.
    ///
    /// # Safety
    ///
    /// `db` must be an open handle that stays open until the returned
    /// statement is dropped.
    pub(crate) unsafe fn prepare(db: *mut ffi::sqlite3, sql: &str) -> DriverResult<Self> {
        let len = c_int::try_from(sql.len()).map_err(|_| {
            DriverError::statement(PREPARE_CONTEXT, "statement text too long", ffi::SQLITE_TOOBIG)
        })?;

        let mut stmt: *mut ffi::sqlite3_stmt = ptr::null_mut();
        let mut tail: *const c_char = ptr::null();
        let rc = unsafe {
            ffi::sqlite3_prepare_v2(db, sql.as_ptr().cast::<c_char>(), len, &mut stmt, &mut tail)
        };
        if rc != ffi::SQLITE_OK {
            unsafe { ffi::sqlite3_finalize(stmt) };
            return Err(DriverError::statement(PREPARE_CONTEXT, unsafe { errmsg(db) }, rc));
        }

        // Empty input or a lone comment compiles to nothing.
        let Some(stmt) = NonNull::new(stmt) else {
            return Err(DriverError::statement(
                PREPARE_CONTEXT,
                "statement is empty",
                ffi::SQLITE_MISUSE,
            ));
        };
        let raw = Self { stmt, db };

        if !tail.is_null() {
            let consumed = (tail as usize).saturating_sub(sql.as_ptr() as usize);
            if sql.get(consumed..).is_some_and(|rest| !rest.trim().is_empty()) {
                return Err(DriverError::MultipleStatements);
            }
        }
        Ok(raw)
    }

    pub(crate) fn step(&self) -> c_int {
        unsafe { ffi::sqlite3_step(self.stmt.as_ptr()) }
    }

    /// Rewind for re-execution. Returns the result of the last step.
    pub(crate) fn reset(&self) -> c_int {
        unsafe { ffi::sqlite3_reset(self.stmt.as_ptr()) }
    }

    /// Most recent error message on the owning connection.
    pub(crate) fn errmsg(&self) -> String {
        unsafe { errmsg(self.db) }
    }

    pub(crate) fn parameter_count(&self) -> usize {
        let n = unsafe { ffi::sqlite3_bind_parameter_count(self.stmt.as_ptr()) };
        usize::try_from(n).unwrap_or(0)
    }

    /// Names of every placeholder slot in order; `None` for bare `?`.
    pub(crate) fn parameter_names(&self) -> Vec<Option<String>> {
        (1..=self.parameter_count())
            .map(|index| {
                let index = to_c_int(index);
                let name = unsafe { ffi::sqlite3_bind_parameter_name(self.stmt.as_ptr(), index) };
                if name.is_null() {
                    None
                } else {
                    Some(unsafe { cstr_lossy(name) })
                }
            })
            .collect()
    }

    /// Bind `value` to the 1-based slot `index`.
    pub(crate) fn bind(&self, index: usize, value: &Value) -> DriverResult<()> {
        let stmt = self.stmt.as_ptr();
        let index = to_c_int(index);
        let rc = match value {
            Value::Null => unsafe { ffi::sqlite3_bind_null(stmt, index) },
            Value::Bool(b) => unsafe { ffi::sqlite3_bind_int(stmt, index, c_int::from(*b)) },
            Value::Int(v) => unsafe { ffi::sqlite3_bind_int(stmt, index, *v) },
            Value::BigInt(v) => unsafe { ffi::sqlite3_bind_int64(stmt, index, *v) },
            Value::Double(v) => unsafe { ffi::sqlite3_bind_double(stmt, index, *v) },
            Value::Bytes(bytes) => {
                let n = bind_len(bytes.len())?;
                // A non-null pointer keeps an empty vector a zero-length blob
                // rather than NULL.
                unsafe {
                    ffi::sqlite3_bind_blob(
                        stmt,
                        index,
                        bytes.as_ptr().cast::<c_void>(),
                        n,
                        ffi::SQLITE_TRANSIENT(),
                    )
                }
            }
            Value::Text(text) => self.bind_text(index, text)?,
            Value::DateTime(_) | Value::Date(_) | Value::Time(_) => {
                self.bind_text(index, &value.to_string())?
            }
        };
        if rc == ffi::SQLITE_OK {
            Ok(())
        } else {
            Err(DriverError::statement(BIND_CONTEXT, self.errmsg(), rc))
        }
    }

    fn bind_text(&self, index: c_int, text: &str) -> DriverResult<c_int> {
        let n = bind_len(text.len())?;
        Ok(unsafe {
            ffi::sqlite3_bind_text(
                self.stmt.as_ptr(),
                index,
                text.as_ptr().cast::<c_char>(),
                n,
                ffi::SQLITE_TRANSIENT(),
            )
        })
    }

    pub(crate) fn column_count(&self) -> usize {
        let n = unsafe { ffi::sqlite3_column_count(self.stmt.as_ptr()) };
        usize::try_from(n).unwrap_or(0)
    }

    pub(crate) fn column_name(&self, col: usize) -> String {
        unsafe { cstr_lossy(ffi::sqlite3_column_name(self.stmt.as_ptr(), to_c_int(col))) }
    }

    /// Originating table, empty for expressions.
    pub(crate) fn column_table_name(&self, col: usize) -> String {
        unsafe { cstr_lossy(ffi::sqlite3_column_table_name(self.stmt.as_ptr(), to_c_int(col))) }
    }

    /// Declared type, empty for expressions.
    pub(crate) fn column_decltype(&self, col: usize) -> String {
        unsafe { cstr_lossy(ffi::sqlite3_column_decltype(self.stmt.as_ptr(), to_c_int(col))) }
    }

    /// Storage class of `col` in the current row.
    pub(crate) fn column_tag(&self, col: usize) -> StorageTag {
        StorageTag::from_code(unsafe { ffi::sqlite3_column_type(self.stmt.as_ptr(), to_c_int(col)) })
    }

    /// Copy `col` of the current row out of engine memory.
    pub(crate) fn read_value(&self, index: usize, precision: NumericPrecision) -> Value {
        let stmt = self.stmt.as_ptr();
        let col = to_c_int(index);
        match self.column_tag(index) {
            StorageTag::Null => Value::Null,
            StorageTag::Integer => Value::BigInt(unsafe { ffi::sqlite3_column_int64(stmt, col) }),
            StorageTag::Float => match precision {
                NumericPrecision::LowInt32 => Value::Int(unsafe { ffi::sqlite3_column_int(stmt, col) }),
                NumericPrecision::LowInt64 => {
                    Value::BigInt(unsafe { ffi::sqlite3_column_int64(stmt, col) })
                }
                NumericPrecision::LowDouble | NumericPrecision::High => {
                    Value::Double(unsafe { ffi::sqlite3_column_double(stmt, col) })
                }
            },
            StorageTag::Blob => {
                // The pointer must be fetched before the length.
                let data = unsafe { ffi::sqlite3_column_blob(stmt, col) };
                let len = unsafe { ffi::sqlite3_column_bytes(stmt, col) };
                Value::Bytes(unsafe { copy_bytes(data.cast::<u8>(), len) })
            }
            StorageTag::Text => {
                let data = unsafe { ffi::sqlite3_column_text(stmt, col) };
                let len = unsafe { ffi::sqlite3_column_bytes(stmt, col) };
                let bytes = unsafe { copy_bytes(data, len) };
                Value::Text(match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
                })
            }
        }
    }
}

impl Drop for RawStatement {
    fn drop(&mut self) {
        unsafe { ffi::sqlite3_finalize(self.stmt.as_ptr()) };
    }
}

/// Byte length of a blob or text value as the engine expects it. Checked
/// here because the engine never sees an oversized value.
fn bind_len(len: usize) -> DriverResult<c_int> {
    c_int::try_from(len).map_err(|_| {
        DriverError::statement(BIND_CONTEXT, "value too large to bind", ffi::SQLITE_TOOBIG)
    })
}

fn to_c_int(index: usize) -> c_int {
    c_int::try_from(index).unwrap_or(c_int::MAX)
}

unsafe fn errmsg(db: *mut ffi::sqlite3) -> String {
    unsafe { cstr_lossy(ffi::sqlite3_errmsg(db)) }
}

unsafe fn cstr_lossy(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

unsafe fn copy_bytes(data: *const u8, len: c_int) -> Vec<u8> {
    match usize::try_from(len) {
        Ok(len) if len > 0 && !data.is_null() => unsafe { slice::from_raw_parts(data, len) }.to_vec(),
        _ => Vec::new(),
    }
}
