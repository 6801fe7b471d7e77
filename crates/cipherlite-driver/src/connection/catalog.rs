//! Schema introspection: table listing, column records and identifier quoting.

use std::ops::BitOr;

use cipherlite_core::{classify, Column, DriverResult, Value};

use super::Connection;
use crate::statement::BoundValues;

/// Which kinds of table `Connection::tables` lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableKind {
    pub tables: bool,
    pub views: bool,
    pub system: bool,
}

impl TableKind {
    pub const TABLES: Self = Self { tables: true, views: false, system: false };
    pub const VIEWS: Self = Self { tables: false, views: true, system: false };
    pub const SYSTEM: Self = Self { tables: false, views: false, system: true };
    pub const ALL: Self = Self { tables: true, views: true, system: true };
}

impl BitOr for TableKind {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            tables: self.tables || rhs.tables,
            views: self.views || rhs.views,
            system: self.system || rhs.system,
        }
    }
}

/// `PRAGMA table_info` column positions.
const INFO_NAME: usize = 1;
const INFO_TYPE: usize = 2;
const INFO_NOT_NULL: usize = 3;
const INFO_DEFAULT: usize = 4;
const INFO_PK: usize = 5;

impl Connection {
    /// Names of user tables and/or views in the main and temp schemas.
    /// The schema table itself is reported as `sqlite_master` when system
    /// tables are requested.
    pub fn tables(&self, kind: TableKind) -> DriverResult<Vec<String>> {
        self.ensure_open()?;
        let mut names = Vec::new();

        let filter = match (kind.tables, kind.views) {
            (true, true) => Some("type='table' OR type='view'"),
            (true, false) => Some("type='table'"),
            (false, true) => Some("type='view'"),
            (false, false) => None,
        };
        if let Some(filter) = filter {
            let sql = format!(
                "SELECT name FROM sqlite_master WHERE {filter} \
                 UNION ALL SELECT name FROM sqlite_temp_master WHERE {filter}"
            );
            let mut query = self.create_result();
            query.exec_direct(&sql, &BoundValues::new())?;
            while let Some(row) = query.next_row()? {
                if let Some(name) = row.first().and_then(Value::to_text) {
                    names.push(name);
                }
            }
        }

        if kind.system {
            names.push("sqlite_master".to_string());
        }
        Ok(names)
    }

    /// Every column of `table` with its schema metadata.
    pub fn record(&self, table: &str) -> DriverResult<Vec<Column>> {
        self.table_info(table, false)
    }

    /// The primary-key columns of `table`, in declaration order.
    pub fn primary_index(&self, table: &str) -> DriverResult<Vec<Column>> {
        self.table_info(table, true)
    }

    fn table_info(&self, table: &str, only_primary_key: bool) -> DriverResult<Vec<Column>> {
        self.ensure_open()?;
        let (schema, table) = split_qualified(table);
        let sql = match &schema {
            Some(schema) => format!("PRAGMA {}.table_info({})", quote(schema), quote(&table)),
            None => format!("PRAGMA table_info({})", quote(&table)),
        };

        let mut query = self.create_result();
        query.exec_direct(&sql, &BoundValues::new())?;
        let mut rows = Vec::new();
        while let Some(row) = query.next_row()? {
            rows.push(row);
        }

        let pk_columns = rows.iter().filter(|row| is_primary_key(row)).count();
        let columns = rows
            .iter()
            .filter(|row| !only_primary_key || is_primary_key(row))
            .map(|row| {
                let declared = text_at(row, INFO_TYPE).unwrap_or_default();
                let primary_key = is_primary_key(row);
                let mut column = Column::new(
                    text_at(row, INFO_NAME).unwrap_or_default(),
                    classify(&declared, None),
                    table.clone(),
                );
                column.required = Some(row.get(INFO_NOT_NULL).and_then(Value::as_i64).unwrap_or(0) != 0);
                column.default_value = text_at(row, INFO_DEFAULT).map(|d| strip_single_quotes(&d));
                column.primary_key = primary_key;
                column.auto_value =
                    primary_key && pk_columns == 1 && declared.eq_ignore_ascii_case("integer");
                column.declared_type = declared;
                column
            })
            .collect();
        Ok(columns)
    }
}

fn text_at(row: &[Value], index: usize) -> Option<String> {
    row.get(index).and_then(Value::to_text)
}

fn is_primary_key(row: &[Value]) -> bool {
    row.get(INFO_PK).and_then(Value::as_i64).unwrap_or(0) > 0
}

/// Quote `identifier` for use in SQL, quoting each `.`-separated part.
/// Empty and already-quoted names are returned unchanged.
pub fn escape_identifier(identifier: &str) -> String {
    if identifier.is_empty() || identifier.starts_with('"') || identifier.ends_with('"') {
        return identifier.to_string();
    }
    let doubled = identifier.replace('"', "\"\"");
    format!("\"{}\"", doubled.replace('.', "\".\""))
}

/// Split `schema.table` on the first `.` outside double quotes and unquote
/// both parts.
fn split_qualified(name: &str) -> (Option<String>, String) {
    let mut in_quotes = false;
    for (index, ch) in name.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '.' if !in_quotes => {
                return (Some(unquote(&name[..index])), unquote(&name[index + 1..]));
            }
            _ => {}
        }
    }
    (None, unquote(name))
}

fn quote(part: &str) -> String {
    format!("\"{}\"", part.replace('"', "\"\""))
}

fn unquote(part: &str) -> String {
    match part.strip_prefix('"').and_then(|p| p.strip_suffix('"')) {
        Some(inner) => inner.replace("\"\"", "\""),
        None => part.to_string(),
    }
}

/// `'abc'` becomes `abc`; anything else is kept as written.
fn strip_single_quotes(literal: &str) -> String {
    if literal.starts_with('\'') {
        if let Some(end) = literal.rfind('\'').filter(|end| *end > 0) {
            return literal[1..end].to_string();
        }
    }
    literal.to_string()
}
