//! Generic select / insert / update / delete helpers over bound parameters.
//!
//! Every value reaches SQLite as a positional parameter; only table and column
//! names are spliced into the statement text, and those must be plain SQL
//! identifiers. Constraint failures come back as
//! [`NotesError::ConstraintViolation`](crate::NotesError::ConstraintViolation),
//! every other SQLite failure as [`NotesError::Database`](crate::NotesError::Database).

use crate::{NotesError, Result};
use regex::Regex;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::sync::LazyLock;

static IDENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").expect("valid regex")
});

/// Comparison applied by a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    NotEq,
    Lt,
    Gt,
    Like,
    IsNull,
    IsNotNull,
}

impl Op {
    fn sql(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::NotEq => "<>",
            Op::Lt => "<",
            Op::Gt => ">",
            Op::Like => "LIKE",
            Op::IsNull => "IS NULL",
            Op::IsNotNull => "IS NOT NULL",
        }
    }

    fn takes_value(self) -> bool {
        !matches!(self, Op::IsNull | Op::IsNotNull)
    }
}

/// One `column <op> ?` term of a WHERE clause. Terms are joined with `AND`.
#[derive(Debug, Clone)]
pub struct Condition<'a> {
    pub column: &'a str,
    pub op: Op,
    pub value: Value,
}

impl<'a> Condition<'a> {
    pub fn new(column: &'a str, op: Op, value: impl Into<Value>) -> Self {
        Self {
            column,
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: &'a str, value: impl Into<Value>) -> Self {
        Self::new(column, Op::Eq, value)
    }

    pub fn is_null(column: &'a str) -> Self {
        Self::new(column, Op::IsNull, Value::Null)
    }

    pub fn is_not_null(column: &'a str) -> Self {
        Self::new(column, Op::IsNotNull, Value::Null)
    }
}

/// Converts an optional foreign key into a bindable value.
pub fn nullable(id: Option<i64>) -> Value {
    id.map_or(Value::Null, Value::Integer)
}

/// Runs `SELECT fields FROM table WHERE conditions ORDER BY order_by` and maps each row.
pub fn select<T, F>(
    conn: &Connection,
    table: &str,
    fields: &[&str],
    conditions: &[Condition<'_>],
    order_by: &[&str],
    map: F,
) -> Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    check_identifier(table)?;
    if fields.is_empty() {
        return Err(NotesError::ValidationFailed(
            "select needs at least one field".to_string(),
        ));
    }
    for field in fields.iter().chain(order_by) {
        check_identifier(field)?;
    }

    let mut params = Vec::new();
    let mut sql = format!("SELECT {} FROM {table}", fields.join(", "));
    sql.push_str(&where_clause(conditions, &mut params)?);
    if !order_by.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&order_by.join(", "));
    }

    log::trace!("dao select: {sql}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), map)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Runs `INSERT INTO table (columns) VALUES (?, ...)` and returns the generated row id.
pub fn insert(conn: &Connection, table: &str, values: &[(&str, Value)]) -> Result<i64> {
    check_identifier(table)?;
    let sql = if values.is_empty() {
        format!("INSERT INTO {table} DEFAULT VALUES")
    } else {
        let mut columns = Vec::with_capacity(values.len());
        for (column, _) in values {
            check_identifier(column)?;
            columns.push(*column);
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders})",
            columns.join(", ")
        )
    };

    log::trace!("dao insert: {sql}");
    conn.execute(&sql, params_from_iter(values.iter().map(|(_, v)| v)))?;
    Ok(conn.last_insert_rowid())
}

/// Runs `UPDATE table SET column = ?, ... WHERE conditions` and returns the affected row count.
///
/// An empty condition list is refused so that a whole table is never rewritten by accident.
pub fn update(
    conn: &Connection,
    table: &str,
    values: &[(&str, Value)],
    conditions: &[Condition<'_>],
) -> Result<usize> {
    check_identifier(table)?;
    if values.is_empty() {
        return Err(NotesError::ValidationFailed(
            "update needs at least one column".to_string(),
        ));
    }
    require_conditions("update", conditions)?;

    let mut params: Vec<&Value> = Vec::with_capacity(values.len() + conditions.len());
    let mut assignments = Vec::with_capacity(values.len());
    for (column, value) in values {
        check_identifier(column)?;
        assignments.push(format!("{column} = ?"));
        params.push(value);
    }
    let mut sql = format!("UPDATE {table} SET {}", assignments.join(", "));
    sql.push_str(&where_clause(conditions, &mut params)?);

    log::trace!("dao update: {sql}");
    let changed = conn.execute(&sql, params_from_iter(params))?;
    Ok(changed)
}

/// Runs `DELETE FROM table WHERE conditions` and returns the affected row count.
pub fn delete(conn: &Connection, table: &str, conditions: &[Condition<'_>]) -> Result<usize> {
    check_identifier(table)?;
    require_conditions("delete", conditions)?;

    let mut params = Vec::with_capacity(conditions.len());
    let sql = format!(
        "DELETE FROM {table}{}",
        where_clause(conditions, &mut params)?
    );

    log::trace!("dao delete: {sql}");
    let changed = conn.execute(&sql, params_from_iter(params))?;
    Ok(changed)
}

fn where_clause<'v>(conditions: &'v [Condition<'_>], params: &mut Vec<&'v Value>) -> Result<String> {
    if conditions.is_empty() {
        return Ok(String::new());
    }
    let mut terms = Vec::with_capacity(conditions.len());
    for condition in conditions {
        check_identifier(condition.column)?;
        if condition.op.takes_value() {
            terms.push(format!("{} {} ?", condition.column, condition.op.sql()));
            params.push(&condition.value);
        } else {
            terms.push(format!("{} {}", condition.column, condition.op.sql()));
        }
    }
    Ok(format!(" WHERE {}", terms.join(" AND ")))
}

fn require_conditions(verb: &str, conditions: &[Condition<'_>]) -> Result<()> {
    if conditions.is_empty() {
        return Err(NotesError::ValidationFailed(format!(
            "{verb} without conditions is not allowed"
        )));
    }
    Ok(())
}

/// Accepts `[A-Za-z_][A-Za-z0-9_]*`, optionally qualified once with a dot.
fn check_identifier(name: &str) -> Result<()> {
    if IDENT_RE.is_match(name) {
        Ok(())
    } else {
        Err(NotesError::ValidationFailed(format!(
            "'{name}' is not a valid SQL identifier"
        )))
    }
}
