//! Statement builders backed by `sea-query`.
//!
//! Every builder validates its required arguments first, so a missing table
//! name or an empty value set is reported before any SQL is produced.

use sea_query::{
    Alias, Asterisk, Condition, Expr, ExprTrait, Func, JoinType, MysqlQueryBuilder, Order,
    PostgresQueryBuilder, Query, SelectStatement, SqliteQueryBuilder, Value,
};
use serde_json::Value as JsonValue;

use crate::dialect::{Dialect, Row};
use crate::error::StatementError;
use crate::options::{GroupOptions, JoinKind, JoinOptions, SelectOptions, Where};

macro_rules! render {
    ($dialect:expr, $stmt:expr) => {
        match $dialect {
            Dialect::Sqlite => $stmt.to_string(SqliteQueryBuilder),
            Dialect::Mysql => $stmt.to_string(MysqlQueryBuilder),
            Dialect::Postgres => $stmt.to_string(PostgresQueryBuilder),
        }
    };
}

fn require_table(table: &str) -> Result<(), StatementError> {
    if table.trim().is_empty() {
        return Err(StatementError::MissingTableName);
    }
    Ok(())
}

/// Maps a JSON value onto a sea-query literal.
fn literal(value: &JsonValue) -> Value {
    match value {
        // BigInt(None) renders as NULL in every backend
        JsonValue::Null => Value::BigInt(None),
        JsonValue::Bool(b) => Value::Bool(Some(*b)),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::BigInt(Some(i))
            } else if let Some(u) = n.as_u64() {
                Value::BigUnsigned(Some(u))
            } else if let Some(f) = n.as_f64() {
                Value::Double(Some(f))
            } else {
                Value::String(Some(n.to_string()))
            }
        }
        JsonValue::String(s) => Value::String(Some(s.clone())),
        JsonValue::Array(_) | JsonValue::Object(_) => Value::String(Some(value.to_string())),
    }
}

/// Column reference accepting `column`, `table.column`, `*` and `table.*`.
fn column(name: &str) -> Expr {
    match name.split_once('.') {
        Some((table, "*")) => Expr::col((Alias::new(table), Asterisk)),
        Some((table, col)) => Expr::col((Alias::new(table), Alias::new(col))),
        None if name == "*" => Expr::col(Asterisk),
        None => Expr::col(Alias::new(name)),
    }
}

/// Select-list entry: a column reference, or a raw expression such as
/// `COUNT(*) AS n` passed through verbatim.
fn field(name: &str) -> Expr {
    let plain = name
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '*'));
    if plain {
        column(name)
    } else {
        Expr::cust(name.to_string())
    }
}

fn predicates(filter: &Where) -> Vec<Expr> {
    let raw = filter.raw_parts().iter().map(|sql| Expr::cust(sql.clone()));
    let fields = filter.fields().iter().map(|(col, value)| {
        if value.is_null() {
            column(col).is_null()
        } else {
            column(col).eq(literal(value))
        }
    });
    raw.chain(fields).collect()
}

fn select_statement(table: &str, options: &SelectOptions) -> Result<SelectStatement, StatementError> {
    require_table(table)?;

    let mut stmt = Query::select();
    stmt.from(Alias::new(table));

    if options.fields.is_empty() {
        stmt.column(Asterisk);
    } else {
        for name in &options.fields {
            stmt.expr(field(name));
        }
    }

    if let Some(filter) = &options.filter {
        for predicate in predicates(filter) {
            stmt.and_where(predicate);
        }
    }

    for term in &options.order {
        let order = if term.descending { Order::Desc } else { Order::Asc };
        match term.column.split_once('.') {
            Some((table, col)) => stmt.order_by((Alias::new(table), Alias::new(col)), order),
            None => stmt.order_by(Alias::new(term.column.as_str()), order),
        };
    }

    if let Some(limit) = options.limit {
        stmt.limit(limit);
    }
    if let Some(offset) = options.offset {
        stmt.offset(offset);
    }

    Ok(stmt)
}

fn apply_group(stmt: &mut SelectStatement, group: &GroupOptions) {
    for col in &group.group {
        match col.split_once('.') {
            Some((table, name)) => stmt.group_by_col((Alias::new(table), Alias::new(name))),
            None => stmt.group_by_col(Alias::new(col.as_str())),
        };
    }
    if let Some(having) = &group.having {
        for predicate in predicates(having) {
            stmt.and_having(predicate);
        }
    }
}

fn apply_join(stmt: &mut SelectStatement, join: &JoinOptions) -> Result<(), StatementError> {
    require_table(&join.table)?;

    let join_type = match join.kind {
        JoinKind::Inner => JoinType::InnerJoin,
        JoinKind::Left => JoinType::LeftJoin,
        JoinKind::Right => JoinType::RightJoin,
        JoinKind::Full => JoinType::FullOuterJoin,
        JoinKind::Cross => JoinType::CrossJoin,
    };

    match join.on.as_deref().filter(|on| !on.trim().is_empty()) {
        Some(on) => stmt.join(join_type, Alias::new(join.table.as_str()), Expr::cust(on.to_string())),
        None => stmt.join(join_type, Alias::new(join.table.as_str()), Condition::all()),
    };
    Ok(())
}

/// Builds `INSERT INTO table (...) VALUES (...)`.
///
/// # Errors
///
/// `MissingTableName` for an empty table, `MissingValues` for an empty row.
pub fn query_insert(dialect: Dialect, table: &str, values: &Row) -> Result<String, StatementError> {
    require_table(table)?;
    if values.is_empty() {
        return Err(StatementError::MissingValues);
    }

    let mut stmt = Query::insert();
    stmt.into_table(Alias::new(table));
    stmt.columns(values.keys().map(|k| Alias::new(k.as_str())));
    let exprs: Vec<Expr> = values.values().map(|v| Expr::val(literal(v))).collect();
    stmt.values(exprs)
        .map_err(|e| StatementError::Build(e.to_string()))?;

    Ok(render!(dialect, stmt))
}

/// Builds a plain `SELECT`.
///
/// # Errors
///
/// `MissingTableName` for an empty table.
pub fn query_select(
    dialect: Dialect,
    table: &str,
    options: &SelectOptions,
) -> Result<String, StatementError> {
    let stmt = select_statement(table, options)?;
    Ok(render!(dialect, stmt))
}

/// Builds a `SELECT ... GROUP BY ... HAVING ...`.
///
/// # Errors
///
/// `MissingTableName` for an empty table.
pub fn query_select_group(
    dialect: Dialect,
    table: &str,
    options: &SelectOptions,
    group: &GroupOptions,
) -> Result<String, StatementError> {
    let mut stmt = select_statement(table, options)?;
    apply_group(&mut stmt, group);
    Ok(render!(dialect, stmt))
}

/// Builds a `SELECT` with one join.
///
/// # Errors
///
/// `MissingTableName` when either the base or the joined table is empty.
pub fn query_select_join(
    dialect: Dialect,
    table: &str,
    join: &JoinOptions,
    options: &SelectOptions,
) -> Result<String, StatementError> {
    let mut stmt = select_statement(table, options)?;
    apply_join(&mut stmt, join)?;
    Ok(render!(dialect, stmt))
}

/// Builds a `SELECT` with one join plus grouping.
///
/// # Errors
///
/// `MissingTableName` when either the base or the joined table is empty.
pub fn query_select_join_group(
    dialect: Dialect,
    table: &str,
    join: &JoinOptions,
    options: &SelectOptions,
    group: &GroupOptions,
) -> Result<String, StatementError> {
    let mut stmt = select_statement(table, options)?;
    apply_join(&mut stmt, join)?;
    apply_group(&mut stmt, group);
    Ok(render!(dialect, stmt))
}

/// Builds `UPDATE table SET ... WHERE ...`.
///
/// An update without a condition is refused rather than rewriting the
/// whole table.
///
/// # Errors
///
/// `MissingTableName`, `MissingValues`, or `MissingWhereClause` when the
/// condition is absent or empty.
pub fn query_update(
    dialect: Dialect,
    table: &str,
    values: &Row,
    filter: Option<&Where>,
) -> Result<String, StatementError> {
    require_table(table)?;
    if values.is_empty() {
        return Err(StatementError::MissingValues);
    }
    let filter = filter
        .filter(|w| !w.is_empty())
        .ok_or(StatementError::MissingWhereClause)?;

    let mut stmt = Query::update();
    stmt.table(Alias::new(table));
    for (col, value) in values {
        stmt.value(Alias::new(col.as_str()), literal(value));
    }
    for predicate in predicates(filter) {
        stmt.and_where(predicate);
    }

    Ok(render!(dialect, stmt))
}

/// Builds `SELECT COUNT(*) AS count FROM table [WHERE ...]`.
///
/// # Errors
///
/// `MissingTableName` for an empty table.
pub fn query_count(
    dialect: Dialect,
    table: &str,
    filter: Option<&Where>,
) -> Result<String, StatementError> {
    require_table(table)?;

    let mut stmt = Query::select();
    stmt.from(Alias::new(table))
        .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("count"));
    if let Some(filter) = filter {
        for predicate in predicates(filter) {
            stmt.and_where(predicate);
        }
    }

    Ok(render!(dialect, stmt))
}
