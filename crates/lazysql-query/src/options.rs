//! Structured statement parameters.

use serde_json::Value;

use crate::dialect::Row;

/// A row-restricting predicate.
///
/// Combines raw SQL fragments and column equalities; every part is joined
/// with `AND`. An equality against JSON `null` compiles to `IS NULL`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Where {
    raw: Vec<String>,
    fields: Vec<(String, Value)>,
}

impl Where {
    /// A raw SQL predicate, inserted verbatim.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::default().and_raw(sql)
    }

    /// A single `column = value` equality.
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::default().and_eq(column, value)
    }

    /// Adds another raw predicate.
    pub fn and_raw(mut self, sql: impl Into<String>) -> Self {
        let sql = sql.into();
        if !sql.trim().is_empty() {
            self.raw.push(sql);
        }
        self
    }

    /// Adds another `column = value` equality.
    pub fn and_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((column.into(), value.into()));
        self
    }

    /// Raw predicates, in insertion order.
    pub fn raw_parts(&self) -> &[String] {
        &self.raw
    }

    /// Column equalities, in insertion order.
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    /// True when the condition restricts nothing.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty() && self.fields.is_empty()
    }
}

impl From<Row> for Where {
    fn from(row: Row) -> Self {
        Self {
            raw: Vec::new(),
            fields: row.into_iter().collect(),
        }
    }
}

impl From<&str> for Where {
    fn from(sql: &str) -> Self {
        Self::raw(sql)
    }
}

/// One `ORDER BY` term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Column name, optionally qualified as `table.column`.
    pub column: String,
    /// Sort descending instead of ascending.
    pub descending: bool,
}

impl OrderBy {
    /// Ascending order on `column`.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    /// Descending order on `column`.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }

    /// Parses `"column"`, `"column ASC"` or `"column DESC"`.
    pub fn parse(term: &str) -> Self {
        let mut parts = term.split_whitespace();
        let column = parts.next().unwrap_or_default().to_string();
        let descending = parts
            .next()
            .map(|dir| dir.eq_ignore_ascii_case("desc"))
            .unwrap_or(false);
        Self { column, descending }
    }
}

impl From<&str> for OrderBy {
    fn from(term: &str) -> Self {
        Self::parse(term)
    }
}

/// Parameters shared by every `SELECT` helper.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectOptions {
    /// Selected columns; empty selects `*`.
    pub fields: Vec<String>,
    /// Optional where condition.
    pub filter: Option<Where>,
    /// Ordering terms, applied in sequence.
    pub order: Vec<OrderBy>,
    /// Maximum number of rows.
    pub limit: Option<u64>,
    /// Number of rows to skip.
    pub offset: Option<u64>,
}

impl SelectOptions {
    /// Selects every column with no restriction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the selected columns.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the where condition.
    pub fn with_filter(mut self, filter: impl Into<Where>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Appends an ordering term.
    pub fn with_order(mut self, order: impl Into<OrderBy>) -> Self {
        self.order.push(order.into());
        self
    }

    /// Sets the row limit.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the row offset.
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// `GROUP BY` / `HAVING` parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupOptions {
    /// Grouping columns.
    pub group: Vec<String>,
    /// Optional having condition.
    pub having: Option<Where>,
}

impl GroupOptions {
    /// Groups by the given columns.
    pub fn by<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            group: columns.into_iter().map(Into::into).collect(),
            having: None,
        }
    }

    /// Sets the having condition.
    pub fn with_having(mut self, having: impl Into<Where>) -> Self {
        self.having = Some(having.into());
        self
    }
}

/// Join flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinKind {
    /// `INNER JOIN`
    #[default]
    Inner,
    /// `LEFT JOIN`
    Left,
    /// `RIGHT JOIN`
    Right,
    /// `FULL OUTER JOIN`
    Full,
    /// `CROSS JOIN`
    Cross,
}

/// Join parameters for the `select_join*` helpers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinOptions {
    /// Join flavour.
    pub kind: JoinKind,
    /// The joined table.
    pub table: String,
    /// Raw `ON` predicate.
    pub on: Option<String>,
}

impl JoinOptions {
    /// A join of the given kind with no `ON` predicate.
    pub fn new(kind: JoinKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            on: None,
        }
    }

    /// `INNER JOIN table ON on`.
    pub fn inner(table: impl Into<String>, on: impl Into<String>) -> Self {
        Self::new(JoinKind::Inner, table).with_on(on)
    }

    /// `LEFT JOIN table ON on`.
    pub fn left(table: impl Into<String>, on: impl Into<String>) -> Self {
        Self::new(JoinKind::Left, table).with_on(on)
    }

    /// Sets the `ON` predicate.
    pub fn with_on(mut self, on: impl Into<String>) -> Self {
        self.on = Some(on.into());
        self
    }
}
