//! SQL statement construction for lazysql.
//!
//! Turns structured parameters (table, fields, where condition, ordering,
//! limit, join, group/having) into ready-to-execute SQL strings. The actual
//! SQL generation is delegated to `sea-query`; this crate only validates the
//! required arguments and maps lazysql's parameter types onto it.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lazysql_query::{query_select, Dialect, SelectOptions, Where};
//!
//! let sql = query_select(
//!     Dialect::Sqlite,
//!     "users",
//!     &SelectOptions::new()
//!         .with_fields(["id", "name"])
//!         .with_filter(Where::eq("id", 5)),
//! )?;
//! assert_eq!(sql, r#"SELECT "id", "name" FROM "users" WHERE "id" = 5"#);
//! ```

mod builder;
mod dialect;
mod error;
mod options;

pub use builder::{
    query_count, query_insert, query_select, query_select_group, query_select_join,
    query_select_join_group, query_update,
};
pub use dialect::{Dialect, Row};
pub use error::StatementError;
pub use options::{GroupOptions, JoinKind, JoinOptions, OrderBy, SelectOptions, Where};
