//! Core types and traits for DBWorkbench.
//!
//! This crate provides the foundational abstractions shared by the metadata
//! caches and the navigator model:
//!
//! - `DbObject` trait with stable identity tokens for all database objects
//! - `Row`/`Value` result representation for metadata queries
//! - `MetaSession`/`RowStream` collaborator traits for remote introspection
//! - `Error` taxonomy for connection, query and cancellation failures
//! - `Cx` context re-export from asupersync for cancel-correct loads

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod config;
pub mod error;
pub mod object;
pub mod row;
pub mod session;
pub mod value;

pub use config::{CacheConfig, ConnectionConfig};
pub use error::{
    ConfigError, ConnectionError, ConnectionErrorKind, Error, QueryError, QueryErrorKind, Result,
    TypeError,
};
pub use object::{DbObject, NameMatch, ObjectId, ObjectType, find_object};
pub use row::{ColumnSet, FromValue, Row};
pub use session::{MetaQuery, MetaSession, RowStream, VecRowStream};
pub use value::Value;
