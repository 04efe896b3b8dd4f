//! Generic relational metadata model.
//!
//! A driver-neutral object model (data source, tables, columns, keys,
//! indexes, procedures) wired to the cache engines of
//! `dbworkbench-cache`. Any driver whose [`MetaSession`] can answer the
//! standard metadata queries gets a fully cached, navigable model for
//! free; vendor-specific models replace individual hooks instead of
//! rewriting the caching.
//!
//! [`MetaSession`]: dbworkbench_core::MetaSession

mod caches;
mod constraint;
mod data_source;
mod foreign_key;
mod index;
pub mod meta;
mod nodes;
mod procedure;
mod table;

pub use constraint::{ConstraintType, GenericConstraintColumn, GenericUniqueKey, TYPE_CONSTRAINT};
pub use data_source::{GenericDataSource, INVALID_TABLE_TYPES, TYPE_DATASOURCE};
pub use foreign_key::{
    Deferability, GenericForeignKey, GenericForeignKeyColumn, ModifyRule, TYPE_FOREIGN_KEY,
};
pub use index::{GenericIndex, GenericIndexColumn, IndexType, TYPE_INDEX};
pub use nodes::attach_data_source_node;
pub use procedure::{GenericPackage, GenericProcedure, ProcedureType, TYPE_PACKAGE, TYPE_PROCEDURE};
pub use table::{GenericColumn, GenericTable, TYPE_COLUMN, TYPE_TABLE};
