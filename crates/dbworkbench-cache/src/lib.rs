//! Metadata caches for database object trees.
//!
//! Three cache shapes cover the ways relational metadata is read:
//!
//! - [`ObjectCache`] holds a flat list of objects produced by a single
//!   metadata query (tables of a schema, procedures of a catalog).
//! - [`StructCache`] extends the flat list with per-parent child rows
//!   (columns of a table), loadable one parent at a time or in one
//!   bulk scan attributed back to parents by name.
//! - [`CompositeCache`] reads rows that describe parts of composite
//!   objects (index columns, foreign-key columns) and folds them into
//!   whole objects grouped per parent, again per-parent or bulk.
//!
//! All caches are synchronized internally and idempotent: a second
//! load request observes the published result of the first. Loads are
//! driven by blocking row streams and poll the [`Cx`] between rows so
//! a cancelled load aborts without publishing partial state.
//!
//! [`Cx`]: dbworkbench_core::Cx

mod composite_cache;
mod object_cache;
mod struct_cache;

pub use composite_cache::{CompositeCache, CompositeHooks};
pub use object_cache::{ObjectCache, ObjectHooks};
pub use struct_cache::{StructCache, StructHooks};
