//! DBWorkbench - cached database metadata with a navigable object tree.
//!
//! DBWorkbench reads relational metadata (tables, columns, keys,
//! indexes, procedures) through driver-neutral sessions and caches it
//! in layered, idempotent caches:
//!
//! - Flat object lists load once and are shared (`ObjectCache`).
//! - Parent-owned children load per parent or in one bulk scan
//!   attributed back by name (`StructCache`).
//! - Composite objects are folded together from one-part-per-row
//!   result sets (`CompositeCache`).
//!
//! On top sits a navigator model mapping metadata objects to tree
//! nodes, with listener events for every tree change and workspace
//! project tracking.
//!
//! # Quick start
//!
//! ```ignore
//! use dbworkbench::{
//!     CacheConfig, ConnectionConfig, Cx, GenericDataSource, NavigatorModel,
//!     attach_data_source_node,
//! };
//!
//! fn browse(cx: &Cx, session: std::sync::Arc<dyn dbworkbench::MetaSession>) {
//!     let ds = GenericDataSource::new(
//!         "sales",
//!         ConnectionConfig::new("db://localhost/sales"),
//!         CacheConfig::default(),
//!         session,
//!     );
//!     for table in ds.tables(cx).unwrap() {
//!         for column in table.columns(cx).unwrap() {
//!             println!("{}.{}", table.name(), column.name());
//!         }
//!     }
//!
//!     let model = NavigatorModel::new();
//!     model.initialize(None);
//!     let project = model.add_project(dbworkbench::Project::new("default"), false).unwrap();
//!     attach_data_source_node(&model, &project, &ds);
//! }
//! ```

pub use dbworkbench_core::{
    // asupersync re-exports
    Cx,
    Outcome,
    // Configuration
    CacheConfig,
    ConnectionConfig,
    // Errors
    ConfigError,
    ConnectionError,
    ConnectionErrorKind,
    Error,
    QueryError,
    QueryErrorKind,
    Result,
    TypeError,
    // Object identity
    DbObject,
    NameMatch,
    ObjectId,
    ObjectType,
    find_object,
    // Rows and sessions
    ColumnSet,
    FromValue,
    MetaQuery,
    MetaSession,
    Row,
    RowStream,
    Value,
    VecRowStream,
};

pub use dbworkbench_cache::{
    CompositeCache, CompositeHooks, ObjectCache, ObjectHooks, StructCache, StructHooks,
};

pub use dbworkbench_navigator::{
    ChildrenProvider, NavAction, NavEvent, NavListener, NavNode, NavigatorModel, NodeChange,
    NodeKind, Project, ResourceChangeListener, ResourceDelta, ResourceDeltaKind, ResourceEvent,
    ResourceHub, ResourceNotifier,
};

pub use dbworkbench_generic::{
    ConstraintType, Deferability, GenericColumn, GenericConstraintColumn, GenericDataSource,
    GenericForeignKey, GenericForeignKeyColumn, GenericIndex, GenericIndexColumn, GenericPackage,
    GenericProcedure, GenericTable, GenericUniqueKey, INVALID_TABLE_TYPES, IndexType, ModifyRule,
    ProcedureType, attach_data_source_node, meta,
};
