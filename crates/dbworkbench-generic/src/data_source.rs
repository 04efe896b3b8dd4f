//! The generic data source: caches wired to a metadata session.

use std::sync::{Arc, Weak};

use dbworkbench_cache::{CompositeCache, ObjectCache, StructCache};
use dbworkbench_core::{
    CacheConfig, ConnectionConfig, Cx, DbObject, MetaSession, NameMatch, ObjectId, ObjectType,
    Result,
};

use crate::caches::{ConstraintHooks, ForeignKeyHooks, IndexHooks, ProcedureHooks, TableHooks};
use crate::foreign_key::GenericForeignKey;
use crate::index::GenericIndex;
use crate::meta;
use crate::procedure::{GenericPackage, GenericProcedure};
use crate::table::GenericTable;

pub const TYPE_DATASOURCE: ObjectType = ObjectType::new("data source");

/// Table types that never surface as tables. Sources that expose
/// indexes and sequences through the table listing get them filtered
/// out here; they arrive through their own caches instead.
pub const INVALID_TABLE_TYPES: &[&str] =
    &["INDEX", "SEQUENCE", "SYSTEM INDEX", "SYSTEM SEQUENCE"];

/// A driver-neutral data source.
///
/// Owns one metadata session and the full set of caches over it:
/// tables with their columns, indexes, unique keys, foreign keys and
/// procedures. Everything loads lazily and at most once until
/// [`refresh`](Self::refresh) drops the cached state.
pub struct GenericDataSource {
    id: ObjectId,
    name: String,
    config: ConnectionConfig,
    cache_config: CacheConfig,
    meta: Arc<dyn MetaSession>,
    name_match: NameMatch,
    table_cache: StructCache<TableHooks>,
    index_cache: CompositeCache<IndexHooks>,
    constraint_cache: CompositeCache<ConstraintHooks>,
    fk_cache: CompositeCache<ForeignKeyHooks>,
    procedure_cache: ObjectCache<ProcedureHooks>,
}

impl GenericDataSource {
    pub fn new(
        name: impl Into<String>,
        config: ConnectionConfig,
        cache_config: CacheConfig,
        meta: Arc<dyn MetaSession>,
    ) -> Arc<Self> {
        // Generic sources fold identifier case, so lookups do too.
        let name_match = NameMatch::Insensitive;
        Arc::new_cyclic(|ds: &Weak<Self>| Self {
            id: ObjectId::next(),
            name: name.into(),
            table_cache: StructCache::new(TableHooks::new(ds.clone()), meta::TABLE_NAME)
                .with_config(&cache_config)
                .with_name_match(name_match),
            index_cache: CompositeCache::new(
                IndexHooks::new(ds.clone()),
                meta::TABLE_NAME,
                meta::INDEX_NAME,
            )
            .with_config(&cache_config)
            .with_name_match(name_match),
            constraint_cache: CompositeCache::new(
                ConstraintHooks::new(ds.clone()),
                meta::TABLE_NAME,
                meta::PK_NAME,
            )
            .with_config(&cache_config)
            .with_name_match(name_match),
            fk_cache: CompositeCache::new(
                ForeignKeyHooks::new(ds.clone()),
                meta::FKTABLE_NAME,
                meta::FK_NAME,
            )
            .with_config(&cache_config)
            .with_name_match(name_match),
            procedure_cache: ObjectCache::new(ProcedureHooks::new(ds.clone()))
                .with_config(&cache_config)
                .with_name_match(name_match),
            config,
            cache_config,
            meta,
            name_match,
        })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn cache_config(&self) -> &CacheConfig {
        &self.cache_config
    }

    pub fn show_system_objects(&self) -> bool {
        self.config.show_system_objects
    }

    pub fn session(&self) -> &dyn MetaSession {
        self.meta.as_ref()
    }

    pub fn name_match(&self) -> NameMatch {
        self.name_match
    }

    pub fn tables(&self, cx: &Cx) -> Result<Vec<Arc<GenericTable>>> {
        self.table_cache.get_objects(cx, self.session())
    }

    pub fn table(&self, cx: &Cx, name: &str) -> Result<Option<Arc<GenericTable>>> {
        self.table_cache.get_object(cx, self.session(), name)
    }

    /// Pre-loads the table list and, when the source supports bulk
    /// scans, every table's columns in one query.
    pub fn cache_structure(&self, cx: &Cx) -> Result<()> {
        self.tables(cx)?;
        if self.cache_config.bulk_children_load {
            self.table_cache.load_children(cx, self.session(), None)?;
        }
        Ok(())
    }

    /// All indexes across all tables.
    pub fn indexes(&self, cx: &Cx) -> Result<Vec<Arc<GenericIndex>>> {
        self.index_cache.get_objects(cx, self.session())
    }

    /// All foreign keys across all tables.
    pub fn foreign_keys(&self, cx: &Cx) -> Result<Vec<Arc<GenericForeignKey>>> {
        self.fk_cache.get_objects(cx, self.session())
    }

    pub fn procedures(&self, cx: &Cx) -> Result<Vec<Arc<GenericProcedure>>> {
        self.procedure_cache.get_objects(cx, self.session())
    }

    /// Packages seen while loading procedures.
    pub fn packages(&self) -> Vec<Arc<GenericPackage>> {
        self.procedure_cache.hooks().packages()
    }

    /// Procedures grouped under one package.
    pub fn package_procedures(
        &self,
        cx: &Cx,
        package: &Arc<GenericPackage>,
    ) -> Result<Vec<Arc<GenericProcedure>>> {
        let procedures = self.procedures(cx)?;
        Ok(procedures
            .into_iter()
            .filter(|p| {
                p.package()
                    .is_some_and(|owner| Arc::ptr_eq(owner, package))
            })
            .collect())
    }

    /// Drops every cached list and side table. Old object instances
    /// stay alive for existing holders; the next access re-reads the
    /// source and produces fresh ones.
    pub fn refresh(&self) {
        self.table_cache.clear();
        self.index_cache.clear();
        self.constraint_cache.clear();
        self.fk_cache.clear();
        self.fk_cache.hooks().clear_state();
        self.procedure_cache.clear();
        self.procedure_cache.hooks().clear_packages();
    }

    pub(crate) fn table_cache(&self) -> &StructCache<TableHooks> {
        &self.table_cache
    }

    pub(crate) fn index_cache(&self) -> &CompositeCache<IndexHooks> {
        &self.index_cache
    }

    pub(crate) fn constraint_cache(&self) -> &CompositeCache<ConstraintHooks> {
        &self.constraint_cache
    }

    pub(crate) fn fk_cache(&self) -> &CompositeCache<ForeignKeyHooks> {
        &self.fk_cache
    }
}

impl DbObject for GenericDataSource {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn object_type(&self) -> ObjectType {
        TYPE_DATASOURCE
    }
}
