//! Cache hook implementations for the generic model.

use std::collections::{BTreeMap, HashMap};
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, Weak};

use dbworkbench_cache::{CompositeHooks, ObjectHooks, StructHooks};
use dbworkbench_core::{Cx, DbObject, Error, MetaQuery, MetaSession, Result, Row, RowStream};
use tracing::{debug, warn};

use crate::constraint::{ConstraintType, GenericConstraintColumn, GenericUniqueKey};
use crate::data_source::{GenericDataSource, INVALID_TABLE_TYPES};
use crate::foreign_key::{
    Deferability, GenericForeignKey, GenericForeignKeyColumn, ModifyRule,
};
use crate::index::{GenericIndex, GenericIndexColumn, IndexType};
use crate::meta;
use crate::procedure::{GenericPackage, GenericProcedure, ProcedureType};
use crate::table::{GenericColumn, GenericTable};

fn alive(ds: &Weak<GenericDataSource>) -> Result<Arc<GenericDataSource>> {
    ds.upgrade()
        .ok_or_else(|| Error::database("data source is no longer alive"))
}

/// Tables and their columns.
pub(crate) struct TableHooks {
    ds: Weak<GenericDataSource>,
}

impl TableHooks {
    pub(crate) fn new(ds: Weak<GenericDataSource>) -> Self {
        Self { ds }
    }
}

impl StructHooks for TableHooks {
    type Object = GenericTable;
    type Child = Arc<GenericColumn>;

    fn prepare_objects<'s>(
        &self,
        cx: &Cx,
        session: &'s dyn MetaSession,
    ) -> Result<Box<dyn RowStream + 's>> {
        session.query_meta(cx, &MetaQuery::Tables { schema: None })
    }

    fn fetch_object(&self, _cx: &Cx, row: &Row) -> Result<Option<GenericTable>> {
        let Some(name) = row.safe_string(meta::TABLE_NAME) else {
            return Ok(None);
        };
        let table_type = row.safe_string(meta::TABLE_TYPE).unwrap_or_default();
        let upper = table_type.to_ascii_uppercase();
        if INVALID_TABLE_TYPES.contains(&upper.as_str()) {
            return Ok(None);
        }
        let ds = alive(&self.ds)?;
        if upper.contains("SYSTEM") && !ds.show_system_objects() {
            return Ok(None);
        }
        Ok(Some(GenericTable::new(
            name,
            table_type,
            row.safe_string(meta::REMARKS),
            self.ds.clone(),
        )))
    }

    fn prepare_children<'s>(
        &self,
        cx: &Cx,
        session: &'s dyn MetaSession,
        for_parent: Option<&Arc<GenericTable>>,
    ) -> Result<Box<dyn RowStream + 's>> {
        session.query_meta(
            cx,
            &MetaQuery::Columns {
                schema: None,
                table: for_parent.map(|t| t.name().to_owned()),
            },
        )
    }

    fn fetch_child(
        &self,
        _cx: &Cx,
        row: &Row,
        parent: &Arc<GenericTable>,
    ) -> Result<Option<Arc<GenericColumn>>> {
        let Some(name) = row.safe_string(meta::COLUMN_NAME) else {
            return Ok(None);
        };
        Ok(Some(Arc::new(GenericColumn::new(
            name,
            Arc::downgrade(parent),
            row.safe_string(meta::TYPE_NAME).unwrap_or_default(),
            row.safe_int(meta::DATA_TYPE),
            row.safe_int(meta::ORDINAL_POSITION),
            i64::from(row.safe_int(meta::COLUMN_SIZE)),
            row.safe_int(meta::DECIMAL_DIGITS),
            row.safe_int(meta::NULLABLE) != 0,
            row.safe_string(meta::COLUMN_DEF),
            row.safe_string(meta::REMARKS),
            row.safe_string(meta::IS_AUTOINCREMENT)
                .is_some_and(|v| v.eq_ignore_ascii_case("YES")),
        ))))
    }

    fn is_children_cached(&self, parent: &GenericTable) -> bool {
        parent.columns.read().expect("table lock poisoned").is_some()
    }

    fn cache_children(&self, parent: &Arc<GenericTable>, children: Vec<Arc<GenericColumn>>) {
        *parent.columns.write().expect("table lock poisoned") = Some(children);
    }
}

/// Indexes, one metadata row per indexed column.
pub(crate) struct IndexHooks {
    ds: Weak<GenericDataSource>,
}

impl IndexHooks {
    pub(crate) fn new(ds: Weak<GenericDataSource>) -> Self {
        Self { ds }
    }
}

impl CompositeHooks for IndexHooks {
    type Parent = GenericTable;
    type Object = GenericIndex;
    type RowChild = GenericIndexColumn;

    fn prepare_objects<'s>(
        &self,
        cx: &Cx,
        session: &'s dyn MetaSession,
        for_parent: Option<&Arc<GenericTable>>,
    ) -> Result<Box<dyn RowStream + 's>> {
        session.query_meta(
            cx,
            &MetaQuery::Indexes {
                schema: None,
                table: for_parent.map(|t| t.name().to_owned()),
            },
        )
    }

    fn fetch_object(
        &self,
        _cx: &Cx,
        row: &Row,
        parent: &Arc<GenericTable>,
        object_name: &str,
    ) -> Result<Option<GenericIndex>> {
        let index_type = IndexType::from_metadata(row.safe_int(meta::INDEX_TYPE));
        if index_type == IndexType::Statistic {
            // Table statistics rows are not indexes.
            return Ok(None);
        }
        Ok(Some(GenericIndex::new(
            object_name.to_owned(),
            parent,
            row.safe_bool(meta::NON_UNIQUE),
            row.safe_string(meta::INDEX_QUALIFIER),
            index_type,
        )))
    }

    fn fetch_row_child(
        &self,
        cx: &Cx,
        row: &Row,
        parent: &Arc<GenericTable>,
        object: &Arc<GenericIndex>,
    ) -> Result<Option<GenericIndexColumn>> {
        let Some(column_name) = row.safe_string(meta::COLUMN_NAME) else {
            return Ok(None);
        };
        let Some(column) = parent.column(cx, &column_name)? else {
            warn!(
                table = %parent.name(),
                index = %object.name(),
                column = %column_name,
                "index references a column the table does not have"
            );
            return Ok(None);
        };
        Ok(Some(GenericIndexColumn {
            column,
            ordinal: row.safe_int(meta::ORDINAL_POSITION),
            ascending: row
                .safe_string(meta::ASC_OR_DESC)
                .is_none_or(|v| !v.eq_ignore_ascii_case("D")),
        }))
    }

    fn is_children_cached(&self, parent: &GenericTable) -> bool {
        parent.indexes.read().expect("table lock poisoned").is_some()
    }

    fn cache_children(&self, parent: &Arc<GenericTable>, objects: Vec<Arc<GenericIndex>>) {
        *parent.indexes.write().expect("table lock poisoned") = Some(objects);
    }

    fn cache_row_children(&self, object: &Arc<GenericIndex>, rows: Vec<GenericIndexColumn>) {
        object.set_columns(rows);
    }

    fn ensure_parents_loaded(&self, cx: &Cx, session: &dyn MetaSession) -> Result<()> {
        alive(&self.ds)?.table_cache().get_objects(cx, session)?;
        Ok(())
    }

    fn resolve_parent(&self, name: &str) -> Option<Arc<GenericTable>> {
        self.ds.upgrade()?.table_cache().cached_object(name)
    }

    fn known_parents(&self) -> Vec<Arc<GenericTable>> {
        self.ds
            .upgrade()
            .and_then(|ds| ds.table_cache().cached_objects())
            .unwrap_or_default()
    }
}

/// Primary and unique keys.
pub(crate) struct ConstraintHooks {
    ds: Weak<GenericDataSource>,
}

impl ConstraintHooks {
    pub(crate) fn new(ds: Weak<GenericDataSource>) -> Self {
        Self { ds }
    }
}

impl CompositeHooks for ConstraintHooks {
    type Parent = GenericTable;
    type Object = GenericUniqueKey;
    type RowChild = GenericConstraintColumn;

    fn prepare_objects<'s>(
        &self,
        cx: &Cx,
        session: &'s dyn MetaSession,
        for_parent: Option<&Arc<GenericTable>>,
    ) -> Result<Box<dyn RowStream + 's>> {
        session.query_meta(
            cx,
            &MetaQuery::PrimaryKeys {
                schema: None,
                table: for_parent.map(|t| t.name().to_owned()),
            },
        )
    }

    fn fetch_object(
        &self,
        _cx: &Cx,
        _row: &Row,
        parent: &Arc<GenericTable>,
        object_name: &str,
    ) -> Result<Option<GenericUniqueKey>> {
        Ok(Some(GenericUniqueKey::new(
            object_name.to_owned(),
            parent,
            ConstraintType::PrimaryKey,
        )))
    }

    fn fetch_row_child(
        &self,
        cx: &Cx,
        row: &Row,
        parent: &Arc<GenericTable>,
        object: &Arc<GenericUniqueKey>,
    ) -> Result<Option<GenericConstraintColumn>> {
        let Some(column_name) = row.safe_string(meta::COLUMN_NAME) else {
            return Ok(None);
        };
        let Some(column) = parent.column(cx, &column_name)? else {
            warn!(
                table = %parent.name(),
                key = %object.name(),
                column = %column_name,
                "key references a column the table does not have"
            );
            return Ok(None);
        };
        Ok(Some(GenericConstraintColumn {
            column,
            ordinal: row.safe_int(meta::KEY_SEQ),
        }))
    }

    fn is_children_cached(&self, parent: &GenericTable) -> bool {
        parent
            .unique_keys
            .read()
            .expect("table lock poisoned")
            .is_some()
    }

    fn cache_children(&self, parent: &Arc<GenericTable>, objects: Vec<Arc<GenericUniqueKey>>) {
        *parent.unique_keys.write().expect("table lock poisoned") = Some(objects);
    }

    fn cache_row_children(&self, object: &Arc<GenericUniqueKey>, rows: Vec<GenericConstraintColumn>) {
        object.set_columns(rows);
    }

    fn ensure_parents_loaded(&self, cx: &Cx, session: &dyn MetaSession) -> Result<()> {
        alive(&self.ds)?.table_cache().get_objects(cx, session)?;
        Ok(())
    }

    fn resolve_parent(&self, name: &str) -> Option<Arc<GenericTable>> {
        self.ds.upgrade()?.table_cache().cached_object(name)
    }

    fn known_parents(&self) -> Vec<Arc<GenericTable>> {
        self.ds
            .upgrade()
            .and_then(|ds| ds.table_cache().cached_objects())
            .unwrap_or_default()
    }
}

/// Foreign keys. Keeps a side map of fabricated referenced keys so a
/// key invented for one scan row is reused by every other row naming
/// the same (table, key) pair.
pub(crate) struct ForeignKeyHooks {
    ds: Weak<GenericDataSource>,
    fabricated_keys: Mutex<HashMap<String, Arc<GenericUniqueKey>>>,
}

impl ForeignKeyHooks {
    pub(crate) fn new(ds: Weak<GenericDataSource>) -> Self {
        Self {
            ds,
            fabricated_keys: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn clear_state(&self) {
        self.fabricated_keys
            .lock()
            .expect("fk state lock poisoned")
            .clear();
    }

    fn referenced_key(
        &self,
        cx: &Cx,
        row: &Row,
        fk_name: &str,
    ) -> Result<Option<Arc<GenericUniqueKey>>> {
        let ds = alive(&self.ds)?;
        let Some(pk_table_name) = row.safe_string(meta::PKTABLE_NAME) else {
            debug!(fk = fk_name, "foreign key row names no referenced table, skipped");
            return Ok(None);
        };
        let Some(pk_table) = ds.table(cx, &pk_table_name)? else {
            warn!(
                fk = fk_name,
                table = %pk_table_name,
                "referenced table not found, foreign key skipped"
            );
            return Ok(None);
        };

        let pk_name = row.safe_string(meta::PK_NAME);
        let pk_column_name = row.safe_string(meta::PKCOLUMN_NAME);
        let keys = pk_table.unique_keys(cx)?;
        let mut referenced = pk_name.as_deref().and_then(|n| {
            keys.iter()
                .find(|k| ds.name_match().matches(k.name(), n))
                .cloned()
        });
        if referenced.is_none() {
            if let Some(column_name) = pk_column_name.as_deref() {
                referenced = keys.iter().find(|k| k.has_column(column_name)).cloned();
            }
        }
        if let Some(key) = referenced {
            return Ok(Some(key));
        }

        // The source never reported the referenced key; fabricate one
        // and remember it so multi-column keys stay a single object.
        let fallback = pk_name.unwrap_or_else(|| format!("{}_PK", pk_table.name()));
        let map_key = format!("{}.{}", pk_table.name(), fallback);
        let mut fabricated = self
            .fabricated_keys
            .lock()
            .expect("fk state lock poisoned");
        let key = match fabricated.entry(map_key) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                warn!(
                    table = %pk_table.name(),
                    key = %fallback,
                    "referenced unique key not reported by the source, fabricating one"
                );
                let key = GenericUniqueKey::fabricated(fallback, &pk_table);
                pk_table.add_unique_key(key.clone());
                entry.insert(key.clone());
                key
            }
        };
        Ok(Some(key))
    }
}

impl CompositeHooks for ForeignKeyHooks {
    type Parent = GenericTable;
    type Object = GenericForeignKey;
    type RowChild = GenericForeignKeyColumn;

    fn prepare_objects<'s>(
        &self,
        cx: &Cx,
        session: &'s dyn MetaSession,
        for_parent: Option<&Arc<GenericTable>>,
    ) -> Result<Box<dyn RowStream + 's>> {
        session.query_meta(
            cx,
            &MetaQuery::ImportedKeys {
                schema: None,
                table: for_parent.map(|t| t.name().to_owned()),
            },
        )
    }

    fn fetch_object(
        &self,
        cx: &Cx,
        row: &Row,
        parent: &Arc<GenericTable>,
        object_name: &str,
    ) -> Result<Option<GenericForeignKey>> {
        let Some(referenced) = self.referenced_key(cx, row, object_name)? else {
            return Ok(None);
        };
        Ok(Some(GenericForeignKey::new(
            object_name.to_owned(),
            parent,
            referenced,
            ModifyRule::from_metadata(row.safe_int(meta::UPDATE_RULE)),
            ModifyRule::from_metadata(row.safe_int(meta::DELETE_RULE)),
            Deferability::from_metadata(row.safe_int(meta::DEFERRABILITY)),
        )))
    }

    fn fetch_row_child(
        &self,
        cx: &Cx,
        row: &Row,
        parent: &Arc<GenericTable>,
        object: &Arc<GenericForeignKey>,
    ) -> Result<Option<GenericForeignKeyColumn>> {
        let Some(fk_column_name) = row.safe_string(meta::FKCOLUMN_NAME) else {
            return Ok(None);
        };
        let Some(column) = parent.column(cx, &fk_column_name)? else {
            warn!(
                table = %parent.name(),
                fk = %object.name(),
                column = %fk_column_name,
                "foreign key references a column the table does not have"
            );
            return Ok(None);
        };
        let Some(pk_column_name) = row.safe_string(meta::PKCOLUMN_NAME) else {
            return Ok(None);
        };
        let Some(pk_table) = object.referenced_table() else {
            return Ok(None);
        };
        let Some(referenced_column) = pk_table.column(cx, &pk_column_name)? else {
            warn!(
                table = %pk_table.name(),
                fk = %object.name(),
                column = %pk_column_name,
                "foreign key references a column the referenced table does not have"
            );
            return Ok(None);
        };
        let ordinal = row.safe_int(meta::KEY_SEQ);
        if !object.referenced_key().is_persisted() {
            // Fabricated keys learn their columns from the rows that
            // reference them.
            object.referenced_key().add_column(GenericConstraintColumn {
                column: referenced_column.clone(),
                ordinal,
            });
        }
        Ok(Some(GenericForeignKeyColumn {
            column,
            referenced_column,
            ordinal,
        }))
    }

    fn empty_objects_allowed(&self) -> bool {
        // A key none of whose column pairs resolved is unusable.
        false
    }

    fn is_children_cached(&self, parent: &GenericTable) -> bool {
        parent
            .foreign_keys
            .read()
            .expect("table lock poisoned")
            .is_some()
    }

    fn cache_children(&self, parent: &Arc<GenericTable>, objects: Vec<Arc<GenericForeignKey>>) {
        *parent.foreign_keys.write().expect("table lock poisoned") = Some(objects);
    }

    fn cache_row_children(&self, object: &Arc<GenericForeignKey>, rows: Vec<GenericForeignKeyColumn>) {
        object.set_columns(rows);
    }

    fn ensure_parents_loaded(&self, cx: &Cx, session: &dyn MetaSession) -> Result<()> {
        alive(&self.ds)?.table_cache().get_objects(cx, session)?;
        Ok(())
    }

    fn resolve_parent(&self, name: &str) -> Option<Arc<GenericTable>> {
        self.ds.upgrade()?.table_cache().cached_object(name)
    }

    fn known_parents(&self) -> Vec<Arc<GenericTable>> {
        self.ds
            .upgrade()
            .and_then(|ds| ds.table_cache().cached_objects())
            .unwrap_or_default()
    }
}

/// Procedures, with packages collected from the procedure catalog.
pub(crate) struct ProcedureHooks {
    ds: Weak<GenericDataSource>,
    packages: Mutex<BTreeMap<String, Arc<GenericPackage>>>,
}

impl ProcedureHooks {
    pub(crate) fn new(ds: Weak<GenericDataSource>) -> Self {
        Self {
            ds,
            packages: Mutex::new(BTreeMap::new()),
        }
    }

    pub(crate) fn packages(&self) -> Vec<Arc<GenericPackage>> {
        self.packages
            .lock()
            .expect("package map lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    pub(crate) fn clear_packages(&self) {
        self.packages
            .lock()
            .expect("package map lock poisoned")
            .clear();
    }
}

impl ObjectHooks for ProcedureHooks {
    type Object = GenericProcedure;

    fn prepare_objects<'s>(
        &self,
        cx: &Cx,
        session: &'s dyn MetaSession,
    ) -> Result<Box<dyn RowStream + 's>> {
        session.query_meta(cx, &MetaQuery::Procedures { schema: None })
    }

    fn fetch_object(&self, _cx: &Cx, row: &Row) -> Result<Option<GenericProcedure>> {
        let Some(name) = row.safe_string(meta::PROCEDURE_NAME) else {
            return Ok(None);
        };
        let package = row.safe_string(meta::PROCEDURE_CAT).map(|cat| {
            let mut packages = self.packages.lock().expect("package map lock poisoned");
            packages
                .entry(cat.clone())
                .or_insert_with(|| GenericPackage::new(cat))
                .clone()
        });
        Ok(Some(GenericProcedure::new(
            name,
            row.safe_string(meta::REMARKS),
            ProcedureType::from_metadata(row.safe_int(meta::PROCEDURE_TYPE)),
            package,
            self.ds.clone(),
        )))
    }
}
