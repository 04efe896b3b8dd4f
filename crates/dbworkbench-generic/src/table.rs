//! Tables and their columns.

use std::sync::{Arc, RwLock, Weak};

use dbworkbench_core::{Cx, DbObject, Error, ObjectId, ObjectType, Result};

use crate::constraint::GenericUniqueKey;
use crate::data_source::GenericDataSource;
use crate::foreign_key::GenericForeignKey;
use crate::index::GenericIndex;

pub const TYPE_TABLE: ObjectType = ObjectType::new("table");
pub const TYPE_COLUMN: ObjectType = ObjectType::new("table column");

/// A table (or view) of a generic data source.
///
/// Columns, indexes, keys and foreign keys are cached in place; the
/// caches of the owning data source fill the slots and the accessors
/// trigger the load when a slot is still empty.
pub struct GenericTable {
    id: ObjectId,
    name: String,
    table_type: String,
    remarks: Option<String>,
    data_source: Weak<GenericDataSource>,
    pub(crate) columns: RwLock<Option<Vec<Arc<GenericColumn>>>>,
    pub(crate) indexes: RwLock<Option<Vec<Arc<GenericIndex>>>>,
    pub(crate) unique_keys: RwLock<Option<Vec<Arc<GenericUniqueKey>>>>,
    pub(crate) foreign_keys: RwLock<Option<Vec<Arc<GenericForeignKey>>>>,
}

impl GenericTable {
    pub(crate) fn new(
        name: String,
        table_type: String,
        remarks: Option<String>,
        data_source: Weak<GenericDataSource>,
    ) -> Self {
        Self {
            id: ObjectId::next(),
            name,
            table_type,
            remarks,
            data_source,
            columns: RwLock::new(None),
            indexes: RwLock::new(None),
            unique_keys: RwLock::new(None),
            foreign_keys: RwLock::new(None),
        }
    }

    pub fn table_type(&self) -> &str {
        &self.table_type
    }

    pub fn remarks(&self) -> Option<&str> {
        self.remarks.as_deref()
    }

    pub fn is_view(&self) -> bool {
        self.table_type.to_ascii_uppercase().contains("VIEW")
    }

    fn data_source(&self) -> Result<Arc<GenericDataSource>> {
        self.data_source
            .upgrade()
            .ok_or_else(|| Error::database("data source is no longer alive"))
    }

    /// The table's columns, loaded through the table cache on first
    /// access.
    pub fn columns(self: &Arc<Self>, cx: &Cx) -> Result<Vec<Arc<GenericColumn>>> {
        let ds = self.data_source()?;
        ds.table_cache().load_children(cx, ds.session(), Some(self))?;
        Ok(self
            .columns
            .read()
            .expect("table lock poisoned")
            .clone()
            .unwrap_or_default())
    }

    /// One column by name, using the data source's name matching.
    pub fn column(self: &Arc<Self>, cx: &Cx, name: &str) -> Result<Option<Arc<GenericColumn>>> {
        let ds = self.data_source()?;
        let columns = self.columns(cx)?;
        Ok(columns
            .iter()
            .find(|c| ds.name_match().matches(c.name(), name))
            .cloned())
    }

    pub fn indexes(self: &Arc<Self>, cx: &Cx) -> Result<Vec<Arc<GenericIndex>>> {
        let ds = self.data_source()?;
        ds.index_cache().load(cx, ds.session(), Some(self))?;
        Ok(self
            .indexes
            .read()
            .expect("table lock poisoned")
            .clone()
            .unwrap_or_default())
    }

    /// Primary and unique keys, including any key fabricated for a
    /// foreign key whose referenced key the source never reported.
    pub fn unique_keys(self: &Arc<Self>, cx: &Cx) -> Result<Vec<Arc<GenericUniqueKey>>> {
        let ds = self.data_source()?;
        ds.constraint_cache().load(cx, ds.session(), Some(self))?;
        Ok(self
            .unique_keys
            .read()
            .expect("table lock poisoned")
            .clone()
            .unwrap_or_default())
    }

    pub fn foreign_keys(self: &Arc<Self>, cx: &Cx) -> Result<Vec<Arc<GenericForeignKey>>> {
        let ds = self.data_source()?;
        ds.fk_cache().load(cx, ds.session(), Some(self))?;
        Ok(self
            .foreign_keys
            .read()
            .expect("table lock poisoned")
            .clone()
            .unwrap_or_default())
    }

    pub(crate) fn add_unique_key(&self, key: Arc<GenericUniqueKey>) {
        self.unique_keys
            .write()
            .expect("table lock poisoned")
            .get_or_insert_with(Vec::new)
            .push(key);
    }
}

impl DbObject for GenericTable {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn object_type(&self) -> ObjectType {
        TYPE_TABLE
    }

    fn parent_object(&self) -> Option<Arc<dyn DbObject>> {
        self.data_source
            .upgrade()
            .map(|ds| ds as Arc<dyn DbObject>)
    }
}

/// A table column as reported by the driver metadata.
pub struct GenericColumn {
    id: ObjectId,
    name: String,
    table: Weak<GenericTable>,
    type_name: String,
    value_type: i32,
    ordinal: i32,
    size: i64,
    scale: i32,
    nullable: bool,
    default_value: Option<String>,
    remarks: Option<String>,
    auto_increment: bool,
}

impl GenericColumn {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: String,
        table: Weak<GenericTable>,
        type_name: String,
        value_type: i32,
        ordinal: i32,
        size: i64,
        scale: i32,
        nullable: bool,
        default_value: Option<String>,
        remarks: Option<String>,
        auto_increment: bool,
    ) -> Self {
        Self {
            id: ObjectId::next(),
            name,
            table,
            type_name,
            value_type,
            ordinal,
            size,
            scale,
            nullable,
            default_value,
            remarks,
            auto_increment,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn value_type(&self) -> i32 {
        self.value_type
    }

    pub fn ordinal(&self) -> i32 {
        self.ordinal
    }

    pub fn size(&self) -> i64 {
        self.size
    }

    pub fn scale(&self) -> i32 {
        self.scale
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub fn remarks(&self) -> Option<&str> {
        self.remarks.as_deref()
    }

    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    pub fn table(&self) -> Option<Arc<GenericTable>> {
        self.table.upgrade()
    }
}

impl DbObject for GenericColumn {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn object_type(&self) -> ObjectType {
        TYPE_COLUMN
    }

    fn parent_object(&self) -> Option<Arc<dyn DbObject>> {
        self.table.upgrade().map(|t| t as Arc<dyn DbObject>)
    }
}
