//! Table indexes.

use std::sync::{Arc, RwLock, Weak};

use dbworkbench_core::{DbObject, ObjectId, ObjectType};

use crate::table::{GenericColumn, GenericTable};

pub const TYPE_INDEX: ObjectType = ObjectType::new("index");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    Statistic,
    Clustered,
    Hashed,
    Other,
    Unknown,
}

impl IndexType {
    pub fn from_metadata(code: i32) -> Self {
        match code {
            0 => Self::Statistic,
            1 => Self::Clustered,
            2 => Self::Hashed,
            3 => Self::Other,
            _ => Self::Unknown,
        }
    }
}

#[derive(Clone)]
pub struct GenericIndexColumn {
    pub column: Arc<GenericColumn>,
    pub ordinal: i32,
    pub ascending: bool,
}

/// A table index assembled from one metadata row per indexed column.
pub struct GenericIndex {
    id: ObjectId,
    name: String,
    table: Weak<GenericTable>,
    non_unique: bool,
    qualifier: Option<String>,
    index_type: IndexType,
    columns: RwLock<Vec<GenericIndexColumn>>,
}

impl GenericIndex {
    pub(crate) fn new(
        name: String,
        table: &Arc<GenericTable>,
        non_unique: bool,
        qualifier: Option<String>,
        index_type: IndexType,
    ) -> Self {
        Self {
            id: ObjectId::next(),
            name,
            table: Arc::downgrade(table),
            non_unique,
            qualifier,
            index_type,
            columns: RwLock::new(Vec::new()),
        }
    }

    pub fn table(&self) -> Option<Arc<GenericTable>> {
        self.table.upgrade()
    }

    pub fn is_unique(&self) -> bool {
        !self.non_unique
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    pub fn index_type(&self) -> IndexType {
        self.index_type
    }

    pub fn columns(&self) -> Vec<GenericIndexColumn> {
        self.columns.read().expect("index lock poisoned").clone()
    }

    pub(crate) fn set_columns(&self, columns: Vec<GenericIndexColumn>) {
        *self.columns.write().expect("index lock poisoned") = columns;
    }
}

impl DbObject for GenericIndex {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn object_type(&self) -> ObjectType {
        TYPE_INDEX
    }

    fn parent_object(&self) -> Option<Arc<dyn DbObject>> {
        self.table.upgrade().map(|t| t as Arc<dyn DbObject>)
    }
}
