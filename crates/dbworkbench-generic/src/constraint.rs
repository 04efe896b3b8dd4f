//! Primary and unique key constraints.

use std::sync::{Arc, RwLock, Weak};

use dbworkbench_core::{DbObject, ObjectId, ObjectType};

use crate::table::{GenericColumn, GenericTable};

pub const TYPE_CONSTRAINT: ObjectType = ObjectType::new("unique key");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintType {
    PrimaryKey,
    Unique,
}

#[derive(Clone)]
pub struct GenericConstraintColumn {
    pub column: Arc<GenericColumn>,
    pub ordinal: i32,
}

/// A primary or unique key.
///
/// Keys normally come from the constraint cache. A key can also be
/// fabricated when a foreign key references a key the source never
/// reported; fabricated keys are not persisted and grow their column
/// list as the referencing rows arrive.
pub struct GenericUniqueKey {
    id: ObjectId,
    name: String,
    table: Weak<GenericTable>,
    constraint_type: ConstraintType,
    persisted: bool,
    columns: RwLock<Vec<GenericConstraintColumn>>,
}

impl GenericUniqueKey {
    pub(crate) fn new(
        name: String,
        table: &Arc<GenericTable>,
        constraint_type: ConstraintType,
    ) -> Self {
        Self {
            id: ObjectId::next(),
            name,
            table: Arc::downgrade(table),
            constraint_type,
            persisted: true,
            columns: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn fabricated(name: String, table: &Arc<GenericTable>) -> Arc<Self> {
        Arc::new(Self {
            id: ObjectId::next(),
            name,
            table: Arc::downgrade(table),
            constraint_type: ConstraintType::PrimaryKey,
            persisted: false,
            columns: RwLock::new(Vec::new()),
        })
    }

    pub fn constraint_type(&self) -> ConstraintType {
        self.constraint_type
    }

    pub fn table(&self) -> Option<Arc<GenericTable>> {
        self.table.upgrade()
    }

    pub fn columns(&self) -> Vec<GenericConstraintColumn> {
        self.columns.read().expect("key lock poisoned").clone()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns
            .read()
            .expect("key lock poisoned")
            .iter()
            .any(|c| c.column.name().eq_ignore_ascii_case(name))
    }

    pub(crate) fn set_columns(&self, columns: Vec<GenericConstraintColumn>) {
        *self.columns.write().expect("key lock poisoned") = columns;
    }

    pub(crate) fn add_column(&self, column: GenericConstraintColumn) {
        let mut columns = self.columns.write().expect("key lock poisoned");
        if columns
            .iter()
            .any(|c| c.column.name().eq_ignore_ascii_case(column.column.name()))
        {
            return;
        }
        columns.push(column);
    }
}

impl DbObject for GenericUniqueKey {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn object_type(&self) -> ObjectType {
        TYPE_CONSTRAINT
    }

    fn parent_object(&self) -> Option<Arc<dyn DbObject>> {
        self.table.upgrade().map(|t| t as Arc<dyn DbObject>)
    }

    fn is_persisted(&self) -> bool {
        self.persisted
    }
}
