//! Foreign keys.

use std::sync::{Arc, RwLock, Weak};

use dbworkbench_core::{DbObject, ObjectId, ObjectType};

use crate::constraint::GenericUniqueKey;
use crate::table::{GenericColumn, GenericTable};

pub const TYPE_FOREIGN_KEY: ObjectType = ObjectType::new("foreign key");

/// Referential action, decoded from the driver metadata rule codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifyRule {
    Cascade,
    Restrict,
    SetNull,
    NoAction,
    SetDefault,
    Unknown,
}

impl ModifyRule {
    pub fn from_metadata(code: i32) -> Self {
        match code {
            0 => Self::Cascade,
            1 => Self::Restrict,
            2 => Self::SetNull,
            3 => Self::NoAction,
            4 => Self::SetDefault,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferability {
    InitiallyDeferred,
    InitiallyImmediate,
    NotDeferrable,
    Unknown,
}

impl Deferability {
    pub fn from_metadata(code: i32) -> Self {
        match code {
            5 => Self::InitiallyDeferred,
            6 => Self::InitiallyImmediate,
            7 => Self::NotDeferrable,
            _ => Self::Unknown,
        }
    }
}

#[derive(Clone)]
pub struct GenericForeignKeyColumn {
    pub column: Arc<GenericColumn>,
    pub referenced_column: Arc<GenericColumn>,
    pub ordinal: i32,
}

/// A foreign key of a table, pointing at a unique key of the
/// referenced table.
pub struct GenericForeignKey {
    id: ObjectId,
    name: String,
    table: Weak<GenericTable>,
    referenced_key: Arc<GenericUniqueKey>,
    update_rule: ModifyRule,
    delete_rule: ModifyRule,
    deferability: Deferability,
    columns: RwLock<Vec<GenericForeignKeyColumn>>,
}

impl GenericForeignKey {
    pub(crate) fn new(
        name: String,
        table: &Arc<GenericTable>,
        referenced_key: Arc<GenericUniqueKey>,
        update_rule: ModifyRule,
        delete_rule: ModifyRule,
        deferability: Deferability,
    ) -> Self {
        Self {
            id: ObjectId::next(),
            name,
            table: Arc::downgrade(table),
            referenced_key,
            update_rule,
            delete_rule,
            deferability,
            columns: RwLock::new(Vec::new()),
        }
    }

    pub fn table(&self) -> Option<Arc<GenericTable>> {
        self.table.upgrade()
    }

    pub fn referenced_key(&self) -> &Arc<GenericUniqueKey> {
        &self.referenced_key
    }

    pub fn referenced_table(&self) -> Option<Arc<GenericTable>> {
        self.referenced_key.table()
    }

    pub fn update_rule(&self) -> ModifyRule {
        self.update_rule
    }

    pub fn delete_rule(&self) -> ModifyRule {
        self.delete_rule
    }

    pub fn deferability(&self) -> Deferability {
        self.deferability
    }

    pub fn columns(&self) -> Vec<GenericForeignKeyColumn> {
        self.columns.read().expect("key lock poisoned").clone()
    }

    pub(crate) fn set_columns(&self, columns: Vec<GenericForeignKeyColumn>) {
        *self.columns.write().expect("key lock poisoned") = columns;
    }
}

impl DbObject for GenericForeignKey {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn object_type(&self) -> ObjectType {
        TYPE_FOREIGN_KEY
    }

    fn parent_object(&self) -> Option<Arc<dyn DbObject>> {
        self.table.upgrade().map(|t| t as Arc<dyn DbObject>)
    }
}
