//! Procedures, functions and their packages.

use std::sync::{Arc, Weak};

use dbworkbench_core::{DbObject, ObjectId, ObjectType};

use crate::data_source::GenericDataSource;

pub const TYPE_PROCEDURE: ObjectType = ObjectType::new("procedure");
pub const TYPE_PACKAGE: ObjectType = ObjectType::new("package");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureType {
    Unknown,
    Procedure,
    Function,
}

impl ProcedureType {
    pub fn from_metadata(code: i32) -> Self {
        match code {
            1 => Self::Procedure,
            2 => Self::Function,
            _ => Self::Unknown,
        }
    }
}

/// A procedure grouping: sources that report a non-empty procedure
/// catalog on a catalog-less data source are treated as packaged.
pub struct GenericPackage {
    id: ObjectId,
    name: String,
}

impl GenericPackage {
    pub(crate) fn new(name: String) -> Arc<Self> {
        Arc::new(Self {
            id: ObjectId::next(),
            name,
        })
    }
}

impl DbObject for GenericPackage {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn object_type(&self) -> ObjectType {
        TYPE_PACKAGE
    }
}

pub struct GenericProcedure {
    id: ObjectId,
    name: String,
    remarks: Option<String>,
    procedure_type: ProcedureType,
    package: Option<Arc<GenericPackage>>,
    data_source: Weak<GenericDataSource>,
}

impl GenericProcedure {
    pub(crate) fn new(
        name: String,
        remarks: Option<String>,
        procedure_type: ProcedureType,
        package: Option<Arc<GenericPackage>>,
        data_source: Weak<GenericDataSource>,
    ) -> Self {
        Self {
            id: ObjectId::next(),
            name,
            remarks,
            procedure_type,
            package,
            data_source,
        }
    }

    pub fn remarks(&self) -> Option<&str> {
        self.remarks.as_deref()
    }

    pub fn procedure_type(&self) -> ProcedureType {
        self.procedure_type
    }

    pub fn package(&self) -> Option<&Arc<GenericPackage>> {
        self.package.as_ref()
    }
}

impl DbObject for GenericProcedure {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn object_type(&self) -> ObjectType {
        TYPE_PROCEDURE
    }

    /// The data source, even for packaged procedures: the navigator
    /// presents one flat procedure folder per source, and the ancestor
    /// walk follows the presented tree. The package stays reachable
    /// through [`package`](Self::package).
    fn parent_object(&self) -> Option<Arc<dyn DbObject>> {
        self.data_source
            .upgrade()
            .map(|ds| ds as Arc<dyn DbObject>)
    }
}
