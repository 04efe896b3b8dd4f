//! Navigator tree glue for the generic model.

use std::sync::{Arc, Weak};

use dbworkbench_core::{Cx, DbObject, Error, Result};
use dbworkbench_navigator::{ChildrenProvider, NavNode, NavigatorModel};

use crate::data_source::GenericDataSource;
use crate::procedure::TYPE_PROCEDURE;
use crate::table::{GenericTable, TYPE_COLUMN, TYPE_TABLE};
use crate::{TYPE_FOREIGN_KEY, TYPE_INDEX};

/// Attaches an item node for a data source under a container node
/// (typically a project) and returns it. The node expands into the
/// standard folder set driven by the data source's caches.
pub fn attach_data_source_node(
    model: &NavigatorModel,
    parent: &Arc<NavNode>,
    ds: &Arc<GenericDataSource>,
) -> Arc<NavNode> {
    let node = NavNode::item(
        ds.clone() as Arc<dyn DbObject>,
        parent,
        Some(Arc::new(DataSourceFolders {
            ds: Arc::downgrade(ds),
        })),
    );
    model.attach(parent, node.clone(), true);
    node
}

struct DataSourceFolders {
    ds: Weak<GenericDataSource>,
}

impl ChildrenProvider for DataSourceFolders {
    fn load_children(
        &self,
        _cx: &Cx,
        _model: &NavigatorModel,
        node: &Arc<NavNode>,
    ) -> Result<Vec<Arc<NavNode>>> {
        Ok(vec![
            NavNode::folder(
                "Tables",
                TYPE_TABLE,
                node.object().clone(),
                node,
                Arc::new(TableList {
                    ds: self.ds.clone(),
                }),
            ),
            NavNode::folder(
                "Procedures",
                TYPE_PROCEDURE,
                node.object().clone(),
                node,
                Arc::new(ProcedureList {
                    ds: self.ds.clone(),
                }),
            ),
        ])
    }
}

fn alive(ds: &Weak<GenericDataSource>) -> Result<Arc<GenericDataSource>> {
    ds.upgrade()
        .ok_or_else(|| Error::database("data source is no longer alive"))
}

struct TableList {
    ds: Weak<GenericDataSource>,
}

impl ChildrenProvider for TableList {
    fn load_children(
        &self,
        cx: &Cx,
        _model: &NavigatorModel,
        node: &Arc<NavNode>,
    ) -> Result<Vec<Arc<NavNode>>> {
        let ds = alive(&self.ds)?;
        Ok(ds
            .tables(cx)?
            .into_iter()
            .map(|table| {
                let provider = Arc::new(TableFolders {
                    table: table.clone(),
                });
                NavNode::item(table as Arc<dyn DbObject>, node, Some(provider))
            })
            .collect())
    }
}

struct TableFolders {
    table: Arc<GenericTable>,
}

impl ChildrenProvider for TableFolders {
    fn load_children(
        &self,
        _cx: &Cx,
        _model: &NavigatorModel,
        node: &Arc<NavNode>,
    ) -> Result<Vec<Arc<NavNode>>> {
        Ok(vec![
            NavNode::folder(
                "Columns",
                TYPE_COLUMN,
                node.object().clone(),
                node,
                Arc::new(ColumnList {
                    table: self.table.clone(),
                }),
            ),
            NavNode::folder(
                "Indexes",
                TYPE_INDEX,
                node.object().clone(),
                node,
                Arc::new(IndexList {
                    table: self.table.clone(),
                }),
            ),
            NavNode::folder(
                "Foreign Keys",
                TYPE_FOREIGN_KEY,
                node.object().clone(),
                node,
                Arc::new(ForeignKeyList {
                    table: self.table.clone(),
                }),
            ),
        ])
    }
}

struct ColumnList {
    table: Arc<GenericTable>,
}

impl ChildrenProvider for ColumnList {
    fn load_children(
        &self,
        cx: &Cx,
        _model: &NavigatorModel,
        node: &Arc<NavNode>,
    ) -> Result<Vec<Arc<NavNode>>> {
        Ok(self
            .table
            .columns(cx)?
            .into_iter()
            .map(|column| NavNode::item(column as Arc<dyn DbObject>, node, None))
            .collect())
    }
}

struct IndexList {
    table: Arc<GenericTable>,
}

impl ChildrenProvider for IndexList {
    fn load_children(
        &self,
        cx: &Cx,
        _model: &NavigatorModel,
        node: &Arc<NavNode>,
    ) -> Result<Vec<Arc<NavNode>>> {
        Ok(self
            .table
            .indexes(cx)?
            .into_iter()
            .map(|index| NavNode::item(index as Arc<dyn DbObject>, node, None))
            .collect())
    }
}

struct ForeignKeyList {
    table: Arc<GenericTable>,
}

impl ChildrenProvider for ForeignKeyList {
    fn load_children(
        &self,
        cx: &Cx,
        _model: &NavigatorModel,
        node: &Arc<NavNode>,
    ) -> Result<Vec<Arc<NavNode>>> {
        Ok(self
            .table
            .foreign_keys(cx)?
            .into_iter()
            .map(|fk| NavNode::item(fk as Arc<dyn DbObject>, node, None))
            .collect())
    }
}

struct ProcedureList {
    ds: Weak<GenericDataSource>,
}

impl ChildrenProvider for ProcedureList {
    fn load_children(
        &self,
        cx: &Cx,
        _model: &NavigatorModel,
        node: &Arc<NavNode>,
    ) -> Result<Vec<Arc<NavNode>>> {
        let ds = alive(&self.ds)?;
        Ok(ds
            .procedures(cx)?
            .into_iter()
            .map(|procedure| NavNode::item(procedure as Arc<dyn DbObject>, node, None))
            .collect())
    }
}
