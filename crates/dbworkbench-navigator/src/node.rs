//! Tree nodes presenting database metadata objects.

use std::sync::{Arc, RwLock, Weak};

use dbworkbench_core::{Cx, DbObject, ObjectType, Result};

use crate::model::NavigatorModel;

/// Loads the child nodes of an expandable node on demand.
///
/// Providers typically drive a metadata cache and wrap the resulting
/// objects into nodes; they create the nodes but never register them,
/// the model does that when it stores the loaded children.
pub trait ChildrenProvider: Send + Sync {
    fn load_children(
        &self,
        cx: &Cx,
        model: &NavigatorModel,
        node: &Arc<NavNode>,
    ) -> Result<Vec<Arc<NavNode>>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// The invisible tree root.
    Root,
    /// A workspace project grouping data sources.
    Project,
    /// A node presenting one metadata object.
    Item,
    /// A virtual grouping folder ("Tables", "Columns"). Folders carry
    /// the object type of the items they group.
    Folder(ObjectType),
}

/// One node of the navigation tree.
///
/// Nodes are identified by instance: the registry stores `Arc`s and
/// removal matches by pointer, so two nodes over the same object never
/// shadow each other.
pub struct NavNode {
    object: Arc<dyn DbObject>,
    kind: NodeKind,
    label: String,
    virtual_node: bool,
    parent: Weak<NavNode>,
    children: RwLock<Option<Vec<Arc<NavNode>>>>,
    provider: Option<Arc<dyn ChildrenProvider>>,
}

impl NavNode {
    /// An item node over a metadata object. Labelled by the object's
    /// name; expandable when a provider is given.
    pub fn item(
        object: Arc<dyn DbObject>,
        parent: &Arc<NavNode>,
        provider: Option<Arc<dyn ChildrenProvider>>,
    ) -> Arc<Self> {
        let label = object.name().to_owned();
        Arc::new(Self {
            object,
            kind: NodeKind::Item,
            label,
            virtual_node: false,
            parent: Arc::downgrade(parent),
            children: RwLock::new(None),
            provider,
        })
    }

    /// A virtual folder grouping children of one object type under a
    /// container. The folder registers under the container's object,
    /// so lookups by that object can still prefer the item node.
    pub fn folder(
        label: impl Into<String>,
        children_type: ObjectType,
        object: Arc<dyn DbObject>,
        parent: &Arc<NavNode>,
        provider: Arc<dyn ChildrenProvider>,
    ) -> Arc<Self> {
        Arc::new(Self {
            object,
            kind: NodeKind::Folder(children_type),
            label: label.into(),
            virtual_node: true,
            parent: Arc::downgrade(parent),
            children: RwLock::new(None),
            provider: Some(provider),
        })
    }

    /// Container nodes (root, projects) manage their children by hand,
    /// starting from an empty list instead of a provider.
    pub(crate) fn container(kind: NodeKind, object: Arc<dyn DbObject>, parent: Option<&Arc<NavNode>>) -> Arc<Self> {
        let label = object.name().to_owned();
        Arc::new(Self {
            object,
            kind,
            label,
            virtual_node: false,
            parent: parent.map_or_else(Weak::new, Arc::downgrade),
            children: RwLock::new(Some(Vec::new())),
            provider: None,
        })
    }

    pub fn object(&self) -> &Arc<dyn DbObject> {
        &self.object
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_virtual(&self) -> bool {
        self.virtual_node
    }

    pub fn parent(&self) -> Option<Arc<NavNode>> {
        self.parent.upgrade()
    }

    /// The object type a folder groups, `None` for other node kinds.
    pub fn folder_children_type(&self) -> Option<ObjectType> {
        match self.kind {
            NodeKind::Folder(children_type) => Some(children_type),
            _ => None,
        }
    }

    pub(crate) fn provider(&self) -> Option<Arc<dyn ChildrenProvider>> {
        self.provider.clone()
    }

    /// Children, if they were loaded already.
    pub fn cached_children(&self) -> Option<Vec<Arc<NavNode>>> {
        self.children.read().expect("node lock poisoned").clone()
    }

    pub(crate) fn set_children(&self, children: Vec<Arc<NavNode>>) {
        *self.children.write().expect("node lock poisoned") = Some(children);
    }

    pub(crate) fn push_child(&self, child: Arc<NavNode>) {
        let mut guard = self.children.write().expect("node lock poisoned");
        guard.get_or_insert_with(Vec::new).push(child);
    }

    pub(crate) fn remove_child(&self, child: &Arc<NavNode>) -> bool {
        let mut guard = self.children.write().expect("node lock poisoned");
        if let Some(children) = guard.as_mut() {
            if let Some(pos) = children.iter().position(|c| Arc::ptr_eq(c, child)) {
                children.remove(pos);
                return true;
            }
        }
        false
    }

    /// Drops the loaded children, returning them for teardown.
    pub(crate) fn take_children(&self) -> Vec<Arc<NavNode>> {
        self.children
            .write()
            .expect("node lock poisoned")
            .take()
            .unwrap_or_default()
    }

    /// Slash-separated path from the root, for diagnostics.
    pub fn node_path(&self) -> String {
        let mut segments = vec![self.label.clone()];
        let mut cursor = self.parent();
        while let Some(node) = cursor {
            if node.kind != NodeKind::Root {
                segments.push(node.label.clone());
            }
            cursor = node.parent();
        }
        segments.reverse();
        segments.join("/")
    }
}
