//! The navigator model: object-to-node registry and event fan-out.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, RwLock, Weak};

use dbworkbench_core::{Cx, DbObject, ObjectId, ObjectType, Result};
use tracing::{error, warn};

use crate::event::{NavEvent, NavListener, NodeChange};
use crate::node::{NavNode, NodeKind};
use crate::resource::{
    Project, ResourceChangeListener, ResourceDeltaKind, ResourceEvent, ResourceNotifier,
};

const TYPE_ROOT: ObjectType = ObjectType::new("root");

struct RootObject {
    id: ObjectId,
}

impl DbObject for RootObject {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn name(&self) -> &str {
        ""
    }

    fn object_type(&self) -> ObjectType {
        TYPE_ROOT
    }
}

/// Registry value: most objects have exactly one node, objects that
/// also back virtual folders get promoted to a list.
enum NodeEntry {
    Single(Arc<NavNode>),
    Multiple(Vec<Arc<NavNode>>),
}

/// The navigation tree model.
///
/// Keeps the object-to-node registry, loads children on demand through
/// each node's provider, and reports every tree mutation to the
/// registered listeners. Listener dispatch always goes over a snapshot
/// taken under the lock, so handlers may freely (un)register listeners.
pub struct NavigatorModel {
    self_ref: Weak<NavigatorModel>,
    root: RwLock<Option<Arc<NavNode>>>,
    node_map: Mutex<HashMap<ObjectId, NodeEntry>>,
    listeners: Mutex<Vec<Arc<dyn NavListener>>>,
    notifier: Mutex<Option<Arc<dyn ResourceNotifier>>>,
}

impl NavigatorModel {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            root: RwLock::new(None),
            node_map: Mutex::new(HashMap::new()),
            listeners: Mutex::new(Vec::new()),
            notifier: Mutex::new(None),
        })
    }

    /// Creates the root node and optionally subscribes the model to a
    /// workspace resource notifier.
    pub fn initialize(&self, notifier: Option<Arc<dyn ResourceNotifier>>) {
        let created = {
            let mut root = self.root.write().expect("model lock poisoned");
            if root.is_some() {
                None
            } else {
                let object: Arc<dyn DbObject> = Arc::new(RootObject {
                    id: ObjectId::next(),
                });
                let node = NavNode::container(NodeKind::Root, object, None);
                *root = Some(node.clone());
                Some(node)
            }
        };
        if let Some(node) = created {
            self.add_node(&node, false);
        }
        if let Some(notifier) = notifier {
            if let Some(me) = self.self_ref.upgrade() {
                notifier.subscribe(me);
                *self.notifier.lock().expect("model lock poisoned") = Some(notifier);
            }
        }
    }

    pub fn root(&self) -> Option<Arc<NavNode>> {
        self.root.read().expect("model lock poisoned").clone()
    }

    /// Registers a node under its object's identity. An object already
    /// holding a node gets promoted to a node list.
    pub fn add_node(&self, node: &Arc<NavNode>, reflect: bool) {
        {
            let mut map = self.node_map.lock().expect("model lock poisoned");
            match map.entry(node.object().id()) {
                Entry::Vacant(entry) => {
                    entry.insert(NodeEntry::Single(node.clone()));
                }
                Entry::Occupied(mut entry) => match entry.get_mut() {
                    NodeEntry::Single(existing) => {
                        let existing = existing.clone();
                        entry.insert(NodeEntry::Multiple(vec![existing, node.clone()]));
                    }
                    NodeEntry::Multiple(nodes) => nodes.push(node.clone()),
                },
            }
        }
        if reflect {
            self.fire_event(&NavEvent::add(node.clone()));
        }
    }

    /// Unregisters the exact node instance. Removing a node that was
    /// never registered (or was already removed) only logs a warning.
    pub fn remove_node(&self, node: &Arc<NavNode>, reflect: bool) {
        let mut removed = false;
        {
            let mut map = self.node_map.lock().expect("model lock poisoned");
            let id = node.object().id();
            let mut drop_entry = false;
            match map.get_mut(&id) {
                Some(NodeEntry::Single(existing)) => {
                    if Arc::ptr_eq(existing, node) {
                        drop_entry = true;
                        removed = true;
                    }
                }
                Some(NodeEntry::Multiple(nodes)) => {
                    if let Some(pos) = nodes.iter().position(|n| Arc::ptr_eq(n, node)) {
                        nodes.remove(pos);
                        removed = true;
                    }
                }
                None => {}
            }
            if drop_entry {
                map.remove(&id);
            } else if removed {
                // Collapse a list that shrank back to one node.
                let last = match map.get_mut(&id) {
                    Some(NodeEntry::Multiple(nodes)) if nodes.len() == 1 => nodes.pop(),
                    _ => None,
                };
                if let Some(last) = last {
                    map.insert(id, NodeEntry::Single(last));
                }
            }
        }
        if !removed {
            warn!(node = %node.node_path(), "attempt to remove unregistered navigator node");
            return;
        }
        if reflect {
            self.fire_event(&NavEvent::remove(node.clone()));
        }
    }

    /// Finds the node presenting an object. When the object backs
    /// several nodes the non-virtual one wins.
    pub fn get_node_by_object(&self, object: &dyn DbObject) -> Option<Arc<NavNode>> {
        let map = self.node_map.lock().expect("model lock poisoned");
        match map.get(&object.id())? {
            NodeEntry::Single(node) => Some(node.clone()),
            NodeEntry::Multiple(nodes) => nodes
                .iter()
                .find(|n| !n.is_virtual())
                .or_else(|| nodes.first())
                .cloned(),
        }
    }

    /// Finds the node for an object, expanding ancestor nodes along
    /// the object's parent chain when it is not registered yet. A
    /// missing ancestor node or a failed expansion aborts the walk.
    pub fn find_node(&self, cx: &Cx, object: &Arc<dyn DbObject>) -> Option<Arc<NavNode>> {
        if let Some(node) = self.get_node_by_object(object.as_ref()) {
            return Some(node);
        }
        let mut path: Vec<Arc<dyn DbObject>> = vec![object.clone()];
        let mut cursor = object.parent_object();
        while let Some(parent) = cursor {
            cursor = parent.parent_object();
            path.push(parent);
        }
        path.reverse();
        for window in path.windows(2) {
            let Some(node) = self.get_node_by_object(window[0].as_ref()) else {
                warn!(object = %window[0].name(), "no navigator node for ancestor object");
                return None;
            };
            let target = window[1].object_type();
            if let Err(err) = self.expand_towards(cx, &node, target) {
                error!(
                    object = %window[0].name(),
                    error = %err,
                    "failed to expand navigator node"
                );
                return None;
            }
        }
        self.get_node_by_object(object.as_ref())
    }

    /// Returns a node's children, loading them through the node's
    /// provider on first access. Loaded children are registered and a
    /// `Load` update is fired on the node.
    pub fn ensure_children(&self, cx: &Cx, node: &Arc<NavNode>) -> Result<Vec<Arc<NavNode>>> {
        if let Some(children) = node.cached_children() {
            return Ok(children);
        }
        let Some(provider) = node.provider() else {
            node.set_children(Vec::new());
            return Ok(Vec::new());
        };
        let children = provider.load_children(cx, self, node)?;
        // Another expansion may have won the race in the meantime.
        if let Some(existing) = node.cached_children() {
            return Ok(existing);
        }
        for child in &children {
            self.add_node(child, false);
        }
        node.set_children(children.clone());
        self.fire_event(&NavEvent::update(node.clone(), NodeChange::Load));
        Ok(children)
    }

    fn expand_towards(
        &self,
        cx: &Cx,
        node: &Arc<NavNode>,
        object_type: ObjectType,
    ) -> Result<()> {
        let children = self.ensure_children(cx, node)?;
        for child in children {
            if child.folder_children_type() == Some(object_type) {
                self.expand_towards(cx, &child, object_type)?;
            }
        }
        Ok(())
    }

    /// Drops a node's loaded subtree so the next access reloads it.
    pub fn refresh_node(&self, node: &Arc<NavNode>) {
        for child in node.take_children() {
            self.unregister_subtree(&child);
        }
        self.fire_event(&NavEvent::update(node.clone(), NodeChange::Refresh));
    }

    /// Adds a node under a container whose children are managed by
    /// hand (the root, a project node).
    pub fn attach(&self, parent: &Arc<NavNode>, node: Arc<NavNode>, reflect: bool) {
        parent.push_child(node.clone());
        self.add_node(&node, reflect);
    }

    /// Removes a node and its loaded subtree from the tree.
    pub fn detach(&self, node: &Arc<NavNode>, reflect: bool) {
        if let Some(parent) = node.parent() {
            parent.remove_child(node);
        }
        for child in node.take_children() {
            self.unregister_subtree(&child);
        }
        self.remove_node(node, false);
        if reflect {
            self.fire_event(&NavEvent::remove(node.clone()));
        }
    }

    fn unregister_subtree(&self, node: &Arc<NavNode>) {
        for child in node.take_children() {
            self.unregister_subtree(&child);
        }
        self.remove_node(node, false);
    }

    pub fn add_project(&self, project: Arc<Project>, reflect: bool) -> Option<Arc<NavNode>> {
        let Some(root) = self.root() else {
            warn!(project = %project.name(), "project added before model initialization");
            return None;
        };
        let object: Arc<dyn DbObject> = project;
        let node = NavNode::container(NodeKind::Project, object, Some(&root));
        self.attach(&root, node.clone(), reflect);
        Some(node)
    }

    pub fn remove_project(&self, project: &Arc<Project>) {
        match self.get_node_by_object(project.as_ref()) {
            Some(node) => self.detach(&node, true),
            None => warn!(project = %project.name(), "removal of unknown project"),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn NavListener>) {
        let mut listeners = self.listeners.lock().expect("model lock poisoned");
        if listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            warn!("navigator listener registered twice");
            return;
        }
        listeners.push(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn NavListener>) {
        let mut listeners = self.listeners.lock().expect("model lock poisoned");
        let before = listeners.len();
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        if listeners.len() == before {
            warn!("removal of unregistered navigator listener");
        }
    }

    /// Delivers an event to a snapshot of the current listeners.
    pub fn fire_event(&self, event: &NavEvent) {
        let snapshot = self.listeners.lock().expect("model lock poisoned").clone();
        for listener in snapshot {
            listener.node_changed(event);
        }
    }

    /// Tears the model down: unsubscribes from the resource notifier,
    /// unregisters the whole tree and warns about anything left over.
    pub fn dispose(&self) {
        let notifier = self.notifier.lock().expect("model lock poisoned").take();
        if let (Some(notifier), Some(me)) = (notifier, self.self_ref.upgrade()) {
            let listener: Arc<dyn ResourceChangeListener> = me;
            notifier.unsubscribe(&listener);
        }
        let root = self.root.write().expect("model lock poisoned").take();
        if let Some(root) = root {
            self.unregister_subtree(&root);
        }
        {
            let mut map = self.node_map.lock().expect("model lock poisoned");
            if !map.is_empty() {
                warn!(count = map.len(), "navigator nodes still registered at dispose");
                map.clear();
            }
        }
        let mut listeners = self.listeners.lock().expect("model lock poisoned");
        if !listeners.is_empty() {
            warn!(
                count = listeners.len(),
                "navigator listeners still registered at dispose"
            );
            listeners.clear();
        }
    }
}

impl ResourceChangeListener for NavigatorModel {
    fn resource_changed(&self, event: &ResourceEvent) {
        for delta in &event.deltas {
            match delta.kind {
                ResourceDeltaKind::Added => {
                    self.add_project(delta.project.clone(), true);
                }
                ResourceDeltaKind::Removed => self.remove_project(&delta.project),
                ResourceDeltaKind::Changed => {
                    match self.get_node_by_object(delta.project.as_ref()) {
                        Some(node) => {
                            self.fire_event(&NavEvent::update(node, NodeChange::Refresh));
                        }
                        None => {
                            warn!(project = %delta.project.name(), "change on unknown project");
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::NavAction;
    use crate::node::ChildrenProvider;
    use crate::resource::ResourceHub;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TYPE_DATASOURCE: ObjectType = ObjectType::new("datasource");
    const TYPE_TABLE: ObjectType = ObjectType::new("table");

    struct SimpleObj {
        id: ObjectId,
        name: String,
        ty: ObjectType,
        parent: Option<Arc<dyn DbObject>>,
    }

    impl SimpleObj {
        fn new(name: &str, ty: ObjectType, parent: Option<Arc<dyn DbObject>>) -> Arc<Self> {
            Arc::new(Self {
                id: ObjectId::next(),
                name: name.into(),
                ty,
                parent,
            })
        }
    }

    impl DbObject for SimpleObj {
        fn id(&self) -> ObjectId {
            self.id
        }
        fn name(&self) -> &str {
            &self.name
        }
        fn object_type(&self) -> ObjectType {
            self.ty
        }
        fn parent_object(&self) -> Option<Arc<dyn DbObject>> {
            self.parent.clone()
        }
    }

    fn model_with_project() -> (Arc<NavigatorModel>, Arc<NavNode>) {
        let model = NavigatorModel::new();
        model.initialize(None);
        let project = model.add_project(Project::new("default"), false).unwrap();
        (model, project)
    }

    #[test]
    fn lookup_prefers_the_non_virtual_node() {
        let (model, project) = model_with_project();
        let ds: Arc<dyn DbObject> = SimpleObj::new("db1", TYPE_DATASOURCE, None);

        struct NoChildren;
        impl ChildrenProvider for NoChildren {
            fn load_children(
                &self,
                _cx: &Cx,
                _model: &NavigatorModel,
                _node: &Arc<NavNode>,
            ) -> Result<Vec<Arc<NavNode>>> {
                Ok(Vec::new())
            }
        }

        let folder = NavNode::folder(
            "Tables",
            TYPE_TABLE,
            ds.clone(),
            &project,
            Arc::new(NoChildren),
        );
        model.add_node(&folder, false);
        // Folder registered first, item second: preference still picks
        // the item node.
        let item = NavNode::item(ds.clone(), &project, None);
        model.add_node(&item, false);

        let found = model.get_node_by_object(ds.as_ref()).unwrap();
        assert!(Arc::ptr_eq(&found, &item));

        model.remove_node(&item, false);
        let found = model.get_node_by_object(ds.as_ref()).unwrap();
        assert!(Arc::ptr_eq(&found, &folder));
    }

    #[test]
    fn removing_an_unregistered_node_is_harmless() {
        let (model, project) = model_with_project();
        let ds: Arc<dyn DbObject> = SimpleObj::new("db1", TYPE_DATASOURCE, None);
        let node = NavNode::item(ds.clone(), &project, None);

        model.remove_node(&node, true);
        assert!(model.get_node_by_object(ds.as_ref()).is_none());
    }

    struct Recorder {
        seen: Mutex<Vec<NavAction>>,
    }

    impl NavListener for Recorder {
        fn node_changed(&self, event: &NavEvent) {
            self.seen.lock().unwrap().push(event.action);
        }
    }

    struct SelfRemover {
        model: Arc<NavigatorModel>,
        me: Mutex<Option<Arc<dyn NavListener>>>,
        calls: AtomicUsize,
    }

    impl NavListener for SelfRemover {
        fn node_changed(&self, _event: &NavEvent) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(me) = self.me.lock().unwrap().take() {
                self.model.remove_listener(&me);
            }
        }
    }

    #[test]
    fn dispatch_uses_a_listener_snapshot() {
        let (model, project) = model_with_project();
        let remover = Arc::new(SelfRemover {
            model: model.clone(),
            me: Mutex::new(None),
            calls: AtomicUsize::new(0),
        });
        *remover.me.lock().unwrap() = Some(remover.clone() as Arc<dyn NavListener>);
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
        });
        model.add_listener(remover.clone());
        model.add_listener(recorder.clone());

        let ds: Arc<dyn DbObject> = SimpleObj::new("db1", TYPE_DATASOURCE, None);
        model.attach(&project, NavNode::item(ds.clone(), &project, None), true);
        // Both snapshot members saw the first event even though the
        // remover dropped itself mid-dispatch.
        assert_eq!(remover.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*recorder.seen.lock().unwrap(), vec![NavAction::Add]);

        let ds2: Arc<dyn DbObject> = SimpleObj::new("db2", TYPE_DATASOURCE, None);
        model.attach(&project, NavNode::item(ds2, &project, None), true);
        assert_eq!(remover.calls.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.seen.lock().unwrap().len(), 2);
    }

    struct TablesProvider {
        tables: Vec<Arc<SimpleObj>>,
    }

    impl ChildrenProvider for TablesProvider {
        fn load_children(
            &self,
            _cx: &Cx,
            _model: &NavigatorModel,
            node: &Arc<NavNode>,
        ) -> Result<Vec<Arc<NavNode>>> {
            Ok(self
                .tables
                .iter()
                .map(|t| NavNode::item(t.clone() as Arc<dyn DbObject>, node, None))
                .collect())
        }
    }

    struct DsProvider {
        tables: Vec<Arc<SimpleObj>>,
    }

    impl ChildrenProvider for DsProvider {
        fn load_children(
            &self,
            _cx: &Cx,
            _model: &NavigatorModel,
            node: &Arc<NavNode>,
        ) -> Result<Vec<Arc<NavNode>>> {
            Ok(vec![NavNode::folder(
                "Tables",
                TYPE_TABLE,
                node.object().clone(),
                node,
                Arc::new(TablesProvider {
                    tables: self.tables.clone(),
                }),
            )])
        }
    }

    #[test]
    fn find_node_expands_ancestors_on_demand() {
        let cx = Cx::for_testing();
        let (model, project) = model_with_project();

        let ds = SimpleObj::new("db1", TYPE_DATASOURCE, None);
        let ds_obj: Arc<dyn DbObject> = ds.clone();
        let t1 = SimpleObj::new("t1", TYPE_TABLE, Some(ds_obj.clone()));
        let t2 = SimpleObj::new("t2", TYPE_TABLE, Some(ds_obj.clone()));

        let ds_node = NavNode::item(
            ds_obj.clone(),
            &project,
            Some(Arc::new(DsProvider {
                tables: vec![t1, t2.clone()],
            })),
        );
        model.attach(&project, ds_node, false);

        let t2_obj: Arc<dyn DbObject> = t2;
        let node = model.find_node(&cx, &t2_obj).unwrap();
        assert_eq!(node.label(), "t2");
        assert_eq!(node.node_path(), "default/db1/Tables/t2");
    }

    #[test]
    fn find_node_gives_up_without_an_ancestor_node() {
        let cx = Cx::for_testing();
        let (model, _project) = model_with_project();

        let ds: Arc<dyn DbObject> = SimpleObj::new("orphan", TYPE_DATASOURCE, None);
        let table: Arc<dyn DbObject> = SimpleObj::new("t", TYPE_TABLE, Some(ds));
        assert!(model.find_node(&cx, &table).is_none());
    }

    #[test]
    fn resource_deltas_drive_the_project_nodes() {
        let hub = ResourceHub::new();
        let model = NavigatorModel::new();
        model.initialize(Some(hub.clone() as Arc<dyn ResourceNotifier>));
        assert_eq!(hub.listener_count(), 1);

        let project = Project::new("p1");
        hub.notify(&ResourceEvent::single(
            ResourceDeltaKind::Added,
            project.clone(),
        ));
        assert!(model.get_node_by_object(project.as_ref()).is_some());
        assert_eq!(model.root().unwrap().cached_children().unwrap().len(), 1);

        hub.notify(&ResourceEvent::single(
            ResourceDeltaKind::Removed,
            project.clone(),
        ));
        assert!(model.get_node_by_object(project.as_ref()).is_none());
        assert!(model.root().unwrap().cached_children().unwrap().is_empty());

        model.dispose();
        assert_eq!(hub.listener_count(), 0);
    }
}
