//! Workspace resources feeding the navigator tree.

use std::sync::{Arc, Mutex};

use dbworkbench_core::{DbObject, ObjectId, ObjectType};

pub const TYPE_PROJECT: ObjectType = ObjectType::new("project");

/// A workspace project grouping data sources.
pub struct Project {
    id: ObjectId,
    name: String,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: ObjectId::next(),
            name: name.into(),
        })
    }
}

impl DbObject for Project {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn object_type(&self) -> ObjectType {
        TYPE_PROJECT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceDeltaKind {
    Added,
    Removed,
    Changed,
}

#[derive(Clone)]
pub struct ResourceDelta {
    pub kind: ResourceDeltaKind,
    pub project: Arc<Project>,
}

#[derive(Clone)]
pub struct ResourceEvent {
    pub deltas: Vec<ResourceDelta>,
}

impl ResourceEvent {
    pub fn single(kind: ResourceDeltaKind, project: Arc<Project>) -> Self {
        Self {
            deltas: vec![ResourceDelta { kind, project }],
        }
    }
}

/// Receiver of workspace resource changes.
pub trait ResourceChangeListener: Send + Sync {
    fn resource_changed(&self, event: &ResourceEvent);
}

/// Source of workspace resource changes. The navigator model
/// subscribes on initialization and unsubscribes on dispose.
pub trait ResourceNotifier: Send + Sync {
    fn subscribe(&self, listener: Arc<dyn ResourceChangeListener>);
    fn unsubscribe(&self, listener: &Arc<dyn ResourceChangeListener>);
}

/// In-process resource change fan-out.
#[derive(Default)]
pub struct ResourceHub {
    listeners: Mutex<Vec<Arc<dyn ResourceChangeListener>>>,
}

impl ResourceHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Delivers an event to a snapshot of the current listeners.
    pub fn notify(&self, event: &ResourceEvent) {
        let snapshot = self
            .listeners
            .lock()
            .expect("resource hub lock poisoned")
            .clone();
        for listener in snapshot {
            listener.resource_changed(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .expect("resource hub lock poisoned")
            .len()
    }
}

impl ResourceNotifier for ResourceHub {
    fn subscribe(&self, listener: Arc<dyn ResourceChangeListener>) {
        self.listeners
            .lock()
            .expect("resource hub lock poisoned")
            .push(listener);
    }

    fn unsubscribe(&self, listener: &Arc<dyn ResourceChangeListener>) {
        let mut listeners = self.listeners.lock().expect("resource hub lock poisoned");
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
    }
}
