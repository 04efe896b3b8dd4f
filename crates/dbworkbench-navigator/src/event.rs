//! Navigator model events.

use std::sync::Arc;

use crate::node::NavNode;

/// What happened to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    Add,
    Remove,
    Update,
}

/// Refinement for [`NavAction::Update`] events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeChange {
    /// Children were loaded for the node.
    Load,
    /// Children were dropped from the node.
    Unload,
    /// The node's content should be re-read.
    Refresh,
    /// The node's subtree structure changed.
    StructRefresh,
}

#[derive(Clone)]
pub struct NavEvent {
    pub action: NavAction,
    pub change: Option<NodeChange>,
    pub node: Arc<NavNode>,
}

impl NavEvent {
    pub fn add(node: Arc<NavNode>) -> Self {
        Self {
            action: NavAction::Add,
            change: None,
            node,
        }
    }

    pub fn remove(node: Arc<NavNode>) -> Self {
        Self {
            action: NavAction::Remove,
            change: None,
            node,
        }
    }

    pub fn update(node: Arc<NavNode>, change: NodeChange) -> Self {
        Self {
            action: NavAction::Update,
            change: Some(change),
            node,
        }
    }
}

/// Observer of navigator tree changes.
///
/// Dispatch happens over a snapshot of the listener list taken under
/// the model lock, so a listener that unregisters itself (or others)
/// while handling an event still sees that event delivered to the
/// snapshot's members.
pub trait NavListener: Send + Sync {
    fn node_changed(&self, event: &NavEvent);
}
