//! Navigation tree over cached database metadata.
//!
//! The [`NavigatorModel`] is a registry mapping metadata objects to the
//! tree nodes that present them. One object may back several nodes
//! (its item node plus the virtual folders grouped under it); lookups
//! prefer the non-virtual node. Tree mutations are reported to
//! registered [`NavListener`]s, and workspace resource changes
//! (projects appearing, disappearing, changing) feed the tree through
//! [`ResourceChangeListener`].

mod event;
mod model;
mod node;
mod resource;

pub use event::{NavAction, NavEvent, NavListener, NodeChange};
pub use model::NavigatorModel;
pub use node::{ChildrenProvider, NavNode, NodeKind};
pub use resource::{
    Project, ResourceChangeListener, ResourceDelta, ResourceDeltaKind, ResourceEvent,
    ResourceHub, ResourceNotifier,
};
