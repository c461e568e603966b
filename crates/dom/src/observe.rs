// ABOUTME: Change-notification types shared by the document and the helpers.
// ABOUTME: Mutation records, observer options, legacy mutation events, and registration handles.

use ego_tree::NodeId;

/// Identifies a registered mutation observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u64);

/// Identifies a registered legacy event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

/// What kind of change a record describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    ChildList,
    Attributes { name: String },
}

/// One structural or attribute change, queued for mutation observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    /// The node whose child list or attribute changed.
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

impl MutationRecord {
    pub(crate) fn child_list(target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) -> Self {
        Self {
            kind: MutationKind::ChildList,
            target,
            added,
            removed,
        }
    }

    pub(crate) fn attribute(target: NodeId, name: &str) -> Self {
        Self {
            kind: MutationKind::Attributes {
                name: name.to_ascii_lowercase(),
            },
            target,
            added: Vec::new(),
            removed: Vec::new(),
        }
    }

    /// True if the record inserted or removed at least one node.
    pub fn changes_nodes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }
}

/// Which records an observer wants to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObserverOptions {
    pub child_list: bool,
    pub attributes: bool,
    /// Also receive records targeting descendants of the observed node.
    pub subtree: bool,
}

impl ObserverOptions {
    /// Child-list changes anywhere under the observed node.
    pub fn subtree_child_list() -> Self {
        Self {
            child_list: true,
            attributes: false,
            subtree: true,
        }
    }

    pub(crate) fn wants(&self, kind: &MutationKind) -> bool {
        match kind {
            MutationKind::ChildList => self.child_list,
            MutationKind::Attributes { .. } => self.attributes,
        }
    }
}

/// Legacy per-node mutation events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    NodeInserted,
    NodeRemoved,
}

/// Payload handed to legacy event listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationEvent {
    pub kind: EventKind,
    /// The parent the listener was registered on.
    pub target: NodeId,
    /// The node that was inserted or removed.
    pub node: NodeId,
}

/// Handle returned by `Dom::observe`, used to stop watching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Watching through a subtree mutation observer.
    Observer(ObserverId),
    /// Watching through the two legacy events on the node itself.
    Listeners {
        inserted: ListenerId,
        removed: ListenerId,
    },
    /// The host offers no way to watch; nothing was installed.
    Unsupported,
}

impl Observation {
    pub fn is_active(&self) -> bool {
        !matches!(self, Observation::Unsupported)
    }
}
