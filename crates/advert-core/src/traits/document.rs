// # Document Trait
//
// Defines the slice of the DOM the advert slots need.
//
// ## Implementations
//
// - In-memory: `crate::dom::MemoryDocument` (tests, headless runs)
// - Future: a wasm binding forwarding each call to `web_sys`
//
// Nodes are addressed by opaque [`NodeId`] handles so that ownership of the
// underlying tree stays with the implementation.

use std::sync::Arc;

/// Opaque handle to a node owned by a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Handle returned when a child-list observation starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverHandle(pub u64);

/// A node that appeared in an observed child list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddedNode {
    /// An element, with its `id` attribute (empty when unset)
    Element { id: String },
    /// Text, comments and every other non-element node
    Other,
}

impl AddedNode {
    pub fn element(id: impl Into<String>) -> Self {
        Self::Element { id: id.into() }
    }

    /// The element id, or `None` for non-element nodes
    pub fn element_id(&self) -> Option<&str> {
        match self {
            Self::Element { id } => Some(id),
            Self::Other => None,
        }
    }
}

/// One child-list change on an observed node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    /// The observed node whose children changed
    pub target: NodeId,
    /// Nodes inserted by this change, in insertion order
    pub added_nodes: Vec<AddedNode>,
    /// How many nodes this change removed
    pub removed_count: usize,
}

impl MutationRecord {
    pub fn added(target: NodeId, added_nodes: Vec<AddedNode>) -> Self {
        Self {
            target,
            added_nodes,
            removed_count: 0,
        }
    }

    pub fn removed(target: NodeId, removed_count: usize) -> Self {
        Self {
            target,
            added_nodes: Vec::new(),
            removed_count,
        }
    }
}

/// Click handler registered on an element
pub type ClickListener = Arc<dyn Fn() + Send + Sync>;

/// Receives one batch of mutation records per delivery
pub type MutationCallback = Arc<dyn Fn(&[MutationRecord]) + Send + Sync>;

/// Trait for DOM implementations
///
/// Mutation callbacks must never be invoked from inside one of these calls:
/// records are queued and delivered as one batch after the triggering change
/// has completed, in the order the changes were made.
pub trait Document: Send + Sync {
    /// The page body
    fn body(&self) -> NodeId;

    /// Create a detached element
    fn create_element(&self, tag: &str) -> NodeId;

    /// Create a detached text node
    fn create_text_node(&self, text: &str) -> NodeId;

    /// Find an element attached to the page by its id
    fn get_element_by_id(&self, id: &str) -> Option<NodeId>;

    fn set_id(&self, node: NodeId, id: &str);

    fn add_class(&self, node: NodeId, class: &str);

    fn set_style(&self, node: NodeId, property: &str, value: &str);

    /// Replace the node's content with plain text
    fn set_text(&self, node: NodeId, text: &str);

    /// Insert `child` as the first child of `parent`
    fn prepend(&self, parent: NodeId, child: NodeId);

    /// Insert `child` as the last child of `parent`
    fn append_child(&self, parent: NodeId, child: NodeId);

    /// Detach a node from its parent (no-op when already detached)
    fn remove(&self, node: NodeId);

    fn add_click_listener(&self, node: NodeId, listener: ClickListener);

    /// Watch direct child-list changes of `target`
    ///
    /// Attribute and subtree changes are not reported.
    fn observe_child_list(&self, target: NodeId, callback: MutationCallback) -> ObserverHandle;

    /// Stop an observation and discard its undelivered records
    fn disconnect(&self, observer: ObserverHandle);
}
