// # Memory Document
//
// In-memory implementation of Document.
//
// ## Purpose
//
// Provides a small node tree with the DOM behaviour advert slots depend on:
// element ids and classes, inline styles, click listeners and child-list
// observation. Useful for tests and for headless runs where no browser is
// available.
//
// ## Mutation Delivery
//
// Child-list changes are queued per observation and only delivered by
// `flush_mutations()`, one batch per observation, in the order the changes
// were made. This mirrors the browser delivering observer callbacks in a
// microtask after the triggering script has finished.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::traits::document::{
    AddedNode, ClickListener, Document, MutationCallback, MutationRecord, NodeId, ObserverHandle,
};

/// Upper bound on delivery rounds in `flush_until_idle()`
const MAX_FLUSH_ROUNDS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKind {
    Element { tag: String },
    Text,
}

struct Node {
    kind: NodeKind,
    id: String,
    classes: Vec<String>,
    styles: BTreeMap<String, String>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    listeners: Vec<ClickListener>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            id: String::new(),
            classes: Vec::new(),
            styles: BTreeMap::new(),
            text: String::new(),
            parent: None,
            children: Vec::new(),
            listeners: Vec::new(),
        }
    }

    fn describe(&self) -> AddedNode {
        match self.kind {
            NodeKind::Element { .. } => AddedNode::element(self.id.clone()),
            NodeKind::Text => AddedNode::Other,
        }
    }
}

struct Observation {
    target: NodeId,
    callback: MutationCallback,
    pending: Vec<MutationRecord>,
}

struct DomState {
    next_node: u64,
    next_observer: u64,
    body: NodeId,
    nodes: HashMap<NodeId, Node>,
    observations: BTreeMap<u64, Observation>,
}

impl DomState {
    fn new() -> Self {
        let body = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            body,
            Node::new(NodeKind::Element {
                tag: "body".to_string(),
            }),
        );

        Self {
            next_node: 1,
            next_observer: 1,
            body,
            nodes,
            observations: BTreeMap::new(),
        }
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(id, Node::new(kind));
        id
    }

    fn queue(&mut self, record: MutationRecord) {
        for observation in self.observations.values_mut() {
            if observation.target == record.target {
                observation.pending.push(record.clone());
            }
        }
    }

    fn describe(&self, node: NodeId) -> AddedNode {
        self.nodes
            .get(&node)
            .map(Node::describe)
            .unwrap_or(AddedNode::Other)
    }

    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.nodes.get_mut(&node).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            parent_node.children.retain(|child| *child != node);
        }
        self.queue(MutationRecord::removed(parent, 1));
    }

    fn insert(&mut self, parent: NodeId, child: NodeId, at_front: bool) {
        if parent == child || !self.nodes.contains_key(&child) {
            warn!("Ignoring invalid insertion of {:?} into {:?}", child, parent);
            return;
        }
        if !self.nodes.contains_key(&parent) {
            warn!("Ignoring insertion into unknown node {:?}", parent);
            return;
        }

        self.detach(child);

        if let Some(parent_node) = self.nodes.get_mut(&parent) {
            if at_front {
                parent_node.children.insert(0, child);
            } else {
                parent_node.children.push(child);
            }
        }
        if let Some(child_node) = self.nodes.get_mut(&child) {
            child_node.parent = Some(parent);
        }

        let added = self.describe(child);
        self.queue(MutationRecord::added(parent, vec![added]));
    }

    fn is_connected(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.body {
                return true;
            }
            current = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }
}

/// In-memory document implementation
///
/// # Example
///
/// ```rust
/// use advert_core::dom::MemoryDocument;
/// use advert_core::traits::Document;
///
/// let document = MemoryDocument::new();
/// let div = document.create_element("div");
/// document.set_id(div, "slot");
/// document.append_child(document.body(), div);
///
/// assert_eq!(document.get_element_by_id("slot"), Some(div));
/// ```
pub struct MemoryDocument {
    inner: Mutex<DomState>,
}

impl MemoryDocument {
    /// Create a document holding only an empty body
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(DomState::new()),
        }
    }

    fn state(&self) -> MutexGuard<'_, DomState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_node<T>(&self, node: NodeId, read: impl FnOnce(&Node) -> T) -> Option<T> {
        self.state().nodes.get(&node).map(read)
    }

    fn with_node_mut(&self, node: NodeId, write: impl FnOnce(&mut Node)) {
        match self.state().nodes.get_mut(&node) {
            Some(n) => write(n),
            None => warn!("Ignoring update of unknown node {:?}", node),
        }
    }

    /// Child nodes, in order
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.with_node(node, |n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.with_node(node, |n| n.parent).flatten()
    }

    /// The id attribute (empty when unset)
    pub fn element_id(&self, node: NodeId) -> Option<String> {
        self.with_node(node, |n| n.id.clone())
    }

    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        self.with_node(node, |n| match &n.kind {
            NodeKind::Element { tag } => Some(tag.clone()),
            NodeKind::Text => None,
        })
        .flatten()
    }

    pub fn classes(&self, node: NodeId) -> Vec<String> {
        self.with_node(node, |n| n.classes.clone())
            .unwrap_or_default()
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.with_node(node, |n| n.classes.iter().any(|c| c == class))
            .unwrap_or(false)
    }

    pub fn text(&self, node: NodeId) -> Option<String> {
        self.with_node(node, |n| n.text.clone())
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<String> {
        self.with_node(node, |n| n.styles.get(property).cloned())
            .flatten()
    }

    /// Whether the node is attached to the body
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.state().is_connected(node)
    }

    /// Number of live child-list observations
    pub fn observation_count(&self) -> usize {
        self.state().observations.len()
    }

    /// Records queued but not yet delivered
    pub fn pending_records(&self) -> usize {
        self.state()
            .observations
            .values()
            .map(|o| o.pending.len())
            .sum()
    }

    /// Replace all children of `parent` in a single change
    ///
    /// This is what an ad SDK does when it renders a fresh creative.
    pub fn replace_children(&self, parent: NodeId, children: Vec<NodeId>) {
        let mut state = self.state();
        let Some(old) = state.nodes.get_mut(&parent).map(|n| std::mem::take(&mut n.children)) else {
            warn!("Ignoring replacement in unknown node {:?}", parent);
            return;
        };
        for child in &old {
            if let Some(n) = state.nodes.get_mut(child) {
                n.parent = None;
            }
        }

        let mut added = Vec::with_capacity(children.len());
        for child in children {
            if child == parent || !state.nodes.contains_key(&child) {
                continue;
            }
            state.detach(child);
            if let Some(n) = state.nodes.get_mut(&child) {
                n.parent = Some(parent);
            }
            if let Some(p) = state.nodes.get_mut(&parent) {
                p.children.push(child);
            }
            added.push(state.describe(child));
        }

        state.queue(MutationRecord {
            target: parent,
            added_nodes: added,
            removed_count: old.len(),
        });
    }

    /// Dispatch a click to the node's listeners
    ///
    /// Returns whether any listener ran.
    pub fn click(&self, node: NodeId) -> bool {
        let listeners = self
            .with_node(node, |n| n.listeners.clone())
            .unwrap_or_default();

        for listener in &listeners {
            listener();
        }
        !listeners.is_empty()
    }

    /// Deliver queued records, one batch per observation
    ///
    /// Returns how many batches were delivered. Records produced by the
    /// callbacks themselves stay queued for the next flush.
    pub fn flush_mutations(&self) -> usize {
        let batches: Vec<(MutationCallback, Vec<MutationRecord>)> = {
            let mut state = self.state();
            state
                .observations
                .values_mut()
                .filter(|o| !o.pending.is_empty())
                .map(|o| (o.callback.clone(), std::mem::take(&mut o.pending)))
                .collect()
        };

        for (callback, records) in &batches {
            callback(records);
        }
        batches.len()
    }

    /// Flush repeatedly until no records remain
    pub fn flush_until_idle(&self) -> usize {
        let mut delivered = 0;
        for _ in 0..MAX_FLUSH_ROUNDS {
            let batches = self.flush_mutations();
            if batches == 0 {
                return delivered;
            }
            delivered += batches;
        }
        warn!(
            "Mutation delivery still busy after {} rounds, giving up",
            MAX_FLUSH_ROUNDS
        );
        delivered
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl Document for MemoryDocument {
    fn body(&self) -> NodeId {
        self.state().body
    }

    fn create_element(&self, tag: &str) -> NodeId {
        self.state().alloc(NodeKind::Element {
            tag: tag.to_string(),
        })
    }

    fn create_text_node(&self, text: &str) -> NodeId {
        let mut state = self.state();
        let node = state.alloc(NodeKind::Text);
        if let Some(n) = state.nodes.get_mut(&node) {
            n.text = text.to_string();
        }
        node
    }

    fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        if id.is_empty() {
            return None;
        }
        let state = self.state();
        state
            .nodes
            .iter()
            .filter(|(_, n)| matches!(n.kind, NodeKind::Element { .. }) && n.id == id)
            .map(|(node, _)| *node)
            .filter(|node| state.is_connected(*node))
            .min()
    }

    fn set_id(&self, node: NodeId, id: &str) {
        self.with_node_mut(node, |n| n.id = id.to_string());
    }

    fn add_class(&self, node: NodeId, class: &str) {
        self.with_node_mut(node, |n| {
            if !n.classes.iter().any(|c| c == class) {
                n.classes.push(class.to_string());
            }
        });
    }

    fn set_style(&self, node: NodeId, property: &str, value: &str) {
        self.with_node_mut(node, |n| {
            n.styles.insert(property.to_string(), value.to_string());
        });
    }

    fn set_text(&self, node: NodeId, text: &str) {
        let mut state = self.state();
        let Some(old) = state.nodes.get_mut(&node).map(|n| {
            n.text = text.to_string();
            std::mem::take(&mut n.children)
        }) else {
            warn!("Ignoring text update of unknown node {:?}", node);
            return;
        };

        for child in &old {
            if let Some(n) = state.nodes.get_mut(child) {
                n.parent = None;
            }
        }
        if !old.is_empty() {
            state.queue(MutationRecord::removed(node, old.len()));
        }
    }

    fn prepend(&self, parent: NodeId, child: NodeId) {
        self.state().insert(parent, child, true);
    }

    fn append_child(&self, parent: NodeId, child: NodeId) {
        self.state().insert(parent, child, false);
    }

    fn remove(&self, node: NodeId) {
        self.state().detach(node);
    }

    fn add_click_listener(&self, node: NodeId, listener: ClickListener) {
        self.with_node_mut(node, |n| n.listeners.push(listener));
    }

    fn observe_child_list(&self, target: NodeId, callback: MutationCallback) -> ObserverHandle {
        let mut state = self.state();
        let handle = state.next_observer;
        state.next_observer += 1;
        state.observations.insert(
            handle,
            Observation {
                target,
                callback,
                pending: Vec::new(),
            },
        );
        debug!("Observing child list of {:?} (observer {})", target, handle);
        ObserverHandle(handle)
    }

    fn disconnect(&self, observer: ObserverHandle) {
        if self.state().observations.remove(&observer.0).is_some() {
            debug!("Disconnected observer {}", observer.0);
        }
    }
}
