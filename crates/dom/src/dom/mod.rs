// ABOUTME: In-process host document: an arena HTML tree with scroll metrics and change notification.
// ABOUTME: Provides structural mutation primitives that feed mutation observers and legacy listeners.

//! Host document model.
//!
//! A [`Document`] owns every node it hands out; callers hold [`NodeId`]
//! handles. Nodes created by parsing or `create_element` start detached and
//! become visible once appended under the document root.
//!
//! Structural changes are reported two ways, depending on what the host
//! supports:
//! - mutation observers queue [`MutationRecord`]s and receive them as one
//!   batch per observer on [`Document::deliver_mutations`];
//! - legacy listeners receive a [`MutationEvent`] synchronously, but only for
//!   changes to the child list of the node they are registered on.

mod node;
mod parse;
mod serialize;

use std::fmt;

use ego_tree::{NodeId, NodeRef, Tree};
use tracing::trace;

use crate::error::{DomError, Result};
use crate::observe::{
    EventKind, ListenerId, MutationEvent, MutationRecord, ObserverId, ObserverOptions,
};
use crate::options::{DocumentBuilder, HostCapabilities, ScrollMetrics};
use crate::path::PathStep;

pub use node::{Element, Node};

type ObserverCallback = Box<dyn FnMut(&[MutationRecord])>;
type ListenerCallback = Box<dyn FnMut(&MutationEvent)>;

struct ObserverEntry {
    id: ObserverId,
    target: NodeId,
    options: ObserverOptions,
    queue: Vec<MutationRecord>,
    callback: ObserverCallback,
}

struct ListenerEntry {
    id: ListenerId,
    target: NodeId,
    kind: EventKind,
    callback: ListenerCallback,
}

/// An HTML document plus the host state the helpers read from it.
///
/// Nodes live in an append-only arena. Detaching a node, or dropping every
/// handle to a parsed fragment, leaves its slot allocated for the lifetime
/// of the document.
pub struct Document {
    tree: Tree<Node>,
    document_element: NodeId,
    body: Option<NodeId>,
    capabilities: HostCapabilities,
    scroll: ScrollMetrics,
    observers: Vec<ObserverEntry>,
    listeners: Vec<ListenerEntry>,
    next_registration: u64,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("document_element", &self.document_element)
            .field("capabilities", &self.capabilities)
            .field("scroll", &self.scroll)
            .field("observers", &self.observers.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty `<html><head></head><body></body></html>` document
    /// with a default host.
    pub fn new() -> Self {
        let mut tree = Tree::new(Node::Document);
        let mut root = tree.root_mut();
        let mut html = root.append(Node::Element(Element::new("html")));
        html.append(Node::Element(Element::new("head")));
        let body = html.append(Node::Element(Element::new("body"))).id();
        let document_element = html.id();
        Self::from_parts(tree, document_element, Some(body))
    }

    /// Parses a full HTML page into a document with a default host.
    pub fn parse(html: &str) -> Self {
        let mut tree = Tree::new(Node::Document);
        let top = parse::document_into(&mut tree, html);
        let root_id = tree.root().id();
        for id in &top {
            if let Some(mut root) = tree.get_mut(root_id) {
                root.append_id(*id);
            }
        }

        // The HTML parser always synthesizes <html>, <head> and <body>.
        let document_element = top
            .iter()
            .copied()
            .find(|id| tree.get(*id).is_some_and(|n| n.value().is_element()))
            .unwrap_or(root_id);
        let body = tree.get(document_element).and_then(|html| {
            html.children()
                .find(|c| c.value().as_element().is_some_and(|el| el.name() == "body"))
                .map(|c| c.id())
        });
        Self::from_parts(tree, document_element, body)
    }

    /// Start building a document with a custom host.
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::new()
    }

    fn from_parts(tree: Tree<Node>, document_element: NodeId, body: Option<NodeId>) -> Self {
        Self {
            tree,
            document_element,
            body,
            capabilities: HostCapabilities::default(),
            scroll: ScrollMetrics::default(),
            observers: Vec::new(),
            listeners: Vec::new(),
            next_registration: 1,
        }
    }

    // ------------------------------------------------------------------
    // Host state
    // ------------------------------------------------------------------

    pub fn capabilities(&self) -> &HostCapabilities {
        &self.capabilities
    }

    pub fn set_capabilities(&mut self, capabilities: HostCapabilities) {
        self.capabilities = capabilities;
    }

    pub fn scroll_metrics(&self) -> &ScrollMetrics {
        &self.scroll
    }

    pub fn set_scroll_metrics(&mut self, scroll: ScrollMetrics) {
        self.scroll = scroll;
    }

    /// Scrolls the window, updating the window-level offsets only.
    pub fn scroll_window_to(&mut self, left: f64, top: f64) {
        self.scroll.page_x_offset = left;
        self.scroll.page_y_offset = top;
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// The document node itself.
    pub fn root(&self) -> NodeId {
        self.tree.root().id()
    }

    /// The `<html>` element.
    pub fn document_element(&self) -> NodeId {
        self.document_element
    }

    pub fn body(&self) -> Option<NodeId> {
        self.body
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.node_ref(id).map(|n| n.value())
    }

    pub fn element(&self, id: NodeId) -> Result<&Element> {
        self.node(id)?
            .as_element()
            .ok_or(DomError::NotAnElement(id))
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.tree.get(id).is_some()
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node_ref(id)?.parent().map(|p| p.id()))
    }

    /// All child nodes, including text and comments.
    pub fn children(&self, id: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.node_ref(id)?.children().map(|c| c.id()).collect())
    }

    /// Element children only: the node's children collection.
    pub fn element_children(&self, id: NodeId) -> Result<Vec<NodeId>> {
        Ok(self
            .node_ref(id)?
            .children()
            .filter(|c| c.value().is_element())
            .map(|c| c.id())
            .collect())
    }

    /// Looks up one entry of a node's children collection by position or name.
    pub fn child_element(&self, id: NodeId, step: &PathStep) -> Result<Option<NodeId>> {
        let mut elements = self
            .node_ref(id)?
            .children()
            .filter(|c| c.value().is_element());
        let found = match step {
            PathStep::Index(index) => elements.nth(*index),
            PathStep::Name(key) => {
                elements.find(|c| c.value().as_element().is_some_and(|el| el.matches_name(key)))
            }
        };
        Ok(found.map(|c| c.id()))
    }

    /// True if the node is reachable from the document root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        let root = self.root();
        match self.tree.get(id) {
            Some(node) => node.id() == root || node.ancestors().any(|a| a.id() == root),
            None => false,
        }
    }

    /// True if `ancestor` is `id` or one of its ancestors.
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        match self.tree.get(id) {
            Some(node) => node.id() == ancestor || node.ancestors().any(|a| a.id() == ancestor),
            None => false,
        }
    }

    pub fn tag_name(&self, id: NodeId) -> Result<&str> {
        Ok(self.element(id)?.name())
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Result<Option<&str>> {
        Ok(self.element(id)?.attr(name))
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> Result<String> {
        let node = self.node_ref(id)?;
        Ok(node
            .descendants()
            .filter_map(|d| match d.value() {
                Node::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect())
    }

    pub fn outer_html(&self, id: NodeId) -> Result<String> {
        Ok(serialize::outer_html(self.node_ref(id)?))
    }

    pub fn inner_html(&self, id: NodeId) -> Result<String> {
        Ok(serialize::inner_html(self.node_ref(id)?))
    }

    fn node_ref(&self, id: NodeId) -> Result<NodeRef<'_, Node>> {
        self.tree.get(id).ok_or(DomError::NodeNotFound(id))
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Creates a detached element.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.tree.orphan(Node::Element(Element::new(name))).id()
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.tree.orphan(Node::Text(text.to_string())).id()
    }

    /// Parses an HTML fragment into detached nodes without inserting them.
    pub fn parse_fragment(&mut self, html: &str) -> Vec<NodeId> {
        parse::fragment_into(&mut self.tree, html)
    }

    /// Appends `child` as the last child of `parent`, moving it if it is
    /// already attached elsewhere.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_insert(parent, child)?;
        if let Some(old_parent) = self.parent(child)? {
            self.detach(child)?;
            trace!(?child, ?old_parent, "moved node before re-insertion");
        }
        self.attach(parent, child);
        self.record(MutationRecord::child_list(parent, vec![child], Vec::new()));
        self.dispatch(EventKind::NodeInserted, parent, child);
        Ok(())
    }

    /// Parses `html` and appends the resulting nodes to `parent`.
    ///
    /// Observers see one record listing every inserted node.
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> Result<Vec<NodeId>> {
        if !self.node(parent)?.can_have_children() {
            return Err(DomError::HierarchyRequest {
                parent,
                child: parent,
            });
        }
        let added = self.parse_fragment(html);
        for child in &added {
            self.attach(parent, *child);
        }
        if !added.is_empty() {
            self.record(MutationRecord::child_list(parent, added.clone(), Vec::new()));
            for child in &added {
                self.dispatch(EventKind::NodeInserted, parent, *child);
            }
        }
        Ok(added)
    }

    /// Removes `id` from its parent. The subtree stays valid but detached.
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        let parent = self.parent(id)?.ok_or(DomError::NoParent(id))?;
        self.dispatch(EventKind::NodeRemoved, parent, id);
        if let Some(mut node) = self.tree.get_mut(id) {
            node.detach();
        }
        self.record(MutationRecord::child_list(parent, Vec::new(), vec![id]));
        Ok(())
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        self.with_element_mut(id, |el| el.set_attr(name, value))?;
        self.record(MutationRecord::attribute(id, name));
        Ok(())
    }

    /// Removes an attribute, returning its old value.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<Option<String>> {
        let old = self.with_element_mut(id, |el| el.remove_attr(name))?;
        if old.is_some() {
            self.record(MutationRecord::attribute(id, name));
        }
        Ok(old)
    }

    fn with_element_mut<R>(&mut self, id: NodeId, f: impl FnOnce(&mut Element) -> R) -> Result<R> {
        let mut node = self.tree.get_mut(id).ok_or(DomError::NodeNotFound(id))?;
        match node.value() {
            Node::Element(el) => Ok(f(el)),
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let parent_node = self.node(parent)?;
        let child_node = self.node(child)?;
        if !parent_node.can_have_children()
            || matches!(child_node, Node::Document)
            || self.is_inclusive_ancestor(child, parent)
        {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        Ok(())
    }

    fn attach(&mut self, parent: NodeId, child: NodeId) {
        if let Some(mut node) = self.tree.get_mut(parent) {
            node.append_id(child);
        }
    }

    // ------------------------------------------------------------------
    // Change notification
    // ------------------------------------------------------------------

    /// Registers a mutation observer on `target`.
    pub fn observe_mutations<F>(
        &mut self,
        target: NodeId,
        options: ObserverOptions,
        callback: F,
    ) -> Result<ObserverId>
    where
        F: FnMut(&[MutationRecord]) + 'static,
    {
        if !self.capabilities.mutation_observer {
            return Err(DomError::Unsupported("mutation observers"));
        }
        self.node(target)?;
        let id = ObserverId(self.next_id());
        self.observers.push(ObserverEntry {
            id,
            target,
            options,
            queue: Vec::new(),
            callback: Box::new(callback),
        });
        Ok(id)
    }

    /// Unregisters an observer and drops its queued records.
    pub fn disconnect_observer(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| o.id != id);
        self.observers.len() != before
    }

    /// Registers a legacy insertion/removal listener on `target`.
    pub fn add_listener<F>(&mut self, target: NodeId, kind: EventKind, callback: F) -> Result<ListenerId>
    where
        F: FnMut(&MutationEvent) + 'static,
    {
        if !self.capabilities.event_listeners {
            return Err(DomError::Unsupported("event listeners"));
        }
        self.node(target)?;
        let id = ListenerId(self.next_id());
        self.listeners.push(ListenerEntry {
            id,
            target,
            kind,
            callback: Box::new(callback),
        });
        Ok(id)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() != before
    }

    /// Number of records waiting for the next delivery.
    pub fn pending_records(&self) -> usize {
        self.observers.iter().map(|o| o.queue.len()).sum()
    }

    /// Hands each observer its queued records as one batch, in registration
    /// order. Returns how many batches were delivered.
    pub fn deliver_mutations(&mut self) -> usize {
        let mut delivered = 0;
        for observer in self.observers.iter_mut() {
            if observer.queue.is_empty() {
                continue;
            }
            let batch = std::mem::take(&mut observer.queue);
            trace!(observer = ?observer.id, records = batch.len(), "delivering mutation batch");
            (observer.callback)(&batch);
            delivered += 1;
        }
        delivered
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_registration;
        self.next_registration += 1;
        id
    }

    fn record(&mut self, record: MutationRecord) {
        if self.observers.is_empty() {
            return;
        }
        let tree = &self.tree;
        for observer in self.observers.iter_mut() {
            if !observer.options.wants(&record.kind) {
                continue;
            }
            let in_scope = record.target == observer.target
                || (observer.options.subtree
                    && tree
                        .get(record.target)
                        .is_some_and(|n| n.ancestors().any(|a| a.id() == observer.target)));
            if in_scope {
                observer.queue.push(record.clone());
            }
        }
    }

    fn dispatch(&mut self, kind: EventKind, target: NodeId, node: NodeId) {
        let event = MutationEvent { kind, target, node };
        for listener in self
            .listeners
            .iter_mut()
            .filter(|l| l.kind == kind && l.target == target)
        {
            (listener.callback)(&event);
        }
    }
}
