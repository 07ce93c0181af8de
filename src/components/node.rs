use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::sync::atomic::AtomicU64;

use crate::components::document::DocumentHandler;
use crate::components::event::{EventKind, raise};
use crate::components::handler::Handler;
use crate::components::history::History;
use crate::components::value::{BoundValue, Shared};
use crate::util::EditorError;

static GLOBAL_NODE_COUNTER: AtomicU64 = AtomicU64::new(0);

fn get_node_id() -> NodeId {
    GLOBAL_NODE_COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
}

/// Unique for the lifetime of the process, used to derive merge keys
pub type NodeId = u64;

/// UI state that belongs to one node and survives reconciliation for as long as the node keeps
/// its identity
#[derive(Debug, Default)]
pub struct LocalState {
    pub expanded: bool,
    /// contents of the filter box for handlers that support filtering their children
    pub filter: String,
    /// Text being typed into a field that only gets committed on enter/focus loss
    pub edit_buffer: Option<String>,
    cache: HashMap<TypeId, Box<dyn Any>>,
}

impl LocalState {
    pub fn cached<T: 'static>(&self) -> Option<&T> {
        self.cache
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<T>())
    }

    pub fn cached_mut<T: Default + 'static>(&mut self) -> &mut T {
        self.cache
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()))
            .downcast_mut::<T>()
            .expect("cache entries are keyed by their own TypeId")
    }

    pub fn set_cached<T: 'static>(&mut self, value: T) {
        self.cache.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Drops everything that might point at the current value, keeping presentation flags
    pub fn drop_transient(&mut self) {
        self.edit_buffer = None;
        self.cache.clear();
    }
}

pub struct NodeData {
    id: NodeId,
    label: String,
    value: Option<BoundValue>,
    parent: Weak<RefCell<NodeData>>,
    children: Vec<Node>,
    handler: Option<Rc<dyn Handler>>,
    dirty: bool,
    state: LocalState,
}

/// A single element of the editor tree. Cloning a `Node` clones the handle, not the node.
#[derive(Clone)]
pub struct Node(Rc<RefCell<NodeData>>);

/// Non-owning node handle, what commands keep so they never hold a subtree alive
#[derive(Clone, Debug, Default)]
pub struct WeakNode(Weak<RefCell<NodeData>>);

impl WeakNode {
    pub fn upgrade(&self) -> Option<Node> {
        self.0.upgrade().map(Node)
    }
}

impl Node {
    /// Creates a node without a parent, either a root or a child to be attached later
    pub fn new(
        label: impl Into<String>,
        value: impl Into<Option<BoundValue>>,
        handler: Option<Rc<dyn Handler>>,
    ) -> Self {
        Node(Rc::new(RefCell::new(NodeData {
            id: get_node_id(),
            label: label.into(),
            value: value.into(),
            parent: Weak::new(),
            children: Vec::new(),
            handler,
            dirty: false,
            state: LocalState::default(),
        })))
    }

    pub fn id(&self) -> NodeId {
        self.0.borrow().id
    }

    pub fn label(&self) -> String {
        self.0.borrow().label.clone()
    }

    pub fn set_label(&self, label: impl Into<String>) {
        self.0.borrow_mut().label = label.into();
    }

    /// Label path from the root, e.g. `bundle/assets/[2]/name`
    pub fn path(&self) -> String {
        let mut labels: Vec<String> = self.self_and_ancestors().map(|node| node.label()).collect();
        labels.reverse();
        labels.join("/")
    }

    pub fn value(&self) -> Option<BoundValue> {
        self.0.borrow().value.clone()
    }

    /// Typed access to the bound value. A mismatch means the node was bound wrong, which is a bug
    /// in whoever built it
    pub fn get<T: 'static>(&self) -> Result<Shared<T>, EditorError> {
        let data = self.0.borrow();
        match &data.value {
            Some(value) => value.downcast::<T>().ok_or_else(|| EditorError::TypeMismatch {
                label: data.label.clone(),
                expected: std::any::type_name::<T>(),
            }),
            None => Err(EditorError::Unbound {
                label: data.label.clone(),
            }),
        }
    }

    /// Replaces the bound value without recording anything. Edits that should be undoable go
    /// through the `History` instead
    pub fn set(&self, value: impl Into<Option<BoundValue>>) {
        self.0.borrow_mut().value = value.into();
    }

    pub fn handler(&self) -> Option<Rc<dyn Handler>> {
        self.0.borrow().handler.clone()
    }

    pub fn set_handler(&self, handler: Option<Rc<dyn Handler>>) {
        self.0.borrow_mut().handler = handler;
    }

    pub fn parent(&self) -> Option<Node> {
        self.0.borrow().parent.upgrade().map(Node)
    }

    pub fn children(&self) -> Vec<Node> {
        self.0.borrow().children.clone()
    }

    pub fn child(&self, index: usize) -> Option<Node> {
        self.0.borrow().children.get(index).cloned()
    }

    pub fn child_count(&self) -> usize {
        self.0.borrow().children.len()
    }

    pub fn add_child(
        &self,
        label: impl Into<String>,
        value: impl Into<Option<BoundValue>>,
        handler: Option<Rc<dyn Handler>>,
    ) -> Node {
        let index = self.child_count();
        self.insert_child(index, label, value, handler)
    }

    pub fn insert_child(
        &self,
        index: usize,
        label: impl Into<String>,
        value: impl Into<Option<BoundValue>>,
        handler: Option<Rc<dyn Handler>>,
    ) -> Node {
        let child = Node::new(label, value, handler);
        self.adopt(index, child.clone());
        child
    }

    /// Attaches an existing parentless node
    pub(crate) fn adopt(&self, index: usize, child: Node) {
        child.0.borrow_mut().parent = Rc::downgrade(&self.0);
        let mut data = self.0.borrow_mut();
        let index = index.min(data.children.len());
        data.children.insert(index, child);
    }

    /// Detaches `child`. Does nothing if it isn't one of ours
    pub fn remove_child(&self, child: &Node) {
        let removed = {
            let mut data = self.0.borrow_mut();
            match data.children.iter().position(|existing| existing.ptr_eq(child)) {
                Some(index) => Some(data.children.remove(index)),
                None => None,
            }
        };
        if let Some(removed) = removed {
            removed.0.borrow_mut().parent = Weak::new();
        }
    }

    /// Detaches every child, resetting the local state of the whole detached subtrees
    pub fn clear_children(&self) {
        let removed = std::mem::take(&mut self.0.borrow_mut().children);
        for child in removed {
            child.0.borrow_mut().parent = Weak::new();
            for node in child.descendants() {
                node.0.borrow_mut().state = LocalState::default();
            }
        }
    }

    /// Cuts the child list at `index` and appends `tail`. Old children that aren't part of the
    /// tail are detached
    pub(crate) fn replace_children_from(&self, index: usize, tail: Vec<Node>) -> usize {
        let removed: Vec<Node> = {
            let mut data = self.0.borrow_mut();
            let index = index.min(data.children.len());
            data.children.drain(index..).collect()
        };

        let mut dropped = 0;
        for old in removed.iter() {
            if !tail.iter().any(|kept| kept.ptr_eq(old)) {
                old.0.borrow_mut().parent = Weak::new();
                dropped += 1;
            }
        }

        for child in tail {
            self.adopt(usize::MAX, child);
        }

        dropped
    }

    pub fn is_dirty(&self) -> bool {
        self.0.borrow().dirty
    }

    pub(crate) fn set_dirty(&self, dirty: bool) {
        self.0.borrow_mut().dirty = dirty;
    }

    /// Marks this node (and through the Changed event, every ancestor) as modified
    pub fn mark_changed(&self) {
        raise(self, EventKind::Changed);
    }

    pub fn raise(&self, kind: EventKind) -> Option<Node> {
        raise(self, kind)
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&LocalState) -> R) -> R {
        f(&self.0.borrow().state)
    }

    pub fn with_state_mut<R>(&self, f: impl FnOnce(&mut LocalState) -> R) -> R {
        f(&mut self.0.borrow_mut().state)
    }

    pub fn is_expanded(&self) -> bool {
        self.0.borrow().state.expanded
    }

    pub fn set_expanded(&self, expanded: bool) {
        self.0.borrow_mut().state.expanded = expanded;
    }

    /// This node, then its parent, and so on up to the root
    pub fn self_and_ancestors(&self) -> impl Iterator<Item = Node> + use<> {
        std::iter::successors(Some(self.clone()), |node| node.parent())
    }

    /// Depth-first, pre-order walk of this subtree (including this node)
    pub fn descendants(&self) -> Vec<Node> {
        let mut found = Vec::new();
        let mut stack = vec![self.clone()];
        while let Some(node) = stack.pop() {
            stack.extend(node.children().into_iter().rev());
            found.push(node);
        }
        found
    }

    /// Walks up from this node until a handler of type `T` is found
    pub fn find_ancestor_handler<T: Handler>(&self) -> Option<(Node, Rc<T>)> {
        self.self_and_ancestors().find_map(|node| {
            let handler = node.handler()?;
            let typed = handler.into_any_rc().downcast::<T>().ok()?;
            Some((node, typed))
        })
    }

    /// The history of the document this node belongs to
    pub fn history(&self) -> Option<History> {
        self.find_ancestor_handler::<DocumentHandler>()
            .map(|(_, document)| document.history().clone())
    }

    pub fn downgrade(&self) -> WeakNode {
        WeakNode(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Runs the per-pass `sync` of every handler in this subtree, parents first so children
    /// created by a parent's reconciliation get synced in the same pass
    pub fn sync_tree(&self) {
        if let Some(handler) = self.handler() {
            handler.sync(self);
        }
        for child in self.children() {
            child.sync_tree();
        }
    }

    /// Renders this node with its handler, or its children when it has none
    pub fn render(&self, ui: &mut egui::Ui) {
        match self.handler() {
            Some(handler) => handler.render(self, ui),
            None => {
                for child in self.children() {
                    child.render(ui);
                }
            }
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.0.borrow();
        write!(
            f,
            "[Node | label=\"{}\" | id={} | children={} | dirty={}]",
            data.label,
            data.id,
            data.children.len(),
            data.dirty
        )
    }
}
