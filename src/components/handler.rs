use std::any::Any;
use std::rc::Rc;

use crate::components::event::EventKind;
use crate::components::node::Node;
use crate::components::value::BoundValue;

/// Lets `find_ancestor_handler` get back from `Rc<dyn Handler>` to the concrete handler type
pub trait AsAny: Any {
    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn into_any_rc(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// Behaviour attached to a node. Handlers are shared (`Rc`) and take `&self`; anything that
/// needs to persist between frames belongs in the node's `LocalState`, not the handler.
pub trait Handler: AsAny {
    /// Draw the node and react to input. Edits go through `node.history()`, never straight into
    /// the bound value.
    fn render(&self, node: &Node, ui: &mut egui::Ui) {
        ui.label(node.label());
    }

    /// Called once per pass before rendering. Handlers that project a collection into children
    /// call `reconcile` from here.
    fn sync(&self, _node: &Node) {}

    /// Called by the reconciler for every child it creates under `parent`, so the child can be
    /// given a handler (and children of its own)
    fn setup_child(&self, _parent: &Node, _child: &Node) {}

    /// Receives events bubbling up from `origin`. Return true to stop the event here.
    fn on_event(&self, _node: &Node, _origin: &Node, _kind: EventKind) -> bool {
        false
    }

    /// Identity comparer used when reconciling this node's children
    fn same_identity(&self, existing: &BoundValue, incoming: &BoundValue) -> bool {
        existing.ptr_eq(incoming)
    }

    fn handler_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl std::fmt::Debug for dyn Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[Handler: {}]", self.handler_name())
    }
}
