//! Notifications that bubble from a node up to the root.
//!
//! Every kind has a fixed effect on the tree that happens no matter who consumes the event
//! (dirty flags, transient state), after which each handler from the origin upward gets a chance
//! to react. A handler returning `true` stops the walk.

use crate::components::node::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A value under the origin was edited
    Changed,
    /// The owning document wrote its current state, origin's subtree is clean again
    Saved,
    /// The owning document is about to replace its value with the stored one
    Reverting,
}

/// Returns the node whose handler consumed the event, if any
pub fn raise(origin: &Node, kind: EventKind) -> Option<Node> {
    match kind {
        EventKind::Changed => {
            for node in origin.self_and_ancestors() {
                node.set_dirty(true);
            }
        }
        EventKind::Saved => {
            for node in origin.descendants() {
                node.set_dirty(false);
            }
        }
        EventKind::Reverting => {
            for node in origin.descendants() {
                node.set_dirty(false);
                node.with_state_mut(|state| state.drop_transient());
            }
        }
    }

    for node in origin.self_and_ancestors() {
        let Some(handler) = node.handler() else {
            continue;
        };
        if handler.on_event(&node, origin, kind) {
            log::debug!("{kind:?} from {} consumed at {}", origin.path(), node.path());
            return Some(node);
        }
    }

    None
}
