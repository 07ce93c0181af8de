//! Keeps a node's children lined up with the collection its handler projects.
//!
//! Children are walked in lockstep with the collection. The matching prefix is left alone. From
//! the first mismatch on, the rest of the child list is rebuilt in collection order, but any old
//! child still bound to an element of the collection gets moved into its new slot instead of
//! being recreated, so its local state and subtree survive removals and insertions before it.
//! Appending and removing from the end never touch existing children.

use crate::components::node::Node;
use crate::components::value::BoundValue;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    /// children left in place
    pub kept: usize,
    /// children moved to a new index
    pub moved: usize,
    pub created: usize,
    pub removed: usize,
}

impl Reconciled {
    pub fn is_unchanged(&self) -> bool {
        self.moved == 0 && self.created == 0 && self.removed == 0
    }
}

/// Labels children by their position, `[0]`, `[1]`, ...
pub fn index_label(index: usize, _value: &BoundValue) -> String {
    format!("[{index}]")
}

/// Aligns `node`'s children with `items`.
///
/// Identity is decided by the node handler's `same_identity` (reference equality by default).
/// Children created here are passed to the handler's `setup_child` once they are attached.
pub fn reconcile<I>(
    node: &Node,
    items: I,
    mut label_for: impl FnMut(usize, &BoundValue) -> String,
) -> Reconciled
where
    I: IntoIterator<Item = BoundValue>,
{
    let items: Vec<BoundValue> = items.into_iter().collect();
    let handler = node.handler();
    let same = |existing: &BoundValue, incoming: &BoundValue| match &handler {
        Some(handler) => handler.same_identity(existing, incoming),
        None => existing.ptr_eq(incoming),
    };

    let children = node.children();
    let mut result = Reconciled::default();

    let mut index = 0;
    while index < items.len() && index < children.len() {
        let child = &children[index];
        match child.value() {
            Some(existing) if same(&existing, &items[index]) => {
                refresh(child, &existing, &items[index]);
                index += 1;
            }
            _ => break,
        }
    }
    result.kept = index;

    if index == items.len() && index == children.len() {
        return result;
    }

    let mut leftovers: Vec<Option<Node>> = children[index..].iter().cloned().map(Some).collect();
    let mut tail = Vec::with_capacity(items.len() - index);
    let mut created = Vec::new();

    for (offset, item) in items[index..].iter().enumerate() {
        let position = index + offset;
        let reusable = leftovers.iter_mut().find(|slot| {
            slot.as_ref()
                .and_then(|child| child.value())
                .is_some_and(|existing| same(&existing, item))
        });

        let child = match reusable.and_then(Option::take) {
            Some(child) => {
                if let Some(existing) = child.value() {
                    refresh(&child, &existing, item);
                }
                child.set_label(label_for(position, item));
                result.moved += 1;
                child
            }
            None => {
                let child = Node::new(label_for(position, item), item.clone(), None);
                created.push(child.clone());
                child
            }
        };
        tail.push(child);
    }

    result.created = created.len();
    result.removed = node.replace_children_from(index, tail);

    if let Some(handler) = &handler {
        for child in created.iter() {
            handler.setup_child(node, child);
        }
    }

    if !result.is_unchanged() {
        log::debug!("reconciled {}: {result:?}", node.path());
    }
    result
}

/// Same element, possibly behind a different handle (e.g. a new revision of a record). The child
/// follows the new handle but keeps everything else
fn refresh(child: &Node, existing: &BoundValue, incoming: &BoundValue) {
    if !existing.ptr_eq(incoming) {
        child.set(incoming.clone());
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::components::handler::Handler;
    use crate::components::value::{Shared, shared};
    use std::cell::Cell;
    use std::rc::Rc;

    fn items(values: &[&Shared<&'static str>]) -> Vec<BoundValue> {
        values
            .iter()
            .map(|value| BoundValue::from_shared((*value).clone()))
            .collect()
    }

    /// Counts setup calls and compares by value instead of by reference
    #[derive(Default)]
    struct ByValue {
        setups: Cell<usize>,
    }

    impl Handler for ByValue {
        fn setup_child(&self, _parent: &Node, child: &Node) {
            self.setups.set(self.setups.get() + 1);
            child.set_expanded(false);
        }

        fn same_identity(&self, existing: &BoundValue, incoming: &BoundValue) -> bool {
            existing.value_eq::<i64>(incoming)
        }
    }

    #[test]
    fn test_removal_from_front_keeps_state() {
        let (a, b, c) = (shared("a"), shared("b"), shared("c"));
        let list = Node::new("list", None, None);

        reconcile(&list, items(&[&a, &b, &c]), index_label);
        let b_node = list.child(1).unwrap();
        b_node.set_expanded(true);

        let result = reconcile(&list, items(&[&b, &c]), index_label);

        assert_eq!(list.child_count(), 2);
        let first = list.child(0).unwrap();
        assert!(first.ptr_eq(&b_node));
        assert!(first.is_expanded());
        assert_eq!(first.label(), "[0]");
        assert_eq!(
            result,
            Reconciled {
                kept: 0,
                moved: 2,
                created: 0,
                removed: 1,
            }
        );
    }

    #[test]
    fn test_tail_truncation() {
        let values: Vec<_> = ["a", "b", "c", "d"].into_iter().map(shared).collect();
        let list = Node::new("list", None, None);
        reconcile(&list, items(&values.iter().collect::<Vec<_>>()), index_label);
        let old_children = list.children();

        let result = reconcile(&list, items(&[&values[0], &values[1]]), index_label);

        assert_eq!(list.child_count(), 2);
        assert_eq!(result.kept, 2);
        assert_eq!(result.removed, 2);
        assert!(old_children[2].parent().is_none());
        assert!(old_children[3].parent().is_none());
    }

    #[test]
    fn test_append_only_creates_new() {
        let (a, b) = (shared("a"), shared("b"));
        let list = Node::new("list", None, None);
        reconcile(&list, items(&[&a]), index_label);
        let first = list.child(0).unwrap();

        let result = reconcile(&list, items(&[&a, &b]), index_label);

        assert!(list.child(0).unwrap().ptr_eq(&first));
        assert_eq!(result.kept, 1);
        assert_eq!(result.created, 1);
        assert!(reconcile(&list, items(&[&a, &b]), index_label).is_unchanged());
    }

    #[test]
    fn test_custom_identity_and_setup() {
        let handler = Rc::new(ByValue::default());
        let list = Node::new("numbers", None, Some(handler.clone()));
        let wrap = |values: &[i64]| -> Vec<BoundValue> {
            values.iter().map(|value| BoundValue::new(*value)).collect()
        };

        reconcile(&list, wrap(&[1, 2, 3]), index_label);
        assert_eq!(handler.setups.get(), 3);
        list.child(2).unwrap().set_expanded(true);

        // fresh wrappers every pass, same values: nothing gets rebuilt
        let result = reconcile(&list, wrap(&[1, 2, 3]), index_label);
        assert!(result.is_unchanged());
        assert_eq!(handler.setups.get(), 3);
        assert!(list.child(2).unwrap().is_expanded());

        // insertion in the middle only creates the new element
        let result = reconcile(&list, wrap(&[1, 5, 2, 3]), index_label);
        assert_eq!(result.created, 1);
        assert_eq!(handler.setups.get(), 4);
        assert!(list.child(3).unwrap().is_expanded());
        assert_eq!(*list.child(1).unwrap().get::<i64>().unwrap().borrow(), 5);
    }
}
