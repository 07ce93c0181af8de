use std::marker::PhantomData;

use crate::components::{BoundValue, Handler, Node};
use crate::ui::handlers::{HandlerRegistry, expand_toggle, node_title, show_error};

/// A struct whose fields each get their own child node
pub trait Record: 'static {
    fn title(&self) -> String;

    /// Field names with the shared values behind them, in display order
    fn fields(&self) -> Vec<(&'static str, BoundValue)>;
}

pub struct RecordHandler<R> {
    registry: HandlerRegistry,
    _record: PhantomData<R>,
}

impl<R: Record> RecordHandler<R> {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            registry,
            _record: PhantomData,
        }
    }
}

impl<R: Record> Handler for RecordHandler<R> {
    fn sync(&self, node: &Node) {
        let record = match node.get::<R>() {
            Ok(record) => record,
            Err(err) => {
                log::error!("cannot sync record: {err}");
                return;
            }
        };
        let (names, values): (Vec<&'static str>, Vec<BoundValue>) =
            record.borrow().fields().into_iter().unzip();
        reconcile_fields(node, names, values);
    }

    fn setup_child(&self, _parent: &Node, child: &Node) {
        self.registry.setup(child);
    }

    fn render(&self, node: &Node, ui: &mut egui::Ui) {
        let title = match node.get::<R>() {
            Ok(record) => record.borrow().title(),
            Err(err) => return show_error(ui, node, &err),
        };

        let expanded = ui
            .horizontal(|ui| {
                let expanded = expand_toggle(ui, node);
                let title = node_title(ui, node, &title);
                ui.strong(title);
                expanded
            })
            .inner;

        if expanded {
            ui.indent(node.id(), |ui| {
                for child in node.children() {
                    child.render(ui);
                }
            });
        }
    }
}

fn reconcile_fields(node: &Node, names: Vec<&'static str>, values: Vec<BoundValue>) {
    crate::components::reconcile(node, values, |index, _| {
        names
            .get(index)
            .map(|name| name.to_string())
            .unwrap_or_default()
    });
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::components::{Shared, shared};
    use crate::ui::handlers::scalar::{IntHandler, TextHandler};
    use std::rc::Rc;

    struct Point {
        label: Shared<String>,
        x: Shared<i64>,
        y: Shared<i64>,
    }

    impl Record for Point {
        fn title(&self) -> String {
            self.label.borrow().clone()
        }

        fn fields(&self) -> Vec<(&'static str, BoundValue)> {
            vec![
                ("label", self.label.clone().into()),
                ("x", self.x.clone().into()),
                ("y", self.y.clone().into()),
            ]
        }
    }

    fn registry() -> HandlerRegistry {
        HandlerRegistry::builder()
            .register::<String>(|_| Rc::new(TextHandler))
            .register::<i64>(|_| Rc::new(IntHandler))
            .register::<Point>(|registry| Rc::new(RecordHandler::<Point>::new(registry.clone())))
            .build()
    }

    #[test]
    fn test_fields_become_labelled_children() {
        let point = shared(Point {
            label: shared(String::from("origin")),
            x: shared(0),
            y: shared(4),
        });
        let node = Node::new("point", BoundValue::from_shared(point.clone()), None);
        registry().setup(&node);
        node.sync_tree();

        let labels: Vec<String> = node.children().iter().map(Node::label).collect();
        assert_eq!(labels, vec!["label", "x", "y"]);
        assert!(node.child(1).unwrap().find_ancestor_handler::<IntHandler>().is_some());
        assert_eq!(*node.child(2).unwrap().get::<i64>().unwrap().borrow(), 4);

        // editing a field in place keeps every child
        let before = node.children();
        *point.borrow().x.borrow_mut() = 7;
        node.sync_tree();
        assert!(
            before
                .iter()
                .zip(node.children())
                .all(|(old, new)| old.ptr_eq(&new))
        );
    }

    #[test]
    fn test_replaced_field_value_rebinds() {
        let point = shared(Point {
            label: shared(String::from("a")),
            x: shared(1),
            y: shared(2),
        });
        let node = Node::new("point", BoundValue::from_shared(point.clone()), None);
        registry().setup(&node);
        node.sync_tree();
        let old_y = node.child(2).unwrap();

        point.borrow_mut().y = shared(10);
        node.sync_tree();

        let new_y = node.child(2).unwrap();
        assert!(!new_y.ptr_eq(&old_y));
        assert_eq!(*new_y.get::<i64>().unwrap().borrow(), 10);
        assert!(new_y.handler().is_some());
    }
}
