use regex::{Regex, RegexBuilder};

use crate::components::{
    AuxKind, BoundValue, Handler, LocalState, Node, Shared, index_label, reconcile,
};
use crate::ui::handlers::{HandlerRegistry, expand_toggle, node_title, show_error, with_history};

/// Projects a `Vec<Shared<T>>` into one child per element, with add/remove/reorder buttons and a
/// filter box. Filtering only hides rows, every element still has its child node.
pub struct ListHandler<T> {
    registry: HandlerRegistry,
    new_item: Box<dyn Fn() -> Shared<T>>,
    search_text: fn(&T) -> String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListAction {
    Add,
    Remove(usize),
    MoveUp(usize),
    MoveDown(usize),
}

#[derive(Default)]
struct FilterCache {
    source: String,
    regex: Option<Regex>,
}

/// Case insensitive matcher for the node's filter text. The compiled regex is kept in the node's
/// local state until the filter changes
pub fn filter_matcher(state: &mut LocalState) -> Option<Regex> {
    if state.filter.trim().is_empty() {
        return None;
    }
    let filter = state.filter.trim().to_string();
    let cache = state.cached_mut::<FilterCache>();
    if cache.source != filter || cache.regex.is_none() {
        cache.regex = RegexBuilder::new(&regex::escape(&filter))
            .case_insensitive(true)
            .build()
            .ok();
        cache.source = filter;
    }
    cache.regex.clone()
}

impl<T: 'static> ListHandler<T> {
    pub fn new(
        registry: HandlerRegistry,
        new_item: impl Fn() -> Shared<T> + 'static,
        search_text: fn(&T) -> String,
    ) -> Self {
        Self {
            registry,
            new_item: Box::new(new_item),
            search_text,
        }
    }

    pub fn apply(&self, node: &Node, action: ListAction) {
        with_history(node, |history| match action {
            ListAction::Add => {
                history.record_list_add(node, None, (self.new_item)())?;
                // show the new element, also when it comes back through redo
                let list_node = node.downgrade();
                history.attach_auxiliary(AuxKind::Redo, move || {
                    if let Some(node) = list_node.upgrade() {
                        node.set_expanded(true);
                    }
                });
                node.set_expanded(true);
                Ok(())
            }
            ListAction::Remove(index) => history
                .record_list_remove::<Shared<T>>(node, index)
                .map(|_| ()),
            ListAction::MoveUp(index) => {
                history.record_list_move::<Shared<T>>(node, index, index.saturating_sub(1))
            }
            ListAction::MoveDown(index) => {
                history.record_list_move::<Shared<T>>(node, index, index + 1)
            }
        });
    }

    fn matches(&self, matcher: &Option<Regex>, child: &Node) -> bool {
        let Some(matcher) = matcher else {
            return true;
        };
        match child.get::<T>() {
            Ok(item) => matcher.is_match(&(self.search_text)(&item.borrow())),
            Err(_) => true,
        }
    }
}

impl<T: 'static> Handler for ListHandler<T> {
    fn sync(&self, node: &Node) {
        let list = match node.get::<Vec<Shared<T>>>() {
            Ok(list) => list,
            Err(err) => {
                log::error!("cannot sync list: {err}");
                return;
            }
        };
        let items: Vec<BoundValue> = list
            .borrow()
            .iter()
            .cloned()
            .map(BoundValue::from_shared)
            .collect();
        reconcile(node, items, index_label);
    }

    fn setup_child(&self, _parent: &Node, child: &Node) {
        self.registry.setup(child);
    }

    fn render(&self, node: &Node, ui: &mut egui::Ui) {
        if let Err(err) = node.get::<Vec<Shared<T>>>() {
            return show_error(ui, node, &err);
        }

        let mut action = None;
        let children = node.children();

        let expanded = ui
            .horizontal(|ui| {
                let expanded = expand_toggle(ui, node);
                let title = node_title(ui, node, &node.label());
                ui.label(format!("{title} ({})", children.len()));
                if ui.small_button("+").on_hover_text("Add").clicked() {
                    action = Some(ListAction::Add);
                }
                expanded
            })
            .inner;

        if expanded {
            ui.indent(node.id(), |ui| {
                let mut filter = node.with_state(|state| state.filter.clone());
                let response =
                    ui.add(egui::TextEdit::singleline(&mut filter).hint_text("filter"));
                if response.changed() {
                    node.with_state_mut(|state| state.filter = filter);
                }

                let matcher = node.with_state_mut(filter_matcher);
                let last = children.len().saturating_sub(1);
                for (index, child) in children.iter().enumerate() {
                    if !self.matches(&matcher, child) {
                        continue;
                    }
                    ui.horizontal_top(|ui| {
                        if ui
                            .add_enabled(index > 0, egui::Button::new("⏶").small())
                            .clicked()
                        {
                            action = Some(ListAction::MoveUp(index));
                        }
                        if ui
                            .add_enabled(index < last, egui::Button::new("⏷").small())
                            .clicked()
                        {
                            action = Some(ListAction::MoveDown(index));
                        }
                        if ui.small_button("🗑").on_hover_text("Remove").clicked() {
                            action = Some(ListAction::Remove(index));
                        }
                        ui.vertical(|ui| child.render(ui));
                    });
                }
            });
        }

        // the child list is stale once the backing list changes, so edits wait until we're done
        // drawing
        if let Some(action) = action {
            self.apply(node, action);
        }
    }
}
