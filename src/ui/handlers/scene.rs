use std::rc::Rc;

use crate::components::bundle::SceneObject;
use crate::components::{AuxKind, BoundValue, Handler, Merge, Node, Shared, reconcile, shared};
use crate::editor_error;
use crate::ui::handlers::{
    HandlerRegistry, editing_text, end_gesture, expand_toggle, node_title, show_error,
    with_history,
};
use crate::util::EditorError;

/// One node per scene object, nested the same way the objects are
pub struct SceneHandler {
    registry: HandlerRegistry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SceneAction {
    AddChild,
    Delete,
}

impl SceneHandler {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self { registry }
    }
}

/// Attaches a new, empty object under the one bound to `node`
pub fn add_object(node: &Node) -> Result<(), EditorError> {
    let history = node
        .history()
        .ok_or_else(|| editor_error!("{} is not part of a document", node.path()))?;

    history.record_add_child::<SceneObject>(node, None, shared(SceneObject::new("New Object")))?;
    let weak = node.downgrade();
    history.attach_auxiliary(AuxKind::Both, move || {
        if let Some(node) = weak.upgrade() {
            node.set_expanded(true);
        }
    });
    node.set_expanded(true);
    Ok(())
}

/// Detaches the object bound to `node` from its parent object
pub fn delete_object(node: &Node) -> Result<Shared<SceneObject>, EditorError> {
    let object = node.get::<SceneObject>()?;
    let parent = node
        .parent()
        .ok_or_else(|| editor_error!("{} has no parent", node.path()))?;
    let parent_object = parent
        .get::<SceneObject>()
        .map_err(|_| editor_error!("{} is the scene root", node.path()))?;

    let index = parent_object
        .borrow()
        .children
        .iter()
        .position(|child| Rc::ptr_eq(child, &object))
        .ok_or_else(|| editor_error!("{} is not a child of {}", node.path(), parent.path()))?;

    let history = node
        .history()
        .ok_or_else(|| editor_error!("{} is not part of a document", node.path()))?;
    history.record_remove_child::<SceneObject>(&parent, index)
}

fn is_root(node: &Node) -> bool {
    node.parent()
        .is_none_or(|parent| parent.get::<SceneObject>().is_err())
}

impl Handler for SceneHandler {
    fn sync(&self, node: &Node) {
        let object = match node.get::<SceneObject>() {
            Ok(object) => object,
            Err(err) => {
                log::error!("cannot sync scene object: {err}");
                return;
            }
        };
        let children: Vec<BoundValue> = object
            .borrow()
            .children
            .iter()
            .cloned()
            .map(BoundValue::from_shared)
            .collect();
        reconcile(node, children, |_, value| {
            value
                .downcast::<SceneObject>()
                .map(|child| child.borrow().name.borrow().clone())
                .unwrap_or_default()
        });

        // names can change without the child list changing
        for child in node.children() {
            if let Ok(object) = child.get::<SceneObject>() {
                let name = object.borrow().name.borrow().clone();
                if child.label() != name {
                    child.set_label(name);
                }
            }
        }
    }

    fn setup_child(&self, _parent: &Node, child: &Node) {
        self.registry.setup(child);
    }

    fn render(&self, node: &Node, ui: &mut egui::Ui) {
        let object = match node.get::<SceneObject>() {
            Ok(object) => object,
            Err(err) => return show_error(ui, node, &err),
        };
        let (name, visible) = {
            let object = object.borrow();
            (object.name.clone(), object.visible.clone())
        };

        let mut action = None;
        let expanded = ui
            .horizontal(|ui| {
                let expanded = if node.child_count() > 0 {
                    expand_toggle(ui, node)
                } else {
                    let width = ui.spacing().interact_size.y;
                    ui.add_space(width);
                    false
                };

                let mut checked = *visible.borrow();
                if ui
                    .checkbox(&mut checked, "")
                    .on_hover_text("Visible")
                    .changed()
                {
                    let (apply_target, revert_target) = (visible.clone(), visible.clone());
                    with_history(node, |history| {
                        history.record_callback(
                            node,
                            format!("Toggle visibility of {}", node.path()),
                            move || *apply_target.borrow_mut() = checked,
                            move || *revert_target.borrow_mut() = !checked,
                            Merge::Never,
                        );
                        Ok(())
                    });
                }

                let mut text = editing_text(node, &name.borrow());
                let response = ui.add(
                    egui::TextEdit::singleline(&mut text)
                        .id_salt(node.id())
                        .desired_width(160.0),
                );
                if response.changed() {
                    node.with_state_mut(|state| state.edit_buffer = Some(text.clone()));
                    let old_name = name.borrow().clone();
                    let (apply_target, revert_target) = (name.clone(), name.clone());
                    with_history(node, |history| {
                        history.record_callback(
                            node,
                            format!("Rename {}", node.path()),
                            move || *apply_target.borrow_mut() = text.clone(),
                            move || *revert_target.borrow_mut() = old_name.clone(),
                            Merge::Field("name"),
                        );
                        Ok(())
                    });
                }
                if response.lost_focus() {
                    node.with_state_mut(|state| state.edit_buffer = None);
                    end_gesture(node);
                }

                let marker = node_title(ui, node, "");
                if !marker.is_empty() {
                    ui.weak(marker.trim());
                }

                if ui.small_button("+").on_hover_text("Add child object").clicked() {
                    action = Some(SceneAction::AddChild);
                }
                if ui
                    .add_enabled(!is_root(node), egui::Button::new("🗑").small())
                    .on_hover_text("Delete object")
                    .clicked()
                {
                    action = Some(SceneAction::Delete);
                }
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

        let result = match action {
            Some(SceneAction::AddChild) => add_object(node),
            Some(SceneAction::Delete) => delete_object(node).map(|_| ()),
            None => Ok(()),
        };
        if let Err(err) = result {
            log::error!("scene edit failed: {err}");
        }
    }
}
