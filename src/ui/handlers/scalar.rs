use std::marker::PhantomData;

use crate::components::{Handler, Merge, Node};
use crate::ui::handlers::{editing_text, end_gesture, field_row, show_error, with_history};

/// Single line text. Typing is one undo step until the field loses focus
pub struct TextHandler;

impl Handler for TextHandler {
    fn render(&self, node: &Node, ui: &mut egui::Ui) {
        let value = match node.get::<String>() {
            Ok(value) => value,
            Err(err) => return show_error(ui, node, &err),
        };

        field_row(ui, node, |ui| {
            let mut text = editing_text(node, &value.borrow());

            let response = ui.add(egui::TextEdit::singleline(&mut text).id_salt(node.id()));

            if response.changed() {
                node.with_state_mut(|state| state.edit_buffer = Some(text.clone()));
                with_history(node, |history| {
                    history.record_set(node, text, Merge::Field("text"))
                });
            }
            if response.lost_focus() {
                node.with_state_mut(|state| state.edit_buffer = None);
                end_gesture(node);
            }
        });
    }
}

pub struct IntHandler;

impl Handler for IntHandler {
    fn render(&self, node: &Node, ui: &mut egui::Ui) {
        let value = match node.get::<i64>() {
            Ok(value) => value,
            Err(err) => return show_error(ui, node, &err),
        };

        field_row(ui, node, |ui| {
            let mut number = *value.borrow();
            let response = ui.add(egui::DragValue::new(&mut number));

            if response.changed() {
                with_history(node, |history| {
                    history.record_set(node, number, Merge::Field("value"))
                });
            }
            if response.drag_stopped() || response.lost_focus() {
                end_gesture(node);
            }
        });
    }
}

pub struct FloatHandler {
    pub speed: f64,
}

impl Default for FloatHandler {
    fn default() -> Self {
        Self { speed: 0.01 }
    }
}

impl Handler for FloatHandler {
    fn render(&self, node: &Node, ui: &mut egui::Ui) {
        let value = match node.get::<f64>() {
            Ok(value) => value,
            Err(err) => return show_error(ui, node, &err),
        };

        field_row(ui, node, |ui| {
            let mut number = *value.borrow();
            let response = ui.add(
                egui::DragValue::new(&mut number)
                    .speed(self.speed)
                    .max_decimals(3),
            );

            if response.changed() {
                with_history(node, |history| {
                    history.record_set(node, number, Merge::Field("value"))
                });
            }
            if response.drag_stopped() || response.lost_focus() {
                end_gesture(node);
            }
        });
    }
}

/// Every click is its own undo step
pub struct BoolHandler;

impl Handler for BoolHandler {
    fn render(&self, node: &Node, ui: &mut egui::Ui) {
        let value = match node.get::<bool>() {
            Ok(value) => value,
            Err(err) => return show_error(ui, node, &err),
        };

        field_row(ui, node, |ui| {
            let mut checked = *value.borrow();
            if ui.checkbox(&mut checked, "").changed() {
                with_history(node, |history| {
                    history.record_set(node, checked, Merge::Never)
                });
            }
        });
    }
}

/// A value picked from a fixed set
pub trait Choice: Copy + PartialEq + 'static {
    fn choices() -> &'static [Self];

    fn choice_name(&self) -> &'static str;
}

pub struct ChoiceHandler<C> {
    _choice: PhantomData<C>,
}

impl<C> Default for ChoiceHandler<C> {
    fn default() -> Self {
        Self {
            _choice: PhantomData,
        }
    }
}

impl<C: Choice> Handler for ChoiceHandler<C> {
    fn render(&self, node: &Node, ui: &mut egui::Ui) {
        let value = match node.get::<C>() {
            Ok(value) => value,
            Err(err) => return show_error(ui, node, &err),
        };

        field_row(ui, node, |ui| {
            let current = *value.borrow();
            let mut selected = current;
            egui::ComboBox::from_id_salt(node.id())
                .selected_text(current.choice_name())
                .show_ui(ui, |ui| {
                    for choice in C::choices() {
                        ui.selectable_value(&mut selected, *choice, choice.choice_name());
                    }
                });

            if selected != current {
                with_history(node, |history| {
                    history.record_set(node, selected, Merge::Never)
                });
            }
        });
    }
}
