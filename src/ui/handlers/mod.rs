//! Handlers for the value types that show up in bundles.

pub mod bundle;
pub mod list;
pub mod record;
pub mod registry;
pub mod scalar;
pub mod scene;

pub use bundle::default_registry;
pub use registry::HandlerRegistry;

use crate::components::{History, Node};
use crate::util::EditorError;

/// egui temp-data key for the "show dirty markers" setting
pub const DIRTY_MARKERS_ID: &str = "bundle_editor_dirty_markers";

/// Runs an edit against the node's document history, logging anything that goes wrong. Edits on
/// nodes outside of a document are dropped
pub fn with_history(node: &Node, edit: impl FnOnce(&History) -> Result<(), EditorError>) {
    let Some(history) = node.history() else {
        log::warn!("{} is not part of a document, dropping edit", node.path());
        return;
    };
    if let Err(err) = edit(&history) {
        log::error!("edit of {} failed: {err}", node.path());
    }
}

/// Call when a drag/typing gesture is over, so the next one gets its own undo step
pub fn end_gesture(node: &Node) {
    if let Some(history) = node.history() {
        history.break_merge();
    }
}

fn show_dirty_markers(ui: &egui::Ui) -> bool {
    ui.ctx()
        .data(|data| data.get_temp::<bool>(egui::Id::new(DIRTY_MARKERS_ID)))
        .unwrap_or(true)
}

/// Text for a field being typed into. Every keystroke is recorded right away, so a buffer that
/// no longer matches the stored text is left over from before an undo/redo or some other edit,
/// and gets dropped
pub fn editing_text(node: &Node, stored: &str) -> String {
    node.with_state_mut(|state| match state.edit_buffer.take() {
        Some(buffer) if buffer == stored => {
            state.edit_buffer = Some(buffer.clone());
            buffer
        }
        _ => stored.to_string(),
    })
}

/// Label text for a node, with a marker when it has unsaved changes
pub fn node_title(ui: &egui::Ui, node: &Node, title: &str) -> String {
    if node.is_dirty() && show_dirty_markers(ui) {
        format!("{title} •")
    } else {
        title.to_string()
    }
}

/// One line: the node's label followed by whatever the handler draws
pub fn field_row(ui: &mut egui::Ui, node: &Node, add_contents: impl FnOnce(&mut egui::Ui)) {
    ui.horizontal(|ui| {
        let title = node_title(ui, node, &node.label());
        ui.label(title);
        add_contents(ui);
    });
}

/// Collapse toggle, returns the new expanded state
pub fn expand_toggle(ui: &mut egui::Ui, node: &Node) -> bool {
    let expanded = node.is_expanded();
    let icon = if expanded { "⏷" } else { "⏵" };
    if ui.small_button(icon).clicked() {
        node.set_expanded(!expanded);
        return !expanded;
    }
    expanded
}

pub fn show_error(ui: &mut egui::Ui, node: &Node, err: &EditorError) {
    let color = ui.visuals().error_fg_color;
    ui.colored_label(color, format!("{}: {err}", node.label()));
}
