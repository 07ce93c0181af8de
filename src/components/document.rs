use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::components::event::EventKind;
use crate::components::handler::Handler;
use crate::components::history::{History, Position};
use crate::components::node::Node;
use crate::components::value::BoundValue;
use crate::util::{EditorError, write_with_temp_file};

/// Converts a document's live value to and from its stored text
pub trait DocumentSource {
    fn path(&self) -> &Path;

    fn encode(&self, value: &BoundValue) -> Result<String, EditorError>;

    fn decode(&self, text: &str) -> Result<BoundValue, EditorError>;
}

/// Handler for the root node of an open document. Owns the document's history, so every
/// document gets its own undo stack, and wraps the handler that actually draws the contents.
pub struct DocumentHandler {
    name: String,
    history: History,
    source: Box<dyn DocumentSource>,
    content: Rc<dyn Handler>,
}

impl DocumentHandler {
    pub fn new(
        name: impl Into<String>,
        history: History,
        source: Box<dyn DocumentSource>,
        content: Rc<dyn Handler>,
    ) -> Self {
        Self {
            name: name.into(),
            history,
            source,
            content,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn path(&self) -> PathBuf {
        self.source.path().to_path_buf()
    }

    /// Serializes the current value, for callers that want to do the writing elsewhere
    pub fn encode(&self, node: &Node) -> Result<String, EditorError> {
        let value = node.value().ok_or_else(|| EditorError::Unbound {
            label: node.label(),
        })?;
        self.source.encode(&value)
    }

    /// Writes the document and clears its dirty state
    pub fn save(&self, node: &Node) -> Result<(), EditorError> {
        let text = self.encode(node)?;
        write_with_temp_file(self.source.path(), text.as_bytes())?;
        log::info!("saved {} to {:?}", self.name, self.source.path());
        self.mark_saved(node);
        Ok(())
    }

    /// Called once the encoded text is on disk
    pub fn mark_saved(&self, node: &Node) {
        self.history.mark_saved();
        node.raise(EventKind::Saved);
    }

    /// For saves written off the UI thread: `position` is `History::position` from when the
    /// text was encoded
    pub fn finish_save(&self, node: &Node, position: Position) {
        if !self.history.mark_saved_at(position) {
            // the file now holds data from before a revert
            log::warn!("{} was reverted while it was being saved", self.name);
            node.mark_changed();
            return;
        }
        if self.history.is_at_save_point() {
            node.raise(EventKind::Saved);
        } else {
            log::info!("{} changed while it was being saved", self.name);
        }
    }

    /// Throws away every edit and reloads the stored document. Nothing changes if the stored
    /// document can't be read.
    pub fn revert(&self, node: &Node) -> Result<(), EditorError> {
        let text = std::fs::read_to_string(self.source.path())?;
        let value = self.source.decode(&text)?;

        node.raise(EventKind::Reverting);
        node.set(value);
        node.clear_children();
        self.history.clear();
        self.history.mark_saved();
        log::info!("reverted {} from {:?}", self.name, self.source.path());
        Ok(())
    }
}

impl Handler for DocumentHandler {
    fn render(&self, node: &Node, ui: &mut egui::Ui) {
        self.content.render(node, ui);
    }

    fn sync(&self, node: &Node) {
        self.content.sync(node);
    }

    fn setup_child(&self, parent: &Node, child: &Node) {
        self.content.setup_child(parent, child);
    }

    fn on_event(&self, node: &Node, origin: &Node, kind: EventKind) -> bool {
        if self.content.on_event(node, origin, kind) {
            return true;
        }
        if kind == EventKind::Changed {
            log::debug!("{} modified at {}", self.name, origin.path());
        }
        // enclosing documents need to hear about it too
        false
    }

    fn same_identity(&self, existing: &BoundValue, incoming: &BoundValue) -> bool {
        self.content.same_identity(existing, incoming)
    }
}
