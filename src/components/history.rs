//! Undo/redo for everything edited through the tree.
//!
//! Every edit is a [`Command`]: an `apply`/`revert` pair that only captures values (shared data
//! handles, cloned snapshots, weak node handles), so it keeps working after the tree it was
//! recorded from has been rebuilt. A `History` belongs to one document and is reached from any
//! node of that document through `Node::history`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::components::node::{Node, NodeId, WeakNode};
use crate::editor_error;
use crate::util::EditorError;

/// Default number of undo steps kept around
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Identifies a stream of edits that may collapse into a single undo step
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MergeKey {
    Field { node: NodeId, field: &'static str },
    Named(String),
}

impl MergeKey {
    pub fn field(node: &Node, field: &'static str) -> Self {
        MergeKey::Field {
            node: node.id(),
            field,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        MergeKey::Named(name.into())
    }
}

/// How a recorded edit relates to the one before it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Merge {
    /// Always a separate undo step
    Never,
    /// Merge with the previous edit of the same field of the same node
    Field(&'static str),
    Key(MergeKey),
}

impl Merge {
    fn key_for(self, node: &Node) -> Option<MergeKey> {
        match self {
            Merge::Never => None,
            Merge::Field(field) => Some(MergeKey::field(node, field)),
            Merge::Key(key) => Some(key),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxKind {
    /// after the command is reverted
    Undo,
    /// after the command is re-applied by a redo
    Redo,
    Both,
}

impl AuxKind {
    fn fires_on_undo(self) -> bool {
        matches!(self, AuxKind::Undo | AuxKind::Both)
    }

    fn fires_on_redo(self) -> bool {
        matches!(self, AuxKind::Redo | AuxKind::Both)
    }
}

struct Auxiliary {
    kind: AuxKind,
    /// which edit of a merge run attached this
    generation: u32,
    callback: Box<dyn FnMut()>,
}

/// A reversible edit
pub struct Command {
    label: String,
    apply: Box<dyn FnMut()>,
    revert: Box<dyn FnMut()>,
    merge_key: Option<MergeKey>,
    /// node marked as changed whenever the command runs in either direction
    target: Option<WeakNode>,
    auxiliary: Vec<Auxiliary>,
    /// bumped every time another edit merges into this one
    generation: u32,
    seq: u64,
}

impl Command {
    pub fn new(
        label: impl Into<String>,
        apply: impl FnMut() + 'static,
        revert: impl FnMut() + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            apply: Box::new(apply),
            revert: Box::new(revert),
            merge_key: None,
            target: None,
            auxiliary: Vec::new(),
            generation: 0,
            seq: 0,
        }
    }

    pub fn with_merge_key(mut self, merge_key: Option<MergeKey>) -> Self {
        self.merge_key = merge_key;
        self
    }

    pub fn with_target(mut self, node: &Node) -> Self {
        self.target = Some(node.downgrade());
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn run_apply(&mut self) {
        (self.apply)();
        self.notify_target();
    }

    fn run_undo(&mut self) {
        (self.revert)();
        for aux in self.auxiliary.iter_mut() {
            if aux.kind.fires_on_undo() {
                (aux.callback)();
            }
        }
        self.notify_target();
    }

    fn run_redo(&mut self) {
        (self.apply)();
        for aux in self.auxiliary.iter_mut() {
            if aux.kind.fires_on_redo() {
                (aux.callback)();
            }
        }
        self.notify_target();
    }

    /// The node may be gone by now, the data effect above still happened
    fn notify_target(&self) {
        if let Some(node) = self.target.as_ref().and_then(WeakNode::upgrade) {
            node.mark_changed();
        }
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "[Command | \"{}\" | key={:?} | aux={}]",
            self.label,
            self.merge_key,
            self.auxiliary.len()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SavePoint {
    /// saved with nothing on the undo stack
    Empty,
    /// saved right after the command with this seq
    At(u64),
    /// the saved state was thrown away (redo branch discarded, or dropped by the limit)
    Unreachable,
}

/// Token for the state of the data at some point, see `History::position`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    top: Option<u64>,
    clears: u64,
}

#[derive(Debug)]
struct HistoryData {
    undo_stack: VecDeque<Command>,
    redo_stack: Vec<Command>,
    /// the top of the undo stack is the latest recorded edit (not something undone/redone)
    top_is_latest: bool,
    /// the top of the undo stack may absorb the next edit with the same key
    merge_open: bool,
    limit: usize,
    next_seq: u64,
    save_point: SavePoint,
    /// how many times `clear` ran
    clears: u64,
    /// a command is running, recording now would corrupt the stacks
    replaying: bool,
}

impl HistoryData {
    fn with_limit(limit: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            top_is_latest: false,
            merge_open: false,
            limit,
            next_seq: 1,
            save_point: SavePoint::Empty,
            clears: 0,
            replaying: false,
        }
    }

    fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn enforce_limit(&mut self) {
        while self.limit > 0 && self.undo_stack.len() > self.limit {
            if let Some(dropped) = self.undo_stack.pop_front() {
                log::debug!("history limit reached, forgetting {dropped:?}");
                if self.save_point == SavePoint::Empty {
                    self.save_point = SavePoint::Unreachable;
                }
            }
        }
    }
}

/// A linear undo/redo stack. Cloning shares the same stack
#[derive(Debug, Clone)]
pub struct History(Rc<RefCell<HistoryData>>);

impl Default for History {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

/// Where the insertion/removal helpers find the list they edit
pub trait ChildList {
    type Child: Clone + 'static;

    fn child_list(&mut self) -> &mut Vec<Self::Child>;
}

impl<T: Clone + 'static> ChildList for Vec<T> {
    type Child = T;

    fn child_list(&mut self) -> &mut Vec<T> {
        self
    }
}

impl History {
    /// `limit` of zero keeps everything
    pub fn with_limit(limit: usize) -> Self {
        History(Rc::new(RefCell::new(HistoryData::with_limit(limit))))
    }

    pub fn set_limit(&self, limit: usize) {
        let mut data = self.0.borrow_mut();
        data.limit = limit;
        data.enforce_limit();
    }

    /// Runs the command's `apply` and records it, merging into the previous command when both
    /// carry the same merge key and that command is still open
    pub fn push(&self, mut command: Command) {
        if self.0.borrow().replaying {
            log::error!(
                "{command:?} recorded while another command was running, applying without history"
            );
            command.run_apply();
            return;
        }

        command.run_apply();

        let mut data = self.0.borrow_mut();
        let seq = data.take_seq();

        if !data.redo_stack.is_empty() {
            log::debug!("discarding {} redo steps", data.redo_stack.len());
            let save_point = data.save_point;
            if data
                .redo_stack
                .iter()
                .any(|discarded| save_point == SavePoint::At(discarded.seq))
            {
                data.save_point = SavePoint::Unreachable;
            }
            data.redo_stack.clear();
        }

        let can_merge = data.merge_open && command.merge_key.is_some();
        if let Some(top) = data.undo_stack.back_mut()
            && can_merge
            && top.merge_key == command.merge_key
        {
            log::debug!("merging \"{}\" into {top:?}", command.label);
            top.apply = command.apply;
            top.generation += 1;
            top.seq = seq;
            return;
        }

        log::debug!("recorded {command:?}");
        command.seq = seq;
        data.undo_stack.push_back(command);
        data.top_is_latest = true;
        data.merge_open = true;
        data.enforce_limit();
    }

    /// Replaces the value bound to `node`, remembering the old one for undo
    pub fn record_set<T: Clone + 'static>(
        &self,
        node: &Node,
        new_value: T,
        merge: Merge,
    ) -> Result<(), EditorError> {
        let target = node.get::<T>()?;
        let old_value = target.borrow().clone();
        let revert_target = target.clone();

        let command = Command::new(
            format!("Set {}", node.path()),
            move || *target.borrow_mut() = new_value.clone(),
            move || *revert_target.borrow_mut() = old_value.clone(),
        )
        .with_target(node)
        .with_merge_key(merge.key_for(node));

        self.push(command);
        Ok(())
    }

    /// Records an arbitrary edit. `apply` runs right away
    pub fn record_callback(
        &self,
        node: &Node,
        label: impl Into<String>,
        apply: impl FnMut() + 'static,
        revert: impl FnMut() + 'static,
        merge: Merge,
    ) {
        let command = Command::new(label, apply, revert)
            .with_target(node)
            .with_merge_key(merge.key_for(node));
        self.push(command);
    }

    /// Inserts `item` into the `Vec<T>` bound to `node`. `None` appends
    pub fn record_list_add<T: Clone + 'static>(
        &self,
        node: &Node,
        index: Option<usize>,
        item: T,
    ) -> Result<(), EditorError> {
        let label = format!("Add item to {}", node.path());
        self.record_insert::<Vec<T>>(node, index, item, label)
    }

    /// Removes the element at `index` from the `Vec<T>` bound to `node`, returning it
    pub fn record_list_remove<T: Clone + 'static>(
        &self,
        node: &Node,
        index: usize,
    ) -> Result<T, EditorError> {
        let label = format!("Remove item {index} from {}", node.path());
        self.record_remove::<Vec<T>>(node, index, label)
    }

    /// Moves the element at `from` so it ends up at `to`
    pub fn record_list_move<T: Clone + 'static>(
        &self,
        node: &Node,
        from: usize,
        to: usize,
    ) -> Result<(), EditorError> {
        let list = node.get::<Vec<T>>()?;
        let len = list.borrow().len();
        if from >= len || to >= len {
            return Err(editor_error!(
                "cannot move {from} to {to} in {}, it has {len} items",
                node.path()
            ));
        }
        if from == to {
            return Ok(());
        }

        let revert_list = list.clone();
        self.record_callback(
            node,
            format!("Move item {from} to {to} in {}", node.path()),
            move || {
                let mut list = list.borrow_mut();
                let item = list.remove(from);
                list.insert(to, item);
            },
            move || {
                let mut list = revert_list.borrow_mut();
                let item = list.remove(to);
                list.insert(from, item);
            },
            Merge::Never,
        );
        Ok(())
    }

    /// Attaches `child` to the hierarchical value bound to `node`. `None` appends
    pub fn record_add_child<P: ChildList + 'static>(
        &self,
        node: &Node,
        index: Option<usize>,
        child: P::Child,
    ) -> Result<(), EditorError> {
        let label = format!("Attach child to {}", node.path());
        self.record_insert::<P>(node, index, child, label)
    }

    /// Detaches the child at `index` from the hierarchical value bound to `node`
    pub fn record_remove_child<P: ChildList + 'static>(
        &self,
        node: &Node,
        index: usize,
    ) -> Result<P::Child, EditorError> {
        let label = format!("Detach child {index} from {}", node.path());
        self.record_remove::<P>(node, index, label)
    }

    fn record_insert<P: ChildList + 'static>(
        &self,
        node: &Node,
        index: Option<usize>,
        item: P::Child,
        label: String,
    ) -> Result<(), EditorError> {
        let parent = node.get::<P>()?;
        let len = parent.borrow_mut().child_list().len();
        let index = index.unwrap_or(len);
        if index > len {
            return Err(editor_error!(
                "cannot insert at {index} in {}, it has {len} items",
                node.path()
            ));
        }

        let revert_parent = parent.clone();
        self.record_callback(
            node,
            label,
            move || parent.borrow_mut().child_list().insert(index, item.clone()),
            move || {
                revert_parent.borrow_mut().child_list().remove(index);
            },
            Merge::Never,
        );
        Ok(())
    }

    fn record_remove<P: ChildList + 'static>(
        &self,
        node: &Node,
        index: usize,
        label: String,
    ) -> Result<P::Child, EditorError> {
        let parent = node.get::<P>()?;
        let removed = match parent.borrow_mut().child_list().get(index) {
            Some(item) => item.clone(),
            None => {
                return Err(editor_error!(
                    "cannot remove {index} from {}, it doesn't exist",
                    node.path()
                ));
            }
        };

        let revert_parent = parent.clone();
        let restored = removed.clone();
        self.record_callback(
            node,
            label,
            move || {
                parent.borrow_mut().child_list().remove(index);
            },
            move || {
                revert_parent
                    .borrow_mut()
                    .child_list()
                    .insert(index, restored.clone())
            },
            Merge::Never,
        );
        Ok(removed)
    }

    /// Adds a callback to the most recently recorded command. Returns false (and does nothing)
    /// if that command has already been undone or there isn't one
    pub fn attach_auxiliary(&self, kind: AuxKind, callback: impl FnMut() + 'static) -> bool {
        let mut data = self.0.borrow_mut();
        if !data.top_is_latest {
            log::warn!("no freshly recorded command to attach a {kind:?} callback to");
            return false;
        }
        let Some(top) = data.undo_stack.back_mut() else {
            return false;
        };

        // one callback per kind per logical step: an edit merging into the top replaces what
        // the earlier edits of the run attached
        let generation = top.generation;
        top.auxiliary
            .retain(|aux| aux.kind != kind || aux.generation == generation);
        top.auxiliary.push(Auxiliary {
            kind,
            generation,
            callback: Box::new(callback),
        });
        true
    }

    /// Reverts the latest command. Returns false if there was nothing to undo
    pub fn undo(&self) -> bool {
        let command = {
            let mut data = self.0.borrow_mut();
            let command = data.undo_stack.pop_back();
            if command.is_some() {
                data.merge_open = false;
                data.top_is_latest = false;
            }
            command
        };
        let Some(mut command) = command else {
            return false;
        };

        log::debug!("undo {command:?}");
        self.0.borrow_mut().replaying = true;
        command.run_undo();

        let mut data = self.0.borrow_mut();
        data.replaying = false;
        data.redo_stack.push(command);
        true
    }

    /// Re-applies the latest undone command. Returns false if there was nothing to redo
    pub fn redo(&self) -> bool {
        let command = {
            let mut data = self.0.borrow_mut();
            let command = data.redo_stack.pop();
            if command.is_some() {
                data.merge_open = false;
                data.top_is_latest = false;
            }
            command
        };
        let Some(mut command) = command else {
            return false;
        };

        log::debug!("redo {command:?}");
        self.0.borrow_mut().replaying = true;
        command.run_redo();

        let mut data = self.0.borrow_mut();
        data.replaying = false;
        data.undo_stack.push_back(command);
        data.enforce_limit();
        true
    }

    /// Ends the current gesture: the next edit becomes its own undo step even if it has the same
    /// merge key
    pub fn break_merge(&self) {
        self.0.borrow_mut().merge_open = false;
    }

    pub fn can_undo(&self) -> bool {
        !self.0.borrow().undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.0.borrow().redo_stack.is_empty()
    }

    pub fn undo_label(&self) -> Option<String> {
        self.0
            .borrow()
            .undo_stack
            .back()
            .map(|command| command.label.clone())
    }

    pub fn redo_label(&self) -> Option<String> {
        self.0
            .borrow()
            .redo_stack
            .last()
            .map(|command| command.label.clone())
    }

    pub fn undo_len(&self) -> usize {
        self.0.borrow().undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.0.borrow().redo_stack.len()
    }

    /// Remembers the current position as the one matching what's on disk
    pub fn mark_saved(&self) {
        let mut data = self.0.borrow_mut();
        data.save_point = match data.undo_stack.back() {
            Some(top) => SavePoint::At(top.seq),
            None => SavePoint::Empty,
        };
        data.merge_open = false;
    }

    /// Token for the current state, see `mark_saved_at`
    pub fn position(&self) -> Position {
        let data = self.0.borrow();
        Position {
            top: data.undo_stack.back().map(|top| top.seq),
            clears: data.clears,
        }
    }

    /// Like `mark_saved`, for a save of the state at an earlier `position` that only finished
    /// now. If the data changed since, the document stays unsaved.
    ///
    /// Returns false for a position from before the last `clear`. That state can't be reached
    /// anymore, so the save point becomes unreachable.
    pub fn mark_saved_at(&self, position: Position) -> bool {
        let mut data = self.0.borrow_mut();
        if position.clears != data.clears {
            data.save_point = SavePoint::Unreachable;
            return false;
        }
        data.save_point = match position.top {
            Some(seq) => SavePoint::At(seq),
            None => SavePoint::Empty,
        };
        if data.undo_stack.back().map(|top| top.seq) == position.top {
            data.merge_open = false;
        }
        true
    }

    /// True when undo/redo has brought the data back to the last saved state
    pub fn is_at_save_point(&self) -> bool {
        let data = self.0.borrow();
        match (data.save_point, data.undo_stack.back()) {
            (SavePoint::Empty, None) => true,
            (SavePoint::At(saved), Some(top)) => top.seq == saved,
            _ => false,
        }
    }

    /// Forgets everything, e.g. after the document was reloaded
    pub fn clear(&self) {
        let mut data = self.0.borrow_mut();
        let (limit, next_seq, clears) = (data.limit, data.next_seq, data.clears);
        *data = HistoryData::with_limit(limit);
        // positions handed out before the reset must never match again
        data.next_seq = next_seq;
        data.clears = clears + 1;
    }
}
