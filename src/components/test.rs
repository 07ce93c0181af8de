use crate::components::bundle::{Bundle, BundleSource};
use crate::components::{
    BoundValue, DocumentHandler, Handler, History, Merge, Node, Shared, index_label, reconcile,
    shared,
};
use crate::util::EditorError;

use std::rc::Rc;

/// Content handler that draws nothing and owns no children
struct Passive;

impl Handler for Passive {}

/// Projects a `Vec<Shared<i64>>` into one child per element
struct Numbers;

impl Handler for Numbers {
    fn sync(&self, node: &Node) {
        let list = node.get::<Vec<Shared<i64>>>().unwrap();
        let items: Vec<BoundValue> = list
            .borrow()
            .iter()
            .cloned()
            .map(BoundValue::from_shared)
            .collect();
        reconcile(node, items, index_label);
    }
}

fn document(history: &History, path: &std::path::Path) -> Rc<DocumentHandler> {
    Rc::new(DocumentHandler::new(
        "test bundle",
        history.clone(),
        Box::new(BundleSource::new(path)),
        Rc::new(Passive),
    ))
}

fn values(list: &Shared<Vec<Shared<i64>>>) -> Vec<i64> {
    list.borrow().iter().map(|value| *value.borrow()).collect()
}

#[test]
/// Removing from the middle and undoing brings the list back without rebuilding the survivors
fn test_remove_and_undo_keeps_children() {
    let history = History::default();
    let root = Node::new(
        "root",
        None,
        Some(document(&history, std::path::Path::new("unused.toml"))),
    );
    let list = shared(vec![shared(1i64), shared(2), shared(3)]);
    let folder = root.add_child(
        "folder",
        BoundValue::from_shared(list.clone()),
        Some(Rc::new(Numbers)),
    );

    root.sync_tree();
    let before = folder.children();
    assert_eq!(before.len(), 3);
    before[0].set_expanded(true);

    let removed = folder
        .history()
        .unwrap()
        .record_list_remove::<Shared<i64>>(&folder, 1)
        .unwrap();
    assert_eq!(*removed.borrow(), 2);
    assert_eq!(values(&list), vec![1, 3]);

    root.sync_tree();
    assert_eq!(folder.child_count(), 2);
    assert!(folder.child(1).unwrap().ptr_eq(&before[2]));
    assert!(root.is_dirty());

    assert!(history.undo());
    root.sync_tree();

    assert_eq!(values(&list), vec![1, 2, 3]);
    let after = folder.children();
    assert!(after[0].ptr_eq(&before[0]));
    assert!(after[0].is_expanded());
    assert!(after[2].ptr_eq(&before[2]));
    // the restored element is the very same value that was removed
    let restored = after[1].value().unwrap();
    assert!(restored.ptr_eq(&before[1].value().unwrap()));
    assert_eq!(after[1].label(), "[1]");
}

#[test]
fn test_edit_save_and_revert() -> Result<(), EditorError> {
    let base_dir = tempfile::TempDir::new()?;
    let path = base_dir.path().join("bundle.toml");
    let history = History::default();
    let document = document(&history, &path);

    let bundle = shared(Bundle::new("Weapons Pack"));
    let name_value = bundle.borrow().name.clone();
    let root = Node::new(
        "bundle",
        BoundValue::from_shared(bundle.clone()),
        Some(document.clone()),
    );
    let name = root.add_child("name", BoundValue::from_shared(name_value.clone()), None);

    history.record_set(&name, String::from("Armor Pack"), Merge::Field("text"))?;
    assert!(name.is_dirty());
    assert!(root.is_dirty());

    document.save(&root)?;
    assert!(!name.is_dirty());
    assert!(!root.is_dirty());
    assert!(history.is_at_save_point());
    assert!(path.exists());

    // an unsaved edit with some half-typed state hanging off the node
    history.record_set(&name, String::from("Junk"), Merge::Field("text"))?;
    name.with_state_mut(|state| {
        state.edit_buffer = Some(String::from("Junk"));
        state.set_cached(name_value.clone());
    });

    document.revert(&root)?;

    assert!(!root.is_dirty());
    assert!(!history.can_undo());
    assert_eq!(root.child_count(), 0);
    assert!(name.with_state(|state| state.edit_buffer.is_none()));
    assert!(name.with_state(|state| state.cached::<Shared<String>>().is_none()));

    let reloaded = root.get::<Bundle>()?;
    assert!(!Rc::ptr_eq(&reloaded, &bundle));
    assert_eq!(*reloaded.borrow().name.borrow(), "Armor Pack");

    Ok(())
}

#[test]
fn test_revert_without_file_changes_nothing() {
    let base_dir = tempfile::TempDir::new().unwrap();
    let history = History::default();
    let document = document(&history, &base_dir.path().join("missing.toml"));
    let root = Node::new("bundle", BoundValue::new(Bundle::sample()), Some(document.clone()));
    let author = root.add_child("author", BoundValue::new(String::new()), None);

    history
        .record_set(&author, String::from("someone"), Merge::Never)
        .unwrap();
    assert!(document.revert(&root).is_err());

    assert!(root.is_dirty());
    assert!(history.can_undo());
    assert_eq!(root.child_count(), 1);
}

#[test]
/// Each document keeps its own stack, but changes still reach the outer document
fn test_nested_documents() {
    let base_dir = tempfile::TempDir::new().unwrap();
    let outer_history = History::default();
    let inner_history = History::default();

    let outer = Node::new(
        "workspace",
        None,
        Some(document(&outer_history, &base_dir.path().join("outer.toml"))),
    );
    let inner_document = document(&inner_history, &base_dir.path().join("inner.toml"));
    let inner = outer.add_child(
        "inner",
        BoundValue::new(Bundle::new("Inner")),
        Some(inner_document.clone()),
    );
    let field = inner.add_child("version", BoundValue::new(1i64), None);

    let history = field.history().unwrap();
    history.record_set(&field, 2i64, Merge::Never).unwrap();

    assert_eq!(inner_history.undo_len(), 1);
    assert_eq!(outer_history.undo_len(), 0);
    assert!(inner.is_dirty());
    assert!(outer.is_dirty());

    let (found, handler) = field.find_ancestor_handler::<DocumentHandler>().unwrap();
    assert!(found.ptr_eq(&inner));
    assert_eq!(handler.name(), "test bundle");

    inner_document.save(&inner).unwrap();
    assert!(!inner.is_dirty());
    assert!(!field.is_dirty());
    assert!(outer.is_dirty());
}

#[test]
fn test_undo_marks_dirty_after_save() {
    let base_dir = tempfile::TempDir::new().unwrap();
    let history = History::default();
    let document = document(&history, &base_dir.path().join("bundle.toml"));
    let root = Node::new("bundle", BoundValue::new(Bundle::new("Pack")), Some(document.clone()));
    let enabled = root.add_child("enabled", BoundValue::new(true), None);

    history.record_set(&enabled, false, Merge::Never).unwrap();
    document.save(&root).unwrap();
    assert!(!enabled.is_dirty());

    history.undo();
    assert!(enabled.is_dirty());
    assert!(root.is_dirty());
    assert!(!history.is_at_save_point());

    history.redo();
    assert!(history.is_at_save_point());
}

#[test]
/// A save that finishes after more edits leaves the document dirty
fn test_late_save_keeps_newer_edits_dirty() {
    let base_dir = tempfile::TempDir::new().unwrap();
    let history = History::default();
    let document = document(&history, &base_dir.path().join("bundle.toml"));
    let root = Node::new("bundle", BoundValue::new(Bundle::new("Pack")), Some(document.clone()));
    let version = root.add_child("version", BoundValue::new(1i64), None);

    history.record_set(&version, 2i64, Merge::Never).unwrap();
    let text = document.encode(&root).unwrap();
    let position = history.position();

    history.record_set(&version, 3i64, Merge::Never).unwrap();
    crate::util::write_with_temp_file(&document.path(), text.as_bytes()).unwrap();
    document.finish_save(&root, position);
    assert!(root.is_dirty());

    history.undo();
    assert!(history.is_at_save_point());

    document.finish_save(&root, history.position());
    assert!(!root.is_dirty());
    assert!(!version.is_dirty());
}

#[test]
/// A save that was still being written when the document got reverted doesn't count as saving
/// the reloaded data
fn test_save_finishing_after_revert() -> Result<(), EditorError> {
    let base_dir = tempfile::TempDir::new()?;
    let history = History::default();
    let document = document(&history, &base_dir.path().join("bundle.toml"));
    let root = Node::new("bundle", BoundValue::new(Bundle::new("Pack")), Some(document.clone()));
    document.save(&root)?;

    let version = root.add_child("version", BoundValue::new(1i64), None);
    history.record_set(&version, 2i64, Merge::Never)?;
    let text = document.encode(&root)?;
    let position = history.position();

    document.revert(&root)?;
    assert!(!root.is_dirty());
    assert!(history.is_at_save_point());

    crate::util::write_with_temp_file(&document.path(), text.as_bytes())?;
    document.finish_save(&root, position);
    assert!(root.is_dirty());
    assert!(!history.is_at_save_point());

    document.save(&root)?;
    assert!(!root.is_dirty());
    assert!(history.is_at_save_point());

    Ok(())
}
