use std::rc::Rc;

use crate::components::bundle::{Asset, AssetKind, Bundle, BundleSource, SceneObject};
use crate::components::{BoundValue, DocumentHandler, History, Node, Shared, shared};
use crate::ui::handlers::HandlerRegistry;
use crate::ui::handlers::list::ListHandler;
use crate::ui::handlers::record::{Record, RecordHandler};
use crate::ui::handlers::scalar::{
    BoolHandler, Choice, ChoiceHandler, FloatHandler, IntHandler, TextHandler,
};
use crate::ui::handlers::scene::SceneHandler;

impl Record for Bundle {
    fn title(&self) -> String {
        self.name.borrow().clone()
    }

    fn fields(&self) -> Vec<(&'static str, BoundValue)> {
        vec![
            ("Name", self.name.clone().into()),
            ("Author", self.author.clone().into()),
            ("Version", self.version.clone().into()),
            ("Enabled", self.enabled.clone().into()),
            ("Assets", self.assets.clone().into()),
            ("Scene", self.scene.clone().into()),
        ]
    }
}

impl Record for Asset {
    fn title(&self) -> String {
        format!("{} ({})", self.name.borrow(), self.kind.borrow().name())
    }

    fn fields(&self) -> Vec<(&'static str, BoundValue)> {
        vec![
            ("Name", self.name.clone().into()),
            ("Kind", self.kind.clone().into()),
            ("Scale", self.scale.clone().into()),
            ("Tags", self.tags.clone().into()),
        ]
    }
}

impl Choice for AssetKind {
    fn choices() -> &'static [Self] {
        &AssetKind::ALL
    }

    fn choice_name(&self) -> &'static str {
        self.name()
    }
}

/// Handlers for everything a bundle is made of
pub fn default_registry() -> HandlerRegistry {
    HandlerRegistry::builder()
        .register::<String>(|_| Rc::new(TextHandler))
        .register::<i64>(|_| Rc::new(IntHandler))
        .register::<f64>(|_| Rc::new(FloatHandler::default()))
        .register::<bool>(|_| Rc::new(BoolHandler))
        .register::<AssetKind>(|_| Rc::new(ChoiceHandler::<AssetKind>::default()))
        .register::<Asset>(|registry| Rc::new(RecordHandler::<Asset>::new(registry.clone())))
        .register::<Vec<Shared<Asset>>>(|registry| {
            Rc::new(ListHandler::new(
                registry.clone(),
                || shared(Asset::new("New Asset", AssetKind::Mesh)),
                |asset: &Asset| asset.name.borrow().clone(),
            ))
        })
        .register::<Vec<Shared<String>>>(|registry| {
            Rc::new(ListHandler::new(
                registry.clone(),
                || shared(String::from("tag")),
                |tag: &String| tag.clone(),
            ))
        })
        .register::<SceneObject>(|registry| Rc::new(SceneHandler::new(registry.clone())))
        .register::<Bundle>(|registry| Rc::new(RecordHandler::<Bundle>::new(registry.clone())))
        .build()
}

/// Root node of an open bundle. The node owns the document's history through its handler
pub fn bundle_document(
    registry: &HandlerRegistry,
    bundle: Shared<Bundle>,
    source: BundleSource,
    history: History,
) -> (Node, Rc<DocumentHandler>) {
    let name = bundle.borrow().name.borrow().clone();
    let content = Rc::new(RecordHandler::<Bundle>::new(registry.clone()));
    let document = Rc::new(DocumentHandler::new(
        name,
        history,
        Box::new(source),
        content,
    ));
    let root = Node::new(
        "bundle",
        BoundValue::from_shared(bundle),
        Some(document.clone()),
    );
    root.set_expanded(true);
    (root, document)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::components::Merge;
    use crate::ui::handlers::list::ListAction;

    fn open_sample() -> (Node, Rc<DocumentHandler>, Shared<Bundle>) {
        let bundle = shared(Bundle::sample());
        let (root, document) = bundle_document(
            &default_registry(),
            bundle.clone(),
            BundleSource::new("unused.toml"),
            History::default(),
        );
        root.sync_tree();
        (root, document, bundle)
    }

    fn labels(node: &Node) -> Vec<String> {
        node.children().iter().map(Node::label).collect()
    }

    #[test]
    fn test_sample_tree() {
        let (root, _document, _bundle) = open_sample();

        assert_eq!(
            labels(&root),
            vec!["Name", "Author", "Version", "Enabled", "Assets", "Scene"]
        );
        let assets = root.child(4).unwrap();
        assert_eq!(labels(&assets), vec!["[0]", "[1]", "[2]"]);

        let barrel = assets.child(0).unwrap();
        assert!(barrel.find_ancestor_handler::<RecordHandler<Asset>>().is_some());
        assert_eq!(labels(&barrel), vec!["Name", "Kind", "Scale", "Tags"]);
        assert_eq!(barrel.child(3).unwrap().child_count(), 2);
        assert!(
            barrel
                .child(1)
                .unwrap()
                .find_ancestor_handler::<ChoiceHandler<AssetKind>>()
                .is_some()
        );

        let scene = root.child(5).unwrap();
        assert_eq!(labels(&scene), vec!["Courtyard"]);
        assert_eq!(scene.child(0).unwrap().child_count(), 2);

        // every node in the tree got a handler
        assert!(root.descendants().iter().all(|node| node.handler().is_some()));
    }

    #[test]
    fn test_edits_keep_node_identity() {
        let (root, document, bundle) = open_sample();
        let history = document.history().clone();
        let assets = root.child(4).unwrap();
        let creak = assets.child(2).unwrap();
        let scale = assets.child(0).unwrap().child(2).unwrap();
        scale.set_expanded(true);

        history.record_set(&scale, 2.5, Merge::Field("value")).unwrap();
        history.record_set(&scale, 3.0, Merge::Field("value")).unwrap();
        assert_eq!(history.undo_len(), 1);
        assert_eq!(*bundle.borrow().assets.borrow()[0].borrow().scale.borrow(), 3.0);

        history
            .record_list_remove::<Shared<Asset>>(&assets, 1)
            .unwrap();
        root.sync_tree();
        assert!(assets.child(1).unwrap().ptr_eq(&creak));
        assert_eq!(creak.label(), "[1]");

        history.undo();
        history.undo();
        root.sync_tree();
        assert!(assets.child(2).unwrap().ptr_eq(&creak));
        assert!(assets.child(0).unwrap().child(2).unwrap().ptr_eq(&scale));
        assert!(scale.is_expanded());
        assert_eq!(*bundle.borrow().assets.borrow()[0].borrow().scale.borrow(), 1.0);
    }

    #[test]
    fn test_list_add_gets_handler() {
        let (root, document, _bundle) = open_sample();
        let assets = root.child(4).unwrap();
        let handler = assets
            .find_ancestor_handler::<ListHandler<Asset>>()
            .map(|(_, handler)| handler)
            .unwrap();

        handler.apply(&assets, ListAction::Add);
        root.sync_tree();

        let added = assets.child(3).unwrap();
        assert!(added.find_ancestor_handler::<RecordHandler<Asset>>().is_some());
        assert_eq!(added.child_count(), 4);
        assert!(root.is_dirty());
        assert_eq!(document.history().undo_label().unwrap(), "Add item to bundle/Assets");
    }
}
