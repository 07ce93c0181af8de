//! The mod bundle document: a named set of assets plus the scene graph they get placed in.
//!
//! The live model keeps every editable field behind its own `Shared` so tree nodes can bind to
//! fields directly. On disk it's plain TOML through the `*File` mirror structs.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::components::document::DocumentSource;
use crate::components::history::ChildList;
use crate::components::value::{BoundValue, Shared, shared};
use crate::editor_error;
use crate::util::EditorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Mesh,
    Texture,
    Sound,
    Script,
}

impl AssetKind {
    pub const ALL: [AssetKind; 4] = [
        AssetKind::Mesh,
        AssetKind::Texture,
        AssetKind::Sound,
        AssetKind::Script,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AssetKind::Mesh => "Mesh",
            AssetKind::Texture => "Texture",
            AssetKind::Sound => "Sound",
            AssetKind::Script => "Script",
        }
    }
}

#[derive(Debug)]
pub struct Asset {
    /// ID unique across all assets. New assets get a UUIDv4, but any string is accepted
    pub id: Rc<String>,
    pub name: Shared<String>,
    pub kind: Shared<AssetKind>,
    pub scale: Shared<f64>,
    pub tags: Shared<Vec<Shared<String>>>,
}

impl Asset {
    pub fn new(name: impl Into<String>, kind: AssetKind) -> Self {
        Self {
            id: Rc::new(Uuid::new_v4().as_hyphenated().to_string()),
            name: shared(name.into()),
            kind: shared(kind),
            scale: shared(1.0),
            tags: shared(Vec::new()),
        }
    }
}

#[derive(Debug)]
pub struct SceneObject {
    pub name: Shared<String>,
    pub visible: Shared<bool>,
    pub children: Vec<Shared<SceneObject>>,
}

impl SceneObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: shared(name.into()),
            visible: shared(true),
            children: Vec::new(),
        }
    }
}

impl ChildList for SceneObject {
    type Child = Shared<SceneObject>;

    fn child_list(&mut self) -> &mut Vec<Shared<SceneObject>> {
        &mut self.children
    }
}

#[derive(Debug)]
pub struct Bundle {
    pub name: Shared<String>,
    pub author: Shared<String>,
    pub version: Shared<i64>,
    pub enabled: Shared<bool>,
    pub assets: Shared<Vec<Shared<Asset>>>,
    pub scene: Shared<SceneObject>,
}

impl Bundle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: shared(name.into()),
            author: shared(String::new()),
            version: shared(1),
            enabled: shared(true),
            assets: shared(Vec::new()),
            scene: shared(SceneObject::new("Root")),
        }
    }

    /// Something to look at when starting without a bundle file
    pub fn sample() -> Self {
        let bundle = Bundle::new("Untitled Bundle");

        let barrel = Asset::new("Barrel", AssetKind::Mesh);
        barrel.tags.borrow_mut().push(shared(String::from("prop")));
        barrel.tags.borrow_mut().push(shared(String::from("destructible")));
        let barrel_texture = Asset::new("Barrel Diffuse", AssetKind::Texture);
        let creak = Asset::new("Door Creak", AssetKind::Sound);

        bundle.assets.borrow_mut().extend([
            shared(barrel),
            shared(barrel_texture),
            shared(creak),
        ]);

        let mut courtyard = SceneObject::new("Courtyard");
        courtyard.children.push(shared(SceneObject::new("Barrel 01")));
        courtyard.children.push(shared(SceneObject::new("Barrel 02")));
        bundle.scene.borrow_mut().children.push(shared(courtyard));

        bundle
    }

    pub fn to_file(&self) -> BundleFile {
        BundleFile {
            name: self.name.borrow().clone(),
            author: self.author.borrow().clone(),
            version: *self.version.borrow(),
            enabled: *self.enabled.borrow(),
            assets: self
                .assets
                .borrow()
                .iter()
                .map(|asset| AssetFile::from(&*asset.borrow()))
                .collect(),
            scene: SceneFile::from(&*self.scene.borrow()),
        }
    }

    pub fn from_file(file: BundleFile) -> Self {
        Self {
            name: shared(file.name),
            author: shared(file.author),
            version: shared(file.version),
            enabled: shared(file.enabled),
            assets: shared(
                file.assets
                    .into_iter()
                    .map(|asset| shared(Asset::from(asset)))
                    .collect(),
            ),
            scene: shared(SceneObject::from(file.scene)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleFile {
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default = "default_version")]
    pub version: i64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub assets: Vec<AssetFile>,
    #[serde(default = "default_scene")]
    pub scene: SceneFile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetFile {
    #[serde(default = "new_id")]
    pub id: String,
    pub name: String,
    pub kind: AssetKind,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneFile {
    pub name: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub children: Vec<SceneFile>,
}

fn default_version() -> i64 {
    1
}

fn default_true() -> bool {
    true
}

fn default_scale() -> f64 {
    1.0
}

fn default_scene() -> SceneFile {
    SceneFile::from(&SceneObject::new("Root"))
}

fn new_id() -> String {
    Uuid::new_v4().as_hyphenated().to_string()
}

impl From<&Asset> for AssetFile {
    fn from(asset: &Asset) -> Self {
        Self {
            id: asset.id.to_string(),
            name: asset.name.borrow().clone(),
            kind: *asset.kind.borrow(),
            scale: *asset.scale.borrow(),
            tags: asset
                .tags
                .borrow()
                .iter()
                .map(|tag| tag.borrow().clone())
                .collect(),
        }
    }
}

impl From<AssetFile> for Asset {
    fn from(file: AssetFile) -> Self {
        Self {
            id: Rc::new(file.id),
            name: shared(file.name),
            kind: shared(file.kind),
            scale: shared(file.scale),
            tags: shared(file.tags.into_iter().map(shared).collect()),
        }
    }
}

impl From<&SceneObject> for SceneFile {
    fn from(object: &SceneObject) -> Self {
        Self {
            name: object.name.borrow().clone(),
            visible: *object.visible.borrow(),
            children: object
                .children
                .iter()
                .map(|child| SceneFile::from(&*child.borrow()))
                .collect(),
        }
    }
}

impl From<SceneFile> for SceneObject {
    fn from(file: SceneFile) -> Self {
        Self {
            name: shared(file.name),
            visible: shared(file.visible),
            children: file
                .children
                .into_iter()
                .map(|child| shared(SceneObject::from(child)))
                .collect(),
        }
    }
}

/// Stores a bundle as a TOML file
#[derive(Debug)]
pub struct BundleSource {
    path: PathBuf,
}

impl BundleSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads the bundle at `path`
    pub fn load(&self) -> Result<Bundle, EditorError> {
        let text = std::fs::read_to_string(&self.path)?;
        let file: BundleFile = toml::from_str(&text)?;
        Ok(Bundle::from_file(file))
    }
}

impl DocumentSource for BundleSource {
    fn path(&self) -> &Path {
        &self.path
    }

    fn encode(&self, value: &BoundValue) -> Result<String, EditorError> {
        let bundle = value
            .downcast::<Bundle>()
            .ok_or_else(|| editor_error!("expected a bundle, found {}", value.type_name()))?;
        let file = bundle.borrow().to_file();
        Ok(toml::to_string_pretty(&file)?)
    }

    fn decode(&self, text: &str) -> Result<BoundValue, EditorError> {
        let file: BundleFile = toml::from_str(text)?;
        Ok(BoundValue::new(Bundle::from_file(file)))
    }
}
