use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use directories::ProjectDirs;
use toml_edit::{DocumentMut, value};

use crate::components::history::DEFAULT_HISTORY_LIMIT;
use crate::util::{EditorError, write_with_temp_file};

#[derive(Debug)]
struct SettingsData {
    /// size of the body font
    font_size: f32,

    /// undo steps kept per document, 0 keeps everything
    history_limit: usize,

    /// mark nodes with unsaved changes in the tree
    show_dirty_markers: bool,

    modified: bool,
}

impl Default for SettingsData {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            history_limit: DEFAULT_HISTORY_LIMIT,
            show_dirty_markers: true,
            modified: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Settings(Rc<RefCell<SettingsData>>);

impl Settings {
    /// Reads whatever is in `table`, keeping defaults for anything missing or malformed. Missing
    /// values mark the settings as modified so they get written out
    pub fn load(&mut self, table: &DocumentMut) {
        let mut modified = false;

        let mut data = self.0.borrow_mut();

        match table.get("font_size") {
            Some(font_size_item) => {
                if let Some(font_size) = font_size_item.as_float() {
                    data.font_size = font_size as f32;
                } else if let Some(font_size) = font_size_item.as_integer() {
                    data.font_size = font_size as f32;
                } else {
                    modified = true;
                }
            }
            None => modified = true,
        }

        match table
            .get("history_limit")
            .and_then(|val| val.as_integer())
            .and_then(|limit| usize::try_from(limit).ok())
        {
            Some(history_limit) => data.history_limit = history_limit,
            None => modified = true,
        }

        match table.get("show_dirty_markers").and_then(|val| val.as_bool()) {
            Some(show_dirty_markers) => data.show_dirty_markers = show_dirty_markers,
            None => modified = true,
        }

        data.modified = modified
    }

    pub fn save(&self, table: &mut DocumentMut) {
        let mut data = self.0.borrow_mut();
        log::debug!("saving settings: {data:?}");
        table.insert("font_size", value(data.font_size as f64));
        table.insert("history_limit", value(data.history_limit as i64));
        table.insert("show_dirty_markers", value(data.show_dirty_markers));

        data.modified = false;
    }

    pub fn get_path(project_dirs: &ProjectDirs) -> PathBuf {
        project_dirs.config_dir().join("settings.toml")
    }

    /// Settings stored at `path`. A missing file gives the defaults
    pub fn load_from(path: &Path) -> Result<Self, EditorError> {
        let mut settings = Settings::default();
        if !path.exists() {
            log::info!("no settings at {path:?}, using defaults");
            settings.0.borrow_mut().modified = true;
            return Ok(settings);
        }

        let table = std::fs::read_to_string(path)?.parse::<DocumentMut>()?;
        settings.load(&table);
        Ok(settings)
    }

    /// Writes the settings to `path`, keeping anything else already in the file
    pub fn write_to(&self, path: &Path) -> Result<(), EditorError> {
        let mut table = match std::fs::read_to_string(path) {
            Ok(text) => text.parse::<DocumentMut>().unwrap_or_else(|err| {
                log::warn!("overwriting unreadable settings at {path:?}: {err}");
                DocumentMut::new()
            }),
            Err(_) => DocumentMut::new(),
        };
        self.save(&mut table);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        write_with_temp_file(path, table.to_string().as_bytes())
    }

    pub fn font_size(&self) -> f32 {
        self.0.borrow().font_size
    }

    pub fn set_font_size(&mut self, font_size: f32) {
        let mut data = self.0.borrow_mut();
        data.font_size = font_size;
        data.modified = true;
    }

    pub fn history_limit(&self) -> usize {
        self.0.borrow().history_limit
    }

    pub fn set_history_limit(&mut self, history_limit: usize) {
        let mut data = self.0.borrow_mut();
        data.history_limit = history_limit;
        data.modified = true;
    }

    pub fn show_dirty_markers(&self) -> bool {
        self.0.borrow().show_dirty_markers
    }

    pub fn set_show_dirty_markers(&mut self, show_dirty_markers: bool) {
        let mut data = self.0.borrow_mut();
        data.show_dirty_markers = show_dirty_markers;
        data.modified = true;
    }

    pub fn modified(&self) -> bool {
        self.0.borrow().modified
    }
}
