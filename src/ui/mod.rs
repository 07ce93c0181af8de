pub mod handlers;
pub mod settings;

use std::path::PathBuf;
use std::rc::Rc;

use egui::{FontFamily, FontId, Key, KeyboardShortcut, Modifiers, TextStyle};

use crate::components::bundle::{Bundle, BundleSource};
use crate::components::{DocumentHandler, History, Node, shared};
use crate::ui::handlers::bundle::bundle_document;
use crate::ui::handlers::{DIRTY_MARKERS_ID, default_registry};
use crate::util::queue::TaskQueue;
use crate::util::write_with_temp_file;

pub use settings::Settings;

const UNDO: KeyboardShortcut = KeyboardShortcut::new(Modifiers::COMMAND, Key::Z);
const REDO: KeyboardShortcut =
    KeyboardShortcut::new(Modifiers::COMMAND.plus(Modifiers::SHIFT), Key::Z);
const REDO_ALT: KeyboardShortcut = KeyboardShortcut::new(Modifiers::COMMAND, Key::Y);
const SAVE: KeyboardShortcut = KeyboardShortcut::new(Modifiers::COMMAND, Key::S);

pub struct EditorApp {
    root: Node,
    document: Rc<DocumentHandler>,
    settings: Settings,
    settings_path: Option<PathBuf>,
    show_settings: bool,
    /// last save/revert outcome, shown in the top bar
    status: String,
    saving: bool,
    tasks: TaskQueue<EditorApp>,
}

impl std::fmt::Debug for EditorApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        f.debug_struct("EditorApp")
            .field("document", &self.document.name())
            .field("path", &self.document.path())
            .field("settings", &self.settings)
            .finish()
    }
}

fn configure_text_styles(ctx: &egui::Context, font_size: f32) {
    ctx.style_mut(|style| {
        style
            .text_styles
            .insert(TextStyle::Body, FontId::new(font_size, FontFamily::Proportional));
        style
            .text_styles
            .insert(TextStyle::Button, FontId::new(font_size, FontFamily::Proportional));
    });
}

impl EditorApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        bundle: Bundle,
        path: PathBuf,
        settings: Settings,
        settings_path: Option<PathBuf>,
    ) -> Self {
        configure_text_styles(&cc.egui_ctx, settings.font_size());

        let ctx = cc.egui_ctx.clone();
        let tasks = TaskQueue::with_wake(move || ctx.request_repaint());

        let history = History::with_limit(settings.history_limit());
        let (root, document) = bundle_document(
            &default_registry(),
            shared(bundle),
            BundleSource::new(path),
            history,
        );

        Self {
            root,
            document,
            settings,
            settings_path,
            show_settings: false,
            status: String::new(),
            saving: false,
            tasks,
        }
    }

    fn undo(&mut self) {
        if !self.document.history().undo() {
            self.status = String::from("Nothing to undo");
        }
    }

    fn redo(&mut self) {
        if !self.document.history().redo() {
            self.status = String::from("Nothing to redo");
        }
    }

    /// Encodes on the UI thread, writes on a worker. The document is only marked saved once the
    /// write has finished
    fn save(&mut self) {
        if self.saving {
            return;
        }
        let text = match self.document.encode(&self.root) {
            Ok(text) => text,
            Err(err) => {
                log::error!("could not encode {}: {err}", self.document.name());
                self.status = format!("Save failed: {err}");
                return;
            }
        };
        let position = self.document.history().position();
        let path = self.document.path();
        let sender = self.tasks.sender();
        self.saving = true;
        self.status = String::from("Saving...");

        std::thread::spawn(move || {
            let result = write_with_temp_file(&path, text.as_bytes());
            sender.invoke(move |app: &mut EditorApp| {
                app.saving = false;
                match result {
                    Ok(()) => {
                        log::info!("saved {path:?}");
                        app.document.finish_save(&app.root, position);
                        app.status = format!("Saved to {}", path.display());
                    }
                    Err(err) => {
                        log::error!("failed to save {path:?}: {err}");
                        app.status = format!("Save failed: {err}");
                    }
                }
            });
        });
    }

    fn revert(&mut self) {
        if self.saving {
            self.status = String::from("Wait for the save to finish before reverting");
            return;
        }
        match self.document.revert(&self.root) {
            Ok(()) => {
                self.root.set_expanded(true);
                self.status = String::from("Reverted");
            }
            Err(err) => {
                log::error!("failed to revert {}: {err}", self.document.name());
                self.status = format!("Revert failed: {err}");
            }
        }
    }

    fn process_tasks(&mut self) {
        for task in self.tasks.pending() {
            task(self);
        }
    }

    fn process_shortcuts(&mut self, ctx: &egui::Context) {
        // check the longer shortcut first, consume_shortcut ignores extra modifiers
        if ctx.input_mut(|i| i.consume_shortcut(&REDO) || i.consume_shortcut(&REDO_ALT)) {
            self.redo();
        } else if ctx.input_mut(|i| i.consume_shortcut(&UNDO)) {
            self.undo();
        }
        if ctx.input_mut(|i| i.consume_shortcut(&SAVE)) {
            self.save();
        }
    }

    fn apply_settings(&mut self, ctx: &egui::Context) {
        let show_dirty_markers = self.settings.show_dirty_markers();
        ctx.data_mut(|data| {
            data.insert_temp(egui::Id::new(DIRTY_MARKERS_ID), show_dirty_markers)
        });
        self.document
            .history()
            .set_limit(self.settings.history_limit());
    }

    fn top_bar(&mut self, ui: &mut egui::Ui) {
        let history = self.document.history().clone();
        ui.horizontal(|ui| {
            if ui
                .add_enabled(!self.saving, egui::Button::new("Save"))
                .clicked()
            {
                self.save();
            }
            if ui
                .add_enabled(!self.saving, egui::Button::new("Revert"))
                .on_hover_text("Discard every change and reload the file")
                .clicked()
            {
                self.revert();
            }

            ui.separator();

            let undo = ui.add_enabled(history.can_undo(), egui::Button::new("Undo"));
            let undo = match history.undo_label() {
                Some(label) => undo.on_hover_text(label),
                None => undo,
            };
            if undo.clicked() {
                self.undo();
            }
            let redo = ui.add_enabled(history.can_redo(), egui::Button::new("Redo"));
            let redo = match history.redo_label() {
                Some(label) => redo.on_hover_text(label),
                None => redo,
            };
            if redo.clicked() {
                self.redo();
            }

            ui.separator();
            ui.toggle_value(&mut self.show_settings, "Settings");

            ui.separator();
            if self.root.is_dirty() {
                ui.label("Modified");
            } else if history.is_at_save_point() {
                ui.weak("Saved");
            }
            if !self.status.is_empty() {
                ui.weak(&self.status);
            }
        });
    }

    fn settings_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Settings");

        let mut font_size = self.settings.font_size();
        if ui
            .add(egui::Slider::new(&mut font_size, 10.0..=32.0).text("Font size"))
            .changed()
        {
            self.settings.set_font_size(font_size);
            configure_text_styles(ui.ctx(), font_size);
        }

        let mut history_limit = self.settings.history_limit();
        if ui
            .add(egui::DragValue::new(&mut history_limit).range(0..=10_000))
            .on_hover_text("Undo steps to keep, 0 keeps everything")
            .changed()
        {
            self.settings.set_history_limit(history_limit);
        }

        let mut show_dirty_markers = self.settings.show_dirty_markers();
        if ui
            .checkbox(&mut show_dirty_markers, "Mark unsaved changes")
            .changed()
        {
            self.settings.set_show_dirty_markers(show_dirty_markers);
        }

        if let Some(settings_path) = &self.settings_path
            && ui
                .add_enabled(self.settings.modified(), egui::Button::new("Save settings"))
                .clicked()
            && let Err(err) = self.settings.write_to(settings_path)
        {
            log::error!("failed to save settings: {err}");
            self.status = format!("Could not save settings: {err}");
        }
    }
}

impl eframe::App for EditorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_tasks();
        self.process_shortcuts(ctx);
        self.apply_settings(ctx);

        egui::TopBottomPanel::top("editor top bar").show(ctx, |ui| {
            self.top_bar(ui);
        });

        if self.show_settings {
            egui::SidePanel::right("settings panel").show(ctx, |ui| {
                self.settings_panel(ui);
            });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .id_salt("bundle scroll")
                .show(ui, |ui| {
                    self.root.sync_tree();
                    self.root.render(ui);
                });
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if self.root.is_dirty() {
            log::warn!("closing with unsaved changes in {}", self.document.name());
        }
        if self.settings.modified()
            && let Some(settings_path) = &self.settings_path
            && let Err(err) = self.settings.write_to(settings_path)
        {
            log::error!("failed to save settings on exit: {err}");
        }
    }
}
