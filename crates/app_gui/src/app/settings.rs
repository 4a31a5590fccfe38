//! Settings panel rendering for prediction count and model selection.

use super::config::{MAX_TOP_K, MIN_TOP_K};
use super::{Panel, UiApp};
use eframe::egui;
use rfd::FileDialog;

impl UiApp {
    /// Renders the settings screen including the prediction count and the
    /// model file picker.
    pub(super) fn render_settings_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Settings");
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            ui.label("Predictions shown");
            let resp = ui.add(
                egui::DragValue::new(&mut self.settings.top_k)
                    .range(MIN_TOP_K..=MAX_TOP_K)
                    .speed(1),
            );
            if resp.changed() {
                self.settings.save();
                self.status = "New prediction count will be applied to the next image".to_string();
            }
        });

        ui.add_space(12.0);
        ui.horizontal(|ui| {
            ui.label("Model file");
            ui.monospace(self.settings.model_path.display().to_string());
            if ui.button("Choose model...").clicked()
                && let Some(path) = FileDialog::new()
                    .add_filter("ONNX model", &["onnx"])
                    .pick_file()
            {
                self.settings.model_path = path;
                self.settings.save();
                self.restart_worker();
                self.status = "Model path updated".to_string();
            }
        });

        ui.add_space(16.0);
        ui.separator();
        ui.add_space(6.0);
        ui.heading("Versions");
        ui.label(format!("App version: {}", env!("CARGO_PKG_VERSION")));
        ui.label(format!("Recognizer version: {}", wildlife_core::VERSION));

        ui.add_space(12.0);
        if ui.button("Back to results").clicked() {
            self.panel = Panel::Viewer;
        }
    }
}
