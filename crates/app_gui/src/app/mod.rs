//! Application state and top-level layout.

mod config;
mod settings;
mod worker;

use eframe::egui;
use rfd::FileDialog;
use std::path::PathBuf;
use wildlife_core::{Prediction, export_csv};

use config::AppSettings;
use worker::{Job, Worker, WorkerEvent};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "webp", "tiff", "tif"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Panel {
    Viewer,
    Settings,
}

pub struct UiApp {
    panel: Panel,
    settings: AppSettings,
    worker: Worker,
    egui_ctx: egui::Context,
    current_image: Option<PathBuf>,
    texture: Option<egui::TextureHandle>,
    predictions: Vec<Prediction>,
    busy: bool,
    status: String,
}

impl UiApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings = AppSettings::load_or_default();
        let worker = Worker::spawn(settings.classifier_config(), cc.egui_ctx.clone());
        Self {
            panel: Panel::Viewer,
            settings,
            worker,
            egui_ctx: cc.egui_ctx.clone(),
            current_image: None,
            texture: None,
            predictions: Vec::new(),
            busy: false,
            status: "Ready".to_string(),
        }
    }

    fn upload_image(&mut self) {
        if let Some(path) = FileDialog::new()
            .add_filter("Image files", IMAGE_EXTENSIONS)
            .pick_file()
        {
            self.load_image(path);
        }
    }

    fn load_image(&mut self, path: PathBuf) {
        self.texture = None;
        self.predictions.clear();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.status = format!("Image loaded: {name}");
        self.busy = true;
        self.worker.submit(Job {
            image: path.clone(),
            top_k: self.settings.top_k,
        });
        self.current_image = Some(path);
    }

    /// Respawn the classification worker, e.g. after the model path changed.
    /// Dropping the old handle closes its job channel and ends its thread.
    fn restart_worker(&mut self) {
        self.worker = Worker::spawn(self.settings.classifier_config(), self.egui_ctx.clone());
        self.busy = false;
    }

    fn drain_worker_events(&mut self) {
        while let Some(event) = self.worker.try_recv() {
            match event {
                WorkerEvent::Status(text) => self.status = text,
                WorkerEvent::Predictions(preds) => {
                    self.predictions = preds;
                    self.busy = false;
                    self.status = "Prediction complete".to_string();
                }
                WorkerEvent::Failed(err) => {
                    self.predictions.clear();
                    self.busy = false;
                    self.status = format!("Prediction failed: {err}");
                }
            }
        }
    }

    fn clear_all(&mut self) {
        self.current_image = None;
        self.texture = None;
        self.predictions.clear();
        self.status = "Ready".to_string();
    }

    fn ensure_texture(&mut self, ctx: &egui::Context) {
        if self.texture.is_some() {
            return;
        }
        let Some(path) = self.current_image.clone() else {
            return;
        };
        match image::open(&path) {
            Ok(img) => {
                let rgba = img.to_rgba8();
                let size = [rgba.width() as usize, rgba.height() as usize];
                let pixels = rgba.into_raw();
                let color = egui::ColorImage::from_rgba_unmultiplied(size, &pixels);
                let name = format!("upload:{}", path.display());
                self.texture = Some(ctx.load_texture(name, color, egui::TextureOptions::LINEAR));
            }
            Err(e) => {
                tracing::warn!("failed to load image {}: {}", path.display(), e);
                self.status = format!("Failed to load image: {e}");
                self.current_image = None;
            }
        }
    }

    fn render_image_pane(&mut self, ui: &mut egui::Ui) {
        match &self.texture {
            Some(texture) => {
                let avail = ui.available_size();
                let tex_size = texture.size_vec2();
                // Fit the canvas while keeping aspect ratio, with a small margin.
                let scale = (avail.x / tex_size.x).min(avail.y / tex_size.y) * 0.95;
                let display = tex_size * scale;
                ui.centered_and_justified(|ui| {
                    ui.image((texture.id(), display));
                });
            }
            None => {
                ui.centered_and_justified(|ui| {
                    ui.label(
                        egui::RichText::new("No image uploaded\nClick 'Upload image...' to begin")
                            .weak(),
                    );
                });
            }
        }
    }

    fn render_predictions_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Top Predictions");
        ui.add_space(6.0);

        if self.predictions.is_empty() {
            let hint = if self.busy {
                "Predicting..."
            } else {
                "Upload an image to see predictions"
            };
            ui.label(egui::RichText::new(hint).weak());
            return;
        }

        let top = &self.predictions[0];
        ui.label(egui::RichText::new("Top prediction").strong());
        ui.label(
            egui::RichText::new(&top.species)
                .heading()
                .color(egui::Color32::from_rgb(0x27, 0xae, 0x60)),
        );
        ui.label(format!("Confidence: {:.2}%", top.confidence));
        ui.separator();

        egui::ScrollArea::vertical()
            .auto_shrink([false, true])
            .show(ui, |ui| {
                for (rank, pred) in self.predictions.iter().enumerate() {
                    ui.label(format!("{}. {}", rank + 1, pred.species));
                    ui.add(
                        egui::ProgressBar::new((pred.confidence / 100.0).clamp(0.0, 1.0))
                            .text(format!("{:.2}%", pred.confidence)),
                    );
                    ui.add_space(4.0);
                }
            });

        ui.separator();
        ui.horizontal(|ui| {
            if ui.button("Copy results").clicked() {
                self.copy_results();
            }
            if ui.button("Export CSV...").clicked() {
                self.export_results();
            }
        });
    }

    fn copy_results(&mut self) {
        let text = results_text(&self.predictions);
        match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text)) {
            Ok(()) => self.status = "Results copied to clipboard".to_string(),
            Err(e) => self.status = format!("Clipboard error: {e}"),
        }
    }

    fn export_results(&mut self) {
        let Some(path) = FileDialog::new()
            .add_filter("CSV", &["csv"])
            .set_file_name("predictions.csv")
            .save_file()
        else {
            return;
        };
        match export_csv(&self.predictions, &path) {
            Ok(()) => self.status = format!("CSV exported: {}", path.display()),
            Err(e) => self.status = format!("Export failed: {e}"),
        }
    }
}

/// Plain-text rendering of the prediction list, used for clipboard copies.
fn results_text(predictions: &[Prediction]) -> String {
    let mut text = String::new();
    for (rank, pred) in predictions.iter().enumerate() {
        text.push_str(&format!(
            "{}. {}: {:.2}%\n",
            rank + 1,
            pred.species,
            pred.confidence
        ));
    }
    text
}

impl eframe::App for UiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_worker_events();
        self.ensure_texture(ctx);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(!self.busy, egui::Button::new("Upload image..."))
                    .clicked()
                {
                    self.upload_image();
                }
                if ui
                    .add_enabled(!self.busy, egui::Button::new("Clear"))
                    .clicked()
                {
                    self.clear_all();
                }
                let settings_open = self.panel == Panel::Settings;
                if ui.selectable_label(settings_open, "Settings").clicked() {
                    self.panel = if settings_open {
                        Panel::Viewer
                    } else {
                        Panel::Settings
                    };
                }
            });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.label(&self.status);
        });

        if self.panel == Panel::Settings {
            egui::CentralPanel::default().show(ctx, |ui| self.render_settings_panel(ui));
            return;
        }

        egui::SidePanel::right("predictions")
            .default_width(300.0)
            .show(ctx, |ui| self.render_predictions_panel(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.render_image_pane(ui));
    }
}
