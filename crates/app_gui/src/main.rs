use eframe::egui;

mod app;

use app::UiApp;

fn main() {
    tracing_subscriber::fmt::init();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1000.0, 700.0]),
        ..Default::default()
    };
    if let Err(e) = eframe::run_native(
        "Wildlife Image Recognition",
        options,
        Box::new(|cc| Ok::<_, Box<dyn std::error::Error + Send + Sync>>(Box::new(UiApp::new(cc)))),
    ) {
        eprintln!("Application exited with error: {e}");
    }
}
