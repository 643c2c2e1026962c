mod app;
mod state;
mod ui;

use app::HokiApp;
use eframe::egui;
use hoki::config::Settings;
use state::AppState;

fn main() -> eframe::Result {
    env_logger::init();

    let settings = Settings::load().unwrap_or_else(|e| {
        log::error!("Ignoring settings: {e:#}");
        Settings::default()
    });

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "hoki – BPASS viewer",
        options,
        Box::new(move |_cc| Ok(Box::new(HokiApp::new(AppState::new(settings))))),
    )
}
