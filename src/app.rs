use eframe::egui;

use crate::state::{AppState, View};
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct HokiApp {
    pub state: AppState,
    pub heatmap: plot::HeatmapCache,
}

impl HokiApp {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            heatmap: plot::HeatmapCache::default(),
        }
    }
}

impl eframe::App for HokiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: age, abundance, sources ----
        egui::SidePanel::left("control_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: plot ----
        egui::CentralPanel::default().show(ctx, |ui| match self.state.view {
            View::Diagram => plot::diagram_plot(ui, &self.state, &mut self.heatmap),
            View::AgePdfs => plot::pdf_plot(ui, &self.state),
            View::Spectra => plot::spectra_plot(ui, &self.state),
            View::Sources => panels::sources_table(ui, &mut self.state),
        });
    }
}
