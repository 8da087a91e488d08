use eframe::egui::{self, ScrollArea, Ui};

use crate::config::DashboardConfig;
use crate::state::{AppState, Tab};
use crate::ui::{panels, plot, scatter};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct SalesDashboardApp {
    pub state: AppState,
}

impl SalesDashboardApp {
    /// Build the app and open the configured data file if it exists.
    pub fn new(config: DashboardConfig) -> Self {
        let data_path = config.data_path.clone();
        let mut state = AppState::new(config);
        if data_path.exists() {
            state.load_path(&data_path);
        } else {
            log::warn!(
                "Default data file {} not found; use File → Open…",
                data_path.display()
            );
        }
        Self { state }
    }
}

impl eframe::App for SalesDashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: metrics + tabs ----
        egui::CentralPanel::default().show(ctx, |ui| {
            ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui: &mut Ui| {
                    panels::header(ui, &self.state);
                    if self.state.dataset.is_none() {
                        return;
                    }
                    panels::tab_bar(ui, &mut self.state);
                    match self.state.active_tab {
                        Tab::Sales => plot::sales_tab(ui, &self.state),
                        Tab::Products => plot::products_tab(ui, &self.state),
                        Tab::Scatter3d => scatter::scatter_tab(ui, &mut self.state),
                    }
                });
        });
    }
}
