use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::data::filter::options;
use crate::data::model::Dimension;
use crate::format;
use crate::state::{AppState, Tab};

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("🔍 Filters");
    ui.separator();

    let Some(dataset) = state.dataset.clone() else {
        ui.label("No dataset loaded.");
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Date range ----
            ui.strong("📅 Date range");
            let mut changed = false;
            if dataset.date_bounds.is_none() {
                ui.label(RichText::new("No dated records").weak());
            } else if let Some(filters) = &mut state.filters {
                ui.horizontal(|ui: &mut Ui| {
                    ui.label("From");
                    changed |= ui
                        .add(DatePickerButton::new(&mut filters.start).id_salt("date_from"))
                        .changed();
                });
                ui.horizontal(|ui: &mut Ui| {
                    ui.label("To");
                    changed |= ui
                        .add(DatePickerButton::new(&mut filters.end).id_salt("date_to"))
                        .changed();
                });
            }
            if changed {
                state.refilter();
            }
            ui.separator();

            // ---- Per-dimension multi-selects (collapsible) ----
            ui.strong("Categories 🗃️");
            for dim in Dimension::ALL {
                let all_values = options(&dataset, dim);
                let n_selected = state
                    .filters
                    .as_ref()
                    .map_or(0, |f| f.selected_count(dim));
                let header_text = format!("{dim}  ({n_selected}/{})", all_values.len());

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(dim.column_name())
                    .default_open(false)
                    .show(ui, |ui: &mut Ui| {
                        ui.horizontal(|ui: &mut Ui| {
                            if ui.small_button("All").clicked() {
                                state.select_all(dim);
                            }
                            if ui.small_button("None").clicked() {
                                state.select_none(dim);
                            }
                        });

                        for val in &all_values {
                            let mut checked = state
                                .filters
                                .as_ref()
                                .is_some_and(|f| f.is_selected(dim, val));

                            let mut text = RichText::new(val);
                            match dim {
                                Dimension::Payment => {
                                    text = text.color(state.payment_colors.color_for(val));
                                }
                                Dimension::ProductLine => {
                                    text = text.color(state.product_colors.color_for(val));
                                }
                                _ => {}
                            }

                            if ui.checkbox(&mut checked, text).changed() {
                                state.toggle_filter_value(dim, val);
                            }
                        }
                    });
            }

            ui.separator();
            if ui.button("Reset filters").clicked() {
                state.reset_filters();
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Reload").clicked() {
                state.reload();
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            ui.label(format!(
                "{} records loaded, {} selected",
                format::count(ds.len()),
                format::count(state.visible_indices.len())
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Header – dataset info and key indicators
// ---------------------------------------------------------------------------

fn metric_tile(ui: &mut Ui, title: &str, value: String, caption: Option<&str>) {
    ui.group(|ui: &mut Ui| {
        ui.set_min_width(ui.available_width());
        ui.label(RichText::new(title).small());
        ui.label(RichText::new(value).size(22.0).strong());
        if let Some(caption) = caption {
            ui.label(RichText::new(caption).small().weak());
        }
    });
}

/// Render the dataset info and key indicator tiles.
pub fn header(ui: &mut Ui, state: &AppState) {
    ui.heading("Sales Analysis Dashboard 💲🏷️");
    ui.separator();

    let (Some(ds), Some(metrics)) = (&state.dataset, &state.view.metrics) else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a sales file to start  (File → Open…)");
        });
        return;
    };

    ui.label(RichText::new("Dataset information 📊").strong());
    let (first, last) = match ds.date_bounds {
        Some((lo, hi)) => (lo.to_string(), hi.to_string()),
        None => ("–".to_string(), "–".to_string()),
    };
    ui.columns(3, |cols: &mut [Ui]| {
        metric_tile(&mut cols[0], "Start date 📆", first, None);
        metric_tile(&mut cols[1], "End date 📆", last, None);
        metric_tile(
            &mut cols[2],
            "Total transactions 🧾",
            format::count(metrics.transactions),
            None,
        );
    });

    ui.add_space(4.0);
    ui.label(RichText::new("Key indicators 🔥").strong());
    ui.columns(3, |cols: &mut [Ui]| {
        metric_tile(
            &mut cols[0],
            "Total sales 🚀",
            format!("${}", format::thousands(metrics.total_sales, 1)),
            Some("Sum of sales in the filtered period, for overall revenue."),
        );
        metric_tile(
            &mut cols[1],
            "Average rating ⭐",
            metrics
                .mean_rating
                .map_or_else(|| "–".to_string(), |r| format!("{r:.1}")),
            Some("Mean customer rating of the filtered transactions."),
        );
        metric_tile(
            &mut cols[2],
            "Total gross income 📈",
            format::thousands(metrics.gross_income, 1),
            Some("Sum of gross income, for overall profitability."),
        );
    });
    ui.separator();
}

/// Tab selector for the central panel.
pub fn tab_bar(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.selectable_value(&mut state.active_tab, Tab::Sales, "📈 Sales");
        ui.selectable_value(&mut state.active_tab, Tab::Products, "📦 Products");
        ui.selectable_value(&mut state.active_tab, Tab::Scatter3d, "🔎 3D Data");
    });
    ui.separator();
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open sales data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.load_path(&path);
    }
}
