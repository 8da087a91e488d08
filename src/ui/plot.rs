use std::ops::RangeInclusive;

use chrono::{Datelike, NaiveDate};
use eframe::egui::{self, Align2, Color32, RichText, Stroke, Ui};
use egui_plot::{
    Bar, BarChart, GridMark, HLine, Legend, Line, LineStyle, Plot, PlotPoint, PlotPoints, Points,
    Polygon, Text,
};

use crate::analysis::{round2, CorrelationMatrix, GroupedSeries};
use crate::color::{contrasting_text, viridis, ColorMap};
use crate::format;
use crate::state::AppState;

const LINE_COLOR: Color32 = Color32::from_rgb(60, 179, 113);
const MEAN_COLOR: Color32 = Color32::from_rgb(220, 38, 38);
const BAR_COLOR: Color32 = Color32::from_rgb(135, 206, 235);
const CHART_HEIGHT: f32 = 320.0;

// ---------------------------------------------------------------------------
// Axis helpers
// ---------------------------------------------------------------------------

fn date_to_x(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce())
}

fn date_axis(mark: GridMark, _range: &RangeInclusive<f64>) -> String {
    let v = mark.value;
    if (v - v.round()).abs() > 1e-6 {
        return String::new();
    }
    NaiveDate::from_num_days_from_ce_opt(v.round() as i32)
        .map(|d| d.format("%b %d").to_string())
        .unwrap_or_default()
}

/// Labels integer grid marks with category names.
fn category_axis(names: Vec<String>) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String {
    move |mark: GridMark, _range: &RangeInclusive<f64>| {
        let v = mark.value;
        if v < -0.5 || (v - v.round()).abs() > 1e-6 {
            return String::new();
        }
        names.get(v.round() as usize).cloned().unwrap_or_default()
    }
}

fn empty_notice(ui: &mut Ui) {
    ui.label(RichText::new("No records match the current filters.").italics());
}

// ---------------------------------------------------------------------------
// Sales tab
// ---------------------------------------------------------------------------

/// Daily totals, sales by city and payment, gross income by gender.
pub fn sales_tab(ui: &mut Ui, state: &AppState) {
    ui.heading("Total Sales Analysis 📈");
    ui.label(RichText::new("Daily total sales").strong());
    daily_totals_chart(ui, state);

    ui.add_space(8.0);
    ui.columns(2, |cols: &mut [Ui]| {
        cols[0].label(RichText::new("Total sales by city and payment method").strong());
        grouped_bar_chart(
            &mut cols[0],
            "city_payment_totals",
            &state.view.city_payment_totals,
            &state.payment_colors,
            "Total sales (USD)",
        );
        cols[1].label(RichText::new("Gross income by gender and product line").strong());
        stacked_bar_chart(
            &mut cols[1],
            "gender_product_income",
            &state.view.gender_product_income,
            &state.product_colors,
            "Gross income",
        );
    });
}

fn daily_totals_chart(ui: &mut Ui, state: &AppState) {
    let daily = &state.view.daily;
    if daily.points.is_empty() {
        empty_notice(ui);
        return;
    }

    let coords: Vec<[f64; 2]> = daily
        .points
        .iter()
        .map(|&(d, total)| [date_to_x(d), total])
        .collect();

    Plot::new("daily_totals")
        .height(CHART_HEIGHT)
        .x_axis_label("Date")
        .y_axis_label("Total sales (USD)")
        .x_axis_formatter(date_axis)
        .include_y(0.0)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.line(
                Line::new(PlotPoints::from(coords.clone()))
                    .color(LINE_COLOR)
                    .width(2.0)
                    .name("Daily total"),
            );
            plot_ui.points(Points::new(PlotPoints::from(coords)).color(LINE_COLOR).radius(3.0));

            if let (Some(mean), Some(median)) = (daily.mean, daily.median_date) {
                plot_ui.hline(
                    HLine::new(mean)
                        .color(MEAN_COLOR)
                        .width(2.0)
                        .style(LineStyle::dashed_loose()),
                );
                plot_ui.text(
                    Text::new(
                        PlotPoint::new(date_to_x(median), mean),
                        RichText::new(format!("Mean: {mean:.1}")).color(MEAN_COLOR),
                    )
                    .anchor(Align2::LEFT_BOTTOM),
                );
            }
        });
}

/// Side-by-side bars: one group per category, one bar per series.
fn grouped_bar_chart(
    ui: &mut Ui,
    id: &str,
    data: &GroupedSeries,
    colors: &ColorMap,
    y_label: &str,
) {
    if data.categories.is_empty() {
        empty_notice(ui);
        return;
    }

    let n_series = data.series.len().max(1) as f64;
    let width = 0.8 / n_series;

    Plot::new(id)
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .y_axis_label(y_label)
        .x_axis_formatter(category_axis(data.categories.clone()))
        .include_y(0.0)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for (k, series) in data.series.iter().enumerate() {
                let offset = (k as f64 - (n_series - 1.0) / 2.0) * width;
                let bars: Vec<Bar> = series
                    .values
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| Bar::new(i as f64 + offset, v).width(width * 0.95))
                    .collect();
                for (i, &v) in series.values.iter().enumerate() {
                    if v > 0.0 {
                        plot_ui.text(
                            Text::new(PlotPoint::new(i as f64 + offset, v), format!("{v:.2}"))
                                .anchor(Align2::CENTER_BOTTOM),
                        );
                    }
                }
                plot_ui.bar_chart(
                    BarChart::new(bars)
                        .name(&series.name)
                        .color(colors.color_for(&series.name))
                        .element_formatter(Box::new(|bar, _chart| format!("{:.2}", bar.value))),
                );
            }
        });
}

/// Bars stacked per category, one segment per series.
fn stacked_bar_chart(
    ui: &mut Ui,
    id: &str,
    data: &GroupedSeries,
    colors: &ColorMap,
    y_label: &str,
) {
    if data.categories.is_empty() {
        empty_notice(ui);
        return;
    }

    let mut charts: Vec<BarChart> = Vec::with_capacity(data.series.len());
    for series in &data.series {
        let bars: Vec<Bar> = series
            .values
            .iter()
            .enumerate()
            .map(|(i, &v)| Bar::new(i as f64, v).width(0.6))
            .collect();
        let chart = {
            let below: Vec<&BarChart> = charts.iter().collect();
            BarChart::new(bars)
                .name(&series.name)
                .color(colors.color_for(&series.name))
                .stack_on(&below)
        };
        charts.push(chart);
    }

    Plot::new(id)
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .y_axis_label(y_label)
        .x_axis_formatter(category_axis(data.categories.clone()))
        .include_y(0.0)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for chart in charts {
                plot_ui.bar_chart(chart);
            }
        });
}

// ---------------------------------------------------------------------------
// Products tab
// ---------------------------------------------------------------------------

/// Product-line counts, gross income per product line, correlation heatmap.
pub fn products_tab(ui: &mut Ui, state: &AppState) {
    ui.heading("Product Analysis 📦");
    ui.label(RichText::new("Records per product line").strong());

    if state.view.product_counts.is_empty() {
        empty_notice(ui);
    } else {
        egui::Grid::new("product_counts")
            .striped(true)
            .num_columns(2)
            .show(ui, |ui: &mut Ui| {
                ui.strong("Product line");
                ui.strong("Count");
                ui.end_row();
                for (name, n) in &state.view.product_counts {
                    ui.label(name);
                    ui.label(format::count(*n));
                    ui.end_row();
                }
            });
    }

    ui.add_space(8.0);
    ui.label(RichText::new("Gross income by product line").strong());
    product_income_chart(ui, state);

    ui.add_space(8.0);
    ui.label(RichText::new("Correlation between numeric variables").strong());
    correlation_heatmap(ui, state);
}

fn product_income_chart(ui: &mut Ui, state: &AppState) {
    let income = &state.view.product_income;
    if income.is_empty() {
        empty_notice(ui);
        return;
    }
    let names: Vec<String> = income.iter().map(|(n, _)| n.clone()).collect();
    let bars: Vec<Bar> = income
        .iter()
        .enumerate()
        .map(|(i, (name, v))| Bar::new(i as f64, *v).width(0.6).name(name))
        .collect();

    Plot::new("product_income")
        .height(CHART_HEIGHT)
        .y_axis_label("Gross income")
        .x_axis_formatter(category_axis(names))
        .include_y(0.0)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).color(BAR_COLOR).name("Gross income"));
        });
}

/// Plot position and coefficient of every drawable heatmap cell. Row 0 sits
/// at the top; undefined coefficients are left out so their cells stay blank.
fn heatmap_cells(corr: &CorrelationMatrix) -> Vec<(f64, f64, f64)> {
    let n = corr.columns.len();
    (0..n)
        .flat_map(|i| (0..n).map(move |j| (i, j)))
        .filter_map(|(i, j)| {
            let r = corr.get(i, j);
            (!r.is_nan()).then(|| (j as f64, (n - 1 - i) as f64, r))
        })
        .collect()
}

fn correlation_heatmap(ui: &mut Ui, state: &AppState) {
    let Some(corr) = &state.correlation else {
        return;
    };
    let names: Vec<String> = corr.columns.iter().map(|c| c.to_string()).collect();
    let row_names: Vec<String> = names.iter().rev().cloned().collect();
    let cells = heatmap_cells(corr);

    Plot::new("correlation_heatmap")
        .height(CHART_HEIGHT + 120.0)
        .data_aspect(1.0)
        .show_grid(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .x_axis_formatter(category_axis(names))
        .y_axis_formatter(category_axis(row_names))
        .show(ui, |plot_ui| {
            for &(x, y, r) in &cells {
                let fill = viridis((r + 1.0) / 2.0);
                let cell = vec![
                    [x - 0.5, y - 0.5],
                    [x + 0.5, y - 0.5],
                    [x + 0.5, y + 0.5],
                    [x - 0.5, y + 0.5],
                ];
                plot_ui.polygon(
                    Polygon::new(PlotPoints::from(cell))
                        .fill_color(fill)
                        .stroke(Stroke::new(0.6, Color32::WHITE)),
                );
                plot_ui.text(
                    Text::new(
                        PlotPoint::new(x, y),
                        RichText::new(format!("{:.2}", round2(r))).color(contrasting_text(fill)),
                    )
                    .anchor(Align2::CENTER_CENTER),
                );
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::NumericColumn;

    #[test]
    fn undefined_correlations_are_not_drawn() {
        let corr = CorrelationMatrix {
            columns: vec![NumericColumn::Total, NumericColumn::Rating],
            values: vec![vec![1.0, f64::NAN], vec![f64::NAN, f64::NAN]],
        };
        let cells = heatmap_cells(&corr);
        // Only the top-left coefficient is defined.
        assert_eq!(cells, [(0.0, 1.0, 1.0)]);
    }

    #[test]
    fn heatmap_puts_first_row_on_top() {
        let corr = CorrelationMatrix {
            columns: vec![NumericColumn::Total, NumericColumn::Rating],
            values: vec![vec![1.0, 0.25], vec![0.25, 1.0]],
        };
        let cells = heatmap_cells(&corr);
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[1], (1.0, 1.0, 0.25));
        assert_eq!(cells[2], (0.0, 0.0, 0.25));
    }
}
