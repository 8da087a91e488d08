use eframe::egui::{self, Align2, Color32, RichText, Ui};
use egui_plot::{Line, Plot, PlotPoint, PlotPoints, Points, Text};

use crate::analysis::{choose_scatter_axes, scatter_points};
use crate::color::viridis;
use crate::data::model::NumericColumn;
use crate::state::AppState;

/// Number of colour buckets the Z scale is split into.
const COLOR_STEPS: usize = 16;

// ---------------------------------------------------------------------------
// Orthographic projection
// ---------------------------------------------------------------------------

/// Scale each coordinate to `-1..=1` using the per-axis range of `points`.
/// Constant axes collapse to 0.
pub fn normalize(points: &[[f64; 3]]) -> Vec<[f64; 3]> {
    let mut lo = [f64::INFINITY; 3];
    let mut hi = [f64::NEG_INFINITY; 3];
    for p in points {
        for k in 0..3 {
            lo[k] = lo[k].min(p[k]);
            hi[k] = hi[k].max(p[k]);
        }
    }
    points
        .iter()
        .map(|p| {
            let mut out = [0.0; 3];
            for k in 0..3 {
                let span = hi[k] - lo[k];
                out[k] = if span > f64::EPSILON {
                    2.0 * (p[k] - lo[k]) / span - 1.0
                } else {
                    0.0
                };
            }
            out
        })
        .collect()
}

/// Project a point onto the screen plane: rotate by `yaw` around the
/// vertical (Z) axis, then tilt the view by `pitch`. Angles in degrees.
pub fn project(p: [f64; 3], yaw: f64, pitch: f64) -> [f64; 2] {
    let (sy, cy) = yaw.to_radians().sin_cos();
    let (sp, cp) = pitch.to_radians().sin_cos();
    let x = p[0] * cy - p[1] * sy;
    let depth = p[0] * sy + p[1] * cy;
    [x, p[2] * cp + depth * sp]
}

// ---------------------------------------------------------------------------
// 3D tab
// ---------------------------------------------------------------------------

/// Axis pickers and the rotated scatter, or the error when there are not
/// enough numeric columns.
pub fn scatter_tab(ui: &mut Ui, state: &mut AppState) {
    ui.heading("3D Charts 🔎");

    let Some(dataset) = state.dataset.clone() else {
        return;
    };

    let choice = match choose_scatter_axes(
        &dataset.numeric_columns,
        state.scatter.x,
        state.scatter.y,
        state.scatter.z,
    ) {
        Ok(choice) => choice,
        Err(e) => {
            ui.colored_label(Color32::RED, e.to_string());
            return;
        }
    };

    let mut axes = choice.axes;
    ui.horizontal(|ui: &mut Ui| {
        column_picker(ui, "X axis", "scatter_x", &mut axes.x, &choice.x_options);
        column_picker(ui, "Y axis", "scatter_y", &mut axes.y, &choice.y_options);
        column_picker(ui, "Z axis", "scatter_z", &mut axes.z, &choice.z_options);
    });
    // A new X or Y pick may collide with a later axis; resolve again.
    let axes = choose_scatter_axes(
        &dataset.numeric_columns,
        Some(axes.x),
        Some(axes.y),
        Some(axes.z),
    )
    .map(|c| c.axes)
    .unwrap_or(choice.axes);
    state.scatter.x = Some(axes.x);
    state.scatter.y = Some(axes.y);
    state.scatter.z = Some(axes.z);

    ui.horizontal(|ui: &mut Ui| {
        ui.add(egui::Slider::new(&mut state.scatter.yaw, -180.0..=180.0).text("Yaw °"));
        ui.add(egui::Slider::new(&mut state.scatter.pitch, -90.0..=90.0).text("Pitch °"));
    });

    let Some(selection) = state.selection() else {
        return;
    };
    let raw = scatter_points(selection, axes);
    if raw.is_empty() {
        ui.label(RichText::new("No records match the current filters.").italics());
        return;
    }

    let z_range = raw.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        (lo.min(p[2]), hi.max(p[2]))
    });
    ui.label(format!(
        "Colour: {} ({:.2} → {:.2})",
        axes.z, z_range.0, z_range.1
    ));

    let yaw = f64::from(state.scatter.yaw);
    let pitch = f64::from(state.scatter.pitch);

    // Bucket the points by colour so each bucket is one Points item.
    let mut buckets: Vec<Vec<[f64; 2]>> = vec![Vec::new(); COLOR_STEPS];
    for p in normalize(&raw) {
        let t = (p[2] + 1.0) / 2.0;
        let idx = ((t * COLOR_STEPS as f64) as usize).min(COLOR_STEPS - 1);
        buckets[idx].push(project(p, yaw, pitch));
    }

    let corner = [-1.0, -1.0, -1.0];
    let axis_ends = [
        ([1.0, -1.0, -1.0], axes.x),
        ([-1.0, 1.0, -1.0], axes.y),
        ([-1.0, -1.0, 1.0], axes.z),
    ];

    Plot::new("scatter_3d")
        .height(520.0)
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            let origin = project(corner, yaw, pitch);
            for (end, column) in axis_ends {
                let tip = project(end, yaw, pitch);
                plot_ui.line(
                    Line::new(PlotPoints::from(vec![origin, tip]))
                        .color(Color32::GRAY)
                        .width(1.0),
                );
                plot_ui.text(
                    Text::new(PlotPoint::new(tip[0], tip[1]), axis_label(column))
                        .anchor(Align2::LEFT_BOTTOM),
                );
            }

            for (i, pts) in buckets.into_iter().enumerate() {
                if pts.is_empty() {
                    continue;
                }
                let t = (i as f64 + 0.5) / COLOR_STEPS as f64;
                plot_ui.points(
                    Points::new(PlotPoints::from(pts))
                        .color(viridis(t))
                        .radius(3.0),
                );
            }
        });
}

fn axis_label(column: NumericColumn) -> RichText {
    RichText::new(column.to_string()).strong()
}

fn column_picker(
    ui: &mut Ui,
    label: &str,
    id: &str,
    current: &mut NumericColumn,
    options: &[NumericColumn],
) {
    ui.label(label);
    egui::ComboBox::from_id_salt(id)
        .selected_text(current.to_string())
        .show_ui(ui, |ui: &mut Ui| {
            for &col in options {
                ui.selectable_value(current, col, col.to_string());
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f64; 2], b: [f64; 2]) -> bool {
        (a[0] - b[0]).abs() < 1e-9 && (a[1] - b[1]).abs() < 1e-9
    }

    #[test]
    fn front_view_drops_depth() {
        assert!(close(project([0.5, 0.9, -0.25], 0.0, 0.0), [0.5, -0.25]));
    }

    #[test]
    fn quarter_turn_swaps_axes() {
        // After a 90° yaw the Y axis points along screen X (negated).
        assert!(close(project([0.0, 1.0, 0.0], 90.0, 0.0), [-1.0, 0.0]));
        // Looking straight down, depth becomes screen height.
        assert!(close(project([0.0, 1.0, 0.0], 0.0, 90.0), [0.0, 1.0]));
    }

    #[test]
    fn normalize_scales_each_axis() {
        let pts = normalize(&[[0.0, 10.0, 5.0], [4.0, 20.0, 5.0], [2.0, 15.0, 5.0]]);
        assert_eq!(pts[0], [-1.0, -1.0, 0.0]);
        assert_eq!(pts[1], [1.0, 1.0, 0.0]);
        assert_eq!(pts[2], [0.0, 0.0, 0.0]);
    }
}
