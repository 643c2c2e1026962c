use eframe::egui::{self, Color32, ColorImage, TextureHandle, TextureOptions, Ui};
use egui_plot::{Legend, Line, Plot, PlotImage, PlotPoint, PlotPoints, Points};

use hoki::constants::time_bin_index;
use hoki::render::{heatmap_image, FigureOptions};

use crate::state::{AppState, LoadedDiagram};

// ---------------------------------------------------------------------------
// Heatmap texture cache
// ---------------------------------------------------------------------------

/// GPU texture of the current diagram, rebuilt when the state generation moves.
#[derive(Default)]
pub struct HeatmapCache {
    generation: Option<u64>,
    texture: Option<TextureHandle>,
}

impl HeatmapCache {
    fn refresh(&mut self, ctx: &egui::Context, state: &AppState) {
        if self.generation == Some(state.generation) {
            return;
        }
        self.generation = Some(state.generation);
        self.texture = state.displayed_grid().map(|grid| {
            let opts = FigureOptions {
                cmap: state.color_map,
                scale: state.color_scale,
                pixel_size: 1,
                ..FigureOptions::default()
            };
            let img = heatmap_image(grid.view(), &opts, false, false);
            let size = [img.width() as usize, img.height() as usize];
            let image = ColorImage::from_rgb(size, img.as_raw());
            ctx.load_texture("diagram", image, TextureOptions::NEAREST)
        });
    }
}

fn placeholder(ui: &mut Ui, text: &str) {
    ui.centered_and_justified(|ui: &mut Ui| {
        ui.heading(text);
    });
}

// ---------------------------------------------------------------------------
// Diagram heatmap with observed sources
// ---------------------------------------------------------------------------

/// Render the HR diagram or CMD with the observations on top.
pub fn diagram_plot(ui: &mut Ui, state: &AppState, cache: &mut HeatmapCache) {
    let Some(diagram) = &state.diagram else {
        placeholder(ui, "Open an HR diagram or CMD  (File → Open…)");
        return;
    };

    let [c1, c2] = diagram.as_model().coordinate_columns();
    let (x_axis, y_axis, x_label, y_label, x_col, y_col) = match diagram {
        LoadedDiagram::Hrd(hrd) => (
            &hrd.t_coord,
            &hrd.l_coord,
            "log(T/K)".to_string(),
            hrd.hr_type.y_label().to_string(),
            c1,
            c2,
        ),
        LoadedDiagram::Cmd(cmd) => {
            let (colour, mag) = cmd
                .filters
                .as_ref()
                .map(|f| (f.colour_label(), f.mag.clone()))
                .unwrap_or_else(|| ("colour".to_string(), "magnitude".to_string()));
            // CMD grids are [mag, col]; colour goes along x
            (&cmd.col_range, &cmd.mag_range, colour, mag, c2, c1)
        }
    };

    cache.refresh(ui.ctx(), state);

    Plot::new("diagram_plot")
        .legend(Legend::default())
        .x_axis_label(x_label)
        .y_axis_label(y_label)
        .data_aspect(1.0)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            if let (Some(texture), Some((centre, size))) = (&cache.texture, extent(x_axis, y_axis))
            {
                plot_ui.image(PlotImage::new(texture.id(), centre, size));
            }

            let (Some(obs), Some(wizard)) = (&state.observations, &state.wizard) else {
                return;
            };
            for (row, name) in wizard.sources().iter().enumerate() {
                let (Some(x), Some(y)) = (
                    obs.value(row, x_col).as_f64(),
                    obs.value(row, y_col).as_f64(),
                ) else {
                    continue;
                };
                let color = state
                    .source_colors
                    .as_ref()
                    .map(|c| c.color_for(name))
                    .unwrap_or(Color32::RED);
                plot_ui.points(
                    Points::new(vec![[x, y]])
                        .radius(4.0)
                        .color(color)
                        .name(name),
                );
            }
        });
}

/// Centre and size of the grid in plot coordinates.
fn extent(x_axis: &[f64], y_axis: &[f64]) -> Option<(PlotPoint, [f32; 2])> {
    let span = |axis: &[f64]| -> Option<(f64, f64)> {
        let (first, last) = (*axis.first()?, *axis.last()?);
        let step = if axis.len() > 1 {
            (last - first) / (axis.len() - 1) as f64
        } else {
            1.0
        };
        Some(((first + last) / 2.0, step * axis.len() as f64))
    };
    let (cx, w) = span(x_axis)?;
    let (cy, h) = span(y_axis)?;
    Some((PlotPoint::new(cx, cy), [w as f32, h as f32]))
}

// ---------------------------------------------------------------------------
// Age probability distributions
// ---------------------------------------------------------------------------

/// One line per source plus the combined distribution.
pub fn pdf_plot(ui: &mut Ui, state: &AppState) {
    let Some(wizard) = &state.wizard else {
        placeholder(ui, "Load a diagram and observations to fit ages");
        return;
    };

    Plot::new("pdf_plot")
        .legend(Legend::default())
        .x_axis_label("log(age/yr)")
        .y_axis_label("probability")
        .show(ui, |plot_ui| {
            let t = &wizard.pdfs.time_bins;
            for (name, column) in wizard.sources().iter().zip(wizard.pdfs.values.columns()) {
                let mut color = state
                    .source_colors
                    .as_ref()
                    .map(|c| c.color_for(name))
                    .unwrap_or(Color32::LIGHT_BLUE);
                if state.excluded.contains(name) {
                    color = color.gamma_multiply(0.3);
                }
                let points: PlotPoints = t.iter().zip(column).map(|(&x, &y)| [x, y]).collect();
                plot_ui.line(Line::new(points).name(name).color(color).width(1.5));
            }

            if let Some(combined) = &wizard.multiplied_pdf {
                let points: PlotPoints = t.iter().zip(combined).map(|(&x, &y)| [x, y]).collect();
                plot_ui.line(
                    Line::new(points)
                        .name("combined")
                        .color(Color32::WHITE)
                        .width(3.0),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Spectra
// ---------------------------------------------------------------------------

/// The spectrum at the selected age on log-log axes.
pub fn spectra_plot(ui: &mut Ui, state: &AppState) {
    let Some(spectra) = &state.spectra else {
        placeholder(ui, "Open a BPASS spectra file  (File → Open spectra…)");
        return;
    };

    let bin = time_bin_index(state.log_age);
    let points: PlotPoints = spectra
        .wavelength
        .iter()
        .zip(spectra.at_bin(bin))
        .filter(|(&wl, &lum)| wl > 0.0 && lum > 0.0)
        .map(|(&wl, &lum)| [wl.log10(), lum.log10()])
        .collect();

    Plot::new("spectra_plot")
        .legend(Legend::default())
        .x_axis_label("log(λ/Å)")
        .y_axis_label("log(L/Lsun/Å)")
        .show(ui, |plot_ui| {
            let name = format!("log(age) = {:.1}", hoki::constants::time_bins()[bin]);
            plot_ui.line(Line::new(points).name(name).color(Color32::LIGHT_BLUE).width(1.5));
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_covers_whole_bins() {
        let (centre, size) = extent(&[0.0, 1.0, 2.0], &[10.0, 20.0]).unwrap();
        assert_eq!((centre.x, centre.y), (1.0, 15.0));
        assert_eq!(size, [3.0, 20.0]);
        assert!(extent(&[], &[1.0]).is_none());
    }
}
