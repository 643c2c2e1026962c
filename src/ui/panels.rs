use std::path::PathBuf;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use hoki::cmd::Cmd;
use hoki::color::{ColorMap, ColorScale};
use hoki::data::{loader, observations};
use hoki::hrdiagrams::{Abundance, HrType};
use hoki::render::{self, FigureOptions};

use crate::state::{AppState, LoadedDiagram, View};

// ---------------------------------------------------------------------------
// Left side panel – age, diagram and source controls
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading("Age");
            ui.separator();
            let slider = egui::Slider::new(&mut state.log_age, 6.0..=11.0)
                .step_by(0.1)
                .text("log(age/yr)");
            if ui.add(slider).changed() {
                state.touch();
            }

            ui.add_space(8.0);
            ui.heading("Diagram");
            ui.separator();
            diagram_controls(ui, state);

            ui.add_space(8.0);
            ui.heading("Sources");
            ui.separator();
            source_checkboxes(ui, state);
        });
}

fn diagram_controls(ui: &mut Ui, state: &mut AppState) {
    let mut changed = false;

    ui.strong("HR diagram type (for opening)");
    egui::ComboBox::from_id_salt("hr_type")
        .selected_text(state.hr_type.to_string())
        .show_ui(ui, |ui: &mut Ui| {
            for t in HrType::ALL {
                ui.selectable_value(&mut state.hr_type, t, t.to_string());
            }
        });

    if matches!(state.diagram, Some(LoadedDiagram::Hrd(_))) {
        ui.strong("Abundance");
        egui::ComboBox::from_id_salt("abundance")
            .selected_text(state.abundance.to_string())
            .show_ui(ui, |ui: &mut Ui| {
                for a in Abundance::ALL {
                    changed |= ui
                        .selectable_value(&mut state.abundance, a, a.to_string())
                        .changed();
                }
            });

        changed |= ui
            .checkbox(&mut state.stack_enabled, "Stack over age range")
            .changed();
        ui.add_enabled_ui(state.stack_enabled, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                let (lo, hi) = &mut state.stack_range;
                changed |= ui.add(log_age_drag(lo)).changed();
                ui.label("to");
                changed |= ui.add(log_age_drag(hi)).changed();
            });
        });
    }

    ui.strong("Colour");
    ui.horizontal(|ui: &mut Ui| {
        for scale in [ColorScale::Linear, ColorScale::Log10] {
            changed |= ui
                .selectable_value(&mut state.color_scale, scale, scale.to_string())
                .changed();
        }
    });
    ui.horizontal(|ui: &mut Ui| {
        for cmap in ColorMap::ALL {
            changed |= ui
                .selectable_value(&mut state.color_map, cmap, cmap.to_string())
                .changed();
        }
    });

    ui.strong("CMD filters");
    ui.horizontal(|ui: &mut Ui| {
        ui.label("mag");
        ui.add(egui::TextEdit::singleline(&mut state.cmd_mag_filter).desired_width(40.0));
        ui.label("col");
        ui.add(egui::TextEdit::singleline(&mut state.cmd_col_filters.0).desired_width(40.0));
        ui.label("−");
        ui.add(egui::TextEdit::singleline(&mut state.cmd_col_filters.1).desired_width(40.0));
    });

    if changed {
        state.touch();
    }
}

fn log_age_drag(value: &mut f64) -> egui::DragValue<'_> {
    egui::DragValue::new(value).speed(0.1).range(6.0..=11.1)
}

fn source_checkboxes(ui: &mut Ui, state: &mut AppState) {
    let Some(wizard) = &state.wizard else {
        ui.label("No observations fitted.");
        return;
    };

    // Clone what we need so we can mutate state inside the loop.
    let sources = wizard.sources().to_vec();
    let ages = wizard.most_likely_ages();

    for (name, age) in sources.iter().zip(ages) {
        let mut text = RichText::new(format!("{name}  ({age:.1})"));
        if let Some(colors) = &state.source_colors {
            text = text.color(colors.color_for(name));
        }
        let mut included = !state.excluded.contains(name);
        if ui.checkbox(&mut included, text).changed() {
            state.toggle_source(name);
        }
    }

    if let Some(wizard) = &mut state.wizard {
        let best = wizard.most_likely_age();
        if !best.is_empty() {
            let ages: Vec<String> = best.iter().map(|a| format!("{a:.1}")).collect();
            ui.separator();
            ui.label(format!("Most likely log(age): {}", ages.join(", ")));
        }
    }
}

// ---------------------------------------------------------------------------
// Sources table (central panel)
// ---------------------------------------------------------------------------

/// Table of the fitted sources.
pub fn sources_table(ui: &mut Ui, state: &mut AppState) {
    let Some(wizard) = &state.wizard else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Load a diagram and observations to fit ages");
        });
        return;
    };

    let sources = wizard.sources().to_vec();
    let coordinates = wizard.coordinates.clone();
    let ages = wizard.most_likely_ages();
    let p_range = wizard.calculate_p_given_age_range(state.stack_range);
    let mut toggled: Option<String> = None;

    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto())
        .column(Column::auto().at_least(120.0))
        .column(Column::auto())
        .column(Column::auto())
        .column(Column::remainder())
        .header(20.0, |mut header| {
            for title in ["Use", "Source", "Grid cell", "log(age)", "P(in stack range)"] {
                header.col(|ui: &mut Ui| {
                    ui.strong(title);
                });
            }
        })
        .body(|mut body| {
            for (i, name) in sources.iter().enumerate() {
                body.row(18.0, |mut row| {
                    row.col(|ui: &mut Ui| {
                        let mut included = !state.excluded.contains(name);
                        if ui.checkbox(&mut included, "").changed() {
                            toggled = Some(name.clone());
                        }
                    });
                    row.col(|ui: &mut Ui| {
                        ui.label(name);
                    });
                    row.col(|ui: &mut Ui| match coordinates[i] {
                        Some((x, y)) => {
                            ui.label(format!("({x}, {y})"));
                        }
                        None => {
                            ui.label(RichText::new("no match").color(Color32::YELLOW));
                        }
                    });
                    row.col(|ui: &mut Ui| {
                        ui.label(format!("{:.1}", ages[i]));
                    });
                    row.col(|ui: &mut Ui| {
                        ui.label(format!("{:.3}", p_range[i]));
                    });
                });
            }
        });

    if let Some(name) = toggled {
        state.toggle_source(&name);
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open HR diagram…").clicked() {
                open_hr_diagram_dialog(state);
                ui.close_menu();
            }
            if ui.button("Open CMD…").clicked() {
                open_cmd_dialog(state);
                ui.close_menu();
            }
            if ui.button("Open spectra…").clicked() {
                open_spectra_dialog(state);
                ui.close_menu();
            }
            if ui.button("Open observations…").clicked() {
                open_observations_dialog(state);
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Build CMD from models…").clicked() {
                build_cmd_dialog(state);
                ui.close_menu();
            }
            if ui.button("Save CMD…").clicked() {
                save_cmd_dialog(state);
                ui.close_menu();
            }
            if ui.button("Export figure…").clicked() {
                export_figure_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        for view in View::ALL {
            if ui.selectable_label(state.view == view, view.label()).clicked() {
                state.view = view;
            }
        }

        ui.separator();

        if let Some(obs) = &state.observations {
            ui.label(format!(
                "{} sources, {} excluded",
                obs.len(),
                state.excluded.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

fn report_error(state: &mut AppState, what: &str, e: anyhow::Error) {
    log::error!("Failed to {what}: {e:#}");
    state.status_message = Some(format!("Error: {e:#}"));
}

fn pick_file(title: &str, filters: &[(&str, &[&str])]) -> Option<PathBuf> {
    filters
        .iter()
        .fold(rfd::FileDialog::new().set_title(title), |dialog, (name, exts)| {
            dialog.add_filter(*name, *exts)
        })
        .pick_file()
}

pub fn open_hr_diagram_dialog(state: &mut AppState) {
    let Some(path) = pick_file("Open BPASS HR diagram", &[("BPASS output", &["dat", "DAT"])])
    else {
        return;
    };
    match loader::hr_diagram(&path, state.hr_type) {
        Ok(hrd) => state.set_diagram(LoadedDiagram::Hrd(hrd)),
        Err(e) => report_error(state, "load HR diagram", e),
    }
}

pub fn open_cmd_dialog(state: &mut AppState) {
    let Some(path) = pick_file("Open saved CMD", &[("CMD", &["json"])]) else {
        return;
    };
    match Cmd::load(&path) {
        Ok(cmd) => {
            log::info!("Loaded CMD from {}", path.display());
            state.set_diagram(LoadedDiagram::Cmd(cmd));
        }
        Err(e) => report_error(state, "load CMD", e.into()),
    }
}

pub fn open_spectra_dialog(state: &mut AppState) {
    let Some(path) = pick_file("Open BPASS spectra", &[("BPASS output", &["dat", "DAT"])])
    else {
        return;
    };
    match loader::spectra(&path) {
        Ok(spectra) => state.set_spectra(spectra),
        Err(e) => report_error(state, "load spectra", e),
    }
}

pub fn open_observations_dialog(state: &mut AppState) {
    let Some(path) = pick_file(
        "Open observations",
        &[
            ("Supported files", &["csv", "json", "parquet", "pq"]),
            ("CSV", &["csv"]),
            ("JSON", &["json"]),
            ("Parquet", &["parquet", "pq"]),
        ],
    ) else {
        return;
    };
    match observations::load_observations(&path) {
        Ok(table) => state.set_observations(table),
        Err(e) => report_error(state, "load observations", e),
    }
}

pub fn build_cmd_dialog(state: &mut AppState) {
    let Some(input) = rfd::FileDialog::new()
        .set_title("Open BPASS model input file")
        .pick_file()
    else {
        return;
    };
    let models_dir = match &state.settings.models_path {
        Some(dir) => dir.clone(),
        None => match rfd::FileDialog::new()
            .set_title("BPASS stellar models directory")
            .pick_folder()
        {
            Some(dir) => dir,
            None => return,
        },
    };

    let inputs = match loader::model_input(&input) {
        Ok(inputs) => inputs,
        Err(e) => return report_error(state, "read model input", e),
    };

    let mut cmd = state.settings.empty_cmd();
    let col = (state.cmd_col_filters.0.as_str(), state.cmd_col_filters.1.as_str());
    match cmd.make(&inputs, &models_dir, &state.cmd_mag_filter, col) {
        Ok(()) => {
            if !cmd.missing_files.is_empty() {
                state.status_message = Some(format!(
                    "{} model files could not be read",
                    cmd.missing_files.len()
                ));
            }
            let message = state.status_message.take();
            state.set_diagram(LoadedDiagram::Cmd(cmd));
            state.status_message = message;
        }
        Err(e) => report_error(state, "build CMD", e.into()),
    }
}

pub fn save_cmd_dialog(state: &mut AppState) {
    let Some(LoadedDiagram::Cmd(cmd)) = &state.diagram else {
        state.status_message = Some("No CMD loaded".to_string());
        return;
    };
    let Some(path) = rfd::FileDialog::new()
        .set_title("Save CMD")
        .add_filter("CMD", &["json"])
        .save_file()
    else {
        return;
    };
    if let Err(e) = cmd.save(&path) {
        report_error(state, "save CMD", e.into());
    }
}

pub fn export_figure_dialog(state: &mut AppState) {
    let Some(path) = rfd::FileDialog::new()
        .set_title("Export figure")
        .add_filter("PNG", &["png"])
        .save_file()
    else {
        return;
    };
    let opts = FigureOptions {
        cmap: state.color_map,
        scale: state.color_scale,
        ..FigureOptions::default()
    };

    let result = match &state.diagram {
        Some(LoadedDiagram::Hrd(_)) => match state.displayed_grid() {
            Some(grid) => render::save_png(&render::hrd_image(grid.view(), &opts), &path),
            None => return,
        },
        Some(LoadedDiagram::Cmd(cmd)) => render::plot_cmd(cmd, state.log_age, &path, &opts),
        None => {
            state.status_message = Some("Nothing to export".to_string());
            return;
        }
    };
    if let Err(e) = result {
        report_error(state, "export figure", e.into());
    }
}
