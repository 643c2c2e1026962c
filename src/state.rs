use std::collections::BTreeSet;

use ndarray::Array2;

use hoki::age::{AgeModel, AgeWizard};
use hoki::cmd::Cmd;
use hoki::color::{ColorMap, ColorScale, SourceColors};
use hoki::config::Settings;
use hoki::data::model::{ObservationTable, Spectra};
use hoki::hrdiagrams::{Abundance, HrDiagram, HrType};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The model grid shown in the diagram view.
pub enum LoadedDiagram {
    Hrd(HrDiagram),
    Cmd(Cmd),
}

impl LoadedDiagram {
    pub fn as_model(&self) -> &dyn AgeModel {
        match self {
            LoadedDiagram::Hrd(h) => h as &dyn AgeModel,
            LoadedDiagram::Cmd(c) => c as &dyn AgeModel,
        }
    }
}

/// Which plot fills the central panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Diagram,
    AgePdfs,
    Spectra,
    Sources,
}

impl View {
    pub const ALL: [View; 4] = [View::Diagram, View::AgePdfs, View::Spectra, View::Sources];

    pub fn label(self) -> &'static str {
        match self {
            View::Diagram => "Diagram",
            View::AgePdfs => "Age PDFs",
            View::Spectra => "Spectra",
            View::Sources => "Sources",
        }
    }
}

/// The full UI state, independent of rendering.
pub struct AppState {
    pub settings: Settings,

    /// Loaded HR diagram or CMD (None until the user opens one).
    pub diagram: Option<LoadedDiagram>,

    /// Loaded spectra.
    pub spectra: Option<Spectra>,

    /// Observed sources.
    pub observations: Option<ObservationTable>,

    /// Age fit of the observations against the diagram.
    pub wizard: Option<AgeWizard>,

    /// Sources left out of the combined pdf.
    pub excluded: BTreeSet<String>,

    pub source_colors: Option<SourceColors>,

    pub view: View,
    pub log_age: f64,
    pub abundance: Abundance,
    /// HR diagram type used when opening `hrs` files.
    pub hr_type: HrType,

    /// Show the HR diagram stacked over `stack_range` instead of one age.
    pub stack_enabled: bool,
    pub stack_range: (f64, f64),

    pub color_scale: ColorScale,
    pub color_map: ColorMap,

    /// Filters for building a CMD from stellar models.
    pub cmd_mag_filter: String,
    pub cmd_col_filters: (String, String),

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Bumped whenever the displayed heatmap changes.
    pub generation: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            diagram: None,
            spectra: None,
            observations: None,
            wizard: None,
            excluded: BTreeSet::new(),
            source_colors: None,
            view: View::Diagram,
            log_age: 7.0,
            abundance: Abundance::All,
            hr_type: HrType::TL,
            stack_enabled: false,
            stack_range: (6.0, 11.1),
            color_scale: ColorScale::Log10,
            color_map: ColorMap::Viridis,
            cmd_mag_filter: "V".to_string(),
            cmd_col_filters: ("B".to_string(), "V".to_string()),
            status_message: None,
            generation: 0,
        }
    }

    /// Ingest a newly loaded diagram and refit any loaded observations.
    pub fn set_diagram(&mut self, diagram: LoadedDiagram) {
        self.diagram = Some(diagram);
        self.view = View::Diagram;
        self.status_message = None;
        self.refit();
        self.touch();
    }

    /// Ingest a newly loaded observation table.
    pub fn set_observations(&mut self, observations: ObservationTable) {
        self.observations = Some(observations);
        self.excluded.clear();
        self.status_message = None;
        self.refit();
    }

    pub fn set_spectra(&mut self, spectra: Spectra) {
        self.spectra = Some(spectra);
        self.view = View::Spectra;
        self.status_message = None;
    }

    /// Recompute the age fit from the current diagram and observations.
    pub fn refit(&mut self) {
        let (Some(diagram), Some(obs)) = (&self.diagram, &self.observations) else {
            self.wizard = None;
            self.source_colors = None;
            return;
        };
        match AgeWizard::new(obs.clone(), diagram.as_model()) {
            Ok(wizard) => {
                self.source_colors = Some(SourceColors::new(wizard.sources()));
                self.wizard = Some(wizard);
                self.recombine();
            }
            Err(e) => {
                log::error!("Age fit failed: {e}");
                self.status_message = Some(format!("Error: {e}"));
                self.wizard = None;
                self.source_colors = None;
            }
        }
    }

    /// Recompute the combined pdf after the exclusion set changed.
    pub fn recombine(&mut self) {
        let not_you: Vec<String> = self.excluded.iter().cloned().collect();
        if let Some(wizard) = &mut self.wizard {
            wizard.multiply_pdfs(&not_you, true);
        }
    }

    /// Toggle whether a source contributes to the combined pdf.
    pub fn toggle_source(&mut self, source: &str) {
        if !self.excluded.remove(source) {
            self.excluded.insert(source.to_string());
        }
        self.recombine();
    }

    /// Mark the heatmap as needing a redraw.
    pub fn touch(&mut self) {
        self.generation += 1;
    }

    /// The 2-D grid currently displayed, indexed `[x, y]` in plot space.
    pub fn displayed_grid(&self) -> Option<Array2<f64>> {
        match self.diagram.as_ref()? {
            LoadedDiagram::Hrd(hrd) => {
                if self.stack_enabled {
                    match hrd.stack(Some(self.stack_range.0), Some(self.stack_range.1)) {
                        Ok(slices) => Some(slices.get(self.abundance).clone()),
                        Err(e) => {
                            log::warn!("cannot stack: {e}");
                            None
                        }
                    }
                } else {
                    Some(hrd.at_log_age(self.log_age).get(self.abundance).clone())
                }
            }
            // [mag, col] -> [col, mag] so colour runs along x
            LoadedDiagram::Cmd(cmd) => Some(cmd.at_log_age(self.log_age).t().to_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoki::constants::{HR_BINS, N_TIME_BINS};
    use hoki::data::model::MetadataValue;
    use ndarray::Array3;
    use std::collections::BTreeMap;

    fn diagram() -> LoadedDiagram {
        let mut high = Array3::<f64>::zeros((N_TIME_BINS, HR_BINS, HR_BINS));
        high[[10, 39, 79]] = 1.0;
        let zeros = Array3::<f64>::zeros((N_TIME_BINS, HR_BINS, HR_BINS));
        LoadedDiagram::Hrd(HrDiagram::new(high, zeros.clone(), zeros, HrType::TL).unwrap())
    }

    fn observations() -> ObservationTable {
        let row = |n: &str| {
            BTreeMap::from([
                ("name".to_string(), MetadataValue::String(n.to_string())),
                ("logT".to_string(), MetadataValue::Float(4.0)),
                ("logL".to_string(), MetadataValue::Float(5.0)),
            ])
        };
        ObservationTable::from_rows(
            vec!["name".into(), "logT".into(), "logL".into()],
            vec![row("a"), row("b")],
        )
    }

    #[test]
    fn loading_both_inputs_fits_ages() {
        let mut state = AppState::default();
        state.set_observations(observations());
        assert!(state.wizard.is_none());
        state.set_diagram(diagram());
        let wizard = state.wizard.as_ref().unwrap();
        assert_eq!(wizard.sources(), &["a".to_string(), "b".to_string()]);
        assert!(wizard.multiplied_pdf.is_some());
    }

    #[test]
    fn toggling_sources_updates_exclusions() {
        let mut state = AppState::default();
        state.set_diagram(diagram());
        state.set_observations(observations());
        state.toggle_source("a");
        assert!(state.excluded.contains("a"));
        state.toggle_source("a");
        assert!(state.excluded.is_empty());
    }

    #[test]
    fn displayed_grid_follows_age_and_stacking() {
        let mut state = AppState::default();
        assert!(state.displayed_grid().is_none());
        state.set_diagram(diagram());
        state.log_age = 7.0;
        assert!(state.displayed_grid().unwrap()[[39, 79]] > 0.0);
        state.log_age = 8.0;
        assert_eq!(state.displayed_grid().unwrap().sum(), 0.0);
        state.stack_enabled = true;
        assert!(state.displayed_grid().unwrap()[[39, 79]] > 0.0);
    }
}
