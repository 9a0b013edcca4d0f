//! Whole-model extraction
//!
//! Runs every extractor over one tree against one diagnostics sink.
//! Geometry and time are global: if either fails nothing else is
//! meaningful and the call fails. Everything else is per entity, and a
//! failing cell type or substrate is recorded without stopping its
//! siblings.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::cell::{extract_cell_types, summarize_volumes, CellTypeRecord, VolumeSummary};
use crate::config::ExtractOptions;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::diffusion::{extract_substrates, SubstrateRecord};
use crate::error::{ExtractError, Result};
use crate::geometry::{convert_space, SpaceConversion};
use crate::options::{extract_options, SimulationOptions};
use crate::secretion::{extract_secretion, SecretionTable};
use crate::time::{convert_time, TimeConversion};
use crate::tree::ModelTree;

/// Output of a per-entity extractor: what succeeded, and what did not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extracted<T> {
    pub items: T,
    pub failures: Vec<ExtractError>,
}

/// The dimensionless parameter set of one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub space: SpaceConversion,
    pub time: TimeConversion,
    pub options: SimulationOptions,
    pub cell_types: IndexMap<String, CellTypeRecord>,
    pub volumes: VolumeSummary,
    pub substrates: IndexMap<String, SubstrateRecord>,
    pub secretion: SecretionTable,
    /// Entities that could not be extracted.
    pub failures: Vec<ExtractError>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParameterSet {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fail with [`ExtractError::Incomplete`] if any entity failed.
    pub fn ensure_complete(self) -> Result<Self> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(ExtractError::Incomplete {
                failures: self.failures,
            })
        }
    }

    pub fn lattice_dims(&self) -> [u32; 3] {
        self.space.lattice_dims()
    }
}

/// Extract the full parameter set from one model tree.
#[instrument(skip_all)]
pub fn extract(tree: &ModelTree, options: &ExtractOptions) -> Result<ParameterSet> {
    let mut diagnostics = Diagnostics::new();
    let space = convert_space(tree, &options.units.length, &mut diagnostics)?;
    let time = convert_time(tree, &options.units.time, &mut diagnostics)?;

    let mut failures = Vec::new();
    let simulation = extract_options(tree).unwrap_or_else(|err| {
        failures.push(err);
        SimulationOptions::default()
    });

    let cells = extract_cell_types(tree, &space, options, &mut diagnostics);
    failures.extend(cells.failures);
    let volumes = summarize_volumes(
        cells
            .items
            .iter()
            .map(|(name, record)| (name.as_str(), &record.volume)),
        options.minimum_volume,
        &mut diagnostics,
    );

    let substrates = extract_substrates(tree, &space, &time, options, &mut diagnostics);
    failures.extend(substrates.failures);

    let secretion = extract_secretion(tree, &mut diagnostics);
    failures.extend(secretion.failures);

    info!(
        dims = ?space.lattice_dims(),
        steps = time.steps,
        cell_types = cells.items.len(),
        substrates = substrates.items.len(),
        failures = failures.len(),
        diagnostics = diagnostics.len(),
        "extraction complete"
    );

    Ok(ParameterSet {
        space,
        time,
        options: simulation,
        cell_types: cells.items,
        volumes,
        substrates: substrates.items,
        secretion: secretion.items,
        failures,
        diagnostics: diagnostics.into_vec(),
    })
}
