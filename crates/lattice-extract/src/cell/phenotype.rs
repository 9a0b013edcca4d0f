//! Cycle and death phenotype normalization
//!
//! Every phenotype the source declares is reduced to one [`PhenotypeRecord`]
//! whose per-phase sequences all have the same length, with `None` at any
//! position the source left empty.

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::codes::{PhenotypeCode, PhenotypeCodes, PhenotypeVariant};
use crate::diagnostics::Diagnostics;
use crate::error::{ExtractError, Result};
use crate::read::{number, parse_flag, required_number};
use crate::tree::Node;

/// Duration stored for a phase whose rate or duration is zero.
pub const INFINITE_DURATION: f64 = 9e99;

/// Relative rupture volume of the lysed necrosis phase.
pub const LYSED_RUPTURE_VOLUME: f64 = 2.0;

/// `(fixed_duration, duration)` of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseDuration {
    pub fixed_duration: Option<bool>,
    pub duration: Option<f64>,
}

impl PhaseDuration {
    pub const UNKNOWN: PhaseDuration = PhaseDuration {
        fixed_duration: None,
        duration: None,
    };

    fn from_entry(entry: &Node, duration: f64) -> Self {
        Self {
            fixed_duration: Some(entry.attr("fixed_duration").is_some_and(parse_flag)),
            duration: Some(if duration == 0.0 {
                INFINITE_DURATION
            } else {
                duration
            }),
        }
    }
}

/// Normalized phase data of one phenotype.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PhenotypeRecord {
    pub rate_units: Option<String>,
    /// Death rate value, death models only.
    pub death_rate: Option<f64>,
    pub phase_durations: Vec<PhaseDuration>,
    pub fluid_change_rate: Vec<Option<f64>>,
    pub cytoplasmic_biomass_change_rate: Vec<Option<f64>>,
    pub nuclear_biomass_change_rate: Vec<Option<f64>>,
    pub calcification_rate: Vec<Option<f64>>,
    pub fluid_fraction: Vec<Option<f64>>,
    pub nuclear_volume: Vec<Option<f64>>,
    pub calcified_fraction: Vec<Option<f64>>,
    pub relative_rupture_volume: Vec<Option<f64>>,
    pub total_volume: Vec<Option<f64>>,
}

impl PhenotypeRecord {
    /// Record for `phases` with every parallel sequence `None`-filled.
    fn blank(rate_units: Option<String>, phase_durations: Vec<PhaseDuration>) -> Self {
        let n = phase_durations.len();
        Self {
            rate_units,
            death_rate: None,
            phase_durations,
            fluid_change_rate: vec![None; n],
            cytoplasmic_biomass_change_rate: vec![None; n],
            nuclear_biomass_change_rate: vec![None; n],
            calcification_rate: vec![None; n],
            fluid_fraction: vec![None; n],
            nuclear_volume: vec![None; n],
            calcified_fraction: vec![None; n],
            relative_rupture_volume: vec![None; n],
            total_volume: vec![None; n],
        }
    }

    pub fn phase_count(&self) -> usize {
        self.phase_durations.len()
    }

    fn sequences(&self) -> [&Vec<Option<f64>>; 9] {
        [
            &self.fluid_change_rate,
            &self.cytoplasmic_biomass_change_rate,
            &self.nuclear_biomass_change_rate,
            &self.calcification_rate,
            &self.fluid_fraction,
            &self.nuclear_volume,
            &self.calcified_fraction,
            &self.relative_rupture_volume,
            &self.total_volume,
        ]
    }

    fn sequences_mut(&mut self) -> [&mut Vec<Option<f64>>; 9] {
        [
            &mut self.fluid_change_rate,
            &mut self.cytoplasmic_biomass_change_rate,
            &mut self.nuclear_biomass_change_rate,
            &mut self.calcification_rate,
            &mut self.fluid_fraction,
            &mut self.nuclear_volume,
            &mut self.calcified_fraction,
            &mut self.relative_rupture_volume,
            &mut self.total_volume,
        ]
    }

    /// Every parallel sequence has one entry per phase.
    pub fn is_aligned(&self) -> bool {
        let n = self.phase_count();
        self.sequences().iter().all(|seq| seq.len() == n)
    }

    /// Pad every sequence to the longest one.
    fn align(&mut self, scope: &str, variant: PhenotypeVariant, diagnostics: &mut Diagnostics) {
        if self.is_aligned() {
            return;
        }
        let longest = self
            .sequences()
            .iter()
            .map(|seq| seq.len())
            .chain([self.phase_count()])
            .max()
            .unwrap_or_default();
        diagnostics.warn(
            scope,
            format!(
                "{variant}: {} phase durations but biomass data for up to {longest} phases; \
                 missing entries padded with none",
                self.phase_count()
            ),
        );
        self.phase_durations.resize(longest, PhaseDuration::UNKNOWN);
        for seq in self.sequences_mut() {
            seq.resize(longest, None);
        }
    }
}

/// One resolved phenotype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phenotype {
    pub code: PhenotypeCode,
    /// `None` when the code was not recognized.
    pub record: Option<PhenotypeRecord>,
}

/// Cycle and death phenotypes of a cell type, in declaration order.
pub type PhenotypeSet = IndexMap<PhenotypeVariant, Phenotype>;

/// Resolve `@code` of `node`, warning about codes outside the table.
fn resolve(
    scope: &str,
    node: &Node,
    codes: &PhenotypeCodes,
    fallback: PhenotypeVariant,
    diagnostics: &mut Diagnostics,
) -> (PhenotypeVariant, PhenotypeCode) {
    let raw = node.attr("code").unwrap_or_default();
    let (variant, code) = codes.resolve(raw, fallback);
    if !code.is_recognized() {
        diagnostics.warn(
            scope,
            format!("phenotype code '{raw}' is not recognized; falling back on {fallback}"),
        );
    }
    (variant, code)
}

fn volume_number(scope: &str, volume: &Node, key: &str) -> Result<Option<f64>> {
    number(scope, &format!("phenotype.volume.{key}"), volume.get(key))
}

fn cycle_phenotype(
    scope: &str,
    cycle: &Node,
    volume: Option<&Node>,
    codes: &PhenotypeCodes,
    diagnostics: &mut Diagnostics,
) -> Result<(PhenotypeVariant, Phenotype)> {
    let (variant, code) = resolve(scope, cycle, codes, PhenotypeVariant::CYCLE_FALLBACK, diagnostics);
    if !code.is_recognized() {
        return Ok((variant, Phenotype { code, record: None }));
    }

    // Rates are authoritative when both tables are present.
    let (data, using_rates, field) = match (
        cycle.get("phase_transition_rates"),
        cycle.get("phase_durations"),
    ) {
        (Some(rates), _) => (rates, true, "phenotype.cycle.phase_transition_rates.rate"),
        (None, Some(durations)) => (durations, false, "phenotype.cycle.phase_durations.duration"),
        (None, None) => {
            return Err(ExtractError::MissingPhaseData {
                cell_type: scope.to_string(),
            })
        }
    };
    let entries = if using_rates {
        data.get("rate")
    } else {
        data.get("duration").or_else(|| data.get("rate"))
    };
    let Some(entries) = entries else {
        return Err(ExtractError::MissingPhaseData {
            cell_type: scope.to_string(),
        });
    };

    let phases = entries
        .seq()
        .iter()
        .map(|entry| {
            let value = required_number(scope, field, Some(entry))?;
            let duration = if using_rates && value != 0.0 {
                1.0 / value
            } else {
                value
            };
            Ok(PhaseDuration::from_entry(entry, duration))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut record = PhenotypeRecord::blank(data.attr("units").map(str::to_string), phases);
    if let Some(volume) = volume {
        let n = record.phase_count();
        let fields: [(&str, &mut Vec<Option<f64>>); 8] = [
            ("fluid_change_rate", &mut record.fluid_change_rate),
            (
                "cytoplasmic_biomass_change_rate",
                &mut record.cytoplasmic_biomass_change_rate,
            ),
            (
                "nuclear_biomass_change_rate",
                &mut record.nuclear_biomass_change_rate,
            ),
            ("calcification_rate", &mut record.calcification_rate),
            ("fluid_fraction", &mut record.fluid_fraction),
            ("nuclear", &mut record.nuclear_volume),
            ("calcified_fraction", &mut record.calcified_fraction),
            ("total", &mut record.total_volume),
        ];
        for (key, seq) in fields {
            *seq = vec![volume_number(scope, volume, key)?; n];
        }
    }

    debug!(cell_type = scope, %variant, phases = record.phase_count(), "cycle phenotype");
    Ok((
        variant,
        Phenotype {
            code,
            record: Some(record),
        },
    ))
}

fn death_phenotype(
    scope: &str,
    model: &Node,
    codes: &PhenotypeCodes,
    diagnostics: &mut Diagnostics,
) -> Result<(PhenotypeVariant, Phenotype)> {
    let (variant, code) = resolve(scope, model, codes, PhenotypeVariant::DEATH_FALLBACK, diagnostics);
    if !code.is_recognized() {
        return Ok((variant, Phenotype { code, record: None }));
    }

    let death_rate = model.get("death_rate");
    let rate_units = death_rate.and_then(|rate| rate.attr("units")).map(str::to_string);

    let phases = match model.path(&["phase_durations", "duration"]) {
        Some(entries) => entries
            .seq()
            .iter()
            .map(|entry| {
                let value = required_number(scope, "phenotype.death.model.phase_durations.duration", Some(entry))?;
                Ok(PhaseDuration::from_entry(entry, value))
            })
            .collect::<Result<Vec<_>>>()?,
        None => vec![PhaseDuration::UNKNOWN; variant.death_phase_count()],
    };

    let mut record = PhenotypeRecord::blank(rate_units, phases);
    record.death_rate = number(scope, "phenotype.death.model.death_rate", death_rate)?;

    if let Some(parameters) = model.get("parameters") {
        let param = |key: &str| {
            number(
                scope,
                &format!("phenotype.death.model.parameters.{key}"),
                parameters.get(key),
            )
        };
        match variant {
            PhenotypeVariant::StandardApoptosis => {
                record.fluid_change_rate = vec![param("unlysed_fluid_change_rate")?];
                record.cytoplasmic_biomass_change_rate =
                    vec![param("cytoplasmic_biomass_change_rate")?];
                record.nuclear_biomass_change_rate = vec![param("nuclear_biomass_change_rate")?];
                record.calcification_rate = vec![param("calcification_rate")?];
                record.relative_rupture_volume = vec![None];
            }
            PhenotypeVariant::StandardNecrosis => {
                let cytoplasmic = param("cytoplasmic_biomass_change_rate")?;
                let nuclear = param("nuclear_biomass_change_rate")?;
                let calcification = param("calcification_rate")?;
                record.fluid_change_rate = vec![
                    param("unlysed_fluid_change_rate")?,
                    param("lysed_fluid_change_rate")?,
                ];
                record.cytoplasmic_biomass_change_rate = vec![cytoplasmic; 2];
                record.nuclear_biomass_change_rate = vec![nuclear; 2];
                record.calcification_rate = vec![calcification; 2];
                record.relative_rupture_volume = vec![None, Some(LYSED_RUPTURE_VOLUME)];
            }
            _ => {}
        }
    }
    record.align(scope, variant, diagnostics);

    debug!(cell_type = scope, %variant, phases = record.phase_count(), "death phenotype");
    Ok((
        variant,
        Phenotype {
            code,
            record: Some(record),
        },
    ))
}

/// An unrecognized code never displaces a record already stored under its
/// fallback variant.
fn insert_phenotype(
    set: &mut PhenotypeSet,
    cell_type: &str,
    variant: PhenotypeVariant,
    phenotype: Phenotype,
    diagnostics: &mut Diagnostics,
) {
    match set.entry(variant) {
        Entry::Vacant(slot) => {
            slot.insert(phenotype);
        }
        Entry::Occupied(mut slot) if phenotype.code.is_recognized() => {
            diagnostics.warn(
                cell_type,
                format!(
                    "phenotype code {} replaces an earlier {variant} model",
                    phenotype.code.raw()
                ),
            );
            slot.insert(phenotype);
        }
        Entry::Occupied(slot) => {
            diagnostics.warn(
                cell_type,
                format!(
                    "unrecognized phenotype code {} ignored, {variant} is already defined by code {}",
                    phenotype.code.raw(),
                    slot.get().code.raw()
                ),
            );
        }
    }
}

/// Cycle and death phenotypes of one cell definition.
pub(crate) fn extract_phenotypes(
    cell_type: &str,
    definition: &Node,
    codes: &PhenotypeCodes,
    diagnostics: &mut Diagnostics,
) -> Result<PhenotypeSet> {
    let mut set = PhenotypeSet::new();
    let Some(phenotype) = definition.get("phenotype") else {
        return Ok(set);
    };

    if let Some(cycle) = phenotype.get("cycle") {
        let (variant, entry) =
            cycle_phenotype(cell_type, cycle, phenotype.get("volume"), codes, diagnostics)?;
        insert_phenotype(&mut set, cell_type, variant, entry, diagnostics);
    }

    if let Some(models) = phenotype.path(&["death", "model"]) {
        for model in models.seq() {
            let (variant, entry) = death_phenotype(cell_type, model, codes, diagnostics)?;
            insert_phenotype(&mut set, cell_type, variant, entry, diagnostics);
        }
    }

    Ok(set)
}
