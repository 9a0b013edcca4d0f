//! Secretion and uptake
//!
//! A cell type without a `phenotype.secretion` block has no entry at all;
//! a declared substrate whose rates are omitted has zero-valued rates.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::diagnostics::Diagnostics;
use crate::error::{ExtractError, Result};
use crate::read::{insert_normalized, normalize_name, number};
use crate::time::TimeConversion;
use crate::tree::{ModelTree, Node};
use crate::Extracted;

/// Unit recorded for a rate the source omits.
pub const NO_UNIT: &str = "None";

/// A source rate with its declared unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    pub value: f64,
    pub unit: String,
}

impl Rate {
    fn absent() -> Self {
        Self {
            value: 0.0,
            unit: NO_UNIT.to_string(),
        }
    }
}

/// Secretion behaviour of one cell type towards one substrate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretionRecord {
    pub secretion_rate: Rate,
    pub secretion_target: Rate,
    pub uptake_rate: Rate,
    pub net_export_rate: Rate,
}

/// Secretion rates per discrete step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepRates {
    pub secretion_rate: f64,
    /// Density, not a rate; carried unconverted.
    pub secretion_target: f64,
    pub uptake_rate: f64,
    pub net_export_rate: f64,
}

impl SecretionRecord {
    /// Rates converted with the effective time factor.
    pub fn per_step(&self, time: &TimeConversion) -> StepRates {
        let t = time.effective_factor();
        StepRates {
            secretion_rate: self.secretion_rate.value / t,
            secretion_target: self.secretion_target.value,
            uptake_rate: self.uptake_rate.value / t,
            net_export_rate: self.net_export_rate.value / t,
        }
    }
}

/// Secretion records by cell type, then by substrate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretionTable {
    cell_types: IndexMap<String, IndexMap<String, SecretionRecord>>,
}

impl SecretionTable {
    pub fn get(&self, cell_type: &str, substrate: &str) -> Option<&SecretionRecord> {
        self.cell_types.get(cell_type)?.get(substrate)
    }

    /// Substrates of one cell type, if it declares secretion.
    pub fn cell_type(&self, cell_type: &str) -> Option<&IndexMap<String, SecretionRecord>> {
        self.cell_types.get(cell_type)
    }

    pub fn cell_types(&self) -> impl Iterator<Item = &str> {
        self.cell_types.keys().map(String::as_str)
    }

    /// Every substrate any cell type secretes or takes up, first-seen order.
    pub fn field_names(&self) -> IndexSet<&str> {
        self.cell_types
            .values()
            .flat_map(|substrates| substrates.keys().map(String::as_str))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.cell_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cell_types.is_empty()
    }
}

fn rate(cell_type: &str, entry: &Node, key: &str) -> Result<Rate> {
    let node = entry.get(key);
    let Some(value) = number(cell_type, &format!("phenotype.secretion.substrate.{key}"), node)? else {
        return Ok(Rate::absent());
    };
    let unit = node
        .and_then(|n| n.attr("units"))
        .unwrap_or(NO_UNIT)
        .to_string();
    Ok(Rate { value, unit })
}

fn cell_secretion(
    cell_type: &str,
    block: &Node,
    diagnostics: &mut Diagnostics,
) -> Result<IndexMap<String, SecretionRecord>> {
    let mut substrates = IndexMap::new();
    let Some(entries) = block.get("substrate") else {
        return Ok(substrates);
    };
    for entry in entries.seq() {
        let name = entry
            .attr("name")
            .ok_or_else(|| ExtractError::missing(cell_type, "phenotype.secretion.substrate@name"))?;
        let record = SecretionRecord {
            secretion_rate: rate(cell_type, entry, "secretion_rate")?,
            secretion_target: rate(cell_type, entry, "secretion_target")?,
            uptake_rate: rate(cell_type, entry, "uptake_rate")?,
            net_export_rate: rate(cell_type, entry, "net_export_rate")?,
        };
        insert_normalized(&mut substrates, name, record, diagnostics);
    }
    Ok(substrates)
}

/// Extract the secretion block of every cell definition.
pub fn extract_secretion(
    tree: &ModelTree,
    diagnostics: &mut Diagnostics,
) -> Extracted<SecretionTable> {
    let mut extracted = Extracted::<SecretionTable>::default();
    let Some(definitions) = tree
        .section("cell_definitions")
        .and_then(|section| section.get("cell_definition"))
    else {
        return extracted;
    };

    // Definitions without a name are reported by the cell-type extractor.
    for definition in definitions.seq() {
        let Some(name) = definition.attr("name") else {
            continue;
        };
        let cell_type = normalize_name(name);
        let Some(block) = definition.path(&["phenotype", "secretion"]) else {
            diagnostics.hint(&cell_type, "no secretion block");
            continue;
        };
        match cell_secretion(&cell_type, block, diagnostics) {
            Ok(substrates) => {
                debug!(cell_type = %cell_type, substrates = substrates.len(), "extracted secretion");
                insert_normalized(&mut extracted.items.cell_types, name, substrates, diagnostics);
            }
            Err(err) => extracted.failures.push(err),
        }
    }
    extracted
}
