//! Cell types
//!
//! One [`CellTypeRecord`] per `cell_definitions.cell_definition`, keyed by
//! the normalized definition name in declaration order.

mod codes;
mod phenotype;
mod volume;

pub use codes::{PhenotypeCode, PhenotypeCodes, PhenotypeVariant};
pub use phenotype::{
    PhaseDuration, Phenotype, PhenotypeRecord, PhenotypeSet, INFINITE_DURATION,
    LYSED_RUPTURE_VOLUME,
};
pub use volume::{summarize_volumes, CellVolume, VolumeSummary, UNSPECIFIED_UNIT};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ExtractOptions;
use crate::diagnostics::Diagnostics;
use crate::error::{ExtractError, Result};
use crate::geometry::SpaceConversion;
use crate::read::{insert_normalized, normalize_name, number, Quantity};
use crate::tree::{ModelTree, Node};
use crate::Extracted;

/// Mechanics parameters keyed by source name.
pub type Mechanics = IndexMap<String, Quantity>;

/// Everything extracted for one cell type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellTypeRecord {
    /// Source name, before normalization.
    pub name: String,
    /// Source `ID` attribute.
    pub id: Option<String>,
    pub volume: CellVolume,
    /// `None` when the definition has no mechanics block.
    pub mechanics: Option<Mechanics>,
    /// Passed through unchanged.
    pub custom_data: Option<Node>,
    pub phenotypes: PhenotypeSet,
}

fn mechanics(
    cell_type: &str,
    definition: &Node,
    diagnostics: &mut Diagnostics,
) -> Result<Option<Mechanics>> {
    let Some(block) = definition.path(&["phenotype", "mechanics"]) else {
        return Ok(None);
    };
    let mut parameters = Mechanics::new();
    for (key, node) in block.elements().filter(|(key, _)| *key != "options") {
        let field = format!("phenotype.mechanics.{key}");
        match number(cell_type, &field, Some(node))? {
            Some(value) => {
                let unit = node.attr("units").map(str::to_string);
                parameters.insert(key.to_string(), Quantity { value, unit });
            }
            None => diagnostics.hint(cell_type, format!("mechanics entry '{key}' has no value; skipped")),
        }
    }
    Ok(Some(parameters))
}

fn cell_type(
    name: &str,
    definition: &Node,
    space: &SpaceConversion,
    options: &ExtractOptions,
    diagnostics: &mut Diagnostics,
) -> Result<CellTypeRecord> {
    let key = normalize_name(name);
    let volume = volume::convert_volume(&key, definition, space, &options.units.length, diagnostics)?;
    let mechanics = mechanics(&key, definition, diagnostics)?;
    let phenotypes =
        phenotype::extract_phenotypes(&key, definition, &options.phenotype_codes, diagnostics)?;

    debug!(
        cell_type = %key,
        lattice_volume = ?volume.lattice,
        phenotypes = phenotypes.len(),
        "extracted cell type"
    );

    Ok(CellTypeRecord {
        name: name.to_string(),
        id: definition.attr("ID").map(str::to_string),
        volume,
        mechanics,
        custom_data: definition.get("custom_data").cloned(),
        phenotypes,
    })
}

/// Extract every cell definition.
///
/// A definition that fails is recorded in `failures` and its siblings are
/// still extracted.
pub fn extract_cell_types(
    tree: &ModelTree,
    space: &SpaceConversion,
    options: &ExtractOptions,
    diagnostics: &mut Diagnostics,
) -> Extracted<IndexMap<String, CellTypeRecord>> {
    let mut extracted = Extracted::default();
    let definitions = tree
        .section("cell_definitions")
        .and_then(|section| section.get("cell_definition"));
    let Some(definitions) = definitions else {
        diagnostics.hint("cell_definitions", "model declares no cell types");
        return extracted;
    };

    for (index, definition) in definitions.seq().iter().enumerate() {
        let Some(name) = definition.attr("name") else {
            extracted.failures.push(ExtractError::missing(
                &format!("cell_definition[{index}]"),
                "@name",
            ));
            continue;
        };
        match cell_type(name, definition, space, options, diagnostics) {
            Ok(record) => insert_normalized(&mut extracted.items, name, record, diagnostics),
            Err(err) => extracted.failures.push(err),
        }
    }
    extracted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::convert_space;
    use serde_json::json;

    fn run(value: serde_json::Value) -> (Extracted<IndexMap<String, CellTypeRecord>>, Diagnostics) {
        let tree: ModelTree = serde_json::from_value(value).unwrap();
        let options = ExtractOptions::default();
        let mut diagnostics = Diagnostics::new();
        let space = convert_space(&tree, &options.units.length, &mut diagnostics).unwrap();
        let extracted = extract_cell_types(&tree, &space, &options, &mut diagnostics);
        (extracted, diagnostics)
    }

    #[test]
    fn test_names_are_normalized_in_order() {
        let (extracted, _) = run(json!({"cell_definitions": {"cell_definition": [
            {"@name": "cancer cell", "@ID": "0"},
            {"@name": "macrophage", "@ID": "1"}
        ]}}));
        let keys: Vec<_> = extracted.items.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["cancer_cell", "macrophage"]);
        assert_eq!(extracted.items["cancer_cell"].name, "cancer cell");
        assert_eq!(extracted.items["macrophage"].id.as_deref(), Some("1"));
        assert!(extracted.failures.is_empty());
    }

    #[test]
    fn test_colliding_names_are_reported() {
        let (extracted, diagnostics) = run(json!({"cell_definitions": {"cell_definition": [
            {"@name": "cancer cell", "@ID": "0"},
            {"@name": "cancer_cell", "@ID": "1"}
        ]}}));
        assert_eq!(extracted.items.len(), 1);
        assert_eq!(extracted.items["cancer_cell"].id.as_deref(), Some("1"));
        assert!(diagnostics
            .for_scope("cancer_cell")
            .any(|d| d.message.contains("already defined")));
    }

    #[test]
    fn test_single_definition_is_not_a_list() {
        let (extracted, _) = run(json!({"cell_definitions": {"cell_definition": {"@name": "default"}}}));
        assert_eq!(extracted.items.len(), 1);
        let record = &extracted.items["default"];
        assert!(record.mechanics.is_none());
        assert!(record.custom_data.is_none());
        assert!(record.phenotypes.is_empty());
        assert_eq!(record.volume.unit, UNSPECIFIED_UNIT);
    }

    #[test]
    fn test_mechanics_skip_options() {
        let (extracted, diagnostics) = run(json!({"cell_definitions": {"cell_definition": {
            "@name": "default",
            "phenotype": {"mechanics": {
                "cell_cell_adhesion_strength": {"@units": "micron/min", "#text": "0.4"},
                "relative_maximum_adhesion_distance": {"@units": "dimensionless", "#text": "1.25"},
                "cell_BM_repulsion_strength": {"#text": "10"},
                "attachment_elastic_constant": {"@units": "1/min"},
                "options": {"set_relative_equilibrium_distance": {"@enabled": "false", "#text": "1.8"}}
            }},
            "custom_data": {"sample": {"@units": "dimensionless", "#text": "1.0"}}
        }}}));
        let record = &extracted.items["default"];
        let mechanics = record.mechanics.as_ref().unwrap();
        assert_eq!(mechanics.len(), 3);
        assert!(!mechanics.contains_key("options"));
        assert_eq!(mechanics["cell_cell_adhesion_strength"].value, 0.4);
        assert_eq!(
            mechanics["cell_cell_adhesion_strength"].unit.as_deref(),
            Some("micron/min")
        );
        assert_eq!(mechanics["cell_BM_repulsion_strength"].unit, None);
        assert!(diagnostics
            .iter()
            .any(|d| d.message.contains("attachment_elastic_constant")));
        assert!(record.custom_data.as_ref().unwrap().get("sample").is_some());
    }

    #[test]
    fn test_failures_are_isolated() {
        let (extracted, _) = run(json!({"cell_definitions": {"cell_definition": [
            {"@name": "broken", "phenotype": {"cycle": {"@code": "5"}}},
            {"@name": "fine"},
            {"@ID": "2"}
        ]}}));
        assert_eq!(extracted.items.keys().collect::<Vec<_>>(), vec!["fine"]);
        assert_eq!(extracted.failures.len(), 2);
        assert_eq!(
            extracted.failures[0],
            ExtractError::MissingPhaseData {
                cell_type: "broken".into()
            }
        );
        assert_eq!(
            extracted.failures[1],
            ExtractError::missing("cell_definition[2]", "@name")
        );
    }

    #[test]
    fn test_no_cell_definitions() {
        let (extracted, diagnostics) = run(json!({}));
        assert!(extracted.items.is_empty());
        assert_eq!(diagnostics.for_scope("cell_definitions").count(), 1);
    }
}
