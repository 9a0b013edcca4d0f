//! End-to-end extraction of a complete model.
//!
//! The fixture is a two-dimensional tumor model with three cell types and
//! two substrates, one of which declares its diffusion coefficient in a
//! unit that differs from the domain unit.

use lattice_extract::cell::{PhenotypeVariant, INFINITE_DURATION};
use lattice_extract::{extract, ExtractConfig, ExtractError, ExtractOptions, ModelTree, ParameterSet};

const MODEL: &str = include_str!("fixtures/tumor_model.json");

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

fn model() -> ModelTree {
    serde_json::from_str(MODEL).expect("fixture is valid JSON")
}

fn parameters() -> ParameterSet {
    extract(&model(), &ExtractOptions::default()).expect("geometry and time are valid")
}

#[test]
fn test_geometry_and_time() {
    let set = parameters();
    assert_eq!(set.lattice_dims(), [50, 50, 1]);
    assert_eq!(set.space.factor, 0.05);
    assert!(set.space.autoconvert);
    assert_eq!(set.space.z.extent, 20.0);

    assert_eq!(set.time.steps, 72_000);
    assert_eq!(set.time.factor, 10.0);
    assert!(set.time.autoconvert);
    assert_eq!(set.time.equivalence, "1 discrete step = 10 min");
}

#[test]
fn test_simulation_options() {
    let set = parameters();
    assert_eq!(set.options.threads, 4);
    assert!(set.options.boundary_wall);
}

#[test]
fn test_cell_volumes_and_minimum() {
    let set = parameters();
    let cancer = &set.cell_types["cancer_cell"];
    assert!(close(cancer.volume.lattice.unwrap(), 0.5));
    assert!(cancer.volume.autoconverted);

    let stroma = &set.cell_types["stroma"];
    assert!(close(stroma.volume.lattice.unwrap(), 16.0));

    assert_eq!(set.volumes.minimum_volume, 8.0);
    assert!(set.volumes.any_below_minimum);
    assert_eq!(
        set.volumes.volumes.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["cancer_cell", "stroma"]
    );
    assert!(set
        .diagnostics
        .iter()
        .any(|d| d.scope.as_deref() == Some("cancer_cell") && d.message.contains("below")));
}

#[test]
fn test_phenotype_sequences_are_parallel() {
    let set = parameters();
    for (name, cell) in &set.cell_types {
        for (variant, phenotype) in &cell.phenotypes {
            if let Some(record) = &phenotype.record {
                assert!(record.is_aligned(), "{name}: {variant} is not aligned");
            }
        }
    }

    let cancer = &set.cell_types["cancer_cell"];
    let variants: Vec<_> = cancer.phenotypes.keys().copied().collect();
    assert_eq!(
        variants,
        vec![
            PhenotypeVariant::FlowCytometryAdvanced,
            PhenotypeVariant::StandardApoptosis,
            PhenotypeVariant::StandardNecrosis,
        ]
    );

    let cycle = cancer.phenotypes[&PhenotypeVariant::FlowCytometryAdvanced]
        .record
        .as_ref()
        .unwrap();
    assert_eq!(cycle.phase_count(), 4);
    assert!(close(cycle.phase_durations[0].duration.unwrap(), 1.0 / 0.00324));
    assert_eq!(cycle.phase_durations[1].fixed_duration, Some(true));
    assert_eq!(cycle.fluid_fraction, vec![Some(0.75); 4]);

    let necrosis = cancer.phenotypes[&PhenotypeVariant::StandardNecrosis]
        .record
        .as_ref()
        .unwrap();
    assert_eq!(necrosis.phase_durations[0].duration, Some(INFINITE_DURATION));
    assert_eq!(necrosis.relative_rupture_volume, vec![None, Some(2.0)]);

    let stroma = set.cell_types["stroma"].phenotypes[&PhenotypeVariant::SimpleLive]
        .record
        .as_ref()
        .unwrap();
    assert_eq!(stroma.phase_durations[0].duration, Some(INFINITE_DURATION));
    assert_eq!(stroma.total_volume, vec![Some(128000.0)]);
    assert_eq!(stroma.fluid_fraction, vec![None]);
}

#[test]
fn test_mechanics_and_custom_data() {
    let set = parameters();
    let cancer = &set.cell_types["cancer_cell"];
    let mechanics = cancer.mechanics.as_ref().unwrap();
    assert_eq!(mechanics.len(), 3);
    assert_eq!(mechanics["cell_cell_repulsion_strength"].value, 10.0);
    assert_eq!(cancer.id.as_deref(), Some("0"));
    assert!(cancer.custom_data.as_ref().unwrap().get("sample").is_some());
    assert!(set.cell_types["stroma"].mechanics.is_none());
}

#[test]
fn test_substrate_conversion_is_per_substrate() {
    let set = parameters();
    let oxygen = &set.substrates["oxygen"];
    assert!(oxygen.autoconvert.space && oxygen.autoconvert.time);
    assert!(close(oxygen.diffusion.value, 25.0));
    assert!(close(oxygen.decay.value, 0.01));
    assert!(!oxygen.use_steady_state);
    assert_eq!(oxygen.concentration_units.as_deref(), Some("mmHg"));

    let debris = &set.substrates["debris"];
    assert!(!debris.autoconvert.space);
    assert!(debris.autoconvert.time);
    assert!(close(debris.diffusion.value, 0.1));
    assert!(close(debris.decay.value, 0.001));
    assert_eq!(debris.dirichlet.as_ref().map(|d| d.enabled), Some(false));

    // the global flags are untouched
    assert!(set.space.autoconvert);
}

#[test]
fn test_secretion_entries() {
    let set = parameters();
    assert!(set.secretion.cell_type("stroma").is_none());
    assert_eq!(
        set.secretion.field_names().into_iter().collect::<Vec<_>>(),
        vec!["oxygen", "debris"]
    );
    let debris = set.secretion.get("cancer_cell", "debris").unwrap();
    assert_eq!(debris.secretion_rate.value, 0.5);
    assert_eq!(debris.uptake_rate.value, 0.0);
    assert_eq!(debris.uptake_rate.unit, "None");

    // secretion is still read for a cell type whose phenotype failed
    let macrophage = set.secretion.get("macrophage", "oxygen").unwrap();
    assert_eq!(macrophage.per_step(&set.time).uptake_rate, 0.5);
}

#[test]
fn test_failures_are_isolated_per_entity() {
    let set = parameters();
    assert_eq!(
        set.failures,
        vec![ExtractError::MissingPhaseData {
            cell_type: "macrophage".into()
        }]
    );
    assert!(!set.cell_types.contains_key("macrophage"));
    assert_eq!(set.cell_types.len(), 2);

    let err = set.ensure_complete().unwrap_err();
    assert!(err.to_string().contains("macrophage"));
}

#[test]
fn test_extraction_is_idempotent() {
    let tree = model();
    let options = ExtractOptions::default();
    let first = extract(&tree, &options).unwrap();
    let second = extract(&tree, &options).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_parameter_set_survives_json() {
    let set = parameters();
    let value = serde_json::to_value(&set).unwrap();
    assert_eq!(value["space"]["autoconvert"], serde_json::json!(true));
    assert_eq!(
        value["cell_types"]["cancer_cell"]["phenotypes"]["Standard necrosis model"]["code"]
            ["status"],
        serde_json::json!("known")
    );
    let back: ParameterSet = serde_json::from_value(value).unwrap();
    assert_eq!(back, set);
}

#[test]
fn test_config_changes_minimum_and_threshold() {
    let config = ExtractConfig::from_yaml(
        "apiVersion: lattice/v1\nkind: ExtractConfig\nminimumVolume: 0.1\nsteadyStateThreshold: 10\n",
    )
    .unwrap();
    let set = extract(&model(), &config.to_options()).unwrap();
    assert!(!set.volumes.any_below_minimum);
    assert!(set.substrates["oxygen"].use_steady_state);
    assert!(!set.substrates["debris"].use_steady_state);
}

#[test]
fn test_config_units_enable_conversion() {
    let mut tree: serde_json::Value = serde_json::from_str(MODEL).unwrap();
    tree["PhysiCell_settings"]["overall"]["time_units"] = serde_json::json!("tick");
    tree["PhysiCell_settings"]["overall"]["max_time"]["@units"] = serde_json::json!("tick");
    let tree: ModelTree = serde_json::from_value(tree).unwrap();

    let set = extract(&tree, &ExtractOptions::default()).unwrap();
    assert!(!set.time.autoconvert);
    assert!(!set.substrates["oxygen"].autoconvert.time);

    let config = ExtractConfig::from_yaml("units:\n  time:\n    tick: 1\n").unwrap();
    let set = extract(&tree, &config.to_options()).unwrap();
    assert!(set.time.autoconvert);
}
