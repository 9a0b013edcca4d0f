//! Diffusing substrates
//!
//! Converts each substrate's diffusion coefficient and decay rate into
//! lattice units. The global space/time factors only apply to a substrate
//! whose own coefficient unit agrees with the global units; otherwise that
//! substrate (and only that one) keeps an identity factor.

use indexmap::IndexMap;
use lattice_units::{CompoundUnit, UnitTables};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ExtractOptions;
use crate::diagnostics::Diagnostics;
use crate::error::{ExtractError, Result};
use crate::geometry::SpaceConversion;
use crate::read::{
    insert_normalized, normalize_name, number, parse_flag, quantity, required_number, Quantity,
};
use crate::time::TimeConversion;
use crate::tree::{ModelTree, Node};
use crate::Extracted;

/// Equivalence text of a conversion that was not applied.
pub const DISABLED: &str = "disabled autoconversion";

const UNKNOWN_SOURCE_UNIT: &str = "disabled autoconversion, not known";

/// A rate in source and lattice units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertedRate {
    /// Source value.
    pub raw: f64,
    /// Declared `@units`.
    pub unit: Option<String>,
    /// Value in lattice units.
    pub value: f64,
    /// Multiplier applied to `raw`.
    pub factor: f64,
    pub equivalence: String,
    /// Physical unit `factor` converts from.
    pub source_unit: String,
}

/// Per-substrate autoconversion flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Autoconvert {
    pub space: bool,
    pub time: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dirichlet {
    pub enabled: bool,
    pub value: Option<f64>,
}

/// One diffusing substrate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstrateRecord {
    /// Source name, before normalization.
    pub name: String,
    pub concentration_units: Option<String>,
    pub diffusion: ConvertedRate,
    pub decay: ConvertedRate,
    pub autoconvert: Autoconvert,
    /// Converted diffusion exceeds the steady-state threshold.
    pub use_steady_state: bool,
    pub initial_condition: Option<Quantity>,
    pub dirichlet: Option<Dirichlet>,
}

/// Decide the substrate's own flags from its coefficient unit.
fn substrate_flags(
    name: &str,
    unit: Option<&str>,
    space: &SpaceConversion,
    time: &TimeConversion,
    units: &UnitTables,
    diagnostics: &mut Diagnostics,
) -> Autoconvert {
    let disabled = Autoconvert {
        space: false,
        time: false,
    };
    let Some(unit) = unit else {
        diagnostics.warn(
            name,
            "diffusion coefficient declares no unit; automatic conversion disabled",
        );
        return disabled;
    };
    let parsed = match CompoundUnit::parse(unit) {
        Ok(parsed) => parsed,
        Err(err) => {
            diagnostics.warn(
                name,
                format!("cannot read diffusion coefficient unit: {err}; automatic conversion disabled"),
            );
            return disabled;
        }
    };

    let mut flags = Autoconvert {
        space: space.autoconvert,
        time: time.autoconvert,
    };
    if !units.length.equivalent(&parsed.length, &space.unit) {
        diagnostics.warn(
            name,
            format!(
                "space unit {} of the diffusion coefficient does not match the domain unit {}; \
                 automatic space-unit conversion disabled for this substrate",
                parsed.length, space.unit
            ),
        );
        flags.space = false;
    } else if parsed.exponent != 2 {
        diagnostics.warn(
            name,
            format!(
                "diffusion coefficient unit {unit} is not an area per time; \
                 automatic space-unit conversion disabled for this substrate"
            ),
        );
        flags.space = false;
    }
    let time_matches = match (parsed.time.as_deref(), time.unit.as_deref()) {
        (Some(own), Some(global)) => units.time.equivalent(own, global),
        _ => false,
    };
    if !time_matches {
        diagnostics.warn(
            name,
            format!(
                "time unit {} of the diffusion coefficient does not match the global time unit {}; \
                 automatic time-unit conversion disabled for this substrate",
                parsed.time.as_deref().unwrap_or("none"),
                time.unit.as_deref().unwrap_or("none")
            ),
        );
        flags.time = false;
    }
    flags
}

fn substrate(
    name: &str,
    variable: &Node,
    space: &SpaceConversion,
    time: &TimeConversion,
    options: &ExtractOptions,
    diagnostics: &mut Diagnostics,
) -> Result<SubstrateRecord> {
    let key = normalize_name(name);
    let parameters = variable.get("physical_parameter_set");
    let coefficient = parameters.and_then(|p| p.get("diffusion_coefficient"));
    let decay_rate = parameters.and_then(|p| p.get("decay_rate"));

    let raw_diffusion = required_number(
        &key,
        "physical_parameter_set.diffusion_coefficient",
        coefficient,
    )?;
    let raw_decay = required_number(&key, "physical_parameter_set.decay_rate", decay_rate)?;
    let diffusion_unit = coefficient.and_then(|c| c.attr("units")).map(str::to_string);

    let autoconvert = substrate_flags(
        &key,
        diffusion_unit.as_deref(),
        space,
        time,
        &options.units,
        diagnostics,
    );
    let s = if autoconvert.space { space.factor } else { 1.0 };
    let t = if autoconvert.time { time.factor } else { 1.0 };
    let time_unit = time.unit.as_deref().unwrap_or("none");

    let diffusion_factor = s * s / t;
    let (equivalence, source_unit) = if autoconvert.space && autoconvert.time {
        (
            format!(
                "1 lattice site^2/step = {diffusion_factor} {}^2/{time_unit}",
                space.unit
            ),
            format!("{}^2/{time_unit}", space.unit),
        )
    } else {
        (DISABLED.to_string(), UNKNOWN_SOURCE_UNIT.to_string())
    };
    let diffusion = ConvertedRate {
        raw: raw_diffusion,
        unit: diffusion_unit,
        value: raw_diffusion * s * s / t,
        factor: diffusion_factor,
        equivalence,
        source_unit,
    };

    let decay_factor = 1.0 / t;
    let (equivalence, source_unit) = if autoconvert.time {
        (
            format!("1/step = {decay_factor} 1/{time_unit}"),
            format!("1/{time_unit}"),
        )
    } else {
        (DISABLED.to_string(), UNKNOWN_SOURCE_UNIT.to_string())
    };
    let decay = ConvertedRate {
        raw: raw_decay,
        unit: decay_rate.and_then(|d| d.attr("units")).map(str::to_string),
        value: raw_decay / t,
        factor: decay_factor,
        equivalence,
        source_unit,
    };

    let initial_condition = quantity(&key, "initial_condition", variable.get("initial_condition"))?;
    let dirichlet = variable
        .get("Dirichlet_boundary_condition")
        .map(|node| {
            Ok::<_, ExtractError>(Dirichlet {
                enabled: node.attr("enabled").is_some_and(parse_flag),
                value: number(&key, "Dirichlet_boundary_condition", Some(node))?,
            })
        })
        .transpose()?;

    let use_steady_state = diffusion.value > options.steady_state_threshold;
    debug!(
        substrate = %key,
        diffusion = diffusion.value,
        decay = decay.value,
        use_steady_state,
        "extracted substrate"
    );

    Ok(SubstrateRecord {
        name: name.to_string(),
        concentration_units: variable.attr("units").map(str::to_string),
        diffusion,
        decay,
        autoconvert,
        use_steady_state,
        initial_condition,
        dirichlet,
    })
}

/// Extract every `microenvironment_setup.variable`.
pub fn extract_substrates(
    tree: &ModelTree,
    space: &SpaceConversion,
    time: &TimeConversion,
    options: &ExtractOptions,
    diagnostics: &mut Diagnostics,
) -> Extracted<IndexMap<String, SubstrateRecord>> {
    let mut extracted = Extracted::default();
    let variables = tree
        .section("microenvironment_setup")
        .and_then(|section| section.get("variable"));
    let Some(variables) = variables else {
        diagnostics.hint("microenvironment_setup", "model declares no diffusing substrates");
        return extracted;
    };

    for (index, variable) in variables.seq().iter().enumerate() {
        let Some(name) = variable.attr("name") else {
            extracted
                .failures
                .push(ExtractError::missing(&format!("variable[{index}]"), "@name"));
            continue;
        };
        match substrate(name, variable, space, time, options, diagnostics) {
            Ok(record) => insert_normalized(&mut extracted.items, name, record, diagnostics),
            Err(err) => extracted.failures.push(err),
        }
    }
    extracted
}
