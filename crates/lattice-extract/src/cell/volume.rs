//! Cell volume conversion into lattice sites

use indexmap::IndexMap;
use lattice_units::{CompoundUnit, UnitTable};
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::geometry::SpaceConversion;
use crate::read::quantity;
use crate::tree::Node;

/// Unit recorded for a volume without a value or unit.
pub const UNSPECIFIED_UNIT: &str = "not specified";

/// Total cell volume in source and lattice units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellVolume {
    /// Source value, `None` when the volume is incomplete.
    pub value: Option<f64>,
    pub unit: String,
    /// Volume in lattice sites.
    pub lattice: Option<f64>,
    /// Whether the space factor was applied.
    pub autoconverted: bool,
}

impl CellVolume {
    fn unspecified() -> Self {
        Self {
            value: None,
            unit: UNSPECIFIED_UNIT.to_string(),
            lattice: None,
            autoconverted: false,
        }
    }
}

/// Convert `phenotype.volume.total` of one cell definition.
pub(crate) fn convert_volume(
    cell_type: &str,
    definition: &Node,
    space: &SpaceConversion,
    units: &UnitTable,
    diagnostics: &mut Diagnostics,
) -> Result<CellVolume> {
    let total = quantity(
        cell_type,
        "phenotype.volume.total",
        definition.path(&["phenotype", "volume", "total"]),
    )?;

    let Some((value, unit)) = total.and_then(|q| q.unit.map(|unit| (q.value, unit))) else {
        diagnostics.warn(
            cell_type,
            "cell volume is missing its value or unit; no lattice volume computed",
        );
        return Ok(CellVolume::unspecified());
    };

    let parsed = match CompoundUnit::parse(&unit) {
        Ok(parsed) => parsed,
        Err(err) => {
            diagnostics.warn(
                cell_type,
                format!("cannot read volume unit: {err}; volume left unconverted"),
            );
            return Ok(CellVolume {
                value: Some(value),
                unit,
                lattice: Some(value),
                autoconverted: false,
            });
        }
    };

    if !units.equivalent(&parsed.length, &space.unit) {
        diagnostics.warn(
            cell_type,
            format!(
                "volume unit {unit} does not match the domain unit {}; volume left unconverted",
                space.unit
            ),
        );
        return Ok(CellVolume {
            value: Some(value),
            unit,
            lattice: Some(value),
            autoconverted: false,
        });
    }

    let lattice = value * space.effective_factor().powi(i32::from(parsed.exponent));
    Ok(CellVolume {
        value: Some(value),
        unit,
        lattice: Some(lattice),
        autoconverted: space.autoconvert,
    })
}

/// Lattice volumes of every cell type against the minimum volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeSummary {
    pub minimum_volume: f64,
    /// At least one type's lattice volume is below `minimum_volume`.
    pub any_below_minimum: bool,
    /// Lattice volume per cell type, in declaration order.
    pub volumes: IndexMap<String, Option<f64>>,
}

impl VolumeSummary {
    /// Cell types whose lattice volume is below the minimum.
    pub fn below_minimum(&self) -> impl Iterator<Item = &str> {
        self.volumes
            .iter()
            .filter(|(_, v)| v.is_some_and(|v| v < self.minimum_volume))
            .map(|(name, _)| name.as_str())
    }
}

/// Check every lattice volume against `minimum_volume`.
///
/// Volumes are reported, never rescaled.
pub fn summarize_volumes<'a>(
    volumes: impl IntoIterator<Item = (&'a str, &'a CellVolume)>,
    minimum_volume: f64,
    diagnostics: &mut Diagnostics,
) -> VolumeSummary {
    let mut summary = VolumeSummary {
        minimum_volume,
        any_below_minimum: false,
        volumes: IndexMap::new(),
    };
    for (name, volume) in volumes {
        if let Some(lattice) = volume.lattice.filter(|v| *v < minimum_volume) {
            summary.any_below_minimum = true;
            diagnostics.warn(
                name,
                format!(
                    "converted cell volume {lattice} is below the minimum of {minimum_volume} \
                     lattice sites; cells this small may not keep their shape"
                ),
            );
        }
        summary.volumes.insert(name.to_string(), volume.lattice);
    }
    summary
}
