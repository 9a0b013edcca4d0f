//! Geometry conversion
//!
//! Derives the lattice dimensions and the space-conversion factor (lattice
//! sites per physical length unit) from the source domain box.
//!
//! The lattice is isotropic: the discretization step is the smallest of
//! `dx`, `dy`, `dz`, clamped to at least 1.

use lattice_units::UnitTable;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::read::number_at;
use crate::tree::{ModelTree, Node};

const SCOPE: &str = "domain";

/// Length unit assumed when `overall.space_units` is absent.
pub const DEFAULT_SPACE_UNIT: &str = "micron";

/// One axis of the source domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Rounded physical extent; 1 for a missing or degenerate axis.
    pub extent: f64,
    /// Lattice sites along the axis.
    pub sites: u32,
}

/// Space half of the dimensional conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceConversion {
    pub x: Axis,
    pub y: Axis,
    pub z: Axis,
    /// Declared length unit.
    pub unit: String,
    /// Isotropic discretization step in physical units.
    pub step: f64,
    /// Lattice sites per physical unit.
    pub factor: f64,
    /// `1 lattice site = f <unit>`
    pub equivalence: String,
    /// False when the unit is unknown; `factor` must not be applied then.
    pub autoconvert: bool,
}

impl SpaceConversion {
    /// The factor to multiply by: `factor` when autoconversion is enabled,
    /// otherwise the identity.
    pub fn effective_factor(&self) -> f64 {
        if self.autoconvert {
            self.factor
        } else {
            1.0
        }
    }

    pub fn lattice_dims(&self) -> [u32; 3] {
        [self.x.sites, self.y.sites, self.z.sites]
    }
}

fn axis(
    domain: Option<&Node>,
    name: &str,
    step: f64,
    diagnostics: &mut Diagnostics,
) -> Result<Axis> {
    let (min, max) = match domain {
        Some(domain) => (
            number_at(SCOPE, domain, &format!("{name}_min"))?,
            number_at(SCOPE, domain, &format!("{name}_max"))?,
        ),
        None => (None, None),
    };

    let (Some(lo), Some(hi)) = (min, max) else {
        return Ok(Axis {
            min,
            max,
            extent: 1.0,
            sites: 1,
        });
    };

    let extent = (hi - lo).round_ties_even();
    if extent <= 0.0 {
        diagnostics.warn(
            SCOPE,
            format!(
                "{name} axis has non-positive extent ({name}_min={lo}, {name}_max={hi}); \
                 treating it as degenerate"
            ),
        );
        return Ok(Axis {
            min,
            max,
            extent: 1.0,
            sites: 1,
        });
    }

    let mut sites = (extent / step).round_ties_even() as u32;
    if sites == 0 {
        diagnostics.warn(
            SCOPE,
            format!("{name} axis extent {extent} is smaller than the step {step}; using 1 site"),
        );
        sites = 1;
    }

    Ok(Axis {
        min,
        max,
        extent,
        sites,
    })
}

/// Compute lattice dimensions and the space-conversion factor.
pub fn convert_space(
    tree: &ModelTree,
    units: &UnitTable,
    diagnostics: &mut Diagnostics,
) -> Result<SpaceConversion> {
    let domain = tree.section("domain");

    let unit = tree
        .section("overall")
        .and_then(|overall| overall.get("space_units"))
        .and_then(Node::text)
        .map(|u| u.trim().to_string())
        .unwrap_or_else(|| DEFAULT_SPACE_UNIT.to_string());

    let mut autoconvert = true;
    if !units.contains(&unit) {
        diagnostics.warn(
            SCOPE,
            format!(
                "{unit} is not a known space unit; automatic space-unit conversion disabled. \
                 Known units: {}",
                units.vocabulary()
            ),
        );
        autoconvert = false;
    }

    let mut steps = [1.0; 3];
    if let Some(domain) = domain {
        for (slot, key) in steps.iter_mut().zip(["dx", "dy", "dz"]) {
            if let Some(value) = number_at(SCOPE, domain, key)? {
                *slot = value;
            }
        }
    }
    let [dx, dy, dz] = steps;
    let step = dx.min(dy).min(dz).max(1.0);
    if dx != dy || dy != dz {
        diagnostics.warn(
            SCOPE,
            format!("dx/dy/dz are not all the same: dx={dx}, dy={dy}, dz={dz}; using {step}"),
        );
    }

    let x = axis(domain, "x", step, diagnostics)?;
    let y = axis(domain, "y", step, diagnostics)?;
    let z = axis(domain, "z", step, diagnostics)?;

    let factor = f64::from(x.sites) / x.extent;
    let equivalence = format!("1 lattice site = {factor} {unit}");

    debug!(
        dims = ?[x.sites, y.sites, z.sites],
        factor,
        autoconvert,
        "space conversion"
    );

    Ok(SpaceConversion {
        x,
        y,
        z,
        unit,
        step,
        factor,
        equivalence,
        autoconvert,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_units::UnitTables;
    use serde_json::json;

    fn tree(value: serde_json::Value) -> ModelTree {
        serde_json::from_value(value).unwrap()
    }

    fn convert(value: serde_json::Value) -> (SpaceConversion, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let space = convert_space(&tree(value), &UnitTables::default().length, &mut diagnostics)
            .unwrap();
        (space, diagnostics)
    }

    #[test]
    fn test_lattice_dimension_and_factor() {
        let (space, diagnostics) = convert(json!({
            "domain": {"x_min": "0", "x_max": "100", "dx": "2", "dy": "2", "dz": "2"},
            "overall": {"space_units": "micron"}
        }));
        assert_eq!(space.x.sites, 50);
        assert_eq!(space.factor, 0.5);
        assert!(space.autoconvert);
        assert_eq!(space.effective_factor(), 0.5);
        assert_eq!(space.equivalence, "1 lattice site = 0.5 micron");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_unknown_unit_disables_autoconversion() {
        let (space, diagnostics) = convert(json!({
            "domain": {"x_min": "0", "x_max": "100", "dx": "2", "dy": "2", "dz": "2"},
            "overall": {"space_units": "furlong"}
        }));
        assert!(!space.autoconvert);
        assert_eq!(space.effective_factor(), 1.0);
        assert_eq!(space.unit, "furlong");
        assert_eq!(diagnostics.for_scope("domain").count(), 1);
    }

    #[test]
    fn test_missing_bounds_degenerate_axes() {
        let (space, _) = convert(json!({
            "domain": {"x_min": "-500", "x_max": "500", "dx": "20", "dy": "20", "dz": "20"}
        }));
        assert_eq!(space.unit, DEFAULT_SPACE_UNIT);
        assert_eq!(space.lattice_dims(), [50, 1, 1]);
        assert_eq!(space.y.extent, 1.0);
        assert_eq!(space.z.min, None);
        assert_eq!(space.factor, 0.05);
    }

    #[test]
    fn test_z_axis_uses_its_own_bounds() {
        let (space, _) = convert(json!({
            "domain": {
                "x_min": "0", "x_max": "100",
                "y_min": "0", "y_max": "400",
                "z_min": "-10", "z_max": "10",
                "dx": "10", "dy": "10", "dz": "10"
            }
        }));
        assert_eq!(space.z.extent, 20.0);
        assert_eq!(space.lattice_dims(), [10, 40, 2]);
    }

    #[test]
    fn test_anisotropic_step_uses_smallest() {
        let (space, diagnostics) = convert(json!({
            "domain": {"x_min": "0", "x_max": "100", "dx": "5", "dy": "10", "dz": "20"}
        }));
        assert_eq!(space.step, 5.0);
        assert_eq!(space.x.sites, 20);
        assert!(diagnostics.iter().any(|d| d.message.contains("not all the same")));
    }

    #[test]
    fn test_step_is_clamped_to_one() {
        let (space, _) = convert(json!({
            "domain": {"x_min": "0", "x_max": "10", "dx": "0.5", "dy": "0.5", "dz": "0.5"}
        }));
        assert_eq!(space.step, 1.0);
        assert_eq!(space.x.sites, 10);
    }

    #[test]
    fn test_missing_domain_is_best_effort() {
        let (space, diagnostics) = convert(json!({}));
        assert_eq!(space.lattice_dims(), [1, 1, 1]);
        assert_eq!(space.factor, 1.0);
        assert!(space.autoconvert);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_inverted_bounds_are_reported() {
        let (space, diagnostics) = convert(json!({
            "domain": {"x_min": "100", "x_max": "0"}
        }));
        assert_eq!(space.x.extent, 1.0);
        assert!(diagnostics.has_warnings());
    }

    #[test]
    fn test_malformed_number_is_fatal() {
        let mut diagnostics = Diagnostics::new();
        let result = convert_space(
            &tree(json!({"domain": {"dx": "wide"}})),
            &UnitTables::default().length,
            &mut diagnostics,
        );
        assert!(matches!(
            result,
            Err(crate::ExtractError::InvalidNumber { field, .. }) if field == "dx"
        ));
    }
}
