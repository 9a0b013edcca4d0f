//! Time conversion
//!
//! Maps the physical simulated duration onto a count of discrete steps and
//! derives the time-conversion factor (discrete steps per physical time
//! unit).

use lattice_units::UnitTable;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::diagnostics::Diagnostics;
use crate::error::{ExtractError, Result};
use crate::read::{number, quantity};
use crate::tree::{ModelTree, Node};

const SCOPE: &str = "overall";

/// Simulated duration assumed when `overall.max_time` is absent.
pub const DEFAULT_MAX_TIME: f64 = 100_000.0;

/// Time half of the dimensional conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeConversion {
    /// Source duration in `unit`.
    pub max_time: f64,
    /// Global time unit (`overall.time_units`).
    pub unit: Option<String>,
    /// Source mechanics time step.
    pub dt_mechanics: f64,
    /// Discrete steps covering `max_time`.
    pub steps: u64,
    /// Discrete steps per physical time unit.
    pub factor: f64,
    /// `1 discrete step = f <unit>`
    pub equivalence: String,
    pub autoconvert: bool,
}

impl TimeConversion {
    /// `factor` when autoconversion is enabled, otherwise 1.
    pub fn effective_factor(&self) -> f64 {
        if self.autoconvert {
            self.factor
        } else {
            1.0
        }
    }
}

/// Compute the step count and time-conversion factor.
pub fn convert_time(
    tree: &ModelTree,
    units: &UnitTable,
    diagnostics: &mut Diagnostics,
) -> Result<TimeConversion> {
    let overall = tree.section("overall");
    let field = |key: &str| overall.and_then(|o| o.get(key));

    let max_time = quantity(SCOPE, "max_time", field("max_time"))?;
    let unit = field("time_units")
        .and_then(Node::text)
        .map(|u| u.trim().to_string());

    let max_time_unit = max_time.as_ref().and_then(|q| q.unit.as_deref());
    let consistent = match (max_time_unit, unit.as_deref()) {
        (Some(a), Some(b)) => units.equivalent(a, b),
        (a, b) => a == b,
    };
    if !consistent {
        diagnostics.warn(
            SCOPE,
            format!(
                "max_time units ({}) differ from time_units ({}); using {}",
                max_time_unit.unwrap_or("none"),
                unit.as_deref().unwrap_or("none"),
                unit.as_deref().unwrap_or("none"),
            ),
        );
    }
    let max_time = max_time.map_or(DEFAULT_MAX_TIME, |q| q.value);

    let mut autoconvert = true;
    match unit.as_deref() {
        Some(name) if units.contains(name) => {}
        other => {
            diagnostics.warn(
                SCOPE,
                format!(
                    "{} is not a known time unit; automatic time-unit conversion disabled. \
                     Known units: {}",
                    other.unwrap_or("none"),
                    units.vocabulary()
                ),
            );
            autoconvert = false;
        }
    }

    let dt_mechanics = number(SCOPE, "dt_mechanics", field("dt_mechanics"))?;
    let dt_mechanics = match dt_mechanics {
        Some(dt) if dt.is_finite() && dt > 0.0 => dt,
        value => return Err(ExtractError::InvalidTimeStep { value }),
    };

    let steps = (max_time / dt_mechanics).round_ties_even();
    if !(steps.is_finite() && steps >= 1.0) {
        return Err(ExtractError::ZeroSteps {
            max_time,
            dt_mechanics,
        });
    }

    let factor = steps / max_time;
    let equivalence = format!(
        "1 discrete step = {factor} {}",
        unit.as_deref().unwrap_or("unspecified units")
    );

    debug!(steps, factor, autoconvert, "time conversion");

    Ok(TimeConversion {
        max_time,
        unit,
        dt_mechanics,
        steps: steps as u64,
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

    fn run(value: serde_json::Value) -> (Result<TimeConversion>, Diagnostics) {
        let tree: ModelTree = serde_json::from_value(value).unwrap();
        let mut diagnostics = Diagnostics::new();
        let result = convert_time(&tree, &UnitTables::default().time, &mut diagnostics);
        (result, diagnostics)
    }

    #[test]
    fn test_step_count_and_factor() {
        let (time, diagnostics) = run(json!({"overall": {
            "max_time": {"@units": "min", "#text": "1000"},
            "time_units": "min",
            "dt_mechanics": {"@units": "min", "#text": "0.1"}
        }}));
        let time = time.unwrap();
        assert_eq!(time.steps, 10_000);
        assert_eq!(time.factor, 10.0);
        assert!(time.autoconvert);
        assert_eq!(time.equivalence, "1 discrete step = 10 min");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_default_max_time() {
        let (time, _) = run(json!({"overall": {"time_units": "min", "dt_mechanics": "1"}}));
        let time = time.unwrap();
        assert_eq!(time.max_time, DEFAULT_MAX_TIME);
        assert_eq!(time.steps, 100_000);
    }

    #[test]
    fn test_unit_mismatch_uses_global_unit() {
        let (time, diagnostics) = run(json!({"overall": {
            "max_time": {"@units": "hour", "#text": "10"},
            "time_units": "min",
            "dt_mechanics": "0.5"
        }}));
        let time = time.unwrap();
        assert_eq!(time.unit.as_deref(), Some("min"));
        assert!(time.autoconvert);
        assert!(diagnostics.iter().any(|d| d.message.contains("differ")));
    }

    #[test]
    fn test_aliases_are_consistent() {
        let (_, diagnostics) = run(json!({"overall": {
            "max_time": {"@units": "minute", "#text": "10"},
            "time_units": "min",
            "dt_mechanics": "1"
        }}));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_unknown_unit_disables_autoconversion() {
        let (time, diagnostics) = run(json!({"overall": {
            "max_time": {"@units": "tick", "#text": "10"},
            "time_units": "tick",
            "dt_mechanics": "1"
        }}));
        let time = time.unwrap();
        assert!(!time.autoconvert);
        assert_eq!(time.effective_factor(), 1.0);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_missing_time_unit_disables_autoconversion() {
        let (time, _) = run(json!({"overall": {"max_time": "10", "dt_mechanics": "1"}}));
        let time = time.unwrap();
        assert!(!time.autoconvert);
        assert_eq!(time.equivalence, "1 discrete step = 1 unspecified units");
    }

    #[test]
    fn test_invalid_time_step() {
        let (result, _) = run(json!({"overall": {"time_units": "min"}}));
        assert_eq!(result, Err(ExtractError::InvalidTimeStep { value: None }));

        let (result, _) = run(json!({"overall": {"time_units": "min", "dt_mechanics": "0"}}));
        assert_eq!(result, Err(ExtractError::InvalidTimeStep { value: Some(0.0) }));

        let (result, _) = run(json!({"overall": {"time_units": "min", "dt_mechanics": "-2"}}));
        assert!(matches!(result, Err(ExtractError::InvalidTimeStep { .. })));
    }

    #[test]
    fn test_zero_steps() {
        let (result, _) = run(json!({"overall": {
            "max_time": "1",
            "time_units": "min",
            "dt_mechanics": "10"
        }}));
        assert!(matches!(result, Err(ExtractError::ZeroSteps { .. })));
    }
}
