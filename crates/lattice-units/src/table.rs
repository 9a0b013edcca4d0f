//! Named unit tables
//!
//! Each table maps a unit name to its factor relative to the canonical base
//! unit of a single dimension. Lookups are exact and case-sensitive; aliases
//! are separate entries with the same factor.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Physical dimension covered by a [`UnitTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    /// Canonical unit: meter
    Length,
    /// Canonical unit: minute
    Time,
}

impl Dimension {
    /// Name of the canonical unit factors are expressed against.
    pub const fn canonical_unit(&self) -> &'static str {
        match self {
            Dimension::Length => "meter",
            Dimension::Time => "minute",
        }
    }
}

/// Built-in length units, factor in meters per unit.
const LENGTH_UNITS: &[(&[&str], f64)] = &[
    (&["micron", "micrometer", "micro", "um"], 1e-6),
    (&["milli", "millimeter", "mm"], 1e-3),
    (&["nano", "nanometer", "nm"], 1e-9),
    (&["meter", "m"], 1.0),
];

/// Built-in time units, factor in minutes per unit.
const TIME_UNITS: &[(&[&str], f64)] = &[
    (&["millisecond", "milliseconds"], 1e-3 / 60.0),
    (&["microsecond", "microseconds"], 1e-6 / 60.0),
    (&["second", "seconds", "s"], 1.0 / 60.0),
    (&["hour", "hours", "h"], 60.0),
    (&["day", "days"], 24.0 * 60.0),
    (&["week", "weeks"], 7.0 * 24.0 * 60.0),
    (&["minute", "minutes", "min"], 1.0),
];

/// Mapping from unit name to conversion factor into the canonical unit.
///
/// Insertion order is preserved so that listings of the known vocabulary
/// (e.g. in an "unknown unit" diagnostic) are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitTable {
    entries: IndexMap<String, f64>,
}

impl UnitTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in vocabulary for a dimension.
    pub fn builtin(dimension: Dimension) -> Self {
        let source = match dimension {
            Dimension::Length => LENGTH_UNITS,
            Dimension::Time => TIME_UNITS,
        };
        let mut table = Self::new();
        for (aliases, factor) in source {
            for alias in *aliases {
                table.insert(*alias, *factor);
            }
        }
        table
    }

    /// Factor to the canonical unit, or `None` for an unknown name.
    pub fn lookup(&self, name: &str) -> Option<f64> {
        self.entries.get(name).copied()
    }

    /// Whether `name` is part of this vocabulary.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Add or replace a unit. Returns the previous factor, if any.
    pub fn insert(&mut self, name: impl Into<String>, factor: f64) -> Option<f64> {
        self.entries.insert(name.into(), factor)
    }

    /// Builder method: add or replace a unit.
    pub fn with_unit(mut self, name: impl Into<String>, factor: f64) -> Self {
        self.insert(name, factor);
        self
    }

    /// Add or replace every entry of `other`.
    pub fn extend(&mut self, other: &UnitTable) {
        for (name, factor) in &other.entries {
            self.entries.insert(name.clone(), *factor);
        }
    }

    /// Known unit names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Express `value` (in `unit`) in the canonical unit.
    pub fn to_canonical(&self, value: f64, unit: &str) -> Option<f64> {
        self.lookup(unit).map(|factor| value * factor)
    }

    /// Express a canonical `value` in `unit`.
    pub fn from_canonical(&self, value: f64, unit: &str) -> Option<f64> {
        self.lookup(unit).map(|factor| value / factor)
    }

    /// Two names denote the same unit: identical, or both known with equal
    /// factors (aliases such as `min` and `minute`).
    pub fn equivalent(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        match (self.lookup(a), self.lookup(b)) {
            (Some(fa), Some(fb)) => (fa - fb).abs() <= f64::EPSILON * fa.abs().max(fb.abs()),
            _ => false,
        }
    }

    /// Comma-separated list of the known names, for diagnostics.
    pub fn vocabulary(&self) -> String {
        self.names().collect::<Vec<_>>().join(", ")
    }
}

/// The pair of tables consulted by one extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitTables {
    /// Length units, factors in meters
    #[serde(default)]
    pub length: UnitTable,
    /// Time units, factors in minutes
    #[serde(default)]
    pub time: UnitTable,
}

impl Default for UnitTables {
    fn default() -> Self {
        Self {
            length: UnitTable::builtin(Dimension::Length),
            time: UnitTable::builtin(Dimension::Time),
        }
    }
}

impl UnitTables {
    /// Tables with no entries, the starting point for override sets.
    pub fn empty() -> Self {
        Self {
            length: UnitTable::new(),
            time: UnitTable::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.length.is_empty() && self.time.is_empty()
    }

    /// Table for a dimension.
    pub fn table(&self, dimension: Dimension) -> &UnitTable {
        match dimension {
            Dimension::Length => &self.length,
            Dimension::Time => &self.time,
        }
    }

    /// Layer `overrides` on top of these tables.
    pub fn merged(mut self, overrides: &UnitTables) -> Self {
        self.length.extend(&overrides.length);
        self.time.extend(&overrides.time);
        self
    }
}
