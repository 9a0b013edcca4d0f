//! Phenotype codes
//!
//! The source model identifies cycle and death models by numeric code. Codes
//! resolve through a [`PhenotypeCodes`] table into the closed
//! [`PhenotypeVariant`] enumeration; a code missing from the table is kept
//! verbatim as [`PhenotypeCode::Unrecognized`].

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Named behavioural model for cell cycle progression or death.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PhenotypeVariant {
    #[serde(rename = "Ki67 Advanced")]
    Ki67Advanced,
    #[serde(rename = "Ki67 Basic")]
    Ki67Basic,
    #[serde(rename = "Flow Cytometry Basic")]
    FlowCytometryBasic,
    #[serde(rename = "Flow Cytometry Advanced")]
    FlowCytometryAdvanced,
    #[serde(rename = "Simple Live")]
    SimpleLive,
    #[serde(rename = "Standard apoptosis model")]
    StandardApoptosis,
    #[serde(rename = "Standard necrosis model")]
    StandardNecrosis,
}

impl PhenotypeVariant {
    /// Recorded for a cycle model whose code is unknown.
    pub const CYCLE_FALLBACK: PhenotypeVariant = PhenotypeVariant::SimpleLive;

    /// Recorded for a death model whose code is unknown.
    pub const DEATH_FALLBACK: PhenotypeVariant = PhenotypeVariant::StandardApoptosis;

    pub const fn name(&self) -> &'static str {
        match self {
            PhenotypeVariant::Ki67Advanced => "Ki67 Advanced",
            PhenotypeVariant::Ki67Basic => "Ki67 Basic",
            PhenotypeVariant::FlowCytometryBasic => "Flow Cytometry Basic",
            PhenotypeVariant::FlowCytometryAdvanced => "Flow Cytometry Advanced",
            PhenotypeVariant::SimpleLive => "Simple Live",
            PhenotypeVariant::StandardApoptosis => "Standard apoptosis model",
            PhenotypeVariant::StandardNecrosis => "Standard necrosis model",
        }
    }

    pub const fn is_death_model(&self) -> bool {
        matches!(
            self,
            PhenotypeVariant::StandardApoptosis | PhenotypeVariant::StandardNecrosis
        )
    }

    /// Phase count of the variant's death sub-model: apoptosis has a single
    /// phase, necrosis an unlysed and a lysed one.
    pub const fn death_phase_count(&self) -> usize {
        match self {
            PhenotypeVariant::StandardNecrosis => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for PhenotypeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Source code a phenotype entry was resolved from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", content = "code", rename_all = "snake_case")]
pub enum PhenotypeCode {
    Known(String),
    /// Not in the code table; the entry holds the fallback variant.
    Unrecognized(String),
}

impl PhenotypeCode {
    pub fn raw(&self) -> &str {
        match self {
            PhenotypeCode::Known(code) | PhenotypeCode::Unrecognized(code) => code,
        }
    }

    pub fn is_recognized(&self) -> bool {
        matches!(self, PhenotypeCode::Known(_))
    }
}

const BUILTIN_CODES: &[(&str, PhenotypeVariant)] = &[
    ("0", PhenotypeVariant::Ki67Advanced),
    ("1", PhenotypeVariant::Ki67Basic),
    ("2", PhenotypeVariant::FlowCytometryBasic),
    ("5", PhenotypeVariant::SimpleLive),
    ("6", PhenotypeVariant::FlowCytometryAdvanced),
    ("7", PhenotypeVariant::Ki67Basic),
    ("100", PhenotypeVariant::StandardApoptosis),
    ("101", PhenotypeVariant::StandardNecrosis),
];

/// Code → variant table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhenotypeCodes {
    table: IndexMap<String, PhenotypeVariant>,
}

impl Default for PhenotypeCodes {
    fn default() -> Self {
        Self {
            table: BUILTIN_CODES
                .iter()
                .map(|(code, variant)| (code.to_string(), *variant))
                .collect(),
        }
    }
}

impl PhenotypeCodes {
    pub fn empty() -> Self {
        Self {
            table: IndexMap::new(),
        }
    }

    pub fn lookup(&self, code: &str) -> Option<PhenotypeVariant> {
        self.table.get(code.trim()).copied()
    }

    /// Resolve a code, substituting `fallback` for unknown ones.
    pub fn resolve(&self, code: &str, fallback: PhenotypeVariant) -> (PhenotypeVariant, PhenotypeCode) {
        match self.lookup(code) {
            Some(variant) => (variant, PhenotypeCode::Known(code.trim().to_string())),
            None => (fallback, PhenotypeCode::Unrecognized(code.to_string())),
        }
    }

    pub fn insert(&mut self, code: impl Into<String>, variant: PhenotypeVariant) {
        self.table.insert(code.into(), variant);
    }

    pub fn extend(&mut self, other: &PhenotypeCodes) {
        for (code, variant) in &other.table {
            self.table.insert(code.clone(), *variant);
        }
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }
}
