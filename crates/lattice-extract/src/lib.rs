//! Lattice Extract
//!
//! Turns a unit-bearing cell model tree into a dimensionless parameter set
//! for a lattice simulator: lattice dimensions, discrete step counts, and
//! every cell volume, phase duration, diffusion coefficient and secretion
//! rate the model declares, with the space and time conversion applied
//! wherever the model's units allow it.
//!
//! ```
//! use lattice_extract::{extract, ExtractOptions, ModelTree};
//!
//! let tree: ModelTree = serde_json::from_str(r#"{
//!     "domain": {"x_min": "0", "x_max": "100", "dx": "2", "dy": "2", "dz": "2"},
//!     "overall": {"time_units": "min", "dt_mechanics": "0.1", "max_time": "1000"}
//! }"#).unwrap();
//!
//! let set = extract(&tree, &ExtractOptions::default()).unwrap();
//! assert_eq!(set.space.factor, 0.5);
//! assert_eq!(set.time.steps, 10_000);
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod cell;
pub mod config;
pub mod diagnostics;
pub mod diffusion;
pub mod error;
pub mod geometry;
pub mod options;
pub mod pipeline;
pub mod read;
pub mod secretion;
pub mod time;
pub mod tree;

pub use cell::{CellTypeRecord, CellVolume, PhenotypeCode, PhenotypeCodes, PhenotypeVariant};
pub use config::{ConfigError, ExtractConfig, ExtractOptions};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use diffusion::SubstrateRecord;
pub use error::{ExtractError, Result};
pub use geometry::SpaceConversion;
pub use options::SimulationOptions;
pub use pipeline::{extract, Extracted, ParameterSet};
pub use read::Quantity;
pub use secretion::{SecretionRecord, SecretionTable};
pub use time::TimeConversion;
pub use tree::{ModelTree, Node};
