// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Unit vocabularies for lattice model extraction
//!
//! Source models declare their quantities in free-form unit strings
//! (`micron`, `min`, `micron^2/min`, ...). This crate provides the two pieces
//! the extractors need before any conversion arithmetic is trustworthy:
//!
//! - [`UnitTable`]: name → factor to the canonical base unit of one
//!   dimension (meters for length, minutes for time). Tables are plain
//!   values: callers start from [`UnitTables::default`] and extend or
//!   replace entries per call.
//! - [`CompoundUnit`]: a small parser for the
//!   `<length-unit>["^"<int>]["/"<time-unit>]` grammar used by volumes and
//!   diffusion coefficients.
//!
//! # Examples
//!
//! ```rust
//! # use lattice_units::*;
//! let tables = UnitTables::default();
//! assert_eq!(tables.length.lookup("micron"), Some(1e-6));
//! assert!(tables.time.equivalent("min", "minutes"));
//!
//! let d: CompoundUnit = "micron^2/min".parse().unwrap();
//! assert_eq!(d.length, "micron");
//! assert_eq!(d.exponent, 2);
//! assert_eq!(d.time.as_deref(), Some("min"));
//! ```

pub mod compound;
pub mod table;

pub use compound::{CompoundUnit, UnitParseError};
pub use table::{Dimension, UnitTable, UnitTables};
