//! Compound unit strings
//!
//! Grammar accepted by [`CompoundUnit::parse`]:
//!
//! ```text
//! compound := name [ "^" int ] [ "/" name ]
//! name     := ( alphanumeric | "_" )+
//! int      := [ "-" ] digit+
//! ```
//!
//! Surrounding whitespace is ignored. `micron^3` is a volume, `micron^2/min`
//! a diffusion coefficient, `1/min` a rate (length part `1`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from parsing a compound unit string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitParseError {
    #[error("empty unit string")]
    Empty,

    #[error("invalid unit name '{name}' in '{input}'")]
    InvalidName { input: String, name: String },

    #[error("invalid exponent '{exponent}' in '{input}'")]
    InvalidExponent { input: String, exponent: String },

    #[error("more than one '/' in '{0}'")]
    MultipleDivisions(String),
}

/// A parsed `<length>^k/<time>` unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompoundUnit {
    /// Base unit before the exponent
    pub length: String,
    /// Power of the base unit (1 when omitted)
    pub exponent: i8,
    /// Denominator unit, if any
    pub time: Option<String>,
}

impl CompoundUnit {
    pub fn parse(input: &str) -> Result<Self, UnitParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(UnitParseError::Empty);
        }

        let mut halves = trimmed.split('/');
        let numerator = halves.next().unwrap_or_default();
        let denominator = halves.next();
        if halves.next().is_some() {
            return Err(UnitParseError::MultipleDivisions(input.to_string()));
        }

        let (base, exponent) = match numerator.split_once('^') {
            Some((base, exp)) => {
                let exp = exp.trim();
                let parsed = exp
                    .parse::<i8>()
                    .map_err(|_| UnitParseError::InvalidExponent {
                        input: input.to_string(),
                        exponent: exp.to_string(),
                    })?;
                (base.trim(), parsed)
            }
            None => (numerator.trim(), 1),
        };
        validate_name(input, base)?;

        let time = match denominator {
            Some(name) => {
                let name = name.trim();
                validate_name(input, name)?;
                Some(name.to_string())
            }
            None => None,
        };

        Ok(Self {
            length: base.to_string(),
            exponent,
            time,
        })
    }
}

fn validate_name(input: &str, name: &str) -> Result<(), UnitParseError> {
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(UnitParseError::InvalidName {
            input: input.to_string(),
            name: name.to_string(),
        });
    }
    Ok(())
}

impl FromStr for CompoundUnit {
    type Err = UnitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CompoundUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.length)?;
        if self.exponent != 1 {
            write!(f, "^{}", self.exponent)?;
        }
        if let Some(time) = &self.time {
            write!(f, "/{}", time)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_unit() {
        let unit = CompoundUnit::parse("micron^3").unwrap();
        assert_eq!(unit.length, "micron");
        assert_eq!(unit.exponent, 3);
        assert_eq!(unit.time, None);
    }

    #[test]
    fn test_diffusion_unit() {
        let unit = CompoundUnit::parse(" micron^2/min ").unwrap();
        assert_eq!(unit.length, "micron");
        assert_eq!(unit.exponent, 2);
        assert_eq!(unit.time.as_deref(), Some("min"));
        assert_eq!(unit.to_string(), "micron^2/min");
    }

    #[test]
    fn test_implicit_exponent() {
        let unit = CompoundUnit::parse("mm").unwrap();
        assert_eq!(unit.exponent, 1);

        let rate = CompoundUnit::parse("1/min").unwrap();
        assert_eq!(rate.length, "1");
        assert_eq!(rate.time.as_deref(), Some("min"));
    }

    #[test]
    fn test_negative_exponent() {
        let unit = CompoundUnit::parse("micron^-1").unwrap();
        assert_eq!(unit.exponent, -1);
    }

    #[test]
    fn test_malformed_units_are_rejected() {
        assert_eq!(CompoundUnit::parse("   "), Err(UnitParseError::Empty));
        assert!(matches!(
            CompoundUnit::parse("micron^x"),
            Err(UnitParseError::InvalidExponent { .. })
        ));
        assert!(matches!(
            CompoundUnit::parse("^2/min"),
            Err(UnitParseError::InvalidName { .. })
        ));
        assert!(matches!(
            CompoundUnit::parse("micron^2/"),
            Err(UnitParseError::InvalidName { .. })
        ));
        assert!(matches!(
            CompoundUnit::parse("micron^2/min/s"),
            Err(UnitParseError::MultipleDivisions(_))
        ));
        assert!(matches!(
            CompoundUnit::parse("total substrate/min"),
            Err(UnitParseError::InvalidName { .. })
        ));
    }
}
