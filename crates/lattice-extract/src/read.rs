//! Entity-scoped field readers
//!
//! Small helpers that turn tree lookups into typed values, attaching the
//! entity and field name to any failure.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::error::{ExtractError, Result};
use crate::tree::Node;

/// A numeric value with its declared unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: Option<String>,
}

/// Parse a scalar as `f64`.
pub(crate) fn parse_number(entity: &str, field: &str, text: &str) -> Result<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| ExtractError::InvalidNumber {
            entity: entity.to_string(),
            field: field.to_string(),
            value: text.to_string(),
        })
}

/// Numeric text of `node`, if it has any.
pub(crate) fn number(entity: &str, field: &str, node: Option<&Node>) -> Result<Option<f64>> {
    node.and_then(Node::text)
        .map(|text| parse_number(entity, field, text))
        .transpose()
}

/// Numeric text of `parent.key`, if present.
pub(crate) fn number_at(entity: &str, parent: &Node, key: &str) -> Result<Option<f64>> {
    number(entity, key, parent.get(key))
}

/// Numeric text of `node`, failing when absent.
pub(crate) fn required_number(entity: &str, field: &str, node: Option<&Node>) -> Result<f64> {
    number(entity, field, node)?.ok_or_else(|| ExtractError::missing(entity, field))
}

/// Value and `@units` of `node`, if it has a value.
pub(crate) fn quantity(entity: &str, field: &str, node: Option<&Node>) -> Result<Option<Quantity>> {
    let Some(node) = node else {
        return Ok(None);
    };
    Ok(number(entity, field, Some(node))?.map(|value| Quantity {
        value,
        unit: node.attr("units").map(str::to_string),
    }))
}

/// Case-insensitive `true`.
pub(crate) fn parse_flag(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("true")
}

/// Record key for a source name: spaces become underscores.
pub fn normalize_name(name: &str) -> String {
    name.replace(' ', "_")
}

/// Insert under the normalized key of `name`; a later entry replaces an
/// earlier one and the collision is reported.
pub(crate) fn insert_normalized<V>(
    map: &mut IndexMap<String, V>,
    name: &str,
    value: V,
    diagnostics: &mut Diagnostics,
) {
    let key = normalize_name(name);
    if map.insert(key.clone(), value).is_some() {
        diagnostics.warn(
            &key,
            format!("name {name:?} normalizes to {key:?}, which is already defined; earlier entry replaced"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_parsing() {
        assert_eq!(parse_number("e", "f", " 2.5 ").unwrap(), 2.5);
        assert_eq!(parse_number("e", "f", "-1e3").unwrap(), -1000.0);
        assert!(matches!(
            parse_number("tumor", "dx", "twenty"),
            Err(ExtractError::InvalidNumber { entity, field, .. })
                if entity == "tumor" && field == "dx"
        ));
    }

    #[test]
    fn test_required_number_reports_missing_field() {
        let err = required_number("oxygen", "decay_rate", None).unwrap_err();
        assert_eq!(err, ExtractError::missing("oxygen", "decay_rate"));
    }

    #[test]
    fn test_quantity_reads_units() {
        let node: Node = [
            ("@units", Node::from("1/min")),
            ("#text", Node::from("0.1")),
        ]
        .into_iter()
        .collect();
        let q = quantity("e", "rate", Some(&node)).unwrap().unwrap();
        assert_eq!(q.value, 0.1);
        assert_eq!(q.unit.as_deref(), Some("1/min"));

        let bare = quantity("e", "rate", Some(&Node::from("3"))).unwrap().unwrap();
        assert_eq!(bare.unit, None);
    }

    #[test]
    fn test_flags_and_names() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" true"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("yes"));
        assert_eq!(normalize_name("cancer cell"), "cancer_cell");
    }

    #[test]
    fn test_normalized_key_collision_is_reported() {
        let mut map = IndexMap::new();
        let mut diagnostics = Diagnostics::new();
        insert_normalized(&mut map, "tumor cell", 1, &mut diagnostics);
        assert!(diagnostics.is_empty());
        insert_normalized(&mut map, "tumor_cell", 2, &mut diagnostics);
        assert_eq!(map.len(), 1);
        assert_eq!(map["tumor_cell"], 2);
        assert_eq!(diagnostics.for_scope("tumor_cell").count(), 1);
    }
}
