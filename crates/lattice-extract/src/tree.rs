//! Source model tree
//!
//! The source document arrives already deserialized into a nested tree in
//! the attribute/text convention: element attributes are keyed `@name`, the
//! element's own text is keyed `#text`, and repeated sibling elements become
//! a list. A single sibling is *not* wrapped in a list, so every consumer
//! goes through [`Node::seq`] to see one uniform shape.
//!
//! ```text
//! <total units="micron^3">2494</total>   =>  {"@units": "micron^3", "#text": "2494"}
//! <dx>20</dx>                            =>  "20"
//! <rate>..</rate><rate>..</rate>         =>  [{..}, {..}]
//! ```

use std::fmt;

use indexmap::IndexMap;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Document element the source format wraps everything in.
pub const DOCUMENT_ROOT: &str = "PhysiCell_settings";

/// One node of the source tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Scalar leaf. Numbers and booleans keep their textual form.
    Text(String),
    /// Named children in document order.
    Record(IndexMap<String, Node>),
    /// Repeated siblings.
    List(Vec<Node>),
}

impl Node {
    pub fn text_node(value: impl Into<String>) -> Self {
        Node::Text(value.into())
    }

    pub fn empty_record() -> Self {
        Node::Record(IndexMap::new())
    }

    /// Child of a record.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Record(children) => children.get(key),
            _ => None,
        }
    }

    /// Nested child lookup, e.g. `["phenotype", "volume", "total"]`.
    pub fn path(&self, keys: &[&str]) -> Option<&Node> {
        keys.iter().try_fold(self, |node, key| node.get(key))
    }

    /// Scalar text of this node: the leaf itself, or a record's `#text`.
    pub fn text(&self) -> Option<&str> {
        match self {
            Node::Text(text) => Some(text.as_str()),
            Node::Record(children) => children.get("#text").and_then(Node::text),
            Node::List(_) => None,
        }
    }

    /// Attribute value, `name` given without the `@`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        match self {
            Node::Record(children) => children
                .iter()
                .find(|(key, _)| key.strip_prefix('@') == Some(name))
                .and_then(|(_, value)| value.text()),
            _ => None,
        }
    }

    /// This node as an ordered sequence: a list's items, or a one-element
    /// slice holding the node itself.
    pub fn seq(&self) -> &[Node] {
        match self {
            Node::List(items) => items,
            other => std::slice::from_ref(other),
        }
    }

    pub fn as_record(&self) -> Option<&IndexMap<String, Node>> {
        match self {
            Node::Record(children) => Some(children),
            _ => None,
        }
    }

    /// Element children of a record, skipping attributes and `#text`.
    pub fn elements(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.as_record()
            .into_iter()
            .flat_map(|children| children.iter())
            .filter(|(key, _)| !key.starts_with('@') && !key.starts_with('#'))
            .map(|(key, node)| (key.as_str(), node))
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::Text(value.to_string())
    }
}

impl<K: Into<String>> FromIterator<(K, Node)> for Node {
    fn from_iter<I: IntoIterator<Item = (K, Node)>>(iter: I) -> Self {
        Node::Record(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Node::Text(text) => serializer.serialize_str(text),
            Node::Record(children) => {
                let mut map = serializer.serialize_map(Some(children.len()))?;
                for (key, value) in children {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Node::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a scalar, a map of child nodes, or a list of nodes")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Node, E> {
        Ok(Node::Text(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Node, E> {
        Ok(Node::Text(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Node, E> {
        Ok(Node::Text(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Node, E> {
        Ok(Node::Text(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Node, E> {
        Ok(Node::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Node, E> {
        Ok(Node::Text(v))
    }

    // Empty elements (`<custom_data/>`) deserialize as null.
    fn visit_unit<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::empty_record())
    }

    fn visit_none<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::empty_record())
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Node, D::Error> {
        deserializer.deserialize_any(NodeVisitor)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Node, A::Error> {
        let mut items = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(item) = access.next_element()? {
            items.push(item);
        }
        Ok(Node::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Node, A::Error> {
        let mut children = IndexMap::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, Node>()? {
            children.insert(key, value);
        }
        Ok(Node::Record(children))
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NodeVisitor)
    }
}

/// Read-only root of one source model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Node", into = "Node")]
pub struct ModelTree {
    root: Node,
}

impl ModelTree {
    /// Wrap a deserialized document, unwrapping a sole [`DOCUMENT_ROOT`]
    /// element if present.
    pub fn new(root: Node) -> Self {
        let root = match root {
            Node::Record(mut children)
                if children.len() == 1 && children.contains_key(DOCUMENT_ROOT) =>
            {
                children
                    .swap_remove(DOCUMENT_ROOT)
                    .unwrap_or_else(Node::empty_record)
            }
            other => other,
        };
        Self { root }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Top-level section such as `domain`, `overall` or `cell_definitions`.
    pub fn section(&self, name: &str) -> Option<&Node> {
        self.root.get(name)
    }
}

impl From<Node> for ModelTree {
    fn from(root: Node) -> Self {
        Self::new(root)
    }
}

impl From<ModelTree> for Node {
    fn from(tree: ModelTree) -> Self {
        tree.root
    }
}
