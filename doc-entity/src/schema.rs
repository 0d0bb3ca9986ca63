//! Canonical schema tree.
//!
//! A tree maps field names to nodes. A node's `type` is either a canonical
//! tag or, for embedded objects, another tree. Array nodes always carry
//! `items`; arrays of arrays are chains of `items` one level per dimension.

use std::fmt;

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
};
use serde_json::Value;

use crate::{
    error::Error,
    meta::{DefaultValue, FieldType, Timestamp},
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SchemaTree(Vec<(String, SchemaNode)>);

impl SchemaTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a declarative schema value. The value must pass
    /// [`is_schema_candidate`].
    pub fn from_value(value: Value) -> Result<Self, Error> {
        if !is_schema_candidate(&value) {
            return Err(Error::InvalidSchema(
                "expected an object whose values are objects with a `type`".to_string(),
            ));
        }
        let tree: SchemaTree = serde_json::from_value(value)?;
        tree.validate()?;
        Ok(tree)
    }

    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, node)| node)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut SchemaNode> {
        self.0
            .iter_mut()
            .find(|(key, _)| key == name)
            .map(|(_, node)| node)
    }

    /// Inserts a node, replacing an existing node of the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, node: SchemaNode) {
        let name = name.into();
        match self.get_mut(&name) {
            Some(slot) => *slot = node,
            None => self.0.push((name, node)),
        }
    }

    pub fn get_or_insert_with(
        &mut self,
        name: &str,
        make: impl FnOnce() -> SchemaNode,
    ) -> &mut SchemaNode {
        let position = match self.0.iter().position(|(key, _)| key == name) {
            Some(position) => position,
            None => {
                self.0.push((name.to_string(), make()));
                self.0.len() - 1
            }
        };
        &mut self.0[position].1
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.0.iter().map(|(key, node)| (key.as_str(), node))
    }

    pub fn to_value(&self) -> Result<Value, Error> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    fn validate(&self) -> Result<(), Error> {
        for (name, node) in self.iter() {
            node.validate(name)?;
        }
        Ok(())
    }
}

impl Serialize for SchemaTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(key, node)| (key, node)))
    }
}

impl<'de> Deserialize<'de> for SchemaTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TreeVisitor;

        impl<'de> Visitor<'de> for TreeVisitor {
            type Value = SchemaTree;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of field names to schema nodes")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<SchemaTree, A::Error> {
                let mut tree = SchemaTree::new();
                while let Some((name, node)) = map.next_entry::<String, SchemaNode>()? {
                    tree.insert(name, node);
                }
                Ok(tree)
            }
        }

        deserializer.deserialize_map(TreeVisitor)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeType {
    Scalar(FieldType),
    Object(SchemaTree),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKeyNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(rename = "autoGenerate", default)]
    pub auto_generate: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemaNode {
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<PrimaryKeyNode>,
    #[serde(rename = "maxLength", default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    #[serde(rename = "searchIndex", default, skip_serializing_if = "Option::is_none")]
    pub search_index: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facet: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<u32>,
}

impl SchemaNode {
    pub fn scalar(field_type: FieldType) -> Self {
        Self::with_type(NodeType::Scalar(field_type))
    }

    pub fn object(tree: SchemaTree) -> Self {
        Self::with_type(NodeType::Object(tree))
    }

    /// `{ "type": "array", "items": element }`
    pub fn array(element: SchemaNode) -> Self {
        let mut node = Self::scalar(FieldType::Array);
        node.items = Some(Box::new(element));
        node
    }

    /// Wraps `element` in exactly `max(depth, 1)` array levels.
    pub fn nested_array(element: SchemaNode, depth: u32) -> Self {
        (1..depth.max(1)).fold(Self::array(element), |inner, _| Self::array(inner))
    }

    fn with_type(node_type: NodeType) -> Self {
        Self {
            node_type,
            items: None,
            primary_key: None,
            max_length: None,
            default: None,
            timestamp: None,
            search_index: None,
            sort: None,
            facet: None,
            id: None,
            dimensions: None,
        }
    }

    /// Canonical tag of the node, `object` for embedded trees.
    pub fn field_type(&self) -> FieldType {
        match &self.node_type {
            NodeType::Scalar(field_type) => *field_type,
            NodeType::Object(_) => FieldType::Object,
        }
    }

    /// Number of array levels above the element node.
    pub fn array_depth(&self) -> u32 {
        let mut depth = 0;
        let mut node = self;
        while node.field_type() == FieldType::Array {
            match &node.items {
                Some(items) => {
                    depth += 1;
                    node = items;
                }
                None => break,
            }
        }
        depth
    }

    fn validate(&self, name: &str) -> Result<(), Error> {
        match &self.node_type {
            NodeType::Scalar(FieldType::Array) => match &self.items {
                Some(items) => items.validate(name),
                None => Err(Error::InvalidSchema(format!(
                    "array field `{name}` has no items"
                ))),
            },
            NodeType::Object(tree) => tree.validate(),
            NodeType::Scalar(_) => Ok(()),
        }
    }
}

/// Accepts a value as a schema definition only if it is an object whose
/// every value is itself an object carrying a `type` property.
pub fn is_schema_candidate(value: &Value) -> bool {
    match value {
        Value::Object(fields) => fields.values().all(|field| match field {
            Value::Object(node) => node.contains_key("type"),
            _ => false,
        }),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_array_has_requested_depth() {
        for depth in 1..=5 {
            let node = SchemaNode::nested_array(SchemaNode::scalar(FieldType::String), depth);
            assert_eq!(node.array_depth(), depth);
        }
        let node = SchemaNode::nested_array(SchemaNode::scalar(FieldType::String), 0);
        assert_eq!(node.array_depth(), 1);
    }

    #[test]
    fn serializes_depth_three_chain() {
        let node = SchemaNode::nested_array(SchemaNode::scalar(FieldType::Int64), 3);
        assert_eq!(
            serde_json::to_string(&node).unwrap(),
            r#"{"type":"array","items":{"type":"array","items":{"type":"array","items":{"type":"int64"}}}}"#
        );
    }

    #[test]
    fn candidate_detection() {
        assert!(is_schema_candidate(&json!({"name": {"type": "string"}})));
        assert!(is_schema_candidate(&json!({
            "address": {"type": {"city": {"type": "string"}}}
        })));
        assert!(!is_schema_candidate(&json!(null)));
        assert!(!is_schema_candidate(&json!("string")));
        assert!(!is_schema_candidate(&json!(42)));
        assert!(!is_schema_candidate(&json!({"name": null})));
        assert!(!is_schema_candidate(&json!({"name": {"type": "string"}, "age": 3})));
        assert!(!is_schema_candidate(&json!({"name": {"maxLength": 3}})));
    }

    #[test]
    fn parses_declarative_schema_in_order() {
        let tree = SchemaTree::from_value(json!({
            "id": {"type": "int64", "primary_key": {"order": 1, "autoGenerate": true}},
            "tags": {"type": "array", "items": {"type": "string"}},
            "address": {"type": {"city": {"type": "string", "maxLength": 32}}},
            "createdAt": {"type": "date-time", "default": "now()", "timestamp": "createdAt"}
        }))
        .unwrap();

        let names: Vec<_> = tree.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["id", "tags", "address", "createdAt"]);
        assert_eq!(
            tree.get("id").unwrap().primary_key,
            Some(PrimaryKeyNode {
                order: Some(1),
                auto_generate: true
            })
        );
        assert_eq!(
            tree.get("createdAt").unwrap().default,
            Some(DefaultValue::Generated(crate::meta::Generated::Now))
        );
        match &tree.get("address").unwrap().node_type {
            NodeType::Object(nested) => {
                assert_eq!(nested.get("city").unwrap().max_length, Some(32));
            }
            other => panic!("unexpected node type {other:?}"),
        }
    }

    #[test]
    fn declarative_array_without_items_is_rejected() {
        let err = SchemaTree::from_value(json!({"tags": {"type": "array"}})).unwrap_err();
        assert!(matches!(err, Error::InvalidSchema(_)));
    }
}
