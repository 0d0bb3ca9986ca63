//! JSON-Schema envelopes sent to the server when a collection or search
//! index is created.
//!
//! Canonical tags are translated to `type`/`format` pairs, primary key
//! attributes are lifted into the envelope's ordered `primary_key` list and
//! timestamp roles become `createdAt`/`updatedAt` flags.

use serde_json::{Map, Value, json};

use crate::{
    error::Error,
    meta::{FieldType, SearchIndexOptions, Timestamp},
    schema::{NodeType, SchemaNode, SchemaTree},
};

pub fn collection_schema(name: &str, tree: &SchemaTree) -> Result<Value, Error> {
    let mut keys = Vec::new();
    let properties = properties(tree, Some(&mut keys))?;
    keys.sort_by_key(|(order, _)| order.unwrap_or(u32::MAX));

    let mut envelope = Map::new();
    envelope.insert("title".to_string(), json!(name));
    envelope.insert("additionalProperties".to_string(), json!(false));
    envelope.insert("type".to_string(), json!("object"));
    envelope.insert("properties".to_string(), Value::Object(properties));
    if !keys.is_empty() {
        envelope.insert(
            "primary_key".to_string(),
            Value::Array(keys.into_iter().map(|(_, name)| json!(name)).collect()),
        );
    }
    envelope.insert("collection_type".to_string(), json!("documents"));
    Ok(Value::Object(envelope))
}

pub fn search_index_schema(
    name: &str,
    tree: &SchemaTree,
    options: &SearchIndexOptions,
) -> Result<Value, Error> {
    let mut envelope = Map::new();
    envelope.insert("title".to_string(), json!(name));
    envelope.insert("type".to_string(), json!("object"));
    envelope.insert(
        "properties".to_string(),
        Value::Object(properties(tree, None)?),
    );
    if let Some(separators) = &options.token_separators {
        envelope.insert("tokenSeparators".to_string(), json!(separators));
    }
    Ok(Value::Object(envelope))
}

fn properties(
    tree: &SchemaTree,
    mut keys: Option<&mut Vec<(Option<u32>, String)>>,
) -> Result<Map<String, Value>, Error> {
    let mut properties = Map::new();
    for (name, node) in tree.iter() {
        let mut property = property(name, node)?;
        if let Some(primary_key) = node.primary_key {
            if let Some(keys) = keys.as_deref_mut() {
                keys.push((primary_key.order, name.to_string()));
            }
            if primary_key.auto_generate {
                property.insert("autoGenerate".to_string(), json!(true));
            }
        }
        properties.insert(name.to_string(), Value::Object(property));
    }
    Ok(properties)
}

fn property(name: &str, node: &SchemaNode) -> Result<Map<String, Value>, Error> {
    let mut property = Map::new();
    match &node.node_type {
        NodeType::Object(tree) => {
            property.insert("type".to_string(), json!("object"));
            property.insert(
                "properties".to_string(),
                Value::Object(properties(tree, None)?),
            );
        }
        NodeType::Scalar(FieldType::Array) if node.dimensions.is_some() => {
            property.insert("type".to_string(), json!("array"));
            property.insert("format".to_string(), json!("vector"));
            property.insert("dimensions".to_string(), json!(node.dimensions));
        }
        NodeType::Scalar(FieldType::Array) => {
            let items = node.items.as_deref().ok_or_else(|| {
                Error::InvalidSchema(format!("array field `{name}` has no items"))
            })?;
            property.insert("type".to_string(), json!("array"));
            property.insert("items".to_string(), Value::Object(self::property(name, items)?));
        }
        NodeType::Scalar(field_type) => {
            let (json_type, format) = type_and_format(*field_type);
            property.insert("type".to_string(), json!(json_type));
            if let Some(format) = format {
                property.insert("format".to_string(), json!(format));
            }
        }
    }

    if let Some(max_length) = node.max_length {
        property.insert("maxLength".to_string(), json!(max_length));
    }
    if let Some(default) = &node.default {
        property.insert("default".to_string(), serde_json::to_value(default)?);
    }
    match node.timestamp {
        Some(Timestamp::CreatedAt) => {
            property.insert("createdAt".to_string(), json!(true));
        }
        Some(Timestamp::UpdatedAt) => {
            property.insert("updatedAt".to_string(), json!(true));
        }
        None => {}
    }
    for (key, flag) in [
        ("searchIndex", node.search_index),
        ("sort", node.sort),
        ("facet", node.facet),
        ("id", node.id),
    ] {
        if let Some(flag) = flag {
            property.insert(key.to_string(), json!(flag));
        }
    }
    Ok(property)
}

fn type_and_format(field_type: FieldType) -> (&'static str, Option<&'static str>) {
    match field_type {
        FieldType::String => ("string", None),
        FieldType::Boolean => ("boolean", None),
        FieldType::Number => ("number", None),
        FieldType::Double => ("number", Some("double")),
        FieldType::Int32 => ("integer", Some("int32")),
        FieldType::Int64 => ("integer", Some("int64")),
        FieldType::Uuid => ("string", Some("uuid")),
        FieldType::Bytes => ("string", Some("byte")),
        FieldType::DateTime => ("string", Some("date-time")),
        FieldType::Array => ("array", None),
        FieldType::Object => ("object", None),
    }
}
