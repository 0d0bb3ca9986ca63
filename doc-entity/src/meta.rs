use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::{error::Error, value::ToFieldValue};

/// Identity of a declared model. Two metadata entries belong to the same
/// model when their type paths are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypePath(pub &'static str);

impl fmt::Display for TypePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Canonical datatype tags understood by the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Boolean,
    Number,
    Double,
    Int32,
    Int64,
    Uuid,
    Bytes,
    DateTime,
    Array,
    Object,
}

impl FieldType {
    pub fn tag(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Number => "number",
            FieldType::Double => "double",
            FieldType::Int32 => "int32",
            FieldType::Int64 => "int64",
            FieldType::Uuid => "uuid",
            FieldType::Bytes => "byte",
            FieldType::DateTime => "date-time",
            FieldType::Array => "array",
            FieldType::Object => "object",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, Error> {
        tag.parse()
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Number | FieldType::Double | FieldType::Int32 | FieldType::Int64
        )
    }
}

impl FromStr for FieldType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "string" => FieldType::String,
            "boolean" => FieldType::Boolean,
            "number" => FieldType::Number,
            "double" => FieldType::Double,
            "int32" => FieldType::Int32,
            "int64" => FieldType::Int64,
            "uuid" => FieldType::Uuid,
            "byte" => FieldType::Bytes,
            "date-time" => FieldType::DateTime,
            "array" => FieldType::Array,
            "object" => FieldType::Object,
            other => return Err(Error::InvalidFieldType(other.to_string())),
        })
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        tag.parse().map_err(serde::de::Error::custom)
    }
}

/// Element type of an array field or the nested model of an object field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbedType {
    Type(FieldType),
    Model(TypePath),
}

/// Server-side generated default values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Generated {
    Now,
    Uuid,
    Cuid,
}

impl Generated {
    pub fn as_str(&self) -> &'static str {
        match self {
            Generated::Now => "now()",
            Generated::Uuid => "uuid()",
            Generated::Cuid => "cuid()",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DefaultValue {
    Literal(Value),
    Generated(Generated),
}

impl DefaultValue {
    pub fn literal(value: impl ToFieldValue) -> Self {
        DefaultValue::Literal(value.to_field_value())
    }
}

impl From<Generated> for DefaultValue {
    fn from(generated: Generated) -> Self {
        DefaultValue::Generated(generated)
    }
}

impl Serialize for DefaultValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DefaultValue::Literal(value) => value.serialize(serializer),
            DefaultValue::Generated(generated) => serializer.serialize_str(generated.as_str()),
        }
    }
}

impl<'de> Deserialize<'de> for DefaultValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value.as_str() {
            Some("now()") => DefaultValue::Generated(Generated::Now),
            Some("uuid()") => DefaultValue::Generated(Generated::Uuid),
            Some("cuid()") => DefaultValue::Generated(Generated::Cuid),
            _ => DefaultValue::Literal(value),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Timestamp {
    CreatedAt,
    UpdatedAt,
}

impl FromStr for Timestamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createdAt" => Ok(Timestamp::CreatedAt),
            "updatedAt" => Ok(Timestamp::UpdatedAt),
            other => Err(Error::InvalidSchema(format!(
                "unknown timestamp role `{other}`"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FieldOptions {
    pub max_length: Option<u32>,
    pub default: Option<DefaultValue>,
    pub timestamp: Option<Timestamp>,
    pub search_index: Option<bool>,
    pub sort: Option<bool>,
    pub facet: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchFieldOptions {
    pub facet: Option<bool>,
    pub sort: Option<bool>,
    pub search_index: Option<bool>,
    pub id: Option<bool>,
    pub dimensions: Option<u32>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrimaryKeyOptions {
    /// 1-based rank inside a composite key.
    pub order: Option<u32>,
    pub auto_generate: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchIndexOptions {
    pub token_separators: Option<Vec<String>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionMetadata {
    pub collection_name: String,
    pub target: TypePath,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchIndexMetadata {
    pub name: String,
    pub target: TypePath,
    pub options: SearchIndexOptions,
}

/// A resolved field declaration. `O` is the option set of the owning
/// object model: [`FieldOptions`] for collections, [`SearchFieldOptions`]
/// for search indexes.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldMetadata<O = FieldOptions> {
    pub name: String,
    pub target: TypePath,
    pub field_type: FieldType,
    pub embed_type: Option<EmbedType>,
    pub array_depth: u32,
    pub options: O,
}

pub type SearchFieldMetadata = FieldMetadata<SearchFieldOptions>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrimaryKeyMetadata {
    pub name: String,
    pub target: TypePath,
    pub field_type: FieldType,
    pub options: PrimaryKeyOptions,
}
