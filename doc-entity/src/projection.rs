//! Read-side query parts: field projection, sort order and facet requests.

use serde_json::{Map, Value, json};

use crate::error::Error;

/// Field projection for reads. Included fields map to `true`, excluded
/// fields to `false`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadFields {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl ReadFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(mut self, field: impl Into<String>) -> Self {
        self.include.push(field.into());
        self
    }

    pub fn exclude(mut self, field: impl Into<String>) -> Self {
        self.exclude.push(field.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Include keys come first, then exclude keys. A field named on both
    /// sides keeps its include position and ends up `false`.
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        for field in &self.include {
            object.insert(field.clone(), Value::Bool(true));
        }
        for field in &self.exclude {
            object.insert(field.clone(), Value::Bool(false));
        }
        Value::Object(object)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(&self.to_value())?)
    }
}

pub fn read_fields_to_json(read_fields: &ReadFields) -> Result<String, Error> {
    read_fields.to_json()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "$asc",
            SortDirection::Desc => "$desc",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SortOrder(Vec<(String, SortDirection)>);

impl SortOrder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asc(mut self, field: impl Into<String>) -> Self {
        self.0.push((field.into(), SortDirection::Asc));
        self
    }

    pub fn desc(mut self, field: impl Into<String>) -> Self {
        self.0.push((field.into(), SortDirection::Desc));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `[{"field":"$asc"}, ...]` in declaration order.
    pub fn to_value(&self) -> Value {
        Value::Array(
            self.0
                .iter()
                .map(|(field, direction)| {
                    let mut entry = Map::new();
                    entry.insert(field.clone(), json!(direction.as_str()));
                    Value::Object(entry)
                })
                .collect(),
        )
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(&self.to_value())?)
    }
}

pub const DEFAULT_FACET_SIZE: u32 = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FacetQuery {
    pub size: u32,
}

impl Default for FacetQuery {
    fn default() -> Self {
        Self {
            size: DEFAULT_FACET_SIZE,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FacetFields(Vec<(String, FacetQuery)>);

impl FacetFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(self, field: impl Into<String>) -> Self {
        self.sized(field, DEFAULT_FACET_SIZE)
    }

    pub fn sized(mut self, field: impl Into<String>, size: u32) -> Self {
        let field = field.into();
        match self.0.iter_mut().find(|(name, _)| *name == field) {
            Some((_, query)) => query.size = size,
            None => self.0.push((field, FacetQuery { size })),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        for (field, query) in &self.0 {
            object.insert(field.clone(), json!({"size": query.size, "type": "value"}));
        }
        Value::Object(object)
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(&self.to_value())?)
    }
}

impl<S: Into<String>> FromIterator<S> for FacetFields {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        iter.into_iter()
            .fold(FacetFields::new(), |facets, field| facets.field(field))
    }
}
