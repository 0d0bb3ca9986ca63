//! Field declarations, the input side of the metadata store.
//!
//! A declaration names a field and describes its type either by native type
//! name (resolved through [`crate::type_mapper`]) or by an explicit
//! canonical tag. Resolution happens when the declaration is handed to the
//! store, so an unresolvable type fails at registration instead of at
//! schema build time.

use crate::{
    error::Error,
    meta::{
        DefaultValue, EmbedType, FieldMetadata, FieldOptions, FieldType, PrimaryKeyMetadata,
        PrimaryKeyOptions, SearchFieldOptions, Timestamp, TypePath,
    },
    type_mapper::{map_native_type, resolve_native_type},
};

/// Deepest array nesting a declaration may ask for.
pub const MAX_ARRAY_DEPTH: u32 = 32;

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDecl<O> {
    name: String,
    native_type: Option<String>,
    field_type: Option<FieldType>,
    embed: Option<EmbedType>,
    array_depth: Option<i64>,
    options: O,
}

pub type CollectionFieldDecl = FieldDecl<FieldOptions>;
pub type SearchFieldDecl = FieldDecl<SearchFieldOptions>;

impl<O: Default> FieldDecl<O> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            native_type: None,
            field_type: None,
            embed: None,
            array_depth: None,
            options: O::default(),
        }
    }
}

impl<O> FieldDecl<O> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Native type name to infer the canonical type from.
    pub fn native_type(mut self, type_name: impl Into<String>) -> Self {
        self.native_type = Some(type_name.into());
        self
    }

    /// Explicit canonical type, takes precedence over the native type.
    pub fn field_type(mut self, field_type: FieldType) -> Self {
        self.field_type = Some(field_type);
        self
    }

    /// Array element type, or the element type of the innermost array.
    pub fn items(mut self, element: FieldType) -> Self {
        self.embed = Some(EmbedType::Type(element));
        self
    }

    /// Nested model for object fields and arrays of objects.
    pub fn model(mut self, model: TypePath) -> Self {
        self.embed = Some(EmbedType::Model(model));
        self
    }

    /// Nesting count for arrays of arrays. Values below one count as one.
    pub fn array_depth(mut self, depth: i64) -> Self {
        self.array_depth = Some(depth);
        self
    }

    pub(crate) fn resolve(self, target: TypePath) -> Result<FieldMetadata<O>, Error> {
        let shape = match &self.native_type {
            Some(native) => resolve_native_type(native),
            None => None,
        };

        let field_type = match (self.field_type, shape) {
            (Some(explicit), _) => explicit,
            // 指定了嵌入模型的对象字段可以使用任意原生类型名
            (None, None) if matches!(self.embed, Some(EmbedType::Model(_))) => FieldType::Object,
            (None, Some(shape)) => shape.field_type,
            (None, None) => {
                return Err(Error::CannotInferFieldType {
                    target: target.to_string(),
                    field: self.name,
                    native: self.native_type.unwrap_or_default(),
                });
            }
        };

        let inferred_depth = shape
            .filter(|shape| shape.field_type == FieldType::Array)
            .map_or(1, |shape| shape.array_depth);
        let embed_type = match field_type {
            FieldType::Array => {
                let element = self.embed.or_else(|| {
                    shape
                        .and_then(|shape| shape.element)
                        .map(EmbedType::Type)
                });
                match element {
                    Some(element) => Some(element),
                    None => {
                        return Err(Error::IncompleteArrayType {
                            target: target.to_string(),
                            field: self.name,
                        });
                    }
                }
            }
            FieldType::Object => self.embed,
            _ => None,
        };

        let array_depth = match self.array_depth {
            Some(depth) if depth > i64::from(MAX_ARRAY_DEPTH) => {
                return Err(Error::InvalidSchema(format!(
                    "{target}.{}: array depth {depth} exceeds {MAX_ARRAY_DEPTH}",
                    self.name
                )));
            }
            Some(depth) => depth.max(1) as u32,
            None => inferred_depth.max(1),
        };

        Ok(FieldMetadata {
            name: self.name,
            target,
            field_type,
            embed_type,
            array_depth,
            options: self.options,
        })
    }
}

impl FieldDecl<FieldOptions> {
    pub fn max_length(mut self, max_length: u32) -> Self {
        self.options.max_length = Some(max_length);
        self
    }

    pub fn default_value(mut self, default: impl Into<DefaultValue>) -> Self {
        self.options.default = Some(default.into());
        self
    }

    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.options.timestamp = Some(timestamp);
        self
    }

    pub fn search_index(mut self, enabled: bool) -> Self {
        self.options.search_index = Some(enabled);
        self
    }

    pub fn sort(mut self, enabled: bool) -> Self {
        self.options.sort = Some(enabled);
        self
    }

    pub fn facet(mut self, enabled: bool) -> Self {
        self.options.facet = Some(enabled);
        self
    }
}

impl FieldDecl<SearchFieldOptions> {
    pub fn facet(mut self, enabled: bool) -> Self {
        self.options.facet = Some(enabled);
        self
    }

    pub fn sort(mut self, enabled: bool) -> Self {
        self.options.sort = Some(enabled);
        self
    }

    pub fn search_index(mut self, enabled: bool) -> Self {
        self.options.search_index = Some(enabled);
        self
    }

    /// Marks the field as the document id of the search index.
    pub fn id(mut self, enabled: bool) -> Self {
        self.options.id = Some(enabled);
        self
    }

    /// Declares a vector field with the given number of dimensions.
    pub fn dimensions(mut self, dimensions: u32) -> Self {
        self.options.dimensions = Some(dimensions);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PrimaryKeyDecl {
    name: String,
    native_type: Option<String>,
    field_type: Option<FieldType>,
    options: PrimaryKeyOptions,
}

impl PrimaryKeyDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            native_type: None,
            field_type: None,
            options: PrimaryKeyOptions::default(),
        }
    }

    pub fn native_type(mut self, type_name: impl Into<String>) -> Self {
        self.native_type = Some(type_name.into());
        self
    }

    pub fn field_type(mut self, field_type: FieldType) -> Self {
        self.field_type = Some(field_type);
        self
    }

    pub fn order(mut self, order: u32) -> Self {
        self.options.order = Some(order);
        self
    }

    pub fn auto_generate(mut self, enabled: bool) -> Self {
        self.options.auto_generate = enabled;
        self
    }

    pub(crate) fn resolve(self, target: TypePath) -> Result<PrimaryKeyMetadata, Error> {
        let field_type = match self.field_type {
            Some(explicit) => explicit,
            None => self
                .native_type
                .as_deref()
                .and_then(map_native_type)
                .ok_or_else(|| Error::CannotInferFieldType {
                    target: target.to_string(),
                    field: self.name.clone(),
                    native: self.native_type.clone().unwrap_or_default(),
                })?,
        };
        Ok(PrimaryKeyMetadata {
            name: self.name,
            target,
            field_type,
            options: self.options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: TypePath = TypePath("tests::Book");

    #[test]
    fn infers_type_from_native_name() {
        let meta = CollectionFieldDecl::new("tags")
            .native_type("Vec<Vec<String>>")
            .resolve(TARGET)
            .unwrap();
        assert_eq!(meta.field_type, FieldType::Array);
        assert_eq!(meta.array_depth, 2);
        assert_eq!(meta.embed_type, Some(EmbedType::Type(FieldType::String)));
    }

    #[test]
    fn explicit_type_wins() {
        let meta = CollectionFieldDecl::new("id")
            .native_type("String")
            .field_type(FieldType::Uuid)
            .resolve(TARGET)
            .unwrap();
        assert_eq!(meta.field_type, FieldType::Uuid);
    }

    #[test]
    fn unknown_type_is_a_declaration_error() {
        let err = CollectionFieldDecl::new("author")
            .native_type("Author")
            .resolve(TARGET)
            .unwrap_err();
        assert!(matches!(err, Error::CannotInferFieldType { .. }));
    }

    #[test]
    fn array_without_element_is_a_declaration_error() {
        let err = CollectionFieldDecl::new("authors")
            .field_type(FieldType::Array)
            .resolve(TARGET)
            .unwrap_err();
        assert!(matches!(err, Error::IncompleteArrayType { .. }));
    }

    #[test]
    fn non_positive_depth_counts_as_one() {
        for depth in [-3, 0, 1] {
            let meta = CollectionFieldDecl::new("values")
                .field_type(FieldType::Array)
                .items(FieldType::Int64)
                .array_depth(depth)
                .resolve(TARGET)
                .unwrap();
            assert_eq!(meta.array_depth, 1);
        }
    }

    #[test]
    fn depth_is_capped() {
        let deepest = CollectionFieldDecl::new("values")
            .field_type(FieldType::Array)
            .items(FieldType::Int64)
            .array_depth(i64::from(MAX_ARRAY_DEPTH))
            .resolve(TARGET)
            .unwrap();
        assert_eq!(deepest.array_depth, MAX_ARRAY_DEPTH);

        let err = CollectionFieldDecl::new("values")
            .field_type(FieldType::Array)
            .items(FieldType::Int64)
            .array_depth(100_000_000)
            .resolve(TARGET)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSchema(_)));
    }

    #[test]
    fn model_field_defaults_to_object() {
        let meta = CollectionFieldDecl::new("address")
            .native_type("Address")
            .model(TypePath("tests::Address"))
            .resolve(TARGET)
            .unwrap();
        assert_eq!(meta.field_type, FieldType::Object);
        assert_eq!(
            meta.embed_type,
            Some(EmbedType::Model(TypePath("tests::Address")))
        );
    }

    #[test]
    fn primary_key_type_is_inferred() {
        let meta = PrimaryKeyDecl::new("id")
            .native_type("i64")
            .order(1)
            .auto_generate(true)
            .resolve(TARGET)
            .unwrap();
        assert_eq!(meta.field_type, FieldType::Int64);
        assert_eq!(meta.options.order, Some(1));
        assert!(meta.options.auto_generate);
    }
}
