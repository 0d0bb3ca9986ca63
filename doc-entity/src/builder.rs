//! Builds canonical schema trees from the metadata store.

use std::collections::HashSet;

use crate::{
    error::Error,
    meta::{EmbedType, FieldMetadata, FieldOptions, FieldType, SearchFieldOptions, TypePath},
    schema::{PrimaryKeyNode, SchemaNode, SchemaTree},
    store::MetadataStore,
};

/// Optional node attributes copied from field options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Attribute {
    Default,
    Timestamp,
    SearchIndex,
    Sort,
    Facet,
    Id,
}

impl Attribute {
    /// Field types the attribute is never emitted for.
    fn excluded_types(self) -> &'static [FieldType] {
        match self {
            Attribute::Default => &[],
            Attribute::Timestamp
            | Attribute::SearchIndex
            | Attribute::Sort
            | Attribute::Facet
            | Attribute::Id => &[FieldType::Object],
        }
    }

    fn applies_to(self, field_type: FieldType) -> bool {
        !self.excluded_types().contains(&field_type)
    }
}

pub struct SchemaBuilder<'a> {
    store: &'a MetadataStore,
}

impl<'a> SchemaBuilder<'a> {
    pub fn new(store: &'a MetadataStore) -> Self {
        Self { store }
    }

    /// Schema of a collection: collection fields, search fields and primary
    /// keys of the target.
    pub fn collection_schema(&self, target: TypePath) -> Result<SchemaTree, Error> {
        self.build(target, true)
    }

    /// Schema of a search index: search fields only.
    pub fn search_index_schema(&self, target: TypePath) -> Result<SchemaTree, Error> {
        self.build(target, false)
    }

    pub fn build(
        &self,
        target: TypePath,
        include_collection_fields: bool,
    ) -> Result<SchemaTree, Error> {
        if !self.store.knows(target) {
            return Err(Error::UnknownTarget(target.to_string()));
        }
        let mut visiting = HashSet::new();
        let mut tree = self.build_tree(target, include_collection_fields, &mut visiting)?;
        // 嵌入模型的主键不作用于父文档
        if include_collection_fields {
            self.overlay_primary_keys(target, &mut tree)?;
        }
        log::debug!(
            "built {} schema for {target} with {} fields",
            if include_collection_fields {
                "collection"
            } else {
                "search index"
            },
            tree.len()
        );
        Ok(tree)
    }

    fn build_tree(
        &self,
        target: TypePath,
        include_collection_fields: bool,
        visiting: &mut HashSet<TypePath>,
    ) -> Result<SchemaTree, Error> {
        if !visiting.insert(target) {
            return Err(Error::InvalidSchema(format!(
                "{target} embeds itself"
            )));
        }

        let mut tree = SchemaTree::new();
        if include_collection_fields {
            for field in self.store.fields_by_target(target) {
                let mut node = self.field_node(field, include_collection_fields, visiting)?;
                apply_field_options(&mut node, field.field_type, &field.options);
                tree.insert(field.name.clone(), node);
            }
        }
        for field in self.store.search_fields_by_target(target) {
            match tree.get_mut(&field.name) {
                Some(node) => apply_search_options(node, field.field_type, &field.options),
                None => {
                    let mut node = self.field_node(field, include_collection_fields, visiting)?;
                    apply_search_options(&mut node, field.field_type, &field.options);
                    tree.insert(field.name.clone(), node);
                }
            }
        }

        visiting.remove(&target);
        Ok(tree)
    }

    fn field_node<O>(
        &self,
        field: &FieldMetadata<O>,
        include_collection_fields: bool,
        visiting: &mut HashSet<TypePath>,
    ) -> Result<SchemaNode, Error> {
        match field.field_type {
            FieldType::Array => {
                let element = match field.embed_type {
                    Some(EmbedType::Model(model)) => {
                        let nested = self.build_tree(model, include_collection_fields, visiting)?;
                        if nested.is_empty() {
                            SchemaNode::scalar(FieldType::Object)
                        } else {
                            SchemaNode::object(nested)
                        }
                    }
                    Some(EmbedType::Type(element)) => SchemaNode::scalar(element),
                    None => {
                        return Err(Error::IncompleteArrayType {
                            target: field.target.to_string(),
                            field: field.name.clone(),
                        });
                    }
                };
                Ok(SchemaNode::nested_array(element, field.array_depth))
            }
            FieldType::Object => {
                if let Some(EmbedType::Model(model)) = field.embed_type {
                    let nested = self.build_tree(model, include_collection_fields, visiting)?;
                    if !nested.is_empty() {
                        return Ok(SchemaNode::object(nested));
                    }
                }
                Ok(SchemaNode::scalar(FieldType::Object))
            }
            field_type => Ok(SchemaNode::scalar(field_type)),
        }
    }

    fn overlay_primary_keys(&self, target: TypePath, tree: &mut SchemaTree) -> Result<(), Error> {
        let keys: Vec<_> = self.store.primary_keys_by_target(target).collect();
        if keys.len() > 1 {
            let mut seen = HashSet::new();
            for key in &keys {
                let Some(order) = key.options.order else {
                    return Err(Error::AmbiguousPrimaryKeyOrder {
                        target: target.to_string(),
                    });
                };
                if !seen.insert(order) {
                    return Err(Error::DuplicatePrimaryKeyOrder {
                        target: target.to_string(),
                        order,
                    });
                }
            }
        }

        for key in keys {
            let node = tree.get_or_insert_with(&key.name, || SchemaNode::scalar(key.field_type));
            node.primary_key = Some(PrimaryKeyNode {
                order: key.options.order,
                auto_generate: key.options.auto_generate,
            });
        }
        Ok(())
    }
}

fn apply_field_options(node: &mut SchemaNode, field_type: FieldType, options: &FieldOptions) {
    if field_type == FieldType::String {
        if let Some(max_length) = options.max_length {
            node.max_length = Some(max_length);
        }
    }
    if Attribute::Default.applies_to(field_type) && options.default.is_some() {
        node.default = options.default.clone();
    }
    if Attribute::Timestamp.applies_to(field_type) && options.timestamp.is_some() {
        node.timestamp = options.timestamp;
    }
    if Attribute::SearchIndex.applies_to(field_type) && options.search_index.is_some() {
        node.search_index = options.search_index;
    }
    if Attribute::Sort.applies_to(field_type) && options.sort.is_some() {
        node.sort = options.sort;
    }
    if Attribute::Facet.applies_to(field_type) && options.facet.is_some() {
        node.facet = options.facet;
    }
}

fn apply_search_options(
    node: &mut SchemaNode,
    field_type: FieldType,
    options: &SearchFieldOptions,
) {
    if Attribute::SearchIndex.applies_to(field_type) && options.search_index.is_some() {
        node.search_index = options.search_index;
    }
    if Attribute::Sort.applies_to(field_type) && options.sort.is_some() {
        node.sort = options.sort;
    }
    if Attribute::Facet.applies_to(field_type) && options.facet.is_some() {
        node.facet = options.facet;
    }
    if Attribute::Id.applies_to(field_type) && options.id.is_some() {
        node.id = options.id;
    }
    if options.dimensions.is_some() {
        node.dimensions = options.dimensions;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        decl::{CollectionFieldDecl, PrimaryKeyDecl, SearchFieldDecl},
        meta::{Generated, SearchIndexMetadata, SearchIndexOptions, Timestamp},
    };

    const BOOK: TypePath = TypePath("tests::Book");
    const AUTHOR: TypePath = TypePath("tests::Author");
    const OPAQUE: TypePath = TypePath("tests::Opaque");

    fn book_store() -> MetadataStore {
        let mut store = MetadataStore::new();
        store.add_collection("books", BOOK);
        store
            .declare_field(
                AUTHOR,
                CollectionFieldDecl::new("name")
                    .native_type("String")
                    .max_length(64),
            )
            .unwrap();
        store
            .declare_field(BOOK, CollectionFieldDecl::new("id").native_type("i64"))
            .unwrap();
        store
            .declare_field(
                BOOK,
                CollectionFieldDecl::new("title")
                    .native_type("String")
                    .max_length(100)
                    .sort(true),
            )
            .unwrap();
        store
            .declare_field(
                BOOK,
                CollectionFieldDecl::new("author")
                    .native_type("Author")
                    .model(AUTHOR)
                    .facet(true),
            )
            .unwrap();
        store
            .declare_field(
                BOOK,
                CollectionFieldDecl::new("coauthors")
                    .native_type("Vec<Author>")
                    .model(AUTHOR),
            )
            .unwrap();
        store
            .declare_field(
                BOOK,
                CollectionFieldDecl::new("createdAt")
                    .native_type("DateTime<Utc>")
                    .default_value(Generated::Now)
                    .timestamp(Timestamp::CreatedAt),
            )
            .unwrap();
        store
            .declare_primary_key(
                BOOK,
                PrimaryKeyDecl::new("id")
                    .native_type("i64")
                    .order(1)
                    .auto_generate(true),
            )
            .unwrap();
        store
    }

    #[test]
    fn builds_collection_schema() {
        let store = book_store();
        let tree = SchemaBuilder::new(&store).collection_schema(BOOK).unwrap();
        assert_eq!(
            tree.to_json().unwrap(),
            concat!(
                r#"{"id":{"type":"int64","primary_key":{"order":1,"autoGenerate":true}},"#,
                r#""title":{"type":"string","maxLength":100,"sort":true},"#,
                r#""author":{"type":{"name":{"type":"string","maxLength":64}}},"#,
                r#""coauthors":{"type":"array","items":{"type":{"name":{"type":"string","maxLength":64}}}},"#,
                r#""createdAt":{"type":"date-time","default":"now()","timestamp":"createdAt"}}"#
            )
        );
    }

    #[test]
    fn embedded_model_keys_stay_out_of_parent() {
        let mut store = book_store();
        for name in ["name", "alias"] {
            store
                .declare_primary_key(
                    AUTHOR,
                    PrimaryKeyDecl::new(name)
                        .native_type("String")
                        .auto_generate(true),
                )
                .unwrap();
        }
        let tree = SchemaBuilder::new(&store).collection_schema(BOOK).unwrap();
        assert_eq!(
            serde_json::to_value(tree.get("author").unwrap()).unwrap(),
            serde_json::json!({"type": {"name": {"type": "string", "maxLength": 64}}})
        );
        let envelope = crate::wire::collection_schema("books", &tree).unwrap();
        assert_eq!(envelope["primary_key"], serde_json::json!(["id"]));
        assert!(!envelope.to_string().contains("alias"));

        assert!(matches!(
            SchemaBuilder::new(&store).collection_schema(AUTHOR),
            Err(Error::AmbiguousPrimaryKeyOrder { .. })
        ));
    }

    #[test]
    fn array_depths_expand_into_items_chains() {
        for depth in 1..=5 {
            let mut store = MetadataStore::new();
            store
                .declare_field(
                    BOOK,
                    CollectionFieldDecl::new("grid")
                        .field_type(FieldType::Array)
                        .items(FieldType::Number)
                        .array_depth(depth),
                )
                .unwrap();
            let tree = SchemaBuilder::new(&store).collection_schema(BOOK).unwrap();
            let node = tree.get("grid").unwrap();
            assert_eq!(node.array_depth(), depth as u32);

            let mut innermost = node;
            while let Some(items) = &innermost.items {
                innermost = items;
            }
            assert_eq!(innermost.field_type(), FieldType::Number);
        }
    }

    #[test]
    fn primary_key_on_existing_field_is_not_duplicated() {
        let store = book_store();
        let tree = SchemaBuilder::new(&store).collection_schema(BOOK).unwrap();
        assert_eq!(tree.iter().filter(|(name, _)| *name == "id").count(), 1);
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn primary_key_without_field_gets_stub() {
        let mut store = MetadataStore::new();
        store
            .declare_primary_key(
                BOOK,
                PrimaryKeyDecl::new("isbn").field_type(FieldType::String).order(1),
            )
            .unwrap();
        let tree = SchemaBuilder::new(&store).collection_schema(BOOK).unwrap();
        assert_eq!(
            tree.to_json().unwrap(),
            r#"{"isbn":{"type":"string","primary_key":{"order":1,"autoGenerate":false}}}"#
        );
    }

    #[test]
    fn composite_key_requires_orders() {
        let mut store = MetadataStore::new();
        for name in ["tenant", "id"] {
            store
                .declare_primary_key(BOOK, PrimaryKeyDecl::new(name).native_type("String"))
                .unwrap();
        }
        let err = SchemaBuilder::new(&store).collection_schema(BOOK).unwrap_err();
        assert!(matches!(err, Error::AmbiguousPrimaryKeyOrder { .. }));
    }

    #[test]
    fn composite_key_orders_must_be_unique() {
        let mut store = MetadataStore::new();
        for name in ["tenant", "id"] {
            store
                .declare_primary_key(
                    BOOK,
                    PrimaryKeyDecl::new(name).native_type("String").order(1),
                )
                .unwrap();
        }
        let err = SchemaBuilder::new(&store).collection_schema(BOOK).unwrap_err();
        assert!(matches!(err, Error::DuplicatePrimaryKeyOrder { order: 1, .. }));
    }

    #[test]
    fn empty_embedded_object_stays_opaque() {
        let mut store = MetadataStore::new();
        store
            .declare_field(
                BOOK,
                CollectionFieldDecl::new("extra")
                    .field_type(FieldType::Object)
                    .model(OPAQUE),
            )
            .unwrap();
        store
            .declare_field(
                BOOK,
                CollectionFieldDecl::new("extras")
                    .field_type(FieldType::Array)
                    .model(OPAQUE),
            )
            .unwrap();
        let tree = SchemaBuilder::new(&store).collection_schema(BOOK).unwrap();
        assert_eq!(
            tree.to_json().unwrap(),
            r#"{"extra":{"type":"object"},"extras":{"type":"array","items":{"type":"object"}}}"#
        );
    }

    #[test]
    fn object_fields_drop_excluded_attributes() {
        let mut store = MetadataStore::new();
        store
            .declare_field(
                BOOK,
                CollectionFieldDecl::new("meta")
                    .native_type("HashMap<String, String>")
                    .sort(true)
                    .facet(true)
                    .search_index(true)
                    .default_value(crate::meta::DefaultValue::literal(
                        serde_json::json!({"a": 1}),
                    )),
            )
            .unwrap();
        let tree = SchemaBuilder::new(&store).collection_schema(BOOK).unwrap();
        assert_eq!(
            tree.to_json().unwrap(),
            r#"{"meta":{"type":"object","default":{"a":1}}}"#
        );
    }

    #[test]
    fn search_index_schema_ignores_collection_fields() {
        let mut store = book_store();
        store.add_search_index(SearchIndexMetadata {
            name: "books_idx".to_string(),
            target: BOOK,
            options: SearchIndexOptions::default(),
        });
        store
            .declare_search_field(
                BOOK,
                SearchFieldDecl::new("title")
                    .native_type("String")
                    .sort(true)
                    .facet(false),
            )
            .unwrap();
        store
            .declare_search_field(
                BOOK,
                SearchFieldDecl::new("embedding")
                    .native_type("Vec<f64>")
                    .dimensions(4),
            )
            .unwrap();

        let tree = SchemaBuilder::new(&store).search_index_schema(BOOK).unwrap();
        assert_eq!(
            tree.to_json().unwrap(),
            concat!(
                r#"{"title":{"type":"string","sort":true,"facet":false},"#,
                r#""embedding":{"type":"array","items":{"type":"number"},"dimensions":4}}"#
            )
        );
    }

    #[test]
    fn collection_schema_merges_search_options() {
        let mut store = book_store();
        store
            .declare_search_field(
                BOOK,
                SearchFieldDecl::new("title").native_type("String").facet(true),
            )
            .unwrap();
        let tree = SchemaBuilder::new(&store).collection_schema(BOOK).unwrap();
        let title = tree.get("title").unwrap();
        assert_eq!(title.facet, Some(true));
        assert_eq!(title.max_length, Some(100));
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn self_embedding_is_rejected() {
        let mut store = MetadataStore::new();
        store
            .declare_field(
                BOOK,
                CollectionFieldDecl::new("sequel")
                    .native_type("Box<Book>")
                    .model(BOOK),
            )
            .unwrap();
        let err = SchemaBuilder::new(&store).collection_schema(BOOK).unwrap_err();
        assert!(matches!(err, Error::InvalidSchema(_)));
    }

    #[test]
    fn unknown_target_is_reported() {
        let store = MetadataStore::new();
        let err = SchemaBuilder::new(&store).collection_schema(BOOK).unwrap_err();
        assert!(matches!(err, Error::UnknownTarget(_)));
    }
}
