use std::collections::{HashMap, HashSet};

use crate::{
    DocModel,
    decl::{CollectionFieldDecl, PrimaryKeyDecl, SearchFieldDecl},
    error::Error,
    meta::{
        CollectionMetadata, EmbedType, FieldMetadata, FieldType, PrimaryKeyMetadata,
        SearchFieldMetadata, SearchIndexMetadata, TypePath,
    },
};

/// Registry of declared collections, search indexes and their fields.
///
/// The store has a single-phase lifecycle: every model is registered first,
/// schemas are built afterwards. Lookups by target are linear scans over the
/// per-kind lists, which keep per-target insertion order.
#[derive(Debug, Default)]
pub struct MetadataStore {
    collections: HashMap<String, CollectionMetadata>,
    search_indexes: HashMap<String, SearchIndexMetadata>,
    fields: Vec<FieldMetadata>,
    primary_keys: Vec<PrimaryKeyMetadata>,
    search_fields: Vec<SearchFieldMetadata>,
    registered: HashSet<TypePath>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store holding every model that derives `DocModel` in the
    /// current binary.
    pub fn from_inventory() -> Result<Self, Error> {
        let mut store = Self::new();
        for registration in crate::all_models() {
            store.register_with(TypePath(registration.type_path), registration.declare)?;
        }
        log::debug!(
            "metadata store loaded {} models from inventory",
            store.registered.len()
        );
        Ok(store)
    }

    /// Registers a model and, through its declaration, every model it embeds.
    /// Registering the same model twice is a no-op.
    pub fn register<T: DocModel>(&mut self) -> Result<&mut Self, Error> {
        self.register_with(T::type_path(), T::declare)?;
        Ok(self)
    }

    fn register_with(
        &mut self,
        target: TypePath,
        declare: fn(&mut MetadataStore) -> Result<(), Error>,
    ) -> Result<(), Error> {
        if !self.registered.insert(target) {
            return Ok(());
        }
        log::debug!("registering model {target}");
        declare(self)
    }

    pub fn is_registered(&self, target: TypePath) -> bool {
        self.registered.contains(&target)
    }

    /// Whether anything at all was declared for the target.
    pub fn knows(&self, target: TypePath) -> bool {
        self.is_registered(target)
            || self.collection_for(target).is_some()
            || self.search_index_for(target).is_some()
            || self.fields_by_target(target).next().is_some()
            || self.search_fields_by_target(target).next().is_some()
            || self.primary_keys_by_target(target).next().is_some()
    }

    /// Adds a collection. A later collection with the same name replaces the
    /// earlier one.
    pub fn add_collection(&mut self, name: impl Into<String>, target: TypePath) {
        let collection_name = name.into();
        if let Some(previous) = self.collections.get(&collection_name) {
            if previous.target != target {
                log::warn!(
                    "collection `{collection_name}` re-registered: {} replaces {}",
                    target,
                    previous.target
                );
            }
        }
        self.collections.insert(
            collection_name.clone(),
            CollectionMetadata {
                collection_name,
                target,
            },
        );
    }

    pub fn add_search_index(&mut self, metadata: SearchIndexMetadata) {
        if let Some(previous) = self.search_indexes.get(&metadata.name) {
            if previous.target != metadata.target {
                log::warn!(
                    "search index `{}` re-registered: {} replaces {}",
                    metadata.name,
                    metadata.target,
                    previous.target
                );
            }
        }
        self.search_indexes.insert(metadata.name.clone(), metadata);
    }

    pub fn declare_field(
        &mut self,
        target: TypePath,
        decl: CollectionFieldDecl,
    ) -> Result<(), Error> {
        let field = decl.resolve(target)?;
        log::trace!("{target}.{}: {}", field.name, field.field_type);
        self.fields.push(field);
        Ok(())
    }

    pub fn declare_search_field(
        &mut self,
        target: TypePath,
        decl: SearchFieldDecl,
    ) -> Result<(), Error> {
        let field = decl.resolve(target)?;
        if field.options.dimensions.is_some() {
            let numeric_elements = matches!(
                field.embed_type,
                Some(EmbedType::Type(element)) if element.is_numeric()
            );
            if field.field_type != FieldType::Array
                || field.array_depth != 1
                || !numeric_elements
            {
                return Err(Error::InvalidVectorField {
                    target: target.to_string(),
                    field: field.name,
                });
            }
        }
        log::trace!("{target}.{} (search): {}", field.name, field.field_type);
        self.search_fields.push(field);
        Ok(())
    }

    pub fn declare_primary_key(
        &mut self,
        target: TypePath,
        decl: PrimaryKeyDecl,
    ) -> Result<(), Error> {
        let key = decl.resolve(target)?;
        self.primary_keys.push(key);
        Ok(())
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionMetadata> {
        self.collections.get(name)
    }

    pub fn collection_for(&self, target: TypePath) -> Option<&CollectionMetadata> {
        self.collections
            .values()
            .find(|collection| collection.target == target)
    }

    pub fn search_index(&self, name: &str) -> Option<&SearchIndexMetadata> {
        self.search_indexes.get(name)
    }

    pub fn search_index_for(&self, target: TypePath) -> Option<&SearchIndexMetadata> {
        self.search_indexes
            .values()
            .find(|index| index.target == target)
    }

    pub fn collections(&self) -> impl Iterator<Item = &CollectionMetadata> {
        self.collections.values()
    }

    pub fn search_indexes(&self) -> impl Iterator<Item = &SearchIndexMetadata> {
        self.search_indexes.values()
    }

    pub fn fields_by_target(&self, target: TypePath) -> impl Iterator<Item = &FieldMetadata> {
        self.fields.iter().filter(move |field| field.target == target)
    }

    pub fn search_fields_by_target(
        &self,
        target: TypePath,
    ) -> impl Iterator<Item = &SearchFieldMetadata> {
        self.search_fields
            .iter()
            .filter(move |field| field.target == target)
    }

    pub fn primary_keys_by_target(
        &self,
        target: TypePath,
    ) -> impl Iterator<Item = &PrimaryKeyMetadata> {
        self.primary_keys
            .iter()
            .filter(move |key| key.target == target)
    }
}
