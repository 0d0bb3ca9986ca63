use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    DocModel,
    builder::SchemaBuilder,
    collection::Collection,
    config::Config,
    error::Error,
    proto::{CreateOrUpdateCollectionRequest, CreateOrUpdateIndexRequest},
    schema::SchemaTree,
    search::SearchIndex,
    store::MetadataStore,
    transport::Transport,
    wire,
};

/// Entry point for a project branch.
///
/// The metadata store is frozen when the `DB` is created; register every
/// model before calling [`DB::new`].
#[derive(Clone)]
pub struct DB {
    config: Arc<Config>,
    store: Arc<MetadataStore>,
    transport: Arc<dyn Transport>,
}

impl DB {
    pub fn new(config: Config, store: MetadataStore, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            transport,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    /// Sends the collection schema of `T` to the server.
    pub async fn create_or_update_collection<T>(&self) -> Result<Collection<T>, Error>
    where
        T: DocModel + Serialize + DeserializeOwned + Send + 'static,
    {
        let target = T::type_path();
        let name = self
            .store
            .collection_for(target)
            .map(|collection| collection.collection_name.clone())
            .ok_or_else(|| Error::UnknownTarget(target.to_string()))?;
        let tree = SchemaBuilder::new(&self.store).collection_schema(target)?;
        self.send_collection_schema(&name, &tree).await?;
        Ok(Collection::new(name, self.config.clone(), self.transport.clone()))
    }

    /// Sends a declarative collection schema, bypassing the metadata store.
    pub async fn create_or_update_collection_from_schema(
        &self,
        name: &str,
        schema: Value,
    ) -> Result<(), Error> {
        let tree = SchemaTree::from_value(schema)?;
        self.send_collection_schema(name, &tree).await
    }

    async fn send_collection_schema(&self, name: &str, tree: &SchemaTree) -> Result<(), Error> {
        let schema = serde_json::to_vec(&wire::collection_schema(name, tree)?)?;
        log::debug!("creating or updating collection {name}");
        self.transport
            .create_or_update_collection(CreateOrUpdateCollectionRequest {
                project: self.config.project.clone(),
                branch: self.config.branch.clone(),
                collection: name.to_string(),
                schema,
                only_create: false,
            })
            .await?;
        Ok(())
    }

    /// Sends the search index schema of `T` to the server.
    pub async fn create_or_update_index<T>(&self) -> Result<SearchIndex<T>, Error>
    where
        T: DocModel + DeserializeOwned + Send + 'static,
    {
        let target = T::type_path();
        let index = self
            .store
            .search_index_for(target)
            .ok_or_else(|| Error::UnknownTarget(target.to_string()))?;
        let tree = SchemaBuilder::new(&self.store).search_index_schema(target)?;
        let schema = serde_json::to_vec(&wire::search_index_schema(
            &index.name,
            &tree,
            &index.options,
        )?)?;
        log::debug!("creating or updating search index {}", index.name);
        self.transport
            .create_or_update_index(CreateOrUpdateIndexRequest {
                project: self.config.project.clone(),
                branch: self.config.branch.clone(),
                name: index.name.clone(),
                schema,
                only_create: false,
            })
            .await?;
        Ok(SearchIndex::new(
            index.name.clone(),
            self.config.clone(),
            self.transport.clone(),
        ))
    }

    /// Handle to the collection declared by `T`, without touching the server.
    pub fn collection<T>(&self) -> Result<Collection<T>, Error>
    where
        T: DocModel + Serialize + DeserializeOwned + Send + 'static,
    {
        let target = T::type_path();
        let collection = self
            .store
            .collection_for(target)
            .ok_or_else(|| Error::UnknownTarget(target.to_string()))?;
        Ok(Collection::new(
            collection.collection_name.clone(),
            self.config.clone(),
            self.transport.clone(),
        ))
    }

    pub fn search_index<T>(&self) -> Result<SearchIndex<T>, Error>
    where
        T: DocModel + DeserializeOwned + Send + 'static,
    {
        let target = T::type_path();
        let index = self
            .store
            .search_index_for(target)
            .ok_or_else(|| Error::UnknownTarget(target.to_string()))?;
        Ok(SearchIndex::new(
            index.name.clone(),
            self.config.clone(),
            self.transport.clone(),
        ))
    }
}
