use futures::{future::BoxFuture, stream::BoxStream};

use crate::{
    error::Error,
    proto::{
        CreateOrUpdateCollectionRequest, CreateOrUpdateCollectionResponse,
        CreateOrUpdateIndexRequest, CreateOrUpdateIndexResponse, DeleteRequest, DeleteResponse,
        InsertRequest, InsertResponse, ReadRequest, ReadResponse, SearchRequest, SearchResponse,
        UpdateRequest, UpdateResponse,
    },
};

/// RPC client the database facade talks to.
///
/// Implementations own connection handling, authentication and retries.
/// Reads and searches are server-push streams; the returned stream is
/// consumed at most once.
pub trait Transport: Send + Sync {
    fn create_or_update_collection(
        &self,
        request: CreateOrUpdateCollectionRequest,
    ) -> BoxFuture<'static, Result<CreateOrUpdateCollectionResponse, Error>>;

    fn create_or_update_index(
        &self,
        request: CreateOrUpdateIndexRequest,
    ) -> BoxFuture<'static, Result<CreateOrUpdateIndexResponse, Error>>;

    fn insert(&self, request: InsertRequest) -> BoxFuture<'static, Result<InsertResponse, Error>>;

    fn update(&self, request: UpdateRequest) -> BoxFuture<'static, Result<UpdateResponse, Error>>;

    fn delete(&self, request: DeleteRequest) -> BoxFuture<'static, Result<DeleteResponse, Error>>;

    fn read(&self, request: ReadRequest) -> BoxStream<'static, Result<ReadResponse, Error>>;

    fn search(&self, request: SearchRequest) -> BoxStream<'static, Result<SearchResponse, Error>>;
}
