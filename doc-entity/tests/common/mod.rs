#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use doc_entity::{
    Error, Transport,
    proto::{
        CreateOrUpdateCollectionRequest, CreateOrUpdateCollectionResponse,
        CreateOrUpdateIndexRequest, CreateOrUpdateIndexResponse, DeleteRequest, DeleteResponse,
        InsertRequest, InsertResponse, ReadRequest, ReadResponse, SearchMeta, SearchRequest,
        SearchResponse, UpdateRequest, UpdateResponse,
    },
};
use futures::{
    FutureExt, StreamExt,
    future::{self, BoxFuture},
    stream::{self, BoxStream},
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Requests seen by the mock, plus the documents it serves back.
#[derive(Default)]
pub struct Recorded {
    pub collections: Vec<CreateOrUpdateCollectionRequest>,
    pub indexes: Vec<CreateOrUpdateIndexRequest>,
    pub inserts: Vec<InsertRequest>,
    pub updates: Vec<UpdateRequest>,
    pub deletes: Vec<DeleteRequest>,
    pub reads: Vec<ReadRequest>,
    pub searches: Vec<SearchRequest>,
    pub documents: Vec<Vec<u8>>,
    pub facets: Vec<u8>,
    pub fail_reads: bool,
}

/// In-memory transport: inserted documents are served back, unfiltered, by
/// reads and searches.
#[derive(Clone, Default)]
pub struct MockTransport {
    pub recorded: Arc<Mutex<Recorded>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut Recorded) -> R) -> R {
        f(&mut self.recorded.lock().unwrap())
    }
}

impl Transport for MockTransport {
    fn create_or_update_collection(
        &self,
        request: CreateOrUpdateCollectionRequest,
    ) -> BoxFuture<'static, Result<CreateOrUpdateCollectionResponse, Error>> {
        self.with(|recorded| recorded.collections.push(request));
        future::ready(Ok(CreateOrUpdateCollectionResponse {
            status: "created".to_string(),
            message: String::new(),
        }))
        .boxed()
    }

    fn create_or_update_index(
        &self,
        request: CreateOrUpdateIndexRequest,
    ) -> BoxFuture<'static, Result<CreateOrUpdateIndexResponse, Error>> {
        self.with(|recorded| recorded.indexes.push(request));
        future::ready(Ok(CreateOrUpdateIndexResponse {
            status: "created".to_string(),
            message: String::new(),
        }))
        .boxed()
    }

    fn insert(&self, request: InsertRequest) -> BoxFuture<'static, Result<InsertResponse, Error>> {
        let keys = self.with(|recorded| {
            let first = recorded.documents.len();
            recorded.documents.extend(request.documents.iter().cloned());
            let keys = (first..recorded.documents.len())
                .map(|position| format!(r#"{{"_key":{}}}"#, position + 1).into_bytes())
                .collect();
            recorded.inserts.push(request);
            keys
        });
        future::ready(Ok(InsertResponse {
            status: "inserted".to_string(),
            keys,
        }))
        .boxed()
    }

    fn update(&self, request: UpdateRequest) -> BoxFuture<'static, Result<UpdateResponse, Error>> {
        let modified_count = self.with(|recorded| {
            recorded.updates.push(request);
            recorded.documents.len() as i32
        });
        future::ready(Ok(UpdateResponse {
            status: "updated".to_string(),
            modified_count,
        }))
        .boxed()
    }

    fn delete(&self, request: DeleteRequest) -> BoxFuture<'static, Result<DeleteResponse, Error>> {
        self.with(|recorded| {
            recorded.deletes.push(request);
            recorded.documents.clear();
        });
        future::ready(Ok(DeleteResponse {
            status: "deleted".to_string(),
        }))
        .boxed()
    }

    fn read(&self, request: ReadRequest) -> BoxStream<'static, Result<ReadResponse, Error>> {
        let (documents, fail) = self.with(|recorded| {
            let limit = request
                .options
                .as_ref()
                .map(|options| options.limit)
                .filter(|limit| *limit > 0)
                .map_or(usize::MAX, |limit| limit as usize);
            recorded.reads.push(request);
            (
                recorded
                    .documents
                    .iter()
                    .take(limit)
                    .cloned()
                    .collect::<Vec<_>>(),
                recorded.fail_reads,
            )
        });
        if fail {
            return stream::iter(vec![Err(Error::TransportError(
                "stream reset".to_string(),
            ))])
            .boxed();
        }
        stream::iter(documents.into_iter().map(|data| {
            Ok(ReadResponse {
                data,
                resume_token: Vec::new(),
            })
        }))
        .boxed()
    }

    fn search(&self, request: SearchRequest) -> BoxStream<'static, Result<SearchResponse, Error>> {
        let response = self.with(|recorded| {
            let per_page = if request.page_size > 0 {
                request.page_size as usize
            } else {
                20
            };
            let page = request.page.max(1) as usize;
            recorded.searches.push(request);
            let hits: Vec<_> = recorded
                .documents
                .iter()
                .skip((page - 1) * per_page)
                .take(per_page)
                .cloned()
                .collect();
            SearchResponse {
                hits,
                facets: recorded.facets.clone(),
                meta: Some(SearchMeta {
                    found: recorded.documents.len() as i64,
                    total_pages: recorded.documents.len().div_ceil(per_page) as i32,
                    page: page as i32,
                    per_page: per_page as i32,
                }),
            }
        });
        stream::iter(vec![Ok(response)]).boxed()
    }
}
