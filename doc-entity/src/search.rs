//! Full-text search over collections and standalone search indexes.

use std::{collections::BTreeMap, marker::PhantomData, sync::Arc};

use futures::stream::BoxStream;
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    DocModel,
    codec::{self, DecodeOptions},
    collection::optional_json,
    config::Config,
    cursor::{Cursor, CursorSource},
    error::Error,
    filter::Filter,
    projection::{FacetFields, SortOrder},
    proto::{SearchMeta, SearchRequest, SearchResponse},
    transport::Transport,
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchQuery {
    pub q: String,
    pub search_fields: Vec<String>,
    pub filter: Option<Filter>,
    pub facets: FacetFields,
    pub sort: SortOrder,
    pub include_fields: Vec<String>,
    pub exclude_fields: Vec<String>,
    pub hits_per_page: Option<i32>,
    pub page: Option<i32>,
}

impl SearchQuery {
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            ..Self::default()
        }
    }

    pub fn search_field(mut self, field: impl Into<String>) -> Self {
        self.search_fields.push(field.into());
        self
    }

    pub fn filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn facets(mut self, facets: FacetFields) -> Self {
        self.facets = facets;
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn include(mut self, field: impl Into<String>) -> Self {
        self.include_fields.push(field.into());
        self
    }

    pub fn exclude(mut self, field: impl Into<String>) -> Self {
        self.exclude_fields.push(field.into());
        self
    }

    pub fn hits_per_page(mut self, hits: i32) -> Self {
        self.hits_per_page = Some(hits);
        self
    }

    pub fn page(mut self, page: i32) -> Self {
        self.page = Some(page);
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct FacetCount {
    pub value: String,
    pub count: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct FacetStats {
    #[serde(default)]
    pub count: i64,
    pub avg: Option<f64>,
    pub max: Option<f64>,
    pub min: Option<f64>,
    pub sum: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct FacetDistribution {
    #[serde(default)]
    pub counts: Vec<FacetCount>,
    #[serde(default)]
    pub stats: Option<FacetStats>,
}

/// One page of search results.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult<T> {
    pub hits: Vec<T>,
    pub facets: BTreeMap<String, FacetDistribution>,
    pub meta: Option<SearchMeta>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchTarget {
    Collection(String),
    Index(String),
}

pub struct SearchSource<T> {
    transport: Arc<dyn Transport>,
    request: SearchRequest,
    options: DecodeOptions,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SearchSource<T> {
    pub(crate) fn new(
        target: SearchTarget,
        query: &SearchQuery,
        config: &Config,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, Error> {
        let (collection, index) = match target {
            SearchTarget::Collection(name) => (name, String::new()),
            SearchTarget::Index(name) => (String::new(), name),
        };
        let filter = match &query.filter {
            Some(filter) => filter.to_json()?.into_bytes(),
            None => Vec::new(),
        };
        let request = SearchRequest {
            project: config.project.clone(),
            branch: config.branch.clone(),
            collection,
            index,
            q: query.q.clone(),
            search_fields: query.search_fields.clone(),
            filter,
            facet: optional_json(query.facets.is_empty(), || query.facets.to_json())?,
            sort: optional_json(query.sort.is_empty(), || query.sort.to_json())?,
            include_fields: query.include_fields.clone(),
            exclude_fields: query.exclude_fields.clone(),
            page_size: query.hits_per_page.unwrap_or_default(),
            page: query.page.unwrap_or_default(),
        };
        Ok(Self {
            transport,
            request,
            options: config.decode_options(),
            _marker: PhantomData,
        })
    }
}

impl<T> CursorSource for SearchSource<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Message = SearchResponse;
    type Item = SearchResult<T>;

    fn initialize(&self) -> BoxStream<'static, Result<SearchResponse, Error>> {
        self.transport.search(self.request.clone())
    }

    fn transform(&self, message: SearchResponse) -> Result<SearchResult<T>, Error> {
        let hits = message
            .hits
            .iter()
            .map(|hit| codec::deserialize_slice(hit, self.options))
            .collect::<Result<Vec<T>, Error>>()?;
        let facets = if message.facets.is_empty() {
            BTreeMap::new()
        } else {
            codec::deserialize_slice(&message.facets, self.options)?
        };
        Ok(SearchResult {
            hits,
            facets,
            meta: message.meta,
        })
    }
}

pub type SearchCursor<T> = Cursor<SearchSource<T>>;

pub struct SearchIndex<T> {
    name: String,
    config: Arc<Config>,
    transport: Arc<dyn Transport>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for SearchIndex<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            config: self.config.clone(),
            transport: self.transport.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> SearchIndex<T>
where
    T: DocModel + DeserializeOwned + Send + 'static,
{
    pub(crate) fn new(
        name: impl Into<String>,
        config: Arc<Config>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            transport,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn search(&self, query: SearchQuery) -> Result<SearchCursor<T>, Error> {
        let source = SearchSource::new(
            SearchTarget::Index(self.name.clone()),
            &query,
            &self.config,
            self.transport.clone(),
        )?;
        Ok(Cursor::new(source))
    }
}
