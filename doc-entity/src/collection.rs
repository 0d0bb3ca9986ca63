use std::{marker::PhantomData, sync::Arc};

use futures::{StreamExt, stream::BoxStream};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    DocModel,
    codec::{self, DecodeOptions},
    config::Config,
    cursor::{Cursor, CursorSource},
    error::Error,
    filter::Filter,
    projection::{ReadFields, SortOrder},
    proto::{
        Collation, DeleteRequest, InsertRequest, ReadRequest, ReadRequestOptions, ReadResponse,
        UpdateRequest,
    },
    search::{SearchCursor, SearchQuery, SearchSource, SearchTarget},
    transport::Transport,
    update::UpdateFields,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Case {
    Insensitive,
    Sensitive,
}

impl Case {
    pub fn as_str(&self) -> &'static str {
        match self {
            Case::Insensitive => "ci",
            Case::Sensitive => "cs",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub limit: Option<i64>,
    pub skip: Option<i64>,
    pub offset: Option<Vec<u8>>,
    pub collation: Option<Case>,
}

impl FindOptions {
    fn to_proto(&self) -> Option<ReadRequestOptions> {
        if *self == FindOptions::default() {
            return None;
        }
        Some(ReadRequestOptions {
            limit: self.limit.unwrap_or_default(),
            skip: self.skip.unwrap_or_default(),
            offset: self.offset.clone().unwrap_or_default(),
            collation: self.collation.map(|case| Collation {
                case: case.as_str().to_string(),
            }),
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindQuery {
    pub filter: Filter,
    pub read_fields: ReadFields,
    pub sort: SortOrder,
    pub options: FindOptions,
}

impl FindQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn read_fields(mut self, read_fields: ReadFields) -> Self {
        self.read_fields = read_fields;
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.options.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: i64) -> Self {
        self.options.skip = Some(skip);
        self
    }

    pub fn offset(mut self, offset: impl Into<Vec<u8>>) -> Self {
        self.options.offset = Some(offset.into());
        self
    }

    pub fn collation(mut self, case: Case) -> Self {
        self.options.collation = Some(case);
        self
    }
}

/// Stream of documents matched by a read.
pub struct ReadSource<T> {
    transport: Arc<dyn Transport>,
    request: ReadRequest,
    options: DecodeOptions,
    _marker: PhantomData<fn() -> T>,
}

impl<T> CursorSource for ReadSource<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Message = ReadResponse;
    type Item = T;

    fn initialize(&self) -> BoxStream<'static, Result<ReadResponse, Error>> {
        self.transport.read(self.request.clone())
    }

    fn transform(&self, message: ReadResponse) -> Result<T, Error> {
        codec::deserialize_slice(&message.data, self.options)
    }
}

pub type ReadCursor<T> = Cursor<ReadSource<T>>;

pub struct Collection<T> {
    name: String,
    config: Arc<Config>,
    transport: Arc<dyn Transport>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            config: self.config.clone(),
            transport: self.transport.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> Collection<T>
where
    T: DocModel + Serialize + DeserializeOwned + Send + 'static,
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

    /// Inserts the documents and returns the primary key of each one, in
    /// input order.
    pub async fn insert_many(&self, documents: &[T]) -> Result<Vec<Value>, Error> {
        let request = InsertRequest {
            project: self.config.project.clone(),
            branch: self.config.branch.clone(),
            collection: self.name.clone(),
            documents: documents
                .iter()
                .map(codec::to_bytes)
                .collect::<Result<_, _>>()?,
        };
        log::debug!("inserting {} documents into {}", documents.len(), self.name);
        let response = self.transport.insert(request).await?;
        response
            .keys
            .iter()
            .map(|key| codec::deserialize_slice::<Value>(key, self.config.decode_options()))
            .collect()
    }

    pub async fn insert_one(&self, document: &T) -> Result<Value, Error> {
        self.insert_many(std::slice::from_ref(document))
            .await?
            .into_iter()
            .next()
            .ok_or(Error::NotFound)
    }

    pub fn find_many(&self, query: FindQuery) -> Result<ReadCursor<T>, Error> {
        let request = ReadRequest {
            project: self.config.project.clone(),
            branch: self.config.branch.clone(),
            collection: self.name.clone(),
            filter: query.filter.to_json()?.into_bytes(),
            fields: optional_json(query.read_fields.is_empty(), || query.read_fields.to_json())?,
            sort: optional_json(query.sort.is_empty(), || query.sort.to_json())?,
            options: query.options.to_proto(),
        };
        Ok(Cursor::new(ReadSource {
            transport: self.transport.clone(),
            request,
            options: self.config.decode_options(),
            _marker: PhantomData,
        }))
    }

    pub async fn find_one(&self, query: FindQuery) -> Result<Option<T>, Error> {
        let mut cursor = self.find_many(query.limit(1))?;
        cursor.stream()?.next().await.transpose()
    }

    /// Applies the update to every matching document and returns how many
    /// were modified.
    pub async fn update_many(
        &self,
        filter: impl Into<Filter>,
        update: impl Into<UpdateFields>,
    ) -> Result<i32, Error> {
        let request = UpdateRequest {
            project: self.config.project.clone(),
            branch: self.config.branch.clone(),
            collection: self.name.clone(),
            fields: update.into().to_json()?.into_bytes(),
            filter: filter.into().to_json()?.into_bytes(),
        };
        let response = self.transport.update(request).await?;
        log::debug!("updated {} documents in {}", response.modified_count, self.name);
        Ok(response.modified_count)
    }

    pub async fn delete_many(&self, filter: impl Into<Filter>) -> Result<(), Error> {
        let request = DeleteRequest {
            project: self.config.project.clone(),
            branch: self.config.branch.clone(),
            collection: self.name.clone(),
            filter: filter.into().to_json()?.into_bytes(),
        };
        self.transport.delete(request).await?;
        Ok(())
    }

    pub fn search(&self, query: SearchQuery) -> Result<SearchCursor<T>, Error> {
        let source = SearchSource::new(
            SearchTarget::Collection(self.name.clone()),
            &query,
            &self.config,
            self.transport.clone(),
        )?;
        Ok(Cursor::new(source))
    }
}

pub(crate) fn optional_json(
    empty: bool,
    compile: impl FnOnce() -> Result<String, Error>,
) -> Result<Vec<u8>, Error> {
    if empty {
        return Ok(Vec::new());
    }
    Ok(compile()?.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_omitted() {
        assert_eq!(FindOptions::default().to_proto(), None);
        let options = FindQuery::new()
            .limit(5)
            .collation(Case::Insensitive)
            .options
            .to_proto()
            .unwrap();
        assert_eq!(options.limit, 5);
        assert_eq!(options.skip, 0);
        assert_eq!(options.collation.unwrap().case, "ci");
    }
}
