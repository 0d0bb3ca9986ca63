//! Request and response messages exchanged with the transport.
//!
//! Compiled JSON (schemas, documents, filters, updates, projections) travels
//! as opaque bytes inside these messages.

#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateOrUpdateCollectionRequest {
    #[prost(string, tag = "1")]
    pub project: String,
    #[prost(string, tag = "2")]
    pub branch: String,
    #[prost(string, tag = "3")]
    pub collection: String,
    #[prost(bytes = "vec", tag = "4")]
    pub schema: Vec<u8>,
    #[prost(bool, tag = "5")]
    pub only_create: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateOrUpdateCollectionResponse {
    #[prost(string, tag = "1")]
    pub status: String,
    #[prost(string, tag = "2")]
    pub message: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateOrUpdateIndexRequest {
    #[prost(string, tag = "1")]
    pub project: String,
    #[prost(string, tag = "2")]
    pub branch: String,
    #[prost(string, tag = "3")]
    pub name: String,
    #[prost(bytes = "vec", tag = "4")]
    pub schema: Vec<u8>,
    #[prost(bool, tag = "5")]
    pub only_create: bool,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateOrUpdateIndexResponse {
    #[prost(string, tag = "1")]
    pub status: String,
    #[prost(string, tag = "2")]
    pub message: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct InsertRequest {
    #[prost(string, tag = "1")]
    pub project: String,
    #[prost(string, tag = "2")]
    pub branch: String,
    #[prost(string, tag = "3")]
    pub collection: String,
    #[prost(bytes = "vec", repeated, tag = "4")]
    pub documents: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct InsertResponse {
    #[prost(string, tag = "1")]
    pub status: String,
    /// Primary key of each inserted document as a JSON object.
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub keys: Vec<Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct UpdateRequest {
    #[prost(string, tag = "1")]
    pub project: String,
    #[prost(string, tag = "2")]
    pub branch: String,
    #[prost(string, tag = "3")]
    pub collection: String,
    #[prost(bytes = "vec", tag = "4")]
    pub fields: Vec<u8>,
    #[prost(bytes = "vec", tag = "5")]
    pub filter: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct UpdateResponse {
    #[prost(string, tag = "1")]
    pub status: String,
    #[prost(int32, tag = "2")]
    pub modified_count: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DeleteRequest {
    #[prost(string, tag = "1")]
    pub project: String,
    #[prost(string, tag = "2")]
    pub branch: String,
    #[prost(string, tag = "3")]
    pub collection: String,
    #[prost(bytes = "vec", tag = "4")]
    pub filter: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DeleteResponse {
    #[prost(string, tag = "1")]
    pub status: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Collation {
    /// `ci` or `cs`.
    #[prost(string, tag = "1")]
    pub case: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ReadRequestOptions {
    #[prost(int64, tag = "1")]
    pub limit: i64,
    #[prost(int64, tag = "2")]
    pub skip: i64,
    #[prost(bytes = "vec", tag = "3")]
    pub offset: Vec<u8>,
    #[prost(message, optional, tag = "4")]
    pub collation: Option<Collation>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ReadRequest {
    #[prost(string, tag = "1")]
    pub project: String,
    #[prost(string, tag = "2")]
    pub branch: String,
    #[prost(string, tag = "3")]
    pub collection: String,
    #[prost(bytes = "vec", tag = "4")]
    pub filter: Vec<u8>,
    #[prost(bytes = "vec", tag = "5")]
    pub fields: Vec<u8>,
    #[prost(bytes = "vec", tag = "6")]
    pub sort: Vec<u8>,
    #[prost(message, optional, tag = "7")]
    pub options: Option<ReadRequestOptions>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ReadResponse {
    #[prost(bytes = "vec", tag = "1")]
    pub data: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub resume_token: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SearchRequest {
    #[prost(string, tag = "1")]
    pub project: String,
    #[prost(string, tag = "2")]
    pub branch: String,
    /// Set when searching a collection.
    #[prost(string, tag = "3")]
    pub collection: String,
    /// Set when searching a standalone search index.
    #[prost(string, tag = "4")]
    pub index: String,
    #[prost(string, tag = "5")]
    pub q: String,
    #[prost(string, repeated, tag = "6")]
    pub search_fields: Vec<String>,
    #[prost(bytes = "vec", tag = "7")]
    pub filter: Vec<u8>,
    #[prost(bytes = "vec", tag = "8")]
    pub facet: Vec<u8>,
    #[prost(bytes = "vec", tag = "9")]
    pub sort: Vec<u8>,
    #[prost(string, repeated, tag = "10")]
    pub include_fields: Vec<String>,
    #[prost(string, repeated, tag = "11")]
    pub exclude_fields: Vec<String>,
    #[prost(int32, tag = "12")]
    pub page_size: i32,
    #[prost(int32, tag = "13")]
    pub page: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SearchMeta {
    #[prost(int64, tag = "1")]
    pub found: i64,
    #[prost(int32, tag = "2")]
    pub total_pages: i32,
    #[prost(int32, tag = "3")]
    pub page: i32,
    #[prost(int32, tag = "4")]
    pub per_page: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SearchResponse {
    /// One JSON document per hit.
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub hits: Vec<Vec<u8>>,
    /// Facet distributions as a JSON object keyed by field.
    #[prost(bytes = "vec", tag = "2")]
    pub facets: Vec<u8>,
    #[prost(message, optional, tag = "3")]
    pub meta: Option<SearchMeta>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn read_request_survives_encoding() {
        let request = ReadRequest {
            project: "library".to_string(),
            branch: "main".to_string(),
            collection: "books".to_string(),
            filter: br#"{"title":"Dune"}"#.to_vec(),
            options: Some(ReadRequestOptions {
                limit: 1,
                collation: Some(Collation {
                    case: "ci".to_string(),
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        let decoded = ReadRequest::decode(request.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded, request);
    }
}
