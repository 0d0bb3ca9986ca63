mod builder;
pub mod codec;
mod collection;
mod config;
mod cursor;
mod db;
mod decl;
mod error;
mod filter;
mod meta;
mod projection;
pub mod proto;
mod schema;
mod search;
mod store;
mod transport;
pub mod type_mapper;
mod update;
mod value;
pub mod wire;

pub use builder::SchemaBuilder;
pub use codec::DecodeOptions;
pub use collection::{Case, Collection, FindOptions, FindQuery, ReadCursor, ReadSource};
pub use config::Config;
pub use cursor::{Cursor, CursorSource};
pub use db::DB;
pub use decl::{CollectionFieldDecl, FieldDecl, MAX_ARRAY_DEPTH, PrimaryKeyDecl, SearchFieldDecl};
pub use doc_entity_derive::DocModel;
pub use error::Error;
pub use filter::{
    Filter, LogicalFilter, LogicalOp, Selector, SelectorFilter, SelectorOp, filter_to_json,
};
pub use meta::{
    CollectionMetadata, DefaultValue, EmbedType, FieldMetadata, FieldOptions, FieldType, Generated,
    PrimaryKeyMetadata, PrimaryKeyOptions, SearchFieldMetadata, SearchFieldOptions,
    SearchIndexMetadata, SearchIndexOptions, Timestamp, TypePath,
};
pub use projection::{FacetFields, ReadFields, SortDirection, SortOrder, read_fields_to_json};
pub use schema::{NodeType, PrimaryKeyNode, SchemaNode, SchemaTree, is_schema_candidate};
pub use search::{
    FacetCount, FacetDistribution, FacetStats, SearchCursor, SearchIndex, SearchQuery,
    SearchResult, SearchSource,
};
pub use store::MetadataStore;
pub use transport::Transport;
pub use update::{UpdateFields, UpdateOps, update_fields_to_json};
pub use value::{FieldMap, ToFieldValue};

#[doc(hidden)]
pub use inventory;

/// DocModel trait 描述模型如何向 [`MetadataStore`] 声明集合或搜索索引结构，
/// 通常通过 `#[derive(DocModel)]` 派生
pub trait DocModel {
    /// 返回模型在存储中的类型路径
    fn type_path() -> TypePath;

    /// 声明模型的集合、搜索索引和字段，嵌入的模型先注册
    fn declare(store: &mut MetadataStore) -> Result<(), Error>;
}

// 派生宏提交的注册记录
pub struct ModelRegistration {
    pub type_path: &'static str,
    pub declare: fn(&mut MetadataStore) -> Result<(), Error>,
}

impl std::fmt::Debug for ModelRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ModelRegistration {{ type_path: {} }}", self.type_path)
    }
}

inventory::collect!(ModelRegistration);

/// 返回当前二进制中通过派生宏注册的所有模型
pub fn all_models() -> impl Iterator<Item = &'static ModelRegistration> {
    inventory::iter::<ModelRegistration>.into_iter()
}
