#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Cannot infer field type for {target}.{field} (native type `{native}`)")]
    CannotInferFieldType {
        target: String,
        field: String,
        native: String,
    },
    #[error("Array field {target}.{field} has no element type")]
    IncompleteArrayType { target: String, field: String },
    #[error("Invalid field type: {0}")]
    InvalidFieldType(String),
    #[error("Vector field {target}.{field} must be an array of numbers")]
    InvalidVectorField { target: String, field: String },
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
    #[error("{target} declares several primary keys without an explicit order")]
    AmbiguousPrimaryKeyOrder { target: String },
    #[error("{target} declares primary key order {order} more than once")]
    DuplicatePrimaryKeyOrder { target: String, order: u32 },
    #[error("No metadata registered for {0}")]
    UnknownTarget(String),
    #[error("Cursor is already in use, reset it before consuming again")]
    CursorInUse,
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    #[error("Invalid update: {0}")]
    InvalidUpdate(String),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Json error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Transport error: {0}")]
    TransportError(String),
    #[error("Not found")]
    NotFound,
}
