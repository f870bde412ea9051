use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or sending explain commands.
#[derive(Error, Debug)]
pub enum Error {
    /// Argument-shape error in an index key pattern (sort/hint).
    #[error("invalid key pattern: {0}")]
    InvalidKeyPattern(String),

    /// A key pattern was given but contained no keys.
    #[error("key pattern must not be the empty list")]
    EmptyKeyPattern,

    /// Projection input was neither a document nor a list of field names.
    #[error("invalid projection: {0}")]
    InvalidProjection(String),

    #[error("bson serialization error: {0}")]
    Bson(#[from] mongodb::bson::ser::Error),

    #[error("bson deserialization error: {0}")]
    BsonDe(#[from] mongodb::bson::de::Error),

    /// MongoDB driver error, propagated unchanged.
    #[error("mongodb error: {0}")]
    Driver(#[from] mongodb::error::Error),
}

impl Error {
    pub fn invalid_key_pattern(message: impl Into<String>) -> Self {
        Self::InvalidKeyPattern(message.into())
    }

    pub fn invalid_projection(message: impl Into<String>) -> Self {
        Self::InvalidProjection(message.into())
    }
}
