//! Error types for class metadata and link walking.

use zesk_schema::SchemaError;

/// Errors raised while building class metadata or generating queries.
#[derive(Debug, thiserror::Error)]
pub enum OrmError {
    /// A class declaration is invalid.
    #[error("Class '{class}' is misconfigured: {message}")]
    Configuration {
        /// Class being built.
        class: String,
        /// What is wrong.
        message: String,
    },

    /// A class is not declared in the registry.
    #[error("Class '{class}' not found: {context}")]
    ClassNotFound {
        /// Missing class.
        class: String,
        /// Where the lookup came from.
        context: String,
    },

    /// A deferred has-many link was registered twice.
    #[error("Has-many link '{member}' registered twice for class '{class}'")]
    DuplicateLink {
        /// Owning class.
        class: String,
        /// Member name.
        member: String,
    },

    /// A link path segment is neither a has-one nor a has-many member.
    #[error("No path '{segment}' found in class '{class}'")]
    UnresolvedSegment {
        /// Unresolved segment.
        segment: String,
        /// Class searched.
        class: String,
    },

    /// A join alias is already bound to a different relation.
    #[error("Alias '{alias}' already joins '{existing}', cannot join '{requested}'")]
    AliasCollision {
        /// Alias requested.
        alias: String,
        /// Relation already joined under the alias.
        existing: String,
        /// Relation requested.
        requested: String,
    },

    /// A member type name is unknown.
    #[error("Invalid column type '{type_name}' for column '{column}'")]
    InvalidColumnType {
        /// Column declared with the type.
        column: String,
        /// Unknown type name.
        type_name: String,
    },

    /// A structurally invalid request.
    #[error("{0}")]
    Semantics(String),

    /// Schema error while building declared tables.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for ORM operations.
pub type Result<T> = std::result::Result<T, OrmError>;
