//! Error types for the mapping engine and its persistence boundary

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while loading or saving a form against the entity graph
#[derive(Debug, Error, Diagnostic)]
pub enum MapperError {
    #[error("unknown entity type '{0}'")]
    #[diagnostic(
        code(ziggy::entity::not_found),
        help("check that the type is declared in entity_relationship.json")
    )]
    NotFound(String),

    #[error("no relation path from '{root}' to '{sub}'")]
    #[diagnostic(code(ziggy::entity::path_not_found))]
    PathNotFound { root: String, sub: String },

    #[error("invalid entity relationship graph: {0}")]
    #[diagnostic(code(ziggy::entity::invalid_graph))]
    InvalidGraph(String),

    #[error("entity type '{0}' has more than one instance in the save set")]
    #[diagnostic(
        code(ziggy::entity::ambiguous),
        help("a one-to-many type can only be looked up as a list")
    )]
    AmbiguousCardinality(String),

    #[error("field source '{0}' does not name an entity type and a field")]
    #[diagnostic(code(ziggy::form::source_path), help("sources look like '<type>.<field>'"))]
    InvalidSourcePath(String),

    #[error("form is bound to '{0}' but no field maps onto that entity")]
    #[diagnostic(code(ziggy::form::missing_root))]
    MissingRootEntity(String),

    #[error("malformed field overrides: {0}")]
    #[diagnostic(code(ziggy::form::overrides))]
    MalformedOverride(String),

    #[error("saved instance of form '{form_name}' is not valid JSON")]
    #[diagnostic(code(ziggy::form::corrupt_instance))]
    CorruptFormInstance {
        form_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to load {}", path.display())]
    #[diagnostic(code(ziggy::load))]
    Load {
        path: PathBuf,
        #[source]
        source: LoadError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Repository(#[from] RepositoryError),
}

/// Underlying cause of a definition load failure
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Failures of the persistence backend
#[derive(Debug, Error, Diagnostic)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    #[diagnostic(code(ziggy::store::sqlite))]
    Sqlite(#[from] rusqlite::Error),

    #[error("stored JSON is invalid: {0}")]
    #[diagnostic(code(ziggy::store::json))]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    #[diagnostic(code(ziggy::store::io))]
    Io(#[from] std::io::Error),

    #[error("database schema version {found} does not match expected version {expected}")]
    #[diagnostic(
        code(ziggy::store::schema_version),
        help("the database was written by a different version of ziggy")
    )]
    SchemaVersion { found: i32, expected: i32 },

    #[error("cannot save '{0}' entity without an id")]
    #[diagnostic(code(ziggy::store::missing_id))]
    MissingId(String),
}

pub type Result<T> = std::result::Result<T, MapperError>;
