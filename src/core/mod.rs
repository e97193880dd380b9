//! Core module - entity graph, form model, persistence and configuration

pub mod config;
pub mod controller;
pub mod definition;
pub mod error;
pub mod form;
pub mod hierarchy;
pub mod identity;
pub mod instance;
pub mod loader;
pub mod overrides;
pub mod project;
pub mod relation;
pub mod repository;
pub mod store;

pub use config::Config;
pub use controller::{FormDataController, SaveOutcome};
pub use definition::{EntityDefinitions, EntityTypeDefinition, RelationshipEntry};
pub use error::{LoadError, MapperError, RepositoryError, Result};
pub use form::{FormDefinition, FormField, FormModel, FormParams, SubForm};
pub use hierarchy::EntityHierarchy;
pub use identity::{IdFactory, SequenceIdFactory, UlidIdFactory};
pub use instance::{EntityInstance, EntityInstanceSet, EntityKey, FieldValue};
pub use loader::{EntityRelationshipLoader, FileDefinitionLoader, FormDefinitionLoader};
pub use project::{Project, ProjectError};
pub use relation::{Relation, RelationKind};
pub use repository::FormDataRepository;
pub use store::SqliteRepository;
