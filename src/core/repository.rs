//! Persistence boundary consumed by the mapper and controller

use serde_json::{Map, Value};

use crate::core::definition::EntityDefinitions;
use crate::core::error::RepositoryError;
use crate::core::form::{FormModel, FormParams};
use crate::core::hierarchy::EntityHierarchy;

/// Storage and query operations the mapping engine relies on
///
/// Calls are synchronous; one load or save runs to completion before the
/// next request touching the same hierarchy is accepted.
pub trait FormDataRepository {
    /// Serialized form instance previously saved for `(id, form_name)`
    fn get_form_instance_by_form_type_and_id(
        &self,
        id: &str,
        form_name: &str,
    ) -> Result<Option<String>, RepositoryError>;

    /// Load the root entity and its related entities as a nested tree
    fn load_entity_hierarchy(
        &self,
        definitions: &EntityDefinitions,
        root_type: &str,
        root_id: &str,
    ) -> Result<EntityHierarchy, RepositoryError>;

    /// Insert or update one entity; returns the id it was stored under
    ///
    /// Saving again with an already-assigned id must be safe.
    fn save_entity(
        &self,
        entity_type: &str,
        fields: &Map<String, Value>,
    ) -> Result<Option<String>, RepositoryError>;

    /// Store a filled form so it can be replayed verbatim on the next load
    fn save_form_submission(
        &self,
        params: &FormParams,
        model: &FormModel,
    ) -> Result<(), RepositoryError>;

    /// Remove a saved form instance; returns whether one existed
    fn delete_form_instance(&self, id: &str, form_name: &str) -> Result<bool, RepositoryError>;
}

impl<R: FormDataRepository + ?Sized> FormDataRepository for &R {
    fn get_form_instance_by_form_type_and_id(
        &self,
        id: &str,
        form_name: &str,
    ) -> Result<Option<String>, RepositoryError> {
        (**self).get_form_instance_by_form_type_and_id(id, form_name)
    }

    fn load_entity_hierarchy(
        &self,
        definitions: &EntityDefinitions,
        root_type: &str,
        root_id: &str,
    ) -> Result<EntityHierarchy, RepositoryError> {
        (**self).load_entity_hierarchy(definitions, root_type, root_id)
    }

    fn save_entity(
        &self,
        entity_type: &str,
        fields: &Map<String, Value>,
    ) -> Result<Option<String>, RepositoryError> {
        (**self).save_entity(entity_type, fields)
    }

    fn save_form_submission(
        &self,
        params: &FormParams,
        model: &FormModel,
    ) -> Result<(), RepositoryError> {
        (**self).save_form_submission(params, model)
    }

    fn delete_form_instance(&self, id: &str, form_name: &str) -> Result<bool, RepositoryError> {
        (**self).delete_form_instance(id, form_name)
    }
}
