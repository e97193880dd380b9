//! Request-level orchestration of form get/save/delete

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::core::definition::EntityDefinitions;
use crate::core::error::Result;
use crate::core::form::{FormModel, FormParams};
use crate::core::identity::IdFactory;
use crate::core::loader::{EntityRelationshipLoader, FormDefinitionLoader};
use crate::core::repository::FormDataRepository;
use crate::mapper::{FormModelMapper, SaveReport};

/// Entity type name handed to the id factory for form submissions
const FORM_SUBMISSION: &str = "form_submission";

/// Result of saving a filled form
#[derive(Debug, Clone, Serialize)]
pub struct SaveOutcome {
    /// Request parameters as stored, with instance and root entity ids resolved
    pub params: FormParams,
    /// The form with generated ids written back
    pub form: FormModel,
    /// Entity save report; `None` when the app has no entity graph
    pub report: Option<SaveReport>,
}

/// Serves forms to clients and stores what they submit
///
/// The entity graph is loaded on first use and kept for the controller's
/// lifetime; form definitions are cached per form name.
pub struct FormDataController<R, I, L> {
    mapper: FormModelMapper<R, I>,
    loader: L,
    definitions: Option<Option<EntityDefinitions>>,
    forms: HashMap<String, FormModel>,
}

impl<R, I, L> FormDataController<R, I, L>
where
    R: FormDataRepository,
    I: IdFactory,
    L: FormDefinitionLoader + EntityRelationshipLoader,
{
    pub fn new(mapper: FormModelMapper<R, I>, loader: L) -> Self {
        Self {
            mapper,
            loader,
            definitions: None,
            forms: HashMap::new(),
        }
    }

    pub fn mapper(&self) -> &FormModelMapper<R, I> {
        &self.mapper
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// The entity graph, if the app defines one
    pub fn entity_definitions(&mut self) -> Result<Option<&EntityDefinitions>> {
        self.ensure_definitions()?;
        Ok(self.definitions())
    }

    /// The form to present for `params`
    pub fn get(&mut self, params: &FormParams) -> Result<FormModel> {
        let form = self.form_definition(&params.form_name)?;
        self.ensure_definitions()?;
        self.mapper.map_to_form_model(self.definitions(), form, params)
    }

    /// Map a filled form onto entities, then keep the submission for replay
    pub fn save(&mut self, mut params: FormParams, mut form: FormModel) -> Result<SaveOutcome> {
        self.ensure_definitions()?;

        let report = match self.definitions() {
            Some(definitions) if !definitions.is_empty() => {
                let report = self.mapper.map_to_entity_and_save(definitions, &mut form)?;
                if let Some(root_id) = form.root_entity_id() {
                    params.entity_id = Some(root_id);
                }
                Some(report)
            }
            _ => None,
        };

        if params.id.is_none() {
            params.id = Some(self.mapper.id_factory().generate_id_for(FORM_SUBMISSION));
        }
        self.mapper
            .repository()
            .save_form_submission(&params, &form)?;

        info!(
            form_name = %params.form_name,
            instance_id = ?params.id,
            entity_id = ?params.entity_id,
            "saved form submission"
        );
        Ok(SaveOutcome {
            params,
            form,
            report,
        })
    }

    /// Remove the saved instance named by `params.id`
    pub fn delete(&mut self, params: &FormParams) -> Result<bool> {
        let Some(id) = params.id.as_deref() else {
            return Ok(false);
        };
        let deleted = self
            .mapper
            .repository()
            .delete_form_instance(id, &params.form_name)?;
        debug!(form_name = %params.form_name, id, deleted, "deleted form instance");
        Ok(deleted)
    }

    fn ensure_definitions(&mut self) -> Result<()> {
        if self.definitions.is_none() {
            let definitions = match self.loader.load_relationships()? {
                Some(entries) => Some(EntityDefinitions::from_relationships(&entries)?),
                None => None,
            };
            self.definitions = Some(definitions);
        }
        Ok(())
    }

    fn definitions(&self) -> Option<&EntityDefinitions> {
        self.definitions.as_ref().and_then(Option::as_ref)
    }

    fn form_definition(&mut self, form_name: &str) -> Result<FormModel> {
        if let Some(form) = self.forms.get(form_name) {
            return Ok(form.clone());
        }
        let form = self.loader.load_form_definition(form_name)?;
        self.forms.insert(form_name.to_string(), form.clone());
        Ok(form)
    }
}
