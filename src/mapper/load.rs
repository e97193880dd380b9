//! Load path: entity hierarchy → form model

use serde_json::{Map, Value};
use tracing::{debug, info};

use super::FormModelMapper;
use crate::core::definition::EntityDefinitions;
use crate::core::error::{MapperError, Result};
use crate::core::form::{add_source_to_fields, split_source, FormField, FormModel, FormParams};
use crate::core::hierarchy::{value_at, EntityHierarchy};
use crate::core::identity::IdFactory;
use crate::core::overrides::{apply_field_overrides, decode_field_overrides};
use crate::core::repository::FormDataRepository;

impl<R: FormDataRepository, I: IdFactory> FormModelMapper<R, I> {
    /// Produce the form model to present to the user
    ///
    /// A previously saved instance of the form wins outright. Otherwise the
    /// form is prepared (sources defaulted, sub-form instances reset) and, when
    /// a root entity id is given, filled from the stored entity hierarchy,
    /// the caller's field overrides and the sub-entities found under the root.
    pub fn map_to_form_model(
        &self,
        definitions: Option<&EntityDefinitions>,
        mut form: FormModel,
        params: &FormParams,
    ) -> Result<FormModel> {
        if let Some(saved) = self.saved_form_instance(params)? {
            info!(form_name = %params.form_name, id = ?params.id, "resuming saved form instance");
            return Ok(saved);
        }

        let Some(definitions) = definitions.filter(|d| !d.is_empty()) else {
            debug!(form_name = %params.form_name, "no entity graph, returning form as defined");
            return Ok(form);
        };

        let bind_type = form.form.bind_type.clone();
        add_source_to_fields(&mut form.form.fields, &bind_type);
        for sub_form in form.form.sub_forms.iter_mut() {
            add_source_to_fields(&mut sub_form.fields, &sub_form.bind_type);
            sub_form.instances.clear();
        }

        let Some(entity_id) = params.entity_id.as_deref().filter(|id| !id.is_empty()) else {
            return Ok(form);
        };

        let hierarchy = self
            .repository
            .load_entity_hierarchy(definitions, &bind_type, entity_id)?;
        map_field_values(&mut form, &hierarchy);

        if let Some(raw) = params.field_overrides.as_deref() {
            let overrides = decode_field_overrides(raw, self.override_decode_passes)?;
            let applied = apply_field_overrides(&mut form, overrides);
            debug!(applied, "applied field overrides");
        }

        map_field_values_for_sub_forms(&mut form, definitions, &hierarchy)?;

        info!(form_name = %params.form_name, bind_type = %bind_type, entity_id, "mapped entity onto form");
        Ok(form)
    }

    fn saved_form_instance(&self, params: &FormParams) -> Result<Option<FormModel>> {
        let Some(id) = params.id.as_deref() else {
            return Ok(None);
        };
        let Some(json) = self
            .repository
            .get_form_instance_by_form_type_and_id(id, &params.form_name)?
        else {
            return Ok(None);
        };

        let corrupt = |source| MapperError::CorruptFormInstance {
            form_name: params.form_name.clone(),
            source,
        };
        let value: Value = serde_json::from_str(&json).map_err(corrupt)?;
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value).map(Some).map_err(corrupt)
    }
}

/// Fill `shouldLoadValue` fields from their source path; unresolved paths leave the field as is
fn map_field_values(form: &mut FormModel, hierarchy: &EntityHierarchy) {
    for field in form.form.fields.iter_mut().filter(|f| f.should_load_value) {
        let Some(source) = field.source.as_deref() else {
            continue;
        };
        let persistence_name = field.persistence_name_for(source);
        let mut path: Vec<&str> = match split_source(source) {
            Some((prefix, _)) => prefix.split('.').collect(),
            None => Vec::new(),
        };
        path.push(persistence_name.as_str());
        if let Some(value) = hierarchy.value_at(&path) {
            field.value = Some(value.clone());
        }
    }
}

/// Key the field's value is stored under on its entity
fn stored_key(field: &FormField) -> Option<String> {
    field
        .source
        .as_deref()
        .map(|source| field.persistence_name_for(source))
}

/// One sub-form instance per sub-entity that has at least one loadable value
fn map_field_values_for_sub_forms(
    form: &mut FormModel,
    definitions: &EntityDefinitions,
    hierarchy: &EntityHierarchy,
) -> Result<()> {
    let bind_type = form.form.bind_type.clone();

    for sub_form in form.form.sub_forms.iter_mut() {
        let path =
            definitions.find_path_to_base_entity_from_sub_entity(&bind_type, &sub_form.bind_type)?;

        let sub_entities: Vec<&Value> = match hierarchy.value_at(&path) {
            Some(Value::Array(list)) => list.iter().collect(),
            Some(single @ Value::Object(_)) => vec![single],
            _ => Vec::new(),
        };

        for sub_entity in sub_entities {
            let mut instance = Map::new();
            for field in sub_form.fields.iter().filter(|f| f.should_load_value) {
                let Some(key) = stored_key(field) else {
                    continue;
                };
                if let Some(value) = value_at(sub_entity, &[key.as_str()]) {
                    instance.insert(field.name.clone(), value.clone());
                }
            }
            if !instance.is_empty() {
                sub_form.instances.push(instance);
            }
        }

        debug!(
            sub_form = %sub_form.bind_type,
            instances = sub_form.instances.len(),
            "mapped sub-entities onto sub-form"
        );
    }

    Ok(())
}
