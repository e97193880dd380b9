//! Save path: filled form → entity instances → dependency-ordered persistence

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::FormModelMapper;
use crate::core::definition::EntityDefinitions;
use crate::core::error::{MapperError, Result};
use crate::core::form::{add_source_to_fields, last_segment, split_source, FormField, FormModel};
use crate::core::identity::{identify_entity, IdFactory};
use crate::core::instance::{is_blank, EntityInstance, EntityInstanceSet, EntityKey, FieldValue};
use crate::core::repository::FormDataRepository;

/// Outcome of one save
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SaveReport {
    /// Entities handed to the repository, in the order they were saved
    pub persisted: Vec<EntityKey>,
    /// Entities built from the form but not connected to its root entity
    pub unreached: Vec<EntityKey>,
}

/// Bookkeeping for one persistence walk
#[derive(Debug, Default)]
struct SaveWalk {
    persisted: HashSet<EntityKey>,
    /// Entities on the current recursion stack
    visiting: HashSet<EntityKey>,
    order: Vec<EntityKey>,
}

impl SaveWalk {
    fn should_persist(&self, key: &EntityKey, entities: &EntityInstanceSet) -> bool {
        entities.contains(key) && !self.persisted.contains(key)
    }
}

impl<R: FormDataRepository, I: IdFactory> FormModelMapper<R, I> {
    /// Map a filled form onto entity instances and persist them
    ///
    /// Generated ids are written back onto `form_model`: top-level entities as
    /// `<source>.id` fields, sub-form instances under their `"id"` key.
    pub fn map_to_entity_and_save(
        &self,
        definitions: &EntityDefinitions,
        form_model: &mut FormModel,
    ) -> Result<SaveReport> {
        let bind_type = form_model.form.bind_type.clone();
        add_source_to_fields(&mut form_model.form.fields, &bind_type);
        for sub_form in form_model.form.sub_forms.iter_mut() {
            add_source_to_fields(&mut sub_form.fields, &sub_form.bind_type);
        }

        let mut entities_to_save = group_fields_into_entities(definitions, form_model)?;
        let sub_entities_to_save = self.map_sub_forms(definitions, form_model)?;
        self.identify_entities(&mut entities_to_save, form_model);
        entities_to_save.add_all(sub_entities_to_save);

        let root_key = entities_to_save
            .find_entity_by_type(&bind_type)?
            .and_then(EntityInstance::key)
            .ok_or_else(|| MapperError::MissingRootEntity(bind_type.clone()))?;
        check_one_to_one_children(definitions, &entities_to_save)?;

        let mut walk = SaveWalk::default();
        self.persist(definitions, &root_key, &mut entities_to_save, &mut walk)?;

        let unreached: Vec<EntityKey> = entities_to_save
            .keys()
            .into_iter()
            .filter(|key| !walk.persisted.contains(key))
            .collect();
        for key in &unreached {
            warn!(entity = %key, root = %root_key, "entity is not related to the form's root entity, not saved");
        }

        info!(root = %root_key, saved = walk.order.len(), "saved form entities");
        Ok(SaveReport {
            persisted: walk.order,
            unreached,
        })
    }

    /// One entity per sub-form instance, identified and written back
    fn map_sub_forms(
        &self,
        definitions: &EntityDefinitions,
        form_model: &mut FormModel,
    ) -> Result<EntityInstanceSet> {
        let mut sub_entities = EntityInstanceSet::new();

        for sub_form in form_model.form.sub_forms.iter_mut() {
            let definition = definitions.find_entity_definition_by_type(&sub_form.bind_type)?;

            for instance in sub_form.instances.iter_mut() {
                let mut entity = definition.create_instance();
                for field in &sub_form.fields {
                    let source = field.source_or_default(&sub_form.bind_type);
                    let value = instance.get(&field.name).cloned().unwrap_or(Value::Null);
                    let persistence_name = field.persistence_name_for(&source);
                    entity.create_field(field.name.clone(), source, persistence_name, value);
                }
                entity.set_source(sub_form.bind_type.clone());

                let missing_id = entity.field("id").map_or(true, |f| is_blank(&f.value));
                if let Some(existing) = instance.get("id").filter(|v| !is_blank(v)) {
                    if missing_id {
                        let source = format!("{}.id", sub_form.bind_type);
                        entity.create_field(source.clone(), source, "id", existing.clone());
                    }
                }

                let id_field = identify_entity(&mut entity, &self.ids);
                instance.insert("id".to_string(), id_field.value);
                sub_entities.add_many(entity);
            }
        }

        Ok(sub_entities)
    }

    fn identify_entities(&self, entities: &mut EntityInstanceSet, form_model: &mut FormModel) {
        for entity in entities.iter_mut() {
            let id_field = identify_entity(entity, &self.ids);
            add_id_value_to_form_model(form_model, id_field);
        }
    }

    /// Persist `key`, its unsaved parents first and its unsaved children after
    fn persist(
        &self,
        definitions: &EntityDefinitions,
        key: &EntityKey,
        entities: &mut EntityInstanceSet,
        walk: &mut SaveWalk,
    ) -> Result<()> {
        if !walk.visiting.insert(key.clone()) {
            return Ok(());
        }
        let definition = definitions.find_entity_definition_by_type(&key.entity_type)?;

        for relation in definition.find_parents() {
            // several candidate parents are each reached from their own parents
            let parent_key = match entities.find_entities_by_type(&relation.entity_type) {
                [parent] => parent.key(),
                _ => None,
            };
            if let Some(parent_key) = parent_key {
                if walk.should_persist(&parent_key, entities) {
                    self.persist(definitions, &parent_key, entities, walk)?;
                }
            }
        }

        let mut current_id = key.id.clone();
        if walk.should_persist(key, entities) {
            if let Some(entity) = entities.get(key) {
                let mut fields = entity.to_field_map();
                // unset values are not written, so they never clear stored data
                fields.retain(|_, value| !value.is_null());

                if let Some(saved_id) = self.repository.save_entity(&key.entity_type, &fields)? {
                    if saved_id != current_id {
                        debug!(entity = %key, saved_id = %saved_id, "repository assigned a different id");
                        current_id = saved_id;
                    }
                }
                walk.persisted.insert(key.clone());
                walk.order.push(key.clone());
                debug!(entity = %key, "persisted entity");
            }
        }

        for relation in definition.find_children() {
            let child_keys: Vec<EntityKey> = if relation.kind.is_many() {
                entities
                    .find_entities_by_type(&relation.entity_type)
                    .iter()
                    .filter_map(EntityInstance::key)
                    .collect()
            } else {
                entities
                    .find_entity_by_type(&relation.entity_type)?
                    .and_then(EntityInstance::key)
                    .into_iter()
                    .collect()
            };

            let foreign_key = relation.foreign_key_field();
            for child_key in child_keys {
                if !walk.should_persist(&child_key, entities) {
                    continue;
                }
                if let Some(child) = entities.get_mut(&child_key) {
                    let source = format!("{}.{}", child.source(), foreign_key);
                    child.create_field(
                        source.clone(),
                        source,
                        foreign_key,
                        Value::String(current_id.clone()),
                    );
                }
                self.persist(definitions, &child_key, entities, walk)?;
            }
        }

        walk.visiting.remove(key);
        Ok(())
    }
}

/// Group top-level fields into one entity per type named by their source
fn group_fields_into_entities(
    definitions: &EntityDefinitions,
    form_model: &FormModel,
) -> Result<EntityInstanceSet> {
    let bind_type = &form_model.form.bind_type;
    let mut entities = EntityInstanceSet::new();

    for field in &form_model.form.fields {
        let source = field.source_or_default(bind_type);
        let (prefix, _) =
            split_source(&source).ok_or_else(|| MapperError::InvalidSourcePath(source.clone()))?;
        let entity_type = last_segment(prefix);
        let persistence_name = field.persistence_name_for(&source);
        let value = field.value.clone().unwrap_or(Value::Null);

        match entities.find_entity_by_type_mut(entity_type)? {
            Some(entity) => {
                entity.create_field(field.name.clone(), source.clone(), persistence_name, value)
            }
            None => {
                let mut entity = definitions
                    .find_entity_definition_by_type(entity_type)?
                    .create_instance();
                entity.set_source(prefix);
                entity.create_field(field.name.clone(), source.clone(), persistence_name, value);
                entities.add(entity);
            }
        }
    }

    Ok(entities)
}

/// Reject a save set holding several instances of a one-to-one child type
///
/// Runs before anything reaches the repository.
fn check_one_to_one_children(
    definitions: &EntityDefinitions,
    entities: &EntityInstanceSet,
) -> Result<()> {
    let present: BTreeSet<&str> = entities.iter().map(EntityInstance::entity_type).collect();
    for entity_type in present {
        let definition = definitions.find_entity_definition_by_type(entity_type)?;
        for relation in definition.find_children().iter().filter(|r| !r.kind.is_many()) {
            entities.find_entity_by_type(&relation.entity_type)?;
        }
    }
    Ok(())
}

/// Record a resolved id on the form: append the field, or fill it in if blank
fn add_id_value_to_form_model(form_model: &mut FormModel, id_field: FieldValue) {
    let existing = form_model
        .form
        .fields
        .iter_mut()
        .find(|f| f.source.as_deref() == Some(id_field.source.as_str()));

    match existing {
        None => form_model.form.fields.push(FormField {
            name: id_field.name,
            source: Some(id_field.source),
            persistence_name: Some(id_field.persistence_name),
            value: Some(id_field.value),
            ..Default::default()
        }),
        Some(field) => {
            if field.value.as_ref().map_or(true, is_blank) {
                field.value = Some(id_field.value);
            }
        }
    }
}
