//! Entity hierarchy assembly
//!
//! Starting from the root entity, child relations are followed downward
//! (recursively) and parent relations upward. A type already on the current
//! path is not entered again, which keeps cyclic graphs finite.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::debug;

use super::SqliteRepository;
use crate::core::definition::EntityDefinitions;
use crate::core::error::RepositoryError;
use crate::core::hierarchy::EntityHierarchy;
use crate::core::instance::id_string;

impl SqliteRepository {
    pub(super) fn load_hierarchy(
        &self,
        definitions: &EntityDefinitions,
        root_type: &str,
        root_id: &str,
    ) -> Result<EntityHierarchy, RepositoryError> {
        let Some(mut root) = self.find_entity(root_type, root_id)? else {
            debug!(root_type, root_id, "root entity not found, empty hierarchy");
            return Ok(EntityHierarchy::empty());
        };

        let mut on_path = HashSet::from([root_type.to_string()]);
        self.attach_children(definitions, root_type, &mut root, &mut on_path)?;
        self.attach_parents(definitions, root_type, &mut root, &mut on_path)?;

        Ok(EntityHierarchy::rooted(root_type, root))
    }

    /// Nest related children under their type name
    fn attach_children(
        &self,
        definitions: &EntityDefinitions,
        entity_type: &str,
        entity: &mut Map<String, Value>,
        on_path: &mut HashSet<String>,
    ) -> Result<(), RepositoryError> {
        let Ok(definition) = definitions.find_entity_definition_by_type(entity_type) else {
            return Ok(());
        };

        for relation in definition.find_children() {
            if on_path.contains(&relation.entity_type) || entity.contains_key(&relation.entity_type) {
                continue;
            }
            let Some(key) = entity.get(relation.referenced_field()).and_then(id_string) else {
                continue;
            };

            let mut children = self.find_entities_by_field(
                &relation.entity_type,
                relation.foreign_key_field(),
                &key,
            )?;

            on_path.insert(relation.entity_type.clone());
            for child in children.iter_mut() {
                self.attach_children(definitions, &relation.entity_type, child, on_path)?;
            }
            on_path.remove(&relation.entity_type);

            let nested = if relation.kind.is_many() {
                Value::Array(children.into_iter().map(Value::Object).collect())
            } else {
                match children.into_iter().next() {
                    Some(child) => Value::Object(child),
                    None => continue,
                }
            };
            entity.insert(relation.entity_type.clone(), nested);
        }

        Ok(())
    }

    /// Nest the parent each foreign key points at under the parent's type name
    fn attach_parents(
        &self,
        definitions: &EntityDefinitions,
        entity_type: &str,
        entity: &mut Map<String, Value>,
        on_path: &mut HashSet<String>,
    ) -> Result<(), RepositoryError> {
        let Ok(definition) = definitions.find_entity_definition_by_type(entity_type) else {
            return Ok(());
        };

        for relation in definition.find_parents() {
            if on_path.contains(&relation.entity_type) || entity.contains_key(&relation.entity_type) {
                continue;
            }
            let Some(key) = entity.get(relation.foreign_key_field()).and_then(id_string) else {
                continue;
            };

            let parent = if relation.referenced_field() == "id" {
                self.find_entity(&relation.entity_type, &key)?
            } else {
                self.find_entities_by_field(&relation.entity_type, relation.referenced_field(), &key)?
                    .into_iter()
                    .next()
            };
            let Some(mut parent) = parent else {
                continue;
            };

            on_path.insert(relation.entity_type.clone());
            self.attach_parents(definitions, &relation.entity_type, &mut parent, on_path)?;
            on_path.remove(&relation.entity_type);

            entity.insert(relation.entity_type.clone(), Value::Object(parent));
        }

        Ok(())
    }
}
