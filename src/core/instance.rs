//! Runtime entity instances and the type-indexed set assembled for a save

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::core::error::{MapperError, Result};

/// A single field value carried by an entity instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldValue {
    /// Form field name the value came from
    pub name: String,
    /// Dot path in the form hierarchy
    pub source: String,
    /// Column/key name the value is persisted under
    pub persistence_name: String,
    pub value: Value,
}

/// Identifies an entity once it has been assigned an id
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EntityKey {
    pub entity_type: String,
    pub id: String,
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.id)
    }
}

/// True for values that count as "not filled in": null or an empty string
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Render an id value as a string, if it holds one
pub fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// An instance of an entity type being assembled from form values
#[derive(Debug, Clone, PartialEq)]
pub struct EntityInstance {
    entity_type: String,
    source: String,
    /// Keyed by persistence name; at most one field per name
    fields: BTreeMap<String, FieldValue>,
}

impl EntityInstance {
    pub fn new(entity_type: impl Into<String>) -> Self {
        let entity_type = entity_type.into();
        Self {
            source: entity_type.clone(),
            entity_type,
            fields: BTreeMap::new(),
        }
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Dot-path prefix of the form fields this instance was built from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = source.into();
    }

    /// Create or replace the field stored under `persistence_name`
    pub fn create_field(
        &mut self,
        name: impl Into<String>,
        source: impl Into<String>,
        persistence_name: impl Into<String>,
        value: Value,
    ) {
        self.add_field(FieldValue {
            name: name.into(),
            source: source.into(),
            persistence_name: persistence_name.into(),
            value,
        });
    }

    pub fn add_field(&mut self, field: FieldValue) {
        self.fields.insert(field.persistence_name.clone(), field);
    }

    pub fn field(&self, persistence_name: &str) -> Option<&FieldValue> {
        self.fields.get(persistence_name)
    }

    pub fn field_mut(&mut self, persistence_name: &str) -> Option<&mut FieldValue> {
        self.fields.get_mut(persistence_name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldValue> {
        self.fields.values()
    }

    /// The instance's id, if one has been assigned
    pub fn id(&self) -> Option<String> {
        self.field("id").and_then(|f| id_string(&f.value))
    }

    pub fn key(&self) -> Option<EntityKey> {
        self.id().map(|id| EntityKey {
            entity_type: self.entity_type.clone(),
            id,
        })
    }

    /// Flatten to the persistence-name → value map handed to the repository
    pub fn to_field_map(&self) -> Map<String, Value> {
        self.fields
            .values()
            .map(|f| (f.persistence_name.clone(), f.value.clone()))
            .collect()
    }
}

/// Instances held for one entity type
#[derive(Debug, Clone, PartialEq)]
pub enum Cardinality {
    One(EntityInstance),
    Many(Vec<EntityInstance>),
}

impl Cardinality {
    pub fn instances(&self) -> &[EntityInstance] {
        match self {
            Cardinality::One(instance) => std::slice::from_ref(instance),
            Cardinality::Many(list) => list,
        }
    }

    pub fn instances_mut(&mut self) -> &mut [EntityInstance] {
        match self {
            Cardinality::One(instance) => std::slice::from_mut(instance),
            Cardinality::Many(list) => list,
        }
    }

    fn into_instances(self) -> Vec<EntityInstance> {
        match self {
            Cardinality::One(instance) => vec![instance],
            Cardinality::Many(list) => list,
        }
    }

    fn push(&mut self, instance: EntityInstance) {
        if let Cardinality::One(_) = self {
            let previous = std::mem::replace(self, Cardinality::Many(Vec::with_capacity(2)));
            if let Cardinality::Many(list) = self {
                list.extend(previous.into_instances());
            }
        }
        if let Cardinality::Many(list) = self {
            list.push(instance);
        }
    }
}

/// Type-indexed collection of entity instances for one save
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityInstanceSet {
    slots: BTreeMap<String, Cardinality>,
}

impl EntityInstanceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instance; a second instance of the same type turns the slot into `Many`
    pub fn add(&mut self, instance: EntityInstance) {
        match self.slots.get_mut(instance.entity_type()) {
            Some(slot) => slot.push(instance),
            None => {
                self.slots
                    .insert(instance.entity_type().to_string(), Cardinality::One(instance));
            }
        }
    }

    /// Add an instance to a `Many` slot regardless of how many it holds
    pub fn add_many(&mut self, instance: EntityInstance) {
        match self.slots.get_mut(instance.entity_type()) {
            Some(slot) => slot.push(instance),
            None => {
                self.slots.insert(
                    instance.entity_type().to_string(),
                    Cardinality::Many(vec![instance]),
                );
            }
        }
    }

    /// Merge every instance of `other` into this set, keeping its cardinality
    pub fn add_all(&mut self, other: EntityInstanceSet) {
        for (_, slot) in other.slots {
            match slot {
                Cardinality::One(instance) => self.add(instance),
                Cardinality::Many(list) => {
                    for instance in list {
                        self.add_many(instance);
                    }
                }
            }
        }
    }

    /// Look up the single instance of a type
    ///
    /// Fails with `AmbiguousCardinality` when the slot holds several instances.
    pub fn find_entity_by_type(&self, entity_type: &str) -> Result<Option<&EntityInstance>> {
        match self.slots.get(entity_type) {
            None => Ok(None),
            Some(slot) => match slot.instances() {
                [] => Ok(None),
                [single] => Ok(Some(single)),
                _ => Err(MapperError::AmbiguousCardinality(entity_type.to_string())),
            },
        }
    }

    pub fn find_entity_by_type_mut(
        &mut self,
        entity_type: &str,
    ) -> Result<Option<&mut EntityInstance>> {
        match self.slots.get_mut(entity_type) {
            None => Ok(None),
            Some(slot) => match slot.instances_mut() {
                [] => Ok(None),
                [single] => Ok(Some(single)),
                _ => Err(MapperError::AmbiguousCardinality(entity_type.to_string())),
            },
        }
    }

    /// All instances of a type, whatever the slot's cardinality
    pub fn find_entities_by_type(&self, entity_type: &str) -> &[EntityInstance] {
        self.slots
            .get(entity_type)
            .map(Cardinality::instances)
            .unwrap_or(&[])
    }

    pub fn slot(&self, entity_type: &str) -> Option<&Cardinality> {
        self.slots.get(entity_type)
    }

    pub fn get(&self, key: &EntityKey) -> Option<&EntityInstance> {
        self.find_entities_by_type(&key.entity_type)
            .iter()
            .find(|e| e.id().as_deref() == Some(key.id.as_str()))
    }

    pub fn get_mut(&mut self, key: &EntityKey) -> Option<&mut EntityInstance> {
        self.slots
            .get_mut(&key.entity_type)?
            .instances_mut()
            .iter_mut()
            .find(|e| e.id().as_deref() == Some(key.id.as_str()))
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityInstance> {
        self.slots.values().flat_map(|slot| slot.instances().iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut EntityInstance> {
        self.slots
            .values_mut()
            .flat_map(|slot| slot.instances_mut().iter_mut())
    }

    /// Keys of every identified instance
    pub fn keys(&self) -> Vec<EntityKey> {
        self.iter().filter_map(EntityInstance::key).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.values().map(|slot| slot.instances().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn child(id: &str) -> EntityInstance {
        let mut instance = EntityInstance::new("child");
        instance.create_field("child.id", "child.id", "id", json!(id));
        instance
    }

    #[test]
    fn test_create_field_replaces_same_persistence_name() {
        let mut mother = EntityInstance::new("mother");
        mother.create_field("age", "mother.age", "age", json!(30));
        mother.create_field("mother_age", "mother.age", "age", json!(31));

        assert_eq!(mother.fields().count(), 1);
        assert_eq!(mother.field("age").unwrap().value, json!(31));
        assert_eq!(mother.field("age").unwrap().name, "mother_age");
    }

    #[test]
    fn test_field_map_uses_persistence_names() {
        let mut mother = EntityInstance::new("mother");
        mother.create_field("mother_name", "mother.name", "name", json!("Asha"));
        let map = mother.to_field_map();
        assert_eq!(map.get("name"), Some(&json!("Asha")));
        assert!(map.get("mother_name").is_none());
    }

    #[test]
    fn test_id_accepts_numbers_and_rejects_blank() {
        let mut instance = EntityInstance::new("ec");
        assert!(instance.id().is_none());
        instance.create_field("id", "ec.id", "id", json!(""));
        assert!(instance.id().is_none());
        instance.create_field("id", "ec.id", "id", json!(42));
        assert_eq!(instance.id().as_deref(), Some("42"));
    }

    #[test]
    fn test_second_instance_promotes_to_many() {
        let mut set = EntityInstanceSet::new();
        set.add(child("c1"));
        assert!(matches!(set.slot("child"), Some(Cardinality::One(_))));

        set.add(child("c2"));
        assert!(matches!(set.slot("child"), Some(Cardinality::Many(list)) if list.len() == 2));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_find_by_type_rejects_many() {
        let mut set = EntityInstanceSet::new();
        set.add_many(child("c1"));
        assert!(set.find_entity_by_type("child").unwrap().is_some());

        set.add_many(child("c2"));
        let err = set.find_entity_by_type("child").unwrap_err();
        assert!(matches!(err, MapperError::AmbiguousCardinality(t) if t == "child"));
        assert_eq!(set.find_entities_by_type("child").len(), 2);
    }

    #[test]
    fn test_find_missing_type_is_none() {
        let set = EntityInstanceSet::new();
        assert!(set.find_entity_by_type("mother").unwrap().is_none());
        assert!(set.find_entities_by_type("mother").is_empty());
    }

    #[test]
    fn test_lookup_by_key() {
        let mut set = EntityInstanceSet::new();
        set.add_many(child("c1"));
        set.add_many(child("c2"));

        let key = EntityKey {
            entity_type: "child".to_string(),
            id: "c2".to_string(),
        };
        assert!(set.contains(&key));
        set.get_mut(&key)
            .unwrap()
            .create_field("child.name", "child.name", "name", json!("Ravi"));
        assert_eq!(set.get(&key).unwrap().field("name").unwrap().value, json!("Ravi"));

        let missing = EntityKey {
            entity_type: "child".to_string(),
            id: "c3".to_string(),
        };
        assert!(!set.contains(&missing));
    }

    #[test]
    fn test_add_all_keeps_many_slots() {
        let mut top = EntityInstanceSet::new();
        top.add(EntityInstance::new("mother"));

        let mut subs = EntityInstanceSet::new();
        subs.add_many(child("c1"));
        top.add_all(subs);

        assert!(matches!(top.slot("child"), Some(Cardinality::Many(_))));
        assert!(matches!(top.slot("mother"), Some(Cardinality::One(_))));
        assert_eq!(top.keys().len(), 1);
    }
}
