//! Entity identifier generation and assignment

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use ulid::Ulid;

use crate::core::instance::{is_blank, EntityInstance, FieldValue};

/// Generates identifiers for new entities
///
/// Implementations own uniqueness: ids must not collide across the lifetime
/// of the dataset.
pub trait IdFactory {
    fn generate_id_for(&self, entity_type: &str) -> String;
}

impl<T: IdFactory + ?Sized> IdFactory for &T {
    fn generate_id_for(&self, entity_type: &str) -> String {
        (**self).generate_id_for(entity_type)
    }
}

/// ULID-based ids, sortable by creation time
#[derive(Debug, Default, Clone, Copy)]
pub struct UlidIdFactory;

impl IdFactory for UlidIdFactory {
    fn generate_id_for(&self, _entity_type: &str) -> String {
        Ulid::new().to_string()
    }
}

/// Deterministic "<type>-<n>" ids, numbered across all types
#[derive(Debug)]
pub struct SequenceIdFactory {
    next_id: AtomicU64,
}

impl SequenceIdFactory {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for SequenceIdFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl IdFactory for SequenceIdFactory {
    fn generate_id_for(&self, entity_type: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", entity_type, n)
    }
}

/// Make sure an instance carries an id and return that id field
///
/// A missing field is created as `<source>.id`, a blank one is filled in,
/// and an existing value is left alone.
pub fn identify_entity(entity: &mut EntityInstance, ids: &dyn IdFactory) -> FieldValue {
    let entity_type = entity.entity_type().to_string();

    if let Some(field) = entity.field_mut("id") {
        if is_blank(&field.value) {
            field.value = Value::String(ids.generate_id_for(&entity_type));
        }
        return field.clone();
    }

    let source = format!("{}.id", entity.source());
    let field = FieldValue {
        name: source.clone(),
        source,
        persistence_name: "id".to_string(),
        value: Value::String(ids.generate_id_for(&entity_type)),
    };
    entity.add_field(field.clone());
    field
}
