//! Entity type definitions and the relationship graph
//!
//! The graph is built once from the relationship document and is read-only
//! afterwards. Referential integrity of the document (every relation names
//! its own parent and child types) is checked at construction time, so the
//! lookups below only have to deal with unknown type names.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::core::error::{MapperError, Result};
use crate::core::instance::EntityInstance;
use crate::core::relation::{Relation, RelationKind};

/// One entry of `entity_relationship.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEntry {
    pub parent: String,
    pub child: String,
    /// Display label for the relation, defaulting to the child type
    ///
    /// Hierarchies and sub-entity paths are keyed by type name, never by
    /// this label.
    #[serde(default)]
    pub field: String,
    pub kind: RelationKind,
    /// Referenced key, "<parent>.<field>"
    pub from: String,
    /// Foreign key, "<child>.<field>"
    pub to: String,
}

/// Static description of one entity type
#[derive(Debug, Clone, PartialEq)]
pub struct EntityTypeDefinition {
    entity_type: String,
    fields: BTreeSet<String>,
    parents: Vec<Relation>,
    children: Vec<Relation>,
}

impl EntityTypeDefinition {
    fn new(entity_type: &str) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            fields: BTreeSet::new(),
            parents: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Key fields declared by the relations touching this type
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    pub fn find_parents(&self) -> &[Relation] {
        &self.parents
    }

    pub fn find_children(&self) -> &[Relation] {
        &self.children
    }

    /// Create an empty instance of this type
    pub fn create_instance(&self) -> EntityInstance {
        EntityInstance::new(self.entity_type.clone())
    }
}

/// The entity relationship graph, keyed by type name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityDefinitions {
    types: BTreeMap<String, EntityTypeDefinition>,
}

impl EntityDefinitions {
    /// Build and validate the graph from relationship entries
    pub fn from_relationships(entries: &[RelationshipEntry]) -> Result<Self> {
        let mut types: BTreeMap<String, EntityTypeDefinition> = BTreeMap::new();
        let mut seen = HashSet::new();

        for entry in entries {
            let referenced = split_descriptor(&entry.from, &entry.parent, "from")?;
            let foreign_key = split_descriptor(&entry.to, &entry.child, "to")?;

            if !seen.insert((entry.parent.as_str(), entry.child.as_str(), foreign_key)) {
                return Err(MapperError::InvalidGraph(format!(
                    "duplicate relation {} -> {} on '{}'",
                    entry.parent, entry.child, entry.to
                )));
            }

            let field = if entry.field.is_empty() {
                entry.child.clone()
            } else {
                entry.field.clone()
            };

            let parent = types
                .entry(entry.parent.clone())
                .or_insert_with(|| EntityTypeDefinition::new(&entry.parent));
            parent.fields.insert(referenced.to_string());
            parent.children.push(Relation {
                entity_type: entry.child.clone(),
                kind: entry.kind,
                field: field.clone(),
                from: entry.from.clone(),
                to: entry.to.clone(),
            });

            let child = types
                .entry(entry.child.clone())
                .or_insert_with(|| EntityTypeDefinition::new(&entry.child));
            child.fields.insert(foreign_key.to_string());
            child.parents.push(Relation {
                entity_type: entry.parent.clone(),
                kind: entry.kind,
                field,
                from: entry.from.clone(),
                to: entry.to.clone(),
            });
        }

        Ok(Self { types })
    }

    /// Parse a relationship document and build the graph
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<RelationshipEntry> =
            serde_json::from_str(json).map_err(|e| MapperError::InvalidGraph(e.to_string()))?;
        Self::from_relationships(&entries)
    }

    pub fn find_entity_definition_by_type(&self, entity_type: &str) -> Result<&EntityTypeDefinition> {
        self.types
            .get(entity_type)
            .ok_or_else(|| MapperError::NotFound(entity_type.to_string()))
    }

    /// Type names leading from `root_type` down to `sub_type`, both included
    ///
    /// Walks declared parent relations upward from the sub type, breadth
    /// first, so the shortest chain wins when several exist.
    pub fn find_path_to_base_entity_from_sub_entity(
        &self,
        root_type: &str,
        sub_type: &str,
    ) -> Result<Vec<String>> {
        self.find_entity_definition_by_type(root_type)?;
        self.find_entity_definition_by_type(sub_type)?;

        // parent type -> the type it was reached from
        let mut towards_sub: HashMap<&str, &str> = HashMap::new();
        let mut seen: HashSet<&str> = HashSet::from([sub_type]);
        let mut queue: VecDeque<&str> = VecDeque::from([sub_type]);

        while let Some(current) = queue.pop_front() {
            if current == root_type {
                let mut path = vec![current.to_string()];
                let mut cursor = current;
                while let Some(next) = towards_sub.get(cursor) {
                    path.push(next.to_string());
                    cursor = *next;
                }
                return Ok(path);
            }

            let Some(definition) = self.types.get(current) else {
                continue;
            };
            for parent in definition.find_parents() {
                let parent_type = parent.entity_type.as_str();
                if seen.insert(parent_type) {
                    towards_sub.insert(parent_type, current);
                    queue.push_back(parent_type);
                }
            }
        }

        Err(MapperError::PathNotFound {
            root: root_type.to_string(),
            sub: sub_type.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityTypeDefinition> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// An empty graph means the deployment has no backing entities
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Split "<type>.<field>" and check the type against the expected one
fn split_descriptor<'a>(descriptor: &'a str, expected_type: &str, role: &str) -> Result<&'a str> {
    if expected_type.is_empty() {
        return Err(MapperError::InvalidGraph(format!(
            "relation '{}' has an empty entity type",
            descriptor
        )));
    }
    match descriptor.split_once('.') {
        Some((entity_type, field)) if entity_type == expected_type && !field.is_empty() => Ok(field),
        _ => Err(MapperError::InvalidGraph(format!(
            "'{}' must look like '{}.<field>' ({})",
            descriptor, expected_type, role
        ))),
    }
}
