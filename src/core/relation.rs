//! Relationship cardinality and directed relation edges

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cardinality of a parent/child relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    OneToOne,
    OneToMany,
}

impl RelationKind {
    /// Get the string representation used in relationship documents
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::OneToOne => "one_to_one",
            RelationKind::OneToMany => "one_to_many",
        }
    }

    pub fn is_many(&self) -> bool {
        matches!(self, RelationKind::OneToMany)
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RelationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "one_to_one" => Ok(RelationKind::OneToOne),
            "one_to_many" => Ok(RelationKind::OneToMany),
            _ => Err(format!("Unknown relation kind: {}", s)),
        }
    }
}

/// A directed edge between two entity types
///
/// The same relationship entry appears twice in the graph: as a child relation
/// on the parent type and as a parent relation on the child type. In both
/// cases `entity_type` names the type at the other end of the edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Type at the other end of the edge
    pub entity_type: String,
    pub kind: RelationKind,
    /// Label of the relation (e.g. "children"); hierarchy keys use type names
    pub field: String,
    /// Referenced key on the parent, as "<parent>.<field>"
    pub from: String,
    /// Foreign key on the child, as "<child>.<field>"
    pub to: String,
}

impl Relation {
    /// Field on the child entity that holds the parent's id
    pub fn foreign_key_field(&self) -> &str {
        field_segment(&self.to)
    }

    /// Field on the parent entity that children reference
    pub fn referenced_field(&self) -> &str {
        field_segment(&self.from)
    }
}

fn field_segment(descriptor: &str) -> &str {
    descriptor
        .split_once('.')
        .map(|(_, field)| field)
        .unwrap_or(descriptor)
}
