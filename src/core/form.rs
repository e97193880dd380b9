//! Form definitions as read from `form_definition.json`
//!
//! Every struct keeps unknown keys in a flattened `extra` map so a form
//! survives load → save → replay without losing properties this crate does
//! not interpret.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level document: `{"form": {...}}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormModel {
    #[serde(default)]
    pub form: FormDefinition,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormDefinition {
    /// Root entity type the form is bound to
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bind_type: String,

    #[serde(default)]
    pub fields: Vec<FormField>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_forms: Vec<SubForm>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,

    /// Dot path such as "mother.age"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(
        rename = "persistenceName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub persistence_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    #[serde(rename = "shouldLoadValue", default, skip_serializing_if = "is_false")]
    pub should_load_value: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A repeatable section bound to a child entity type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubForm {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    pub bind_type: String,

    #[serde(default)]
    pub fields: Vec<FormField>,

    /// One object per repetition, keyed by field name
    #[serde(default)]
    pub instances: Vec<Map<String, Value>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Request parameters identifying which form and entity to work on
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormParams {
    /// Saved form instance id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub form_name: String,

    /// Root entity id to load values from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    /// URL-encoded JSON object of field name → value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_overrides: Option<String>,
}

impl FormParams {
    pub fn new(form_name: impl Into<String>) -> Self {
        Self {
            form_name: form_name.into(),
            ..Default::default()
        }
    }

    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_instance_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_field_overrides(mut self, overrides: impl Into<String>) -> Self {
        self.field_overrides = Some(overrides.into());
        self
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl FormModel {
    pub fn bind_type(&self) -> &str {
        &self.form.bind_type
    }

    pub fn find_field(&self, name: &str) -> Option<&FormField> {
        self.form.fields.iter().find(|f| f.name == name)
    }

    pub fn find_field_mut(&mut self, name: &str) -> Option<&mut FormField> {
        self.form.fields.iter_mut().find(|f| f.name == name)
    }

    pub fn find_field_by_source(&self, source: &str) -> Option<&FormField> {
        self.form
            .fields
            .iter()
            .find(|f| f.source.as_deref() == Some(source))
    }

    /// Value of the root entity's id field, `<bind_type>.id`
    pub fn root_entity_id(&self) -> Option<String> {
        let source = format!("{}.id", self.form.bind_type);
        self.find_field_by_source(&source)
            .and_then(|f| f.value.as_ref())
            .and_then(crate::core::instance::id_string)
    }
}

impl FormField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn loading(mut self) -> Self {
        self.should_load_value = true;
        self
    }

    /// The field's source, or `<bind_type>.<name>` when it has none
    pub fn source_or_default(&self, bind_type: &str) -> String {
        self.source
            .clone()
            .unwrap_or_else(|| format!("{}.{}", bind_type, self.name))
    }

    /// Explicit persistence name, else the last segment of the source
    pub fn persistence_name_for(&self, source: &str) -> String {
        self.persistence_name
            .clone()
            .unwrap_or_else(|| last_segment(source).to_string())
    }
}

/// Give every field without a source the default `<bind_type>.<name>`
pub fn add_source_to_fields(fields: &mut [FormField], bind_type: &str) {
    for field in fields.iter_mut().filter(|f| f.source.is_none()) {
        field.source = Some(format!("{}.{}", bind_type, field.name));
    }
}

pub fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

/// Split a source path into its entity prefix and field name
///
/// `"household.member.age"` → `Some(("household.member", "age"))`
pub fn split_source(source: &str) -> Option<(&str, &str)> {
    source
        .rsplit_once('.')
        .filter(|(prefix, field)| !prefix.is_empty() && !field.is_empty())
}

/// Entity type owning a source path: its second-to-last segment
pub fn entity_type_of(source: &str) -> Option<&str> {
    split_source(source).map(|(prefix, _)| last_segment(prefix))
}
