//! Form definition and relationship loading
//!
//! The controller only sees the two loader traits; `FileDefinitionLoader`
//! reads the on-disk layout of a forms directory:
//!
//! ```text
//! forms/
//!   entity_relationship.json
//!   anc_visit/form_definition.json
//!   ec_registration/form_definition.json
//! ```

use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::definition::RelationshipEntry;
use crate::core::error::{LoadError, MapperError, Result};
use crate::core::form::FormModel;
use crate::core::project::RELATIONSHIP_FILE;

/// File name of a form definition inside its form directory
pub const FORM_DEFINITION_FILE: &str = "form_definition.json";

pub trait FormDefinitionLoader {
    /// The blank definition of `form_name`
    fn load_form_definition(&self, form_name: &str) -> Result<FormModel>;
}

pub trait EntityRelationshipLoader {
    /// Relationship entries, or `None` when the app defines no entity graph
    fn load_relationships(&self) -> Result<Option<Vec<RelationshipEntry>>>;
}

/// Loads definitions from a forms directory
#[derive(Debug, Clone)]
pub struct FileDefinitionLoader {
    forms_dir: PathBuf,
}

impl FileDefinitionLoader {
    pub fn new(forms_dir: impl Into<PathBuf>) -> Self {
        Self {
            forms_dir: forms_dir.into(),
        }
    }

    pub fn forms_dir(&self) -> &Path {
        &self.forms_dir
    }

    pub fn form_definition_path(&self, form_name: &str) -> PathBuf {
        self.forms_dir.join(form_name).join(FORM_DEFINITION_FILE)
    }

    pub fn relationship_path(&self) -> PathBuf {
        self.forms_dir.join(RELATIONSHIP_FILE)
    }

    /// Names of all forms that have a definition file, sorted
    pub fn form_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        if !self.forms_dir.is_dir() {
            return Ok(names);
        }

        let entries = fs::read_dir(&self.forms_dir).map_err(|e| load_error(&self.forms_dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| load_error(&self.forms_dir, e))?;
            let path = entry.path();
            if path.join(FORM_DEFINITION_FILE).is_file() {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }
}

impl FormDefinitionLoader for FileDefinitionLoader {
    fn load_form_definition(&self, form_name: &str) -> Result<FormModel> {
        let path = self.form_definition_path(form_name);
        let form = read_json(&path)?;
        debug!(form_name, path = %path.display(), "loaded form definition");
        Ok(form)
    }
}

impl EntityRelationshipLoader for FileDefinitionLoader {
    fn load_relationships(&self) -> Result<Option<Vec<RelationshipEntry>>> {
        let path = self.relationship_path();
        if !path.exists() {
            debug!(path = %path.display(), "no entity relationship file");
            return Ok(None);
        }
        read_json(&path).map(Some)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| load_error(path, e))?;
    serde_json::from_str(&content).map_err(|e| load_error(path, e))
}

fn load_error(path: &Path, source: impl Into<LoadError>) -> MapperError {
    MapperError::Load {
        path: path.to_path_buf(),
        source: source.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_form(dir: &Path, name: &str, json: &str) {
        let form_dir = dir.join(name);
        fs::create_dir_all(&form_dir).unwrap();
        fs::write(form_dir.join(FORM_DEFINITION_FILE), json).unwrap();
    }

    #[test]
    fn test_load_form_definition() {
        let dir = tempdir().unwrap();
        write_form(
            dir.path(),
            "anc_visit",
            r#"{"form": {"bind_type": "mother", "fields": [{"name": "age"}]}}"#,
        );

        let loader = FileDefinitionLoader::new(dir.path());
        let form = loader.load_form_definition("anc_visit").unwrap();
        assert_eq!(form.bind_type(), "mother");
        assert_eq!(form.form.fields.len(), 1);
    }

    #[test]
    fn test_missing_form_is_load_error() {
        let dir = tempdir().unwrap();
        let loader = FileDefinitionLoader::new(dir.path());
        let err = loader.load_form_definition("nope").unwrap_err();
        assert!(matches!(
            err,
            MapperError::Load { source: LoadError::Io(_), .. }
        ));
    }

    #[test]
    fn test_invalid_form_json_is_load_error() {
        let dir = tempdir().unwrap();
        write_form(dir.path(), "broken", "{ not json");
        let loader = FileDefinitionLoader::new(dir.path());
        let err = loader.load_form_definition("broken").unwrap_err();
        assert!(matches!(
            err,
            MapperError::Load { source: LoadError::Json(_), .. }
        ));
    }

    #[test]
    fn test_missing_relationship_file_means_no_graph() {
        let dir = tempdir().unwrap();
        let loader = FileDefinitionLoader::new(dir.path());
        assert!(loader.load_relationships().unwrap().is_none());
    }

    #[test]
    fn test_load_relationships() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(RELATIONSHIP_FILE),
            r#"[{"parent": "ec", "child": "mother", "field": "wife",
                 "kind": "one_to_one", "from": "ec.id", "to": "mother.ec_id"}]"#,
        )
        .unwrap();

        let loader = FileDefinitionLoader::new(dir.path());
        let entries = loader.load_relationships().unwrap().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].child, "mother");
        assert_eq!(entries[0].field, "wife");
    }

    #[test]
    fn test_form_names() {
        let dir = tempdir().unwrap();
        write_form(dir.path(), "pnc_visit", "{}");
        write_form(dir.path(), "anc_visit", "{}");
        fs::create_dir_all(dir.path().join("not_a_form")).unwrap();
        fs::write(dir.path().join(RELATIONSHIP_FILE), "[]").unwrap();

        let loader = FileDefinitionLoader::new(dir.path());
        assert_eq!(loader.form_names().unwrap(), vec!["anc_visit", "pnc_visit"]);
    }
}
