//! Project discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::config::FORMS_DIR;

/// Name of the marker directory at the project root
pub const PROJECT_DIR: &str = ".ziggy";

/// Relationship document created by `ziggy init`
pub const RELATIONSHIP_FILE: &str = "entity_relationship.json";

/// Represents a ziggy project
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory of the project (parent of .ziggy/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current = std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new project structure at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if root.join(PROJECT_DIR).exists() {
            return Err(ProjectError::AlreadyExists(root));
        }
        Self::create_structure(root)
    }

    /// Initialize even if .ziggy/ exists; existing forms are left alone
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self::create_structure(root)
    }

    fn create_structure(root: PathBuf) -> Result<Self, ProjectError> {
        let io = |e: std::io::Error| ProjectError::IoError(e.to_string());
        let project = Self { root };

        std::fs::create_dir_all(project.ziggy_dir()).map_err(io)?;
        std::fs::write(project.config_path(), Self::default_config()).map_err(io)?;

        let forms = project.root.join(FORMS_DIR);
        std::fs::create_dir_all(&forms).map_err(io)?;
        let relationships = forms.join(RELATIONSHIP_FILE);
        if !relationships.exists() {
            std::fs::write(&relationships, "[]\n").map_err(io)?;
        }

        Ok(project)
    }

    fn default_config() -> &'static str {
        r#"# ziggy project configuration

# SQLite database holding entities and saved form instances
# database: .ziggy/forms.db

# Directory with <form>/form_definition.json and entity_relationship.json
# forms_dir: forms

# How many times field overrides are URL-decoded before parsing
# override_decode_passes: 2

# Log filter when neither --verbose nor --quiet is given
# log_level: warn
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .ziggy configuration directory
    pub fn ziggy_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.ziggy_dir().join("config.yaml")
    }

    /// Join a relative path onto the project root; absolute paths pass through
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not a ziggy project (searched from {searched_from:?}). Run 'ziggy init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("ziggy project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_project_init_creates_structure() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        assert!(project.ziggy_dir().is_dir());
        assert!(project.config_path().exists());
        assert!(project.root().join("forms").is_dir());
        let relationships =
            std::fs::read_to_string(project.root().join("forms").join(RELATIONSHIP_FILE)).unwrap();
        assert_eq!(relationships.trim(), "[]");
    }

    #[test]
    fn test_project_init_fails_if_exists() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let err = Project::init(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::AlreadyExists(_)));
    }

    #[test]
    fn test_init_force_keeps_relationships() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let relationships = project.root().join("forms").join(RELATIONSHIP_FILE);
        std::fs::write(&relationships, r#"[{"parent":"ec"}]"#).unwrap();

        Project::init_force(tmp.path()).unwrap();
        assert_eq!(
            std::fs::read_to_string(&relationships).unwrap(),
            r#"[{"parent":"ec"}]"#
        );
    }

    #[test]
    fn test_discover_from_subdirectory() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let nested = project.root().join("forms").join("anc_visit");
        std::fs::create_dir_all(&nested).unwrap();

        let found = Project::discover_from(&nested).unwrap();
        assert_eq!(found.root(), project.root());
    }

    #[test]
    fn test_discover_outside_project() {
        let tmp = tempdir().unwrap();
        let err = Project::discover_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::NotFound { .. }));
    }
}
