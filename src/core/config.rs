//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::overrides::DEFAULT_DECODE_PASSES;
use crate::core::project::Project;
use crate::core::store::DATABASE_FILE;

/// Default directory holding form definitions, relative to the project root
pub const FORMS_DIR: &str = "forms";

/// ziggy configuration with layered hierarchy
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file
    pub database: Option<PathBuf>,

    /// Directory with `<form>/form_definition.json` and `entity_relationship.json`
    pub forms_dir: Option<PathBuf>,

    /// How many times field overrides are URL-decoded
    pub override_decode_passes: Option<usize>,

    /// tracing filter used when neither --verbose nor --quiet is given
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (resolved by the accessors)

        // 2. Global user config (~/.config/ziggy/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (.ziggy/config.yaml)
        if let Some(project) = project {
            if let Some(project_config) = Self::read_file(&project.config_path()) {
                config.merge(project_config);
            }
        }

        // 4. Environment variables
        if let Ok(database) = std::env::var("ZIGGY_DATABASE") {
            config.database = Some(PathBuf::from(database));
        }
        if let Ok(forms_dir) = std::env::var("ZIGGY_FORMS_DIR") {
            config.forms_dir = Some(PathBuf::from(forms_dir));
        }
        if let Ok(level) = std::env::var("ZIGGY_LOG") {
            config.log_level = Some(level);
        }

        config
    }

    /// Parse a config file; unreadable or invalid files are skipped
    fn read_file(path: &Path) -> Option<Config> {
        let contents = std::fs::read_to_string(path).ok()?;
        let only_comments = contents.lines().all(|line| {
            let line = line.trim();
            line.is_empty() || line.starts_with('#')
        });
        if only_comments {
            return None;
        }
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring invalid config file");
                None
            }
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "ziggy")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.database.is_some() {
            self.database = other.database;
        }
        if other.forms_dir.is_some() {
            self.forms_dir = other.forms_dir;
        }
        if other.override_decode_passes.is_some() {
            self.override_decode_passes = other.override_decode_passes;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }
    }

    /// Database path; relative paths are taken from the project root
    pub fn database_path(&self, project: &Project) -> PathBuf {
        let path = self
            .database
            .clone()
            .unwrap_or_else(|| PathBuf::from(DATABASE_FILE));
        project.resolve(&path)
    }

    /// Forms directory; relative paths are taken from the project root
    pub fn forms_dir(&self, project: &Project) -> PathBuf {
        let path = self
            .forms_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(FORMS_DIR));
        project.resolve(&path)
    }

    pub fn override_decode_passes(&self) -> usize {
        self.override_decode_passes.unwrap_or(DEFAULT_DECODE_PASSES)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("warn")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let config = Config::default();

        assert_eq!(config.database_path(&project), project.root().join(DATABASE_FILE));
        assert_eq!(config.forms_dir(&project), project.root().join("forms"));
        assert_eq!(config.override_decode_passes(), 2);
        assert_eq!(config.log_level(), "warn");
    }

    #[test]
    fn test_merge_prefers_later_layer() {
        let mut config: Config = serde_yml::from_str("database: a.db\nlog_level: info\n").unwrap();
        let project: Config = serde_yml::from_str("database: b.db\noverride_decode_passes: 1\n").unwrap();
        config.merge(project);

        assert_eq!(config.database, Some(PathBuf::from("b.db")));
        assert_eq!(config.log_level(), "info");
        assert_eq!(config.override_decode_passes(), 1);
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let elsewhere = tempdir().unwrap();
        let config = Config {
            forms_dir: Some(elsewhere.path().to_path_buf()),
            ..Default::default()
        };
        assert_eq!(config.forms_dir(&project), elsewhere.path());
    }

    #[test]
    fn test_project_config_file_is_read() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        std::fs::write(project.config_path(), "forms_dir: definitions\n").unwrap();

        let config = Config::read_file(&project.config_path()).unwrap();
        assert_eq!(config.forms_dir(&project), project.root().join("definitions"));
    }

    #[test]
    fn test_invalid_config_file_is_skipped() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.yaml");
        std::fs::write(&path, "override_decode_passes: [not, a, number]\n").unwrap();
        assert!(Config::read_file(&path).is_none());
    }
}
