//! Shared helper functions for CLI commands

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::GlobalOpts;
use crate::core::{
    Config, EntityDefinitions, EntityRelationshipLoader, FileDefinitionLoader, FormDataController,
    Project, SqliteRepository, UlidIdFactory,
};
use crate::mapper::FormModelMapper;

/// Controller wired to the project's store and forms directory
pub type ProjectController =
    FormDataController<SqliteRepository, UlidIdFactory, FileDefinitionLoader>;

/// A discovered project and its merged configuration
pub struct Workspace {
    pub project: Project,
    pub config: Config,
}

impl Workspace {
    /// Locate the project from `--project` or the current directory
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let project = discover(global).map_err(|e| miette::miette!("{}", e))?;
        let config = Config::load(Some(&project));
        Ok(Self { project, config })
    }

    pub fn repository(&self) -> Result<SqliteRepository> {
        Ok(SqliteRepository::open(&self.config.database_path(&self.project))?)
    }

    pub fn loader(&self) -> FileDefinitionLoader {
        FileDefinitionLoader::new(self.config.forms_dir(&self.project))
    }

    pub fn controller(&self) -> Result<ProjectController> {
        let mapper = FormModelMapper::new(self.repository()?, UlidIdFactory)
            .with_override_decode_passes(self.config.override_decode_passes());
        Ok(FormDataController::new(mapper, self.loader()))
    }

    /// The relationship graph; empty when the project defines none
    pub fn entity_definitions(&self) -> Result<EntityDefinitions> {
        let definitions = match self.loader().load_relationships()? {
            Some(entries) => EntityDefinitions::from_relationships(&entries)?,
            None => EntityDefinitions::default(),
        };
        Ok(definitions)
    }
}

fn discover(global: &GlobalOpts) -> std::result::Result<Project, crate::core::ProjectError> {
    match &global.project {
        Some(path) => Project::discover_from(path),
        None => Project::discover(),
    }
}

/// Write a value as JSON to stdout, pretty unless `--compact`
pub fn print_json<T: Serialize>(value: &T, global: &GlobalOpts) -> Result<()> {
    let json = if global.compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
    .into_diagnostic()?;
    println!("{}", json);
    Ok(())
}

/// Install the stderr log subscriber
///
/// `--verbose` and `--quiet` win over `ZIGGY_LOG` and the configured level.
pub fn init_logging(global: &GlobalOpts) {
    let level = if global.verbose {
        "debug".to_string()
    } else if global.quiet {
        "error".to_string()
    } else {
        let project = discover(global).ok();
        Config::load(project.as_ref()).log_level().to_string()
    };

    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    // a subscriber may already be installed
    let _ = subscriber.try_init();
}
