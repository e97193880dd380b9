//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cli::commands::{
    completions::CompletionsArgs, entity::EntityCommands, form::FormCommands, init::InitArgs,
};

#[derive(Parser)]
#[command(name = "ziggy")]
#[command(author, version, about = "Form-to-entity mapping engine")]
#[command(long_about = "Serves declarative forms pre-filled from a local entity store and maps filled forms back onto related entities.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug, Default)]
pub struct GlobalOpts {
    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging on stderr)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Print JSON on a single line
    #[arg(long, global = true)]
    pub compact: bool,

    /// Project root (default: auto-detect by finding .ziggy/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new ziggy project
    Init(InitArgs),

    /// Load, save and delete form instances
    #[command(subcommand)]
    Form(FormCommands),

    /// Inspect stored entities and the relationship graph
    #[command(subcommand)]
    Entity(EntityCommands),

    /// Show store statistics
    Status,

    /// Generate shell completions
    Completions(CompletionsArgs),
}
