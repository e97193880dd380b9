//! `ziggy entity` command - Inspect stored entities and the relationship graph

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::helpers::{print_json, Workspace};
use crate::cli::GlobalOpts;
use crate::core::FormDataRepository;

#[derive(Subcommand, Debug)]
pub enum EntityCommands {
    /// Print a stored entity
    Show {
        entity_type: String,
        id: String,

        /// Include related parents and children
        #[arg(long)]
        hierarchy: bool,
    },

    /// Print the type path from a root entity type down to a sub-entity type
    Path { root: String, sub: String },

    /// List entity types and their relations
    Types,
}

pub fn run(cmd: EntityCommands, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    match cmd {
        EntityCommands::Show {
            entity_type,
            id,
            hierarchy,
        } => run_show(&workspace, &entity_type, &id, hierarchy, global),
        EntityCommands::Path { root, sub } => run_path(&workspace, &root, &sub),
        EntityCommands::Types => run_types(&workspace),
    }
}

fn run_show(
    workspace: &Workspace,
    entity_type: &str,
    id: &str,
    hierarchy: bool,
    global: &GlobalOpts,
) -> Result<()> {
    let repository = workspace.repository()?;
    let not_found = || miette::miette!("no '{}' entity with id '{}'", entity_type, id);

    if hierarchy {
        let definitions = workspace.entity_definitions()?;
        let tree = repository.load_entity_hierarchy(&definitions, entity_type, id)?;
        if tree.value_at(&[entity_type]).is_none() {
            return Err(not_found());
        }
        print_json(&tree, global)
    } else {
        let entity = repository
            .find_entity(entity_type, id)?
            .ok_or_else(not_found)?;
        print_json(&entity, global)
    }
}

fn run_path(workspace: &Workspace, root: &str, sub: &str) -> Result<()> {
    let definitions = workspace.entity_definitions()?;
    let path = definitions.find_path_to_base_entity_from_sub_entity(root, sub)?;
    println!("{}", path.join("."));
    Ok(())
}

fn run_types(workspace: &Workspace) -> Result<()> {
    let definitions = workspace.entity_definitions()?;
    if definitions.is_empty() {
        println!("{} No entity relationships defined", style("!").yellow());
        return Ok(());
    }

    for definition in definitions.iter() {
        println!("{}", style(definition.entity_type()).bold());
        for relation in definition.find_parents() {
            println!(
                "  {} {} ({}, {})",
                style("↑").dim(),
                relation.entity_type,
                relation.kind,
                relation.to
            );
        }
        for relation in definition.find_children() {
            println!(
                "  {} {} as {} ({}, {})",
                style("↓").dim(),
                relation.entity_type,
                style(&relation.field).cyan(),
                relation.kind,
                relation.to
            );
        }
    }
    Ok(())
}
