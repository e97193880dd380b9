//! `ziggy form` command - Serve, save and delete form instances

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::io::Read;
use std::path::PathBuf;

use crate::cli::helpers::{print_json, Workspace};
use crate::cli::GlobalOpts;
use crate::core::{FormModel, FormParams};

#[derive(Subcommand, Debug)]
pub enum FormCommands {
    /// List forms that have a definition
    List,

    /// Print the form to present, pre-filled from stored entities
    Get {
        /// Form name (directory under the forms dir)
        form_name: String,

        /// Root entity whose values pre-fill the form
        #[arg(long)]
        entity_id: Option<String>,

        /// Saved form instance to resume
        #[arg(long)]
        instance_id: Option<String>,

        /// URL-encoded JSON object of field name -> value
        #[arg(long)]
        overrides: Option<String>,
    },

    /// Save a filled form read from a file or stdin
    Save {
        form_name: String,

        /// Id to store the submission under (generated when omitted)
        #[arg(long)]
        instance_id: Option<String>,

        /// Filled form JSON (default: stdin)
        #[arg(long, short = 'f')]
        file: Option<PathBuf>,
    },

    /// Delete a saved form instance
    Delete {
        form_name: String,

        #[arg(long)]
        instance_id: String,
    },
}

pub fn run(cmd: FormCommands, global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    match cmd {
        FormCommands::List => run_list(&workspace, global),
        FormCommands::Get {
            form_name,
            entity_id,
            instance_id,
            overrides,
        } => {
            let params = FormParams {
                id: instance_id,
                form_name,
                entity_id,
                field_overrides: overrides,
            };
            run_get(&workspace, &params, global)
        }
        FormCommands::Save {
            form_name,
            instance_id,
            file,
        } => {
            let mut params = FormParams::new(form_name);
            params.id = instance_id;
            run_save(&workspace, params, file, global)
        }
        FormCommands::Delete {
            form_name,
            instance_id,
        } => run_delete(
            &workspace,
            &FormParams::new(form_name).with_instance_id(instance_id),
            global,
        ),
    }
}

fn run_list(workspace: &Workspace, global: &GlobalOpts) -> Result<()> {
    let names = workspace.loader().form_names()?;
    if names.is_empty() && !global.quiet {
        eprintln!(
            "{} No forms in {}",
            style("!").yellow(),
            style(workspace.loader().forms_dir().display()).cyan()
        );
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

fn run_get(workspace: &Workspace, params: &FormParams, global: &GlobalOpts) -> Result<()> {
    let mut controller = workspace.controller()?;
    let form = controller.get(params)?;
    print_json(&form, global)
}

fn run_save(
    workspace: &Workspace,
    params: FormParams,
    file: Option<PathBuf>,
    global: &GlobalOpts,
) -> Result<()> {
    let content = match file {
        Some(path) => std::fs::read_to_string(&path)
            .map_err(|e| miette::miette!("failed to read {}: {}", path.display(), e))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .into_diagnostic()?;
            buffer
        }
    };
    let form: FormModel = serde_json::from_str(&content)
        .map_err(|e| miette::miette!("filled form is not valid JSON: {}", e))?;

    let mut controller = workspace.controller()?;
    let outcome = controller.save(params, form)?;

    if !global.quiet {
        eprintln!(
            "{} Saved {} instance {}",
            style("✓").green(),
            style(&outcome.params.form_name).cyan(),
            style(outcome.params.id.as_deref().unwrap_or("-")).cyan()
        );
        if let Some(report) = &outcome.report {
            eprintln!("  Entities saved: {}", style(report.persisted.len()).cyan());
            if !report.unreached.is_empty() {
                eprintln!(
                    "  {} Not related to the root entity: {}",
                    style("!").yellow(),
                    report
                        .unreached
                        .iter()
                        .map(|key| key.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
        }
    }

    print_json(&outcome, global)
}

fn run_delete(workspace: &Workspace, params: &FormParams, global: &GlobalOpts) -> Result<()> {
    let mut controller = workspace.controller()?;
    let id = params.id.as_deref().unwrap_or_default();

    if controller.delete(params)? {
        if !global.quiet {
            println!(
                "{} Deleted {} instance {}",
                style("✓").green(),
                style(&params.form_name).cyan(),
                style(id).cyan()
            );
        }
        Ok(())
    } else {
        Err(miette::miette!(
            "no saved instance '{}' of form '{}'",
            id,
            params.form_name
        ))
    }
}
