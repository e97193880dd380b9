//! `ziggy status` command - Store statistics

use console::style;
use miette::Result;

use crate::cli::helpers::Workspace;
use crate::cli::GlobalOpts;

pub fn run(global: &GlobalOpts) -> Result<()> {
    let workspace = Workspace::open(global)?;
    let repository = workspace.repository()?;
    let stats = repository.statistics()?;
    let forms = workspace.loader().form_names()?;

    println!("{}", style("Store Status").bold());
    println!("{}", style("─".repeat(40)).dim());
    println!(
        "  Database:        {}",
        workspace.config.database_path(&workspace.project).display()
    );
    println!(
        "  Forms dir:       {}",
        workspace.loader().forms_dir().display()
    );
    println!("  Forms defined:   {}", style(forms.len()).cyan());
    println!("  Saved instances: {}", style(stats.form_instances).cyan());
    println!("  Total entities:  {}", style(stats.total_entities()).cyan());

    if !stats.entities_by_type.is_empty() {
        println!();
        println!("  {}", style("By Type:").bold());
        for (entity_type, count) in &stats.entities_by_type {
            println!("    {:<16} {}", entity_type, count);
        }
    }

    Ok(())
}
