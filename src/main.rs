use clap::Parser;
use miette::Result;
use ziggy::cli::{helpers, Cli, Commands};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    helpers::init_logging(&global);

    match cli.command {
        Commands::Init(args) => ziggy::cli::commands::init::run(args),
        Commands::Form(cmd) => ziggy::cli::commands::form::run(cmd, &global),
        Commands::Entity(cmd) => ziggy::cli::commands::entity::run(cmd, &global),
        Commands::Status => ziggy::cli::commands::status::run(&global),
        Commands::Completions(args) => ziggy::cli::commands::completions::run(args),
    }
}
