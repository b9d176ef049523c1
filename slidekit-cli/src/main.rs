//! slidekit: compile slide decks from templates and run live previews.
//!
//! # Usage
//!
//! ```text
//! slidekit templates list|preview <id>|blocks <id> [--templates <dir>]
//! slidekit compile <template> [--vars <file>] [--blocks <file>] [--output <file>]
//! slidekit preview start <template> [--vars <file>] [--blocks <file>] [--port N] [--theme T] [--remote]
//! slidekit preview update <instance> [--vars <file>] [--blocks <file>]
//! slidekit preview stop|get <instance>
//! slidekit preview list [--json]
//! slidekit daemon start|stop|status
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use commands::{
    compile::CompileArgs, daemon::DaemonCommand, preview::PreviewCommand,
    templates::TemplatesCommand,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "slidekit",
    version,
    about = "Compile slide decks from templates and run live previews",
    long_about = None,
)]
struct Cli {
    /// Templates directory. Overrides `templates_dir` in ~/.slidekit/config.yaml.
    ///
    /// Not accepted by `preview`: the running daemon reads templates from
    /// the directory it was started with.
    #[arg(long, global = true, value_name = "DIR")]
    templates: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Inspect the available templates.
    Templates {
        #[command(subcommand)]
        command: TemplatesCommand,
    },

    /// Compile a deck locally and print or write the document.
    Compile(CompileArgs),

    /// Manage live previews through the running daemon.
    Preview {
        #[command(subcommand)]
        command: PreviewCommand,
    },

    /// Run or query the preview daemon.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let templates = cli.templates;
    match cli.command {
        Commands::Templates { command } => commands::templates::run(command, templates),
        Commands::Compile(args) => args.run(templates),
        Commands::Preview { command } => {
            if let Some(dir) = templates {
                bail!(
                    "--templates {} has no effect on previews; the daemon serves templates \
                     from its own configuration (pass it to `slidekit daemon start` instead)",
                    dir.display()
                );
            }
            commands::preview::run(command)
        }
        Commands::Daemon { command } => commands::daemon::run(command, templates),
    }
}
