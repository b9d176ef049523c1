//! `slidekit preview`: live previews, served by the running daemon.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Subcommand};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use slidekit_compiler::CompileRequest;
use slidekit_core::{Block, Instance, InstanceId, InstanceStatus, TemplateId};
use slidekit_preview::{call, DaemonRequest, StartOptions, StartPreviewRequest};

use super::{home_dir, print_json, read_blocks, read_variables};

#[derive(Subcommand, Debug)]
pub enum PreviewCommand {
    /// Compile a deck and launch a preview server for it.
    Start(StartArgs),
    /// Recompile a running preview with new content.
    Update(UpdateArgs),
    /// Stop a preview and delete its backing file.
    Stop(InstanceArgs),
    /// List live previews.
    List(ListArgs),
    /// Show one preview.
    Get(InstanceArgs),
}

#[derive(Args, Debug)]
pub struct StartArgs {
    /// Template id (directory name).
    pub template: String,

    /// JSON file with variable bindings.
    #[arg(long, value_name = "FILE")]
    pub vars: Option<PathBuf>,

    /// JSON file with the block list. Defaults to every block of the template.
    #[arg(long, value_name = "FILE")]
    pub blocks: Option<PathBuf>,

    /// Serve on this port instead of the next free one.
    #[arg(long)]
    pub port: Option<u16>,

    #[arg(long)]
    pub host: Option<String>,

    /// Renderer theme.
    #[arg(long)]
    pub theme: Option<String>,

    /// Enable the renderer's remote-control mode.
    #[arg(long)]
    pub remote: bool,

    /// Emit the instance as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    pub instance: String,

    #[arg(long, value_name = "FILE")]
    pub vars: Option<PathBuf>,

    /// JSON file with the block list. Defaults to every block of the
    /// instance's template.
    #[arg(long, value_name = "FILE")]
    pub blocks: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct InstanceArgs {
    pub instance: String,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct InstanceRow {
    #[tabled(rename = "instance")]
    id: String,
    #[tabled(rename = "template")]
    template: String,
    #[tabled(rename = "port")]
    port: u16,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "url")]
    url: String,
    #[tabled(rename = "age")]
    age: String,
}

pub fn run(command: PreviewCommand) -> Result<()> {
    let home = home_dir()?;

    match command {
        PreviewCommand::Start(args) => {
            let blocks = match read_blocks(args.blocks.as_deref())? {
                Some(blocks) => blocks,
                None => template_blocks(&home, TemplateId::from(args.template.as_str()))?,
            };
            let request = DaemonRequest::StartPreview(StartPreviewRequest {
                compile: CompileRequest {
                    template_id: args.template,
                    variables: read_variables(args.vars.as_deref())?,
                    blocks: Some(blocks),
                },
                options: StartOptions {
                    port: args.port,
                    host: args.host,
                    theme: args.theme,
                    remote: args.remote,
                },
            });
            let instance: Instance = call(&home, &request).context("failed to start preview")?;
            if args.json {
                print_json(&instance)?;
            } else {
                println!(
                    "{} {} on {}",
                    "started".green().bold(),
                    instance.id,
                    instance.url.underline()
                );
            }
        }
        PreviewCommand::Update(args) => {
            let instance_id = InstanceId::from(args.instance);
            let blocks = match read_blocks(args.blocks.as_deref())? {
                Some(blocks) => blocks,
                None => {
                    let instance: Instance = call(
                        &home,
                        &DaemonRequest::GetPreview {
                            instance_id: instance_id.clone(),
                        },
                    )
                    .context("failed to look up preview")?;
                    template_blocks(&home, instance.template_id)?
                }
            };
            let _: bool = call(
                &home,
                &DaemonRequest::UpdatePreview {
                    instance_id: instance_id.clone(),
                    variables: read_variables(args.vars.as_deref())?,
                    blocks: Some(blocks),
                },
            )
            .context("failed to update preview")?;
            println!("updated {instance_id}");
        }
        PreviewCommand::Stop(args) => {
            let instance_id = InstanceId::from(args.instance);
            let _: bool = call(
                &home,
                &DaemonRequest::StopPreview {
                    instance_id: instance_id.clone(),
                },
            )
            .context("failed to stop preview")?;
            println!("stopped {instance_id}");
        }
        PreviewCommand::List(args) => {
            let instances: Vec<Instance> =
                call(&home, &DaemonRequest::ListPreviews).context("failed to list previews")?;
            if args.json {
                print_json(&instances)?;
            } else {
                print_table(instances);
            }
        }
        PreviewCommand::Get(args) => {
            let instance: Instance = call(
                &home,
                &DaemonRequest::GetPreview {
                    instance_id: InstanceId::from(args.instance),
                },
            )
            .context("failed to get preview")?;
            if args.json {
                print_json(&instance)?;
            } else {
                print_table(vec![instance]);
            }
        }
    }

    Ok(())
}

fn template_blocks(home: &std::path::Path, template_id: TemplateId) -> Result<Vec<Block>> {
    call(home, &DaemonRequest::TemplateBlocks { template_id })
        .context("failed to fetch template blocks")
}

fn print_table(instances: Vec<Instance>) {
    if instances.is_empty() {
        println!("No previews running.");
        return;
    }
    let rows: Vec<InstanceRow> = instances
        .into_iter()
        .map(|instance| InstanceRow {
            status: status_label(instance.status),
            age: format_age(instance.created_at),
            id: instance.id.0,
            template: instance.template_id.0,
            port: instance.port,
            url: instance.url,
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn status_label(status: InstanceStatus) -> String {
    let label = status.to_string().to_uppercase();
    match status {
        InstanceStatus::Starting => label.yellow().bold().to_string(),
        InstanceStatus::Running => label.green().bold().to_string(),
        InstanceStatus::Stopped => label.bright_black().to_string(),
        InstanceStatus::Error => label.red().bold().to_string(),
    }
}

fn format_age(created_at: chrono::DateTime<Utc>) -> String {
    let seconds = (Utc::now() - created_at).num_seconds().max(0);
    match seconds {
        0..=59 => format!("{seconds}s"),
        60..=3599 => format!("{}m", seconds / 60),
        _ => format!("{}h", seconds / 3600),
    }
}
