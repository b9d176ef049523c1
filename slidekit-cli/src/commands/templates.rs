//! `slidekit templates`: read-only template inspection.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use slidekit_core::{Block, TemplateId};

use super::{print_json, template_store};

#[derive(Subcommand, Debug)]
pub enum TemplatesCommand {
    /// List template ids.
    List,
    /// Print a template's preview document.
    Preview(TemplateArgs),
    /// Show a template's block definitions.
    Blocks(BlocksArgs),
}

#[derive(Args, Debug)]
pub struct TemplateArgs {
    /// Template id (directory name).
    pub template: String,
}

#[derive(Args, Debug)]
pub struct BlocksArgs {
    /// Template id (directory name).
    pub template: String,

    /// Emit the raw block definitions as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct BlockRow {
    #[tabled(rename = "order")]
    order: i64,
    #[tabled(rename = "block")]
    id: String,
    #[tabled(rename = "label")]
    label: String,
    #[tabled(rename = "variables")]
    variables: String,
}

pub fn run(command: TemplatesCommand, templates: Option<PathBuf>) -> Result<()> {
    let store = template_store(templates)?;

    match command {
        TemplatesCommand::List => {
            let ids = store.list().context("failed to list templates")?;
            if ids.is_empty() {
                println!("No templates found in {}.", store.root().display());
            }
            for id in ids {
                println!("{id}");
            }
        }
        TemplatesCommand::Preview(args) => {
            let id = TemplateId::from(args.template);
            let preview = store
                .preview(&id)
                .with_context(|| format!("failed to read preview of '{id}'"))?;
            print!("{preview}");
        }
        TemplatesCommand::Blocks(args) => {
            let id = TemplateId::from(args.template);
            let blocks = store
                .blocks(&id)
                .with_context(|| format!("failed to read blocks of '{id}'"))?;
            if args.json {
                print_json(&blocks)?;
            } else {
                print_blocks(&id, blocks);
            }
        }
    }

    Ok(())
}

fn print_blocks(id: &TemplateId, mut blocks: Vec<Block>) {
    println!("{} | {} blocks", id.to_string().bold(), blocks.len());
    if blocks.is_empty() {
        return;
    }
    blocks.sort_by_key(|b| b.order);
    let rows: Vec<BlockRow> = blocks
        .into_iter()
        .map(|block| BlockRow {
            order: block.order,
            variables: block.argument_names().collect::<Vec<_>>().join(", "),
            id: block.id,
            label: block.label,
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
