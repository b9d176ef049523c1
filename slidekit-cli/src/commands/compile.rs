//! `slidekit compile`: one-shot local compilation, no daemon needed.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use slidekit_compiler::Compiler;
use slidekit_core::TemplateId;

use super::{read_blocks, read_variables, template_store};

/// Arguments for `slidekit compile`.
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Template id (directory name).
    pub template: String,

    /// JSON file with variable bindings.
    #[arg(long, value_name = "FILE")]
    pub vars: Option<PathBuf>,

    /// JSON file with the block list. Defaults to every block of the template.
    #[arg(long, value_name = "FILE")]
    pub blocks: Option<PathBuf>,

    /// Write the document here instead of stdout.
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl CompileArgs {
    pub fn run(self, templates: Option<PathBuf>) -> Result<()> {
        let store = template_store(templates)?;
        let id = TemplateId::from(self.template);
        let variables = read_variables(self.vars.as_deref())?;
        let blocks = match read_blocks(self.blocks.as_deref())? {
            Some(blocks) => blocks,
            None => store
                .blocks(&id)
                .with_context(|| format!("failed to read blocks of '{id}'"))?,
        };

        let document = Compiler::new(store)
            .compile(&id, &variables, &blocks)
            .with_context(|| format!("failed to compile '{id}'"))?;

        match self.output {
            Some(path) => {
                fs::write(&path, document.as_str())
                    .with_context(|| format!("write {}", path.display()))?;
                eprintln!("wrote {}", path.display());
            }
            None => print!("{document}"),
        }
        Ok(())
    }
}
