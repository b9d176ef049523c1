pub mod compile;
pub mod daemon;
pub mod preview;
pub mod templates;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use slidekit_core::{Block, BoundVariables, TemplateStore};
use slidekit_preview::SlidekitConfig;

pub(crate) fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

/// `~/.slidekit/config.yaml` with the `--templates` override applied.
pub(crate) fn load_config(templates: Option<PathBuf>) -> Result<(PathBuf, SlidekitConfig)> {
    let home = home_dir()?;
    let mut config = SlidekitConfig::load_at(&home).context("failed to load slidekit config")?;
    if let Some(dir) = templates {
        config.templates_dir = Some(dir);
    }
    Ok((home, config))
}

pub(crate) fn template_store(templates: Option<PathBuf>) -> Result<TemplateStore> {
    let (_, config) = load_config(templates)?;
    Ok(TemplateStore::new(config.templates_dir()))
}

/// JSON object of variable bindings; empty when no file is given.
pub(crate) fn read_variables(path: Option<&Path>) -> Result<BoundVariables> {
    let Some(path) = path else {
        return Ok(BoundVariables::new());
    };
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON object of variables", path.display()))
}

/// JSON array of blocks, if a file is given.
pub(crate) fn read_blocks(path: Option<&Path>) -> Result<Option<Vec<Block>>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let blocks = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON array of blocks", path.display()))?;
    Ok(Some(blocks))
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to render JSON")?
    );
    Ok(())
}
