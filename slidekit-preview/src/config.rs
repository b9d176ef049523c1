//! Preview and daemon configuration.
//!
//! Resolution order: built-in defaults, then `~/.slidekit/config.yaml`, then
//! whatever the CLI overrides on the loaded value.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, PreviewError};
use crate::paths::{config_path, run_dir, templates_root};

pub const DEFAULT_BASE_PORT: u16 = 3030;
pub const DEFAULT_MAX_PORT: u16 = 3130;
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Program and leading arguments used to launch the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for RendererCommand {
    fn default() -> Self {
        Self {
            program: "npx".to_string(),
            args: vec!["@slidev/cli".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub base_port: u16,
    /// Highest port the allocator hands out.
    pub max_port: u16,
    pub host: String,
    /// Time a renderer gets to exit after SIGTERM before it is killed.
    pub grace_period_ms: u64,
    pub renderer: RendererCommand,
    /// Output substrings that mark a renderer as ready.
    pub ready_markers: Vec<String>,
    /// Parent of the per-process preview directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_dir: Option<PathBuf>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            base_port: DEFAULT_BASE_PORT,
            max_port: DEFAULT_MAX_PORT,
            host: DEFAULT_HOST.to_string(),
            grace_period_ms: DEFAULT_GRACE_PERIOD.as_millis() as u64,
            renderer: RendererCommand::default(),
            ready_markers: vec!["Local:".to_string(), "ready".to_string()],
            run_dir: None,
        }
    }
}

impl PreviewConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn run_dir(&self) -> PathBuf {
        self.run_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("slidekit"))
    }

    pub fn validate(&self) -> Result<(), PreviewError> {
        if self.base_port == 0 || self.base_port > self.max_port {
            return Err(PreviewError::InvalidRequest(format!(
                "port range {}..={} is empty",
                self.base_port, self.max_port
            )));
        }
        if self.renderer.program.trim().is_empty() {
            return Err(PreviewError::InvalidRequest(
                "renderer program is empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything read from `config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlidekitConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<PathBuf>,
    pub preview: PreviewConfig,
}

impl SlidekitConfig {
    /// Load `config.yaml` under `home`, or defaults when it does not exist.
    ///
    /// Unset directories are filled with their locations under `home`.
    pub fn load_at(home: &Path) -> Result<Self, PreviewError> {
        let path = config_path(home);
        let mut config = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => SlidekitConfig::default(),
            Ok(text) => serde_yaml::from_str(&text)
                .map_err(|source| PreviewError::Config { path: path.clone(), source })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => SlidekitConfig::default(),
            Err(err) => return Err(io_err(&path, err)),
        };
        if config.templates_dir.is_none() {
            config.templates_dir = Some(templates_root(home));
        }
        if config.preview.run_dir.is_none() {
            config.preview.run_dir = Some(run_dir(home));
        }
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.templates_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("templates"))
    }
}
