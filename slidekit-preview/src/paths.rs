use std::path::{Path, PathBuf};

pub const DAEMON_SOCKET: &str = "daemon.sock";
pub const CONFIG_FILE: &str = "config.yaml";

pub fn slidekit_root(home: &Path) -> PathBuf {
    home.join(".slidekit")
}

pub fn templates_root(home: &Path) -> PathBuf {
    slidekit_root(home).join("templates")
}

pub fn run_dir(home: &Path) -> PathBuf {
    slidekit_root(home).join("run")
}

pub fn socket_path(home: &Path) -> PathBuf {
    slidekit_root(home).join(DAEMON_SOCKET)
}

pub fn config_path(home: &Path) -> PathBuf {
    slidekit_root(home).join(CONFIG_FILE)
}

/// Per-process directory holding the backing files of live previews.
pub fn preview_root(run_dir: &Path) -> PathBuf {
    run_dir.join(format!("previews-{}", std::process::id()))
}
