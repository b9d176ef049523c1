//! Process supervisor: one renderer process per preview instance.
//!
//! Lifecycle of an instance:
//!
//! 1. `start` reserves a port and registers the instance in one critical
//!    section, writes `<root>/<id>.md`, spawns the renderer and hands the
//!    child to a monitor task.
//! 2. The monitor forwards stdout lines and the exit status to the event
//!    loop, which applies [`transition`] under the registry lock.
//! 3. `stop` asks the monitor to terminate the child (SIGTERM, then a kill
//!    once the grace period runs out) and waits for it without holding the
//!    lock. The record, and with it the port, is released afterwards.
//!
//! Whoever removes a record from the registry deletes its backing file, so
//! each file is deleted once. Writers only rename a file into place while
//! the record is registered, so a stop that lands mid-write cannot leave a
//! file behind.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinSet;

use slidekit_core::{Instance, InstanceId, InstanceStatus, TemplateId};

use crate::config::PreviewConfig;
use crate::error::{io_err, PreviewError};
use crate::lifecycle::{transition, ProcessEvent};
use crate::paths::preview_root;
use crate::ports::PortAllocator;
use crate::readiness::{marker_probe, ReadinessProbe};
use crate::registry::{InstanceRegistry, StopRequest};

/// Per-start options. Unset fields fall back to the supervisor's config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    pub remote: bool,
}

/// Owner of the instance registry and every renderer process.
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct ProcessSupervisor {
    shared: Arc<Shared>,
}

struct Shared {
    config: PreviewConfig,
    allocator: PortAllocator,
    root: PathBuf,
    registry: Arc<Mutex<InstanceRegistry>>,
    events: mpsc::UnboundedSender<ProcessEvent>,
    sequence: AtomicU64,
}

impl ProcessSupervisor {
    /// Create the preview root and start the event loop. Must be called
    /// from within a tokio runtime.
    pub async fn init(config: PreviewConfig) -> Result<Self, PreviewError> {
        let probe = marker_probe(config.ready_markers.clone());
        Self::init_with_probe(config, probe).await
    }

    pub async fn init_with_probe(
        config: PreviewConfig,
        probe: ReadinessProbe,
    ) -> Result<Self, PreviewError> {
        config.validate()?;
        let root = preview_root(&config.run_dir());
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| io_err(&root, e))?;

        let registry = Arc::new(Mutex::new(InstanceRegistry::default()));
        let (events, events_rx) = mpsc::unbounded_channel();
        tokio::spawn(event_loop(registry.clone(), events_rx, probe));

        tracing::info!(
            root = %root.display(),
            base_port = config.base_port,
            max_port = config.max_port,
            "preview supervisor ready"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                allocator: PortAllocator::new(config.base_port, config.max_port),
                config,
                root,
                registry,
                events,
                sequence: AtomicU64::new(0),
            }),
        })
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.shared.config
    }

    /// Directory holding the backing files of live instances.
    pub fn root(&self) -> &Path {
        &self.shared.root
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Launch a renderer for `source`. Returns as soon as the process is
    /// spawned; the instance reports `starting` until its output shows it
    /// is ready.
    pub async fn start(
        &self,
        template_id: &TemplateId,
        source: &str,
        options: &StartOptions,
    ) -> Result<Instance, PreviewError> {
        let host = options
            .host
            .clone()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| self.shared.config.host.clone());
        let id = self.next_id(template_id);
        let source_path = self.shared.root.join(format!("{id}.md"));

        let instance = {
            let mut registry = self.shared.registry.lock().await;
            let port = self
                .shared
                .allocator
                .allocate(options.port, &registry.ports_in_use())?;
            let instance = Instance {
                id: id.clone(),
                port,
                status: InstanceStatus::Starting,
                url: format!("http://{host}:{port}"),
                template_id: template_id.clone(),
                source_path: source_path.clone(),
                created_at: Utc::now(),
            };
            registry.insert(instance.clone());
            instance
        };

        if let Err(err) = self.write_source(&id, source).await {
            tracing::warn!(instance = %id, error = %err, "could not write preview source");
            self.release(&id).await;
            return Err(err);
        }

        let child = match self.spawn_renderer(&instance, &host, options) {
            Ok(child) => child,
            Err(err) => {
                tracing::warn!(instance = %id, error = %err, "renderer spawn failed");
                self.release(&id).await;
                return Err(err);
            }
        };

        let (control_tx, control_rx) = mpsc::channel::<StopRequest>(1);
        if !self.shared.registry.lock().await.attach(&id, control_tx) {
            // Stopped while starting; dropping the child kills it.
            tracing::info!(instance = %id, "preview stopped before renderer attached");
            remove_source(&source_path).await;
            return Err(PreviewError::NotFound(id));
        }
        tokio::spawn(monitor(
            id.clone(),
            child,
            self.shared.events.clone(),
            control_rx,
            self.shared.config.grace_period(),
        ));

        tracing::info!(
            instance = %id,
            template = %template_id,
            port = instance.port,
            "preview starting"
        );
        Ok(instance)
    }

    /// Replace the instance's backing file with `source`. Id, port and
    /// status are unchanged.
    pub async fn update(&self, id: &InstanceId, source: &str) -> Result<(), PreviewError> {
        self.write_source(id, source).await?;
        tracing::debug!(instance = %id, bytes = source.len(), "preview source updated");
        Ok(())
    }

    /// Terminate the renderer, then drop the record and its backing file.
    pub async fn stop(&self, id: &InstanceId) -> Result<(), PreviewError> {
        let control = {
            let registry = self.shared.registry.lock().await;
            registry.control(id).ok_or_else(|| registry.missing(id))?
        };

        if let Some(control) = control {
            let (reply_tx, reply_rx) = oneshot::channel();
            // A closed channel means the process already exited.
            if control.send(reply_tx).await.is_ok() {
                let _ = reply_rx.await;
            }
        }

        if self.release(id).await {
            tracing::info!(instance = %id, "preview stopped");
        }
        Ok(())
    }

    pub async fn list(&self) -> Vec<Instance> {
        self.shared.registry.lock().await.snapshot()
    }

    pub async fn get(&self, id: &InstanceId) -> Result<Instance, PreviewError> {
        let registry = self.shared.registry.lock().await;
        registry.get(id).cloned().ok_or_else(|| registry.missing(id))
    }

    /// Stop every instance concurrently, then remove the preview root.
    pub async fn cleanup_all(&self) -> Result<(), PreviewError> {
        let ids = self.shared.registry.lock().await.ids();
        tracing::info!(count = ids.len(), "stopping all previews");

        let mut stops = JoinSet::new();
        for id in ids {
            let supervisor = self.clone();
            stops.spawn(async move { supervisor.stop(&id).await });
        }
        while let Some(joined) = stops.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::debug!(error = %err, "instance already gone"),
                Err(err) => tracing::warn!(error = %err, "stop task failed"),
            }
        }

        match tokio::fs::remove_dir_all(&self.shared.root).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_err(&self.shared.root, err)),
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn next_id(&self, template_id: &TemplateId) -> InstanceId {
        let seq = self.shared.sequence.fetch_add(1, Ordering::Relaxed);
        InstanceId(format!(
            "{template_id}-{}-{seq}",
            Utc::now().timestamp_millis()
        ))
    }

    fn spawn_renderer(
        &self,
        instance: &Instance,
        host: &str,
        options: &StartOptions,
    ) -> Result<Child, PreviewError> {
        let renderer = &self.shared.config.renderer;
        let mut command = Command::new(&renderer.program);
        command
            .args(&renderer.args)
            .args(renderer_args(instance, host, options))
            .current_dir(&self.shared.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command.spawn().map_err(|source| PreviewError::Spawn {
            program: renderer.program.clone(),
            source,
        })
    }

    /// Write `source` to a `.tmp` sibling of the instance's file, then
    /// rename it into place while the record is still registered. The
    /// registry lock is held only for the lookup and the rename; the
    /// per-instance writer keeps concurrent writes of one file apart.
    async fn write_source(&self, id: &InstanceId, source: &str) -> Result<(), PreviewError> {
        let (path, writer) = {
            let registry = self.shared.registry.lock().await;
            let record = registry.record(id).ok_or_else(|| registry.missing(id))?;
            (record.instance.source_path.clone(), record.writer.clone())
        };
        let _writing = writer.lock().await;

        let tmp = path.with_extension("md.tmp");
        if let Err(err) = tokio::fs::write(&tmp, source).await {
            remove_source(&tmp).await;
            return Err(io_err(&tmp, err));
        }

        let registry = self.shared.registry.lock().await;
        if registry.get(id).is_none() {
            // Stopped mid-write: whoever released the record found no file.
            let err = registry.missing(id);
            drop(registry);
            remove_source(&tmp).await;
            return Err(err);
        }
        let renamed = tokio::fs::rename(&tmp, &path).await;
        drop(registry);
        if let Err(err) = renamed {
            remove_source(&tmp).await;
            return Err(io_err(&path, err));
        }
        Ok(())
    }

    /// Remove the record and delete its file. Returns `false` when another
    /// path already did.
    async fn release(&self, id: &InstanceId) -> bool {
        let removed = self.shared.registry.lock().await.remove(id);
        match removed {
            Some(record) => {
                remove_source(&record.instance.source_path).await;
                true
            }
            None => false,
        }
    }
}

/// Arguments after the configured leading args:
/// `<file> --port N --host H --open false [--theme T] [--remote]`.
pub fn renderer_args(instance: &Instance, host: &str, options: &StartOptions) -> Vec<String> {
    let mut args = vec![
        instance.source_path.display().to_string(),
        "--port".to_string(),
        instance.port.to_string(),
        "--host".to_string(),
        host.to_string(),
        "--open".to_string(),
        "false".to_string(),
    ];
    if let Some(theme) = options.theme.as_deref().filter(|t| !t.is_empty()) {
        args.push("--theme".to_string());
        args.push(theme.to_string());
    }
    if options.remote {
        args.push("--remote".to_string());
    }
    args
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

async fn event_loop(
    registry: Arc<Mutex<InstanceRegistry>>,
    mut events: mpsc::UnboundedReceiver<ProcessEvent>,
    probe: ReadinessProbe,
) {
    while let Some(event) = events.recv().await {
        let id = event.instance().clone();
        let mut guard = registry.lock().await;
        let Some(current) = guard.get(&id).map(|i| i.status) else {
            continue;
        };
        let next = transition(current, &event, &probe);
        if next != current {
            tracing::info!(instance = %id, from = %current, to = %next, "preview status changed");
        }

        if matches!(event, ProcessEvent::Output { .. }) {
            guard.set_status(&id, next);
            continue;
        }

        // Exit without a stop request.
        let removed = guard.remove(&id);
        if let Some(detail) = event.failure_detail() {
            tracing::warn!(instance = %id, detail = %detail, "renderer failed");
            guard.record_failure(id.clone(), detail);
        }
        drop(guard);
        if let Some(record) = removed {
            remove_source(&record.instance.source_path).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

async fn monitor(
    id: InstanceId,
    mut child: Child,
    events: mpsc::UnboundedSender<ProcessEvent>,
    mut control: mpsc::Receiver<StopRequest>,
    grace: Duration,
) {
    let mut stdout = child.stdout.take().map(|s| BufReader::new(s).lines());
    let mut stderr = child.stderr.take().map(|s| BufReader::new(s).lines());

    loop {
        tokio::select! {
            line = next_line(&mut stdout), if stdout.is_some() => match line {
                Some(line) => {
                    tracing::debug!(instance = %id, "{line}");
                    let _ = events.send(ProcessEvent::Output { id: id.clone(), line });
                }
                None => stdout = None,
            },
            line = next_line(&mut stderr), if stderr.is_some() => match line {
                Some(line) => tracing::warn!(instance = %id, "{line}"),
                None => stderr = None,
            },
            status = child.wait() => {
                let event = match status {
                    Ok(status) => ProcessEvent::Exited { id: id.clone(), code: status.code() },
                    Err(err) => ProcessEvent::Failed {
                        id: id.clone(),
                        message: format!("waiting on renderer failed: {err}"),
                    },
                };
                let _ = events.send(event);
                return;
            }
            request = control.recv() => {
                terminate(&id, &mut child, grace).await;
                if let Some(reply) = request {
                    let _ = reply.send(());
                }
                return;
            }
        }
    }
}

async fn next_line<R>(lines: &mut Option<Lines<R>>) -> Option<String>
where
    R: AsyncBufRead + Unpin,
{
    match lines {
        Some(lines) => lines.next_line().await.ok().flatten(),
        None => std::future::pending().await,
    }
}

/// SIGTERM, then kill if the process outlives `grace`. Exiting first
/// cancels the kill.
async fn terminate(id: &InstanceId, child: &mut Child, grace: Duration) {
    send_sigterm(child);
    tokio::select! {
        status = child.wait() => {
            tracing::debug!(instance = %id, status = ?status, "renderer exited after SIGTERM");
        }
        _ = tokio::time::sleep(grace) => {
            tracing::warn!(
                instance = %id,
                grace_ms = grace.as_millis() as u64,
                "renderer ignored SIGTERM, killing"
            );
            if let Err(err) = child.kill().await {
                tracing::warn!(instance = %id, error = %err, "failed to kill renderer");
            }
        }
    }
}

#[cfg(unix)]
fn send_sigterm(child: &mut Child) {
    if let Some(pid) = child.id() {
        // SAFETY: `pid` is our own child and has not been reaped yet.
        let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if rc != 0 {
            tracing::debug!(pid, "SIGTERM delivery failed");
        }
    }
}

#[cfg(not(unix))]
fn send_sigterm(child: &mut Child) {
    let _ = child.start_kill();
}

// ---------------------------------------------------------------------------
// Backing files
// ---------------------------------------------------------------------------

async fn remove_source(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to remove preview source")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn instance(port: u16) -> Instance {
        Instance {
            id: InstanceId::from("demo-1-0"),
            port,
            status: InstanceStatus::Starting,
            url: format!("http://localhost:{port}"),
            template_id: TemplateId::from("demo"),
            source_path: PathBuf::from("/run/previews-1/demo-1-0.md"),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn renderer_args_minimal() {
        let args = renderer_args(&instance(3030), "localhost", &StartOptions::default());
        assert_eq!(
            args,
            [
                "/run/previews-1/demo-1-0.md",
                "--port",
                "3030",
                "--host",
                "localhost",
                "--open",
                "false"
            ]
        );
    }

    #[test]
    fn renderer_args_with_theme_and_remote() {
        let options = StartOptions {
            theme: Some("seriph".into()),
            remote: true,
            ..StartOptions::default()
        };
        let args = renderer_args(&instance(3031), "0.0.0.0", &options);
        assert_eq!(&args[args.len() - 3..], ["--theme", "seriph", "--remote"]);
    }

    #[test]
    fn empty_theme_is_omitted() {
        let options = StartOptions {
            theme: Some(String::new()),
            ..StartOptions::default()
        };
        let args = renderer_args(&instance(3030), "localhost", &options);
        assert!(!args.iter().any(|a| a == "--theme"));
    }
}
