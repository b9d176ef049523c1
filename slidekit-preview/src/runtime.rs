use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;

use slidekit_core::{ErrorKind, TemplateStore};

use crate::config::SlidekitConfig;
use crate::error::{daemon_io_err, DaemonError};
use crate::paths::{run_dir, socket_path};
use crate::protocol::{DaemonRequest, DaemonResponse};
use crate::service::{Studio, UpdatePreviewRequest};
use crate::supervisor::ProcessSupervisor;

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path, config: SlidekitConfig) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| daemon_io_err("tokio-runtime", e))?;
    runtime.block_on(run(home.to_path_buf(), config))
}

/// Run the daemon: socket server plus signal handler. Every preview is
/// stopped before this returns.
pub async fn run(home: PathBuf, config: SlidekitConfig) -> Result<(), DaemonError> {
    ensure_runtime_dirs(&home)?;

    let supervisor = ProcessSupervisor::init(config.preview.clone()).await?;
    let studio = Arc::new(Studio::new(
        TemplateStore::new(config.templates_dir()),
        supervisor,
    ));
    let started_at_unix = unix_seconds_now();
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let socket_handle = {
        let shutdown = shutdown_tx.clone();
        let home = home.clone();
        let studio = studio.clone();
        let config = config.clone();
        tokio::spawn(async move {
            let result = socket_server_task(
                home,
                studio,
                config,
                shutdown.clone(),
                shutdown.subscribe(),
                started_at_unix,
            )
            .await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down daemon");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Protocol(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let (socket_result, signal_result) = tokio::join!(socket_handle, signal_handle);

    if let Err(err) = studio.shutdown().await {
        tracing::warn!(error = %err, "preview cleanup failed");
    }

    handle_join("socket_server", socket_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

async fn socket_server_task(
    home: PathBuf,
    studio: Arc<Studio>,
    config: SlidekitConfig,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
    started_at_unix: u64,
) -> Result<(), DaemonError> {
    let socket = socket_path(&home);
    prepare_socket_for_bind(&socket)?;

    let listener = UnixListener::bind(&socket).map_err(|e| daemon_io_err(&socket, e))?;
    set_socket_permissions(&socket)?;
    tracing::info!(socket = %socket.display(), "daemon listening");

    let status = Arc::new(StatusInfo {
        socket: socket.display().to_string(),
        templates_dir: config.templates_dir().display().to_string(),
        started_at_unix,
    });

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, _) = accepted.map_err(|e| daemon_io_err(&socket, e))?;
                let studio = studio.clone();
                let status = status.clone();
                let shutdown_tx = shutdown_tx.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_socket_client(stream, studio, status, shutdown_tx).await {
                        tracing::error!(error = %err, "socket client error");
                    }
                });
            }
        }
    }

    if socket.exists() {
        let _ = fs::remove_file(&socket);
    }
    Ok(())
}

#[derive(Debug)]
struct StatusInfo {
    socket: String,
    templates_dir: String,
    started_at_unix: u64,
}

async fn handle_socket_client(
    stream: UnixStream,
    studio: Arc<Studio>,
    status: Arc<StatusInfo>,
    shutdown_tx: broadcast::Sender<()>,
) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| daemon_io_err("daemon socket read", e))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let request = match serde_json::from_str::<DaemonRequest>(&line) {
            Ok(request) => request,
            Err(err) => {
                write_response(
                    &mut writer,
                    &DaemonResponse::error(
                        ErrorKind::BadRequest,
                        format!("invalid request JSON: {err}"),
                    ),
                )
                .await?;
                continue;
            }
        };

        let stopping = matches!(request, DaemonRequest::Stop);
        let response = respond(&studio, &status, request).await;
        write_response(&mut writer, &response).await?;
        if stopping {
            let _ = shutdown_tx.send(());
            break;
        }
    }
    Ok(())
}

async fn respond(studio: &Studio, status: &StatusInfo, request: DaemonRequest) -> DaemonResponse {
    let cmd = request.name();
    let result = match request {
        DaemonRequest::Status => Ok(status_payload(studio, status).await),
        DaemonRequest::Stop => Ok(json!({ "stopping": true })),
        other => dispatch(studio, other).await,
    };
    match result {
        Ok(data) => DaemonResponse::ok(data),
        Err(err) => {
            tracing::warn!(cmd, kind = %err.kind(), error = %err, "request failed");
            DaemonResponse::error(err.kind(), err.to_string())
        }
    }
}

/// Run one Studio operation and encode its result.
async fn dispatch(studio: &Studio, request: DaemonRequest) -> Result<Value, DaemonError> {
    let data = match request {
        DaemonRequest::ListTemplates => json!(studio.list_templates()?),
        DaemonRequest::TemplatePreview { template_id } => {
            json!(studio.template_preview(&template_id)?)
        }
        DaemonRequest::TemplateBlocks { template_id } => {
            json!(studio.template_blocks(&template_id)?)
        }
        DaemonRequest::Compile(request) => json!(studio.compile(&request)?),
        DaemonRequest::StartPreview(request) => json!(studio.start_preview(&request).await?),
        DaemonRequest::UpdatePreview {
            instance_id,
            variables,
            blocks,
        } => {
            let request = UpdatePreviewRequest { variables, blocks };
            json!(studio.update_preview(&instance_id, &request).await?)
        }
        DaemonRequest::StopPreview { instance_id } => {
            json!(studio.stop_preview(&instance_id).await?)
        }
        DaemonRequest::ListPreviews => json!(studio.list_previews().await),
        DaemonRequest::GetPreview { instance_id } => json!(studio.get_preview(&instance_id).await?),
        DaemonRequest::Status | DaemonRequest::Stop => {
            return Err(DaemonError::Protocol(
                "status and stop are handled by the server".to_string(),
            ))
        }
    };
    Ok(data)
}

async fn status_payload(studio: &Studio, status: &StatusInfo) -> Value {
    let instances = studio.list_previews().await;
    json!({
        "running": true,
        "started_at_unix": status.started_at_unix,
        "socket": status.socket,
        "templates_dir": status.templates_dir,
        "preview_root": studio.supervisor().root().display().to_string(),
        "instances": instances.len(),
    })
}

/// Clear a leftover socket file. Fails while another daemon still answers
/// on it.
fn prepare_socket_for_bind(socket: &Path) -> Result<(), DaemonError> {
    if StdUnixStream::connect(socket).is_ok() {
        return Err(DaemonError::Protocol(format!(
            "another daemon is listening on {}",
            socket.display()
        )));
    }
    match fs::remove_file(socket) {
        Ok(()) => {
            tracing::warn!(socket = %socket.display(), "removed stale daemon socket");
            Ok(())
        }
        Err(err) if err.kind() == IoErrorKind::NotFound => Ok(()),
        Err(err) => Err(daemon_io_err(socket, err)),
    }
}

fn ensure_runtime_dirs(home: &Path) -> Result<(), DaemonError> {
    let run = run_dir(home);
    fs::create_dir_all(&run).map_err(|e| daemon_io_err(&run, e))
}

async fn write_response(
    writer: &mut OwnedWriteHalf,
    response: &DaemonResponse,
) -> Result<(), DaemonError> {
    let mut frame = serde_json::to_vec(response)?;
    frame.push(b'\n');
    writer
        .write_all(&frame)
        .await
        .map_err(|e| daemon_io_err("daemon socket write", e))
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!("{task} task did not finish: {err}"))),
    }
}

fn unix_seconds_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Install the global subscriber: `RUST_LOG` if set, `info` otherwise.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[cfg(unix)]
fn set_socket_permissions(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| daemon_io_err(path, e))
}

#[cfg(not(unix))]
fn set_socket_permissions(_path: &Path) -> Result<(), DaemonError> {
    Ok(())
}
