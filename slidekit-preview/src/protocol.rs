use std::io::{BufRead, BufReader, ErrorKind as IoErrorKind, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use slidekit_compiler::CompileRequest;
use slidekit_core::{BoundVariables, Block, ErrorKind, InstanceId, TemplateId};

use crate::error::{daemon_io_err, DaemonError};
use crate::paths::socket_path;
use crate::service::StartPreviewRequest;

/// Request line, tagged by `cmd`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum DaemonRequest {
    Status,
    Stop,
    ListTemplates,
    TemplatePreview {
        template_id: TemplateId,
    },
    TemplateBlocks {
        template_id: TemplateId,
    },
    Compile(CompileRequest),
    StartPreview(StartPreviewRequest),
    UpdatePreview {
        instance_id: InstanceId,
        #[serde(default)]
        variables: BoundVariables,
        #[serde(default)]
        blocks: Option<Vec<Block>>,
    },
    StopPreview {
        instance_id: InstanceId,
    },
    ListPreviews,
    GetPreview {
        instance_id: InstanceId,
    },
}

impl DaemonRequest {
    pub fn name(&self) -> &'static str {
        match self {
            DaemonRequest::Status => "status",
            DaemonRequest::Stop => "stop",
            DaemonRequest::ListTemplates => "list_templates",
            DaemonRequest::TemplatePreview { .. } => "template_preview",
            DaemonRequest::TemplateBlocks { .. } => "template_blocks",
            DaemonRequest::Compile(_) => "compile",
            DaemonRequest::StartPreview(_) => "start_preview",
            DaemonRequest::UpdatePreview { .. } => "update_preview",
            DaemonRequest::StopPreview { .. } => "stop_preview",
            DaemonRequest::ListPreviews => "list_previews",
            DaemonRequest::GetPreview { .. } => "get_preview",
        }
    }
}

/// Response line. `kind` is set on failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl DaemonResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
            kind: None,
        }
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
            kind: Some(kind),
        }
    }
}

const STATUS_ATTEMPTS: u32 = 5;
const STATUS_RETRY_DELAY: Duration = Duration::from_millis(100);

/// One request, one response line.
pub fn send_request(home: &Path, request: &DaemonRequest) -> Result<DaemonResponse, DaemonError> {
    let socket = socket_path(home);
    let mut stream = connect(&socket)?;

    let mut frame = serde_json::to_vec(request)?;
    frame.push(b'\n');
    stream
        .write_all(&frame)
        .map_err(|e| daemon_io_err(&socket, e))?;

    let mut line = String::new();
    let read = BufReader::new(stream)
        .read_line(&mut line)
        .map_err(|e| daemon_io_err(&socket, e))?;
    if read == 0 {
        return Err(DaemonError::Protocol(format!(
            "no response to '{}' from {}",
            request.name(),
            socket.display()
        )));
    }
    Ok(serde_json::from_str(line.trim_end())?)
}

/// Send `request` and decode the response payload as `T`.
pub fn call<T: DeserializeOwned>(home: &Path, request: &DaemonRequest) -> Result<T, DaemonError> {
    let data = response_into_data(send_request(home, request)?)?;
    Ok(serde_json::from_value(data)?)
}

/// Daemon status payload. Retries briefly while the socket comes up.
pub fn request_status(home: &Path) -> Result<Value, DaemonError> {
    let mut attempt = 1;
    loop {
        match send_request(home, &DaemonRequest::Status) {
            Err(DaemonError::DaemonNotRunning { .. }) if attempt < STATUS_ATTEMPTS => {
                attempt += 1;
                sleep(STATUS_RETRY_DELAY);
            }
            result => return response_into_data(result?),
        }
    }
}

pub fn request_stop(home: &Path) -> Result<(), DaemonError> {
    send_request(home, &DaemonRequest::Stop).and_then(response_into_data)?;
    Ok(())
}

fn connect(socket: &Path) -> Result<UnixStream, DaemonError> {
    let not_running = || DaemonError::DaemonNotRunning {
        socket: socket.to_path_buf(),
    };
    if !socket.exists() {
        return Err(not_running());
    }
    UnixStream::connect(socket).map_err(|err| match err.kind() {
        IoErrorKind::NotFound | IoErrorKind::ConnectionRefused | IoErrorKind::ConnectionReset => {
            not_running()
        }
        _ => daemon_io_err(socket, err),
    })
}

fn response_into_data(response: DaemonResponse) -> Result<Value, DaemonError> {
    if response.ok {
        Ok(response.data.unwrap_or(Value::Null))
    } else {
        Err(DaemonError::Remote {
            kind: response.kind.unwrap_or(ErrorKind::Io),
            message: response
                .error
                .unwrap_or_else(|| "unknown daemon error".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_are_tagged_by_cmd() {
        let value = serde_json::to_value(DaemonRequest::StopPreview {
            instance_id: InstanceId::from("demo-1-0"),
        })
        .unwrap();
        assert_eq!(value, json!({"cmd": "stop_preview", "instance_id": "demo-1-0"}));
        assert_eq!(
            serde_json::to_value(DaemonRequest::ListPreviews).unwrap(),
            json!({"cmd": "list_previews"})
        );
    }

    #[test]
    fn start_preview_request_is_flat() {
        let request: DaemonRequest = serde_json::from_value(json!({
            "cmd": "start_preview",
            "template_id": "business-pitch",
            "variables": {"companyName": "Acme"},
            "blocks": [],
            "port": 4100,
        }))
        .unwrap();
        match request {
            DaemonRequest::StartPreview(req) => {
                assert_eq!(req.compile.template_id, "business-pitch");
                assert_eq!(req.options.port, Some(4100));
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn error_response_carries_kind() {
        let response = DaemonResponse::error(ErrorKind::NotFound, "preview instance 'x' not found");
        let text = serde_json::to_string(&response).unwrap();
        assert_eq!(
            text,
            r#"{"ok":false,"error":"preview instance 'x' not found","kind":"not_found"}"#
        );
        let err = response_into_data(response).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn missing_socket_is_not_running() {
        let home = tempfile::TempDir::new().unwrap();
        let err = send_request(home.path(), &DaemonRequest::Status).unwrap_err();
        assert!(matches!(err, DaemonError::DaemonNotRunning { .. }));
    }
}
