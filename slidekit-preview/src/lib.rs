//! Preview orchestrator: renderer process supervision, the Studio operation
//! surface, and the daemon that serves it over a Unix socket.

pub mod config;
mod error;
pub mod lifecycle;
pub mod paths;
pub mod ports;
pub mod protocol;
pub mod readiness;
pub mod registry;
mod runtime;
pub mod service;
pub mod supervisor;

pub use config::{PreviewConfig, RendererCommand, SlidekitConfig};
pub use error::{DaemonError, PreviewError};
pub use protocol::{call, request_status, request_stop, send_request, DaemonRequest, DaemonResponse};
pub use readiness::{default_probe, marker_probe, ReadinessProbe};
pub use runtime::{init_tracing, run, start_blocking};
pub use service::{StartPreviewRequest, Studio, UpdatePreviewRequest};
pub use supervisor::{ProcessSupervisor, StartOptions};
