//! Readiness detection for renderer output.

use std::sync::Arc;

/// Decides whether one line of renderer output means the server is up.
pub type ReadinessProbe = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Probe that fires when a line contains any of `markers`.
pub fn marker_probe<I, S>(markers: I) -> ReadinessProbe
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let markers: Vec<String> = markers.into_iter().map(Into::into).collect();
    Arc::new(move |line: &str| markers.iter().any(|m| line.contains(m.as_str())))
}

/// `Local:` or `ready`, as printed by the slide renderer's dev server.
pub fn default_probe() -> ReadinessProbe {
    marker_probe(["Local:", "ready"])
}
