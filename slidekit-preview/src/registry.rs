//! Table of live preview instances.
//!
//! The registry is plain data; the supervisor owns it behind a mutex and is
//! the only writer.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};

use slidekit_core::{Instance, InstanceId, InstanceStatus};

use crate::error::PreviewError;

/// Sent to an instance's monitor task to ask for termination; the monitor
/// answers once the process is gone.
pub(crate) type StopRequest = oneshot::Sender<()>;

/// Oldest failure details are forgotten past this many.
pub(crate) const MAX_REMEMBERED_FAILURES: usize = 256;

pub(crate) struct InstanceRecord {
    pub(crate) instance: Instance,
    /// `None` between registration and a successful spawn.
    pub(crate) control: Option<mpsc::Sender<StopRequest>>,
    /// Serializes writes of the backing file without holding the registry.
    pub(crate) writer: Arc<Mutex<()>>,
}

#[derive(Default)]
pub struct InstanceRegistry {
    records: HashMap<InstanceId, InstanceRecord>,
    /// Failure detail of instances whose renderer died on its own.
    failures: HashMap<InstanceId, String>,
    failure_order: VecDeque<InstanceId>,
}

impl InstanceRegistry {
    pub(crate) fn insert(&mut self, instance: Instance) {
        self.records.insert(
            instance.id.clone(),
            InstanceRecord {
                instance,
                control: None,
                writer: Arc::new(Mutex::new(())),
            },
        );
    }

    /// Attach the monitor's control channel. Returns `false` when the
    /// instance was removed in the meantime.
    pub(crate) fn attach(&mut self, id: &InstanceId, control: mpsc::Sender<StopRequest>) -> bool {
        match self.records.get_mut(id) {
            Some(record) => {
                record.control = Some(control);
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove(&mut self, id: &InstanceId) -> Option<InstanceRecord> {
        self.records.remove(id)
    }

    pub(crate) fn record(&self, id: &InstanceId) -> Option<&InstanceRecord> {
        self.records.get(id)
    }

    pub(crate) fn control(&self, id: &InstanceId) -> Option<Option<mpsc::Sender<StopRequest>>> {
        self.records.get(id).map(|r| r.control.clone())
    }

    pub fn get(&self, id: &InstanceId) -> Option<&Instance> {
        self.records.get(id).map(|r| &r.instance)
    }

    pub(crate) fn set_status(&mut self, id: &InstanceId, status: InstanceStatus) {
        if let Some(record) = self.records.get_mut(id) {
            record.instance.status = status;
        }
    }

    pub(crate) fn record_failure(&mut self, id: InstanceId, detail: String) {
        if self.failures.insert(id.clone(), detail).is_none() {
            self.failure_order.push_back(id);
        }
        while self.failure_order.len() > MAX_REMEMBERED_FAILURES {
            if let Some(oldest) = self.failure_order.pop_front() {
                self.failures.remove(&oldest);
            }
        }
    }

    /// Error for an id with no live record.
    pub fn missing(&self, id: &InstanceId) -> PreviewError {
        match self.failures.get(id) {
            Some(detail) => PreviewError::Exited {
                id: id.clone(),
                detail: detail.clone(),
            },
            None => PreviewError::NotFound(id.clone()),
        }
    }

    /// Ports held by every registered instance, including ones mid-stop.
    pub fn ports_in_use(&self) -> HashSet<u16> {
        self.records.values().map(|r| r.instance.port).collect()
    }

    pub fn ids(&self) -> Vec<InstanceId> {
        self.records.keys().cloned().collect()
    }

    /// Snapshot ordered by creation time, then id.
    pub fn snapshot(&self) -> Vec<Instance> {
        let mut out: Vec<Instance> = self.records.values().map(|r| r.instance.clone()).collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        out
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use slidekit_core::{ErrorKind, TemplateId};
    use std::path::PathBuf;

    fn instance(id: &str, port: u16, offset_ms: i64) -> Instance {
        Instance {
            id: InstanceId::from(id),
            port,
            status: InstanceStatus::Starting,
            url: format!("http://localhost:{port}"),
            template_id: TemplateId::from("demo"),
            source_path: PathBuf::from(format!("/tmp/{id}.md")),
            created_at: Utc::now() + Duration::milliseconds(offset_ms),
        }
    }

    #[test]
    fn ports_in_use_tracks_records() {
        let mut reg = InstanceRegistry::default();
        reg.insert(instance("a", 3030, 0));
        reg.insert(instance("b", 3031, 1));
        assert_eq!(reg.ports_in_use(), HashSet::from([3030, 3031]));
        reg.remove(&InstanceId::from("a"));
        assert_eq!(reg.ports_in_use(), HashSet::from([3031]));
    }

    #[test]
    fn snapshot_is_ordered_by_creation() {
        let mut reg = InstanceRegistry::default();
        reg.insert(instance("late", 3031, 50));
        reg.insert(instance("early", 3030, 0));
        let ids: Vec<_> = reg.snapshot().into_iter().map(|i| i.id.0).collect();
        assert_eq!(ids, ["early", "late"]);
    }

    #[test]
    fn missing_reports_remembered_failure() {
        let mut reg = InstanceRegistry::default();
        let id = InstanceId::from("gone");
        assert_eq!(reg.missing(&id).kind(), ErrorKind::NotFound);
        reg.record_failure(id.clone(), "renderer exited with status 1".into());
        let err = reg.missing(&id);
        assert_eq!(err.kind(), ErrorKind::ProcessRuntimeError);
        assert!(err.to_string().contains("status 1"));
    }

    #[test]
    fn failure_memory_is_bounded() {
        let mut reg = InstanceRegistry::default();
        for n in 0..MAX_REMEMBERED_FAILURES + 10 {
            reg.record_failure(InstanceId(format!("crash-{n}")), format!("status {n}"));
        }
        assert_eq!(reg.failures.len(), MAX_REMEMBERED_FAILURES);
        assert_eq!(reg.failure_order.len(), MAX_REMEMBERED_FAILURES);
        // The oldest are forgotten, the newest still explain themselves.
        assert_eq!(
            reg.missing(&InstanceId::from("crash-0")).kind(),
            ErrorKind::NotFound
        );
        let newest = InstanceId(format!("crash-{}", MAX_REMEMBERED_FAILURES + 9));
        assert_eq!(reg.missing(&newest).kind(), ErrorKind::ProcessRuntimeError);
    }

    #[test]
    fn repeated_failure_does_not_grow_memory() {
        let mut reg = InstanceRegistry::default();
        let id = InstanceId::from("flaky");
        reg.record_failure(id.clone(), "status 1".into());
        reg.record_failure(id.clone(), "status 2".into());
        assert_eq!(reg.failure_order.len(), 1);
        assert!(reg.missing(&id).to_string().contains("status 2"));
    }

    #[test]
    fn attach_fails_after_removal() {
        let mut reg = InstanceRegistry::default();
        reg.insert(instance("a", 3030, 0));
        let id = InstanceId::from("a");
        reg.remove(&id);
        let (tx, _rx) = mpsc::channel(1);
        assert!(!reg.attach(&id, tx));
    }

    #[test]
    fn set_status_updates_snapshot() {
        let mut reg = InstanceRegistry::default();
        reg.insert(instance("a", 3030, 0));
        reg.set_status(&InstanceId::from("a"), InstanceStatus::Running);
        assert_eq!(
            reg.get(&InstanceId::from("a")).map(|i| i.status),
            Some(InstanceStatus::Running)
        );
    }
}
