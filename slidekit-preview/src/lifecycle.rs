//! Renderer process events and the instance status transitions they cause.

use slidekit_core::{InstanceId, InstanceStatus};

use crate::readiness::ReadinessProbe;

/// Something observed about a renderer process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// One line written to stdout.
    Output { id: InstanceId, line: String },
    /// The process exited on its own. `code` is `None` when killed by a signal.
    Exited { id: InstanceId, code: Option<i32> },
    /// Waiting on the process failed.
    Failed { id: InstanceId, message: String },
}

impl ProcessEvent {
    pub fn instance(&self) -> &InstanceId {
        match self {
            ProcessEvent::Output { id, .. }
            | ProcessEvent::Exited { id, .. }
            | ProcessEvent::Failed { id, .. } => id,
        }
    }

    /// Failure detail for events that end an instance in `error`.
    pub fn failure_detail(&self) -> Option<String> {
        match self {
            ProcessEvent::Exited { code: Some(0), .. } | ProcessEvent::Output { .. } => None,
            ProcessEvent::Exited { code: Some(code), .. } => {
                Some(format!("renderer exited with status {code}"))
            }
            ProcessEvent::Exited { code: None, .. } => {
                Some("renderer terminated by signal".to_string())
            }
            ProcessEvent::Failed { message, .. } => Some(message.clone()),
        }
    }
}

/// Status after `event`. Terminal statuses never change.
pub fn transition(
    current: InstanceStatus,
    event: &ProcessEvent,
    probe: &ReadinessProbe,
) -> InstanceStatus {
    if current.is_terminal() {
        return current;
    }
    match event {
        ProcessEvent::Output { line, .. } => {
            if current == InstanceStatus::Starting && probe(line) {
                InstanceStatus::Running
            } else {
                current
            }
        }
        ProcessEvent::Exited { code: Some(0), .. } => InstanceStatus::Stopped,
        ProcessEvent::Exited { .. } | ProcessEvent::Failed { .. } => InstanceStatus::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readiness::default_probe;
    use rstest::rstest;

    fn output(line: &str) -> ProcessEvent {
        ProcessEvent::Output {
            id: InstanceId::from("demo-1"),
            line: line.to_string(),
        }
    }

    fn exited(code: Option<i32>) -> ProcessEvent {
        ProcessEvent::Exited {
            id: InstanceId::from("demo-1"),
            code,
        }
    }

    #[rstest]
    #[case(InstanceStatus::Starting, output("compiling"), InstanceStatus::Starting)]
    #[case(InstanceStatus::Starting, output("Local: http://localhost:3030"), InstanceStatus::Running)]
    #[case(InstanceStatus::Running, output("ready again"), InstanceStatus::Running)]
    #[case(InstanceStatus::Starting, exited(Some(0)), InstanceStatus::Stopped)]
    #[case(InstanceStatus::Running, exited(Some(0)), InstanceStatus::Stopped)]
    #[case(InstanceStatus::Running, exited(Some(1)), InstanceStatus::Error)]
    #[case(InstanceStatus::Starting, exited(None), InstanceStatus::Error)]
    #[case(InstanceStatus::Stopped, output("ready"), InstanceStatus::Stopped)]
    #[case(InstanceStatus::Error, exited(Some(0)), InstanceStatus::Error)]
    fn transitions(
        #[case] from: InstanceStatus,
        #[case] event: ProcessEvent,
        #[case] to: InstanceStatus,
    ) {
        assert_eq!(transition(from, &event, &default_probe()), to);
    }

    #[test]
    fn runtime_failure_moves_to_error() {
        let event = ProcessEvent::Failed {
            id: InstanceId::from("demo-1"),
            message: "wait failed".to_string(),
        };
        assert_eq!(
            transition(InstanceStatus::Running, &event, &default_probe()),
            InstanceStatus::Error
        );
        assert_eq!(event.failure_detail().as_deref(), Some("wait failed"));
    }

    #[test]
    fn clean_exit_has_no_failure_detail() {
        assert!(exited(Some(0)).failure_detail().is_none());
        assert!(exited(Some(2)).failure_detail().unwrap().contains('2'));
    }
}
