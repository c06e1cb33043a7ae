use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use ulid::Ulid;

/// Default number of events kept by an [`EventLog`]
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// A protocol phase transition with timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolEvent {
    pub timestamp: DateTime<Utc>,

    /// Shared by every event of one protocol run
    pub run_id: Ulid,

    pub action: Action,
    pub phase: Phase,
}

impl ProtocolEvent {
    /// Create a new event with the current timestamp
    pub fn new(run_id: Ulid, action: Action, phase: Phase) -> Self {
        Self::with_timestamp(Utc::now(), run_id, action, phase)
    }

    /// Create a new event with a specific timestamp
    pub fn with_timestamp(
        timestamp: DateTime<Utc>,
        run_id: Ulid,
        action: Action,
        phase: Phase,
    ) -> Self {
        Self {
            timestamp,
            run_id,
            action,
            phase,
        }
    }
}

/// User actions the orchestrator runs as protocols
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    CreateNotebook,

    LoadNotebook {
        notebook_id: String,
    },

    SaveNotebook {
        notebook_id: String,
    },

    ExecuteCell {
        cell_id: String,
    },

    ExecuteColumn {
        column_id: String,
    },

    ExecuteNotebook {
        notebook_id: String,
    },

    AddColumn {
        column_id: String,
    },

    AddCell {
        column_id: String,
        cell_id: String,
    },

    UploadFile {
        file_name: String,
    },
}

impl Action {
    /// Short label used in log lines
    pub fn label(&self) -> &'static str {
        match self {
            Action::CreateNotebook => "create_notebook",
            Action::LoadNotebook { .. } => "load_notebook",
            Action::SaveNotebook { .. } => "save_notebook",
            Action::ExecuteCell { .. } => "execute_cell",
            Action::ExecuteColumn { .. } => "execute_column",
            Action::ExecuteNotebook { .. } => "execute_notebook",
            Action::AddColumn { .. } => "add_column",
            Action::AddCell { .. } => "add_cell",
            Action::UploadFile { .. } => "upload_file",
        }
    }
}

/// Protocol state machine.
///
/// ```text
/// Idle -> Saving ----------------> Done
///      -> Executing -> Refetching -> Done
///      -> Refetching ------------> Done
/// any non-terminal phase ------> Failed
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Saving,
    Executing,
    Refetching,
    Done,
    Failed { reason: String },
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Done | Phase::Failed { .. })
    }

    /// Whether `next` is a legal successor of this phase
    pub fn can_advance_to(&self, next: &Phase) -> bool {
        match (self, next) {
            (_, Phase::Failed { .. }) => !self.is_terminal(),
            (Phase::Idle, Phase::Saving | Phase::Executing | Phase::Refetching) => true,
            (Phase::Saving, Phase::Done) => true,
            (Phase::Executing, Phase::Refetching) => true,
            (Phase::Refetching, Phase::Done) => true,
            _ => false,
        }
    }
}

/// Bounded, thread-safe history of protocol events (oldest dropped first)
#[derive(Debug)]
pub struct EventLog {
    events: Mutex<VecDeque<ProtocolEvent>>,
    capacity: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&self, event: ProtocolEvent) {
        let mut events = self.events.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Snapshot of all retained events, oldest first
    pub fn events(&self) -> Vec<ProtocolEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Phases of one run, in order
    pub fn phases_of(&self, run_id: Ulid) -> Vec<Phase> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.run_id == run_id)
            .map(|event| event.phase.clone())
            .collect()
    }

    /// Final phase of the most recent run of a given action
    pub fn last_outcome(&self, label: &str) -> Option<Phase> {
        self.events
            .lock()
            .iter()
            .rev()
            .find(|event| event.action.label() == label && event.phase.is_terminal())
            .map(|event| event.phase.clone())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = ProtocolEvent::new(Ulid::new(), Action::CreateNotebook, Phase::Idle);

        assert!(event.timestamp <= Utc::now());
    }

    #[test]
    fn test_legal_transitions() {
        assert!(Phase::Idle.can_advance_to(&Phase::Saving));
        assert!(Phase::Idle.can_advance_to(&Phase::Executing));
        assert!(Phase::Executing.can_advance_to(&Phase::Refetching));
        assert!(Phase::Refetching.can_advance_to(&Phase::Done));
        assert!(Phase::Saving.can_advance_to(&Phase::Done));
        assert!(Phase::Executing.can_advance_to(&Phase::Failed {
            reason: "boom".to_string()
        }));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!Phase::Executing.can_advance_to(&Phase::Done));
        assert!(!Phase::Saving.can_advance_to(&Phase::Refetching));
        assert!(!Phase::Done.can_advance_to(&Phase::Idle));
        assert!(!Phase::Done.can_advance_to(&Phase::Failed {
            reason: "late".to_string()
        }));
        assert!(!Phase::Failed {
            reason: "x".to_string()
        }
        .can_advance_to(&Phase::Refetching));
    }

    #[test]
    fn test_log_is_bounded() {
        let log = EventLog::with_capacity(3);
        let run = Ulid::new();

        for phase in [Phase::Idle, Phase::Executing, Phase::Refetching, Phase::Done] {
            log.record(ProtocolEvent::new(
                run,
                Action::ExecuteCell {
                    cell_id: "c1".to_string(),
                },
                phase,
            ));
        }

        assert_eq!(log.len(), 3);
        assert_eq!(
            log.phases_of(run),
            vec![Phase::Executing, Phase::Refetching, Phase::Done]
        );
        assert_eq!(log.last_outcome("execute_cell"), Some(Phase::Done));
        assert_eq!(log.last_outcome("save_notebook"), None);
    }

    #[test]
    fn test_event_serialization() {
        let event = ProtocolEvent::new(
            Ulid::new(),
            Action::AddCell {
                column_id: "col1".to_string(),
                cell_id: "c1".to_string(),
            },
            Phase::Failed {
                reason: "HTTP 500".to_string(),
            },
        );

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: ProtocolEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.run_id, event.run_id);
        assert_eq!(deserialized.action, event.action);
        assert_eq!(deserialized.phase, event.phase);
    }
}
