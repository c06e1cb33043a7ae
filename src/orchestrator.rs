//! Execution orchestrator
//!
//! Sequences every user action that talks to the backend and reconciles the
//! result into the [`DocumentStore`]. Rules shared by all protocols:
//!
//! - a failing step aborts the rest of the protocol and leaves the store as it
//!   was; the error is returned to the caller, nothing is retried
//! - a successful fetch replaces the stored notebook wholesale
//! - loading/busy flags are held by guards and cleared on every exit path
//!
//! Each protocol run walks the [`Phase`] state machine and records every
//! transition in the orchestrator's [`EventLog`].

use crate::api::NotebookApi;
use crate::error::SessionError;
use crate::event::{Action, EventLog, Phase, ProtocolEvent};
use crate::ids::IdGenerator;
use crate::single_flight::SingleFlight;
use crate::store::DocumentStore;
use crate::validation::{ValidatedNotebook, ValidationSeverity};
use crate::{Cell, CellType, Column, Notebook};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use std::fmt::Display;
use std::path::Path;
use tokio::sync::OwnedMutexGuard;
use ulid::Ulid;

/// Result of uploading a notebook file
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// The backend answered with the imported notebook, now in the store
    Imported(Notebook),

    /// Any other answer; the store is untouched
    Raw(Value),
}

#[derive(Debug, Clone, Copy)]
enum ExecuteTarget<'a> {
    Cell(&'a str),
    Column(&'a str),
    Notebook,
}

impl ExecuteTarget<'_> {
    fn action(&self, notebook_id: &str) -> Action {
        match self {
            ExecuteTarget::Cell(id) => Action::ExecuteCell {
                cell_id: id.to_string(),
            },
            ExecuteTarget::Column(id) => Action::ExecuteColumn {
                column_id: id.to_string(),
            },
            ExecuteTarget::Notebook => Action::ExecuteNotebook {
                notebook_id: notebook_id.to_string(),
            },
        }
    }

    /// Cell/column targets are tracked in the busy set
    fn busy_id(&self) -> Option<&str> {
        match self {
            ExecuteTarget::Cell(id) | ExecuteTarget::Column(id) => Some(*id),
            ExecuteTarget::Notebook => None,
        }
    }
}

/// One protocol run: walks the phase machine and records each transition
struct ProtocolRun<'a> {
    events: &'a EventLog,
    run_id: Ulid,
    action: Action,
    phase: Phase,
}

impl<'a> ProtocolRun<'a> {
    fn start(events: &'a EventLog, action: Action) -> Self {
        let run_id = Ulid::new();
        tracing::debug!(%run_id, action = action.label(), "protocol started");
        events.record(ProtocolEvent::new(run_id, action.clone(), Phase::Idle));

        Self {
            events,
            run_id,
            action,
            phase: Phase::Idle,
        }
    }

    fn advance(&mut self, next: Phase) {
        debug_assert!(
            self.phase.can_advance_to(&next),
            "illegal transition {:?} -> {:?}",
            self.phase,
            next
        );

        match &next {
            Phase::Failed { reason } => {
                tracing::warn!(run_id = %self.run_id, action = self.action.label(), "protocol failed: {}", reason)
            }
            Phase::Done => {
                tracing::info!(run_id = %self.run_id, action = self.action.label(), "protocol done")
            }
            phase => {
                tracing::debug!(run_id = %self.run_id, action = self.action.label(), ?phase, "protocol phase")
            }
        }

        self.events
            .record(ProtocolEvent::new(self.run_id, self.action.clone(), next.clone()));
        self.phase = next;
    }

    /// Pass a step's result through, moving to `Failed` on error
    fn guard<T, E: Display>(&mut self, result: Result<T, E>) -> Result<T, E> {
        if let Err(error) = &result {
            self.advance(Phase::Failed {
                reason: error.to_string(),
            });
        }
        result
    }
}

/// Runs notebook protocols against a backend and a store
pub struct Orchestrator<A> {
    api: A,
    store: DocumentStore,
    ids: Mutex<IdGenerator>,
    flights: Option<SingleFlight>,
    events: EventLog,
}

impl<A: NotebookApi> Orchestrator<A> {
    /// Protocols may interleave; the last response to resolve wins
    pub fn new(api: A, store: DocumentStore) -> Self {
        Self {
            api,
            store,
            ids: Mutex::new(IdGenerator::new()),
            flights: None,
            events: EventLog::new(),
        }
    }

    /// Run save/execute/add protocols on the same notebook one at a time,
    /// in arrival order
    pub fn serialize_protocols(mut self, enabled: bool) -> Self {
        self.flights = enabled.then(SingleFlight::new);
        self
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Create a notebook on the backend and make it current
    pub async fn create_notebook(&self) -> Result<Notebook, SessionError> {
        let mut run = ProtocolRun::start(&self.events, Action::CreateNotebook);
        let _loading = self.store.loading();

        run.advance(Phase::Saving);
        let notebook = run.guard(self.api.create_notebook().await)?;

        self.adopt(&notebook);
        run.advance(Phase::Done);
        Ok(notebook)
    }

    /// Fetch a notebook by id and make it current
    pub async fn load_notebook(&self, notebook_id: &str) -> Result<Notebook, SessionError> {
        let mut run = ProtocolRun::start(
            &self.events,
            Action::LoadNotebook {
                notebook_id: notebook_id.to_string(),
            },
        );
        let _loading = self.store.loading();

        run.advance(Phase::Refetching);
        let notebook = run.guard(self.api.get_notebook(notebook_id).await)?;

        self.adopt(&notebook);
        run.advance(Phase::Done);
        Ok(notebook)
    }

    /// Local content edit; nothing is sent until [`save`](Self::save).
    ///
    /// Returns `false` when no notebook is loaded. Unknown ids leave the
    /// notebook unchanged.
    pub fn edit_cell(&self, column_id: &str, cell_id: &str, content: &str) -> bool {
        self.store
            .update(|notebook| notebook.set_cell_content(column_id, cell_id, content))
    }

    /// Persist the whole current notebook. The echo is not adopted.
    pub async fn save(&self) -> Result<(), SessionError> {
        let notebook_id = self.current_id()?;
        let _lane = self.lane(&notebook_id).await;
        let notebook = self.store.notebook().ok_or(SessionError::NoNotebook)?;

        let mut run = ProtocolRun::start(
            &self.events,
            Action::SaveNotebook {
                notebook_id: notebook.id.clone(),
            },
        );

        run.advance(Phase::Saving);
        run.guard(self.api.update_notebook(&notebook).await)?;

        run.advance(Phase::Done);
        Ok(())
    }

    /// Execute one cell, then refetch the notebook
    pub async fn execute_cell(&self, cell_id: &str) -> Result<Notebook, SessionError> {
        self.execute(ExecuteTarget::Cell(cell_id)).await
    }

    /// Execute a column's code cells in order, then refetch the notebook
    pub async fn execute_column(&self, column_id: &str) -> Result<Notebook, SessionError> {
        self.execute(ExecuteTarget::Column(column_id)).await
    }

    /// Execute every code cell of the current notebook, then refetch it
    pub async fn execute_notebook(&self) -> Result<Notebook, SessionError> {
        self.execute(ExecuteTarget::Notebook).await
    }

    async fn execute(&self, target: ExecuteTarget<'_>) -> Result<Notebook, SessionError> {
        let notebook_id = self.current_id()?;
        let _lane = self.lane(&notebook_id).await;

        let mut run = ProtocolRun::start(&self.events, target.action(&notebook_id));
        let _busy = target.busy_id().map(|id| self.store.busy(id));
        let _loading = matches!(target, ExecuteTarget::Notebook).then(|| self.store.loading());

        run.advance(Phase::Executing);
        let response = match target {
            ExecuteTarget::Cell(id) => self.api.execute_cell(id).await,
            ExecuteTarget::Column(id) => self.api.execute_column(id).await,
            ExecuteTarget::Notebook => self.api.execute_notebook(&notebook_id).await,
        };
        let response = run.guard(response)?;
        tracing::trace!(?response, "execute acknowledged");

        run.advance(Phase::Refetching);
        let fetched = run.guard(self.api.get_notebook(&notebook_id).await)?;

        self.adopt(&fetched);
        run.advance(Phase::Done);
        Ok(fetched)
    }

    /// Append an empty column; adopted only after the backend accepts it
    pub async fn add_column(&self) -> Result<Column, SessionError> {
        let notebook_id = self.current_id()?;
        let _lane = self.lane(&notebook_id).await;
        let current = self.store.notebook().ok_or(SessionError::NoNotebook)?;

        let column = Column::new(self.ids.lock().next_column_id());
        let mut run = ProtocolRun::start(
            &self.events,
            Action::AddColumn {
                column_id: column.id.clone(),
            },
        );
        let candidate = current.append_column(column.clone());

        run.advance(Phase::Saving);
        run.guard(self.api.update_notebook(&candidate).await)?;

        self.store.set(Some(candidate));
        run.advance(Phase::Done);
        Ok(column)
    }

    /// Append an empty cell to a column; adopted only after the backend
    /// accepts it. An unknown column fails before anything is sent.
    pub async fn add_cell(
        &self,
        column_id: &str,
        cell_type: CellType,
    ) -> Result<Cell, SessionError> {
        let notebook_id = self.current_id()?;
        let _lane = self.lane(&notebook_id).await;
        let current = self.store.notebook().ok_or(SessionError::NoNotebook)?;

        let cell = Cell::new(self.ids.lock().next_cell_id(), cell_type);
        let mut run = ProtocolRun::start(
            &self.events,
            Action::AddCell {
                column_id: column_id.to_string(),
                cell_id: cell.id.clone(),
            },
        );
        let candidate = run.guard(current.append_cell(column_id, cell.clone()))?;

        run.advance(Phase::Saving);
        run.guard(self.api.update_notebook(&candidate).await)?;

        self.store.set(Some(candidate));
        run.advance(Phase::Done);
        Ok(cell)
    }

    /// Upload a notebook file (usually `.ipynb`) for import
    pub async fn upload_notebook(&self, path: &Path) -> Result<UploadOutcome, SessionError> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "notebook.ipynb".to_string());

        let mut run = ProtocolRun::start(
            &self.events,
            Action::UploadFile {
                file_name: file_name.clone(),
            },
        );

        let contents = run.guard(tokio::fs::read(path).await.map_err(|source| {
            SessionError::Io {
                path: path.to_path_buf(),
                source,
            }
        }))?;
        let _loading = self.store.loading();

        run.advance(Phase::Saving);
        let response = run.guard(self.api.upload_notebook(&file_name, contents).await)?;

        let outcome = match Notebook::deserialize(&response) {
            Ok(notebook) if !notebook.id.is_empty() => {
                self.adopt(&notebook);
                UploadOutcome::Imported(notebook)
            }
            _ => {
                tracing::info!("Upload response is not a notebook; store left unchanged");
                UploadOutcome::Raw(response)
            }
        };

        run.advance(Phase::Done);
        Ok(outcome)
    }

    fn current_id(&self) -> Result<String, SessionError> {
        self.store.notebook_id().ok_or(SessionError::NoNotebook)
    }

    async fn lane(&self, notebook_id: &str) -> Option<OwnedMutexGuard<()>> {
        match &self.flights {
            Some(flights) => Some(flights.acquire(notebook_id).await),
            None => None,
        }
    }

    /// Replace the store's notebook with a backend value, as-is
    fn adopt(&self, notebook: &Notebook) {
        let report = notebook.validate();
        for issue in report.issues.iter() {
            match issue.severity {
                ValidationSeverity::Error | ValidationSeverity::Warning => {
                    tracing::warn!("Notebook {}: {}", notebook.id, issue.message)
                }
                ValidationSeverity::Info => {
                    tracing::debug!("Notebook {}: {}", notebook.id, issue.message)
                }
            }
        }

        self.store.set(Some(notebook.clone()));
    }
}
