// Column Notebook - Core Library

pub mod api;
pub mod cell;
pub mod column;
pub mod config;
pub mod error;
pub mod event;
pub mod ids;
pub mod markdown;
pub mod notebook;
pub mod orchestrator;
pub mod output;
pub mod render;
pub mod single_flight;
pub mod store;
pub mod validation;

// Re-export main types for convenience
pub use api::{HttpNotebookApi, NotebookApi};
pub use cell::{Cell, CellType};
pub use column::Column;
pub use config::ClientConfig;
pub use error::{ApiError, DocumentError, SessionError};
pub use event::{Action, EventLog, Phase, ProtocolEvent};
pub use ids::IdGenerator;
pub use notebook::Notebook;
pub use orchestrator::{Orchestrator, UploadOutcome};
pub use output::{ErrorOutput, Metadata, MimeBundle, MultilineText, Output, RichOutput, StreamOutput};
pub use render::{render, render_all, DisplayForm};
pub use store::{DocumentStore, StoreState};
pub use validation::{ValidatedNotebook, ValidationIssue, ValidationResult, ValidationSeverity};
