use crate::cell::Cell;
use crate::output::Metadata;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered group of cells; the order is also the "run column" order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Column {
    /// Unique within the owning notebook
    pub id: String,

    #[serde(default)]
    pub cells: Vec<Cell>,

    /// Free-form metadata; a string `title` entry names the column
    #[serde(default)]
    pub metadata: Metadata,
}

impl Column {
    /// Create an empty column
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cells: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    /// Title shown above the column
    pub fn title(&self) -> String {
        match self.metadata.get("title").and_then(Value::as_str) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => format!("Column {}", self.id),
        }
    }

    /// Look up a cell by ID
    pub fn cell(&self, cell_id: &str) -> Option<&Cell> {
        self.cells.iter().find(|cell| cell.id == cell_id)
    }

    /// Check whether this column holds a given cell
    pub fn contains(&self, cell_id: &str) -> bool {
        self.cell(cell_id).is_some()
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
