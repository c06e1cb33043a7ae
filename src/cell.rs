use crate::error::DocumentError;
use crate::output::{Metadata, Output};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A cell in a column, the single editable unit of a notebook
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cell {
    /// Unique within the owning column
    pub id: String,

    /// Cell type determines editor language and whether the backend runs it
    #[serde(rename = "type")]
    pub cell_type: CellType,

    /// Source text, edited locally and persisted only on save
    #[serde(default)]
    pub content: String,

    /// Results of the last execution, replaced only by a notebook fetch
    #[serde(default)]
    pub outputs: Vec<Output>,

    #[serde(default)]
    pub metadata: Metadata,
}

impl Cell {
    /// Create an empty cell with the given ID
    pub fn new(id: impl Into<String>, cell_type: CellType) -> Self {
        Self::with_content(id, cell_type, "")
    }

    /// Create a cell with the given ID and source text
    pub fn with_content(
        id: impl Into<String>,
        cell_type: CellType,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            cell_type,
            content: content.into(),
            outputs: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    /// Copy of this cell with its content replaced
    pub fn replacing_content(&self, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..self.clone()
        }
    }

    /// Whether the backend has produced any outputs for this cell
    pub fn has_outputs(&self) -> bool {
        !self.outputs.is_empty()
    }
}

/// Cell type as sent on the wire
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    #[default]
    Code,
    Markdown,
    Raw,
}

impl CellType {
    pub fn as_str(self) -> &'static str {
        match self {
            CellType::Code => "code",
            CellType::Markdown => "markdown",
            CellType::Raw => "raw",
        }
    }

    /// Language tag handed to the code-editing widget
    pub fn editor_language(self) -> &'static str {
        match self {
            CellType::Code => "python",
            CellType::Markdown | CellType::Raw => "markdown",
        }
    }

    /// Only code cells produce outputs when a column or notebook is run
    pub fn is_executable(self) -> bool {
        matches!(self, CellType::Code)
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CellType {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "code" => Ok(CellType::Code),
            "markdown" => Ok(CellType::Markdown),
            "raw" => Ok(CellType::Raw),
            _ => Err(DocumentError::UnknownCellType(s.to_string())),
        }
    }
}
