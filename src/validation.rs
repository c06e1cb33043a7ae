use crate::Notebook;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Validation severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationSeverity {
    Info,    // informational
    Warning, // structure the store will keep but lookups may misbehave on
    Error,   // the notebook cannot be saved or refetched
}

/// Validation issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: ValidationSeverity,
    pub message: String,
    pub issue_type: ValidationIssueType,
    pub column_id: Option<String>,
    pub cell_id: Option<String>,
}

/// Types of validation issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationIssueType {
    MissingNotebookId,
    DuplicateColumnId,
    DuplicateCellId,
    EmptyColumn,
}

/// Complete validation result
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Create a new empty validation result
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Add an issue
    pub fn add_issue(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == ValidationSeverity::Error)
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == ValidationSeverity::Warning)
    }

    /// Get all issues of one severity
    pub fn with_severity(&self, severity: ValidationSeverity) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == severity)
            .collect()
    }

    /// Check if validation passed (no errors)
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }
}

/// Structural checks on a notebook.
///
/// Validation only reports: the store never de-duplicates or re-keys, so a
/// notebook with issues is still adopted exactly as the backend sent it.
pub struct Validator;

impl Validator {
    /// Run all validations on a notebook
    pub fn validate(notebook: &Notebook) -> ValidationResult {
        let mut result = ValidationResult::new();

        if notebook.id.trim().is_empty() {
            result.add_issue(ValidationIssue {
                severity: ValidationSeverity::Error,
                message: "Notebook has no ID. It cannot be saved or refetched.".to_string(),
                issue_type: ValidationIssueType::MissingNotebookId,
                column_id: None,
                cell_id: None,
            });
        }

        let mut seen_columns = HashSet::new();
        for column in &notebook.columns {
            if !seen_columns.insert(column.id.as_str()) {
                result.add_issue(ValidationIssue {
                    severity: ValidationSeverity::Warning,
                    message: format!(
                        "Column ID {} appears more than once; only the first is addressable.",
                        column.id
                    ),
                    issue_type: ValidationIssueType::DuplicateColumnId,
                    column_id: Some(column.id.clone()),
                    cell_id: None,
                });
            }

            if column.is_empty() {
                result.add_issue(ValidationIssue {
                    severity: ValidationSeverity::Info,
                    message: format!("{} has no cells.", column.title()),
                    issue_type: ValidationIssueType::EmptyColumn,
                    column_id: Some(column.id.clone()),
                    cell_id: None,
                });
            }

            let mut seen_cells = HashSet::new();
            for cell in &column.cells {
                if !seen_cells.insert(cell.id.as_str()) {
                    result.add_issue(ValidationIssue {
                        severity: ValidationSeverity::Warning,
                        message: format!(
                            "Cell ID {} appears more than once in column {}; only the first is addressable.",
                            cell.id, column.id
                        ),
                        issue_type: ValidationIssueType::DuplicateCellId,
                        column_id: Some(column.id.clone()),
                        cell_id: Some(cell.id.clone()),
                    });
                }
            }
        }

        result
    }
}

/// Extension trait for Notebook to add validation
pub trait ValidatedNotebook {
    /// Validate the notebook
    fn validate(&self) -> ValidationResult;
}

impl ValidatedNotebook for Notebook {
    fn validate(&self) -> ValidationResult {
        Validator::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cell, CellType, Column};

    #[test]
    fn test_valid_notebook() {
        let mut column = Column::new("col1");
        column.cells.push(Cell::new("c1", CellType::Code));
        let notebook = Notebook::new("nb1").append_column(column);

        let result = notebook.validate();
        assert!(result.is_valid());
        assert!(!result.has_warnings());
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_missing_notebook_id() {
        let result = Notebook::new("").validate();

        assert!(!result.is_valid());
        assert_eq!(
            result.with_severity(ValidationSeverity::Error)[0].issue_type,
            ValidationIssueType::MissingNotebookId
        );
    }

    #[test]
    fn test_duplicate_ids_are_warnings() {
        let mut column = Column::new("col1");
        column.cells.push(Cell::new("c1", CellType::Code));
        column.cells.push(Cell::new("c1", CellType::Raw));

        let notebook = Notebook::new("nb1")
            .append_column(column)
            .append_column(Column::new("col1"));

        let result = notebook.validate();
        let warnings = result.with_severity(ValidationSeverity::Warning);

        assert!(result.is_valid());
        assert_eq!(warnings.len(), 2);
        assert!(warnings
            .iter()
            .any(|i| i.issue_type == ValidationIssueType::DuplicateCellId
                && i.cell_id.as_deref() == Some("c1")));
        assert!(warnings
            .iter()
            .any(|i| i.issue_type == ValidationIssueType::DuplicateColumnId));
    }

    #[test]
    fn test_same_cell_id_in_different_columns_is_fine() {
        let mut left = Column::new("col1");
        left.cells.push(Cell::new("c1", CellType::Code));
        let mut right = Column::new("col2");
        right.cells.push(Cell::new("c1", CellType::Code));

        let notebook = Notebook::new("nb1").append_column(left).append_column(right);
        assert!(!notebook.validate().has_warnings());
    }

    #[test]
    fn test_empty_column_is_info() {
        let notebook = Notebook::new("nb1").append_column(Column::new("col1"));
        let result = notebook.validate();

        let info = result.with_severity(ValidationSeverity::Info);
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].message, "Column col1 has no cells.");
    }
}
