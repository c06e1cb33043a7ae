use crate::error::DocumentError;
use crate::output::Metadata;
use crate::{Cell, Column};
use serde::{Deserialize, Serialize};

/// Root document: ordered columns of cells plus metadata
///
/// The transforms on this type never mutate `self`; each returns a new
/// notebook value so the store can swap it in wholesale.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Notebook {
    /// Assigned by the backend on create
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub columns: Vec<Column>,

    #[serde(default)]
    pub metadata: Metadata,
}

impl Notebook {
    /// Create an empty notebook
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            columns: Vec::new(),
            metadata: Metadata::new(),
        }
    }

    // ========== Lookups ==========

    /// Get a column by ID
    pub fn column(&self, column_id: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.id == column_id)
    }

    /// Get a cell by its column and cell IDs
    pub fn cell(&self, column_id: &str, cell_id: &str) -> Option<&Cell> {
        self.column(column_id)?.cell(cell_id)
    }

    /// Find a cell by ID in any column (first match in column order)
    pub fn find_cell(&self, cell_id: &str) -> Option<(&Column, &Cell)> {
        self.columns
            .iter()
            .find_map(|column| column.cell(cell_id).map(|cell| (column, cell)))
    }

    /// All cells in column order
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.columns.iter().flat_map(|column| column.cells.iter())
    }

    pub fn cell_count(&self) -> usize {
        self.columns.iter().map(Column::len).sum()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    // ========== Transforms ==========

    /// Replace one cell's content.
    ///
    /// Unknown column or cell IDs are not an error: the result is simply equal
    /// to `self`, which tolerates edits racing with structural changes.
    pub fn set_cell_content(&self, column_id: &str, cell_id: &str, content: &str) -> Notebook {
        // Only the first column with this ID is addressable
        let target = self.columns.iter().position(|column| column.id == column_id);

        let columns = self
            .columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                if Some(index) != target {
                    return column.clone();
                }

                let cell_target = column.cells.iter().position(|cell| cell.id == cell_id);
                let cells = column
                    .cells
                    .iter()
                    .enumerate()
                    .map(|(index, cell)| {
                        if Some(index) == cell_target {
                            cell.replacing_content(content)
                        } else {
                            cell.clone()
                        }
                    })
                    .collect();

                Column {
                    cells,
                    ..column.clone()
                }
            })
            .collect();

        Notebook {
            columns,
            ..self.clone()
        }
    }

    /// Append a cell to the end of a column
    pub fn append_cell(&self, column_id: &str, cell: Cell) -> Result<Notebook, DocumentError> {
        if self.column(column_id).is_none() {
            return Err(DocumentError::ColumnNotFound(column_id.to_string()));
        }

        let mut cell = Some(cell);
        let columns = self
            .columns
            .iter()
            .map(|column| {
                let mut column = column.clone();
                // Only the first column with this ID receives the cell
                if column.id == column_id {
                    if let Some(cell) = cell.take() {
                        column.cells.push(cell);
                    }
                }
                column
            })
            .collect();

        Ok(Notebook {
            columns,
            ..self.clone()
        })
    }

    /// Append a column to the end of the notebook
    pub fn append_column(&self, column: Column) -> Notebook {
        let mut notebook = self.clone();
        notebook.columns.push(column);
        notebook
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CellType, Output};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> Notebook {
        let mut left = Column::new("col1");
        left.cells.push(Cell::with_content("c1", CellType::Code, "x = 1"));
        left.cells.push(Cell::with_content("c2", CellType::Markdown, "# Notes"));

        let mut right = Column::new("col2");
        let mut run = Cell::with_content("c3", CellType::Code, "print(x)");
        run.outputs.push(Output::stream("stdout", "1\n"));
        right.cells.push(run);

        let mut notebook = Notebook::new("nb1");
        notebook.columns = vec![left, right];
        notebook.metadata.insert("kernel".to_string(), json!("python3"));
        notebook
    }

    #[test]
    fn test_lookups() {
        let notebook = sample();

        assert_eq!(notebook.column_count(), 2);
        assert_eq!(notebook.cell_count(), 3);
        assert_eq!(notebook.cell("col1", "c2").map(|c| c.content.as_str()), Some("# Notes"));
        assert!(notebook.cell("col2", "c1").is_none());

        let (column, cell) = notebook.find_cell("c3").unwrap();
        assert_eq!(column.id, "col2");
        assert_eq!(cell.content, "print(x)");

        let ids: Vec<&str> = notebook.cells().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
    }

    #[test]
    fn test_set_cell_content_targets_one_cell() {
        let notebook = sample();
        let edited = notebook.set_cell_content("col1", "c1", "x = 2");

        assert_eq!(edited.cell("col1", "c1").unwrap().content, "x = 2");

        let mut expected = notebook.clone();
        expected.columns[0].cells[0].content = "x = 2".to_string();
        assert_eq!(edited, expected);

        // Input untouched
        assert_eq!(notebook.cell("col1", "c1").unwrap().content, "x = 1");
    }

    #[test]
    fn test_set_cell_content_unknown_ids_is_noop() {
        let notebook = sample();

        assert_eq!(notebook.set_cell_content("nope", "c1", "x"), notebook);
        assert_eq!(notebook.set_cell_content("col1", "nope", "x"), notebook);
        // Cell exists, but in another column
        assert_eq!(notebook.set_cell_content("col1", "c3", "x"), notebook);
    }

    #[test]
    fn test_set_cell_content_duplicate_columns_edits_first() {
        let mut duplicate = Column::new("col1");
        duplicate.cells.push(Cell::with_content("c1", CellType::Code, "x = 1"));
        let notebook = sample().append_column(duplicate);

        let edited = notebook.set_cell_content("col1", "c1", "x = 2");

        assert_eq!(edited.columns[0].cells[0].content, "x = 2");
        assert_eq!(edited.columns[2], notebook.columns[2]);
    }

    #[test]
    fn test_set_cell_content_duplicate_cells_edits_first() {
        let mut notebook = sample();
        notebook.columns[0]
            .cells
            .push(Cell::with_content("c1", CellType::Code, "x = 1"));

        let edited = notebook.set_cell_content("col1", "c1", "x = 2");

        assert_eq!(edited.columns[0].cells[0].content, "x = 2");
        assert_eq!(edited.columns[0].cells[2].content, "x = 1");
    }

    #[test]
    fn test_malformed_output_does_not_reject_notebook() {
        let raw = json!({
            "id": "nb1",
            "columns": [{
                "id": "col1",
                "cells": [{
                    "id": "c1",
                    "type": "code",
                    "content": "print(1)",
                    "outputs": [{"output_type": "stream", "name": "stdout", "text": null}]
                }]
            }]
        });

        let notebook: Notebook = serde_json::from_value(raw).unwrap();
        let cell = notebook.cell("col1", "c1").unwrap();

        assert_eq!(cell.outputs.len(), 1);
        assert_eq!(cell.outputs[0].output_type(), "stream");
    }

    #[test]
    fn test_append_column_on_empty_notebook() {
        let notebook = Notebook::new("nb1");
        let result = notebook.append_column(Column::new("col1"));

        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "id": "nb1",
                "columns": [{"id": "col1", "cells": [], "metadata": {}}],
                "metadata": {}
            })
        );
        assert!(notebook.columns.is_empty());
    }

    #[test]
    fn test_append_cell_to_empty_column() {
        let notebook = Notebook::new("nb1").append_column(Column::new("col1"));
        let result = notebook
            .append_cell("col1", Cell::new("c1", CellType::Code))
            .unwrap();

        assert_eq!(result.column("col1").unwrap().cells, vec![Cell::new("c1", CellType::Code)]);
    }

    #[test]
    fn test_append_cell_keeps_order() {
        let notebook = sample();
        let result = notebook
            .append_cell("col1", Cell::new("c4", CellType::Raw))
            .unwrap();

        let ids: Vec<&str> = result.column("col1").unwrap().cells.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c4"]);
        assert_eq!(result.column("col2"), notebook.column("col2"));
    }

    #[test]
    fn test_append_cell_unknown_column() {
        let notebook = sample();
        let result = notebook.append_cell("missing", Cell::new("c4", CellType::Code));

        assert_eq!(result, Err(DocumentError::ColumnNotFound("missing".to_string())));
    }

    #[test]
    fn test_notebook_wire_round_trip() {
        let notebook = sample();
        let json = serde_json::to_string(&notebook).unwrap();
        let decoded: Notebook = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded, notebook);
    }
}
