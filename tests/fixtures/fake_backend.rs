// In-memory stand-in for the notebook backend

use async_trait::async_trait;
use column_notebook::{ApiError, Cell, CellType, Column, Notebook, NotebookApi, Output};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};

#[derive(Default)]
struct FakeState {
    notebooks: HashMap<String, Notebook>,
    next_notebook: usize,
    calls: Vec<String>,
    failing: HashSet<&'static str>,
}

/// Behaves like the reference backend:
/// - create makes `nb-<n>` with one empty column
/// - execute runs code cells only; a cell whose content contains `raise`
///   produces a `ValueError: bad` error output, any other code cell echoes its
///   content to stdout
/// - upload imports an `.ipynb` file as a one-column notebook
///
/// Every call is logged, then yields once so concurrent protocols interleave.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notebook(notebook: Notebook) -> Self {
        let backend = Self::new();
        backend.insert(notebook);
        backend
    }

    pub fn insert(&self, notebook: Notebook) {
        self.state
            .lock()
            .notebooks
            .insert(notebook.id.clone(), notebook);
    }

    /// Canonical server-side copy
    pub fn stored(&self, notebook_id: &str) -> Option<Notebook> {
        self.state.lock().notebooks.get(notebook_id).cloned()
    }

    /// Make an operation answer HTTP 503 until `recover`
    pub fn fail(&self, operation: &'static str) {
        self.state.lock().failing.insert(operation);
    }

    pub fn recover(&self, operation: &'static str) {
        self.state.lock().failing.remove(operation);
    }

    /// Log of calls as `"<operation> <argument>"`
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.split(' ').next() == Some(operation))
            .count()
    }

    async fn enter(&self, operation: &'static str, argument: &str) -> Result<(), ApiError> {
        let failing = {
            let mut state = self.state.lock();
            state.calls.push(format!("{} {}", operation, argument));
            state.failing.contains(operation)
        };
        tokio::task::yield_now().await;

        if failing {
            return Err(ApiError::Status {
                operation,
                status: 503,
                body: "backend unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn not_found(operation: &'static str, what: &str) -> ApiError {
        ApiError::Status {
            operation,
            status: 404,
            body: format!("{{\"detail\": \"{} not found\"}}", what),
        }
    }

    /// Run the selected cells of every stored notebook
    fn run_cells(&self, select: impl Fn(&Column, &Cell) -> bool) -> usize {
        let mut state = self.state.lock();
        let mut ran = 0;

        for notebook in state.notebooks.values_mut() {
            for column in notebook.columns.iter_mut() {
                let selected: Vec<bool> = {
                    let view: &Column = column;
                    view.cells.iter().map(|cell| select(view, cell)).collect()
                };

                for (cell, selected) in column.cells.iter_mut().zip(selected) {
                    if selected && cell.cell_type.is_executable() {
                        cell.outputs = vec![execute(&cell.content)];
                        ran += 1;
                    }
                }
            }
        }

        ran
    }
}

fn execute(source: &str) -> Output {
    if source.contains("raise") {
        Output::error(
            "ValueError",
            "bad",
            vec![
                "\u{1b}[0;31mTraceback (most recent call last)\u{1b}[0m".to_string(),
                "ValueError: bad".to_string(),
            ],
        )
    } else {
        Output::stream("stdout", format!("{}\n", source))
    }
}

fn ipynb_source(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts.iter().filter_map(Value::as_str).collect(),
        _ => String::new(),
    }
}

#[async_trait]
impl NotebookApi for FakeBackend {
    async fn create_notebook(&self) -> Result<Notebook, ApiError> {
        self.enter("create_notebook", "").await?;

        let mut state = self.state.lock();
        state.next_notebook += 1;
        let id = format!("nb-{}", state.next_notebook);
        let notebook = Notebook::new(id.clone()).append_column(Column::new("col-0"));
        state.notebooks.insert(id, notebook.clone());
        Ok(notebook)
    }

    async fn get_notebook(&self, notebook_id: &str) -> Result<Notebook, ApiError> {
        self.enter("get_notebook", notebook_id).await?;
        self.stored(notebook_id)
            .ok_or_else(|| Self::not_found("get_notebook", "Notebook"))
    }

    async fn update_notebook(&self, notebook: &Notebook) -> Result<Notebook, ApiError> {
        self.enter("update_notebook", &notebook.id).await?;
        self.insert(notebook.clone());
        Ok(notebook.clone())
    }

    async fn execute_cell(&self, cell_id: &str) -> Result<Value, ApiError> {
        self.enter("execute_cell", cell_id).await?;
        match self.run_cells(|_, cell| cell.id == cell_id) {
            0 if !self.cell_exists(cell_id) => Err(Self::not_found("execute_cell", "Cell")),
            _ => Ok(json!({"status": "ok"})),
        }
    }

    async fn execute_column(&self, column_id: &str) -> Result<Value, ApiError> {
        self.enter("execute_column", column_id).await?;
        self.run_cells(|column, _| column.id == column_id);
        Ok(Value::Null)
    }

    async fn execute_notebook(&self, notebook_id: &str) -> Result<Value, ApiError> {
        self.enter("execute_notebook", notebook_id).await?;
        if self.stored(notebook_id).is_none() {
            return Err(Self::not_found("execute_notebook", "Notebook"));
        }
        self.run_cells(|_, _| true);
        Ok(Value::String("executed".to_string()))
    }

    async fn upload_notebook(
        &self,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<Value, ApiError> {
        self.enter("upload_notebook", file_name).await?;

        let document: Value = serde_json::from_slice(&contents).map_err(|e| ApiError::Status {
            operation: "upload_notebook",
            status: 400,
            body: e.to_string(),
        })?;

        let mut column = Column::new("col-0");
        let cells = document["cells"].as_array().cloned().unwrap_or_default();
        for (index, cell) in cells.iter().enumerate() {
            let cell_type = match cell["cell_type"].as_str() {
                Some("markdown") => CellType::Markdown,
                Some("raw") => CellType::Raw,
                _ => CellType::Code,
            };
            column.cells.push(Cell::with_content(
                format!("cell-{}", index),
                cell_type,
                ipynb_source(&cell["source"]),
            ));
        }

        let id = {
            let mut state = self.state.lock();
            state.next_notebook += 1;
            format!("nb-{}", state.next_notebook)
        };
        let notebook = Notebook::new(id).append_column(column);
        self.insert(notebook.clone());

        serde_json::to_value(notebook).map_err(|e| ApiError::Status {
            operation: "upload_notebook",
            status: 500,
            body: e.to_string(),
        })
    }
}

impl FakeBackend {
    fn cell_exists(&self, cell_id: &str) -> bool {
        self.state
            .lock()
            .notebooks
            .values()
            .any(|notebook| notebook.find_cell(cell_id).is_some())
    }
}
