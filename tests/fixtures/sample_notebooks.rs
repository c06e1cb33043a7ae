// Helper functions to build test notebooks with various configurations

use column_notebook::{Cell, CellType, Column, Notebook};

/// Notebook with an ID and no columns
pub fn empty_notebook() -> Notebook {
    Notebook::new("nb1")
}

/// Two columns:
/// - col1: `c1` code (`x = 1`), `c2` markdown
/// - col2: `c3` code (`print(x)`), `c4` code that raises
pub fn two_column_notebook() -> Notebook {
    let mut input = Column::new("col1");
    input.metadata.insert("title".to_string(), "Input".into());
    input.cells.push(Cell::with_content("c1", CellType::Code, "x = 1"));
    input
        .cells
        .push(Cell::with_content("c2", CellType::Markdown, "# Notes\nSome *text*"));

    let mut process = Column::new("col2");
    process
        .cells
        .push(Cell::with_content("c3", CellType::Code, "print(x)"));
    process.cells.push(Cell::with_content(
        "c4",
        CellType::Code,
        "raise ValueError('bad')",
    ));

    empty_notebook().append_column(input).append_column(process)
}

/// Minimal nbformat 4 document with one markdown and two code cells
pub fn sample_ipynb() -> &'static str {
    r##"{
  "nbformat": 4,
  "nbformat_minor": 5,
  "metadata": {},
  "cells": [
    {"cell_type": "markdown", "metadata": {}, "source": ["# Imported\n", "From a file"]},
    {"cell_type": "code", "metadata": {}, "source": "a = 2", "outputs": [], "execution_count": null},
    {"cell_type": "code", "metadata": {}, "source": ["print(a * 21)"], "outputs": [], "execution_count": null}
  ]
}"##
}
