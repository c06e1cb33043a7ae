/// Example: a simple two-column workflow against a running backend
///
/// This example demonstrates:
/// - Creating a notebook
/// - Adding columns and cells
/// - Editing and saving cell content
/// - Executing a column and the whole notebook
/// - Rendering outputs
///
/// Start the backend first (default http://localhost:8000, or set
/// NOTEBOOK_API_URL), then run `cargo run --example simple_workflow`.

use anyhow::{Context, Result};
use column_notebook::*;

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Column Notebook: Simple Workflow Example ===\n");

    let config = ClientConfig::default().with_env_overrides();
    let api = HttpNotebookApi::from_config(&config)?;
    let orchestrator = Orchestrator::new(api, DocumentStore::new());

    // Step 1: Create a notebook
    println!("Step 1: Creating notebook at {}...", config.base_url);
    let notebook = orchestrator.create_notebook().await?;
    println!("  ✓ Created notebook {}", notebook.id);

    // The backend starts every notebook with one column
    let input_column = match notebook.columns.first() {
        Some(column) => column.id.clone(),
        None => orchestrator.add_column().await?.id,
    };

    // Step 2: Fill the first column
    println!("\nStep 2: Writing the input column...");
    let heading = orchestrator.add_cell(&input_column, CellType::Markdown).await?;
    orchestrator.edit_cell(&input_column, &heading.id, "# Input\nThe starting value.");

    let input = orchestrator.add_cell(&input_column, CellType::Code).await?;
    orchestrator.edit_cell(&input_column, &input.id, "value = 42\nprint(f'Initial value: {value}')");
    println!("  ✓ Added markdown and code cells");

    // Step 3: A second column that uses the first one's variables
    println!("\nStep 3: Adding a processing column...");
    let process_column = orchestrator.add_column().await?;
    let process = orchestrator.add_cell(&process_column.id, CellType::Code).await?;
    orchestrator.edit_cell(
        &process_column.id,
        &process.id,
        "result = value * 2\nprint(f'Processed: {result}')",
    );
    println!("  ✓ Added column {}", process_column.id);

    // Step 4: Validate and save
    println!("\nStep 4: Saving...");
    let current = orchestrator.store().notebook().context("notebook missing")?;
    let report = current.validate();
    for issue in &report.issues {
        println!("  {:?}: {}", issue.severity, issue.message);
    }
    orchestrator.save().await?;
    println!("  ✓ Saved {} cells", current.cell_count());

    // Step 5: Execute
    println!("\nStep 5: Executing...");
    orchestrator.execute_column(&input_column).await?;
    println!("  ✓ Input column done");
    let executed = orchestrator.execute_notebook().await?;
    println!("  ✓ Notebook done");

    // Step 6: Show outputs
    println!("\n📊 Outputs:");
    for column in &executed.columns {
        println!("  └─ {}", column.title());
        for cell in column.cells.iter().filter(|cell| cell.has_outputs()) {
            for form in render_all(&cell.outputs) {
                println!("     {} → {}", cell.id, form.to_plain_text().trim_end());
            }
        }
    }

    println!("\n  Protocol events logged: {}", orchestrator.events().len());
    println!("\n✅ Workflow complete!\n");
    Ok(())
}
