use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use column_notebook::{
    markdown, render_all, CellType, ClientConfig, DocumentStore, HttpNotebookApi, Notebook,
    Orchestrator, UploadOutcome,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "column-notebook")]
#[command(about = "Author and run column notebooks against a notebook backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend URL (overrides config file and NOTEBOOK_API_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Per-request timeout (seconds)
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new notebook
    Create,

    /// Print a notebook with its outputs
    Show { notebook_id: String },

    /// Append an empty column
    AddColumn { notebook_id: String },

    /// Append an empty cell to a column
    AddCell {
        notebook_id: String,
        column_id: String,

        /// code, markdown or raw
        #[arg(short = 't', long = "type", default_value = "code")]
        cell_type: CellType,
    },

    /// Replace a cell's content and save the notebook
    Edit {
        notebook_id: String,
        column_id: String,
        cell_id: String,

        /// New content (use @filename to read from file)
        content: String,
    },

    /// Execute one cell
    RunCell { notebook_id: String, cell_id: String },

    /// Execute the code cells of one column
    RunColumn {
        notebook_id: String,
        column_id: String,
    },

    /// Execute every code cell of a notebook
    Run { notebook_id: String },

    /// Import a .ipynb file
    Upload { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    tracing::debug!("Using backend at {}", config.base_url);

    let api = HttpNotebookApi::from_config(&config)?;
    let orchestrator = Orchestrator::new(api, DocumentStore::new())
        .serialize_protocols(config.serialize_protocols);

    match cli.command {
        Commands::Create => {
            let notebook = orchestrator.create_notebook().await?;
            println!("Created notebook {}", notebook.id);
            print_notebook(&notebook);
        }

        Commands::Show { notebook_id } => {
            let notebook = orchestrator.load_notebook(&notebook_id).await?;
            print_notebook(&notebook);
        }

        Commands::AddColumn { notebook_id } => {
            orchestrator.load_notebook(&notebook_id).await?;
            let column = orchestrator.add_column().await?;
            println!("Added column {}", column.id);
        }

        Commands::AddCell {
            notebook_id,
            column_id,
            cell_type,
        } => {
            orchestrator.load_notebook(&notebook_id).await?;
            let cell = orchestrator.add_cell(&column_id, cell_type).await?;
            println!("Added {} cell {} to {}", cell.cell_type, cell.id, column_id);
        }

        Commands::Edit {
            notebook_id,
            column_id,
            cell_id,
            content,
        } => {
            let content = read_content(&content)?;
            orchestrator.load_notebook(&notebook_id).await?;

            let found = orchestrator
                .store()
                .notebook()
                .is_some_and(|nb| nb.cell(&column_id, &cell_id).is_some());
            if !found {
                anyhow::bail!("cell {} not found in column {}", cell_id, column_id);
            }

            orchestrator.edit_cell(&column_id, &cell_id, &content);
            orchestrator.save().await?;
            println!("Saved {}", cell_id);
        }

        Commands::RunCell {
            notebook_id,
            cell_id,
        } => {
            orchestrator.load_notebook(&notebook_id).await?;
            let notebook = orchestrator.execute_cell(&cell_id).await?;
            print_notebook(&notebook);
        }

        Commands::RunColumn {
            notebook_id,
            column_id,
        } => {
            orchestrator.load_notebook(&notebook_id).await?;
            let notebook = orchestrator.execute_column(&column_id).await?;
            print_notebook(&notebook);
        }

        Commands::Run { notebook_id } => {
            orchestrator.load_notebook(&notebook_id).await?;
            let notebook = orchestrator.execute_notebook().await?;
            print_notebook(&notebook);
        }

        Commands::Upload { path } => match orchestrator.upload_notebook(&path).await? {
            UploadOutcome::Imported(notebook) => {
                println!("Imported {} as notebook {}", path.display(), notebook.id);
                print_notebook(&notebook);
            }
            UploadOutcome::Raw(response) => {
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
        },
    }

    Ok(())
}

/// Config file, then environment, then flags
fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };

    let mut config = config.with_env_overrides();
    if let Some(url) = &cli.url {
        config.base_url = url.clone();
    }
    if cli.timeout.is_some() {
        config.request_timeout_secs = cli.timeout;
    }
    Ok(config)
}

fn read_content(arg: &str) -> Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read cell content from: {}", path)),
        None => Ok(arg.to_string()),
    }
}

fn print_notebook(notebook: &Notebook) {
    println!("Notebook {} ({} columns)", notebook.id, notebook.column_count());

    for column in &notebook.columns {
        println!("\n== {} [{}]", column.title(), column.id);

        for cell in &column.cells {
            println!("\n-- {} ({})", cell.id, cell.cell_type);
            match cell.cell_type {
                CellType::Markdown => println!("{}", markdown::render_plain(&cell.content)),
                _ => println!("{}", cell.content),
            }

            for form in render_all(&cell.outputs) {
                println!(">> {}", form.to_plain_text().trim_end());
            }
        }
    }
}
