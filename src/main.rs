//! mongo-explain CLI entry point.
//!
//! Reads a JSON-Lines script of CRUD operations and plays it through an
//! [`ExplainableCollection`], logging the server's execution plan for each
//! operation instead of running it. Exits non-zero on the first failure.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mongodb::options::ClientOptions;
use mongodb::Client;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mongo_explain::utils::json::document_to_json;
use mongo_explain::{ExplainableCollection, ScriptOp, Verbosity};

/// Explain every CRUD operation in a script without executing it
#[derive(Parser, Debug)]
#[command(name = "mongo-explain", version, about, long_about = None)]
struct Cli {
    /// MongoDB connection string
    #[arg(long, default_value = "mongodb://localhost:27017")]
    uri: String,

    /// Database holding the target collection
    #[arg(long)]
    db: String,

    /// Target collection name
    #[arg(long)]
    collection: String,

    /// Explain verbosity requested from the server
    #[arg(long, default_value = "queryPlanner")]
    verbosity: Verbosity,

    /// Opaque comment attached to every explain command
    #[arg(long)]
    comment: Option<String>,

    /// JSON-Lines script, one CRUD operation per line
    script: PathBuf,
}

async fn connect(uri: &str) -> Result<Client> {
    let mut options = ClientOptions::parse(uri)
        .await
        .context("failed to parse MongoDB connection URI")?;

    options.app_name = Some("mongo-explain".into());

    let client =
        Client::with_options(options).context("failed to create MongoDB client with options")?;

    // Test the connection
    client
        .database("admin")
        .run_command(mongodb::bson::doc! { "ping": 1 }, None)
        .await
        .context("failed to ping MongoDB server")?;

    Ok(client)
}

async fn run(cli: Cli) -> Result<()> {
    let client = connect(&cli.uri).await?;
    let collection = client.database(&cli.db).collection(&cli.collection);

    let mut explain = ExplainableCollection::new(collection).verbosity(cli.verbosity);
    if let Some(comment) = cli.comment {
        explain = explain.comment(comment);
    }

    let script = std::fs::read_to_string(&cli.script)
        .with_context(|| format!("failed to read script {}", cli.script.display()))?;

    for (line_no, line) in script.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let op: ScriptOp = serde_json::from_str(line)
            .with_context(|| format!("line {}: not a valid operation", line_no + 1))?;
        let name = op.name();
        let plan = op
            .run(&explain)
            .await
            .with_context(|| format!("line {}: {} failed", line_no + 1, name))?;
        info!(operation = name, "explain response: {}", document_to_json(&plan));
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
