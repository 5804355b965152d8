use anyhow::Context;
use bpmnflow::compiler::loader;
use bpmnflow::{Callable, Engine};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive a process with default policies until it finishes or waits
    Run {
        /// Path to the process file (YAML, or JSON by extension)
        #[arg(long)]
        file: PathBuf,

        /// Initial payload as a JSON document
        #[arg(long)]
        data: Option<String>,

        /// Also write the resulting snapshot to this path
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { file, data, snapshot } => {
            info!("Loading process from: {:?}", file);
            let process = loader::load_process(&file)?;

            let data: Value = match data {
                Some(raw) => serde_json::from_str(&raw).context("--data is not valid JSON")?,
                None => Value::Null,
            };

            let mut engine = Engine::with_process(&process, Callable::new())?;
            let data = engine.advance(data).await?;
            info!(
                instance_id = %engine.instance_id(),
                state = ?engine.state(),
                head = engine.head().len(),
                stack = engine.stack().len(),
                "run complete"
            );

            let rendered = serde_json::to_string_pretty(&engine.serialize())?;
            println!("{}", rendered);
            println!("payload: {}", data);

            if let Some(path) = snapshot {
                fs::write(&path, &rendered)
                    .with_context(|| format!("Failed to write snapshot to {}", path.display()))?;
                info!("Snapshot written to {:?}", path);
            }
        }
    }

    Ok(())
}
