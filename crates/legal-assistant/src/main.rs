//! Legal assistant CLI
//!
//! ```bash
//! legal-assistant index
//! legal-assistant ask "Thủ tục thành lập công ty TNHH?"
//! legal-assistant ask "Phân tích hợp đồng" --file hop_dong.docx
//! legal-assistant upload hop_dong.docx
//! legal-assistant repl
//! ```

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use legal_assistant::{AssistantConfig, ContractStorage, LawLibrary, LegalOrchestrator};

/// Vietnamese corporate-law assistant
#[derive(Parser, Debug)]
#[command(name = "legal-assistant")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rebuild the law index from the laws directory
    Index,

    /// Ask a single question
    Ask {
        question: String,

        /// Contract file to analyze
        #[arg(short, long)]
        file: Option<String>,
    },

    /// Copy a contract into contract storage
    Upload { path: PathBuf },

    /// Interactive session; `file: <path>` analyzes a contract
    Repl,
}

fn load_config(path: Option<&PathBuf>) -> Result<AssistantConfig> {
    let config = match path {
        Some(path) => AssistantConfig::from_file(path).map_err(|e| anyhow!(e))?,
        None => AssistantConfig::default(),
    };
    config.validate().map_err(|e| anyhow!(e))?;
    Ok(config)
}

async fn build_orchestrator(config: AssistantConfig) -> Result<LegalOrchestrator> {
    tokio::task::spawn_blocking(move || LegalOrchestrator::from_config(&config)).await?
}

/// Embed the laws directory once into a fresh library. The persisted index
/// is overwritten without being loaded first.
async fn rebuild_law_index(config: AssistantConfig) -> Result<usize> {
    tokio::task::spawn_blocking(move || {
        LawLibrary::from_config(&config)?.build_from_dir(&config.laws_dir)
    })
    .await?
}

/// Split a REPL line into (input, file). `file: <path>` becomes a contract
/// analysis request on that path, quotes stripped.
fn parse_repl_line(line: &str) -> (String, Option<String>) {
    match line.strip_prefix("file:") {
        Some(path) => (
            "Phân tích file".to_string(),
            Some(path.trim().replace('"', "")),
        ),
        None => (line.to_string(), None),
    }
}

async fn run_repl(orchestrator: &LegalOrchestrator) -> Result<()> {
    println!("✅ Legal assistant ready. Type `exit` to quit.");
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("\nYou: ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let line = line.trim();
        if line == "exit" || line == "quit" {
            break;
        }
        if line.is_empty() {
            continue;
        }
        let (input, file) = parse_repl_line(line);
        let reply = orchestrator.process(&input, file.as_deref()).await;
        println!("AI: {reply}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Index => {
            let chunks = rebuild_law_index(config).await?;
            println!("Indexed {chunks} law chunks");
        }
        Commands::Ask { question, file } => {
            let orchestrator = build_orchestrator(config).await?;
            println!("{}", orchestrator.process(&question, file.as_deref()).await);
        }
        Commands::Upload { path } => {
            let stored = ContractStorage::new(&config.contracts_dir).store_file(&path)?;
            println!("{}", stored.display());
        }
        Commands::Repl => {
            let orchestrator = build_orchestrator(config).await?;
            run_repl(&orchestrator).await?;
        }
    }

    Ok(())
}
