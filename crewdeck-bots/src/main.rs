//! crewdeck-bots: run the brand-compliance crew.
//!
//!   crewdeck-bots                  generate, implement and evaluate features
//!   crewdeck-bots evaluate [file]  evaluate one snippet (bundled sample if omitted)
//!
//! Requires ANTHROPIC_API_KEY (a `.env` file in the working directory is read).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crewdeck_bots::config::{CrewConfig, FileConfig, Overrides, SAMPLE_CODE};
use crewdeck_bots::llm::LlmClient;
use crewdeck_bots::workflow;

#[derive(Parser)]
#[command(name = "crewdeck-bots", about = "LLM agent crew that builds and reviews small features")]
struct Args {
    /// Config file (default: ./crewdeck.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the evaluation results
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of features to generate (1-10)
    #[arg(long, allow_negative_numbers = true)]
    num_tasks: Option<i64>,

    /// Claude model to use
    #[arg(long)]
    model: Option<String>,

    /// Anthropic API key (or set ANTHROPIC_API_KEY env var)
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    api_key: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate features, implement them and evaluate each one (default)
    Run,
    /// Evaluate a single code file against the guidelines
    Evaluate {
        /// File to evaluate; the bundled non-compliant sample if omitted
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crewdeck_bots=info".into()),
        )
        .init();

    let args = Args::parse();

    let file = FileConfig::discover(args.config.as_deref())?;
    let config = CrewConfig::resolve(
        file,
        Overrides {
            model: args.model.clone(),
            num_tasks: args.num_tasks,
            output: args.output.clone(),
        },
    )?;

    let llm = LlmClient::new(args.api_key.clone()).with_model(&config.model);

    tracing::info!(
        model = %config.model,
        num_tasks = %config.num_tasks,
        output = %config.output.display(),
        "Starting crewdeck-bots"
    );

    match args.command.unwrap_or(Command::Run) {
        Command::Run => {
            workflow::run(&llm, &config).await?;
            println!(
                "Supervisor output has been saved to '{}'",
                config.output.display()
            );
        }
        Command::Evaluate { file } => {
            let code = match file {
                Some(path) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => SAMPLE_CODE.to_string(),
            };
            let result = workflow::evaluate(&llm, &config, &code).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
