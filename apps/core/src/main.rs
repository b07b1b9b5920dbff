// IntentBot CLI entry point
// Thin caller of the core pipeline: chat loop, one-shot prediction, seeding.

use anyhow::Context;
use clap::{Parser, Subcommand};
use intentbot_core::config::{AppConfig, LogFormat};
use intentbot_core::fs_manager::PortablePathManager;
use intentbot_core::seed;
use intentbot_core::store::{ExampleStore, SqliteExampleStore};
use intentbot_core::{EnglishNormalizer, IntentPipeline};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const QUIT_WORDS: &[&str] = &["quit", "exit"];

#[derive(Parser)]
#[command(name = "intentbot", version, about = "Closed-domain intent classifier")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive chat on stdin (default)
    Chat,
    /// Classify a single utterance
    Predict {
        /// The utterance to classify
        #[arg(required = true)]
        text: Vec<String>,
        /// Print the reply as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the default training data to the example store
    Seed {
        /// Append instead of replacing existing examples
        #[arg(long)]
        keep_existing: bool,
    },
    /// Show how many examples each intent has
    Stats,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_env().context("Invalid configuration")?;
    init_tracing(config.log_format);

    if let Err(e) = PortablePathManager::init() {
        error!("Failed to initialize data directory: {}", e);
    }

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => chat(&config).await,
        Command::Predict { text, json } => predict(&config, &text.join(" "), json).await,
        Command::Seed { keep_existing } => seed_store(&config, keep_existing).await,
        Command::Stats => stats(&config).await,
    }
}

async fn ready_pipeline(config: &AppConfig) -> anyhow::Result<IntentPipeline> {
    let pipeline = IntentPipeline::connect(config, Arc::new(EnglishNormalizer::new()))
        .await
        .context("Failed to connect to the database")?;
    pipeline
        .load_training_data()
        .await
        .context("Failed to load training data (try `intentbot seed`)")?;
    pipeline.train()?;
    Ok(pipeline)
}

async fn chat(config: &AppConfig) -> anyhow::Result<()> {
    let pipeline = ready_pipeline(config).await?;

    println!("IntentBot");
    println!("{}", "=".repeat(50));
    println!("Type 'quit' to exit");
    println!("{}", "-".repeat(50));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nYou: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if QUIT_WORDS.contains(&input.to_lowercase().as_str()) {
            println!("Bot: Goodbye!");
            break;
        }
        if input.is_empty() {
            continue;
        }

        let reply = pipeline.predict_and_respond(input).await?;
        println!("Bot: {}", reply.response);
        println!("(Intent: {}, Confidence: {:.2})", reply.label, reply.confidence);
    }

    pipeline.close().await;
    Ok(())
}

async fn predict(config: &AppConfig, text: &str, json: bool) -> anyhow::Result<()> {
    let pipeline = ready_pipeline(config).await?;
    let reply = pipeline.predict_and_respond(text).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reply)?);
    } else {
        println!("{}", reply.response);
        println!("(Intent: {}, Confidence: {:.2})", reply.label, reply.confidence);
    }

    pipeline.close().await;
    Ok(())
}

async fn seed_store(config: &AppConfig, keep_existing: bool) -> anyhow::Result<()> {
    let store = SqliteExampleStore::connect(&config.database_url, config.store_timeout()).await?;
    let report = seed::seed_default(&store, keep_existing).await?;

    println!(
        "Inserted {} training examples ({} failed, {} removed)",
        report.inserted, report.failed, report.cleared
    );
    for entry in &report.distribution {
        println!("   {}: {} examples", entry.label, entry.count);
    }

    store.close().await;
    Ok(())
}

async fn stats(config: &AppConfig) -> anyhow::Result<()> {
    let store = SqliteExampleStore::connect(&config.database_url, config.store_timeout()).await?;
    let counts = store.label_counts().await?;

    if counts.is_empty() {
        println!("No training data found");
    }
    for entry in &counts {
        println!("   {}: {} examples", entry.label, entry.count);
    }

    store.close().await;
    Ok(())
}
