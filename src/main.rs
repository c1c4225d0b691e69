use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use sema_scraper::app::ports::Storage;
use sema_scraper::config::Config;
use sema_scraper::constants::DEFAULT_CONFIG_PATH;
use sema_scraper::infra::http_client::ReqwestHttp;
use sema_scraper::logging;
use sema_scraper::pipeline::{FetchedPayload, Pipeline, PipelineResult};
use sema_scraper::storage::{InMemoryStorage, JsonFileStorage};

#[derive(Parser)]
#[command(name = "sema_scraper")]
#[command(about = "Canadian SEMA sanctions list scraper")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the list, normalize it and write one batch (default)
    Run {
        /// Override the list URL
        #[arg(long)]
        url: Option<String>,
        /// Override the batch output directory
        #[arg(long)]
        output_dir: Option<String>,
        /// Keep the batch in memory and only print the summary
        #[arg(long)]
        dry_run: bool,
    },
    /// Normalize a local XML file and print the entities as JSON
    Parse {
        #[arg(long)]
        file: PathBuf,
    },
}

fn print_result(result: &PipelineResult) {
    println!("\n📊 Pipeline Results for {}:", result.source);
    println!("   Run id: {}", result.run_id);
    println!("   Records: {}", result.total_records);
    println!("   Individuals: {}", result.individuals);
    println!("   Entities: {}", result.entities);
    println!("   Payload sha256: {}", result.payload_sha256);
    if let Some(output) = &result.output {
        println!("   Output file: {}", output);
    }
}

async fn run(
    config: &Config,
    url: Option<String>,
    output_dir: Option<String>,
    dry_run: bool,
) -> anyhow::Result<()> {
    let url = url.unwrap_or_else(|| config.source.url.clone());
    let output_dir = output_dir.unwrap_or_else(|| config.output.dir.clone());

    let http = ReqwestHttp::new(
        config.source.timeout_seconds,
        config.source.user_agent.as_deref(),
    )?;
    let storage: Arc<dyn Storage> = if dry_run {
        Arc::new(InMemoryStorage::new())
    } else {
        Arc::new(JsonFileStorage::new(output_dir))
    };

    let pipeline = Pipeline::new(Box::new(http), storage);
    let result = pipeline.run(&config.source.name, &url).await?;
    print_result(&result);
    Ok(())
}

async fn parse_file(config: &Config, file: PathBuf) -> anyhow::Result<()> {
    let bytes = std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
    let payload = FetchedPayload::new(format!("file://{}", file.display()), bytes);

    let storage = InMemoryStorage::new();
    let pipeline = Pipeline::offline(Arc::new(storage.clone()));
    pipeline.process_payload(&config.source.name, &payload).await?;

    let entities: Vec<_> = storage
        .batches()?
        .into_iter()
        .flat_map(|batch| batch.entities)
        .collect();
    println!("{}", serde_json::to_string_pretty(&entities)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // The log directory is configurable, so logging starts once config is read
    let config_present = cli.config.exists();
    let mut config = Config::load(&cli.config)?;
    let overrides = config.apply_env_overrides();

    let _log_guard = logging::init_logging(&config.output.log_dir);
    if config_present {
        info!("Loaded configuration from {}", cli.config.display());
    } else {
        info!("No config file at {}, using defaults", cli.config.display());
    }
    for key in overrides {
        info!("Applied override from {}", key);
    }

    let outcome = match cli.command.unwrap_or(Commands::Run {
        url: None,
        output_dir: None,
        dry_run: false,
    }) {
        Commands::Run {
            url,
            output_dir,
            dry_run,
        } => run(&config, url, output_dir, dry_run).await,
        Commands::Parse { file } => parse_file(&config, file).await,
    };

    match &outcome {
        Ok(()) => info!("Run completed"),
        Err(e) => error!("Run failed: {:#}", e),
    }
    outcome
}
