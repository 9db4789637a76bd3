//! Harvester CLI
//!
//! Local execution entry point. For AWS Lambda, use `harvester-lambda`.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use harvester::{
    error::Result,
    models::{Config, CrawlMode, GroupRef, ParticipantCategory, PartitionKey, StorageBackend},
    pipeline,
    services::WindowPlanner,
};

/// Harvester - paginated message and participant crawler
#[derive(Parser, Debug)]
#[command(
    name = "harvester",
    version,
    about = "Date-bounded group message and participant crawler"
)]
struct Cli {
    /// Path to the config file (default: {storage_dir}/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Local storage directory, overriding storage.root_dir
    #[arg(short, long, global = true)]
    storage_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl messages of a group, one partition per window
    Messages {
        /// Numeric channel id or group link
        #[arg(short, long)]
        group: GroupRef,

        /// Estimated number of messages; bounds each window's walk
        #[arg(short, long)]
        estimated: usize,

        /// today, historic or range:DD/MM/YY:DD/MM/YY
        #[arg(short, long, default_value = "today")]
        mode: CrawlMode,
    },

    /// Crawl participants of a group
    Participants {
        /// Numeric channel id or group link
        #[arg(short, long)]
        group: GroupRef,

        /// Estimated number of participants; bounds each partition's walk
        #[arg(short, long)]
        estimated: usize,

        /// ALL, ADMIN, BANNED, BOT, RECENT or MENTIONS
        #[arg(short = 't', long, default_value = "ALL")]
        category: ParticipantCategory,
    },

    /// Validate the configuration and print effective settings
    Validate,

    /// Print the windows a mode expands to, without fetching
    Plan {
        /// today, historic or range:DD/MM/YY:DD/MM/YY
        #[arg(short, long)]
        mode: CrawlMode,

        /// Group used to name the partitions
        #[arg(short, long)]
        group: Option<GroupRef>,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let defaults = Config::default();
    let storage_dir = cli
        .storage_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&defaults.storage.root_dir));
    let config_path = cli.config.unwrap_or_else(|| storage_dir.join("config.toml"));

    let mut config = Config::load_or_default(&config_path);
    if let Some(dir) = &cli.storage_dir {
        config.storage.root_dir = dir.display().to_string();
    }
    log::info!("Loaded configuration from {}", config_path.display());

    match cli.command {
        Command::Messages {
            group,
            estimated,
            mode,
        } => {
            config.validate()?;
            let orchestrator = pipeline::build_orchestrator(Arc::new(config)).await?;
            let report = orchestrator.crawl_messages(&group, estimated, &mode).await?;

            for done in &report.completed {
                log::info!(
                    "✓ {} ({} records, {} fetches) -> {}",
                    done.result.partition(),
                    done.result.len(),
                    done.fetches,
                    done.location
                );
            }

            if let Some(failure) = report.failure {
                log::error!(
                    "Window {} failed; {} later window(s) not attempted",
                    failure.window,
                    report.skipped_windows
                );
                return Err(failure.error);
            }
            log::info!(
                "Crawl complete: {} partition(s), {} records",
                report.completed.len(),
                report.record_count()
            );
        }

        Command::Participants {
            group,
            estimated,
            category,
        } => {
            config.validate()?;
            let orchestrator = pipeline::build_orchestrator(Arc::new(config)).await?;
            let report = orchestrator
                .crawl_participants(&group, estimated, category)
                .await?;

            log::info!(
                "✓ {} ({} users, {} fetches) -> {}",
                report.result.partition(),
                report.result.len(),
                report.fetches,
                report.location
            );
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }

            log::info!("✓ Config OK");
            log::info!(
                "  Gateway: {} (token from ${})",
                config.gateway.base_url,
                config.gateway.token_env
            );
            match config.storage.backend {
                StorageBackend::Local => log::info!(
                    "  Storage: local {}/{}",
                    config.storage.root_dir,
                    config.storage.prefix
                ),
                StorageBackend::S3 => log::info!(
                    "  Storage: s3://{}/{}",
                    config.storage.bucket,
                    config.storage.prefix
                ),
            }
            log::info!(
                "  Page sizes: messages {}, participants {}",
                config.messages.page_size,
                config.participants.page_size
            );
            log::info!(
                "  Exclusion: {}",
                if config.exclusion.enabled {
                    config.exclusion.group.as_str()
                } else {
                    "disabled"
                }
            );
        }

        Command::Plan { mode, group } => {
            let planner = WindowPlanner::new(config.crawler.offset()?);
            let plan = planner.plan(&mode, Utc::now())?;
            let short_name = group.map(|g| g.short_name());

            for window in &plan {
                match &short_name {
                    Some(name) => println!("{}\t{}", window, PartitionKey::messages(&window, name)),
                    None => println!("{}", window),
                }
            }
            log::info!("{} window(s)", plan.len());
        }
    }

    Ok(())
}
