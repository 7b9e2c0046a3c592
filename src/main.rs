use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};

use reddittweeter::config::Config;
use reddittweeter::feed::{build_client, validate_source_url, FeedFormat};
use reddittweeter::publish::{Credentials, TwitterPublisher};
use reddittweeter::session::Session;
use reddittweeter::storage::{Database, DatabaseError};

const USAGE: &str =
    "Usage: reddittweeter SOURCEURL CONSUMER_KEY CONSUMER_SECRET ACCESS_KEY ACCESS_SECRET";
const LEGACY_USAGE: &str = "   or: reddittweeter SOURCEURL USERNAME PASSWORD";

/// Get the default config file path (~/.config/reddittweeter/config.toml)
fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("reddittweeter")
            .join("config.toml"),
    )
}

/// `RUST_LOG` wins; otherwise warnings only, or debug output for this crate.
fn log_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "warn,reddittweeter=debug"
        } else {
            "warn"
        })
    })
}

#[derive(Parser, Debug)]
#[command(
    name = "reddittweeter",
    version,
    about = "Post new items from a reddit listing to a microblogging account"
)]
struct Args {
    /// Reddit listing URL (.json or .rss)
    #[arg(value_name = "SOURCE_URL")]
    source_url: Option<String>,

    /// CONSUMER_KEY CONSUMER_SECRET ACCESS_KEY ACCESS_SECRET, or USERNAME PASSWORD
    #[arg(value_name = "CREDENTIALS", allow_hyphen_values = true)]
    credentials: Vec<String>,

    /// Config file (default: ~/.config/reddittweeter/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Dedup database file
    #[arg(long, value_name = "FILE")]
    database: Option<PathBuf>,

    /// Payload format of the source URL
    #[arg(long, value_enum)]
    format: Option<FeedFormat>,

    /// Maximum number of items posted this run
    #[arg(long, value_name = "N")]
    max_posts: Option<usize>,

    /// Log every skip and publish decision to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Argument count is checked before any file, network or database access
    let parsed = (
        args.source_url.clone(),
        Credentials::from_args(&args.credentials),
    );
    let (source_url, credentials) = match parsed {
        (Some(url), Ok(credentials)) => (url, credentials),
        _ => {
            eprintln!("{}", USAGE);
            eprintln!("{}", LEGACY_USAGE);
            std::process::exit(1);
        }
    };

    let (filter, filter_handle) = reload::Layer::new(log_filter(args.verbose));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = match args.config.clone().or_else(default_config_path) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config file '{}'", path.display()))?,
        None => {
            tracing::debug!("HOME not set, using default configuration");
            Config::default()
        }
    };

    // Command-line flags override the config file
    if let Some(database) = args.database {
        config.database_path = database;
    }
    if let Some(format) = args.format {
        config.feed_format = format;
    }
    if let Some(max_posts) = args.max_posts {
        config.max_posts = max_posts;
    }
    if args.verbose {
        config.verbose = true;
    } else if config.verbose {
        filter_handle
            .reload(log_filter(true))
            .context("Failed to enable verbose logging")?;
    }

    let source = validate_source_url(&source_url).context("Invalid source URL")?;

    let db_path = config
        .database_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of reddittweeter appears to be running against {}. Please try again later.",
                db_path
            );
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    let client = build_client(&config.user_agent).context("Failed to build HTTP client")?;
    let publisher = TwitterPublisher::new(client.clone(), &config.api_base_url, credentials);
    let session = Session::new(db, publisher, config.session_settings());

    let result = session.run(&client, source.as_str()).await;
    session.database().close().await;

    let report = result.context("Run aborted")?;
    tracing::debug!(
        posted = report.posted,
        skipped = report.skipped,
        duplicates = report.duplicates,
        expired = report.expired,
        cap_reached = report.cap_reached,
        "Run complete"
    );

    Ok(())
}
