//! quote-post - Post one random quotation, within a daily quota

use clap::Parser;
use libquotecast::config::expand_path;
use libquotecast::logging::{LogFormat, LoggingConfig};
use libquotecast::platforms::twitter::TwitterClient;
use libquotecast::{
    run_once, Config, Credentials, PostFormatter, Publisher, QuotaTracker, QuoteStore, Result,
    RunOutcome, SystemClock,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "quote-post")]
#[command(version)]
#[command(about = "Post one random quotation, within a daily quota")]
#[command(long_about = "\
quote-post - Post one random quotation, within a daily quota

DESCRIPTION:
    Picks a quotation at random from a SQLite store, formats it as

        <text>

        - <author>

    and publishes it, unless today's post quota is used up. When the
    platform answers with a rate limit, waits for the reset time and
    tries again. Meant to be run from cron.

CREDENTIALS (environment):
    API_KEY, API_SECRET, ACCESS_TOKEN, ACCESS_SECRET

CONFIGURATION:
    Configuration file: ~/.config/quotecast/config.toml
    (override with --config or QUOTECAST_CONFIG; defaults apply if absent)

    [store]
    path = \"~/.local/share/quotecast/quotes.db\"
    table = \"quotes\"

    [quota]
    path = \"~/.local/share/quotecast/quota.txt\"
    daily_limit = 15

SIGNALS:
    SIGTERM, SIGINT - Abandon a rate-limit wait and exit
    From the publish step on, these signals no longer terminate the
    process immediately. One that arrives while a request is in flight
    (up to [api] timeout_secs) takes effect at the next quota check or wait.

EXIT CODES:
    0 - Run finished (posted, skipped, quota reached, or publish failed)
    1 - Storage or configuration error
    2 - Missing credentials
")]
struct Cli {
    /// Configuration file (defaults to QUOTECAST_CONFIG, then the XDG location)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Posts allowed per day (overrides config)
    #[arg(long, value_name = "COUNT")]
    daily_limit: Option<u32>,

    /// Log format: text, json, or pretty (overrides QUOTECAST_LOG_FORMAT)
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::from_env(cli.log_format, cli.verbose).init();

    match run(cli).await {
        Ok(outcome) => println!("{}", outcome),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<RunOutcome> {
    // Credentials first: nothing else is touched without them
    let credentials = Credentials::from_env()?;

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    let daily_limit = cli.daily_limit.unwrap_or(config.quota.daily_limit);

    let store = QuoteStore::open(&config.store).await?;
    let formatter = PostFormatter::new(config.post.max_length);
    let tracker = QuotaTracker::new(expand_path(&config.quota.path), daily_limit);
    let api = TwitterClient::new(&config.api, credentials);

    let shutdown = Arc::new(AtomicBool::new(false));
    setup_signal_handlers(shutdown.clone());

    let publisher = Publisher::new(
        Box::new(api),
        tracker,
        Arc::new(SystemClock),
        config.retry.policy(),
    )
    .with_shutdown(shutdown);

    run_once(&store, &formatter, &publisher, &mut StdRng::from_entropy()).await
}

/// Set the shutdown flag on SIGINT/SIGTERM
#[cfg(unix)]
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;
    use std::sync::atomic::Ordering;

    let mut signals = match Signals::new([SIGINT, SIGTERM]) {
        Ok(signals) => signals,
        Err(e) => {
            tracing::warn!("Signal setup failed, waits cannot be interrupted: {}", e);
            return;
        }
    };

    std::thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            tracing::info!("Received signal {}, stopping", sig);
            shutdown.store(true, Ordering::Relaxed);
        }
    });
}

#[cfg(not(unix))]
fn setup_signal_handlers(_shutdown: Arc<AtomicBool>) {}
