use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use songbook_server::config::{self, AppConfig, FileConfig};
use songbook_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};
use songbook_server::songbook::{SongbookStore, SqliteSongbookStore};
use songbook_server::sync::{SqliteSyncRecordStore, SyncProcessor};
use songbook_server::user::{SqliteUserStore, UserManager};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

fn parse_dir(s: &str) -> Result<PathBuf, String> {
    let path = parse_path(s)?;
    if !path.exists() {
        return Err(format!("Directory does not exist: {}", s));
    }
    if !path.is_dir() {
        return Err(format!("Path is not a directory: {}", s));
    }
    Ok(path)
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory containing database files (songbook.db, user.db, sync.db).
    /// Can also be specified in config file.
    #[clap(long, value_parser = parse_dir)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// The maximum age of cacheable content in seconds.
    #[clap(long, default_value_t = 3600)]
    pub content_cache_age_sec: usize,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Interval in hours between pruning runs.
    #[clap(long, default_value_t = 24)]
    pub prune_interval_hours: u64,

    /// Number of days applied sync operations are remembered for replay
    /// detection. Set to 0 to disable pruning.
    #[clap(long, default_value_t = 30)]
    pub sync_retention_days: u64,

    /// Auth tokens unused for this many days are deleted. Set to 0 to keep them.
    #[clap(long, default_value_t = 90)]
    pub token_unused_days: u64,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_dir: args.db_dir.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            content_cache_age_sec: args.content_cache_age_sec,
            frontend_dir_path: args.frontend_dir_path.clone(),
            prune_interval_hours: args.prune_interval_hours,
            sync_retention_days: args.sync_retention_days,
            token_unused_days: args.token_unused_days,
        }
    }
}

fn refresh_item_metrics(songbook: &dyn SongbookStore) {
    match (
        songbook.count_songs(),
        songbook.count_arrangements(),
        songbook.count_setlists(),
    ) {
        (Ok(songs), Ok(arrangements), Ok(setlists)) => {
            metrics::set_songbook_items(songs, arrangements, setlists)
        }
        _ => error!("Failed to count songbook items"),
    }
}

fn spawn_pruning(
    app_config: &AppConfig,
    songbook: Arc<dyn SongbookStore>,
    user_manager: Arc<UserManager>,
    sync_processor: Arc<SyncProcessor>,
) {
    let retention_days = app_config.sync.op_retention_days;
    let token_unused_days = app_config.auth.token_unused_days;
    let interval_hours = app_config.prune_interval_hours.max(1);

    info!(
        "Pruning every {} hours: sync records after {} days, tokens unused for {} days",
        interval_hours, retention_days, token_unused_days
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_hours * 60 * 60));

        // Skip the first immediate tick, wait for the first interval
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let now = chrono::Utc::now().timestamp();

            if retention_days > 0 {
                match sync_processor.prune_records(retention_days, now) {
                    Ok(count) if count > 0 => info!("Pruned {} old sync records", count),
                    Ok(_) => {}
                    Err(e) => error!("Failed to prune sync records: {}", e),
                }
            }

            if token_unused_days > 0 {
                match user_manager.prune_unused_auth_tokens(token_unused_days) {
                    Ok(count) if count > 0 => info!("Pruned {} unused auth tokens", count),
                    Ok(_) => {}
                    Err(e) => error!("Failed to prune auth tokens: {}", e),
                }
            }

            refresh_item_metrics(songbook.as_ref());
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&(&cli_args).into(), file_config)?;

    info!(
        "Opening songbook database at {:?}...",
        app_config.songbook_db_path()
    );
    let songbook: Arc<dyn SongbookStore> =
        Arc::new(SqliteSongbookStore::new(app_config.songbook_db_path())?);

    info!("Opening user database at {:?}...", app_config.user_db_path());
    let user_store = Arc::new(SqliteUserStore::new(app_config.user_db_path())?);
    let user_manager = Arc::new(UserManager::new(user_store));

    info!("Opening sync database at {:?}...", app_config.sync_db_path());
    let sync_records = Arc::new(SqliteSyncRecordStore::new(app_config.sync_db_path())?);
    let sync_processor = Arc::new(SyncProcessor::new(
        songbook.clone(),
        user_manager.clone(),
        sync_records,
        app_config.sync.max_batch_size,
    ));

    info!("Initializing metrics...");
    metrics::init_metrics();
    refresh_item_metrics(songbook.as_ref());

    spawn_pruning(
        &app_config,
        songbook.clone(),
        user_manager.clone(),
        sync_processor.clone(),
    );

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        content_cache_age_sec: app_config.content_cache_age_sec,
        frontend_dir_path: app_config.frontend_dir_path.clone(),
        allow_registration: app_config.auth.allow_registration,
    };

    tokio::select! {
        result = run_server(
            server_config,
            songbook,
            user_manager,
            sync_processor,
            app_config.metrics_port,
        ) => {
            info!("HTTP server stopped: {:?}", result);
            result
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            Ok(())
        }
    }
}
