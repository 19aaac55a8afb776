use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod classifier;
use classifier::OnnxEmotionClassifier;

mod error;

mod moodtable;
use moodtable::MoodTable;

mod search;
use search::{NoOpVideoSearch, VideoSearch, YoutubeSearchClient};

mod server;
use server::{run_server, RequestsLoggingLevel};

mod user;
use user::SqliteUserStore;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the CSV table of songs with their mood column.
    #[clap(value_parser = parse_path)]
    pub song_table: PathBuf,

    /// Path to the SQLite database file to use for user storage.
    #[clap(value_parser = parse_path)]
    pub user_store_file_path: PathBuf,

    /// Path to the ONNX emotion model artifact.
    #[clap(long, default_value = "model/emotion.onnx", value_parser = parse_path)]
    pub model_path: PathBuf,

    /// URL to download the model artifact from when it is missing on disk.
    #[clap(long)]
    pub model_url: Option<String>,

    /// API key for the video search service. Without it, the videos
    /// endpoint returns empty results.
    #[clap(long, env = "SEARCH_API_KEY")]
    pub search_api_key: Option<String>,

    /// Timeout in seconds for video search requests.
    #[clap(long, default_value_t = 10)]
    pub search_timeout_sec: u64,

    /// Path to the directory with emoji images and mood clips, statically
    /// served under /assets.
    #[clap(long)]
    pub assets_dir_path: Option<String>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// How many songs to recommend per detected mood.
    #[clap(long, default_value_t = 10)]
    pub song_sample_size: usize,
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
        .unwrap();

    info!("Loading song table from {:?}...", cli_args.song_table);
    let mood_table = MoodTable::load(&cli_args.song_table)?;
    info!("Loaded {} songs", mood_table.len());

    let user_store = Box::new(SqliteUserStore::new(&cli_args.user_store_file_path)?);

    let classifier = Arc::new(OnnxEmotionClassifier::new(
        cli_args.model_path,
        cli_args.model_url,
    ));

    let video_search: Arc<dyn VideoSearch> = match cli_args.search_api_key {
        Some(api_key) => {
            info!("Video search enabled");
            Arc::new(YoutubeSearchClient::new(
                api_key,
                cli_args.search_timeout_sec,
            ))
        }
        None => {
            info!("No search API key configured, videos endpoint will be empty");
            Arc::new(NoOpVideoSearch)
        }
    };

    info!("Ready to serve at port {}!", cli_args.port);
    run_server(
        mood_table,
        classifier,
        video_search,
        user_store,
        cli_args.logging_level,
        cli_args.port,
        cli_args.assets_dir_path,
        cli_args.song_sample_size,
    )
    .await
}
