use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

use lecture_segmenter::{
    verify_index_configuration, Config, SegmentationPipeline, TokioClock, TwelveLabsClient,
    VideoIndexService,
};

fn cli() -> Command {
    let config_arg = Arg::new("config")
        .short('c')
        .long("config")
        .value_name("FILE")
        .help("Path to a TOML configuration file")
        .global(true);

    Command::new("Lecture Segmenter")
        .version(env!("CARGO_PKG_VERSION"))
        .author("TigreRoll")
        .about("Index lecture videos and split them into titled segments")
        .arg(config_arg)
        .subcommand(
            Command::new("serve")
                .about("Verify the index and serve the HTTP API (default)")
                .arg(
                    Arg::new("host")
                        .long("host")
                        .value_name("HOST")
                        .help("Address to bind"),
                )
                .arg(
                    Arg::new("port")
                        .short('p')
                        .long("port")
                        .value_name("PORT")
                        .help("Port to listen on")
                        .value_parser(clap::value_parser!(u16)),
                ),
        )
        .subcommand(
            Command::new("segment")
                .about("Index one video and print its segments as JSON")
                .arg(
                    Arg::new("url")
                        .short('u')
                        .long("url")
                        .value_name("URL")
                        .help("Video URL reachable by the indexing service")
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("status")
                .about("Print the status of an indexing task as JSON")
                .arg(
                    Arg::new("task-id")
                        .short('t')
                        .long("task-id")
                        .value_name("ID")
                        .required(true),
                ),
        )
        .subcommand(Command::new("verify").about("Only verify (or create) the configured index"))
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    match matches.get_one::<String>("config") {
        Some(path) => Config::from_file(&PathBuf::from(path)),
        None => Config::load(),
    }
}

type FilterHandle = reload::Handle<EnvFilter, Registry>;

fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!("lecture_segmenter={},warn", level))
}

/// Install the subscriber before anything else logs; RUST_LOG wins when set
fn init_logging() -> (FilterHandle, bool) {
    let from_env = EnvFilter::try_from_default_env().ok();
    let pinned = from_env.is_some();
    let (filter, handle) = reload::Layer::new(from_env.unwrap_or_else(|| default_filter("info")));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();

    (handle, pinned)
}

/// Apply the configured log level once the config is known
fn apply_log_level(handle: &FilterHandle, config: &Config) {
    if let Err(e) = handle.reload(default_filter(&config.server.log_level)) {
        warn!("Cannot apply log level '{}': {}", config.server.log_level, e);
    }
}

async fn build_pipeline(config: &Config) -> Result<SegmentationPipeline> {
    let service: Arc<dyn VideoIndexService> = Arc::new(
        TwelveLabsClient::new(&config.service).context("Cannot create indexing service client")?,
    );

    // a misconfigured index must never serve traffic
    let index = verify_index_configuration(service.as_ref(), &config.index)
        .await
        .context("Index configuration verification failed")?;

    Ok(SegmentationPipeline::new(
        service,
        Arc::new(index),
        config,
        Arc::new(TokioClock),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let (log_handle, log_pinned) = init_logging();

    let mut config = match load_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            error!("❌ {:#}", e);
            return Err(e);
        }
    };
    if let Some(("serve", serve_args)) = matches.subcommand() {
        if let Some(host) = serve_args.get_one::<String>("host") {
            config.server.host = host.clone();
        }
        if let Some(port) = serve_args.get_one::<u16>("port") {
            config.server.port = *port;
        }
    }

    if !log_pinned {
        apply_log_level(&log_handle, &config);
    }

    if let Err(e) = config.validate() {
        error!("❌ {}", e);
        return Err(e);
    }
    info!("🚀 Lecture Segmenter starting...");
    info!("{}", config.summary());

    match matches.subcommand() {
        Some(("segment", args)) => {
            let url = args
                .get_one::<String>("url")
                .ok_or_else(|| anyhow!("--url is required"))?;
            let pipeline = build_pipeline(&config).await?;
            let segments = pipeline.index_and_segment(url).await?;
            println!("{}", serde_json::to_string_pretty(&segments)?);
        }
        Some(("status", args)) => {
            let task_id = args
                .get_one::<String>("task-id")
                .ok_or_else(|| anyhow!("--task-id is required"))?;
            let pipeline = build_pipeline(&config).await?;
            let snapshot = pipeline.task_status(task_id).await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Some(("verify", _)) => {
            let pipeline = build_pipeline(&config).await?;
            println!("{}", serde_json::to_string_pretty(pipeline.index())?);
        }
        _ => serve(config).await?,
    }

    Ok(())
}

#[cfg(feature = "api")]
async fn serve(config: Config) -> Result<()> {
    use lecture_segmenter::api::ApiServer;

    let pipeline = Arc::new(build_pipeline(&config).await?);
    ApiServer::new(pipeline, Arc::new(config)).run().await
}

#[cfg(not(feature = "api"))]
async fn serve(_config: Config) -> Result<()> {
    Err(anyhow!("built without the `api` feature; use `segment` or `status`"))
}
