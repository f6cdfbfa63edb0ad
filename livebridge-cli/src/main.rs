use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use livebridge::TurnServerConfig;
use livebridge::server::pipeline::DEFAULT_FFMPEG_PATH;
use livebridge::server::{
    AppState, BridgeConfig, BridgeManager, FfmpegLauncher, ServerConfig, app_router, select_engine,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "livebridge", version, about = "Room signaling and WebRTC to RTMP bridge")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    options: Options,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling and bridge server (default).
    Serve,
    /// Print the ICE server list handed to peer connections, as JSON.
    IceServers,
}

#[derive(Args, Debug)]
struct Options {
    /// Address the HTTP/WebSocket server listens on
    #[arg(long, default_value = "0.0.0.0:3000", env = "LIVEBRIDGE_BIND", global = true)]
    bind: SocketAddr,

    /// Allowed CORS origins (comma-separated, `*` for any)
    #[arg(long, value_delimiter = ',', env = "ALLOWED_ORIGINS", global = true)]
    allowed_origins: Vec<String>,

    /// RTMP ingest base URL; the stream key is appended
    #[arg(
        long,
        default_value = livebridge::server::config::DEFAULT_PUBLISH_BASE_URL,
        env = "RTMP_PUBLISH_URL",
        global = true
    )]
    publish_url: String,

    /// TURN servers, full URIs or bare host:port (comma-separated)
    #[arg(long, value_delimiter = ',', env = "TURN_URLS", global = true)]
    turn_urls: Vec<String>,

    #[arg(long, env = "TURN_USERNAME", global = true)]
    turn_username: Option<String>,

    #[arg(long, env = "TURN_CREDENTIAL", hide_env_values = true, global = true)]
    turn_credential: Option<String>,

    /// STUN servers (comma-separated); public defaults when empty
    #[arg(long, value_delimiter = ',', env = "STUN_URLS", global = true)]
    stun_urls: Vec<String>,

    /// Transcoder executable
    #[arg(long, default_value = DEFAULT_FFMPEG_PATH, env = "FFMPEG_PATH", global = true)]
    ffmpeg_path: String,

    /// Upper bound on ICE gathering before an offer is answered
    #[arg(long, default_value_t = 5000, env = "ICE_GATHER_TIMEOUT_MS", global = true)]
    ice_gather_timeout_ms: u64,

    /// Time the transcoder gets after SIGTERM before it is killed
    #[arg(long, default_value_t = 5000, env = "PIPELINE_KILL_GRACE_MS", global = true)]
    kill_grace_ms: u64,

    /// Run signaling only; bridge endpoints answer 503
    #[arg(long, env = "BRIDGE_DISABLED", global = true)]
    bridge_disabled: bool,
}

impl Options {
    fn bridge_config(&self) -> BridgeConfig {
        let turn_servers = self
            .turn_urls
            .iter()
            .map(|url| TurnServerConfig {
                url: url.clone(),
                username: self.turn_username.clone().filter(|u| !u.is_empty()),
                credential: self.turn_credential.clone().filter(|c| !c.is_empty()),
            })
            .collect();

        BridgeConfig {
            publish_base_url: self.publish_url.clone(),
            stun_servers: self.stun_urls.clone(),
            turn_servers,
            ice_gather_timeout: Duration::from_millis(self.ice_gather_timeout_ms),
            kill_grace_period: Duration::from_millis(self.kill_grace_ms),
            ..BridgeConfig::default()
        }
    }

    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind,
            allowed_origins: self.allowed_origins.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(cli.options).await,
        Commands::IceServers => {
            let servers = cli.options.bridge_config().ice_servers();
            println!("{}", serde_json::to_string_pretty(&servers)?);
            Ok(())
        }
    }
}

async fn serve(options: Options) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let bridge_config = options.bridge_config();
    let server_config = options.server_config();

    let engine = select_engine(!options.bridge_disabled);
    let launcher = Arc::new(FfmpegLauncher::new(options.ffmpeg_path.clone()));
    let bridge = BridgeManager::new(engine, launcher, bridge_config);
    let state = Arc::new(AppState::new(bridge.clone()));
    let app = app_router(state, &server_config);

    println!("{}", "📡 livebridge".green().bold());
    println!("   Signaling: ws://{}/ws", server_config.bind_addr);
    if bridge.is_available() {
        println!("   Bridge:    http://{}/bridge", server_config.bind_addr);
        println!("   Publish:   {}/<streamKey>", bridge.config().publish_base_url.trim_end_matches('/'));
    } else {
        println!("   Bridge:    {}", "disabled".yellow());
    }

    let listener = tokio::net::TcpListener::bind(server_config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", server_config.bind_addr))?;
    info!("Listening on {}", server_config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(bridge))
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C after every bridge session has been torn down, which
/// also ends open event streams.
async fn shutdown_signal(bridge: BridgeManager) {
    if tokio::signal::ctrl_c().await.is_err() {
        // Without a signal handler the server runs until killed.
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested, closing bridge sessions");
    bridge.shutdown().await;
}
