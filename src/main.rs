//! coursetrack - backend proxy for the CourseTrack front-end
//!
//! Forwards resource queries from the browser application to the Hourglass
//! API, adding the API key on the way out.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coursetrack::config::{log_key_status, Config, KeySource};
use coursetrack::hourglass::HourglassClient;

#[derive(Parser)]
#[command(name = "coursetrack")]
#[command(about = "Backend proxy between the CourseTrack front-end and the Hourglass API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the proxy server
    Serve {
        /// Path to configuration file (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override listen address
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Validate configuration and show the resolved settings
    Check {
        /// Path to configuration file (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Call Hourglass once to verify the API key and connectivity
    Ping {
        /// Path to configuration file (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal outside development
    let dotenv_result = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coursetrack=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Ok(path) = dotenv_result {
        tracing::debug!(path = %path.display(), "Loaded environment from file");
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, listen } => {
            tracing::info!("Starting coursetrack proxy server");
            let (mut config, key_source) = load_config(config.as_deref())?;

            if let Some(addr) = listen {
                tracing::info!(listen = %addr, "Override listen address");
                config.server.listen = addr;
            }

            log_key_status(&config, &key_source);
            coursetrack::proxy::run_server(config).await
        }

        Commands::Check { config } => {
            let (config, key_source) = load_config(config.as_deref())?;
            let masked = config
                .upstream
                .api_key
                .as_ref()
                .map(|key| key.masked())
                .unwrap_or_else(|| "(not set)".to_string());

            println!("Configuration OK");
            println!("  listen:        {}", config.server.listen);
            println!("  upstream:      {}", config.upstream.base_url);
            println!("  timeout:       {}s", config.upstream.timeout_secs);
            println!("  api key:       {} [{}]", masked, key_source);
            println!("  cors origins:  {}", config.cors.allowed_origins.join(", "));
            Ok(())
        }

        Commands::Ping { config } => {
            let (config, key_source) = load_config(config.as_deref())?;
            log_key_status(&config, &key_source);

            let client = HourglassClient::new(&config.upstream)?;
            let report = client.check_connection().await;
            println!("{}", serde_json::to_string_pretty(&report)?);

            if !report.is_success() {
                anyhow::bail!("Hourglass connection check failed");
            }
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<(Config, KeySource)> {
    match path {
        Some(path) => tracing::info!(config = %path.display(), "Loading configuration"),
        None => tracing::info!("No config file given, using defaults and environment"),
    }
    Ok(Config::load(path)?)
}
