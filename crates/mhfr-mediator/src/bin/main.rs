//! MHFR Facilities Mediator entry point
//!
//! # Usage
//!
//! ```bash
//! # Serve with config/config.json and the port of the first mediator endpoint
//! mhfr-mediator serve
//!
//! # Serve with config/test.json on port 7001
//! MEDIATOR_ENV=test mhfr-mediator serve
//!
//! # Print the resolved settings
//! mhfr-mediator check-config --config-dir /etc/mhfr-mediator
//! ```

use clap::{Args, Parser, Subcommand};
use mhfr_mediator::{BoundMediator, Environment, Settings, MEDIATOR_VERSION};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mhfr-mediator")]
#[command(about = "OpenHIM mediator for MHFR facility records")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConfigArgs {
    /// Environment name; `test` selects test.json
    #[arg(long = "env", env = "MEDIATOR_ENV", default_value = "default")]
    environment: String,

    /// Directory holding the config and mediator descriptor files
    #[arg(long, env = "MEDIATOR_CONFIG_DIR", default_value = "config")]
    config_dir: PathBuf,

    /// Override the facilities API URL
    #[arg(long, env = "MHFR_FACILITIES_URL")]
    facilities_url: Option<String>,
}

impl ConfigArgs {
    fn load(&self) -> anyhow::Result<Settings> {
        let environment = Environment::from_name(&self.environment);
        let mut settings = Settings::load(&self.config_dir, environment)?;
        if let Some(url) = &self.facilities_url {
            settings = settings.with_facilities_url(url.clone());
        }
        Ok(settings)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the mediator
    Serve {
        #[command(flatten)]
        config: ConfigArgs,

        /// Override the listening port
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
    },

    /// Load the configuration and print the resolved settings
    CheckConfig {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

fn init_tracing() {
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, port, host } => {
            let mut settings = config.load()?.with_host(host);
            if let Some(port) = port {
                settings = settings.with_port(port);
            }

            tracing::info!(
                urn = %settings.mediator.urn,
                version = MEDIATOR_VERSION,
                environment = settings.environment.as_str(),
                register = settings.api.register,
                "Starting MHFR facilities mediator"
            );

            let mediator = BoundMediator::bind(settings).await?;
            mediator.serve(shutdown_signal()).await?;
        }

        Commands::CheckConfig { config } => {
            let settings = config.load()?;

            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "environment": settings.environment.as_str(),
                    "config_dir": config.config_dir.display().to_string(),
                    "urn": settings.mediator.urn,
                    "port": settings.port,
                    "register": settings.api.register,
                    "heartbeat": settings.api.heartbeat,
                    "hub_api_url": settings.api.api.as_ref().map(|a| a.api_url.clone()),
                    "facilities_url": settings.api.facilities.url,
                }))?
            );
        }
    }

    Ok(())
}
