use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use nightwatch::config::Config;
use nightwatch::constants::exit_codes;
use nightwatch::orchestrator::Orchestrator;
use nightwatch::web::start_web_server;

#[derive(Debug, Parser)]
#[command(name = "nightwatch", about = "Autonomous observatory control daemon")]
struct Cli {
    #[arg(long, default_value = "nightwatch.toml", env = "NIGHTWATCH_CONFIG")]
    config: String,

    #[arg(long, default_value = "info", env = "NIGHTWATCH_LOG_LEVEL")]
    log_level: String,

    /// Validates configuration and builds the orchestrator without starting any services.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let env_filter = EnvFilter::try_new(format!("nightwatch={0},tower_http=warn,sqlx=warn", cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    info!(config = %cli.config, dry_run = cli.dry_run, "starting nightwatch");

    let config = match Config::load(&cli.config).await {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            return ExitCode::from(exit_codes::CONFIG_INVALID as u8);
        }
    };

    let orchestrator = match Orchestrator::build(&config).await {
        Ok(orchestrator) => Arc::new(orchestrator),
        Err(err) => {
            error!(error = %err, "failed to build orchestrator");
            return ExitCode::from(exit_codes::STARTUP_FAILED as u8);
        }
    };

    if cli.dry_run {
        info!("dry run: configuration and component wiring are valid, starting no services");
        return ExitCode::from(exit_codes::OK as u8);
    }

    if let Err(err) = orchestrator.start().await {
        error!(error = %err, "failed to start orchestrator");
        return ExitCode::from(exit_codes::STARTUP_FAILED as u8);
    }

    let web_host = config.web.host.clone();
    let web_port = config.web.port;
    let web_orchestrator = orchestrator.clone();
    tokio::spawn(async move {
        if let Err(err) = start_web_server(web_orchestrator, &web_host, web_port).await {
            error!(error = %err, "web status API stopped");
        }
    });

    let interrupted = tokio::signal::ctrl_c().await.is_ok();
    if interrupted {
        info!("interrupt received, shutting down safely");
    }
    orchestrator.shutdown(true).await;

    if interrupted {
        ExitCode::from(exit_codes::INTERRUPTED as u8)
    } else {
        ExitCode::from(exit_codes::OK as u8)
    }
}
