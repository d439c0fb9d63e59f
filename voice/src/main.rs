use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use voice::inference::{InferenceBackend, SimulatedBackend};
use voice::server::run_server;
use voice::{stt, tts};

#[derive(Debug, Parser)]
#[command(name = "voice", about = "Wyoming-protocol STT/TTS servers")]
struct Cli {
    #[arg(long, default_value = "0.0.0.0:10300", env = "NIGHTWATCH_VOICE_STT_ADDR")]
    stt_addr: String,

    #[arg(long, default_value = "0.0.0.0:10301", env = "NIGHTWATCH_VOICE_TTS_ADDR")]
    tts_addr: String,

    #[arg(long, default_value = "info", env = "NIGHTWATCH_LOG_LEVEL")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let env_filter = EnvFilter::try_new(format!("voice={0}", cli.log_level)).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cancel = CancellationToken::new();
    let backend: Arc<dyn InferenceBackend> = Arc::new(SimulatedBackend::default());

    let stt_cancel = cancel.child_token();
    let stt_backend = backend.clone();
    let stt_addr = cli.stt_addr.clone();
    let stt_task = tokio::spawn(async move {
        run_server(&stt_addr, "stt", stt_cancel, move |stream, conn_cancel| {
            let backend = stt_backend.clone();
            async move { stt::handle_connection(stream, conn_cancel, backend).await }
        })
        .await
    });

    let tts_cancel = cancel.child_token();
    let tts_backend = backend.clone();
    let tts_addr = cli.tts_addr.clone();
    let tts_task = tokio::spawn(async move {
        run_server(&tts_addr, "tts", tts_cancel, move |stream, conn_cancel| {
            let backend = tts_backend.clone();
            async move { tts::handle_connection(stream, conn_cancel, backend).await }
        })
        .await
    });

    tokio::signal::ctrl_c().await?;
    info!("interrupt received, shutting down voice servers");
    cancel.cancel();

    let _ = stt_task.await;
    let _ = tts_task.await;
    Ok(())
}
