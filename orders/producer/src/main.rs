use ordis::config::{ProducerConfig, build_config};
use ordis_kafka::{errors::LaunchError, sender};
use std::{path::PathBuf, process::ExitCode};
use tracing::{error, info, warn};
use tracing_appender::non_blocking;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> ExitCode {
    let (non_blocking, _guard) = non_blocking(std::io::stdout());
    fmt()
        .with_writer(non_blocking)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .pretty()
        .init();

    if let Err(e) = dotenv::dotenv() {
        warn!("未加载 .env 文件：{e}");
    }

    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("生产者启动失败：{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<bool, LaunchError> {
    let config = build_config(PathBuf::from(env!("CARGO_MANIFEST_DIR")))?;
    let cfg = ProducerConfig::load(&config)?;
    let report = sender::launch(cfg).await?;
    info!("投递完成：成功 {}，失败 {}", report.delivered, report.failed);
    Ok(report.is_success())
}
