//! 订单消费进程

use crate::{
    consumer::KafkaSource,
    errors::LaunchError,
    schema::{FramedCodec, Registry, subject},
    store::RedisGate,
};
use ordis::{config::ConsumerConfig, controller::Controller};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::time::{Duration, sleep};
use tracing::{info, instrument, warn};

/// 启动消费者，运行至收到关闭信号
///
/// 依次连接 Redis、查询 schema、订阅主题，任一失败即返回启动错误。
#[instrument(name = "launch_subscriber", skip_all, fields(group = %cfg.group))]
pub async fn launch(cfg: ConsumerConfig) -> Result<(), LaunchError> {
    if cfg.delay > 0 {
        info!("等待 {} 秒后启动", cfg.delay);
        sleep(Duration::from_secs(cfg.delay)).await;
    }
    info!(
        "Kafka {}，Redis {}，主题 {:?}，Schema Registry {:?}，{}模式",
        cfg.bootstrap,
        cfg.redis,
        cfg.topics,
        cfg.registry,
        cfg.mode()
    );

    let gate = RedisGate::connect(&cfg.redis).await?;
    let codec = FramedCodec::new(latest_schema(&cfg).await?);
    let source = KafkaSource::new(&cfg)?;

    let exit = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&exit);
    tokio::spawn(async move {
        ordis::shutdown_signal().await;
        flag.store(true, Ordering::SeqCst);
    });

    let mut controller = Controller::new(source, gate, codec, &cfg);
    controller.run(&exit).await;
    Ok(())
}

async fn latest_schema(cfg: &ConsumerConfig) -> Result<Option<u32>, LaunchError> {
    let (Some(url), Some(topic)) = (&cfg.registry, cfg.topics.first()) else {
        return Ok(None);
    };
    let registry = Registry::new(url)?;
    match registry.latest(&subject(topic)).await {
        Ok(id) => Ok(Some(id)),
        Err(e) => {
            warn!("查询主题 {topic} 的 schema 失败，不核对 schema Id：{e}");
            Ok(None)
        }
    }
}
