//! 内部集成测试

mod pipeline_test;

use crate::{
    Mode,
    config::ConsumerConfig,
    controller::{Controller, Step},
    dedup::Outcome,
    publisher::Publisher,
    testing::{JsonCodec, Journal, Loopback, MemoryGate, order},
};
use std::sync::LazyLock;
use tokio::time::Duration;
use tracing::{Level, info};
use tracing_subscriber::fmt;

static INTERNAL_SETUP: LazyLock<()> = LazyLock::new(|| {
    let _ = fmt()
        .with_test_writer()
        .with_max_level(Level::DEBUG)
        .try_init();
    info!("启用 {} 测试日志输出", Level::DEBUG);
});

fn consumer_config(mode: Mode) -> ConsumerConfig {
    ConsumerConfig {
        bootstrap: "localhost:9092".to_string(),
        redis: "localhost:6379".to_string(),
        group: "orders".to_string(),
        topics: vec!["orders".to_string()],
        auto_commit: mode == Mode::Immediate,
        ..Default::default()
    }
}

async fn publish_all(ids: &[&str]) -> Journal {
    let (loopback, rx) = Loopback::new();
    let journal = loopback.journal();
    let publisher = Publisher::new(loopback, JsonCodec, "orders", 5, Duration::from_secs(5), rx);
    for id in ids {
        publisher.publish(&order(id)).await.unwrap();
    }
    let report = publisher.close().await;
    assert_eq!(report.delivered, ids.len());
    assert!(report.is_success());
    journal
}
