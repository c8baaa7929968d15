#![allow(dead_code)]

use ordis::config::{ConsumerConfig, ProducerConfig, build_config};
use std::{path::PathBuf, sync::LazyLock};
use tracing::{Level, info};
use tracing_subscriber::fmt;
use uuid::Uuid;

pub(crate) static CFG: LazyLock<config::Config> = LazyLock::new(|| {
    let _ = fmt()
        .with_test_writer()
        .with_max_level(Level::DEBUG)
        .try_init();
    info!("启用 {} 测试日志输出", Level::DEBUG);
    build_config(PathBuf::from(env!("CARGO_MANIFEST_DIR"))).unwrap()
});

pub(crate) fn consumer_config() -> ConsumerConfig {
    ConsumerConfig::load(&CFG).unwrap()
}

pub(crate) fn producer_config() -> ProducerConfig {
    ProducerConfig::load(&CFG).unwrap()
}

pub(crate) fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}
