//! # **ordis** 配置

use crate::{Mode, errors::ConfigError};
use config::{Config, Environment, File};
use serde::{Deserialize, de::DeserializeOwned};
use std::{collections::HashMap, path::PathBuf, time::Duration};
use tracing::debug;
use validator::Validate;

/// 构建分层配置：默认文件、环境文件、`ORDIS_` 前缀环境变量
///
/// 配置目录取 `ORDIS_CONFIG_ROOT`，缺省为 `<crate_dir>/config`；
/// 环境名取 `ORDIS_ENV`，缺省为 `dev`。
pub fn build_config(crate_dir: PathBuf) -> Result<Config, ConfigError> {
    let config_root = std::env::var("ORDIS_CONFIG_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| crate_dir.join("config"));
    let env = std::env::var("ORDIS_ENV").unwrap_or_else(|_| "dev".to_string());
    debug!("从{}加载{env}环境配置", config_root.display());
    let config = Config::builder()
        .add_source(File::from(config_root.join("default")).required(false))
        .add_source(File::from(config_root.join(env)).required(false))
        .add_source(
            Environment::with_prefix("ORDIS")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("topics")
                .try_parsing(true),
        )
        .build()?;
    Ok(config)
}

fn load<T>(config: &Config, section: &str) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Validate,
{
    let cfg = config.clone().try_deserialize::<T>()?;
    cfg.validate().map_err(|e| ConfigError::Validation {
        section: section.to_string(),
        message: e.to_string(),
    })?;
    Ok(cfg)
}

/// 反序列化失败时的处理策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodePolicy {
    /// 跳过去重，仍计入消费进度
    #[default]
    Skip,
    /// 以零值记录继续处理
    Zero,
}

/// 消费者配置
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct ConsumerConfig {
    /// Kafka 地址
    #[validate(length(min = 1))]
    pub bootstrap: String,
    /// Redis 地址
    #[validate(length(min = 1))]
    pub redis: String,
    /// 消费组
    #[validate(length(min = 1))]
    pub group: String,
    /// 订阅主题
    #[validate(length(min = 1))]
    pub topics: Vec<String>,
    /// Schema Registry 地址
    pub registry: Option<String>,
    /// 是否由代理客户端自动确认
    pub auto_commit: bool,
    /// 批量确认阈值
    #[validate(range(min = 1))]
    pub threshold: usize,
    /// 去重记录保留秒数
    #[validate(range(min = 1))]
    pub ttl: u64,
    /// 拉取超时毫秒数
    pub timeout: Option<u64>,
    /// 连续存储错误升级阈值
    #[validate(range(min = 1))]
    pub escalate: usize,
    /// 反序列化失败策略
    pub decode: DecodePolicy,
    /// 启动延迟秒数
    pub delay: u64,
    /// 额外的消费者客户端配置
    pub cc: HashMap<String, String>,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            bootstrap: String::new(),
            redis: String::new(),
            group: String::new(),
            topics: Vec::new(),
            registry: None,
            auto_commit: false,
            threshold: 10,
            ttl: 24 * 60 * 60,
            timeout: None,
            escalate: 5,
            decode: DecodePolicy::default(),
            delay: 0,
            cc: HashMap::new(),
        }
    }
}

impl ConsumerConfig {
    /// 加载并验证消费者配置
    pub fn load(config: &Config) -> Result<Self, ConfigError> {
        load(config, "consumer")
    }

    /// 消费模式
    pub fn mode(&self) -> Mode {
        Mode::from_auto_commit(self.auto_commit)
    }

    /// 拉取超时，未配置时即时确认模式取 100 毫秒，批量确认模式取 5 秒
    pub fn poll_timeout(&self) -> Duration {
        match (self.timeout, self.mode()) {
            (Some(ms), _) => Duration::from_millis(ms),
            (None, Mode::Immediate) => Duration::from_millis(100),
            (None, Mode::Batched) => Duration::from_secs(5),
        }
    }

    /// 去重记录保留时长
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl)
    }
}

/// 生产者配置
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct ProducerConfig {
    /// Kafka 地址
    #[validate(length(min = 1))]
    pub bootstrap: String,
    /// Schema Registry 地址
    #[validate(length(min = 1))]
    pub registry: String,
    /// 目标主题
    #[validate(length(min = 1))]
    pub topic: String,
    /// 主题分区数
    #[validate(range(min = 1))]
    pub partitions: i32,
    /// 主题副本数
    #[validate(range(min = 1))]
    pub replicas: i32,
    /// 发送记录数
    pub records: usize,
    /// 记录间隔毫秒数
    pub interval: u64,
    /// 单条记录最多提交次数
    #[validate(range(min = 1))]
    pub retries: usize,
    /// 提交重试间隔毫秒数
    pub backoff: u64,
    /// 管理操作超时秒数
    #[validate(range(min = 1))]
    pub timeout: u64,
    /// 额外的生产者客户端配置
    pub pc: HashMap<String, String>,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            bootstrap: String::new(),
            registry: String::new(),
            topic: String::new(),
            partitions: 5,
            replicas: 3,
            records: 100,
            interval: 5000,
            retries: 5,
            backoff: 5000,
            timeout: 60,
            pc: HashMap::new(),
        }
    }
}

impl ProducerConfig {
    /// 加载并验证生产者配置
    pub fn load(config: &Config) -> Result<Self, ConfigError> {
        load(config, "producer")
    }

    /// 记录间隔
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval)
    }

    /// 提交重试间隔
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff)
    }

    /// 管理操作超时
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(s: &str) -> Config {
        Config::builder()
            .add_source(File::from_str(s, FileFormat::Toml))
            .build()
            .unwrap()
    }

    #[test]
    fn consumer_defaults() {
        let cfg = ConsumerConfig::load(&from_toml(
            r#"
            bootstrap = "localhost:9092"
            redis = "localhost:6379"
            group = "orders"
            topics = ["orders"]
            "#,
        ))
        .unwrap();
        assert_eq!(cfg.mode(), Mode::Batched);
        assert_eq!(cfg.threshold, 10);
        assert_eq!(cfg.ttl(), Duration::from_secs(86400));
        assert_eq!(cfg.escalate, 5);
        assert_eq!(cfg.decode, DecodePolicy::Skip);
        assert_eq!(cfg.poll_timeout(), Duration::from_secs(5));
        assert!(cfg.registry.is_none());
    }

    #[test]
    fn consumer_immediate_mode() {
        let cfg = ConsumerConfig::load(&from_toml(
            r#"
            bootstrap = "localhost:9092"
            redis = "localhost:6379"
            group = "orders"
            topics = ["a", "b"]
            auto_commit = true
            decode = "zero"
            [cc]
            "session.timeout.ms" = "6000"
            "#,
        ))
        .unwrap();
        assert_eq!(cfg.mode(), Mode::Immediate);
        assert_eq!(cfg.poll_timeout(), Duration::from_millis(100));
        assert_eq!(cfg.decode, DecodePolicy::Zero);
        assert_eq!(cfg.topics, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(cfg.cc.get("session.timeout.ms").unwrap(), "6000");
    }

    #[test]
    fn consumer_missing_address() {
        let result = ConsumerConfig::load(&from_toml(
            r#"
            redis = "localhost:6379"
            group = "orders"
            topics = ["orders"]
            "#,
        ));
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn consumer_zero_threshold() {
        let result = ConsumerConfig::load(&from_toml(
            r#"
            bootstrap = "localhost:9092"
            redis = "localhost:6379"
            group = "orders"
            topics = ["orders"]
            threshold = 0
            "#,
        ));
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn producer_defaults() {
        let cfg = ProducerConfig::load(&from_toml(
            r#"
            bootstrap = "localhost:9092"
            registry = "http://localhost:8081"
            topic = "orders"
            "#,
        ))
        .unwrap();
        assert_eq!(cfg.partitions, 5);
        assert_eq!(cfg.replicas, 3);
        assert_eq!(cfg.records, 100);
        assert_eq!(cfg.retries, 5);
        assert_eq!(cfg.backoff(), Duration::from_secs(5));
        assert_eq!(cfg.interval(), Duration::from_secs(5));
        assert_eq!(cfg.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn producer_missing_topic() {
        let result = ProducerConfig::load(&from_toml(
            r#"
            bootstrap = "localhost:9092"
            registry = "http://localhost:8081"
            "#,
        ));
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }
}
