use ordis::errors::{CodecError, ConfigError};
use rdkafka::{error::KafkaError, types::RDKafkaErrorCode};
use thiserror::Error;

/// 启动错误，进程无法继续运行
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Kafka错误：{0}")]
    Kafka(#[from] KafkaError),
    #[error("Redis错误：{0}")]
    Redis(#[from] redis::RedisError),
    #[error("Schema Registry错误：{0}")]
    Registry(#[from] reqwest::Error),
    #[error("创建主题'{topic}'失败：{code}")]
    Topic { topic: String, code: RDKafkaErrorCode },
    #[error(transparent)]
    Codec(#[from] CodecError),
}
