//! # **ordis** 的 Kafka 实现
//!
//! 消息来源与确认基于 rdkafka 的 `StreamConsumer`，发送队列基于 `ThreadedProducer`，
//! 幂等存储基于 Redis `SET NX EX`，编解码采用 Schema Registry 的 JSON 消息框架。

pub(crate) mod consumer;
pub(crate) mod producer;
pub(crate) mod schema;
pub(crate) mod store;
pub(crate) mod topic;

pub mod errors;
pub mod sender;
pub mod subscriber;

pub use consumer::KafkaSource;
pub use producer::{DeliveryContext, KafkaSubmitter};
pub use schema::{FramedCodec, ORDER_SCHEMA, Registry, subject};
pub use store::RedisGate;
pub use topic::ensure_topic;
