use ordis::{
    Inbound, Position,
    config::ConsumerConfig,
    domain::{Acknowledge, Polled, Source},
    errors::{AckError, BrokerError},
};
use rdkafka::{
    ClientConfig, Message, Offset, TopicPartitionList,
    consumer::{CommitMode, Consumer, StreamConsumer},
    error::KafkaError,
    message::{BorrowedMessage, Headers},
};
use tokio::time::Duration;
use tracing::{debug, info};

/// Kafka 消息来源
///
/// 每次拉取至多等待一个拉取超时。确认时同步提交该记录所在主题分区的下一偏移量。
pub struct KafkaSource {
    consumer: StreamConsumer,
    timeout: Duration,
}

impl KafkaSource {
    /// 按消费者配置创建消费者并订阅主题
    pub fn new(cfg: &ConsumerConfig) -> Result<Self, KafkaError> {
        let mut config = ClientConfig::new();
        for (key, value) in &cfg.cc {
            config.set(key, value);
        }
        config
            .set("bootstrap.servers", &cfg.bootstrap)
            .set("group.id", &cfg.group)
            .set("session.timeout.ms", "6000")
            .set("auto.offset.reset", "earliest")
            .set("enable.auto.commit", cfg.auto_commit.to_string());
        let consumer: StreamConsumer = config.create()?;

        let topics: Vec<&str> = cfg.topics.iter().map(String::as_str).collect();
        consumer.subscribe(&topics)?;
        info!("成功订阅主题 {topics:?}，消费组 {}", cfg.group);

        Ok(Self {
            consumer,
            timeout: cfg.poll_timeout(),
        })
    }
}

fn inbound(msg: &BorrowedMessage<'_>) -> Inbound {
    let headers = msg
        .headers()
        .map(|hs| {
            hs.iter()
                .map(|h| (h.key.to_string(), h.value.map(<[u8]>::to_vec).unwrap_or_default()))
                .collect()
        })
        .unwrap_or_default();
    Inbound {
        payload: msg.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        headers,
        position: Position {
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
        },
    }
}

impl Source for KafkaSource {
    async fn poll(&mut self) -> Polled {
        match tokio::time::timeout(self.timeout, self.consumer.recv()).await {
            Ok(Ok(msg)) => Polled::Record(inbound(&msg)),
            Ok(Err(e)) => Polled::BrokerError(BrokerError(e.to_string())),
            Err(_) => Polled::Empty,
        }
    }
}

fn next_offset(position: &Position) -> Result<TopicPartitionList, KafkaError> {
    let mut tpl = TopicPartitionList::new();
    tpl.add_partition_offset(
        &position.topic,
        position.partition,
        Offset::Offset(position.offset + 1),
    )?;
    Ok(tpl)
}

impl Acknowledge for KafkaSource {
    fn acknowledge(&self, position: &Position) -> Result<(), AckError> {
        let tpl = next_offset(position).map_err(|e| AckError(e.to_string()))?;
        debug!(
            "提交主题分区 {}|{} 偏移量 {}",
            position.topic,
            position.partition,
            position.offset + 1
        );
        // 同步提交：确认成功后才清零计数，每批阻塞一次
        self.consumer
            .commit(&tpl, CommitMode::Sync)
            .map_err(|e| AckError(e.to_string()))
    }
}
