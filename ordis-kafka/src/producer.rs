use ordis::{
    Envelope, config::ProducerConfig, domain::Submit, errors::SendRejected,
    tracker::Confirmation,
};
use rdkafka::{
    ClientConfig, ClientContext, Message,
    error::KafkaError,
    message::{Header, OwnedHeaders},
    producer::{BaseRecord, DeliveryResult, Producer, ProducerContext, ThreadedProducer},
};
use tokio::{sync::mpsc, time::Duration};
use tracing::{error, info};

/// 投递回调上下文，将代理的投递结果转发到确认通道
pub struct DeliveryContext {
    tx: mpsc::UnboundedSender<Confirmation>,
}

impl ClientContext for DeliveryContext {}

impl ProducerContext for DeliveryContext {
    type DeliveryOpaque = Box<String>;

    fn delivery(&self, result: &DeliveryResult<'_>, id: Self::DeliveryOpaque) {
        let confirmation = match result {
            Ok(msg) => Confirmation::Delivered {
                id: *id,
                partition: msg.partition(),
                offset: msg.offset(),
            },
            Err((e, _)) => Confirmation::Failed {
                id: *id,
                error: e.to_string(),
            },
        };
        if let Err(e) = self.tx.send(confirmation) {
            error!("转发投递确认失败：{e}");
        }
    }
}

/// Kafka 发送队列
///
/// 析构时关闭生产者，投递回调上下文随之释放，确认通道关闭。
pub struct KafkaSubmitter {
    producer: ThreadedProducer<DeliveryContext>,
}

impl KafkaSubmitter {
    /// 创建生产者，返回发送队列及其投递确认通道
    pub fn new(
        cfg: &ProducerConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Confirmation>), KafkaError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut config = ClientConfig::new();
        for (key, value) in &cfg.pc {
            config.set(key, value);
        }
        config.set("bootstrap.servers", &cfg.bootstrap);
        let producer: ThreadedProducer<DeliveryContext> =
            config.create_with_context(DeliveryContext { tx })?;
        info!("成功创建 {} 订单生产者", cfg.topic);
        Ok((Self { producer }, rx))
    }
}

impl Submit for KafkaSubmitter {
    fn submit(&self, envelope: &Envelope) -> Result<(), SendRejected> {
        let mut headers = OwnedHeaders::new();
        for (key, value) in &envelope.headers {
            headers = headers.insert(Header {
                key,
                value: Some(value.as_slice()),
            });
        }
        let record: BaseRecord<'_, String, Vec<u8>, Box<String>> =
            BaseRecord::with_opaque_to(&envelope.topic, Box::new(envelope.key.clone()))
                .key(&envelope.key)
                .payload(&envelope.payload)
                .headers(headers);
        self.producer
            .send(record)
            .map_err(|(e, _)| SendRejected(e.to_string()))
    }
}

impl Drop for KafkaSubmitter {
    fn drop(&mut self) {
        if let Err(e) = self.producer.flush(Duration::from_secs(30)) {
            error!("关闭生产者时刷新发送队列失败：{e}");
        }
    }
}
