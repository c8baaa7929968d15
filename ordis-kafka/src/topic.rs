use crate::errors::LaunchError;
use ordis::config::ProducerConfig;
use rdkafka::{
    ClientConfig,
    admin::{AdminClient, AdminOptions, NewTopic, TopicReplication, TopicResult},
    client::DefaultClientContext,
    types::RDKafkaErrorCode,
};
use tracing::{info, instrument};

/// 确保订单主题存在，已存在视为成功
#[instrument(name = "ensure_topic", skip_all, fields(topic = %cfg.topic))]
pub async fn ensure_topic(cfg: &ProducerConfig) -> Result<(), LaunchError> {
    let admin: AdminClient<DefaultClientContext> = ClientConfig::new()
        .set("bootstrap.servers", &cfg.bootstrap)
        .create()?;
    let opts = AdminOptions::new().operation_timeout(Some(cfg.timeout()));
    let topic = NewTopic::new(
        &cfg.topic,
        cfg.partitions,
        TopicReplication::Fixed(cfg.replicas),
    );
    for result in admin.create_topics(&[topic], &opts).await? {
        settle(result)?;
    }
    Ok(())
}

fn settle(result: TopicResult) -> Result<(), LaunchError> {
    match result {
        Ok(topic) => {
            info!("创建主题 {topic}");
            Ok(())
        }
        Err((topic, RDKafkaErrorCode::TopicAlreadyExists)) => {
            info!("主题 {topic} 已存在");
            Ok(())
        }
        Err((topic, code)) => Err(LaunchError::Topic { topic, code }),
    }
}
