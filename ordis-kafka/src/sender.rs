//! 订单发送进程

use crate::{
    errors::LaunchError,
    producer::KafkaSubmitter,
    schema::{FramedCodec, ORDER_SCHEMA, Registry, subject},
    topic::ensure_topic,
};
use ordis::{
    Item, Order,
    config::ProducerConfig,
    publisher::{Published, Publisher},
    tracker::DeliveryReport,
};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// 第 `i` 条演示订单
pub fn demo_order(i: usize) -> Order {
    Order {
        order_id: i.to_string(),
        user_id: 1,
        items: vec![
            Item {
                product_id: 444,
                quantity: 1,
                price: 300.0,
            },
            Item {
                product_id: 123,
                quantity: 2,
                price: 500.0,
            },
        ],
        total_price: 800.0,
        ..Default::default()
    }
}

/// 启动生产者，发送全部记录并等待投递确认
///
/// 返回的投递统计包含无法编码的记录。
#[instrument(name = "launch_sender", skip_all, fields(topic = %cfg.topic))]
pub async fn launch(cfg: ProducerConfig) -> Result<DeliveryReport, LaunchError> {
    ensure_topic(&cfg).await?;
    let registry = Registry::new(&cfg.registry)?;
    let schema_id = registry
        .register(&subject(&cfg.topic), ORDER_SCHEMA)
        .await?;
    let (submitter, rx) = KafkaSubmitter::new(&cfg)?;
    let publisher = Publisher::new(
        submitter,
        FramedCodec::new(Some(schema_id)),
        &cfg.topic,
        cfg.retries,
        cfg.backoff(),
        rx,
    );

    let mut unencodable = 0;
    for i in 0..cfg.records {
        info!("发送第 {i} 条订单");
        match publisher.publish(&demo_order(i)).await {
            Ok(Published::Submitted { .. }) => (),
            Ok(Published::Exhausted { attempts }) => {
                warn!("第 {i} 条订单提交 {attempts} 次均失败")
            }
            Err(e) => {
                error!("第 {i} 条订单{e}");
                unencodable += 1;
            }
        }
        if i + 1 < cfg.records {
            sleep(cfg.interval()).await;
        }
    }
    info!("全部订单已提交");

    let mut report = publisher.close().await;
    report.failed += unencodable;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_order_carries_fixed_items() {
        let order = demo_order(42);
        assert_eq!(order.order_id, "42");
        assert_eq!(order.user_id, 1);
        assert_eq!(order.offset, 0);
        let items: Vec<(i64, i64, f64)> = order
            .items
            .iter()
            .map(|item| (item.product_id, item.quantity, item.price))
            .collect();
        assert_eq!(items, vec![(444, 1, 300.0), (123, 2, 500.0)]);
        assert_eq!(order.total_price, 800.0);
    }
}
