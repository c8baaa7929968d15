mod common;

use crate::common::{consumer_config, producer_config, unique};
use ordis::{
    commit::Commit,
    controller::{Controller, Step},
    dedup::Outcome,
    publisher::{Published, Publisher},
};
use ordis_kafka::{
    FramedCodec, KafkaSource, KafkaSubmitter, ORDER_SCHEMA, RedisGate, Registry, ensure_topic,
    sender::demo_order, subject,
};

#[tokio::test]
#[ignore = "需要可用的 Kafka、Redis 与 Schema Registry"]
async fn ten_orders_are_acknowledged_once() {
    let topic = unique("orders");
    let mut pcfg = producer_config();
    pcfg.topic = topic.clone();
    ensure_topic(&pcfg).await.unwrap();
    ensure_topic(&pcfg).await.unwrap();

    let registry = Registry::new(&pcfg.registry).unwrap();
    let id = registry.register(&subject(&topic), ORDER_SCHEMA).await.unwrap();
    let (submitter, rx) = KafkaSubmitter::new(&pcfg).unwrap();
    let publisher = Publisher::new(
        submitter,
        FramedCodec::new(Some(id)),
        &topic,
        pcfg.retries,
        pcfg.backoff(),
        rx,
    );
    let run = unique("run");
    for i in 0..10 {
        let mut order = demo_order(i);
        order.order_id = format!("{run}-{i}");
        let published = publisher.publish(&order).await.unwrap();
        assert_eq!(published, Published::Submitted { attempts: 1 });
    }
    let report = publisher.close().await;
    assert_eq!(report.delivered, 10);

    let mut ccfg = consumer_config();
    ccfg.topics = vec![topic.clone()];
    ccfg.group = unique("group");
    ccfg.timeout = Some(10_000);
    let gate = RedisGate::connect(&ccfg.redis).await.unwrap();
    let source = KafkaSource::new(&ccfg).unwrap();
    let mut controller = Controller::new(source, gate, FramedCodec::new(Some(id)), &ccfg);

    let mut acknowledged = 0;
    let mut inserted = 0;
    let mut processed = 0;
    while processed < 10 {
        if let Step::Processed { outcome, commit } = controller.tick().await {
            processed += 1;
            if outcome == Some(Outcome::Inserted) {
                inserted += 1;
            }
            if matches!(commit, Some(Commit::Acknowledged(_))) {
                acknowledged += 1;
            }
        }
    }
    assert_eq!(inserted, 10);
    assert_eq!(acknowledged, 1);
    assert_eq!(controller.coordinator().unwrap().count(), 0);
}
