use super::*;
use crate::{commit::Commit, testing::position};

#[tokio::test]
async fn ten_records_one_acknowledgment() {
    LazyLock::force(&INTERNAL_SETUP);
    let ids: Vec<String> = (0..10).map(|i| i.to_string()).collect();
    let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
    let journal = publish_all(&ids).await;

    let gate = MemoryGate::new();
    let cfg = consumer_config(Mode::Batched);
    let mut controller = Controller::new(journal.replay(), gate.clone(), JsonCodec, &cfg);

    for _ in 0..9 {
        controller.tick().await;
    }
    assert!(controller.source().acks().attempts().is_empty());

    let step = controller.tick().await;
    assert_eq!(
        step,
        Step::Processed {
            outcome: Some(Outcome::Inserted),
            commit: Some(Commit::Acknowledged(position(9)))
        }
    );
    assert_eq!(controller.source().acks().attempts(), vec![position(9)]);
    assert_eq!(controller.source().remaining(), 0);

    let mut expected: Vec<String> = (0..10).map(|i| format!("multi-{i}")).collect();
    expected.sort();
    assert_eq!(gate.keys(), expected);
    assert_eq!(gate.writes(), 10);
}

#[tokio::test]
async fn same_id_twice_is_duplicate() {
    LazyLock::force(&INTERNAL_SETUP);
    let journal = publish_all(&["1", "1"]).await;

    let gate = MemoryGate::new();
    let cfg = consumer_config(Mode::Batched);
    let mut controller = Controller::new(journal.replay(), gate.clone(), JsonCodec, &cfg);

    assert!(matches!(
        controller.tick().await,
        Step::Processed {
            outcome: Some(Outcome::Inserted),
            ..
        }
    ));
    assert!(matches!(
        controller.tick().await,
        Step::Processed {
            outcome: Some(Outcome::Duplicate),
            ..
        }
    ));
    assert_eq!(gate.writes(), 1);
    assert_eq!(gate.keys(), vec!["multi-1".to_string()]);
}

#[tokio::test]
async fn instances_share_the_gate() {
    LazyLock::force(&INTERNAL_SETUP);
    let journal = publish_all(&["7"]).await;

    let gate = MemoryGate::new();
    let cfg = consumer_config(Mode::Immediate);
    let mut first = Controller::new(journal.replay(), gate.clone(), JsonCodec, &cfg);
    let mut second = Controller::new(journal.replay(), gate.clone(), JsonCodec, &cfg);

    let (a, b) = tokio::join!(first.tick(), second.tick());
    let outcomes: Vec<Option<Outcome>> = [a, b]
        .into_iter()
        .map(|step| match step {
            Step::Processed { outcome, .. } => outcome,
            _ => None,
        })
        .collect();
    assert!(outcomes.contains(&Some(Outcome::Inserted)));
    assert!(outcomes.contains(&Some(Outcome::Duplicate)));
    assert_eq!(gate.keys(), vec!["single-7".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn readmitted_after_ttl_expiry() {
    LazyLock::force(&INTERNAL_SETUP);
    let journal = publish_all(&["3", "3", "3"]).await;

    let gate = MemoryGate::new();
    let cfg = consumer_config(Mode::Batched);
    let mut controller = Controller::new(journal.replay(), gate.clone(), JsonCodec, &cfg);

    controller.tick().await;
    tokio::time::advance(cfg.ttl() - Duration::from_secs(1)).await;
    assert!(matches!(
        controller.tick().await,
        Step::Processed {
            outcome: Some(Outcome::Duplicate),
            ..
        }
    ));

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(matches!(
        controller.tick().await,
        Step::Processed {
            outcome: Some(Outcome::Inserted),
            ..
        }
    ));
    assert_eq!(gate.writes(), 2);
    let (_, ttl) = gate.entry("multi-3").unwrap();
    assert_eq!(ttl, Duration::from_secs(24 * 60 * 60));
}

#[test]
fn mode_follows_auto_commit_flag() {
    assert_eq!(Mode::from_auto_commit(true), Mode::Immediate);
    assert_eq!(Mode::from_auto_commit(false), Mode::Batched);
    assert_eq!(consumer_config(Mode::Immediate).mode().prefix(), "single");
    assert_eq!(consumer_config(Mode::Batched).mode().prefix(), "multi");
}
