//! 批量确认协调器

use crate::{Position, domain::Acknowledge};
use tracing::{debug, info, warn};

/// 一次计数后的确认结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    /// 未达阈值
    Pending,
    /// 已确认到该位置
    Acknowledged(Position),
    /// 确认失败，下次计数时重试
    Failed,
}

/// 批量确认协调器
///
/// 每处理一条记录计数一次，计数达到阈值时确认最近一条记录的位置。
/// 只有确认成功才清零计数，失败时保留计数以便下一条记录触发重试。
#[derive(Debug)]
pub struct CommitCoordinator {
    count: usize,
    threshold: usize,
}

impl CommitCoordinator {
    /// 构造协调器
    pub fn new(threshold: usize) -> Self {
        Self {
            count: 0,
            threshold: threshold.max(1),
        }
    }

    /// 自上次确认以来处理的记录数
    pub fn count(&self) -> usize {
        self.count
    }

    /// 确认阈值
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// 记录一条已处理记录，必要时确认其位置
    pub fn record_processed<A>(&mut self, position: &Position, ack: &A) -> Commit
    where
        A: Acknowledge,
    {
        self.count += 1;
        if self.count < self.threshold {
            debug!("已处理 {} 条记录，未达确认阈值", self.count);
            return Commit::Pending;
        }

        match ack.acknowledge(position) {
            Ok(()) => {
                info!("触及确认阈值，确认 {} 条记录至 {position}", self.count);
                self.count = 0;
                Commit::Acknowledged(position.clone())
            }
            Err(e) => {
                warn!("{e}，保留计数 {} 待下次重试", self.count);
                Commit::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingAck, position};

    #[test]
    fn acknowledges_last_position_at_threshold() {
        let ack = RecordingAck::new();
        let mut coordinator = CommitCoordinator::new(10);

        for offset in 0..9 {
            assert_eq!(
                coordinator.record_processed(&position(offset), &ack),
                Commit::Pending
            );
        }
        assert!(ack.attempts().is_empty());

        assert_eq!(
            coordinator.record_processed(&position(9), &ack),
            Commit::Acknowledged(position(9))
        );
        assert_eq!(ack.attempts(), vec![position(9)]);
        assert_eq!(coordinator.count(), 0);

        for offset in 10..19 {
            coordinator.record_processed(&position(offset), &ack);
        }
        assert_eq!(ack.attempts().len(), 1);
        coordinator.record_processed(&position(19), &ack);
        assert_eq!(ack.attempts(), vec![position(9), position(19)]);
    }

    #[test]
    fn failed_acknowledgment_retries_on_next_call() {
        let ack = RecordingAck::new();
        let mut coordinator = CommitCoordinator::new(10);
        for offset in 0..9 {
            coordinator.record_processed(&position(offset), &ack);
        }

        ack.fail_next(1);
        assert_eq!(
            coordinator.record_processed(&position(9), &ack),
            Commit::Failed
        );
        assert_eq!(coordinator.count(), 10);

        assert_eq!(
            coordinator.record_processed(&position(10), &ack),
            Commit::Acknowledged(position(10))
        );
        assert_eq!(ack.attempts(), vec![position(9), position(10)]);
        assert_eq!(ack.committed(), vec![position(10)]);
        assert_eq!(coordinator.count(), 0);
    }

    #[test]
    fn threshold_of_one_acknowledges_every_record() {
        let ack = RecordingAck::new();
        let mut coordinator = CommitCoordinator::new(1);
        for offset in 0..3 {
            assert_eq!(
                coordinator.record_processed(&position(offset), &ack),
                Commit::Acknowledged(position(offset))
            );
        }
        assert_eq!(ack.committed().len(), 3);
    }
}
