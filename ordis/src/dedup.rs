//! 去重处理器

use crate::{Mode, Order, domain::Gate};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// 去重结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 保留期内首次出现，准入
    Inserted,
    /// 键已存在，不得重复施加下游效果
    Duplicate,
    /// 去重检查未完成，准入状态未知
    StoreError,
}

/// 计算去重键
#[inline]
pub fn dedup_key(mode: Mode, order_id: &str) -> String {
    let prefix = mode.prefix();
    let mut key = String::with_capacity(prefix.len() + order_id.len() + 1);
    key.push_str(prefix);
    key.push('-');
    key.push_str(order_id);
    key
}

/// 去重处理器
pub struct Processor<G>
where
    G: Gate,
{
    gate: G,
    mode: Mode,
    ttl: Duration,
    escalate: usize,
    failures: usize,
    escalations: usize,
}

impl<G> Processor<G>
where
    G: Gate,
{
    /// 构造去重处理器，连续 `escalate` 次存储错误时升级告警
    pub fn new(gate: G, mode: Mode, ttl: Duration, escalate: usize) -> Self {
        Self {
            gate,
            mode,
            ttl,
            escalate: escalate.max(1),
            failures: 0,
            escalations: 0,
        }
    }

    /// 当前连续存储错误次数
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// 累计升级告警次数
    pub fn escalations(&self) -> usize {
        self.escalations
    }

    /// 幂等存储
    pub fn gate(&self) -> &G {
        &self.gate
    }

    /// 处理一条记录
    #[instrument(name = "dedup", skip_all, fields(order_id = %order.order_id))]
    pub async fn process(&mut self, order: &Order) -> Outcome {
        let key = dedup_key(self.mode, &order.order_id);
        let value = match serde_json::to_vec(order) {
            Ok(v) => v,
            Err(e) => {
                warn!("序列化订单失败：{e}");
                return self.failed();
            }
        };

        match self.gate.insert_if_absent(&key, &value, self.ttl).await {
            Ok(true) => {
                self.failures = 0;
                info!("准入新订单 {key}");
                Outcome::Inserted
            }
            Ok(false) => {
                self.failures = 0;
                debug!("订单 {key} 已存在，忽略重复记录");
                Outcome::Duplicate
            }
            Err(e) => {
                warn!("去重 {key} 失败：{e}");
                self.failed()
            }
        }
    }

    fn failed(&mut self) -> Outcome {
        self.failures += 1;
        if self.failures % self.escalate == 0 {
            self.escalations += 1;
            error!(
                failures = self.failures,
                "幂等存储连续 {} 次不可用，记录准入状态无法确认", self.failures
            );
        }
        Outcome::StoreError
    }
}
