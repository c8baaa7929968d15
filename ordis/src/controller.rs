//! 消费控制器

use crate::{
    Inbound, Mode, Order,
    commit::{Commit, CommitCoordinator},
    config::{ConsumerConfig, DecodePolicy},
    dedup::{Outcome, Processor},
    domain::{Acknowledge, Codec, Gate, Polled, Source},
};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, instrument};

/// 一次迭代的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// 处理了一条记录；反序列化失败且跳过时 `outcome` 为空，即时确认模式下 `commit` 为空
    Processed {
        /// 去重结果
        outcome: Option<Outcome>,
        /// 批量确认结果
        commit: Option<Commit>,
    },
    /// 代理报告错误
    BrokerError,
    /// 拉取超时
    Idle,
}

/// 消费控制器
///
/// 启动时确定消费模式，运行期间不变。批量确认模式持有 [`CommitCoordinator`]。
pub struct Controller<S, G, C>
where
    S: Source + Acknowledge,
    G: Gate,
    C: Codec,
{
    source: S,
    codec: C,
    processor: Processor<G>,
    coordinator: Option<CommitCoordinator>,
    decode: DecodePolicy,
}

impl<S, G, C> Controller<S, G, C>
where
    S: Source + Acknowledge,
    G: Gate,
    C: Codec,
{
    /// 按消费者配置构造控制器
    pub fn new(source: S, gate: G, codec: C, cfg: &ConsumerConfig) -> Self {
        let mode = cfg.mode();
        let coordinator = match mode {
            Mode::Immediate => None,
            Mode::Batched => Some(CommitCoordinator::new(cfg.threshold)),
        };
        Self {
            source,
            codec,
            processor: Processor::new(gate, mode, cfg.ttl(), cfg.escalate),
            coordinator,
            decode: cfg.decode,
        }
    }

    /// 消费模式
    pub fn mode(&self) -> Mode {
        match self.coordinator {
            Some(_) => Mode::Batched,
            None => Mode::Immediate,
        }
    }

    /// 消息来源
    pub fn source(&self) -> &S {
        &self.source
    }

    /// 去重处理器
    pub fn processor(&self) -> &Processor<G> {
        &self.processor
    }

    /// 批量确认协调器，即时确认模式下为空
    pub fn coordinator(&self) -> Option<&CommitCoordinator> {
        self.coordinator.as_ref()
    }

    /// 循环消费直至退出标志置位，标志每次迭代检查一次
    #[instrument(name = "consume", skip_all, fields(mode = %self.mode()))]
    pub async fn run(&mut self, exit: &AtomicBool) {
        info!("开始消费");
        while !exit.load(Ordering::SeqCst) {
            self.tick().await;
        }
        info!("收到关闭信号，结束消费");
    }

    /// 执行一次迭代：至多拉取一条记录并完成处理
    ///
    /// 拉取超时不计数也不触发确认。
    pub async fn tick(&mut self) -> Step {
        match self.source.poll().await {
            Polled::Record(inbound) => self.handle(inbound).await,
            Polled::BrokerError(e) => {
                error!("{e}");
                Step::BrokerError
            }
            Polled::Empty => {
                debug!("拉取超时，未取到记录");
                Step::Idle
            }
        }
    }

    async fn handle(&mut self, inbound: Inbound) -> Step {
        let Inbound {
            payload,
            headers,
            position,
        } = inbound;
        debug!("原始消息 {position}：{:?}", String::from_utf8_lossy(&payload));
        if !headers.is_empty() {
            let keys: Vec<&str> = headers.iter().map(|(k, _)| k.as_str()).collect();
            debug!("消息头：{keys:?}");
        }

        let order = match self.codec.decode(&payload) {
            Ok(mut order) => {
                order.offset = position.offset;
                Some(order)
            }
            Err(e) => match self.decode {
                DecodePolicy::Skip => {
                    error!("{position} {e}，跳过去重");
                    None
                }
                DecodePolicy::Zero => {
                    error!("{position} {e}，以零值记录继续处理");
                    Some(Order {
                        offset: position.offset,
                        ..Default::default()
                    })
                }
            },
        };

        let outcome = match order {
            Some(order) => {
                debug!("订单：{order:?}");
                Some(self.processor.process(&order).await)
            }
            None => None,
        };

        let commit = match self.coordinator.as_mut() {
            Some(coordinator) => Some(coordinator.record_processed(&position, &self.source)),
            None => None,
        };

        Step::Processed { outcome, commit }
    }
}
