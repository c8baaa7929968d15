//! 订单发布者

use crate::{
    Envelope, Order,
    domain::{Codec, Submit},
    errors::CodecError,
    tracker::{Confirmation, DeliveryReport, DeliveryTracker},
};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// 演示用消息头
pub const ORIGIN_HEADER: (&str, &[u8]) = ("origin", b"order-producer");

/// 一次发布的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Published {
    /// 已提交到发送队列，投递结果异步确认
    Submitted {
        /// 提交次数
        attempts: usize,
    },
    /// 重试耗尽，记录以失败终结
    Exhausted {
        /// 提交次数
        attempts: usize,
    },
}

/// 订单发布者
///
/// 持有发送队列与投递跟踪器，[`Publisher::close`] 时先等待全部在途记录终结，
/// 再关闭发送队列。
pub struct Publisher<S, C>
where
    S: Submit,
    C: Codec,
{
    submitter: S,
    codec: C,
    topic: String,
    retries: usize,
    backoff: Duration,
    tracker: DeliveryTracker,
}

impl<S, C> Publisher<S, C>
where
    S: Submit,
    C: Codec,
{
    /// 构造发布者，`rx` 为发送队列的投递确认通道
    pub fn new(
        submitter: S,
        codec: C,
        topic: &str,
        retries: usize,
        backoff: Duration,
        rx: mpsc::UnboundedReceiver<Confirmation>,
    ) -> Self {
        Self {
            submitter,
            codec,
            topic: topic.to_string(),
            retries: retries.max(1),
            backoff,
            tracker: DeliveryTracker::launch(rx),
        }
    }

    /// 投递跟踪器
    pub fn tracker(&self) -> &DeliveryTracker {
        &self.tracker
    }

    /// 发送队列
    pub fn submitter(&self) -> &S {
        &self.submitter
    }

    /// 发布一条订单，提交被拒绝时按固定间隔重试
    #[instrument(name = "publish", skip_all, fields(order_id = %order.order_id))]
    pub async fn publish(&self, order: &Order) -> Result<Published, CodecError> {
        let payload = self.codec.encode(order)?;
        let (key, value) = ORIGIN_HEADER;
        let envelope = Envelope {
            topic: self.topic.clone(),
            key: order.order_id.clone(),
            payload,
            headers: vec![(key.to_string(), value.to_vec())],
        };

        self.tracker.begin();
        for attempt in 1..=self.retries {
            match self.submitter.submit(&envelope) {
                Ok(()) => {
                    debug!("第 {attempt} 次提交成功");
                    return Ok(Published::Submitted { attempts: attempt });
                }
                Err(e) => {
                    warn!("第 {attempt} 次提交失败：{e}");
                    if attempt < self.retries {
                        tokio::time::sleep(self.backoff).await;
                    }
                }
            }
        }

        self.tracker.abandon(&order.order_id);
        Ok(Published::Exhausted {
            attempts: self.retries,
        })
    }

    /// 等待全部在途记录终结，关闭发送队列并返回投递统计
    #[instrument(name = "close_publisher", skip_all)]
    pub async fn close(self) -> DeliveryReport {
        let Self {
            submitter, tracker, ..
        } = self;
        info!("等待 {} 条在途记录的投递确认", tracker.inflight());
        tracker.wait().await;
        drop(submitter);
        info!("发送队列已关闭");
        tracker.close().await
    }
}
