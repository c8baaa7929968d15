//! 投递跟踪器

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tokio::{
    sync::{Notify, mpsc},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

/// 代理返回的投递确认
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// 投递成功
    Delivered {
        /// 订单 Id
        id: String,
        /// 写入分区
        partition: i32,
        /// 写入偏移量
        offset: i64,
    },
    /// 投递失败，不在本层重试
    Failed {
        /// 订单 Id
        id: String,
        /// 错误信息
        error: String,
    },
}

/// 投递统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// 投递成功数
    pub delivered: usize,
    /// 终结失败数，含重试耗尽与投递错误
    pub failed: usize,
}

impl DeliveryReport {
    /// 是否全部投递成功
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Default)]
struct Inflight {
    count: AtomicUsize,
    delivered: AtomicUsize,
    failed: AtomicUsize,
    settled: Notify,
}

impl Inflight {
    fn settle(&self) {
        match self
            .count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        {
            Ok(1) => self.settled.notify_waiters(),
            Ok(_) => (),
            Err(_) => error!("收到多余的投递确认，在途计数已为零"),
        }
    }

    fn report(&self) -> DeliveryReport {
        DeliveryReport {
            delivered: self.delivered.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

/// 投递跟踪器
///
/// 每次提交前递增在途计数，后台监听任务每收到一个投递确认递减一次。
/// 监听任务在确认通道关闭后结束，由 [`DeliveryTracker::close`] 等待其完成。
pub struct DeliveryTracker {
    inflight: Arc<Inflight>,
    listener: JoinHandle<()>,
}

impl DeliveryTracker {
    /// 启动监听任务，持续消费投递确认直至通道关闭
    pub fn launch(rx: mpsc::UnboundedReceiver<Confirmation>) -> Self {
        let inflight = Arc::new(Inflight::default());
        let listener = tokio::spawn(listen(Arc::clone(&inflight), rx));
        Self { inflight, listener }
    }

    /// 提交前登记一条在途记录
    pub fn begin(&self) {
        self.inflight.count.fetch_add(1, Ordering::SeqCst);
    }

    /// 重试耗尽，记录以失败终结
    pub fn abandon(&self, id: &str) {
        warn!("订单 {id} 提交重试耗尽，以失败终结");
        self.inflight.failed.fetch_add(1, Ordering::SeqCst);
        self.inflight.settle();
    }

    /// 在途记录数
    pub fn inflight(&self) -> usize {
        self.inflight.count.load(Ordering::SeqCst)
    }

    /// 当前投递统计
    pub fn report(&self) -> DeliveryReport {
        self.inflight.report()
    }

    /// 等待在途记录数归零
    pub async fn wait(&self) {
        loop {
            let settled = self.inflight.settled.notified();
            tokio::pin!(settled);
            settled.as_mut().enable();
            let n = self.inflight();
            if n == 0 {
                return;
            }
            debug!("等待 {n} 条在途记录的投递确认");
            settled.await;
        }
    }

    /// 等待监听任务结束并返回投递统计，调用前须关闭确认通道的全部发送端
    pub async fn close(self) -> DeliveryReport {
        if let Err(e) = self.listener.await {
            error!("投递确认监听任务发生错误：{e}");
        }
        let report = self.inflight.report();
        info!(
            "投递确认监听结束：成功 {}，失败 {}",
            report.delivered, report.failed
        );
        report
    }
}

async fn listen(inflight: Arc<Inflight>, mut rx: mpsc::UnboundedReceiver<Confirmation>) {
    debug!("启动投递确认监听");
    while let Some(confirmation) = rx.recv().await {
        match confirmation {
            Confirmation::Delivered {
                id,
                partition,
                offset,
            } => {
                debug!("订单 {id} 写入分区 {partition} 偏移 {offset}");
                inflight.delivered.fetch_add(1, Ordering::SeqCst);
            }
            Confirmation::Failed { id, error } => {
                error!("订单 {id} 投递失败：{error}");
                inflight.failed.fetch_add(1, Ordering::SeqCst);
            }
        }
        inflight.settle();
    }
    debug!("投递确认通道已关闭");
}
