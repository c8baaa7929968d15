//! # **ordis** 核心库
//!
//! 订单记录在消息代理上的幂等消费与可靠发送。
//!
//! 消费侧：[`controller::Controller`] 逐条拉取记录，经 [`dedup::Processor`] 去重，
//! 批量确认模式下由 [`commit::CommitCoordinator`] 按阈值确认偏移量。
//!
//! 发送侧：[`publisher::Publisher`] 有限次重试提交记录，
//! [`tracker::DeliveryTracker`] 跟踪异步投递确认，保证退出前所有记录均已终结。

#![warn(missing_docs)]

mod model;

pub mod commit;
pub mod config;
pub mod controller;
pub mod dedup;
pub mod domain;
pub mod errors;
pub mod publisher;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
#[cfg(test)]
mod tests;
pub mod tracker;

pub use model::{Envelope, Inbound, Item, Order, Position};

use tracing::{error, info};

/// 消费模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// 即时确认：由代理客户端在读取时自动确认偏移量
    Immediate,
    /// 批量确认：处理满阈值条数后显式确认偏移量
    Batched,
}

impl Mode {
    /// 按自动确认标志选择模式
    pub fn from_auto_commit(auto_commit: bool) -> Self {
        match auto_commit {
            true => Mode::Immediate,
            false => Mode::Batched,
        }
    }

    /// 去重键前缀
    pub fn prefix(&self) -> &'static str {
        match self {
            Mode::Immediate => "single",
            Mode::Batched => "multi",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Immediate => write!(f, "即时确认"),
            Mode::Batched => write!(f, "批量确认"),
        }
    }
}

/// 等待 Ctrl-C 或 SIGTERM 信号
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("监听 Ctrl-C 信号失败: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("监听 SIGTERM 信号失败: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("收到 Ctrl-C 信号"),
        _ = terminate => info!("收到 SIGTERM 信号"),
    }
}
