//! # **ordis** 外部协作者特征

use crate::{
    Envelope, Inbound, Order, Position,
    errors::{AckError, BrokerError, CodecError, SendRejected, StoreError},
};
use std::{future::Future, time::Duration};

/// 一次拉取的结果
#[derive(Debug)]
pub enum Polled {
    /// 取到记录
    Record(Inbound),
    /// 代理报告错误
    BrokerError(BrokerError),
    /// 超时未取到记录
    Empty,
}

/// 消息来源特征
pub trait Source {
    /// 拉取下一条记录，至多阻塞一个拉取超时
    fn poll(&mut self) -> impl Future<Output = Polled>;
}

/// 偏移量确认特征
pub trait Acknowledge {
    /// 确认到指定位置为止的全部记录
    fn acknowledge(&self, position: &Position) -> Result<(), AckError>;
}

/// 幂等存储特征
pub trait Gate {
    /// 键不存在时写入并返回 `true`，键已存在时返回 `false`
    fn insert_if_absent(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> impl Future<Output = Result<bool, StoreError>>;
}

/// 订单编解码特征
pub trait Codec {
    /// 序列化
    fn encode(&self, order: &Order) -> Result<Vec<u8>, CodecError>;
    /// 反序列化
    fn decode(&self, payload: &[u8]) -> Result<Order, CodecError>;
}

/// 发送队列特征
pub trait Submit {
    /// 将消息提交到异步发送队列，投递结果经确认通道另行返回
    fn submit(&self, envelope: &Envelope) -> Result<(), SendRejected>;
}
