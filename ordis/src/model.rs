use serde::{Deserialize, Serialize};

/// 订单明细
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// 商品 Id
    pub product_id: i64,
    /// 数量
    pub quantity: i64,
    /// 单价
    pub price: f64,
}

/// 订单记录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// 读取时代理分配的偏移量
    #[serde(default)]
    pub offset: i64,
    /// 订单 Id，用作去重键
    pub order_id: String,
    /// 用户 Id
    #[serde(default)]
    pub user_id: i64,
    /// 订单明细
    #[serde(default)]
    pub items: Vec<Item>,
    /// 总价
    #[serde(default)]
    pub total_price: f64,
}

/// 已消费记录在代理中的位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    /// 主题
    pub topic: String,
    /// 分区
    pub partition: i32,
    /// 偏移量
    pub offset: i64,
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}|{}", self.topic, self.partition, self.offset)
    }
}

/// 从代理拉取的原始消息
#[derive(Debug, Clone)]
pub struct Inbound {
    /// 消息体
    pub payload: Vec<u8>,
    /// 消息头
    pub headers: Vec<(String, Vec<u8>)>,
    /// 消息位置
    pub position: Position,
}

/// 待发送的消息
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// 目标主题
    pub topic: String,
    /// 消息键
    pub key: String,
    /// 消息体
    pub payload: Vec<u8>,
    /// 消息头
    pub headers: Vec<(String, Vec<u8>)>,
}
