//! 测试专用的内存协作者

use crate::{
    Envelope, Inbound, Item, Order, Position,
    domain::{Acknowledge, Codec, Gate, Polled, Source, Submit},
    errors::{AckError, BrokerError, CodecError, SendRejected, StoreError},
    tracker::Confirmation,
};
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::{sync::mpsc, time::Instant};

/// 测试主题
pub const TOPIC: &str = "orders";

/// 构造测试订单
pub fn order(id: &str) -> Order {
    Order {
        offset: 0,
        order_id: id.to_string(),
        user_id: 1,
        items: vec![
            Item {
                product_id: 444,
                quantity: 1,
                price: 300.0,
            },
            Item {
                product_id: 123,
                quantity: 2,
                price: 500.0,
            },
        ],
        total_price: 800.0,
    }
}

/// 测试主题 0 分区上的位置
pub fn position(offset: i64) -> Position {
    Position {
        topic: TOPIC.to_string(),
        partition: 0,
        offset,
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

struct Entry {
    value: Vec<u8>,
    ttl: Duration,
    expires: Instant,
}

#[derive(Default)]
struct GateState {
    entries: HashMap<String, Entry>,
    writes: usize,
}

/// 内存幂等存储，过期时间按 tokio 时钟计算
#[derive(Clone)]
pub struct MemoryGate {
    state: Arc<Mutex<GateState>>,
    available: Arc<AtomicBool>,
}

impl MemoryGate {
    /// 构造空存储
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(GateState::default())),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// 模拟存储可用或不可用
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// 当前条目数
    pub fn len(&self) -> usize {
        lock(&self.state).entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 成功写入次数
    pub fn writes(&self) -> usize {
        lock(&self.state).writes
    }

    /// 全部键
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.state).entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// 读取条目的值与写入时的保留时长
    pub fn entry(&self, key: &str) -> Option<(Vec<u8>, Duration)> {
        lock(&self.state)
            .entries
            .get(key)
            .map(|e| (e.value.clone(), e.ttl))
    }
}

impl Default for MemoryGate {
    fn default() -> Self {
        Self::new()
    }
}

impl Gate for MemoryGate {
    async fn insert_if_absent(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError("连接被拒绝".to_string()));
        }
        let now = Instant::now();
        let mut state = lock(&self.state);
        if let Some(entry) = state.entries.get(key) {
            if entry.expires > now {
                return Ok(false);
            }
        }
        state.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                ttl,
                expires: now + ttl,
            },
        );
        state.writes += 1;
        Ok(true)
    }
}

#[derive(Default)]
struct AckState {
    attempts: Vec<Position>,
    committed: Vec<Position>,
    fail: usize,
}

/// 记录确认请求的确认器
#[derive(Clone, Default)]
pub struct RecordingAck {
    state: Arc<Mutex<AckState>>,
}

impl RecordingAck {
    /// 构造确认器
    pub fn new() -> Self {
        Self::default()
    }

    /// 接下来 `n` 次确认失败
    pub fn fail_next(&self, n: usize) {
        lock(&self.state).fail = n;
    }

    /// 全部确认请求
    pub fn attempts(&self) -> Vec<Position> {
        lock(&self.state).attempts.clone()
    }

    /// 成功确认的位置
    pub fn committed(&self) -> Vec<Position> {
        lock(&self.state).committed.clone()
    }
}

impl Acknowledge for RecordingAck {
    fn acknowledge(&self, position: &Position) -> Result<(), AckError> {
        let mut state = lock(&self.state);
        state.attempts.push(position.clone());
        if state.fail > 0 {
            state.fail -= 1;
            return Err(AckError("协调者不可用".to_string()));
        }
        state.committed.push(position.clone());
        Ok(())
    }
}

/// 按脚本返回拉取结果的消息来源，脚本耗尽后始终超时
#[derive(Default)]
pub struct ScriptedSource {
    script: VecDeque<Polled>,
    offset: i64,
    polls: usize,
    acks: RecordingAck,
}

impl ScriptedSource {
    /// 构造空脚本
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条原始消息，偏移量依次递增
    pub fn push_raw(&mut self, payload: Vec<u8>) {
        self.push_inbound(payload, Vec::new());
    }

    /// 追加一条带消息头的原始消息
    pub fn push_inbound(&mut self, payload: Vec<u8>, headers: Vec<(String, Vec<u8>)>) {
        let position = position(self.offset);
        self.offset += 1;
        self.script.push_back(Polled::Record(Inbound {
            payload,
            headers,
            position,
        }));
    }

    /// 追加一条订单
    pub fn push_order(&mut self, order: &Order) {
        let payload = JsonCodec.encode(order).unwrap_or_default();
        self.push_raw(payload);
    }

    /// 追加一次超时
    pub fn push_empty(&mut self) {
        self.script.push_back(Polled::Empty);
    }

    /// 追加一次代理错误
    pub fn push_error(&mut self, message: &str) {
        self.script
            .push_back(Polled::BrokerError(BrokerError(message.to_string())));
    }

    /// 剩余脚本条数
    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    /// 拉取次数
    pub fn polls(&self) -> usize {
        self.polls
    }

    /// 确认器
    pub fn acks(&self) -> &RecordingAck {
        &self.acks
    }
}

impl Source for ScriptedSource {
    async fn poll(&mut self) -> Polled {
        self.polls += 1;
        self.script.pop_front().unwrap_or(Polled::Empty)
    }
}

impl Acknowledge for ScriptedSource {
    fn acknowledge(&self, position: &Position) -> Result<(), AckError> {
        self.acks.acknowledge(position)
    }
}

/// 不带消息框架的 JSON 编解码
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, order: &Order) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(order).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, payload: &[u8]) -> Result<Order, CodecError> {
        serde_json::from_slice(payload).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

/// 前 `reject` 次提交被拒绝的发送队列
pub struct FlakySubmitter {
    reject: usize,
    attempts: AtomicUsize,
    confirm: Option<mpsc::UnboundedSender<Confirmation>>,
}

impl FlakySubmitter {
    /// 构造发送队列，提交成功时不产生投递确认
    pub fn new(reject: usize) -> Self {
        Self {
            reject,
            attempts: AtomicUsize::new(0),
            confirm: None,
        }
    }

    /// 构造发送队列，提交成功后经通道确认投递
    pub fn confirming(reject: usize, confirm: mpsc::UnboundedSender<Confirmation>) -> Self {
        Self {
            reject,
            attempts: AtomicUsize::new(0),
            confirm: Some(confirm),
        }
    }

    /// 提交次数
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Submit for FlakySubmitter {
    fn submit(&self, envelope: &Envelope) -> Result<(), SendRejected> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.reject {
            return Err(SendRejected("本地队列已满".to_string()));
        }
        if let Some(tx) = &self.confirm {
            let _ = tx.send(Confirmation::Delivered {
                id: envelope.key.clone(),
                partition: 0,
                offset: attempt as i64,
            });
        }
        Ok(())
    }
}

/// 回环代理的投递日志
#[derive(Clone, Default)]
pub struct Journal {
    log: Arc<Mutex<Vec<Envelope>>>,
}

impl Journal {
    /// 已投递的消息
    pub fn delivered(&self) -> Vec<Envelope> {
        lock(&self.log).clone()
    }

    /// 按投递顺序重放为消息来源
    pub fn replay(&self) -> ScriptedSource {
        let mut source = ScriptedSource::new();
        for envelope in lock(&self.log).iter() {
            source.push_inbound(envelope.payload.clone(), envelope.headers.clone());
        }
        source
    }
}

/// 回环代理：提交即投递，投递日志可重放为消息来源
pub struct Loopback {
    journal: Journal,
    confirm: mpsc::UnboundedSender<Confirmation>,
}

impl Loopback {
    /// 构造回环代理及其投递确认通道
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Confirmation>) {
        let (confirm, rx) = mpsc::unbounded_channel();
        (
            Self {
                journal: Journal::default(),
                confirm,
            },
            rx,
        )
    }

    /// 投递日志，代理关闭后仍可读取
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    /// 已投递的消息
    pub fn delivered(&self) -> Vec<Envelope> {
        self.journal.delivered()
    }
}

impl Submit for Loopback {
    fn submit(&self, envelope: &Envelope) -> Result<(), SendRejected> {
        let mut log = lock(&self.journal.log);
        let offset = log.len() as i64;
        log.push(envelope.clone());
        let _ = self.confirm.send(Confirmation::Delivered {
            id: envelope.key.clone(),
            partition: 0,
            offset,
        });
        Ok(())
    }
}
