//! # **ordis** 错误定义

use thiserror::Error;

/// 配置错误，进程无法启动
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 加载配置源失败
    #[error("加载配置失败：{0}")]
    Load(#[from] config::ConfigError),
    /// 配置验证失败
    #[error("配置'{section}'验证失败：{message}")]
    Validation {
        /// 配置节
        section: String,
        /// 验证信息
        message: String,
    },
}

/// 编解码错误
#[derive(Debug, Error)]
pub enum CodecError {
    /// 序列化失败
    #[error("序列化错误：{0}")]
    Encode(String),
    /// 反序列化失败
    #[error("反序列化错误：{0}")]
    Decode(String),
}

/// 幂等存储不可用
#[derive(Debug, Error)]
#[error("幂等存储不可用：{0}")]
pub struct StoreError(pub String);

/// 确认偏移量失败
#[derive(Debug, Error)]
#[error("确认偏移量失败：{0}")]
pub struct AckError(pub String);

/// 发送队列拒绝提交
#[derive(Debug, Error)]
#[error("发送队列拒绝提交：{0}")]
pub struct SendRejected(pub String);

/// 代理报告的错误
#[derive(Debug, Error)]
#[error("代理错误：{0}")]
pub struct BrokerError(pub String);
