use ordis::{domain::Gate, errors::StoreError};
use redis::{Client, RedisError, aio::ConnectionManager};
use std::time::Duration;
use tracing::info;

/// Redis 幂等存储
///
/// 以单条 `SET key value NX EX ttl` 原子完成判重与写入，多实例共享同一存储。
#[derive(Clone)]
pub struct RedisGate {
    conn: ConnectionManager,
}

impl RedisGate {
    /// 连接 Redis 并以 `PING` 验证可用
    pub async fn connect(addr: &str) -> Result<Self, RedisError> {
        let client = Client::open(redis_url(addr))?;
        let mut conn = ConnectionManager::new(client).await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Redis {addr} 连接成功：{pong}");
        Ok(Self { conn })
    }
}

fn redis_url(addr: &str) -> String {
    match addr.contains("://") {
        true => addr.to_string(),
        false => format!("redis://{addr}"),
    }
}

impl Gate for RedisGate {
    async fn insert_if_absent(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError(e.to_string()))?;
        Ok(reply.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("localhost:6379", "redis://localhost:6379")]
    #[case("redis://cache:6380", "redis://cache:6380")]
    #[case("rediss://user:pw@cache:6380/1", "rediss://user:pw@cache:6380/1")]
    fn address_becomes_url(#[case] addr: &str, #[case] expected: &str) {
        assert_eq!(redis_url(addr), expected);
    }
}
