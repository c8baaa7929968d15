use ordis::{Order, domain::Codec, errors::CodecError};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// 消息框架的魔术字节
pub const MAGIC: u8 = 0;

const HEADER_LEN: usize = 5;

/// 订单记录的 JSON Schema
pub const ORDER_SCHEMA: &str = r#"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "title": "Order",
  "type": "object",
  "properties": {
    "offset": { "type": "integer" },
    "order_id": { "type": "string" },
    "user_id": { "type": "integer" },
    "items": {
      "type": "array",
      "items": {
        "type": "object",
        "properties": {
          "product_id": { "type": "integer" },
          "quantity": { "type": "integer" },
          "price": { "type": "number" }
        },
        "required": ["product_id", "quantity", "price"]
      }
    },
    "total_price": { "type": "number" }
  },
  "required": ["order_id"]
}"#;

/// 主题消息体对应的 schema 主体名
pub fn subject(topic: &str) -> String {
    format!("{topic}-value")
}

#[derive(Deserialize)]
struct Registered {
    id: u32,
}

/// Schema Registry 客户端
pub struct Registry {
    client: Client,
    base: String,
}

impl Registry {
    /// 构造客户端
    pub fn new(url: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            base: url.trim_end_matches('/').to_string(),
        })
    }

    /// 注册 JSON schema，已注册时返回原有 Id
    #[instrument(name = "register_schema", skip(self, schema))]
    pub async fn register(&self, subject: &str, schema: &str) -> Result<u32, reqwest::Error> {
        let url = format!("{}/subjects/{subject}/versions", self.base);
        let registered: Registered = self
            .client
            .post(url)
            .json(&json!({ "schemaType": "JSON", "schema": schema }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        info!("schema 注册成功，Id {}", registered.id);
        Ok(registered.id)
    }

    /// 查询主体的最新 schema Id
    #[instrument(name = "latest_schema", skip(self))]
    pub async fn latest(&self, subject: &str) -> Result<u32, reqwest::Error> {
        let url = format!("{}/subjects/{subject}/versions/latest", self.base);
        let latest: Registered = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!("最新 schema Id {}", latest.id);
        Ok(latest.id)
    }
}

/// 带 schema 消息框架的 JSON 编解码
///
/// 框架为魔术字节 `0`、4 字节大端 schema Id、JSON 消息体。
/// 解码不校验 schema 内容，Id 与预期不符时仅记录。
#[derive(Debug, Clone, Copy, Default)]
pub struct FramedCodec {
    schema_id: Option<u32>,
}

impl FramedCodec {
    /// 构造编解码，编码须提供 schema Id
    pub fn new(schema_id: Option<u32>) -> Self {
        Self { schema_id }
    }
}

impl Codec for FramedCodec {
    fn encode(&self, order: &Order) -> Result<Vec<u8>, CodecError> {
        let id = self
            .schema_id
            .ok_or_else(|| CodecError::Encode("未注册 schema".to_string()))?;
        let mut buf = Vec::with_capacity(HEADER_LEN + 256);
        buf.push(MAGIC);
        buf.extend_from_slice(&id.to_be_bytes());
        serde_json::to_writer(&mut buf, order).map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(buf)
    }

    fn decode(&self, payload: &[u8]) -> Result<Order, CodecError> {
        if payload.len() < HEADER_LEN {
            return Err(CodecError::Decode(format!(
                "消息长度 {} 小于框架头长度",
                payload.len()
            )));
        }
        let (header, body) = payload.split_at(HEADER_LEN);
        if header[0] != MAGIC {
            return Err(CodecError::Decode(format!("未知魔术字节 {}", header[0])));
        }
        let id = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
        if let Some(expected) = self.schema_id {
            if id != expected {
                debug!("消息 schema Id {id} 与最新 Id {expected} 不符");
            }
        }
        serde_json::from_slice(body).map_err(|e| CodecError::Decode(e.to_string()))
    }
}
