use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::id::Identifier;
use crate::services::health::ProbeHandle;

// 服务注册信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: Identifier,
    pub name: String,
    pub host: String,
    pub port: u16,
    // 注册时计算的 host:port，之后不再变化
    pub address: String,
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(rename = "healthcheck", default)]
    pub healthcheck_enabled: bool,
    #[serde(skip)]
    pub healthcheck_probe: Option<ProbeHandle>,
    #[serde(with = "duration_nanos", default)]
    pub healthcheck_period: Duration,
    #[serde(default)]
    pub is_alive: bool,

    // 调用方附带的元数据，原样透传
    #[serde(default)]
    pub additional: serde_json::Value,
}

impl ServiceRecord {
    pub fn new(
        id: Identifier,
        name: String,
        host: String,
        port: u16,
        tags: Vec<String>,
        additional: serde_json::Value,
    ) -> Self {
        let address = format!("{host}:{port}");
        Self {
            id,
            name,
            host,
            port,
            address,
            tags,
            healthcheck_enabled: false,
            healthcheck_probe: None,
            healthcheck_period: Duration::ZERO,
            is_alive: false,
            additional,
        }
    }
}

// 周期按纳秒整数上线，与外部客户端约定一致
mod duration_nanos {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_nanos()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_nanos)
    }
}
