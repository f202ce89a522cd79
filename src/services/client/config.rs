use std::time::Duration;

/// 目录客户端配置
#[derive(Debug, Clone)]
pub struct CatalogClientConfig {
    /// 目录服务地址
    pub address: String,
    /// 连接超时时间
    pub connect_timeout: Duration,
    /// 单次请求超时时间
    pub request_timeout: Duration,
}

impl Default for CatalogClientConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:7777".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }
}
