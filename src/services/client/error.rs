/// 目录客户端错误类型
#[derive(Debug, thiserror::Error)]
pub enum CatalogClientError {
    #[error("Transport error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Timeout error")]
    Timeout,
    #[error("Connection closed before a response arrived")]
    EmptyResponse,
    #[error("Catalog error: {0}")]
    Remote(String),
}
