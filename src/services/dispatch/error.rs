use thiserror::Error;

/// 传输层错误：信封或载荷无法解析时直接关闭连接，不返回结构化响应
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Malformed request envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("Malformed {command:?} payload: {source}")]
    Payload {
        command: super::Command,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode response: {0}")]
    Encode(#[source] serde_json::Error),
}

impl DispatchError {
    // 是否属于解码类错误
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Envelope(_) | Self::Payload { .. })
    }
}
