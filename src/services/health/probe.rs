use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::TcpStream;

/// 探针硬错误，与 `alive=false` 不同，会中断整轮检查
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("health probe failed: {message}")]
pub struct ProbeError {
    pub message: String,
}

impl ProbeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// 存活探针。实现方需要自行限制耗时，调度器不会替它超时
#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self) -> Result<bool, ProbeError>;
}

#[async_trait]
impl<F, Fut> Probe for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool, ProbeError>> + Send + 'static,
{
    async fn check(&self) -> Result<bool, ProbeError> {
        (self)().await
    }
}

// 记录里保存的探针句柄
#[derive(Clone)]
pub struct ProbeHandle(Arc<dyn Probe>);

impl ProbeHandle {
    pub fn new<P: Probe + 'static>(probe: P) -> Self {
        Self(Arc::new(probe))
    }

    pub async fn check(&self) -> Result<bool, ProbeError> {
        self.0.check().await
    }
}

impl fmt::Debug for ProbeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProbeHandle(..)")
    }
}

/// 带连接期限的 TCP 探针：连不上或超时都视为不存活，而不是错误
#[derive(Debug, Clone)]
pub struct TcpProbe {
    pub address: String,
    pub timeout: Duration,
}

impl TcpProbe {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Probe for TcpProbe {
    async fn check(&self) -> Result<bool, ProbeError> {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.address)).await {
            Ok(Ok(_stream)) => Ok(true),
            Ok(Err(e)) => {
                tracing::debug!(address = %self.address, error = %e, "TCP probe could not connect");
                Ok(false)
            }
            Err(_) => {
                tracing::debug!(
                    address = %self.address,
                    timeout_ms = self.timeout.as_millis(),
                    "TCP probe timed out"
                );
                Ok(false)
            }
        }
    }
}
