use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::config::Config;
use crate::services::dispatch::{DELIMITER, DispatchError, Dispatcher};
use crate::services::health::{self, HealthcheckSource, ProbeError, TcpHealthcheckSource};
use crate::services::registry::Storage;

// accept 失败后的退避，避免文件描述符耗尽时空转
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Connection I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("Timed out waiting for a request line")]
    Timeout,
    #[error("Request line exceeds {limit} bytes")]
    RequestTooLarge { limit: u64 },
    #[error("Health check failed: {0}")]
    Healthcheck(#[from] ProbeError),
}

/// 目录服务：监听 TCP，逐个处理连接，并在后台运行健康检查循环
#[derive(Debug)]
pub struct CatalogServer {
    config: Config,
    dispatcher: Dispatcher,
    shutdown: CancellationToken,
    task_tracker: TaskTracker,
}

impl CatalogServer {
    pub fn new(config: Config) -> Self {
        // 按配置决定是否为新服务自动挂 TCP 探针
        let source: Option<Arc<dyn HealthcheckSource>> = if config.healthcheck.tcp_probe {
            Some(Arc::new(TcpHealthcheckSource::new(
                config.healthcheck_interval(),
                config.probe_timeout(),
            )))
        } else {
            None
        };

        let storage = Storage::new(source, config.healthcheck_interval());
        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: Config, storage: Storage) -> Self {
        Self {
            config,
            dispatcher: Dispatcher::new(storage),
            shutdown: CancellationToken::new(),
            task_tracker: TaskTracker::new(),
        }
    }

    pub fn storage(&self) -> &Storage {
        self.dispatcher.storage()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// 发出停止信号，接收循环会在下一次检查时退出
    pub fn close(&self) {
        tracing::info!("Closing catalog server");
        self.shutdown.cancel();
    }

    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr = self.config.server.bind_addr.clone();
        TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })
    }

    /// 绑定配置中的地址并开始服务
    pub async fn listen(&self) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// 在已绑定的监听器上服务，直到 `close()` 或健康检查失败
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        tracing::info!(address = %local_addr, "Catalog server listening");

        let ticker = self.task_tracker.spawn(health::run_tick_loop(
            self.storage().clone(),
            self.storage().healthcheck_period(),
            self.config.healthcheck_pass_delay(),
            self.shutdown.clone(),
        ));

        loop {
            let (stream, peer) = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                        continue;
                    }
                },
            };

            // 单个连接的失败只关闭该连接，服务继续
            let connection_id = Uuid::new_v4();
            if let Err(e) = self.handle_connection(stream, peer, connection_id).await {
                tracing::warn!(
                    connection_id = %connection_id,
                    peer = %peer,
                    error = %e,
                    "Closing connection after failure"
                );
            }
        }

        self.shutdown.cancel();
        self.task_tracker.close();
        let tick_result = ticker.await;
        self.task_tracker.wait().await;
        tracing::info!(address = %local_addr, "Catalog server stopped");

        match tick_result {
            Ok(Err(e)) => Err(ServerError::Healthcheck(e)),
            Ok(Ok(())) => Ok(()),
            Err(e) => {
                tracing::error!(error = %e, "Health check task aborted");
                Ok(())
            }
        }
    }

    // 每个连接只读一行请求、写一行响应
    async fn handle_connection(
        &self,
        mut stream: TcpStream,
        peer: SocketAddr,
        connection_id: Uuid,
    ) -> Result<(), ServerError> {
        let limit = self.config.server.max_request_bytes;
        let mut line = Vec::new();
        {
            let mut reader = BufReader::new((&mut stream).take(limit));
            tokio::time::timeout(
                self.config.request_timeout(),
                reader.read_until(DELIMITER, &mut line),
            )
            .await
            .map_err(|_| ServerError::Timeout)??;
        }

        // 读满上限仍没有换行符，视为传输错误
        if line.last() != Some(&DELIMITER) && line.len() as u64 >= limit {
            return Err(ServerError::RequestTooLarge { limit });
        }

        if line.is_empty() {
            tracing::debug!(connection_id = %connection_id, peer = %peer, "Connection closed without a request");
            return Ok(());
        }

        tracing::debug!(
            connection_id = %connection_id,
            peer = %peer,
            request_size = line.len(),
            "Received request"
        );

        let response = self.dispatcher.handle(&line).await?;
        stream.write_all(&response).await?;
        stream.flush().await?;
        stream.shutdown().await?;

        Ok(())
    }
}
