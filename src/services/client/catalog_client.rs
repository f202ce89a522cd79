use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use super::config::CatalogClientConfig;
use super::error::CatalogClientError;
use super::generic::{deserialize_response_static, serialize_request_static};
use crate::services::dispatch::{
    Command, DELIMITER, DeregisterRequest, DeregisterResponse, RegisterRequest, RegisterResponse,
    ServiceRequest, ServiceResponse, ServicesRequest, ServicesResponse,
};
use crate::services::registry::{Identifier, ServiceRecord};

/// 目录客户端，每次调用一条连接、一行请求、一行响应
#[derive(Debug, Clone)]
pub struct CatalogClient {
    config: CatalogClientConfig,
}

impl CatalogClient {
    pub fn new(config: CatalogClientConfig) -> Self {
        Self { config }
    }

    /// 便捷的创建方法，使用默认配置
    pub fn connect(address: &str) -> Self {
        Self::new(CatalogClientConfig {
            address: address.to_string(),
            ..Default::default()
        })
    }

    pub async fn register(
        &self,
        name: &str,
        host: &str,
        port: u16,
        tags: Vec<String>,
        additional: serde_json::Value,
    ) -> Result<Identifier, CatalogClientError> {
        let request = RegisterRequest {
            name: name.to_string(),
            address: host.to_string(),
            port,
            tags,
            additional,
        };

        let response: RegisterResponse = self.call(Command::Register, &request).await?;
        match (response.success, response.id) {
            (true, Some(id)) => Ok(id),
            (true, None) => Err(CatalogClientError::Remote(
                "registration succeeded without an identifier".to_string(),
            )),
            (false, _) => Err(CatalogClientError::Remote(response.error)),
        }
    }

    pub async fn deregister(
        &self,
        id: Option<Identifier>,
        name: Option<&str>,
    ) -> Result<(), CatalogClientError> {
        let request = DeregisterRequest {
            id,
            name: name.map(str::to_string),
        };

        let response: DeregisterResponse = self.call(Command::Deregister, &request).await?;
        if response.success {
            Ok(())
        } else {
            Err(CatalogClientError::Remote(response.error))
        }
    }

    pub async fn service(
        &self,
        id: Option<Identifier>,
        name: Option<&str>,
    ) -> Result<ServiceRecord, CatalogClientError> {
        let request = ServiceRequest {
            id,
            name: name.map(str::to_string),
        };

        let response: ServiceResponse = self.call(Command::Service, &request).await?;
        match response.service {
            Some(service) if response.success => Ok(service),
            _ => Err(CatalogClientError::Remote(response.error)),
        }
    }

    pub async fn services(&self) -> Result<Vec<ServiceRecord>, CatalogClientError> {
        let response: ServicesResponse = self.call(Command::Services, &ServicesRequest {}).await?;
        if response.success {
            Ok(response.services)
        } else {
            Err(CatalogClientError::Remote(response.error))
        }
    }

    async fn call<T, R>(&self, cmd: Command, payload: &T) -> Result<R, CatalogClientError>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let line = serialize_request_static(cmd, payload)?;

        let mut stream = tokio::time::timeout(
            self.config.connect_timeout,
            TcpStream::connect(&self.config.address),
        )
        .await
        .map_err(|_| CatalogClientError::Timeout)??;

        let response = tokio::time::timeout(self.config.request_timeout, async {
            stream.write_all(&line).await?;
            stream.flush().await?;

            let mut reader = BufReader::new(&mut stream);
            let mut buf = Vec::new();
            reader.read_until(DELIMITER, &mut buf).await?;
            Ok::<_, std::io::Error>(buf)
        })
        .await
        .map_err(|_| CatalogClientError::Timeout)??;

        if response.is_empty() {
            return Err(CatalogClientError::EmptyResponse);
        }

        tracing::debug!(
            address = %self.config.address,
            command = ?cmd,
            response_size = response.len(),
            "Received catalog response"
        );

        deserialize_response_static(&response)
    }
}
