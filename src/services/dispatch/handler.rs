use serde::Serialize;
use serde::de::DeserializeOwned;

use super::envelope::{
    Command, DeregisterRequest, DeregisterResponse, RegisterRequest, RegisterResponse, Request,
    Response, ServiceRequest, ServiceResponse, ServicesRequest, ServicesResponse, encode_line,
};
use super::error::DispatchError;
use crate::services::registry::Storage;

/// 无状态的请求分发器：解码信封，调用注册表，编码带类型的响应
#[derive(Debug, Clone)]
pub struct Dispatcher {
    storage: Storage,
}

impl Dispatcher {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// 处理一行请求，返回带分隔符的一行响应。
    ///
    /// 业务失败写进 `success:false` 响应；解码失败返回 `Err`，由调用方关闭连接。
    pub async fn handle(&self, line: &[u8]) -> Result<Vec<u8>, DispatchError> {
        let request: Request = serde_json::from_slice(line).map_err(DispatchError::Envelope)?;

        let response = match request.cmd {
            Command::Register => {
                let req = decode_payload(request.cmd, &request.req)?;
                wrap(&self.register(req).await)?
            }
            Command::Deregister => {
                let req = decode_payload(request.cmd, &request.req)?;
                wrap(&self.deregister(req).await)?
            }
            Command::Service => {
                let req = decode_payload(request.cmd, &request.req)?;
                wrap(&self.service(req).await)?
            }
            Command::Services => {
                let req = decode_payload(request.cmd, &request.req)?;
                wrap(&self.services(req).await)?
            }
        };

        encode_line(&response).map_err(DispatchError::Encode)
    }

    async fn register(&self, req: RegisterRequest) -> RegisterResponse {
        let id = self
            .storage
            .register(
                req.name.clone(),
                req.address.clone(),
                req.port,
                req.tags.clone(),
                req.additional.clone(),
            )
            .await;

        RegisterResponse {
            success: true,
            error: String::new(),
            id: Some(id),
            meta: req,
        }
    }

    async fn deregister(&self, req: DeregisterRequest) -> DeregisterResponse {
        let result = self.storage.deregister(req.id, req.name.as_deref()).await;

        DeregisterResponse {
            success: result.is_ok(),
            error: result.err().map(|e| e.to_string()).unwrap_or_default(),
            meta: req,
        }
    }

    async fn service(&self, req: ServiceRequest) -> ServiceResponse {
        match self.storage.service(req.id, req.name.as_deref()).await {
            Ok(record) => ServiceResponse {
                success: true,
                error: String::new(),
                meta: req,
                service: Some(record),
            },
            Err(e) => {
                tracing::debug!(
                    service_id = ?req.id,
                    service_name = ?req.name,
                    error = %e,
                    "Service lookup failed"
                );
                ServiceResponse {
                    success: false,
                    error: e.to_string(),
                    meta: req,
                    service: None,
                }
            }
        }
    }

    async fn services(&self, req: ServicesRequest) -> ServicesResponse {
        let mut services: Vec<_> = self.storage.services().await.into_values().collect();
        services.sort_by_key(|record| record.id);

        ServicesResponse {
            success: true,
            error: String::new(),
            meta: req,
            services,
        }
    }
}

fn decode_payload<T: DeserializeOwned>(command: Command, payload: &str) -> Result<T, DispatchError> {
    serde_json::from_str(payload).map_err(|source| DispatchError::Payload { command, source })
}

fn wrap<T: Serialize>(payload: &T) -> Result<Response, DispatchError> {
    Response::new(payload).map_err(DispatchError::Encode)
}
