use thiserror::Error;

use crate::services::health::ProbeError;

/// 注册表业务错误，对外以 `success:false` 的形式返回
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("undefined service")]
    UndefinedService,

    #[error("service request must contain at least an ID")]
    ServiceRequestInvalid,

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error(transparent)]
    Probe(#[from] ProbeError),
}
