use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::CatalogClientError;
use crate::services::dispatch::{Command, Request, Response, envelope::encode_line};

/// 静态方法：把载荷包进请求信封并编码成一行
pub fn serialize_request_static<T: Serialize>(
    cmd: Command,
    payload: &T,
) -> Result<Vec<u8>, CatalogClientError> {
    let request = Request::new(cmd, payload)?;
    Ok(encode_line(&request)?)
}

/// 静态方法：拆开响应信封，反序列化出具体响应
pub fn deserialize_response_static<R: DeserializeOwned>(line: &[u8]) -> Result<R, CatalogClientError> {
    let envelope: Response = serde_json::from_slice(line)?;
    Ok(serde_json::from_str(&envelope.resp)?)
}
