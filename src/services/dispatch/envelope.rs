use serde::{Deserialize, Serialize};

use crate::services::registry::{Identifier, ServiceRecord};

/// 换行分隔的单条消息
pub const DELIMITER: u8 = b'\n';

// 线上命令编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Command {
    Register = 0,
    Deregister = 1,
    Services = 2,
    Service = 3,
}

impl TryFrom<u8> for Command {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Register),
            1 => Ok(Self::Deregister),
            2 => Ok(Self::Services),
            3 => Ok(Self::Service),
            other => Err(format!("unknown command: {other}")),
        }
    }
}

impl From<Command> for u8 {
    fn from(command: Command) -> Self {
        command as u8
    }
}

/// 请求信封，`req` 是按 `cmd` 编码的 JSON 字符串
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub cmd: Command,
    pub req: String,
}

impl Request {
    pub fn new<T: Serialize>(cmd: Command, payload: &T) -> serde_json::Result<Self> {
        Ok(Self {
            cmd,
            req: serde_json::to_string(payload)?,
        })
    }
}

/// 响应信封，`resp` 是具体响应的 JSON 字符串
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub resp: String,
}

impl Response {
    pub fn new<T: Serialize>(payload: &T) -> serde_json::Result<Self> {
        Ok(Self {
            resp: serde_json::to_string(payload)?,
        })
    }
}

// 序列化并追加分隔符
pub fn encode_line<T: Serialize>(message: &T) -> serde_json::Result<Vec<u8>> {
    let mut line = serde_json::to_vec(message)?;
    line.push(DELIMITER);
    Ok(line)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    #[serde(alias = "host")]
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub additional: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub error: String,
    pub id: Option<Identifier>,
    pub meta: RegisterRequest,
}

// 选择器：ID 优先，其次名称
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeregisterRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Identifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeregisterResponse {
    pub success: bool,
    pub error: String,
    pub meta: DeregisterRequest,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Identifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceResponse {
    pub success: bool,
    pub error: String,
    pub meta: ServiceRequest,
    pub service: Option<ServiceRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServicesRequest {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServicesResponse {
    pub success: bool,
    pub error: String,
    pub meta: ServicesRequest,
    pub services: Vec<ServiceRecord>,
}
