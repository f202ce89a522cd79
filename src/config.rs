use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILE: &str = "config.toml";
pub const ENV_PREFIX: &str = "CATALOG_";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub healthcheck: HealthcheckConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    // 读取单行请求的期限
    pub request_timeout_ms: u64,
    // 单行请求的字节上限（含换行符）
    pub max_request_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:7777".to_string(),
            request_timeout_ms: 5000,
            max_request_bytes: 64 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthcheckConfig {
    pub interval_ms: u64,
    // 每轮检查前的短暂延迟，避免与注册表锁频繁争用
    pub pass_delay_ms: u64,
    pub probe_timeout_ms: u64,
    // 为每个注册的服务自动挂上 TCP 探针
    pub tcp_probe: bool,
}

impl Default for HealthcheckConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            pass_delay_ms: 10,
            probe_timeout_ms: 1000,
            tcp_probe: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

// 环境变量覆盖项，均为可选
#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    bind_addr: Option<String>,
    request_timeout_ms: Option<u64>,
    max_request_bytes: Option<u64>,
    healthcheck_interval_ms: Option<u64>,
    healthcheck_pass_delay_ms: Option<u64>,
    healthcheck_probe_timeout_ms: Option<u64>,
    healthcheck_tcp_probe: Option<bool>,
    log_filter: Option<String>,
}

impl Config {
    /// 读取当前目录下的 config.toml（不存在时使用默认值），再应用 `CATALOG_` 环境变量
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = if Path::new(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Self::default()
        };

        let overrides: EnvOverrides = envy::prefixed(ENV_PREFIX).from_env()?;
        config.apply(overrides);
        Ok(config)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = Self::from_file(path)?;
        let overrides: EnvOverrides = envy::prefixed(ENV_PREFIX).from_env()?;
        config.apply(overrides);
        Ok(config)
    }

    pub fn from_toml(config_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(config_str)
    }

    fn from_file(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let config_str = fs::read_to_string(path)?;
        Ok(Self::from_toml(&config_str)?)
    }

    fn apply(&mut self, overrides: EnvOverrides) {
        if let Some(bind_addr) = overrides.bind_addr {
            self.server.bind_addr = bind_addr;
        }
        if let Some(ms) = overrides.request_timeout_ms {
            self.server.request_timeout_ms = ms;
        }
        if let Some(limit) = overrides.max_request_bytes {
            self.server.max_request_bytes = limit;
        }
        if let Some(ms) = overrides.healthcheck_interval_ms {
            self.healthcheck.interval_ms = ms;
        }
        if let Some(ms) = overrides.healthcheck_pass_delay_ms {
            self.healthcheck.pass_delay_ms = ms;
        }
        if let Some(ms) = overrides.healthcheck_probe_timeout_ms {
            self.healthcheck.probe_timeout_ms = ms;
        }
        if let Some(enabled) = overrides.healthcheck_tcp_probe {
            self.healthcheck.tcp_probe = enabled;
        }
        if let Some(filter) = overrides.log_filter {
            self.logging.filter = filter;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_ms)
    }

    pub fn healthcheck_interval(&self) -> Duration {
        Duration::from_millis(self.healthcheck.interval_ms)
    }

    pub fn healthcheck_pass_delay(&self) -> Duration {
        Duration::from_millis(self.healthcheck.pass_delay_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.healthcheck.probe_timeout_ms)
    }
}
