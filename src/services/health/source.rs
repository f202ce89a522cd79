use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use super::probe::{Probe, ProbeHandle, TcpProbe};

/// 一条健康检查配置：检查周期与探针
#[derive(Debug, Clone)]
pub struct HealthcheckSpec {
    pub period: Duration,
    pub probe: ProbeHandle,
}

impl HealthcheckSpec {
    pub fn new<P: Probe + 'static>(period: Duration, probe: P) -> Self {
        Self {
            period,
            probe: ProbeHandle::new(probe),
        }
    }
}

/// 注册时为服务查找健康检查配置，返回 None 表示该服务不做健康检查
pub trait HealthcheckSource: Send + Sync {
    fn lookup(&self, name: &str, address: &str) -> Option<HealthcheckSpec>;
}

// 为每个服务的 host:port 生成带期限的 TCP 探针
#[derive(Debug, Clone)]
pub struct TcpHealthcheckSource {
    pub period: Duration,
    pub timeout: Duration,
}

impl TcpHealthcheckSource {
    pub fn new(period: Duration, timeout: Duration) -> Self {
        Self { period, timeout }
    }
}

impl HealthcheckSource for TcpHealthcheckSource {
    fn lookup(&self, _name: &str, address: &str) -> Option<HealthcheckSpec> {
        Some(HealthcheckSpec::new(
            self.period,
            TcpProbe::new(address, self.timeout),
        ))
    }
}

// 按服务名预先登记的探针，可在运行时增删
#[derive(Debug, Clone, Default)]
pub struct StaticHealthcheckSource {
    specs: Arc<DashMap<String, HealthcheckSpec>>,
}

impl StaticHealthcheckSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: impl Into<String>, spec: HealthcheckSpec) -> Option<HealthcheckSpec> {
        self.specs.insert(name.into(), spec)
    }

    pub fn remove(&self, name: &str) -> Option<HealthcheckSpec> {
        self.specs.remove(name).map(|(_, spec)| spec)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl HealthcheckSource for StaticHealthcheckSource {
    fn lookup(&self, name: &str, _address: &str) -> Option<HealthcheckSpec> {
        self.specs.get(name).map(|entry| entry.value().clone())
    }
}
