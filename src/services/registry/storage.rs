//! In-memory registry storage.
//!
//! All records live in one map behind one `RwLock`. The health-check
//! scheduler writes liveness back through the same lock, and probes are
//! never awaited while the lock is held.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use super::error::CatalogError;
use super::id::Identifier;
use super::types::ServiceRecord;
use crate::services::health::{self, HealthcheckSource, HealthcheckSpec, ProbeError, ProbeHandle};

pub const DEFAULT_HEALTHCHECK_PERIOD: Duration = Duration::from_millis(2000);

/// 注册表句柄，克隆后共享同一份数据与锁
#[derive(Clone)]
pub struct Storage {
    services: Arc<RwLock<HashMap<Identifier, ServiceRecord>>>,
    healthcheck_source: Option<Arc<dyn HealthcheckSource>>,
    healthcheck_period: Duration,
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("healthcheck_source", &self.healthcheck_source.is_some())
            .field("healthcheck_period", &self.healthcheck_period)
            .finish_non_exhaustive()
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::new(None, DEFAULT_HEALTHCHECK_PERIOD)
    }
}

impl Storage {
    pub fn new(
        healthcheck_source: Option<Arc<dyn HealthcheckSource>>,
        healthcheck_period: Duration,
    ) -> Self {
        Self {
            services: Arc::new(RwLock::new(HashMap::new())),
            healthcheck_source,
            healthcheck_period,
        }
    }

    /// 注册服务并返回新的标识符。
    ///
    /// 配置了健康检查来源时，会在返回前同步完成一次 `setup_healthcheck`。
    /// 探针失败不影响注册本身，只是该服务不启用健康检查。
    pub async fn register(
        &self,
        name: String,
        host: String,
        port: u16,
        tags: Vec<String>,
        additional: serde_json::Value,
    ) -> Identifier {
        let record = {
            let mut services = self.services.write().await;
            // 与现存记录碰撞时重新生成
            let mut id = Identifier::generate();
            while services.contains_key(&id) {
                tracing::warn!(service_id = %id, "Identifier collision, regenerating");
                id = Identifier::generate();
            }

            let record = ServiceRecord::new(id, name, host, port, tags, additional);
            services.insert(id, record.clone());
            record
        };

        tracing::info!(
            service_id = %record.id,
            service_name = %record.name,
            address = %record.address,
            "Registered service"
        );

        if let Some(source) = &self.healthcheck_source {
            let spec = source.lookup(&record.name, &record.address);
            if let Err(e) = self.setup_healthcheck(record.id, spec).await {
                tracing::warn!(
                    service_id = %record.id,
                    service_name = %record.name,
                    error = %e,
                    "Health check setup failed, service stays registered without it"
                );
            }
        }

        record.id
    }

    // 按 ID 优先、名称其次定位；找不到时静默忽略
    pub async fn deregister(
        &self,
        id: Option<Identifier>,
        name: Option<&str>,
    ) -> Result<(), CatalogError> {
        if id.is_none() && name.is_none() {
            return Err(CatalogError::ServiceRequestInvalid);
        }

        let mut services = self.services.write().await;
        let target = match id {
            Some(id) => Some(id),
            None => name.and_then(|name| find_by_name(&services, name)),
        };

        if let Some(removed) = target.and_then(|id| services.remove(&id)) {
            tracing::info!(
                service_id = %removed.id,
                service_name = %removed.name,
                "Deregistered service"
            );
        } else {
            tracing::debug!(service_id = ?id, service_name = ?name, "Deregister matched nothing");
        }

        Ok(())
    }

    pub async fn service(
        &self,
        id: Option<Identifier>,
        name: Option<&str>,
    ) -> Result<ServiceRecord, CatalogError> {
        let services = self.services.read().await;
        let record = match (id, name) {
            (Some(id), _) => services.get(&id),
            (None, Some(name)) => find_by_name(&services, name).and_then(|id| services.get(&id)),
            (None, None) => return Err(CatalogError::ServiceRequestInvalid),
        };

        record.cloned().ok_or(CatalogError::UndefinedService)
    }

    // 读锁下拷贝出的一致快照
    pub async fn services(&self) -> HashMap<Identifier, ServiceRecord> {
        self.services.read().await.clone()
    }

    /// 为服务启用健康检查。
    ///
    /// `spec` 为 None 时什么也不做。否则先在锁外同步跑一次探针，
    /// 探针报错则整体失败且不启用；成功则写入探针、周期与当前存活状态。
    pub async fn setup_healthcheck(
        &self,
        id: Identifier,
        spec: Option<HealthcheckSpec>,
    ) -> Result<(), CatalogError> {
        let Some(spec) = spec else {
            return Ok(());
        };

        if !self.services.read().await.contains_key(&id) {
            return Err(CatalogError::UndefinedService);
        }

        let alive = spec.probe.check().await?;

        // 探针期间服务可能已被注销
        let mut services = self.services.write().await;
        let record = services.get_mut(&id).ok_or(CatalogError::UndefinedService)?;
        record.healthcheck_enabled = true;
        record.healthcheck_probe = Some(spec.probe);
        record.healthcheck_period = spec.period;
        record.is_alive = alive;

        tracing::debug!(
            service_id = %id,
            service_name = %record.name,
            is_alive = alive,
            period_ms = spec.period.as_millis(),
            "Health check enabled"
        );

        Ok(())
    }

    /// 执行一轮健康检查
    pub async fn healthcheck(&self) -> Result<(), ProbeError> {
        health::run_pass(self).await
    }

    pub fn healthcheck_period(&self) -> Duration {
        self.healthcheck_period
    }

    pub async fn len(&self) -> usize {
        self.services.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.services.read().await.is_empty()
    }

    // 取出所有启用了健康检查的服务及其探针
    pub(crate) async fn enabled_probes(&self) -> Vec<(Identifier, ProbeHandle)> {
        self.services
            .read()
            .await
            .values()
            .filter(|record| record.healthcheck_enabled)
            .filter_map(|record| {
                record
                    .healthcheck_probe
                    .clone()
                    .map(|probe| (record.id, probe))
            })
            .collect()
    }

    // 写回探针结果，服务已注销时返回 false
    pub(crate) async fn update_liveness(&self, id: Identifier, alive: bool) -> bool {
        let mut services = self.services.write().await;
        let Some(record) = services.get_mut(&id) else {
            return false;
        };

        if record.is_alive != alive {
            tracing::info!(
                service_id = %id,
                service_name = %record.name,
                is_alive = alive,
                "Service liveness changed"
            );
        }
        record.is_alive = alive;
        true
    }
}

// 同名服务取最小的标识符，保证结果确定
fn find_by_name(services: &HashMap<Identifier, ServiceRecord>, name: &str) -> Option<Identifier> {
    services
        .values()
        .filter(|record| record.name == name)
        .map(|record| record.id)
        .min()
}
