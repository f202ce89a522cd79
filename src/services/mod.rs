pub mod client;
pub mod dispatch;
pub mod health;
pub mod registry;

pub use client::{CatalogClient, CatalogClientConfig, CatalogClientError};
pub use dispatch::Dispatcher;
pub use health::{HealthcheckSource, HealthcheckSpec, Probe, ProbeError, TcpProbe};
pub use registry::{CatalogError, Identifier, ServiceRecord, Storage};
