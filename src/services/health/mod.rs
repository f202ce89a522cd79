//! Health checking
//!
//! - `probe`: liveness probes and the TCP reference probe
//! - `source`: where a freshly registered service gets its probe from
//! - `scheduler`: concurrent health-check passes and the tick loop

pub mod probe;
pub mod scheduler;
pub mod source;

pub use probe::{Probe, ProbeError, ProbeHandle, TcpProbe};
pub use scheduler::{run_pass, run_tick_loop};
pub use source::{HealthcheckSource, HealthcheckSpec, StaticHealthcheckSource, TcpHealthcheckSource};
