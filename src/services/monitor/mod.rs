pub mod engine;
pub mod executor;
pub mod guard;
pub mod summary;

pub use engine::{CheckContext, MonitorEngine, TickReport};
pub use executor::{HealthCheckExecutor, ProbeResult, Prober};
