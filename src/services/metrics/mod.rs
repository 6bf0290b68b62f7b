pub mod registry;

pub use registry::MonitorMetrics;
