//! Server-side listener accounting and resource telemetry

pub mod registry;
pub mod system;

pub use registry::{CounterSnapshot, ListenerGuard, StreamState};
pub use system::Stats;
