pub mod escalation;
pub mod monitor;

pub use escalation::{Escalation, EscalationPolicy};
pub use monitor::{CycleResult, Monitor, MonitorSettings, MonitorState, StopReason};
