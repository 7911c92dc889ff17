//! Monitor assembly, cycle execution and scheduling.

pub mod engine;
pub mod scheduler;
pub mod supervisor;

pub use engine::{CycleSummary, Monitor, MonitorBuilder};
pub use scheduler::{run, spawn, spawn_with_token, MonitorHandle};
pub use supervisor::MonitorSet;
