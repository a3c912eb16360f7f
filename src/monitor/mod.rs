//! Per-position monitoring session.

pub mod session;

pub use session::{MonitoringSession, SessionSnapshot, SessionState};
