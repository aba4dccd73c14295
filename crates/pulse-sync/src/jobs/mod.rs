//! The three sync jobs, each a one-shot run returning a [`RunSummary`].
//!
//! [`RunSummary`]: crate::RunSummary

pub mod audience;
pub mod contacts;
pub mod metrics;

pub use audience::run_audience_sync;
pub use contacts::run_contacts_sync;
pub use metrics::{run_metrics_sync, HeartbeatSource};
