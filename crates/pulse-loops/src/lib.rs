//! Loops API clients.
//!
//! Two distinct surfaces: the public contacts API (bearer token, used by the
//! contact-attribute push) and the session-cookie tRPC export API (used to
//! pull a full audience CSV export).

mod contacts;
mod error;
mod export;
mod retry;

pub use contacts::{ContactUpdate, LoopsClient};
pub use error::LoopsError;
pub use export::ExportClient;
pub use retry::{retry_on_rate_limit, RetryPolicy};
