//! Push Dispatch Engine
//!
//! Bounded-concurrency fan-out of one converted notification to many devices.

mod config;
mod traits;
mod worker;

pub use config::WorkerConfig;
pub use traits::*;
pub use worker::*;

pub use tokio_util::sync::CancellationToken;
