//! Push Gateway
//!
//! Configuration, worker registry and HTTP front end for the dispatch engine.

pub mod api;
pub mod config;
pub mod registry;

pub use api::push_router;
pub use config::Config;
pub use registry::Registry;
