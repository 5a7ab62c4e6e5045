//! Push Core Types
//!
//! Provider-agnostic request, payload and response types shared by the
//! dispatch engine, the converters and the provider adapters.

mod body;
mod capability;
mod error;
mod provider;
mod request;
mod token;

pub use body::*;
pub use capability::*;
pub use error::*;
pub use provider::*;
pub use request::*;
pub use token::*;
