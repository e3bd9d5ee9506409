//! HTTP request handlers.

pub mod auth;
pub mod capabilities;
pub mod common;
pub mod downloads;
pub mod releases;

pub use auth::*;
pub use capabilities::*;
pub use common::*;
pub use downloads::*;
pub use releases::*;
