pub mod client;
pub mod error;
pub mod models;
mod trait_impl;

#[cfg(test)]
mod client_tests;

pub use client::LarkClient;
pub use error::{LarkError, Result};
pub use models::*;

// Re-export digest-core types for convenience
pub use digest_core::{DigestError, NotificationSink};
