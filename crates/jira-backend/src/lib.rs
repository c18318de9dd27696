pub mod auth;
pub mod client;
mod convert;
pub mod error;
pub mod fields;
pub mod jql;
pub mod models;
mod trait_impl;


pub use auth::{AuthMethod, Credentials};
pub use client::JiraClient;
pub use convert::parse_jira_timestamp;
pub use error::{JiraError, Result};
pub use fields::FieldPaths;
pub use jql::scope_to_projects;
pub use models::*;

// Re-export digest-core types for convenience
pub use digest_core::{DigestError, IssueSource};
