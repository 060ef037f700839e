//! CLI command implementations.

pub mod issue_token;
pub mod serve;
