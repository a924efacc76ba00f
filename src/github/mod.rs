// GitHub API module.
// Provides the upstream client and the typed schema for the endpoints we read.

pub mod client;
pub mod endpoints;
pub mod types;

pub use client::{GITHUB_API_BASE, GitHubClient};
pub use types::*;
