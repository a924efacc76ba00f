// devpulse library.
// GitHub activity proxy, TTL caches, batched fetching and stats aggregation.

pub mod batch;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod github;
pub mod proxy;
pub mod retry;
pub mod server;
pub mod stats;

pub use error::{PulseError, Result};
