/// kubectl subprocess client and output decoding
pub mod client;
pub mod executor;
pub mod json;
/// `kubectl top` table parsing
pub mod metrics;

#[cfg(test)]
pub mod fake;

pub use client::KubectlClient;
pub use executor::{Executor, ProcessExecutor};
