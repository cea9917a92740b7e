//! Overdue subtask notifier: login, query, resolve recipients, email.

pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod recipients;

#[cfg(test)]
mod fake;

pub use error::*;
pub use orchestrator::*;
pub use pipeline::*;
pub use recipients::*;
