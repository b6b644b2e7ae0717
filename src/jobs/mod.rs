//! Batch jobs triggered by the scheduler or the CLI.

pub mod dispatch;
pub mod fetch;
