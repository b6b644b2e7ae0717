//! Alert decision logic and outbound message rendering.
//!
//! Both halves are pure: the matcher decides whether a preference fires
//! against a snapshot, the renderer turns the pair into Slack text. All
//! I/O stays in the jobs that call them.

pub mod matcher;
pub mod message;

pub use matcher::{is_severe, overall_status, should_alert};
pub use message::render;
