//! Filesystem-backed agent tree (§3/§4.8/§4.9/§4.10): parent/child agent
//! state, unique child id allocation, multiplexer-pane launching, and the
//! wait coordinator.

pub mod launcher;
pub mod tree;
pub mod wait;

pub use tree::{ChildResult, ChildState};
pub use wait::{wait_agents, WaitOutcome};
