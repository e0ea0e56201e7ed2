//! Streaming client (§4.3) and dynamic model catalog (§4.11).
//!
//! The engine owns the whole request/stream/tool-call-accumulation loop
//! itself; there is no provider-SDK abstraction layer sitting between it
//! and `reqwest` (see DESIGN.md for why `rig-core` was dropped).

mod client;
mod models_catalog;

pub use client::{generate_call_id, send_context_only, stream_completion, ContentDelta, StreamEvent, StreamOutcome, ToolCallDelta};
pub use models_catalog::{load_cache as load_all_models_cache, update_all_models};
