//! Tower middleware layers for the call pipeline.
//!
//! - [`deadline`]: Per-call deadline enforcement
//! - [`metrics`]: Call timing and outcome via `tracing` spans
//! - [`pipeline`]: Composes the layers around a [`HookService`](super::HookService)

pub mod deadline;
pub mod metrics;
pub mod pipeline;

pub use deadline::DeadlineLayer;
pub use metrics::MetricsLayer;
pub use pipeline::build_call_pipeline;
