//! Async service surface over the hook registry.
//!
//! [`HookService`] turns a [`Call`] into a future that resolves when the
//! invocation settles, and [`middleware`] wraps it with deadline and
//! metrics layers.

pub mod call;
pub mod hook_service;
pub mod middleware;

pub use call::{Call, OperationError};
pub use hook_service::HookService;
pub use middleware::{build_call_pipeline, DeadlineLayer, MetricsLayer};
