//! Pipeline composition: wraps a [`HookService`] with the middleware layers.

use std::sync::Arc;

use hookline_core::Args;
use tower::ServiceBuilder;

use super::deadline::DeadlineLayer;
use super::metrics::MetricsLayer;
use crate::config::HookConfig;
use crate::registry::HookRegistry;
use crate::service::call::{Call, OperationError};
use crate::service::hook_service::HookService;

/// Build the call pipeline around `registry`.
///
/// Layer order (outermost to innermost):
/// 1. `DeadlineLayer` -- fail calls whose invocation does not settle in time
/// 2. `MetricsLayer` -- record timing and outcome (closest to the registry)
///
/// The returned service implements `tower::Service<Call<T>>`.
#[must_use]
pub fn build_call_pipeline<T>(
    registry: Arc<HookRegistry<T>>,
    config: &HookConfig,
) -> impl tower::Service<Call<T>, Response = Args, Error = OperationError> + Clone
where
    T: Send + Sync + 'static,
{
    ServiceBuilder::new()
        .layer(DeadlineLayer::new(config.default_deadline_ms))
        .layer(MetricsLayer)
        .service(HookService::new(registry))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
