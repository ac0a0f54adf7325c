//! Metrics middleware for calls.
//!
//! Records call duration and outcome on `tracing` spans. A call whose
//! future is dropped before it resolves (an outer deadline fired, or the
//! caller gave up) is recorded with outcome `cancelled`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use hookline_core::Args;
use tower::{Layer, Service};
use tracing::{info_span, Instrument, Span};

use crate::service::call::{Call, OperationError};

// ---------------------------------------------------------------------------
// MetricsLayer
// ---------------------------------------------------------------------------

/// Tower layer that instruments calls with timing and outcome via `tracing` spans.
#[derive(Debug, Clone)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner }
    }
}

// ---------------------------------------------------------------------------
// MetricsService
// ---------------------------------------------------------------------------

/// Service wrapper that records call duration and outcome in tracing spans.
#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

fn outcome_label(result: &Result<Args, OperationError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        // Only seen when this layer sits outside the deadline layer.
        Err(OperationError::Timeout { .. }) => "timeout",
        Err(OperationError::Chain(_)) => "chain_error",
        Err(OperationError::Abandoned { .. }) => "abandoned",
        Err(OperationError::Hook(_)) => "rejected",
    }
}

/// Timing for one call. Records its outcome exactly once: when the call
/// resolves, or as `cancelled` when dropped first.
struct CallRecord {
    operation: String,
    span: Span,
    start: Instant,
    recorded: bool,
}

impl CallRecord {
    fn start(operation: String, span: Span) -> Self {
        Self {
            operation,
            span,
            start: Instant::now(),
            recorded: false,
        }
    }

    fn finish(&mut self, outcome: &'static str) {
        if self.recorded {
            return;
        }
        self.recorded = true;

        #[allow(clippy::cast_possible_truncation)]
        let duration_u64 = self.start.elapsed().as_millis() as u64;
        self.span.record("duration_ms", duration_u64);
        self.span.record("outcome", outcome);

        self.span.in_scope(|| {
            tracing::info!(
                operation = %self.operation,
                duration_ms = duration_u64,
                outcome = outcome,
                "call complete"
            );
        });
    }
}

impl Drop for CallRecord {
    fn drop(&mut self) {
        self.finish("cancelled");
    }
}

impl<S, T> Service<Call<T>> for MetricsService<S>
where
    S: Service<Call<T>, Response = Args, Error = OperationError> + Send,
    S::Future: Send + 'static,
{
    type Response = Args;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<Args, OperationError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, call: Call<T>) -> Self::Future {
        let operation = call.operation.clone();
        let argc = call.args.len();

        let span = info_span!(
            "hook_call",
            operation = %operation,
            argc = argc,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        let fut = self.inner.call(call);
        let mut record = CallRecord::start(operation, span.clone());

        Box::pin(
            async move {
                let result = fut.await;
                record.finish(outcome_label(&result));
                result
            }
            .instrument(span),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use hookline_core::ChainError;
    use parking_lot::Mutex;
    use tower::ServiceExt;
    use tracing_subscriber::layer::SubscriberExt as _;

    use super::*;
    use crate::service::middleware::DeadlineLayer;

    /// Collects the fields of every event emitted while installed.
    #[derive(Clone, Default)]
    struct CaptureLayer {
        events: Arc<Mutex<Vec<BTreeMap<String, String>>>>,
    }

    struct FieldVisitor<'a> {
        fields: &'a mut BTreeMap<String, String>,
    }

    impl tracing::field::Visit for FieldVisitor<'_> {
        fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
            self.fields.insert(field.name().to_string(), value.to_string());
        }

        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            self.fields
                .insert(field.name().to_string(), format!("{value:?}"));
        }
    }

    impl<S> tracing_subscriber::Layer<S> for CaptureLayer
    where
        S: tracing::Subscriber,
    {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let mut fields = BTreeMap::new();
            event.record(&mut FieldVisitor {
                fields: &mut fields,
            });
            self.events.lock().push(fields);
        }
    }

    impl CaptureLayer {
        fn outcomes(&self) -> Vec<String> {
            self.events
                .lock()
                .iter()
                .filter_map(|fields| fields.get("outcome").cloned())
                .collect()
        }
    }

    /// Service whose response never arrives.
    struct PendingService;

    impl Service<Call<()>> for PendingService {
        type Response = Args;
        type Error = OperationError;
        type Future = Pin<Box<dyn Future<Output = Result<Args, OperationError>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _call: Call<()>) -> Self::Future {
            Box::pin(std::future::pending::<Result<Args, OperationError>>())
        }
    }

    /// Immediately-completing service that echoes the call arguments.
    struct EchoService;

    impl Service<Call<()>> for EchoService {
        type Response = Args;
        type Error = OperationError;
        type Future = Pin<Box<dyn Future<Output = Result<Args, OperationError>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, call: Call<()>) -> Self::Future {
            Box::pin(async move { Ok(call.args) })
        }
    }

    #[tokio::test]
    async fn metrics_layer_passes_through_response() {
        let svc = MetricsLayer.layer(EchoService);
        let args = svc
            .oneshot(Call::new(Arc::new(()), "save", [1, 2]))
            .await
            .unwrap();
        assert_eq!(args, Args::from([1, 2]));
    }

    #[tokio::test]
    async fn resolved_call_records_its_outcome() {
        let capture = CaptureLayer::default();
        let _guard = tracing::subscriber::set_default(
            tracing_subscriber::registry().with(capture.clone()),
        );

        let svc = MetricsLayer.layer(EchoService);
        svc.oneshot(Call::new(Arc::new(()), "save", ()))
            .await
            .unwrap();

        assert_eq!(capture.outcomes(), vec!["ok"]);
    }

    #[tokio::test]
    async fn call_cut_off_by_outer_deadline_is_recorded_as_cancelled() {
        let capture = CaptureLayer::default();
        let _guard = tracing::subscriber::set_default(
            tracing_subscriber::registry().with(capture.clone()),
        );

        let svc = DeadlineLayer::new(20).layer(MetricsLayer.layer(PendingService));
        let err = svc
            .oneshot(Call::new(Arc::new(()), "save", ()))
            .await
            .unwrap_err();

        assert!(matches!(err, OperationError::Timeout { timeout_ms: 20 }));
        assert_eq!(capture.outcomes(), vec!["cancelled"]);
    }

    #[test]
    fn outcome_labels_distinguish_failures() {
        assert_eq!(outcome_label(&Ok(Args::new())), "ok");
        assert_eq!(
            outcome_label(&Err(OperationError::Timeout { timeout_ms: 1 })),
            "timeout"
        );
        assert_eq!(
            outcome_label(&Err(OperationError::Chain(ChainError::msg("x")))),
            "chain_error"
        );
        assert_eq!(
            outcome_label(&Err(OperationError::Abandoned {
                operation: "save".to_string()
            })),
            "abandoned"
        );
    }
}
