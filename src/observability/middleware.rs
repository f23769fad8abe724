use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use opentelemetry::trace::TraceContextExt;
use std::{sync::Arc, time::Instant};
use tracing::{error, info, instrument, warn, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::Metrics;
use crate::models::{RepositoryResult, ServiceError, ServiceResult};
use crate::repositories::SlotStore;

/// Middleware for automatic request tracing and metrics collection
pub async fn observability_middleware(
    metrics: Arc<Metrics>,
    request: Request,
    next: Next,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let uri = request.uri().to_string();

    let user_agent = request
        .headers()
        .get("user-agent")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    // Group by route template so item ids do not explode label cardinality
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched_path| matched_path.as_str().to_string())
        .unwrap_or_else(|| uri.clone());

    let span_name = format!("{} {}", method, endpoint);
    let span = tracing::info_span!(
        target: "hostelcart_rs::http",
        "{}", span_name,
        otel.name = %span_name,
        otel.kind = "server",
        http.method = %method,
        http.route = %endpoint,
        http.url = %uri,
        http.user_agent = %user_agent,
        http.status_code = tracing::field::Empty,
        http.response_time_ms = tracing::field::Empty,
    );

    async {
        metrics.increment_in_flight(&method, &endpoint);

        let trace_id = tracing::Span::current()
            .context()
            .span()
            .span_context()
            .trace_id()
            .to_string();

        info!(trace_id = %trace_id, method = %method, path = %endpoint, "Processing request");

        let response = next.run(request).await;

        let duration = start_time.elapsed();
        let duration_ms = duration.as_millis();
        let status_code = response.status().as_u16();

        let current_span = tracing::Span::current();
        current_span.record("http.status_code", status_code);
        current_span.record("http.response_time_ms", duration_ms);
        let span_context = current_span.context();
        let otel_span = span_context.span();
        if status_code >= 500 {
            otel_span.set_status(opentelemetry::trace::Status::error("HTTP error"));
        } else {
            otel_span.set_status(opentelemetry::trace::Status::Ok);
        }

        metrics.record_http_request(&method, &endpoint, status_code, duration.as_secs_f64());
        metrics.decrement_in_flight(&method, &endpoint);

        if status_code >= 500 {
            error!(
                trace_id = %trace_id,
                method = %method,
                path = %endpoint,
                status_code = status_code,
                duration_ms = duration_ms,
                "Request completed with error"
            );
        } else if status_code >= 400 {
            warn!(
                trace_id = %trace_id,
                method = %method,
                path = %endpoint,
                status_code = status_code,
                duration_ms = duration_ms,
                "Request rejected"
            );
        } else {
            info!(
                trace_id = %trace_id,
                method = %method,
                path = %endpoint,
                status_code = status_code,
                duration_ms = duration_ms,
                "Request completed successfully"
            );
        }

        response
    }
    .instrument(span)
    .await
}

/// Slot store decorator recording storage metrics for every call
pub struct TracedSlotStore {
    inner: Arc<dyn SlotStore>,
    metrics: Arc<Metrics>,
}

impl TracedSlotStore {
    pub fn new(inner: Arc<dyn SlotStore>, metrics: Arc<Metrics>) -> Self {
        Self { inner, metrics }
    }

    fn trace<T>(
        &self,
        operation: &str,
        key: &str,
        call: impl FnOnce() -> RepositoryResult<T>,
    ) -> RepositoryResult<T> {
        let start_time = Instant::now();
        let result = call();
        let duration_seconds = start_time.elapsed().as_secs_f64();

        self.metrics
            .record_storage_operation(operation, result.is_ok(), duration_seconds);
        if let Err(e) = &result {
            error!(operation, key, error = %e, "Slot storage operation failed");
        }
        result
    }
}

impl SlotStore for TracedSlotStore {
    fn read(&self, key: &str) -> RepositoryResult<Option<String>> {
        self.trace("read", key, || self.inner.read(key))
    }

    fn write(&self, key: &str, value: &str) -> RepositoryResult<()> {
        self.trace("write", key, || self.inner.write(key, value))
    }

    fn delete(&self, key: &str) -> RepositoryResult<()> {
        self.trace("delete", key, || self.inner.delete(key))
    }
}

/// Outcome label for a booking submission
pub fn submission_status(result: &ServiceResult<impl Sized>) -> &'static str {
    match result {
        Ok(_) => "confirmed",
        Err(ServiceError::BookingRejected { .. }) => "rejected",
        Err(ServiceError::PartialBooking { .. }) => "partial",
        Err(ServiceError::SubmissionInFlight) => "in_flight",
        Err(ServiceError::EmptyCart) | Err(ServiceError::ValidationError { .. }) => "invalid",
        Err(ServiceError::Unauthenticated) | Err(ServiceError::Forbidden { .. }) => {
            "unauthorized"
        }
        Err(_) => "error",
    }
}

/// Middleware for business operation tracing
pub struct BusinessTracingMiddleware {
    metrics: Arc<Metrics>,
}

impl BusinessTracingMiddleware {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }

    /// Trace a synchronous cart operation
    pub fn trace_cart_operation<T, E>(
        &self,
        operation: &str,
        call: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: std::fmt::Display,
    {
        let span = tracing::info_span!("cart_operation", operation = %operation);
        let _entered = span.enter();
        let start_time = Instant::now();

        match call() {
            Ok(result) => {
                self.metrics.record_cart_operation(operation, true);
                info!(
                    duration_ms = start_time.elapsed().as_millis(),
                    "Cart operation completed successfully"
                );
                Ok(result)
            }
            Err(error) => {
                self.metrics.record_cart_operation(operation, false);
                warn!(
                    error = %error,
                    duration_ms = start_time.elapsed().as_millis(),
                    "Cart operation failed"
                );
                Err(error)
            }
        }
    }

    /// Trace a booking submission and count it by outcome
    #[instrument(skip_all)]
    pub async fn trace_booking_submission<F, T>(&self, future: F) -> ServiceResult<T>
    where
        F: std::future::Future<Output = ServiceResult<T>>,
    {
        let start_time = Instant::now();

        let result = future.await;
        let status = submission_status(&result);
        self.metrics.record_booking_submission(status);

        match &result {
            Ok(_) => info!(
                status,
                duration_ms = start_time.elapsed().as_millis(),
                "Booking submission completed"
            ),
            Err(error) => warn!(
                status,
                error = %error,
                duration_ms = start_time.elapsed().as_millis(),
                "Booking submission failed"
            ),
        }

        result
    }
}
