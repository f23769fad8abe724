use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{
    BookingConfirmation, CartItemPatch, CartLineItem, CartSummary, NewCartLineItem,
    RepositoryError, ServiceError, SubmitBookingRequest,
};
use crate::observability::{BusinessTracingMiddleware, Metrics};
use crate::repositories::SlotStore;
use crate::services::{lock_cart, BookingService, CartStore, Session, SharedCart};

type ApiError = (StatusCode, Json<Value>);

/// Slot keys the session is read from
#[derive(Debug, Clone)]
pub struct SessionKeys {
    pub user_key: String,
    pub role_key: String,
}

/// Shared application state containing the cart and its services
#[derive(Clone)]
pub struct ApiState {
    pub cart: SharedCart,
    pub booking_service: Arc<BookingService>,
    pub session_store: Arc<dyn SlotStore>,
    pub session_keys: SessionKeys,
    pub tracer: Arc<BusinessTracingMiddleware>,
    pub metrics: Arc<Metrics>,
}

impl ApiState {
    pub fn new(
        cart: SharedCart,
        booking_service: Arc<BookingService>,
        session_store: Arc<dyn SlotStore>,
        session_keys: SessionKeys,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            cart,
            booking_service,
            session_store,
            session_keys,
            tracer: Arc::new(BusinessTracingMiddleware::new(metrics.clone())),
            metrics,
        }
    }

    fn publish_cart_size(&self, cart: &CartStore) {
        self.metrics.set_cart_size(cart.len(), cart.item_count());
    }

    fn load_session(&self) -> Session {
        Session::load(
            self.session_store.as_ref(),
            &self.session_keys.user_key,
            &self.session_keys.role_key,
        )
    }
}

/// Create API router with all cart endpoints
pub fn create_api_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/cart", get(get_cart).delete(clear_cart))
        .route("/api/cart/items", post(add_cart_item))
        .route(
            "/api/cart/items/:item_id",
            patch(update_cart_item).delete(remove_cart_item),
        )
        .route("/api/cart/checkout", post(checkout_cart))
        .with_state(state)
}

/// Get the cart with its derived totals
#[instrument(skip(state))]
pub async fn get_cart(State(state): State<ApiState>) -> Result<Json<CartSummary>, ApiError> {
    let cart = lock_cart(&state.cart).map_err(service_error_to_response)?;
    let summary = cart.summary();
    state.publish_cart_size(&cart);

    info!(
        line_count = summary.line_count,
        item_count = summary.item_count,
        "Retrieved cart"
    );
    Ok(Json(summary))
}

/// Add a line item, merging into an identical one
#[instrument(skip(state, request), fields(room_id = %request.room_id))]
pub async fn add_cart_item(
    State(state): State<ApiState>,
    Json(request): Json<NewCartLineItem>,
) -> Result<(StatusCode, Json<CartLineItem>), ApiError> {
    let mut cart = lock_cart(&state.cart).map_err(service_error_to_response)?;
    let item = state
        .tracer
        .trace_cart_operation("add_item", || cart.add(request))
        .map_err(service_error_to_response)?;
    state.publish_cart_size(&cart);

    Ok((StatusCode::CREATED, Json(item)))
}

/// Patch one line item; totals are recomputed
#[instrument(skip(state, patch))]
pub async fn update_cart_item(
    State(state): State<ApiState>,
    Path(item_id): Path<Uuid>,
    Json(patch): Json<CartItemPatch>,
) -> Result<Json<CartLineItem>, ApiError> {
    let mut cart = lock_cart(&state.cart).map_err(service_error_to_response)?;
    let updated = state
        .tracer
        .trace_cart_operation("update_item", || cart.update_item(item_id, &patch))
        .map_err(service_error_to_response)?;
    state.publish_cart_size(&cart);

    updated
        .map(Json)
        .ok_or_else(|| service_error_to_response(ServiceError::CartItemNotFound { id: item_id }))
}

/// Remove one line item
#[instrument(skip(state))]
pub async fn remove_cart_item(
    State(state): State<ApiState>,
    Path(item_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let mut cart = lock_cart(&state.cart).map_err(service_error_to_response)?;
    let removed = state
        .tracer
        .trace_cart_operation("remove_item", || cart.remove(item_id))
        .map_err(service_error_to_response)?;
    state.publish_cart_size(&cart);

    match removed {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(service_error_to_response(ServiceError::CartItemNotFound {
            id: item_id,
        })),
    }
}

/// Empty the cart and delete its slot
#[instrument(skip(state))]
pub async fn clear_cart(State(state): State<ApiState>) -> Result<StatusCode, ApiError> {
    let mut cart = lock_cart(&state.cart).map_err(service_error_to_response)?;
    state
        .tracer
        .trace_cart_operation("clear", || cart.clear())
        .map_err(service_error_to_response)?;
    state.publish_cart_size(&cart);

    Ok(StatusCode::NO_CONTENT)
}

/// Submit the whole cart as bookings
#[instrument(skip(state, request))]
pub async fn checkout_cart(
    State(state): State<ApiState>,
    Json(request): Json<SubmitBookingRequest>,
) -> Result<(StatusCode, Json<BookingConfirmation>), ApiError> {
    let session = state.load_session();

    let result = state
        .tracer
        .trace_booking_submission(state.booking_service.submit(&session, request))
        .await;

    if let Ok(cart) = lock_cart(&state.cart) {
        state.publish_cart_size(&cart);
    }

    let confirmation = result.map_err(service_error_to_response)?;
    crate::info_with_trace!(
        booking_count = confirmation.booking_ids.len(),
        "Checkout completed"
    );
    Ok((StatusCode::CREATED, Json(confirmation)))
}

/// Convert ServiceError to HTTP response
pub fn service_error_to_response(err: ServiceError) -> ApiError {
    let timestamp = chrono::Utc::now().to_rfc3339();

    if let ServiceError::PartialBooking { created, .. } = &err {
        return (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "error": err.to_string(),
                "bookingIds": created,
                "timestamp": timestamp,
            })),
        );
    }

    let (status, message) = match &err {
        ServiceError::CartItemNotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        ServiceError::EmptyCart => (StatusCode::BAD_REQUEST, err.to_string()),
        ServiceError::ValidationError { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        ServiceError::Unauthenticated => (StatusCode::UNAUTHORIZED, err.to_string()),
        ServiceError::Forbidden { .. } => (StatusCode::FORBIDDEN, err.to_string()),
        ServiceError::SubmissionInFlight => (StatusCode::CONFLICT, err.to_string()),
        ServiceError::BookingRejected { .. } | ServiceError::PartialBooking { .. } => {
            (StatusCode::BAD_GATEWAY, err.to_string())
        }
        ServiceError::Repository { source } => match source {
            RepositoryError::RemoteStatus { .. } | RepositoryError::Transport { .. } => (
                StatusCode::BAD_GATEWAY,
                "Booking service unavailable".to_string(),
            ),
            RepositoryError::Timeout => (
                StatusCode::BAD_GATEWAY,
                "Booking service timed out".to_string(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        },
        ServiceError::Configuration { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Configuration error".to_string(),
        ),
    };

    (
        status,
        Json(json!({
            "error": message,
            "timestamp": timestamp,
        })),
    )
}
