// File: crates/slotwise_gcal/src/routes.rs
use crate::handlers::{
    auth_callback_handler, auth_start_handler, auth_status_handler, availability_handler,
    create_booking_handler, list_calendars_handler, GcalState,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Booking and authorization routes, parameterized on injected state.
pub fn routes(state: Arc<GcalState>) -> Router {
    Router::new()
        .route("/availability", get(availability_handler))
        .route("/bookings", post(create_booking_handler))
        .route("/auth/status", get(auth_status_handler))
        .route("/auth/calendars", get(list_calendars_handler))
        .route("/auth/google", get(auth_start_handler))
        .route("/auth/callback", get(auth_callback_handler))
        .with_state(state)
}
