//! HTTP API server with observability for the clinic scheduling core.
//!
//! Provides REST endpoints for doctor availability and appointment booking,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use domain::{AppointmentScheduler, AvailabilityManager};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{
    AppointmentStore, AvailabilityStore, EventSink, InMemoryAppointmentStore,
    InMemoryAvailabilityStore, InMemoryEventSink,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::availability as slots;
use routes::appointments;
use routes::health::ServiceInfo;

/// Shared application state: one service per aggregate.
pub struct AppState<S: AvailabilityStore, A: AppointmentStore> {
    pub availability: Arc<AvailabilityManager<S>>,
    pub appointments: Arc<AppointmentScheduler<A>>,
    pub info: ServiceInfo,
}

impl<S: AvailabilityStore, A: AppointmentStore> Clone for AppState<S, A> {
    fn clone(&self) -> Self {
        Self {
            availability: self.availability.clone(),
            appointments: self.appointments.clone(),
            info: self.info,
        }
    }
}

/// Wires the services over the given stores, all publishing to `sink`.
///
/// With `enforce_availability`, the scheduler consults the availability
/// manager before every booking.
pub fn build_state<S, A>(
    slots: S,
    appointments: A,
    sink: Arc<dyn EventSink>,
    storage: &'static str,
    enforce_availability: bool,
) -> AppState<S, A>
where
    S: AvailabilityStore + 'static,
    A: AppointmentStore + 'static,
{
    let availability = Arc::new(AvailabilityManager::new(slots, sink.clone()));

    let mut scheduler = AppointmentScheduler::new(appointments, sink);
    if enforce_availability {
        scheduler = scheduler.with_availability_policy(availability.clone());
    }

    AppState {
        availability,
        appointments: Arc::new(scheduler),
        info: ServiceInfo {
            storage,
            enforce_availability,
        },
    }
}

/// Creates application state over in-memory stores.
///
/// Returns the event sink too, so callers can inspect what was published.
pub fn create_default_state(
    enforce_availability: bool,
) -> (
    AppState<InMemoryAvailabilityStore, InMemoryAppointmentStore>,
    Arc<InMemoryEventSink>,
) {
    let sink = Arc::new(InMemoryEventSink::new());
    let state = build_state(
        InMemoryAvailabilityStore::new(),
        InMemoryAppointmentStore::new(),
        sink.clone(),
        "memory",
        enforce_availability,
    );
    (state, sink)
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, A>(state: AppState<S, A>, metrics_handle: PrometheusHandle) -> Router
where
    S: AvailabilityStore + 'static,
    A: AppointmentStore + 'static,
{
    let ops_router = Router::new()
        .route("/health", get(routes::health::check))
        .with_state(state.info)
        .merge(
            Router::new()
                .route("/metrics", get(routes::metrics::get))
                .with_state(metrics_handle),
        );

    let availability_router = Router::new()
        .route("/slots", get(slots::list::<S>).post(slots::create::<S>))
        .route(
            "/slots/{id}",
            get(slots::get::<S>)
                .put(slots::update::<S>)
                .delete(slots::delete::<S>),
        )
        .route(
            "/doctors/{doctor_id}/slots",
            get(slots::list_for_doctor::<S>).delete(slots::delete_for_doctor::<S>),
        )
        .route(
            "/doctors/{doctor_id}/availability",
            get(slots::availability::<S>),
        )
        .route(
            "/doctors/{doctor_id}/available-time",
            get(slots::available_time::<S>),
        )
        .route(
            "/doctors/{doctor_id}/slots-in-interval",
            get(slots::slots_in_interval::<S>),
        )
        .route("/doctors/available", get(slots::available_doctors::<S>))
        .with_state(state.availability);

    let appointment_router = Router::new()
        .route("/appointments", post(appointments::create::<A>))
        .route(
            "/appointments/{id}",
            get(appointments::get::<A>)
                .put(appointments::update::<A>)
                .delete(appointments::delete::<A>),
        )
        .route(
            "/appointments/{id}/confirm",
            post(appointments::confirm::<A>),
        )
        .route("/appointments/{id}/cancel", post(appointments::cancel::<A>))
        .route(
            "/appointments/{id}/cancel-by-doctor",
            post(appointments::cancel_by_doctor::<A>),
        )
        .route(
            "/doctors/{doctor_id}/appointments",
            get(appointments::list_for_doctor::<A>),
        )
        .route(
            "/patients/{patient_id}/appointments",
            get(appointments::list_for_patient::<A>),
        )
        .with_state(state.appointments);

    Router::new()
        .merge(ops_router)
        .merge(availability_router)
        .merge(appointment_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
