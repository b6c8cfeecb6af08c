//! Appointment booking and lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, NaiveDateTime, Utc};
use common::{Appointment, AppointmentId, DoctorId, PatientId};
use domain::{AppointmentScheduler, CreateAppointment, UpdateAppointment};
use serde::{Deserialize, Serialize};
use store::AppointmentStore;

use crate::error::{ApiError, parse_id};

/// Shared state of the appointment routes.
pub type AppointmentState<A> = Arc<AppointmentScheduler<A>>;

// -- Request types --

/// Body of `POST /appointments` and `PUT /appointments/{id}`.
#[derive(Deserialize)]
pub struct AppointmentRequest {
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub date_time: NaiveDateTime,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Deserialize)]
pub struct CancelByDoctorRequest {
    #[serde(default)]
    pub justification: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct AppointmentResponse {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub date_time: NaiveDateTime,
    pub status: String,
    pub comment: Option<String>,
    pub cancellation_justification: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Appointment> for AppointmentResponse {
    fn from(appointment: Appointment) -> Self {
        Self {
            id: appointment.id.to_string(),
            patient_id: appointment.patient_id.to_string(),
            doctor_id: appointment.doctor_id.to_string(),
            date_time: appointment.date_time,
            status: appointment.status.to_string(),
            comment: appointment.comment,
            cancellation_justification: appointment.cancellation_justification,
            created_at: appointment.created_at,
            updated_at: appointment.updated_at,
        }
    }
}

fn appointment_list(appointments: Vec<Appointment>) -> Json<Vec<AppointmentResponse>> {
    Json(
        appointments
            .into_iter()
            .map(AppointmentResponse::from)
            .collect(),
    )
}

// -- Handlers --

/// POST /appointments: book an appointment.
#[tracing::instrument(skip(scheduler, payload))]
pub async fn create<A: AppointmentStore + 'static>(
    State(scheduler): State<AppointmentState<A>>,
    payload: Result<Json<AppointmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AppointmentResponse>), ApiError> {
    let Json(req) = payload?;
    let cmd = CreateAppointment {
        patient_id: req.patient_id,
        doctor_id: req.doctor_id,
        date_time: req.date_time,
        comment: req.comment,
    };
    let result = scheduler.create(cmd).await?;

    Ok((StatusCode::CREATED, Json(result.value.into())))
}

/// GET /appointments/{id}: load an appointment.
#[tracing::instrument(skip(scheduler))]
pub async fn get<A: AppointmentStore + 'static>(
    State(scheduler): State<AppointmentState<A>>,
    Path(id): Path<String>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let id: AppointmentId = parse_id(&id, "appointment")?;
    Ok(Json(scheduler.get(id).await?.into()))
}

/// PUT /appointments/{id}: change the booked details.
#[tracing::instrument(skip(scheduler, payload))]
pub async fn update<A: AppointmentStore + 'static>(
    State(scheduler): State<AppointmentState<A>>,
    Path(id): Path<String>,
    payload: Result<Json<AppointmentRequest>, JsonRejection>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let id: AppointmentId = parse_id(&id, "appointment")?;
    let Json(req) = payload?;
    let cmd = UpdateAppointment::new(req.patient_id, req.doctor_id, req.date_time, req.comment);
    let result = scheduler.update(id, cmd).await?;

    Ok(Json(result.value.into()))
}

/// DELETE /appointments/{id}: remove an appointment record.
#[tracing::instrument(skip(scheduler))]
pub async fn delete<A: AppointmentStore + 'static>(
    State(scheduler): State<AppointmentState<A>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: AppointmentId = parse_id(&id, "appointment")?;
    scheduler.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /appointments/{id}/confirm: doctor confirms a pending appointment.
#[tracing::instrument(skip(scheduler))]
pub async fn confirm<A: AppointmentStore + 'static>(
    State(scheduler): State<AppointmentState<A>>,
    Path(id): Path<String>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let id: AppointmentId = parse_id(&id, "appointment")?;
    Ok(Json(scheduler.confirm(id).await?.value.into()))
}

/// POST /appointments/{id}/cancel: patient cancels.
#[tracing::instrument(skip(scheduler))]
pub async fn cancel<A: AppointmentStore + 'static>(
    State(scheduler): State<AppointmentState<A>>,
    Path(id): Path<String>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let id: AppointmentId = parse_id(&id, "appointment")?;
    Ok(Json(scheduler.cancel_by_patient(id).await?.value.into()))
}

/// POST /appointments/{id}/cancel-by-doctor: doctor cancels with a reason.
#[tracing::instrument(skip(scheduler, payload))]
pub async fn cancel_by_doctor<A: AppointmentStore + 'static>(
    State(scheduler): State<AppointmentState<A>>,
    Path(id): Path<String>,
    payload: Result<Json<CancelByDoctorRequest>, JsonRejection>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let id: AppointmentId = parse_id(&id, "appointment")?;
    let Json(req) = payload?;
    let result = scheduler.cancel_by_doctor(id, req.justification).await?;

    Ok(Json(result.value.into()))
}

/// GET /doctors/{doctor_id}/appointments: a doctor's appointments by time.
#[tracing::instrument(skip(scheduler))]
pub async fn list_for_doctor<A: AppointmentStore + 'static>(
    State(scheduler): State<AppointmentState<A>>,
    Path(doctor_id): Path<String>,
) -> Result<Json<Vec<AppointmentResponse>>, ApiError> {
    let doctor_id: DoctorId = parse_id(&doctor_id, "doctor")?;
    Ok(appointment_list(scheduler.list_by_doctor(doctor_id).await?))
}

/// GET /patients/{patient_id}/appointments: a patient's appointments by time.
#[tracing::instrument(skip(scheduler))]
pub async fn list_for_patient<A: AppointmentStore + 'static>(
    State(scheduler): State<AppointmentState<A>>,
    Path(patient_id): Path<String>,
) -> Result<Json<Vec<AppointmentResponse>>, ApiError> {
    let patient_id: PatientId = parse_id(&patient_id, "patient")?;
    Ok(appointment_list(scheduler.list_by_patient(patient_id).await?))
}
