//! Slot management and availability query endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use common::{AvailabilitySlot, DayOfWeek, DoctorId, SlotId};
use domain::{AddSlot, AvailabilityManager, UpdateSlot};
use serde::{Deserialize, Serialize};
use store::AvailabilityStore;

use crate::error::{ApiError, parse_id};

/// Shared state of the availability routes.
pub type AvailabilityState<S> = Arc<AvailabilityManager<S>>;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateSlotRequest {
    pub doctor_id: DoctorId,
    pub day_of_week: DayOfWeek,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Body of `PUT /slots/{id}`. Any doctor or weekday sent along is ignored.
#[derive(Deserialize)]
pub struct UpdateSlotRequest {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Deserialize)]
pub struct DayQuery {
    pub day: Option<DayOfWeek>,
}

#[derive(Deserialize)]
pub struct AtQuery {
    pub at: NaiveDateTime,
}

#[derive(Deserialize)]
pub struct DateRangeQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Deserialize)]
pub struct IntervalQuery {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Deserialize)]
pub struct AvailableDoctorsQuery {
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

// -- Response types --

#[derive(Serialize)]
pub struct SlotResponse {
    pub id: String,
    pub doctor_id: String,
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
}

impl From<AvailabilitySlot> for SlotResponse {
    fn from(slot: AvailabilitySlot) -> Self {
        Self {
            id: slot.id.to_string(),
            doctor_id: slot.doctor_id.to_string(),
            day_of_week: slot.day_of_week.to_string(),
            start_time: slot.start_time.format("%H:%M:%S").to_string(),
            end_time: slot.end_time.format("%H:%M:%S").to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub doctor_id: String,
    pub at: NaiveDateTime,
    pub available: bool,
}

#[derive(Serialize)]
pub struct AvailableTimeResponse {
    pub doctor_id: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Whole minutes; sub-minute remainders are truncated.
    pub total_minutes: i64,
    /// Exact total, including sub-minute slot bounds.
    pub total_seconds: i64,
}

#[derive(Serialize)]
pub struct AvailableDoctorsResponse {
    pub doctor_ids: Vec<String>,
}

fn slot_list(slots: Vec<AvailabilitySlot>) -> Json<Vec<SlotResponse>> {
    Json(slots.into_iter().map(SlotResponse::from).collect())
}

// -- Handlers --

/// GET /slots: list every slot.
#[tracing::instrument(skip(manager))]
pub async fn list<S: AvailabilityStore + 'static>(
    State(manager): State<AvailabilityState<S>>,
) -> Result<Json<Vec<SlotResponse>>, ApiError> {
    Ok(slot_list(manager.list_all().await?))
}

/// POST /slots: add a recurring slot.
#[tracing::instrument(skip(manager, payload))]
pub async fn create<S: AvailabilityStore + 'static>(
    State(manager): State<AvailabilityState<S>>,
    payload: Result<Json<CreateSlotRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SlotResponse>), ApiError> {
    let Json(req) = payload?;
    let cmd = AddSlot::new(req.doctor_id, req.day_of_week, req.start_time, req.end_time);
    let result = manager.add_slot(cmd).await?;

    Ok((StatusCode::CREATED, Json(result.value.into())))
}

/// GET /slots/{id}: load a slot.
#[tracing::instrument(skip(manager))]
pub async fn get<S: AvailabilityStore + 'static>(
    State(manager): State<AvailabilityState<S>>,
    Path(id): Path<String>,
) -> Result<Json<SlotResponse>, ApiError> {
    let id: SlotId = parse_id(&id, "slot")?;
    Ok(Json(manager.get_slot(id).await?.into()))
}

/// PUT /slots/{id}: change a slot's hours.
#[tracing::instrument(skip(manager, payload))]
pub async fn update<S: AvailabilityStore + 'static>(
    State(manager): State<AvailabilityState<S>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateSlotRequest>, JsonRejection>,
) -> Result<Json<SlotResponse>, ApiError> {
    let id: SlotId = parse_id(&id, "slot")?;
    let Json(req) = payload?;
    let result = manager
        .update_slot(id, UpdateSlot::new(req.start_time, req.end_time))
        .await?;

    Ok(Json(result.value.into()))
}

/// DELETE /slots/{id}: remove a slot.
#[tracing::instrument(skip(manager))]
pub async fn delete<S: AvailabilityStore + 'static>(
    State(manager): State<AvailabilityState<S>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: SlotId = parse_id(&id, "slot")?;
    manager.delete_slot(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /doctors/{doctor_id}/slots: list a doctor's slots, optionally for one day.
#[tracing::instrument(skip(manager, query))]
pub async fn list_for_doctor<S: AvailabilityStore + 'static>(
    State(manager): State<AvailabilityState<S>>,
    Path(doctor_id): Path<String>,
    query: Result<Query<DayQuery>, QueryRejection>,
) -> Result<Json<Vec<SlotResponse>>, ApiError> {
    let doctor_id: DoctorId = parse_id(&doctor_id, "doctor")?;
    let Query(query) = query?;

    let slots = match query.day {
        Some(day) => manager.list_by_doctor_and_day(doctor_id, day).await?,
        None => manager.list_by_doctor(doctor_id).await?,
    };
    Ok(slot_list(slots))
}

/// DELETE /doctors/{doctor_id}/slots: remove every slot of a doctor.
#[tracing::instrument(skip(manager))]
pub async fn delete_for_doctor<S: AvailabilityStore + 'static>(
    State(manager): State<AvailabilityState<S>>,
    Path(doctor_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let doctor_id: DoctorId = parse_id(&doctor_id, "doctor")?;
    manager.delete_all_for_doctor(doctor_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /doctors/{doctor_id}/availability?at=: point-in-time availability.
#[tracing::instrument(skip(manager, query))]
pub async fn availability<S: AvailabilityStore + 'static>(
    State(manager): State<AvailabilityState<S>>,
    Path(doctor_id): Path<String>,
    query: Result<Query<AtQuery>, QueryRejection>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let doctor_id: DoctorId = parse_id(&doctor_id, "doctor")?;
    let Query(AtQuery { at }) = query?;
    let available = manager.is_available(doctor_id, at).await?;

    Ok(Json(AvailabilityResponse {
        doctor_id: doctor_id.to_string(),
        at,
        available,
    }))
}

/// GET /doctors/{doctor_id}/available-time?from=&to=: summed slot time.
#[tracing::instrument(skip(manager, query))]
pub async fn available_time<S: AvailabilityStore + 'static>(
    State(manager): State<AvailabilityState<S>>,
    Path(doctor_id): Path<String>,
    query: Result<Query<DateRangeQuery>, QueryRejection>,
) -> Result<Json<AvailableTimeResponse>, ApiError> {
    let doctor_id: DoctorId = parse_id(&doctor_id, "doctor")?;
    let Query(DateRangeQuery { from, to }) = query?;
    let total = manager.total_available_time(doctor_id, from, to).await?;

    Ok(Json(AvailableTimeResponse {
        doctor_id: doctor_id.to_string(),
        from,
        to,
        total_minutes: total.num_minutes(),
        total_seconds: total.num_seconds(),
    }))
}

/// GET /doctors/{doctor_id}/slots-in-interval?start=&end=: slots occurring
/// inside a datetime interval.
#[tracing::instrument(skip(manager, query))]
pub async fn slots_in_interval<S: AvailabilityStore + 'static>(
    State(manager): State<AvailabilityState<S>>,
    Path(doctor_id): Path<String>,
    query: Result<Query<IntervalQuery>, QueryRejection>,
) -> Result<Json<Vec<SlotResponse>>, ApiError> {
    let doctor_id: DoctorId = parse_id(&doctor_id, "doctor")?;
    let Query(IntervalQuery { start, end }) = query?;

    Ok(slot_list(
        manager.slots_in_interval(doctor_id, start, end).await?,
    ))
}

/// GET /doctors/available?date=&start_time=&end_time=: doctors free in a window.
#[tracing::instrument(skip(manager, query))]
pub async fn available_doctors<S: AvailabilityStore + 'static>(
    State(manager): State<AvailabilityState<S>>,
    query: Result<Query<AvailableDoctorsQuery>, QueryRejection>,
) -> Result<Json<AvailableDoctorsResponse>, ApiError> {
    let Query(query) = query?;
    let doctors = manager
        .find_available_doctors(query.date, query.start_time, query.end_time)
        .await?;

    Ok(Json(AvailableDoctorsResponse {
        doctor_ids: doctors.into_iter().map(|id| id.to_string()).collect(),
    }))
}
