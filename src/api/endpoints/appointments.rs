//! Appointment endpoints.
//!
//! - `POST /api/appointments/request`: patient asks for a consultation
//! - `GET /api/appointments`: caller's appointments
//! - `GET /api/appointments/pending`: doctor's queue, oldest first
//! - `POST /api/appointments/:id/{confirm,reject,activate-link,complete}`

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;

use crate::api::error::ApiError;
use crate::api::extract::ApiJson;
use crate::api::types::ApiContext;
use crate::appointments;
use crate::models::{
    Appointment, AppointmentRequestBody, Caller, ConfirmBody, ConfirmResponse, MessageResponse,
    SuccessResponse,
};

pub async fn request(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    ApiJson(body): ApiJson<AppointmentRequestBody>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let conn = ctx.state.db()?;
    let appointment =
        appointments::request_appointment(&conn, &caller, ctx.state.triage(), &body, &Utc::now())?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let conn = ctx.state.db()?;
    Ok(Json(appointments::list_appointments(&conn, &caller)?))
}

pub async fn pending(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let conn = ctx.state.db()?;
    Ok(Json(appointments::pending_queue(&conn, &caller)?))
}

pub async fn confirm(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(appointment_id): Path<String>,
    ApiJson(body): ApiJson<ConfirmBody>,
) -> Result<Json<ConfirmResponse>, ApiError> {
    let conn = ctx.state.db()?;
    let confirmed = appointments::confirm(
        &conn,
        &caller,
        ctx.state.meetings(),
        &appointment_id,
        &body.appointment_time,
        &Utc::now(),
    )?;

    match (confirmed.appointment_time, confirmed.meeting_link) {
        (Some(appointment_time), Some(meeting_link)) => Ok(Json(ConfirmResponse {
            message: "Appointment confirmed.".into(),
            appointment_time,
            meeting_link,
        })),
        _ => Err(ApiError::Internal(format!(
            "confirmed appointment {appointment_id} has no time or link"
        ))),
    }
}

pub async fn reject(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(appointment_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let conn = ctx.state.db()?;
    appointments::reject(&conn, &caller, &appointment_id, &Utc::now())?;
    Ok(Json(MessageResponse::new("Appointment request rejected.")))
}

/// Idempotent.
pub async fn activate_link(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(appointment_id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let conn = ctx.state.db()?;
    appointments::activate_link(&conn, &caller, &appointment_id, &Utc::now())?;
    Ok(Json(SuccessResponse { success: true }))
}

/// Idempotent; always leaves the link inactive.
pub async fn complete(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(appointment_id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let conn = ctx.state.db()?;
    appointments::complete(&conn, &caller, &appointment_id, &Utc::now())?;
    Ok(Json(SuccessResponse { success: true }))
}
