//! Doctor account endpoints.
//!
//! - `POST /api/doctors/me/public`: an approved doctor lists or unlists
//!   themselves in the public directory
//! - `GET /api/admin/doctors/unauthorized`: approval queue (admin token)
//! - `POST /api/admin/doctors/:email/authorize`: approve one doctor (admin token)

use axum::extract::{Path, State};
use axum::{Extension, Json};

use crate::api::error::ApiError;
use crate::api::extract::ApiJson;
use crate::api::types::ApiContext;
use crate::doctors;
use crate::models::{Caller, DoctorInfo, MessageResponse, PublicStatusBody};

pub async fn set_public(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    ApiJson(body): ApiJson<PublicStatusBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    let conn = ctx.state.db()?;
    doctors::set_public_status(&conn, &caller, body.is_public)?;
    Ok(Json(MessageResponse::new(format!(
        "Your public status has been set to {}.",
        body.is_public
    ))))
}

pub async fn unauthorized(
    State(ctx): State<ApiContext>,
) -> Result<Json<Vec<DoctorInfo>>, ApiError> {
    let conn = ctx.state.db()?;
    Ok(Json(doctors::unauthorized_doctors(&conn)?))
}

pub async fn authorize(
    State(ctx): State<ApiContext>,
    Path(email): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let conn = ctx.state.db()?;
    let doctor = doctors::authorize_doctor(&conn, &email)?;
    Ok(Json(MessageResponse::new(format!(
        "Doctor {} is now fully authorized.",
        doctor.email
    ))))
}
