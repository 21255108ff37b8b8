//! Connection endpoints: patient search, doctor→patient requests and the
//! directories built from accepted connections.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::extract::ApiQuery;
use crate::api::types::ApiContext;
use crate::connections;
use crate::models::{
    Caller, ConnectionRequest, DoctorInfo, MessageResponse, PatientProfile, ResolveAction,
};

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub aarogya_id: String,
}

/// `GET /api/patients/search?aarogya_id=`: find one patient.
pub async fn search(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<PatientProfile>, ApiError> {
    let conn = ctx.state.db()?;
    let profile = connections::search_patient(&conn, &caller, &query.aarogya_id)?;
    Ok(Json(profile))
}

/// `POST /api/connections/request/:aarogya_id`
pub async fn send_request(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(aarogya_id): Path<String>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let conn = ctx.state.db()?;
    connections::send_request(&conn, &caller, &aarogya_id, &Utc::now())?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Connection request sent successfully.")),
    ))
}

/// `GET /api/connections/pending`: requests awaiting the calling patient.
pub async fn pending(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<ConnectionRequest>>, ApiError> {
    let conn = ctx.state.db()?;
    Ok(Json(connections::list_pending(&conn, &caller)?))
}

/// `POST /api/connections/:id/accept`
pub async fn accept(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(request_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    resolve(&ctx, &caller, &request_id, ResolveAction::Accept)
}

/// `POST /api/connections/:id/reject`
pub async fn reject(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
    Path(request_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    resolve(&ctx, &caller, &request_id, ResolveAction::Reject)
}

fn resolve(
    ctx: &ApiContext,
    caller: &Caller,
    request_id: &str,
    action: ResolveAction,
) -> Result<Json<MessageResponse>, ApiError> {
    let conn = ctx.state.db()?;
    connections::resolve_request(&conn, caller, request_id, action, &Utc::now())?;
    let message = match action {
        ResolveAction::Accept => "Connection request accepted.",
        ResolveAction::Reject => "Connection request rejected.",
    };
    Ok(Json(MessageResponse::new(message)))
}

/// `GET /api/doctors/connected`
pub async fn connected_doctors(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<DoctorInfo>>, ApiError> {
    let conn = ctx.state.db()?;
    Ok(Json(connections::connected_doctors(&conn, &caller)?))
}

/// `GET /api/doctors/public`
pub async fn public_doctors(
    State(ctx): State<ApiContext>,
) -> Result<Json<Vec<DoctorInfo>>, ApiError> {
    let conn = ctx.state.db()?;
    Ok(Json(connections::public_doctors(&conn)?))
}

/// `GET /api/patients/mine`
pub async fn my_patients(
    State(ctx): State<ApiContext>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<PatientProfile>>, ApiError> {
    let conn = ctx.state.db()?;
    Ok(Json(connections::my_patients(&conn, &caller)?))
}
