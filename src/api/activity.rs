//! Seat occupancy (scanner) endpoints
//!
//! Handlers capture "now" once and hand it to the workflow, which is a
//! pure function of that timestamp — section label resolution depends on
//! the local time of day.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Local, NaiveDateTime};
use indexmap::IndexMap;

use crate::{
    error::{AppError, AppResult},
    models::activity::{
        ActivityLog, AnalyticsQuery, LeaderboardEntry, ScanRequest, SeatBucket, StudentAnalytics,
        TransferRequest,
    },
};

use super::{AuthenticatedUser, Envelope};

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Check a student into a section
#[utoipa::path(
    post,
    path = "/activity-logs/check-in",
    tag = "activity-logs",
    security(("bearer_auth" = [])),
    request_body = ScanRequest,
    responses(
        (status = 201, description = "Checked in", body = ActivityLog),
        (status = 400, description = "Already checked in, section full, or unknown section"),
        (status = 404, description = "Student not found")
    )
)]
pub async fn check_in(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Json(request): Json<ScanRequest>,
) -> AppResult<(StatusCode, Json<Envelope<ActivityLog>>)> {
    let log = state
        .services
        .occupancy
        .check_in(&request.roll_number, &request.section, local_now())
        .await?;
    Ok((StatusCode::CREATED, Json(Envelope::success(log))))
}

/// Check a student out of a section
#[utoipa::path(
    post,
    path = "/activity-logs/check-out",
    tag = "activity-logs",
    security(("bearer_auth" = [])),
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Checked out", body = ActivityLog),
        (status = 400, description = "No active check-in or unknown section")
    )
)]
pub async fn check_out(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Json(request): Json<ScanRequest>,
) -> AppResult<Json<Envelope<ActivityLog>>> {
    let log = state
        .services
        .occupancy
        .check_out(&request.roll_number, &request.section, local_now())
        .await?;
    Ok(Json(Envelope::success(log)))
}

/// Move an open session to another section. Check-in time is preserved.
#[utoipa::path(
    post,
    path = "/activity-logs/transfer",
    tag = "activity-logs",
    security(("bearer_auth" = [])),
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Session transferred", body = ActivityLog),
        (status = 400, description = "No active check-in, destination full, or unknown section")
    )
)]
pub async fn transfer(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Json(request): Json<TransferRequest>,
) -> AppResult<Json<Envelope<ActivityLog>>> {
    let log = state.services.occupancy.transfer(&request, local_now()).await?;
    Ok(Json(Envelope::success(log)))
}

/// Seat availability snapshot, one entry per bucket
#[utoipa::path(
    get,
    path = "/activity-logs/seats",
    tag = "activity-logs",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Occupancy per seat bucket")
    )
)]
pub async fn seat_availability(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Envelope<IndexMap<&'static str, SeatBucket>>>> {
    let snapshot = state.services.occupancy.seat_availability(local_now()).await?;
    Ok(Json(Envelope::success(snapshot)))
}

/// 30-day analytics for one student. Students see their own numbers;
/// admins may pass any roll number.
#[utoipa::path(
    get,
    path = "/activity-logs/analytics",
    tag = "activity-logs",
    security(("bearer_auth" = [])),
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Student analytics", body = StudentAnalytics),
        (status = 404, description = "Student not found")
    )
)]
pub async fn student_analytics(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<Envelope<StudentAnalytics>>> {
    let roll_number = match query.roll_number {
        Some(roll) if claims.is_admin() => roll,
        Some(roll) => {
            let own = claims
                .roll_number
                .as_deref()
                .map(|r| r.eq_ignore_ascii_case(&roll))
                .unwrap_or(false);
            if !own {
                return Err(AppError::Authorization(
                    "Students may only view their own analytics".to_string(),
                ));
            }
            roll
        }
        None => claims.roll_number.clone().ok_or_else(|| {
            AppError::BadRequest("roll_number is required for this account".to_string())
        })?,
    };

    let analytics = state
        .services
        .occupancy
        .student_analytics(&roll_number, local_now())
        .await?;
    Ok(Json(Envelope::success(analytics)))
}

/// 30-day leaderboard by minutes spent in the library
#[utoipa::path(
    get,
    path = "/activity-logs/leaderboard",
    tag = "activity-logs",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Leaderboard rows", body = Vec<LeaderboardEntry>)
    )
)]
pub async fn leaderboard(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Envelope<Vec<LeaderboardEntry>>>> {
    let entries = state.services.occupancy.leaderboard(local_now()).await?;
    Ok(Json(Envelope::success(entries)))
}
