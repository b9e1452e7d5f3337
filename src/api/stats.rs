//! Dashboard statistics endpoints and response types

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, AppResult};

use super::{AuthenticatedUser, Envelope};

/// Aggregate dashboard data for the admin overview
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminAnalytics {
    pub active_loans: i64,
    pub overdue_loans: i64,
    pub borrows_last_30_days: i64,
    pub returns_last_30_days: i64,
    /// Borrow counts per hour of day over the trailing 30 days
    pub hourly_borrows: Vec<i64>,
    pub trends: TrendDeltas,
}

/// Percentage change of the trailing 30-day window against the 30 days
/// before it
#[derive(Debug, Serialize, ToSchema)]
pub struct TrendDeltas {
    pub borrows_pct: f64,
    pub returns_pct: f64,
}

/// Per-hour check-in counts for one day
#[derive(Debug, Serialize, ToSchema)]
pub struct DailyTraffic {
    pub date: NaiveDate,
    pub total: i64,
    pub hourly: Vec<i64>,
}

/// Daily traffic query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct DailyTrafficQuery {
    /// Day to report on (YYYY-MM-DD); defaults to today
    pub date: Option<String>,
}

/// Admin dashboard aggregates
#[utoipa::path(
    get,
    path = "/borrow-records/admin-analytics",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard aggregates", body = AdminAnalytics)
    )
)]
pub async fn admin_analytics(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Envelope<AdminAnalytics>>> {
    claims.require_admin()?;

    let analytics = state.services.stats.admin_analytics(Utc::now()).await?;
    Ok(Json(Envelope::success(analytics)))
}

/// Hourly check-in traffic for one day
#[utoipa::path(
    get,
    path = "/borrow-records/daily-traffic",
    tag = "stats",
    security(("bearer_auth" = [])),
    params(DailyTrafficQuery),
    responses(
        (status = 200, description = "Hourly check-in counts", body = DailyTraffic)
    )
)]
pub async fn daily_traffic(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<DailyTrafficQuery>,
) -> AppResult<Json<Envelope<DailyTraffic>>> {
    claims.require_admin()?;

    let date = match query.date {
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map_err(|_| AppError::Validation("Invalid date format, expected YYYY-MM-DD".to_string()))?,
        None => Local::now().date_naive(),
    };

    let traffic = state.services.stats.daily_traffic(date).await?;
    Ok(Json(Envelope::success(traffic)))
}
