//! Borrow record endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::borrow::{
        BorrowDetails, BorrowList, BorrowQuery, BorrowRecord, CreateBorrow, ExtendBorrow, PayFine,
        ReturnBorrow, SendReminder, UpdateBorrow,
    },
};

use super::{AuthenticatedUser, Envelope};

/// Issue a book to a student
#[utoipa::path(
    post,
    path = "/borrow-records/borrow",
    tag = "borrow-records",
    security(("bearer_auth" = [])),
    request_body = CreateBorrow,
    responses(
        (status = 201, description = "Borrow record created", body = BorrowDetails),
        (status = 400, description = "No copies, book unavailable, or borrow limit reached"),
        (status = 404, description = "Student or book not found")
    )
)]
pub async fn borrow(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBorrow>,
) -> AppResult<(StatusCode, Json<Envelope<BorrowDetails>>)> {
    claims.require_admin()?;

    let details = state.services.circulation.borrow(request, &claims.sub).await?;
    Ok((StatusCode::CREATED, Json(Envelope::success(details))))
}

/// List borrow records
#[utoipa::path(
    get,
    path = "/borrow-records",
    tag = "borrow-records",
    security(("bearer_auth" = [])),
    params(BorrowQuery),
    responses(
        (status = 200, description = "Paginated borrow record list", body = BorrowList)
    )
)]
pub async fn list_records(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowQuery>,
) -> AppResult<Json<Envelope<BorrowList>>> {
    claims.require_admin()?;

    let records = state.services.circulation.list(query).await?;
    Ok(Json(Envelope::success(records)))
}

/// Get one borrow record with its book and student
#[utoipa::path(
    get,
    path = "/borrow-records/{id}",
    tag = "borrow-records",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow record ID")),
    responses(
        (status = 200, description = "Borrow record", body = BorrowDetails),
        (status = 404, description = "Record not found")
    )
)]
pub async fn get_record(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(record_id): Path<i32>,
) -> AppResult<Json<Envelope<BorrowDetails>>> {
    claims.require_admin()?;

    let details = state.services.circulation.get_record(record_id).await?;
    Ok(Json(Envelope::success(details)))
}

/// Return a borrowed book
#[utoipa::path(
    patch,
    path = "/borrow-records/{id}/return",
    tag = "borrow-records",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow record ID")),
    request_body = ReturnBorrow,
    responses(
        (status = 200, description = "Book returned", body = BorrowDetails),
        (status = 400, description = "Already returned"),
        (status = 404, description = "Record not found")
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(record_id): Path<i32>,
    request: Option<Json<ReturnBorrow>>,
) -> AppResult<Json<Envelope<BorrowDetails>>> {
    claims.require_admin()?;

    let request = request.map(|Json(r)| r).unwrap_or_default();
    let details = state
        .services
        .circulation
        .return_book(record_id, request, &claims.sub)
        .await?;
    Ok(Json(Envelope::success(details)))
}

/// Admin correction of an open record
#[utoipa::path(
    patch,
    path = "/borrow-records/{id}",
    tag = "borrow-records",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow record ID")),
    request_body = UpdateBorrow,
    responses(
        (status = 200, description = "Record updated", body = BorrowRecord),
        (status = 400, description = "Record already returned"),
        (status = 404, description = "Record not found")
    )
)]
pub async fn update_record(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(record_id): Path<i32>,
    Json(patch): Json<UpdateBorrow>,
) -> AppResult<Json<Envelope<BorrowRecord>>> {
    claims.require_admin()?;

    let record = state
        .services
        .circulation
        .update_record(record_id, patch, &claims.sub)
        .await?;
    Ok(Json(Envelope::success(record)))
}

/// Extend a due date
#[utoipa::path(
    patch,
    path = "/borrow-records/{id}/extend",
    tag = "borrow-records",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow record ID")),
    request_body = ExtendBorrow,
    responses(
        (status = 200, description = "Due date extended", body = BorrowRecord),
        (status = 400, description = "Extension too long, or record overdue/returned"),
        (status = 404, description = "Record not found")
    )
)]
pub async fn extend(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(record_id): Path<i32>,
    Json(request): Json<ExtendBorrow>,
) -> AppResult<Json<Envelope<BorrowRecord>>> {
    claims.require_admin()?;

    let record = state
        .services
        .circulation
        .extend(record_id, request.due_date, &claims.sub)
        .await?;
    Ok(Json(Envelope::success(record)))
}

/// Mark a fine as paid. An open overdue loan is closed by the payment.
#[utoipa::path(
    patch,
    path = "/borrow-records/{id}/fine/paid",
    tag = "borrow-records",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow record ID")),
    request_body = PayFine,
    responses(
        (status = 200, description = "Fine settled", body = BorrowRecord),
        (status = 400, description = "No fine due or fine already settled"),
        (status = 404, description = "Record not found")
    )
)]
pub async fn mark_fine_paid(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(record_id): Path<i32>,
    request: Option<Json<PayFine>>,
) -> AppResult<Json<Envelope<BorrowRecord>>> {
    claims.require_admin()?;

    let request = request.map(|Json(r)| r).unwrap_or_default();
    let record = state
        .services
        .circulation
        .mark_fine_paid(record_id, request.payment_method.as_deref(), &claims.sub)
        .await?;
    Ok(Json(Envelope::success(record)))
}

/// Waive a fine
#[utoipa::path(
    patch,
    path = "/borrow-records/{id}/fine/waived",
    tag = "borrow-records",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow record ID")),
    responses(
        (status = 200, description = "Fine waived", body = BorrowRecord),
        (status = 400, description = "No fine due or fine already settled"),
        (status = 404, description = "Record not found")
    )
)]
pub async fn waive_fine(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(record_id): Path<i32>,
) -> AppResult<Json<Envelope<BorrowRecord>>> {
    claims.require_admin()?;

    let record = state
        .services
        .circulation
        .waive_fine(record_id, &claims.sub)
        .await?;
    Ok(Json(Envelope::success(record)))
}

/// Send a due-date or fine reminder email
#[utoipa::path(
    post,
    path = "/borrow-records/{id}/reminder",
    tag = "borrow-records",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Borrow record ID")),
    request_body = SendReminder,
    responses(
        (status = 200, description = "Reminder sent"),
        (status = 404, description = "Record not found"),
        (status = 502, description = "Email delivery failed")
    )
)]
pub async fn send_reminder(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(record_id): Path<i32>,
    Json(request): Json<SendReminder>,
) -> AppResult<Json<Envelope<&'static str>>> {
    claims.require_admin()?;

    state
        .services
        .circulation
        .send_reminder(record_id, request.kind, &claims.sub)
        .await?;
    Ok(Json(Envelope::success("Reminder sent")))
}
