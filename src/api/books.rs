//! Catalog management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book::{AssignRack, AuditEntry, Book, BookList, BookQuery, CreateBook, UpdateBook},
};

use super::{AuthenticatedUser, Envelope};

/// Ingest a new book or journal
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Catalog entry created", body = Book),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<Envelope<Book>>)> {
    claims.require_admin()?;
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let book = state.services.catalog.create_book(request, &claims.sub).await?;
    Ok((StatusCode::CREATED, Json(Envelope::success(book))))
}

/// List catalog entries
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    params(BookQuery),
    responses(
        (status = 200, description = "Paginated book list", body = BookList)
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<Envelope<BookList>>> {
    let books = state.services.catalog.list_books(query).await?;
    Ok(Json(Envelope::success(books)))
}

/// Get one catalog entry by its external code
#[utoipa::path(
    get,
    path = "/books/{code}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("code" = String, Path, description = "External book code")),
    responses(
        (status = 200, description = "Catalog entry", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(code): Path<String>,
) -> AppResult<Json<Envelope<Book>>> {
    let book = state.services.catalog.get_book(&code).await?;
    Ok(Json(Envelope::success(book)))
}

/// Apply a catalog correction
#[utoipa::path(
    put,
    path = "/books/{code}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("code" = String, Path, description = "External book code")),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Catalog entry updated", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(code): Path<String>,
    Json(patch): Json<UpdateBook>,
) -> AppResult<Json<Envelope<Book>>> {
    claims.require_admin()?;
    patch
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let book = state.services.catalog.update_book(&code, patch, &claims.sub).await?;
    Ok(Json(Envelope::success(book)))
}

/// Assign a rack/shelf location
#[utoipa::path(
    patch,
    path = "/books/{code}/rack",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("code" = String, Path, description = "External book code")),
    request_body = AssignRack,
    responses(
        (status = 200, description = "Rack assigned", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn assign_rack(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(code): Path<String>,
    Json(request): Json<AssignRack>,
) -> AppResult<Json<Envelope<Book>>> {
    claims.require_admin()?;

    let book = state
        .services
        .catalog
        .assign_rack(&code, &request.rack, request.shelf.as_deref(), &claims.sub)
        .await?;
    Ok(Json(Envelope::success(book)))
}

/// Delete a catalog entry without active borrow records
#[utoipa::path(
    delete,
    path = "/books/{code}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("code" = String, Path, description = "External book code")),
    responses(
        (status = 204, description = "Catalog entry deleted"),
        (status = 400, description = "Active borrow records reference this book"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(code): Path<String>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.catalog.delete_book(&code).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get a book's audit trail
#[utoipa::path(
    get,
    path = "/books/{code}/audit",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("code" = String, Path, description = "External book code")),
    responses(
        (status = 200, description = "Audit trail, oldest first", body = Vec<AuditEntry>),
        (status = 404, description = "Book not found")
    )
)]
pub async fn audit_trail(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(code): Path<String>,
) -> AppResult<Json<Envelope<Vec<AuditEntry>>>> {
    claims.require_admin()?;

    let entries = state.services.catalog.audit_trail(&code).await?;
    Ok(Json(Envelope::success(entries)))
}
