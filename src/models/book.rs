//! Book catalog model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Lifecycle status of a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum BookStatus {
    Available,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
    #[serde(rename = "In Repair")]
    InRepair,
    Archived,
    Lost,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "Available",
            BookStatus::OutOfStock => "Out of Stock",
            BookStatus::InRepair => "In Repair",
            BookStatus::Archived => "Archived",
            BookStatus::Lost => "Lost",
        }
    }
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BookStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Available" => Ok(BookStatus::Available),
            "Out of Stock" => Ok(BookStatus::OutOfStock),
            "In Repair" => Ok(BookStatus::InRepair),
            "Archived" => Ok(BookStatus::Archived),
            "Lost" => Ok(BookStatus::Lost),
            _ => Err(format!("Invalid book status: {}", s)),
        }
    }
}

// SQLx conversions: stored as TEXT
impl sqlx::Type<Postgres> for BookStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for BookStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for BookStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Catalog entry for a book or journal.
///
/// The `code` is the stable external identifier (`B<timestamp>-<isbn>` for
/// books, `J<timestamp>-<issn>` for journals) referenced by borrow records,
/// rack assignments and audit trails.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub code: String,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub issn: Option<String>,
    pub status: BookStatus,
    pub copies: i32,
    pub available: i32,
    pub rack: Option<String>,
    pub shelf: Option<String>,
    pub times_loaned: i32,
    pub last_borrowed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read-only projection of a book merged into borrow responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookSummary {
    pub code: String,
    pub title: String,
    pub author: String,
    pub status: BookStatus,
    pub copies: i32,
    pub available: i32,
    pub rack: Option<String>,
    pub shelf: Option<String>,
}

impl From<Book> for BookSummary {
    fn from(book: Book) -> Self {
        BookSummary {
            code: book.code,
            title: book.title,
            author: book.author,
            status: book.status,
            copies: book.copies,
            available: book.available,
            rack: book.rack,
            shelf: book.shelf,
        }
    }
}

/// One row of a book's append-only audit trail
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AuditEntry {
    pub id: i32,
    pub book_code: String,
    pub action: String,
    pub actor: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Catalog ingestion request. Exactly one of `isbn` / `issn` must be
/// present; it selects the generated code prefix (B vs J).
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author must not be empty"))]
    pub author: String,
    pub isbn: Option<String>,
    pub issn: Option<String>,
    #[validate(range(min = 1, message = "Copies must be at least 1"))]
    pub copies: i32,
    pub rack: Option<String>,
    pub shelf: Option<String>,
}

/// Catalog update request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: Option<String>,
    pub author: Option<String>,
    pub status: Option<BookStatus>,
    #[validate(range(min = 0, message = "Copies must not be negative"))]
    pub copies: Option<i32>,
}

/// Rack assignment request
#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignRack {
    pub rack: String,
    pub shelf: Option<String>,
}

/// Book list query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Substring match against title or author
    pub search: Option<String>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Paginated book list
#[derive(Debug, Serialize, ToSchema)]
pub struct BookList {
    pub items: Vec<Book>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}
