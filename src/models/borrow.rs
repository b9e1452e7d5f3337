//! Borrow record model and related types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};

use super::book::BookSummary;
use super::student::StudentSummary;

/// Borrow record state machine: Borrowed → Overdue → Returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum BorrowStatus {
    Borrowed,
    Overdue,
    Returned,
}

impl BorrowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowStatus::Borrowed => "Borrowed",
            BorrowStatus::Overdue => "Overdue",
            BorrowStatus::Returned => "Returned",
        }
    }
}

impl std::fmt::Display for BorrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BorrowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Borrowed" => Ok(BorrowStatus::Borrowed),
            "Overdue" => Ok(BorrowStatus::Overdue),
            "Returned" => Ok(BorrowStatus::Returned),
            _ => Err(format!("Invalid borrow status: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for BorrowStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for BorrowStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for BorrowStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Settlement state of a fine. Null until a fine exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum PaymentStatus {
    Pending,
    Paid,
    Waived,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Waived => "Waived",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(PaymentStatus::Pending),
            "Paid" => Ok(PaymentStatus::Paid),
            "Waived" => Ok(PaymentStatus::Waived),
            _ => Err(format!("Invalid payment status: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for PaymentStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for PaymentStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for PaymentStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// One student's loan of one book copy. Append-only financial history:
/// records are closed, never deleted.
///
/// The book is referenced by its external `code`, not the database id —
/// the code is part of the public contract.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowRecord {
    pub id: i32,
    pub student_id: i32,
    pub book_code: String,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: BorrowStatus,
    pub fine: Decimal,
    pub payment_status: Option<PaymentStatus>,
    pub payment_method: Option<String>,
    pub condition_at_issue: Option<String>,
    pub return_condition: Option<String>,
    pub issued_by: Option<String>,
    pub admin_action: Option<String>,
    pub notes: Option<String>,
}

/// Borrow record merged with its book (and optionally student) projection
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BorrowDetails {
    #[serde(flatten)]
    pub record: BorrowRecord,
    pub book: BookSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<StudentSummary>,
}

/// Create borrow request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBorrow {
    pub student_id: i32,
    pub book_code: String,
    pub due_date: DateTime<Utc>,
    pub condition_at_issue: Option<String>,
    pub notes: Option<String>,
}

/// Return request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReturnBorrow {
    pub return_condition: Option<String>,
    pub return_notes: Option<String>,
}

/// Admin correction request. Only supplied fields are changed.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateBorrow {
    pub due_date: Option<DateTime<Utc>>,
    pub status: Option<BorrowStatus>,
    pub fine: Option<Decimal>,
    pub payment_status: Option<PaymentStatus>,
    pub notes: Option<String>,
    pub admin_action: Option<String>,
}

/// Extension request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ExtendBorrow {
    pub due_date: DateTime<Utc>,
}

/// Fine payment request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PayFine {
    pub payment_method: Option<String>,
}

/// Reminder email request
#[derive(Debug, Deserialize, ToSchema)]
pub struct SendReminder {
    /// "due" or "fine"
    #[serde(rename = "type")]
    pub kind: ReminderKind,
}

/// Reminder email flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReminderKind {
    Due,
    Fine,
}

/// Borrow record list query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BorrowQuery {
    pub student_id: Option<i32>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Paginated borrow record list
#[derive(Debug, Serialize, ToSchema)]
pub struct BorrowList {
    pub items: Vec<BorrowDetails>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}
