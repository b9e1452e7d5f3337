//! Student notification model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Notification flavour, stored as text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Borrow,
    Return,
    Overdue,
    Fine,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Borrow => "borrow",
            NotificationKind::Return => "return",
            NotificationKind::Overdue => "overdue",
            NotificationKind::Fine => "fine",
        }
    }
}

/// A notification delivered to a student's inbox
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Notification {
    pub id: i32,
    pub student_id: i32,
    pub kind: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
