//! Notifications repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::notification::{Notification, NotificationKind},
};

#[derive(Clone)]
pub struct NotificationsRepository {
    pool: Pool<Postgres>,
}

impl NotificationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Create a notification
    pub async fn create(
        &self,
        student_id: i32,
        kind: NotificationKind,
        message: &str,
    ) -> AppResult<Notification> {
        let created = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (student_id, kind, message)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(student_id)
        .bind(kind.as_str())
        .bind(message)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// List a student's notifications, newest first
    pub async fn list_for_student(&self, student_id: i32) -> AppResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE student_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    /// Mark a notification read. Scoped to the owning student.
    pub async fn mark_read(&self, id: i32, student_id: i32) -> AppResult<Notification> {
        let updated = sqlx::query_as::<_, Notification>(
            "UPDATE notifications SET read = TRUE WHERE id = $1 AND student_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Notification with id {} not found", id)))?;
        Ok(updated)
    }
}
