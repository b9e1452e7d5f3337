//! Activity logs repository for seat occupancy tracking

use chrono::{NaiveDate, NaiveTime};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::activity::ActivityLog,
};

#[derive(Clone)]
pub struct ActivityRepository {
    pool: Pool<Postgres>,
}

/// Fields for a new check-in log
pub struct NewLog {
    pub roll_number: String,
    pub name: String,
    pub branch: Option<String>,
    pub section: String,
    pub is_study_section: bool,
    pub log_date: NaiveDate,
    pub time_in: NaiveTime,
}

impl ActivityRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Find a student's open log for the day, restricted to the given
    /// section labels
    pub async fn find_open_log(
        &self,
        roll_number: &str,
        date: NaiveDate,
        labels: &[String],
    ) -> AppResult<Option<ActivityLog>> {
        let log = sqlx::query_as::<_, ActivityLog>(
            r#"
            SELECT * FROM activity_logs
            WHERE LOWER(roll_number) = LOWER($1)
              AND log_date = $2
              AND time_out IS NULL
              AND section = ANY($3)
            ORDER BY time_in
            LIMIT 1
            "#,
        )
        .bind(roll_number)
        .bind(date)
        .bind(labels)
        .fetch_optional(&self.pool)
        .await?;
        Ok(log)
    }

    /// Find a student's open log for the day in any section. At most one
    /// should exist; the workflow enforces that.
    pub async fn find_any_open_log(
        &self,
        roll_number: &str,
        date: NaiveDate,
    ) -> AppResult<Option<ActivityLog>> {
        let log = sqlx::query_as::<_, ActivityLog>(
            r#"
            SELECT * FROM activity_logs
            WHERE LOWER(roll_number) = LOWER($1) AND log_date = $2 AND time_out IS NULL
            ORDER BY time_in
            LIMIT 1
            "#,
        )
        .bind(roll_number)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(log)
    }

    /// Count the day's open logs whose label is in the given set — the
    /// occupancy of one seat bucket
    pub async fn count_open(&self, date: NaiveDate, labels: &[String]) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM activity_logs
            WHERE log_date = $1 AND time_out IS NULL AND section = ANY($2)
            "#,
        )
        .bind(date)
        .bind(labels)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Create a new check-in log
    pub async fn create(&self, log: &NewLog) -> AppResult<ActivityLog> {
        let created = sqlx::query_as::<_, ActivityLog>(
            r#"
            INSERT INTO activity_logs
                (roll_number, name, branch, section, is_study_section, log_date, time_in, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'Checked In')
            RETURNING *
            "#,
        )
        .bind(&log.roll_number)
        .bind(&log.name)
        .bind(&log.branch)
        .bind(&log.section)
        .bind(log.is_study_section)
        .bind(log.log_date)
        .bind(log.time_in)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// Close a session at check-out
    pub async fn close(
        &self,
        id: i32,
        time_out: NaiveTime,
        duration: &str,
    ) -> AppResult<ActivityLog> {
        let updated = sqlx::query_as::<_, ActivityLog>(
            r#"
            UPDATE activity_logs
            SET time_out = $2, status = 'Checked Out', duration = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(time_out)
        .bind(duration)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Activity log with id {} not found", id)))?;
        Ok(updated)
    }

    /// Move an open session to another section in place. The row id and
    /// `time_in` are untouched, so elapsed time survives the transfer.
    pub async fn update_section(
        &self,
        id: i32,
        section: &str,
        is_study_section: bool,
    ) -> AppResult<ActivityLog> {
        let updated = sqlx::query_as::<_, ActivityLog>(
            r#"
            UPDATE activity_logs
            SET section = $2, is_study_section = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(section)
        .bind(is_study_section)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Activity log with id {} not found", id)))?;
        Ok(updated)
    }

    /// Completed sessions since a date, in check-in order, for analytics
    pub async fn checked_out_since(&self, since: NaiveDate) -> AppResult<Vec<ActivityLog>> {
        let logs = sqlx::query_as::<_, ActivityLog>(
            r#"
            SELECT * FROM activity_logs
            WHERE status = 'Checked Out' AND log_date >= $1
            ORDER BY log_date, time_in, id
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    /// All logs for one day, in check-in order, for traffic histograms
    pub async fn logs_for_date(&self, date: NaiveDate) -> AppResult<Vec<ActivityLog>> {
        let logs = sqlx::query_as::<_, ActivityLog>(
            "SELECT * FROM activity_logs WHERE log_date = $1 ORDER BY time_in, id",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }
}
