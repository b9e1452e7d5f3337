//! Students repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::student::Student,
};

#[derive(Clone)]
pub struct StudentsRepository {
    pool: Pool<Postgres>,
}

impl StudentsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get student by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Student> {
        sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Student with id {} not found", id)))
    }

    /// Get student by roll number (case-insensitive)
    pub async fn get_by_roll(&self, roll_number: &str) -> AppResult<Student> {
        sqlx::query_as::<_, Student>(
            "SELECT * FROM students WHERE LOWER(roll_number) = LOWER($1)",
        )
        .bind(roll_number)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Student with roll number {} not found", roll_number))
        })
    }

    /// Get several students at once, for read-side joins
    pub async fn get_by_ids(&self, ids: &[i32]) -> AppResult<Vec<Student>> {
        let students = sqlx::query_as::<_, Student>(
            "SELECT * FROM students WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(students)
    }
}
