//! Borrow records repository
//!
//! The borrow and return mutations touch the record, the book counters,
//! the audit trail and the notification inbox together; each runs inside
//! a single transaction so a failure leaves no partial state visible.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{
        book::{Book, BookStatus},
        borrow::{BorrowQuery, BorrowRecord, BorrowStatus, PaymentStatus, UpdateBorrow},
    },
};

#[derive(Clone)]
pub struct BorrowsRepository {
    pool: Pool<Postgres>,
}

/// Fields for a new borrow record
pub struct NewBorrow {
    pub student_id: i32,
    pub book_code: String,
    pub due_date: DateTime<Utc>,
    pub condition_at_issue: Option<String>,
    pub notes: Option<String>,
    pub issued_by: String,
}

impl BorrowsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get borrow record by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<BorrowRecord> {
        sqlx::query_as::<_, BorrowRecord>("SELECT * FROM borrow_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow record with id {} not found", id)))
    }

    /// Create a borrow record and keep the book counters in step.
    ///
    /// The book row is locked for the duration of the transaction; the
    /// availability, status and borrow-limit checks run against that
    /// locked row so the decision and the write commit together.
    pub async fn create(&self, borrow: &NewBorrow, max_books: i64) -> AppResult<(BorrowRecord, Book)> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE code = $1 FOR UPDATE")
            .bind(&borrow.book_code)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Book with code {} not found", borrow.book_code))
            })?;

        if book.available <= 0 {
            return Err(AppError::Rule(
                ErrorCode::NoCopiesAvailable,
                format!("No copies of {} are available", book.title),
            ));
        }

        if book.status != BookStatus::Available {
            return Err(AppError::Rule(
                ErrorCode::BookUnavailable,
                format!("Book {} is not borrowable (status: {})", book.title, book.status),
            ));
        }

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_records WHERE student_id = $1 AND status != 'Returned'",
        )
        .bind(borrow.student_id)
        .fetch_one(&mut *tx)
        .await?;

        if active >= max_books {
            return Err(AppError::Rule(
                ErrorCode::BorrowLimitReached,
                format!("Borrow limit reached ({}/{})", active, max_books),
            ));
        }

        let record = sqlx::query_as::<_, BorrowRecord>(
            r#"
            INSERT INTO borrow_records
                (student_id, book_code, borrow_date, due_date, status, fine,
                 condition_at_issue, notes, issued_by)
            VALUES ($1, $2, $3, $4, 'Borrowed', 0, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(borrow.student_id)
        .bind(&borrow.book_code)
        .bind(now)
        .bind(borrow.due_date)
        .bind(&borrow.condition_at_issue)
        .bind(&borrow.notes)
        .bind(&borrow.issued_by)
        .fetch_one(&mut *tx)
        .await?;

        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET available = available - 1,
                times_loaned = times_loaned + 1,
                last_borrowed = $2,
                updated_at = $2
            WHERE code = $1
            RETURNING *
            "#,
        )
        .bind(&borrow.book_code)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO book_audit (book_code, action, actor, details) VALUES ($1, 'Borrowed', $2, $3)",
        )
        .bind(&borrow.book_code)
        .bind(&borrow.issued_by)
        .bind(format!("Issued to student {}", borrow.student_id))
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO notifications (student_id, kind, message) VALUES ($1, 'borrow', $2)",
        )
        .bind(borrow.student_id)
        .bind(format!(
            "You borrowed \"{}\". It is due on {}.",
            book.title,
            borrow.due_date.format("%Y-%m-%d")
        ))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((record, book))
    }

    /// Close a loan: mark the record returned, restore the copy counter,
    /// record the fine, notify the student.
    pub async fn complete_return(
        &self,
        record_id: i32,
        fine: Decimal,
        return_condition: Option<&str>,
        return_notes: Option<&str>,
        actor: &str,
    ) -> AppResult<BorrowRecord> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, BorrowRecord>(
            "SELECT * FROM borrow_records WHERE id = $1 FOR UPDATE",
        )
        .bind(record_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrow record with id {} not found", record_id)))?;

        if record.status == BorrowStatus::Returned {
            return Err(AppError::Rule(
                ErrorCode::AlreadyReturned,
                format!("Borrow record {} is already returned", record_id),
            ));
        }

        let payment_status = if fine > Decimal::ZERO {
            Some(PaymentStatus::Pending)
        } else {
            None
        };

        let updated = sqlx::query_as::<_, BorrowRecord>(
            r#"
            UPDATE borrow_records
            SET status = 'Returned',
                return_date = $2,
                fine = $3,
                payment_status = $4,
                return_condition = COALESCE($5, return_condition),
                notes = COALESCE($6, notes)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(record_id)
        .bind(now)
        .bind(fine)
        .bind(payment_status)
        .bind(return_condition)
        .bind(return_notes)
        .fetch_one(&mut *tx)
        .await?;

        let book_title: String = sqlx::query_scalar(
            r#"
            UPDATE books SET available = available + 1, updated_at = $2
            WHERE code = $1
            RETURNING title
            "#,
        )
        .bind(&record.book_code)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO book_audit (book_code, action, actor, details) VALUES ($1, 'Returned', $2, $3)",
        )
        .bind(&record.book_code)
        .bind(actor)
        .bind(format!("Returned by student {}", record.student_id))
        .execute(&mut *tx)
        .await?;

        let (kind, message) = if fine > Decimal::ZERO {
            (
                "fine",
                format!("You returned \"{}\". A fine of {} is pending.", book_title, fine),
            )
        } else {
            ("return", format!("You returned \"{}\". Thank you!", book_title))
        };
        sqlx::query(
            "INSERT INTO notifications (student_id, kind, message) VALUES ($1, $2, $3)",
        )
        .bind(record.student_id)
        .bind(kind)
        .bind(message)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Settle a fine by payment. If the loan was never formally returned,
    /// paying the fine also closes it and restores the copy counter.
    pub async fn mark_fine_paid(
        &self,
        record_id: i32,
        payment_method: Option<&str>,
        actor: &str,
    ) -> AppResult<BorrowRecord> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, BorrowRecord>(
            "SELECT * FROM borrow_records WHERE id = $1 FOR UPDATE",
        )
        .bind(record_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrow record with id {} not found", record_id)))?;

        Self::ensure_fine_settleable(&record)?;

        let closing = record.status != BorrowStatus::Returned;

        let updated = if closing {
            sqlx::query_as::<_, BorrowRecord>(
                r#"
                UPDATE borrow_records
                SET payment_status = 'Paid',
                    payment_method = $2,
                    status = 'Returned',
                    return_date = $3
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(record_id)
            .bind(payment_method)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?
        } else {
            sqlx::query_as::<_, BorrowRecord>(
                r#"
                UPDATE borrow_records
                SET payment_status = 'Paid', payment_method = $2
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(record_id)
            .bind(payment_method)
            .fetch_one(&mut *tx)
            .await?
        };

        if closing {
            sqlx::query("UPDATE books SET available = available + 1, updated_at = $2 WHERE code = $1")
                .bind(&record.book_code)
                .bind(now)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                "INSERT INTO book_audit (book_code, action, actor, details) VALUES ($1, 'Returned', $2, 'Closed via fine payment')",
            )
            .bind(&record.book_code)
            .bind(actor)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(updated)
    }

    /// Waive a fine. The borrow status is left untouched.
    pub async fn waive_fine(&self, record_id: i32) -> AppResult<BorrowRecord> {
        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, BorrowRecord>(
            "SELECT * FROM borrow_records WHERE id = $1 FOR UPDATE",
        )
        .bind(record_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrow record with id {} not found", record_id)))?;

        Self::ensure_fine_settleable(&record)?;

        let updated = sqlx::query_as::<_, BorrowRecord>(
            "UPDATE borrow_records SET fine = 0, payment_status = 'Waived' WHERE id = $1 RETURNING *",
        )
        .bind(record_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    fn ensure_fine_settleable(record: &BorrowRecord) -> AppResult<()> {
        if record.fine <= Decimal::ZERO {
            return Err(AppError::Rule(
                ErrorCode::NoFineDue,
                format!("Borrow record {} has no fine due", record.id),
            ));
        }
        match record.payment_status {
            Some(settled @ (PaymentStatus::Paid | PaymentStatus::Waived)) => Err(AppError::Rule(
                ErrorCode::FineAlreadySettled,
                format!("Fine on borrow record {} is already {}", record.id, settled),
            )),
            _ => Ok(()),
        }
    }

    /// Apply an admin correction. The closed-record guard lives in the
    /// service, which also decides whether an overdue notification is due.
    pub async fn update(&self, record_id: i32, patch: &UpdateBorrow) -> AppResult<BorrowRecord> {
        let updated = sqlx::query_as::<_, BorrowRecord>(
            r#"
            UPDATE borrow_records
            SET due_date = COALESCE($2, due_date),
                status = COALESCE($3, status),
                fine = COALESCE($4, fine),
                payment_status = COALESCE($5, payment_status),
                notes = COALESCE($6, notes),
                admin_action = COALESCE($7, admin_action)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(record_id)
        .bind(patch.due_date)
        .bind(patch.status)
        .bind(patch.fine)
        .bind(patch.payment_status)
        .bind(&patch.notes)
        .bind(&patch.admin_action)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrow record with id {} not found", record_id)))?;

        Ok(updated)
    }

    /// Update the due date after an extension
    pub async fn set_due_date(&self, record_id: i32, due_date: DateTime<Utc>) -> AppResult<BorrowRecord> {
        let updated = sqlx::query_as::<_, BorrowRecord>(
            "UPDATE borrow_records SET due_date = $2 WHERE id = $1 RETURNING *",
        )
        .bind(record_id)
        .bind(due_date)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrow record with id {} not found", record_id)))?;
        Ok(updated)
    }

    /// List borrow records with optional filters, newest first
    pub async fn list(&self, query: &BorrowQuery) -> AppResult<(Vec<BorrowRecord>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM borrow_records
            WHERE ($1::int IS NULL OR student_id = $1)
              AND ($2::text IS NULL OR status = $2)
            "#,
        )
        .bind(query.student_id)
        .bind(&query.status)
        .fetch_one(&self.pool)
        .await?;

        let records = sqlx::query_as::<_, BorrowRecord>(
            r#"
            SELECT * FROM borrow_records
            WHERE ($1::int IS NULL OR student_id = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY borrow_date DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(query.student_id)
        .bind(&query.status)
        .bind(per_page)
        .bind((page - 1) * per_page)
        .fetch_all(&self.pool)
        .await?;

        Ok((records, total))
    }

    /// Count active loans
    pub async fn count_active(&self) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM borrow_records WHERE status != 'Returned'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Count overdue loans (open and past due)
    pub async fn count_overdue(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_records WHERE status != 'Returned' AND due_date < NOW()",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Borrow timestamps since a cutoff, for the hourly histogram
    pub async fn borrow_dates_since(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<DateTime<Utc>>> {
        let dates: Vec<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT borrow_date FROM borrow_records WHERE borrow_date >= $1 ORDER BY borrow_date",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        Ok(dates)
    }

    /// Borrow and return counts inside a window, for trend deltas
    pub async fn counts_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<(i64, i64)> {
        let borrows: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_records WHERE borrow_date >= $1 AND borrow_date < $2",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        let returns: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_records WHERE return_date >= $1 AND return_date < $2",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok((borrows, returns))
    }
}
