//! Borrow lifecycle workflow: issue, return, fines, extensions, reminders
//!
//! Owns the Borrowed → Overdue → Returned state machine and keeps the
//! book's available-copy counter consistent with record state. All
//! invariants are re-derived from fresh reads; the service holds no state
//! beyond its injected rules.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult, ErrorCode},
    models::{
        book::Book,
        borrow::{
            BorrowDetails, BorrowList, BorrowQuery, BorrowRecord, BorrowStatus, CreateBorrow,
            ReminderKind, ReturnBorrow, UpdateBorrow,
        },
        notification::NotificationKind,
        student::{Role, Student},
    },
    repository::{borrows::NewBorrow, Repository},
    services::email::Mailer,
};

#[derive(Clone)]
pub struct CirculationService {
    repository: Repository,
    rules: CirculationConfig,
    mailer: Arc<dyn Mailer>,
}

impl CirculationService {
    pub fn new(repository: Repository, rules: CirculationConfig, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            repository,
            rules,
            mailer,
        }
    }

    /// Issue a book to a student.
    ///
    /// Precondition order is part of the contract: student exists, student
    /// role, book exists, copies available, book borrowable, borrow limit.
    /// The book-side checks and all writes run inside one transaction in
    /// the repository, so a failure leaves no partial state.
    pub async fn borrow(&self, request: CreateBorrow, actor: &str) -> AppResult<BorrowDetails> {
        let student = self.repository.students.get_by_id(request.student_id).await?;

        if student.role != Role::Student {
            return Err(AppError::Rule(
                ErrorCode::NotAStudent,
                format!("User {} is not a student account", student.roll_number),
            ));
        }

        let borrow = NewBorrow {
            student_id: request.student_id,
            book_code: request.book_code,
            due_date: request.due_date,
            condition_at_issue: request.condition_at_issue,
            notes: request.notes,
            issued_by: actor.to_string(),
        };

        let (record, book) = self
            .repository
            .borrows
            .create(&borrow, self.rules.max_books_per_student)
            .await?;

        Ok(BorrowDetails {
            record,
            book: book.into(),
            student: Some(student.into()),
        })
    }

    /// Return a borrowed book, computing the fine as of today
    pub async fn return_book(
        &self,
        record_id: i32,
        request: ReturnBorrow,
        actor: &str,
    ) -> AppResult<BorrowDetails> {
        let record = self.repository.borrows.get_by_id(record_id).await?;

        if record.status == BorrowStatus::Returned {
            return Err(AppError::Rule(
                ErrorCode::AlreadyReturned,
                format!("Borrow record {} is already returned", record_id),
            ));
        }

        let fine = calculate_fine(
            record.due_date,
            Utc::now(),
            self.rules.grace_period_days,
            self.rules.fine_rate_per_day,
        );

        let updated = self
            .repository
            .borrows
            .complete_return(
                record_id,
                fine,
                request.return_condition.as_deref(),
                request.return_notes.as_deref(),
                actor,
            )
            .await?;

        self.details(updated).await
    }

    /// Admin correction path. Closed records are immutable.
    pub async fn update_record(
        &self,
        record_id: i32,
        patch: UpdateBorrow,
        _actor: &str,
    ) -> AppResult<BorrowRecord> {
        let record = self.repository.borrows.get_by_id(record_id).await?;

        if record.status == BorrowStatus::Returned {
            return Err(AppError::Rule(
                ErrorCode::RecordClosed,
                format!("Borrow record {} is returned and can no longer be modified", record_id),
            ));
        }

        let marked_overdue = patch.status == Some(BorrowStatus::Overdue);
        let updated = self.repository.borrows.update(record_id, &patch).await?;

        if marked_overdue {
            let book = self.repository.books.get_by_code(&updated.book_code).await?;
            self.repository
                .notifications
                .create(
                    updated.student_id,
                    NotificationKind::Overdue,
                    &format!(
                        "\"{}\" is overdue. Please return it to avoid further fines.",
                        book.title
                    ),
                )
                .await?;
        }

        Ok(updated)
    }

    /// Extend a due date, within the configured window. The confirmation
    /// email is best-effort: a transport failure is logged, not surfaced.
    pub async fn extend(
        &self,
        record_id: i32,
        new_due_date: DateTime<Utc>,
        actor: &str,
    ) -> AppResult<BorrowRecord> {
        let record = self.repository.borrows.get_by_id(record_id).await?;

        if record.status == BorrowStatus::Returned {
            return Err(AppError::Rule(
                ErrorCode::RecordClosed,
                format!("Borrow record {} is returned and can no longer be extended", record_id),
            ));
        }
        if record.status == BorrowStatus::Overdue {
            return Err(AppError::BadRequest(
                "Overdue records cannot be extended; the book must be returned".to_string(),
            ));
        }

        let limit = record.due_date + Duration::days(self.rules.max_extension_days);
        if new_due_date > limit {
            return Err(AppError::Rule(
                ErrorCode::ExtensionTooLong,
                format!(
                    "Extensions are limited to {} days past the current due date",
                    self.rules.max_extension_days
                ),
            ));
        }

        let updated = self.repository.borrows.set_due_date(record_id, new_due_date).await?;

        self.repository
            .books
            .append_audit(
                &updated.book_code,
                "Due date extended",
                actor,
                Some(&format!("New due date {}", new_due_date.format("%Y-%m-%d"))),
            )
            .await?;

        // Confirmation is best-effort; the extension itself already
        // committed
        self.send_record_email(&updated, EmailKind::ExtensionConfirmation, false)
            .await?;

        Ok(updated)
    }

    /// Settle a fine by payment. Paying the fine on a record that was
    /// never formally returned also closes the loan.
    pub async fn mark_fine_paid(
        &self,
        record_id: i32,
        payment_method: Option<&str>,
        actor: &str,
    ) -> AppResult<BorrowRecord> {
        self.repository
            .borrows
            .mark_fine_paid(record_id, payment_method, actor)
            .await
    }

    /// Waive a fine without changing the borrow status
    pub async fn waive_fine(&self, record_id: i32, _actor: &str) -> AppResult<BorrowRecord> {
        self.repository.borrows.waive_fine(record_id).await
    }

    /// Compose and send a due-date or fine email from live record data.
    /// Unlike `extend`, delivery failure here is fatal to the request.
    pub async fn send_reminder(
        &self,
        record_id: i32,
        kind: ReminderKind,
        _actor: &str,
    ) -> AppResult<()> {
        let record = self.repository.borrows.get_by_id(record_id).await?;
        let kind = match kind {
            ReminderKind::Due => EmailKind::DueReminder,
            ReminderKind::Fine => EmailKind::FineNotice,
        };
        self.send_record_email(&record, kind, true).await
    }

    /// Get one record merged with its book and student projections
    pub async fn get_record(&self, record_id: i32) -> AppResult<BorrowDetails> {
        let record = self.repository.borrows.get_by_id(record_id).await?;
        self.details(record).await
    }

    /// List records with an explicit read-side join against books and
    /// students. Books are keyed by their external code.
    pub async fn list(&self, query: BorrowQuery) -> AppResult<BorrowList> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let (records, total) = self.repository.borrows.list(&query).await?;

        let mut codes: Vec<String> = records.iter().map(|r| r.book_code.clone()).collect();
        codes.sort();
        codes.dedup();
        let mut student_ids: Vec<i32> = records.iter().map(|r| r.student_id).collect();
        student_ids.sort_unstable();
        student_ids.dedup();

        let books: HashMap<String, Book> = self
            .repository
            .books
            .get_by_codes(&codes)
            .await?
            .into_iter()
            .map(|b| (b.code.clone(), b))
            .collect();
        let students: HashMap<i32, Student> = self
            .repository
            .students
            .get_by_ids(&student_ids)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        let mut items = Vec::with_capacity(records.len());
        for record in records {
            let book = books.get(&record.book_code).cloned().ok_or_else(|| {
                AppError::Internal(format!("Book {} referenced by record {} is missing", record.book_code, record.id))
            })?;
            let student = students.get(&record.student_id).cloned().map(Into::into);
            items.push(BorrowDetails {
                record,
                book: book.into(),
                student,
            });
        }

        Ok(BorrowList {
            items,
            total,
            page,
            per_page,
        })
    }

    async fn details(&self, record: BorrowRecord) -> AppResult<BorrowDetails> {
        let book = self.repository.books.get_by_code(&record.book_code).await?;
        let student = self.repository.students.get_by_id(record.student_id).await?;
        Ok(BorrowDetails {
            record,
            book: book.into(),
            student: Some(student.into()),
        })
    }

    /// Compose an email for a record and hand it to the dispatcher.
    /// `required` decides whether a transport failure propagates.
    async fn send_record_email(
        &self,
        record: &BorrowRecord,
        kind: EmailKind,
        required: bool,
    ) -> AppResult<()> {
        let book = self.repository.books.get_by_code(&record.book_code).await?;
        let student = self.repository.students.get_by_id(record.student_id).await?;

        let Some(email) = student.email.as_deref() else {
            let err = AppError::Email(format!(
                "Student {} has no email address on file",
                student.roll_number
            ));
            if required {
                return Err(err);
            }
            tracing::warn!("Skipping email for record {}: {}", record.id, err);
            return Ok(());
        };

        let (subject, body) = match kind {
            EmailKind::DueReminder => (
                format!("Reminder: \"{}\" is due soon", book.title),
                format!(
                    "Dear {},\n\n\"{}\" by {} is due on {}.\nPlease return or extend it before the due date.\n\nCampus Library",
                    student.name,
                    book.title,
                    book.author,
                    record.due_date.format("%Y-%m-%d"),
                ),
            ),
            EmailKind::FineNotice => (
                format!("Fine notice for \"{}\"", book.title),
                format!(
                    "Dear {},\n\nAn outstanding fine of {} is recorded against your loan of \"{}\" (due {}).\nPlease settle it at the circulation desk.\n\nCampus Library",
                    student.name,
                    record.fine,
                    book.title,
                    record.due_date.format("%Y-%m-%d"),
                ),
            ),
            EmailKind::ExtensionConfirmation => (
                format!("Extension confirmed for \"{}\"", book.title),
                format!(
                    "Dear {},\n\nYour loan of \"{}\" has been extended. The new due date is {}.\n\nCampus Library",
                    student.name,
                    book.title,
                    record.due_date.format("%Y-%m-%d"),
                ),
            ),
        };

        dispatch_email(self.mailer.as_ref(), email, &subject, &body, required).await
    }
}

/// Flavours of record email the workflow can send
#[derive(Clone, Copy)]
enum EmailKind {
    DueReminder,
    FineNotice,
    ExtensionConfirmation,
}

/// Send through the transport; swallow failures unless the caller marked
/// the email as required. The single flag replaces per-call-site
/// try/catch around the same failure.
async fn dispatch_email(
    mailer: &dyn Mailer,
    to: &str,
    subject: &str,
    body: &str,
    required: bool,
) -> AppResult<()> {
    match mailer.send(to, subject, body).await {
        Ok(()) => Ok(()),
        Err(e) if required => Err(e),
        Err(e) => {
            tracing::warn!("Email to {} failed and was dropped: {}", to, e);
            Ok(())
        }
    }
}

/// Fine owed on a record returned at `as_of`: one rate unit per calendar
/// day past the due date and grace period, truncated, never negative.
pub fn calculate_fine(
    due_date: DateTime<Utc>,
    as_of: DateTime<Utc>,
    grace_period_days: i64,
    fine_rate_per_day: u32,
) -> Decimal {
    let days_overdue = (as_of - due_date).num_days() - grace_period_days;
    if days_overdue > 0 {
        Decimal::from(days_overdue) * Decimal::from(fine_rate_per_day)
    } else {
        Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::email::MockMailer;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn fine_is_zero_inside_grace_period() {
        let due = utc(2024, 1, 1);
        assert_eq!(calculate_fine(due, utc(2024, 1, 1), 7, 1), Decimal::ZERO);
        assert_eq!(calculate_fine(due, utc(2024, 1, 5), 7, 1), Decimal::ZERO);
        assert_eq!(calculate_fine(due, utc(2024, 1, 8), 7, 1), Decimal::ZERO);
    }

    #[test]
    fn fine_accrues_per_day_past_grace() {
        let due = utc(2024, 1, 1);
        assert_eq!(calculate_fine(due, utc(2024, 1, 9), 7, 1), Decimal::from(1));
        assert_eq!(calculate_fine(due, utc(2024, 1, 10), 7, 1), Decimal::from(2));
        assert_eq!(calculate_fine(due, utc(2024, 1, 15), 7, 1), Decimal::from(7));
    }

    #[test]
    fn fine_is_zero_before_due_date() {
        let due = utc(2024, 1, 10);
        assert_eq!(calculate_fine(due, utc(2024, 1, 1), 7, 1), Decimal::ZERO);
    }

    #[test]
    fn fine_scales_with_rate() {
        let due = utc(2024, 1, 1);
        assert_eq!(calculate_fine(due, utc(2024, 1, 15), 7, 5), Decimal::from(35));
    }

    #[test]
    fn fine_truncates_partial_days() {
        let due = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        // 8.5 days late truncates to 8 whole days, one past grace
        let as_of = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        assert_eq!(calculate_fine(due, as_of, 7, 1), Decimal::from(1));
    }

    #[tokio::test]
    async fn required_email_failure_propagates() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send()
            .returning(|_, _, _| Err(AppError::Email("relay down".to_string())));

        let result = dispatch_email(&mailer, "a@b.edu", "s", "b", true).await;
        assert!(matches!(result, Err(AppError::Email(_))));
    }

    #[tokio::test]
    async fn best_effort_email_failure_is_swallowed() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send()
            .returning(|_, _, _| Err(AppError::Email("relay down".to_string())));

        let result = dispatch_email(&mailer, "a@b.edu", "s", "b", false).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn successful_email_is_ok_either_way() {
        let mut mailer = MockMailer::new();
        mailer.expect_send().times(2).returning(|_, _, _| Ok(()));

        assert!(dispatch_email(&mailer, "a@b.edu", "s", "b", true).await.is_ok());
        assert!(dispatch_email(&mailer, "a@b.edu", "s", "b", false).await.is_ok());
    }
}
