//! Books repository for catalog operations

use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::book::{AuditEntry, Book, BookQuery, UpdateBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

/// Fields for a new catalog row; the code has already been generated
pub struct NewBook {
    pub code: String,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub issn: Option<String>,
    pub copies: i32,
    pub rack: Option<String>,
    pub shelf: Option<String>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by its external code
    pub async fn get_by_code(&self, code: &str) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with code {} not found", code)))
    }

    /// Get several books at once, for read-side joins
    pub async fn get_by_codes(&self, codes: &[String]) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE code = ANY($1)")
            .bind(codes)
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    /// Insert a new catalog row. A duplicate code (two concurrent
    /// ingestions of the same book) is resolved by re-reading the row the
    /// other writer created, not by retrying the write.
    pub async fn create(&self, book: &NewBook, actor: &str) -> AppResult<Book> {
        let inserted = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (code, title, author, isbn, issn, status, copies, available, rack, shelf)
            VALUES ($1, $2, $3, $4, $5, 'Available', $6, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&book.code)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.issn)
        .bind(book.copies)
        .bind(&book.rack)
        .bind(&book.shelf)
        .fetch_one(&self.pool)
        .await;

        let created = match inserted {
            Ok(b) => b,
            Err(e) => {
                let is_duplicate = e
                    .as_database_error()
                    .map(|db| db.is_unique_violation())
                    .unwrap_or(false);
                if is_duplicate {
                    return self.get_by_code(&book.code).await;
                }
                return Err(e.into());
            }
        };

        self.append_audit(&created.code, "Created", actor, None).await?;
        Ok(created)
    }

    /// List books with optional search and status filters
    pub async fn list(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let search = query
            .search
            .as_ref()
            .map(|s| format!("%{}%", s));

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM books
            WHERE ($1::text IS NULL OR title ILIKE $1 OR author ILIKE $1)
              AND ($2::text IS NULL OR status = $2)
            "#,
        )
        .bind(&search)
        .bind(&query.status)
        .fetch_one(&self.pool)
        .await?;

        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT * FROM books
            WHERE ($1::text IS NULL OR title ILIKE $1 OR author ILIKE $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY title
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&search)
        .bind(&query.status)
        .bind(per_page)
        .bind((page - 1) * per_page)
        .fetch_all(&self.pool)
        .await?;

        Ok((books, total))
    }

    /// Apply a catalog correction. `copies` changes keep `available` in
    /// step so it never exceeds the new total.
    pub async fn update(&self, code: &str, patch: &UpdateBook, actor: &str) -> AppResult<Book> {
        let book = self.get_by_code(code).await?;

        let copies = patch.copies.unwrap_or(book.copies);
        let available = book.available.min(copies);

        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = COALESCE($2, title),
                author = COALESCE($3, author),
                status = COALESCE($4, status),
                copies = $5,
                available = $6,
                updated_at = $7
            WHERE code = $1
            RETURNING *
            "#,
        )
        .bind(code)
        .bind(&patch.title)
        .bind(&patch.author)
        .bind(patch.status)
        .bind(copies)
        .bind(available)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        let details = patch.status.map(|s| format!("Status set to {}", s));
        self.append_audit(code, "Updated", actor, details.as_deref()).await?;

        Ok(updated)
    }

    /// Assign a rack/shelf location
    pub async fn assign_rack(
        &self,
        code: &str,
        rack: &str,
        shelf: Option<&str>,
        actor: &str,
    ) -> AppResult<Book> {
        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET rack = $2, shelf = $3, updated_at = $4
            WHERE code = $1
            RETURNING *
            "#,
        )
        .bind(code)
        .bind(rack)
        .bind(shelf)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with code {} not found", code)))?;

        let details = match shelf {
            Some(s) => format!("Rack {}, shelf {}", rack, s),
            None => format!("Rack {}", rack),
        };
        self.append_audit(code, "Rack assigned", actor, Some(&details)).await?;

        Ok(updated)
    }

    /// Delete a catalog row. Refused while an active borrow record still
    /// references the code.
    pub async fn delete(&self, code: &str) -> AppResult<()> {
        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_records WHERE book_code = $1 AND status != 'Returned'",
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await?;

        if active > 0 {
            return Err(AppError::Rule(
                ErrorCode::BookReferenced,
                format!("Book {} has {} active borrow record(s)", code, active),
            ));
        }

        let result = sqlx::query("DELETE FROM books WHERE code = $1")
            .bind(code)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with code {} not found", code)));
        }
        Ok(())
    }

    /// Append an audit trail entry
    pub async fn append_audit(
        &self,
        code: &str,
        action: &str,
        actor: &str,
        details: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO book_audit (book_code, action, actor, details) VALUES ($1, $2, $3, $4)",
        )
        .bind(code)
        .bind(action)
        .bind(actor)
        .bind(details)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get a book's audit trail, oldest first
    pub async fn audit_trail(&self, code: &str) -> AppResult<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            "SELECT * FROM book_audit WHERE book_code = $1 ORDER BY created_at, id",
        )
        .bind(code)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
