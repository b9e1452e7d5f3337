//! Catalog service: book ingestion, corrections, rack assignments

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::book::{AuditEntry, Book, BookList, BookQuery, CreateBook, UpdateBook},
    repository::{books::NewBook, Repository},
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Ingest a catalog entry. The external code is generated from the
    /// ingestion timestamp and the ISBN/ISSN; a concurrent ingestion of
    /// the same code is resolved in the repository by re-reading.
    pub async fn create_book(&self, request: CreateBook, actor: &str) -> AppResult<Book> {
        let code = generate_code(
            request.isbn.as_deref(),
            request.issn.as_deref(),
            Utc::now(),
        )?;

        self.repository
            .books
            .create(
                &NewBook {
                    code,
                    title: request.title,
                    author: request.author,
                    isbn: request.isbn,
                    issn: request.issn,
                    copies: request.copies,
                    rack: request.rack,
                    shelf: request.shelf,
                },
                actor,
            )
            .await
    }

    pub async fn get_book(&self, code: &str) -> AppResult<Book> {
        self.repository.books.get_by_code(code).await
    }

    pub async fn list_books(&self, query: BookQuery) -> AppResult<BookList> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let (items, total) = self.repository.books.list(&query).await?;
        Ok(BookList {
            items,
            total,
            page,
            per_page,
        })
    }

    pub async fn update_book(
        &self,
        code: &str,
        patch: UpdateBook,
        actor: &str,
    ) -> AppResult<Book> {
        self.repository.books.update(code, &patch, actor).await
    }

    pub async fn assign_rack(
        &self,
        code: &str,
        rack: &str,
        shelf: Option<&str>,
        actor: &str,
    ) -> AppResult<Book> {
        self.repository.books.assign_rack(code, rack, shelf, actor).await
    }

    pub async fn delete_book(&self, code: &str) -> AppResult<()> {
        self.repository.books.delete(code).await
    }

    pub async fn audit_trail(&self, code: &str) -> AppResult<Vec<AuditEntry>> {
        // 404 for unknown codes rather than an empty trail
        self.repository.books.get_by_code(code).await?;
        self.repository.books.audit_trail(code).await
    }
}

/// Build the stable external code: `B<millis>-<isbn>` for books,
/// `J<millis>-<issn>` for journals. Exactly one identifier must be given.
pub fn generate_code(
    isbn: Option<&str>,
    issn: Option<&str>,
    at: DateTime<Utc>,
) -> AppResult<String> {
    match (isbn, issn) {
        (Some(isbn), None) => Ok(format!("B{}-{}", at.timestamp_millis(), isbn)),
        (None, Some(issn)) => Ok(format!("J{}-{}", at.timestamp_millis(), issn)),
        (Some(_), Some(_)) => Err(AppError::Validation(
            "Provide either isbn or issn, not both".to_string(),
        )),
        (None, None) => Err(AppError::Validation(
            "Either isbn or issn is required".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn book_codes_use_the_b_prefix_and_isbn() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let code = generate_code(Some("978-0134685991"), None, at).unwrap();
        assert_eq!(code, format!("B{}-978-0134685991", at.timestamp_millis()));
    }

    #[test]
    fn journal_codes_use_the_j_prefix_and_issn() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let code = generate_code(None, Some("0028-0836"), at).unwrap();
        assert!(code.starts_with('J'));
        assert!(code.ends_with("-0028-0836"));
    }

    #[test]
    fn exactly_one_identifier_is_required() {
        let at = Utc::now();
        assert!(generate_code(None, None, at).is_err());
        assert!(generate_code(Some("x"), Some("y"), at).is_err());
    }
}
