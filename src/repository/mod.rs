//! Repository layer for database operations

pub mod activity;
pub mod books;
pub mod borrows;
pub mod notifications;
pub mod students;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
    pub students: students::StudentsRepository,
    pub borrows: borrows::BorrowsRepository,
    pub activity: activity::ActivityRepository,
    pub notifications: notifications::NotificationsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            students: students::StudentsRepository::new(pool.clone()),
            borrows: borrows::BorrowsRepository::new(pool.clone()),
            activity: activity::ActivityRepository::new(pool.clone()),
            notifications: notifications::NotificationsRepository::new(pool.clone()),
            pool,
        }
    }
}
