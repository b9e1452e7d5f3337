//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{activity, books, borrows, health, notifications, stats};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Campus Library API",
        version = "1.0.0",
        description = "Campus Library Management System REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api", description = "API root")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::assign_rack,
        books::delete_book,
        books::audit_trail,
        // Borrow records
        borrows::borrow,
        borrows::list_records,
        borrows::get_record,
        borrows::return_book,
        borrows::update_record,
        borrows::extend,
        borrows::mark_fine_paid,
        borrows::waive_fine,
        borrows::send_reminder,
        // Activity logs
        activity::check_in,
        activity::check_out,
        activity::transfer,
        activity::seat_availability,
        activity::student_analytics,
        activity::leaderboard,
        // Notifications
        notifications::list_notifications,
        notifications::mark_read,
        // Stats
        stats::admin_analytics,
        stats::daily_traffic,
    ),
    components(
        schemas(
            // Books
            crate::models::book::Book,
            crate::models::book::BookSummary,
            crate::models::book::BookStatus,
            crate::models::book::BookQuery,
            crate::models::book::BookList,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::book::AssignRack,
            crate::models::book::AuditEntry,
            // Students
            crate::models::student::Student,
            crate::models::student::StudentSummary,
            crate::models::student::Role,
            // Borrow records
            crate::models::borrow::BorrowRecord,
            crate::models::borrow::BorrowDetails,
            crate::models::borrow::BorrowStatus,
            crate::models::borrow::PaymentStatus,
            crate::models::borrow::CreateBorrow,
            crate::models::borrow::ReturnBorrow,
            crate::models::borrow::UpdateBorrow,
            crate::models::borrow::ExtendBorrow,
            crate::models::borrow::PayFine,
            crate::models::borrow::SendReminder,
            crate::models::borrow::ReminderKind,
            crate::models::borrow::BorrowQuery,
            crate::models::borrow::BorrowList,
            // Activity logs
            crate::models::activity::ActivityLog,
            crate::models::activity::Section,
            crate::models::activity::SessionStatus,
            crate::models::activity::ScanRequest,
            crate::models::activity::TransferRequest,
            crate::models::activity::SeatBucket,
            crate::models::activity::StudentAnalytics,
            crate::models::activity::SectionMinutes,
            crate::models::activity::LeaderboardEntry,
            crate::models::activity::AnalyticsQuery,
            // Notifications
            crate::models::notification::Notification,
            crate::models::notification::NotificationKind,
            // Stats
            stats::AdminAnalytics,
            stats::TrendDeltas,
            stats::DailyTraffic,
            stats::DailyTrafficQuery,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Catalog management"),
        (name = "borrow-records", description = "Borrow lifecycle"),
        (name = "activity-logs", description = "Seat occupancy tracking"),
        (name = "notifications", description = "Student notifications"),
        (name = "stats", description = "Dashboard statistics")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
