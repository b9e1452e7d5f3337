//! Dashboard statistics service

use chrono::{DateTime, Duration, Local, NaiveDate, Timelike, Utc};

use crate::{
    api::stats::{AdminAnalytics, DailyTraffic, TrendDeltas},
    error::AppResult,
    repository::Repository,
};

/// Dashboard windows compare the trailing 30 days against the 30 before
const TREND_WINDOW_DAYS: i64 = 30;

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Aggregate dashboard data: open/overdue counts, an hourly histogram
    /// of the last 30 days of borrows, and trend deltas against the prior
    /// 30-day window.
    pub async fn admin_analytics(&self, now: DateTime<Utc>) -> AppResult<AdminAnalytics> {
        let window = Duration::days(TREND_WINDOW_DAYS);
        let current_start = now - window;
        let previous_start = now - window - window;

        let active_loans = self.repository.borrows.count_active().await?;
        let overdue_loans = self.repository.borrows.count_overdue().await?;

        let (current_borrows, current_returns) = self
            .repository
            .borrows
            .counts_in_window(current_start, now)
            .await?;
        let (previous_borrows, previous_returns) = self
            .repository
            .borrows
            .counts_in_window(previous_start, current_start)
            .await?;

        let dates = self.repository.borrows.borrow_dates_since(current_start).await?;
        let mut hourly_borrows = vec![0i64; 24];
        for date in &dates {
            hourly_borrows[date.with_timezone(&Local).hour() as usize] += 1;
        }

        Ok(AdminAnalytics {
            active_loans,
            overdue_loans,
            borrows_last_30_days: current_borrows,
            returns_last_30_days: current_returns,
            hourly_borrows,
            trends: TrendDeltas {
                borrows_pct: trend_delta(current_borrows, previous_borrows),
                returns_pct: trend_delta(current_returns, previous_returns),
            },
        })
    }

    /// Per-hour check-in counts for one day
    pub async fn daily_traffic(&self, date: NaiveDate) -> AppResult<DailyTraffic> {
        let logs = self.repository.activity.logs_for_date(date).await?;
        let mut hourly = vec![0i64; 24];
        for log in &logs {
            hourly[log.time_in.hour() as usize] += 1;
        }
        Ok(DailyTraffic {
            date,
            total: logs.len() as i64,
            hourly,
        })
    }
}

/// Percentage change against the previous window. An empty previous
/// window counts as +100% growth unless the current one is empty too.
pub fn trend_delta(current: i64, previous: i64) -> f64 {
    if previous == 0 {
        if current == 0 {
            0.0
        } else {
            100.0
        }
    } else {
        (current - previous) as f64 / previous as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_delta_against_nonzero_previous() {
        assert_eq!(trend_delta(150, 100), 50.0);
        assert_eq!(trend_delta(50, 100), -50.0);
        assert_eq!(trend_delta(100, 100), 0.0);
    }

    #[test]
    fn trend_delta_with_empty_previous_window() {
        assert_eq!(trend_delta(7, 0), 100.0);
        assert_eq!(trend_delta(0, 0), 0.0);
    }
}
