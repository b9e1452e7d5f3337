//! Seat occupancy workflow: check-in, check-out, transfer, analytics
//!
//! Occupancy is counted against one of four seat buckets by re-reading
//! the day's open logs on every request. The read-then-write capacity
//! check is not serialized against concurrent check-ins for the last
//! seat; see DESIGN.md.

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use indexmap::IndexMap;

use crate::{
    config::SeatingConfig,
    error::{AppError, AppResult, ErrorCode},
    models::activity::{
        ActivityLog, LeaderboardEntry, SeatBucket, Section, SectionMinutes, StudentAnalytics,
        TransferRequest,
    },
    repository::{activity::NewLog, Repository},
};

/// Analytics look at the trailing 30 days of completed sessions
const ANALYTICS_WINDOW_DAYS: i64 = 30;

#[derive(Clone)]
pub struct OccupancyService {
    repository: Repository,
    seating: SeatingConfig,
}

impl OccupancyService {
    pub fn new(repository: Repository, seating: SeatingConfig) -> Self {
        Self { repository, seating }
    }

    fn capacity(&self, section: Section) -> i64 {
        match section {
            Section::Central => self.seating.central,
            Section::Reference => self.seating.reference,
            Section::Reading => self.seating.reading,
            Section::Elibrary => self.seating.elibrary,
        }
    }

    /// Check a student into a section. A student already checked in
    /// anywhere must check out first.
    pub async fn check_in(
        &self,
        roll_number: &str,
        section_key: &str,
        now: NaiveDateTime,
    ) -> AppResult<ActivityLog> {
        if roll_number.trim().is_empty() || section_key.trim().is_empty() {
            return Err(AppError::Validation(
                "roll_number and section are required".to_string(),
            ));
        }

        let section = parse_section(section_key)?;
        let student = self.repository.students.get_by_roll(roll_number).await?;

        let today = now.date();
        if let Some(open) = self
            .repository
            .activity
            .find_any_open_log(&student.roll_number, today)
            .await?
        {
            return Err(AppError::Rule(
                ErrorCode::AlreadyCheckedIn,
                format!(
                    "{} is already checked in at {}",
                    student.roll_number, open.section
                ),
            ));
        }

        let label = section.resolve_label(now);
        let occupied = self.occupied(section, today).await?;
        ensure_seat_free(occupied, self.capacity(section), label)?;

        self.repository
            .activity
            .create(&NewLog {
                roll_number: student.roll_number.clone(),
                name: student.name.clone(),
                branch: student.branch.clone(),
                section: label.to_string(),
                is_study_section: label == "Reference - Study Section",
                log_date: today,
                time_in: now.time(),
            })
            .await
    }

    /// Check a student out. Matches the open log by bucket, so a
    /// "Reference" check-in is found even after the study-section cutover.
    pub async fn check_out(
        &self,
        roll_number: &str,
        section_key: &str,
        now: NaiveDateTime,
    ) -> AppResult<ActivityLog> {
        let section = parse_section(section_key)?;
        let today = now.date();

        let open = self
            .repository
            .activity
            .find_open_log(roll_number, today, &bucket_labels(section))
            .await?
            .ok_or_else(|| {
                AppError::Rule(
                    ErrorCode::NoActiveCheckIn,
                    format!(
                        "No active check-in found for {} in {}",
                        roll_number,
                        section.key()
                    ),
                )
            })?;

        let time_in = open.log_date.and_time(open.time_in);
        let time_out = open.log_date.and_time(now.time());
        let duration = format_duration(time_in, time_out);

        self.repository.activity.close(open.id, now.time(), &duration).await
    }

    /// Move an open session to another section without closing it. The
    /// original check-in time survives, so the eventual duration covers
    /// the whole visit.
    pub async fn transfer(
        &self,
        request: &TransferRequest,
        now: NaiveDateTime,
    ) -> AppResult<ActivityLog> {
        let from = parse_section(&request.from_section)?;
        let to = parse_section(&request.to_section)?;
        let today = now.date();

        let open = self
            .repository
            .activity
            .find_open_log(&request.roll_number, today, &bucket_labels(from))
            .await?
            .ok_or_else(|| {
                AppError::Rule(
                    ErrorCode::NoActiveCheckIn,
                    format!(
                        "No active check-in found for {} in {}",
                        request.roll_number,
                        from.key()
                    ),
                )
            })?;

        let label = if to == Section::Reference && request.is_study_section {
            "Reference - Study Section"
        } else {
            to.resolve_label(now)
        };

        let occupied = self.occupied(to, today).await?;
        ensure_seat_free(occupied, self.capacity(to), label)?;

        self.repository
            .activity
            .update_section(open.id, label, label == "Reference - Study Section")
            .await
    }

    /// Occupancy snapshot per seat bucket, in fixed section order
    pub async fn seat_availability(
        &self,
        now: NaiveDateTime,
    ) -> AppResult<IndexMap<&'static str, SeatBucket>> {
        let today = now.date();
        let mut snapshot = IndexMap::new();
        for section in Section::all() {
            let occupied = self.occupied(section, today).await?;
            snapshot.insert(
                section.key(),
                SeatBucket {
                    total: self.capacity(section),
                    occupied,
                },
            );
        }
        Ok(snapshot)
    }

    /// Per-student analytics over the trailing 30 days of completed
    /// sessions
    pub async fn student_analytics(
        &self,
        roll_number: &str,
        now: NaiveDateTime,
    ) -> AppResult<StudentAnalytics> {
        let student = self.repository.students.get_by_roll(roll_number).await?;
        let since = now.date() - Duration::days(ANALYTICS_WINDOW_DAYS);
        let logs = self.repository.activity.checked_out_since(since).await?;

        let totals = aggregate_totals(&logs);
        let rank = rank_of(&totals, &student.roll_number);

        let own: Vec<&ActivityLog> = logs
            .iter()
            .filter(|l| l.roll_number.eq_ignore_ascii_case(&student.roll_number))
            .collect();

        let total_visits = own.len() as i64;
        let total_minutes: i64 = own.iter().map(|l| session_minutes(l)).sum();
        let average_minutes = if total_visits > 0 {
            total_minutes / total_visits
        } else {
            0
        };

        let mut by_section: IndexMap<String, SectionMinutes> = IndexMap::new();
        for log in &own {
            let entry = by_section
                .entry(log.section.clone())
                .or_insert_with(|| SectionMinutes {
                    section: log.section.clone(),
                    minutes: 0,
                    visits: 0,
                });
            entry.minutes += session_minutes(log);
            entry.visits += 1;
        }

        let mut hourly_visits = vec![0i64; 24];
        for log in &own {
            hourly_visits[log.time_in.hour() as usize] += 1;
        }
        let peak_hour = peak_hour(&hourly_visits);

        Ok(StudentAnalytics {
            roll_number: student.roll_number,
            total_visits,
            total_minutes,
            average_minutes,
            by_section: by_section.into_values().collect(),
            hourly_visits,
            peak_hour,
            rank,
        })
    }

    /// 30-day leaderboard, ranked by total minutes. Ties keep first-seen
    /// order (stable sort).
    pub async fn leaderboard(&self, now: NaiveDateTime) -> AppResult<Vec<LeaderboardEntry>> {
        let since = now.date() - Duration::days(ANALYTICS_WINDOW_DAYS);
        let logs = self.repository.activity.checked_out_since(since).await?;
        Ok(aggregate_totals(&logs)
            .into_iter()
            .enumerate()
            .map(|(i, t)| LeaderboardEntry {
                rank: i + 1,
                roll_number: t.roll_number,
                name: t.name,
                total_minutes: t.minutes,
                total_visits: t.visits,
            })
            .collect())
    }

    async fn occupied(&self, section: Section, date: NaiveDate) -> AppResult<i64> {
        self.repository
            .activity
            .count_open(date, &bucket_labels(section))
            .await
    }
}

fn parse_section(key: &str) -> AppResult<Section> {
    Section::from_key(key).ok_or_else(|| {
        AppError::Rule(
            ErrorCode::InvalidSection,
            format!("Unknown section: {}", key),
        )
    })
}

fn bucket_labels(section: Section) -> Vec<String> {
    section.labels().iter().map(|l| l.to_string()).collect()
}

/// Reject a check-in or transfer when the bucket is at its ceiling
fn ensure_seat_free(occupied: i64, capacity: i64, label: &str) -> AppResult<()> {
    if occupied >= capacity {
        return Err(AppError::Rule(
            ErrorCode::NoSeatsAvailable,
            format!("No seats available in {}", label),
        ));
    }
    Ok(())
}

/// Whole minutes spent in a completed session
fn session_minutes(log: &ActivityLog) -> i64 {
    match log.time_out {
        Some(out) => {
            let diff = log.log_date.and_time(out) - log.log_date.and_time(log.time_in);
            diff.num_milliseconds() / 60_000
        }
        None => 0,
    }
}

/// Render a session span as "Xh Ym"
fn format_duration(time_in: NaiveDateTime, time_out: NaiveDateTime) -> String {
    let diff_ms = (time_out - time_in).num_milliseconds();
    let hours = diff_ms / 3_600_000;
    let minutes = (diff_ms % 3_600_000) / 60_000;
    format!("{}h {}m", hours, minutes)
}

struct StudentTotals {
    roll_number: String,
    name: String,
    minutes: i64,
    visits: i64,
}

/// Fold completed sessions into per-student totals and sort descending
/// by minutes. The fold keeps first-seen order and the sort is stable,
/// so ties rank in the order students first appear in the log stream.
fn aggregate_totals(logs: &[ActivityLog]) -> Vec<StudentTotals> {
    let mut totals: IndexMap<String, StudentTotals> = IndexMap::new();
    for log in logs {
        let key = log.roll_number.to_lowercase();
        let entry = totals.entry(key).or_insert_with(|| StudentTotals {
            roll_number: log.roll_number.clone(),
            name: log.name.clone(),
            minutes: 0,
            visits: 0,
        });
        entry.minutes += session_minutes(log);
        entry.visits += 1;
    }
    let mut list: Vec<StudentTotals> = totals.into_values().collect();
    list.sort_by(|a, b| b.minutes.cmp(&a.minutes));
    list
}

/// 1-based leaderboard position, None without qualifying logs
fn rank_of(totals: &[StudentTotals], roll_number: &str) -> Option<usize> {
    totals
        .iter()
        .position(|t| t.roll_number.eq_ignore_ascii_case(roll_number))
        .map(|i| i + 1)
}

/// Hour with the most visits; None when there are none at all
fn peak_hour(hourly: &[i64]) -> Option<u32> {
    let (hour, &count) = hourly
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))?;
    if count > 0 {
        Some(hour as u32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::activity::SessionStatus;
    use chrono::{NaiveDate, NaiveTime};

    fn dt(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn closed_log(roll: &str, name: &str, section: &str, in_hm: (u32, u32), out_hm: (u32, u32)) -> ActivityLog {
        ActivityLog {
            id: 0,
            roll_number: roll.to_string(),
            name: name.to_string(),
            branch: None,
            section: section.to_string(),
            is_study_section: section == "Reference - Study Section",
            log_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            time_in: NaiveTime::from_hms_opt(in_hm.0, in_hm.1, 0).unwrap(),
            time_out: Some(NaiveTime::from_hms_opt(out_hm.0, out_hm.1, 0).unwrap()),
            status: SessionStatus::CheckedOut,
            duration: None,
        }
    }

    #[test]
    fn reference_label_cuts_over_at_1630() {
        assert_eq!(Section::Reference.resolve_label(dt(16, 29)), "Reference");
        assert_eq!(
            Section::Reference.resolve_label(dt(16, 30)),
            "Reference - Study Section"
        );
        assert_eq!(
            Section::Reference.resolve_label(dt(20, 0)),
            "Reference - Study Section"
        );
    }

    #[test]
    fn other_labels_ignore_time_of_day() {
        assert_eq!(Section::Central.resolve_label(dt(9, 0)), "Central Library");
        assert_eq!(Section::Central.resolve_label(dt(22, 0)), "Central Library");
        assert_eq!(Section::Reading.resolve_label(dt(17, 0)), "Reading Room");
        assert_eq!(Section::Elibrary.resolve_label(dt(17, 0)), "E-Library");
    }

    #[test]
    fn both_reference_labels_share_one_bucket() {
        assert_eq!(Section::from_label("Reference"), Some(Section::Reference));
        assert_eq!(
            Section::from_label("Reference - Study Section"),
            Some(Section::Reference)
        );
        assert_eq!(Section::Reference.labels().len(), 2);
    }

    #[test]
    fn unknown_section_is_rejected() {
        assert!(matches!(
            parse_section("basement"),
            Err(AppError::Rule(ErrorCode::InvalidSection, _))
        ));
    }

    #[test]
    fn seat_guard_rejects_at_capacity() {
        assert!(ensure_seat_free(449, 450, "Central Library").is_ok());
        let err = ensure_seat_free(450, 450, "Central Library");
        assert!(matches!(err, Err(AppError::Rule(ErrorCode::NoSeatsAvailable, _))));
    }

    #[test]
    fn duration_formats_hours_and_minutes() {
        assert_eq!(format_duration(dt(9, 0), dt(11, 45)), "2h 45m");
        assert_eq!(format_duration(dt(9, 0), dt(9, 5)), "0h 5m");
        assert_eq!(format_duration(dt(9, 0), dt(9, 0)), "0h 0m");
    }

    #[test]
    fn session_minutes_counts_whole_minutes() {
        let log = closed_log("CS101", "A", "Central Library", (9, 0), (10, 30));
        assert_eq!(session_minutes(&log), 90);
    }

    #[test]
    fn rank_ties_keep_first_seen_order() {
        // A: 120 minutes, B: 90, C: 120 — A appears before C in the
        // stream, so A ranks 1 and C ranks 2 under the stable sort.
        let logs = vec![
            closed_log("A", "Alice", "Central Library", (9, 0), (11, 0)),
            closed_log("B", "Bo", "Central Library", (9, 0), (10, 30)),
            closed_log("C", "Cam", "Reading Room", (12, 0), (14, 0)),
        ];
        let totals = aggregate_totals(&logs);
        assert_eq!(rank_of(&totals, "A"), Some(1));
        assert_eq!(rank_of(&totals, "C"), Some(2));
        assert_eq!(rank_of(&totals, "B"), Some(3));
        assert_eq!(rank_of(&totals, "nobody"), None);
    }

    #[test]
    fn totals_accumulate_across_sessions() {
        let logs = vec![
            closed_log("A", "Alice", "Central Library", (9, 0), (10, 0)),
            closed_log("a", "Alice", "Reading Room", (12, 0), (12, 30)),
        ];
        let totals = aggregate_totals(&logs);
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].minutes, 90);
        assert_eq!(totals[0].visits, 2);
    }

    #[test]
    fn peak_hour_is_argmax_or_none() {
        let mut hourly = vec![0i64; 24];
        assert_eq!(peak_hour(&hourly), None);
        hourly[9] = 2;
        hourly[14] = 5;
        assert_eq!(peak_hour(&hourly), Some(14));
    }
}
