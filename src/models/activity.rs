//! Seat occupancy models: sections and check-in session logs

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};

/// The four capacity-limited seat buckets. Occupancy is always counted
/// against a bucket, independent of the display label stored on a log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Central,
    Reference,
    Reading,
    Elibrary,
}

/// Cutover after which "reference" check-ins are labelled as the study
/// section (16:30 local time).
const STUDY_SECTION_CUTOVER: (u32, u32) = (16, 30);

impl Section {
    /// Parse the raw section key sent by the scanner
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_lowercase().as_str() {
            "central" => Some(Section::Central),
            "reference" => Some(Section::Reference),
            "reading" => Some(Section::Reading),
            "elibrary" => Some(Section::Elibrary),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Section::Central => "central",
            Section::Reference => "reference",
            Section::Reading => "reading",
            Section::Elibrary => "elibrary",
        }
    }

    /// Resolve the display label for a check-in at the given local time.
    /// Only `reference` is time-dependent; both of its labels count
    /// against the same bucket.
    pub fn resolve_label(&self, now: NaiveDateTime) -> &'static str {
        match self {
            Section::Central => "Central Library",
            Section::Reading => "Reading Room",
            Section::Elibrary => "E-Library",
            Section::Reference => {
                let cutover =
                    NaiveTime::from_hms_opt(STUDY_SECTION_CUTOVER.0, STUDY_SECTION_CUTOVER.1, 0)
                        .unwrap();
                if now.time() >= cutover {
                    "Reference - Study Section"
                } else {
                    "Reference"
                }
            }
        }
    }

    /// All display labels that count against this bucket. Used when
    /// matching an open log at check-out: the stored label is whatever the
    /// check-in resolved, not necessarily today's resolution.
    pub fn labels(&self) -> &'static [&'static str] {
        match self {
            Section::Central => &["Central Library"],
            Section::Reading => &["Reading Room"],
            Section::Elibrary => &["E-Library"],
            Section::Reference => &["Reference", "Reference - Study Section"],
        }
    }

    /// Map a stored display label back to its bucket
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Central Library" => Some(Section::Central),
            "Reading Room" => Some(Section::Reading),
            "E-Library" => Some(Section::Elibrary),
            "Reference" | "Reference - Study Section" => Some(Section::Reference),
            _ => None,
        }
    }

    /// Bucket iteration order for availability snapshots
    pub fn all() -> [Section; 4] {
        [
            Section::Central,
            Section::Reference,
            Section::Reading,
            Section::Elibrary,
        ]
    }
}

/// Session state: CheckedIn → CheckedOut is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum SessionStatus {
    #[serde(rename = "Checked In")]
    CheckedIn,
    #[serde(rename = "Checked Out")]
    CheckedOut,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::CheckedIn => "Checked In",
            SessionStatus::CheckedOut => "Checked Out",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Checked In" => Ok(SessionStatus::CheckedIn),
            "Checked Out" => Ok(SessionStatus::CheckedOut),
            _ => Err(format!("Invalid session status: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for SessionStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for SessionStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for SessionStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// One check-in/check-out session for a student in a physical section
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ActivityLog {
    pub id: i32,
    pub roll_number: String,
    pub name: String,
    pub branch: Option<String>,
    /// Resolved display label, e.g. "Reference - Study Section"
    pub section: String,
    pub is_study_section: bool,
    pub log_date: NaiveDate,
    pub time_in: NaiveTime,
    pub time_out: Option<NaiveTime>,
    pub status: SessionStatus,
    /// Display string "Xh Ym", set at check-out
    pub duration: Option<String>,
}

/// Scanner check-in / check-out request
#[derive(Debug, Deserialize, ToSchema)]
pub struct ScanRequest {
    pub roll_number: String,
    pub section: String,
}

/// Transfer an open session between sections
#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferRequest {
    pub roll_number: String,
    pub from_section: String,
    pub to_section: String,
    #[serde(default)]
    pub is_study_section: bool,
}

/// Occupancy snapshot for one seat bucket
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct SeatBucket {
    pub total: i64,
    pub occupied: i64,
}

/// Per-student 30-day analytics
#[derive(Debug, Serialize, ToSchema)]
pub struct StudentAnalytics {
    pub roll_number: String,
    pub total_visits: i64,
    pub total_minutes: i64,
    pub average_minutes: i64,
    /// Minutes per section display label
    pub by_section: Vec<SectionMinutes>,
    /// Visit counts per hour of day (24 buckets)
    pub hourly_visits: Vec<i64>,
    /// Hour of day with the most visits, if any
    pub peak_hour: Option<u32>,
    /// 1-based position in the 30-day leaderboard; null without
    /// qualifying logs
    pub rank: Option<usize>,
}

/// Minutes spent in one section
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SectionMinutes {
    pub section: String,
    pub minutes: i64,
    pub visits: i64,
}

/// One leaderboard row
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub roll_number: String,
    pub name: String,
    pub total_minutes: i64,
    pub total_visits: i64,
}

/// Analytics query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct AnalyticsQuery {
    /// Roll number; defaults to the caller's own
    pub roll_number: Option<String>,
}
