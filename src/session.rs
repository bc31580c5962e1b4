use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Sentinel session id meaning "no session filter".
pub const ALL_SESSIONS: &str = "all";

/// Attendance record as returned by the persistence service. Fields the
/// service may omit (legacy rows predate session ids) default to empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub student_external_id: String,
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub class_id: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub session_started_at: String,
}

/// Derived grouping of records sharing a session id. Never persisted;
/// rebuilt from scratch on every aggregation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub started_at: String,
    pub records: Vec<AttendanceRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAggregate {
    pub sessions: Vec<Session>,
    /// Active record set after session selection, sorted for display.
    pub records: Vec<AttendanceRecord>,
    pub unique_present: usize,
    /// round(100 * unique_present / roster_size); None when the roster size
    /// is zero or unknown.
    pub ratio_percent: Option<i64>,
}

/// Parse an instant to epoch milliseconds. Accepts RFC 3339 and the
/// zone-less `YYYY-MM-DDTHH:MM:SS[.fff]` form the persistence service emits
/// (naive values are taken as UTC). Anything unparseable is epoch zero so
/// that malformed rows sort instead of failing.
pub fn parse_instant_ms(raw: &str) -> i64 {
    let t = raw.trim();
    if t.is_empty() {
        return 0;
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(t) {
        return dt.timestamp_millis();
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M:%S%.f") {
        return naive.and_utc().timestamp_millis();
    }
    0
}

fn is_present(record: &AttendanceRecord) -> bool {
    record.status.eq_ignore_ascii_case("present")
}

/// Partition records into sessions keyed by session id. Records with an
/// empty session id belong to no group. A session's `started_at` comes from
/// the first-seen record's `sessionStartedAt`, falling back to that record's
/// `timestamp` when empty. The fallback means a session whose first-seen row
/// is a straggler can appear to start later than its true first capture;
/// kept as-is because stored rows carry no better start marker.
pub fn group_sessions(records: &[AttendanceRecord], direction: SortDirection) -> Vec<Session> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Session> = HashMap::new();

    for record in records {
        if record.session_id.is_empty() {
            continue;
        }
        let group = groups
            .entry(record.session_id.clone())
            .or_insert_with(|| {
                order.push(record.session_id.clone());
                let started_at = if record.session_started_at.is_empty() {
                    record.timestamp.clone()
                } else {
                    record.session_started_at.clone()
                };
                Session {
                    id: record.session_id.clone(),
                    started_at,
                    records: Vec::new(),
                }
            });
        group.records.push(record.clone());
    }

    let mut sessions: Vec<Session> = order
        .into_iter()
        .filter_map(|id| groups.remove(&id))
        .collect();
    // Stable sort keeps encounter order for equal start instants; descending
    // is the exact reverse of ascending.
    sessions.sort_by_key(|s| parse_instant_ms(&s.started_at));
    if direction == SortDirection::Desc {
        sessions.reverse();
    }
    sessions
}

/// Resolve the active record set for a session selection. `None`, empty and
/// the `"all"` sentinel mean no filter; an id with no matching group yields
/// an empty set, never an error.
pub fn select_records(
    records: &[AttendanceRecord],
    sessions: &[Session],
    selected_session_id: Option<&str>,
) -> Vec<AttendanceRecord> {
    match selected_session_id {
        None => records.to_vec(),
        Some(id) if id.is_empty() || id == ALL_SESSIONS => records.to_vec(),
        Some(id) => sessions
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.records.clone())
            .unwrap_or_default(),
    }
}

/// Count distinct students marked present (case-insensitive status compare).
pub fn unique_present_count(records: &[AttendanceRecord]) -> usize {
    records
        .iter()
        .filter(|r| is_present(r))
        .map(|r| r.student_id.as_str())
        .collect::<HashSet<_>>()
        .len()
}

pub fn ratio_percent(unique_present: usize, roster_size: usize) -> Option<i64> {
    if roster_size == 0 {
        return None;
    }
    Some((100.0 * unique_present as f64 / roster_size as f64).round() as i64)
}

/// Presentation-only ordering: most recent capture first. Stable, so rows
/// with identical timestamps keep their incoming order.
pub fn sort_for_display(records: &mut [AttendanceRecord]) {
    records.sort_by_key(|r| std::cmp::Reverse(parse_instant_ms(&r.timestamp)));
}

/// The session with the most recent start among the given records, with its
/// records. Start basis is `sessionStartedAt` falling back to `timestamp`.
pub fn recent_session_records(records: &[AttendanceRecord]) -> Vec<AttendanceRecord> {
    if records.is_empty() {
        return Vec::new();
    }
    let mut sorted: Vec<&AttendanceRecord> = records.iter().collect();
    sorted.sort_by_key(|r| {
        let basis = if r.session_started_at.is_empty() {
            &r.timestamp
        } else {
            &r.session_started_at
        };
        std::cmp::Reverse(parse_instant_ms(basis))
    });
    let latest_id = sorted[0].session_id.clone();
    sorted
        .into_iter()
        .filter(|r| r.session_id == latest_id)
        .cloned()
        .collect()
}

/// One-shot aggregation used by the class, report and dashboard views.
/// Pure function of its inputs; never fails, all malformed inputs degrade
/// to empty groups, zero counts or a null ratio.
pub fn aggregate(
    records: &[AttendanceRecord],
    direction: SortDirection,
    selected_session_id: Option<&str>,
    roster_size: Option<usize>,
) -> SessionAggregate {
    let mut sessions = group_sessions(records, direction);
    let mut active = select_records(records, &sessions, selected_session_id);
    for session in &mut sessions {
        sort_for_display(&mut session.records);
    }
    sort_for_display(&mut active);
    let unique_present = unique_present_count(&active);
    let ratio = roster_size.and_then(|n| ratio_percent(unique_present, n));
    SessionAggregate {
        sessions,
        records: active,
        unique_present,
        ratio_percent: ratio,
    }
}
