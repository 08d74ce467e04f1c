use chrono::{NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::models::{
    DayBoundary, Member, Request, RequestDetails, Workspace, WorkspaceSchedule,
};

/// Busy status on the synced event.
///
/// Working-elsewhere has no portable wire value; it is represented as the
/// vendor extension "free plus intended status".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShowAs {
    Free,
    Tentative,
    Busy,
    Oof,
    WorkingElsewhere,
}

impl ShowAs {
    /// Value sent in the standard show-as field.
    pub fn wire_value(&self) -> &'static str {
        match self {
            Self::Free | Self::WorkingElsewhere => "free",
            Self::Tentative => "tentative",
            Self::Busy => "busy",
            Self::Oof => "oof",
        }
    }

    /// Vendor-specific intended status extension, when the wire value alone
    /// cannot express the preference.
    pub fn intended_status(&self) -> Option<&'static str> {
        match self {
            Self::WorkingElsewhere => Some("workingElsewhere"),
            _ => None,
        }
    }
}

/// Date-time plus zone name, the shape calendar providers accept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    /// Local wall-clock time, `%Y-%m-%dT%H:%M:%S`
    pub date_time: String,
    /// IANA zone name
    pub time_zone: String,
}

/// Event payload handed to the calendar provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEventPayload {
    pub subject: String,
    pub is_all_day: bool,
    pub start: EventDateTime,
    pub end: EventDateTime,
    pub show_as: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intended_status: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub categories: Vec<String>,
}

/// One day's concrete absence window, resolved from the request's boundary
/// markers and the workspace schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Resolve the absence window for one occurrence date.
///
/// Pure: returns a new value, never touches the request. Middle days span
/// the full working day; the first and last day honor the request's
/// boundary markers.
pub fn occurrence_window(
    request: &Request,
    date: NaiveDate,
    schedule: &WorkspaceSchedule,
) -> TimeWindow {
    let start_time = if date == request.start.date_naive() {
        match request.start_at {
            DayBoundary::Afternoon => schedule.afternoon_start,
            _ => schedule.morning_start,
        }
    } else {
        schedule.morning_start
    };

    let end_time = if date == request.end.date_naive() {
        match request.end_at {
            DayBoundary::Lunchtime => schedule.morning_end,
            _ => schedule.afternoon_end,
        }
    } else {
        schedule.afternoon_end
    };

    TimeWindow {
        start: date.and_time(start_time),
        end: date.and_time(end_time),
    }
}

/// A "day unit" request spanning full morning-to-end-of-day becomes an
/// all-day event; anything finer carries explicit timestamps.
pub fn is_all_day(request: &Request) -> bool {
    request.leave_unit.is_day_granularity()
        && request.start_at == DayBoundary::Morning
        && request.end_at == DayBoundary::EndOfDay
}

/// Build the event payload for one request.
///
/// `subject_override` is the leave-type-specific subject when configured;
/// shared targets without one get "`<name>` - `<leave type>`" so the entry
/// is attributable on a calendar many people read.
#[allow(clippy::too_many_arguments)]
pub fn build_event_payload(
    request: &Request,
    details: &RequestDetails,
    member: &Member,
    workspace: &Workspace,
    shared_target: bool,
    subject_override: Option<&str>,
    show_as: ShowAs,
) -> CalendarEventPayload {
    let subject = match subject_override {
        Some(s) => s.to_string(),
        None if shared_target => {
            format!("{} - {}", member.display_name, details.leave_type_name)
        }
        None => details.leave_type_name.clone(),
    };

    let (is_all_day_event, start, end) = if is_all_day(request) {
        // All-day span: start-date 00:00 to (end-date + 1 day) 00:00 UTC.
        let start_date = request.start.date_naive();
        let end_date = request.end.date_naive() + chrono::Duration::days(1);
        (
            true,
            EventDateTime {
                date_time: format_naive(start_date.and_hms_opt(0, 0, 0).unwrap_or_default()),
                time_zone: "UTC".to_string(),
            },
            EventDateTime {
                date_time: format_naive(end_date.and_hms_opt(0, 0, 0).unwrap_or_default()),
                time_zone: "UTC".to_string(),
            },
        )
    } else {
        let zone_name = resolve_zone(member, workspace);
        let tz: Tz = zone_name.parse().unwrap_or(chrono_tz::UTC);
        (
            false,
            EventDateTime {
                date_time: format_naive(tz.from_utc_datetime(&request.start.naive_utc()).naive_local()),
                time_zone: zone_name.clone(),
            },
            EventDateTime {
                date_time: format_naive(tz.from_utc_datetime(&request.end.naive_utc()).naive_local()),
                time_zone: zone_name,
            },
        )
    };

    let categories = workspace
        .outside_tracking_category
        .iter()
        .cloned()
        .collect();

    CalendarEventPayload {
        subject,
        is_all_day: is_all_day_event,
        start,
        end,
        show_as: show_as.wire_value().to_string(),
        intended_status: show_as.intended_status().map(str::to_string),
        categories,
    }
}

fn resolve_zone(member: &Member, workspace: &Workspace) -> String {
    if member.timezone.parse::<Tz>().is_ok() {
        member.timezone.clone()
    } else if workspace.default_timezone.parse::<Tz>().is_ok() {
        workspace.default_timezone.clone()
    } else {
        "UTC".to_string()
    }
}

fn format_naive(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}
