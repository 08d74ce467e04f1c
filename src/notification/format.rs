use chrono::{DateTime, Datelike, TimeZone, Utc};
use chrono_tz::Tz;

use crate::models::{Member, Request, TimeFormat};

/// Render the request's date/time range for one recipient.
///
/// Honors the recipient's own date format, clock preference, and timezone.
/// Day-granularity requests render date-only; hour granularity adds the
/// time range. Multi-day ranges compress components the endpoints share:
/// same month and year render the end as a bare day number, same year
/// drops the year from the start.
pub fn format_request_range(request: &Request, recipient: &Member) -> String {
    let tz: Tz = recipient.timezone.parse().unwrap_or(chrono_tz::UTC);
    let start = to_zone(request.start, tz);
    let end = to_zone(request.end, tz);

    if request.leave_unit.is_day_granularity() {
        format_date_range(&start, &end, &recipient.date_format)
    } else {
        let time_pattern = time_pattern(recipient.time_format);
        if start.date_naive() == end.date_naive() {
            format!(
                "{} {} - {}",
                start.format(&recipient.date_format),
                start.format(time_pattern),
                end.format(time_pattern)
            )
        } else {
            format!(
                "{} {} - {} {}",
                start.format(&recipient.date_format),
                start.format(time_pattern),
                end.format(&recipient.date_format),
                end.format(time_pattern)
            )
        }
    }
}

fn to_zone(instant: DateTime<Utc>, tz: Tz) -> DateTime<Tz> {
    tz.from_utc_datetime(&instant.naive_utc())
}

fn time_pattern(format: TimeFormat) -> &'static str {
    match format {
        TimeFormat::Hour12 => "%I:%M %p",
        TimeFormat::Hour24 => "%H:%M",
    }
}

fn format_date_range(start: &DateTime<Tz>, end: &DateTime<Tz>, date_format: &str) -> String {
    if start.date_naive() == end.date_naive() {
        return start.format(date_format).to_string();
    }

    if start.year() == end.year() && start.month() == end.month() {
        // Shared month and year: the end collapses to its day number.
        return format!("{} - {:02}", start.format(date_format), end.day());
    }

    if start.year() == end.year() {
        // Shared year: drop it from the start date.
        let yearless = strip_year(date_format);
        return format!(
            "{} - {}",
            start.format(&yearless),
            end.format(date_format)
        );
    }

    format!("{} - {}", start.format(date_format), end.format(date_format))
}

/// Remove the year specifier (and its neighboring separator) from a chrono
/// date pattern.
fn strip_year(pattern: &str) -> String {
    let without = pattern.replace("%Y", "").replace("%y", "");
    without
        .trim_matches(|c: char| c == '/' || c == '-' || c == '.' || c == ',' || c == ' ')
        .to_string()
}
