//! Lenient parsing of publication dates reported by extracted pages.

use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

/// Parse a publication date, returning `None` for blank or unparseable input.
///
/// Accepts RFC 3339, RFC 2822, ISO-style local date-times (`T` or space separator, seconds and
/// fractional seconds optional, read as UTC), `YYYY-MM-DD`, and written-out dates such as
/// `May 1, 2024` or `1 May 2024` (midnight UTC). Impossible calendar dates such as
/// `2024-02-30` are rejected.
pub fn parse_published_at(raw: Option<&str>) -> Option<OffsetDateTime> {
    let value = raw?.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(instant) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(instant);
    }
    if let Ok(instant) = OffsetDateTime::parse(value, &Rfc2822) {
        return Some(instant);
    }

    let local_layouts: [&[_]; 6] = [
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]"),
    ];
    if let Some(local) = local_layouts
        .iter()
        .find_map(|layout| PrimitiveDateTime::parse(value, *layout).ok())
    {
        return Some(local.assume_utc());
    }

    let date_layouts: [&[_]; 5] = [
        format_description!("[year]-[month]-[day]"),
        format_description!("[month repr:long] [day padding:none], [year]"),
        format_description!("[month repr:short] [day padding:none], [year]"),
        format_description!("[month repr:long] [day padding:none] [year]"),
        format_description!("[day padding:none] [month repr:long] [year]"),
    ];
    match date_layouts
        .iter()
        .find_map(|layout| Date::parse(value, *layout).ok())
    {
        Some(date) => Some(date.midnight().assume_utc()),
        None => {
            tracing::debug!(value, "Ignoring unparseable publication date");
            None
        }
    }
}
