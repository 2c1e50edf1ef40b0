// ABOUTME: Date parsing for feed timestamps and HTTP date headers.
// ABOUTME: Handles RFC 3339, RFC 2822, named zones, RFC 850 and asctime forms.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// Parses a datetime string using the formats seen in RSS/Atom documents.
/// Returns UTC datetime if successful, None if no format matches.
pub fn parse_flexible_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    // Atom and dc:date
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    // RSS pubDate
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Some(dt) = parse_with_named_timezone(s) {
        return Some(dt);
    }

    let formats_with_tz = [
        "%a, %d %b %Y %H:%M:%S %z",
        "%a, %e %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M:%S %z",
        "%e %b %Y %H:%M:%S %z",
        "%Y-%m-%dT%H:%M:%S%:z",
        "%Y-%m-%dT%H:%M:%S%z",
        "%Y-%m-%dT%H:%M%:z",
    ];
    for fmt in &formats_with_tz {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    // No zone: assume UTC.
    let formats_naive = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%d %b %Y %H:%M:%S",
        "%e %b %Y %H:%M:%S",
    ];
    for fmt in &formats_naive {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    for fmt in ["%Y-%m-%d", "%d %b %Y"] {
        if let Ok(date) = chrono::NaiveDate::parse_from_str(s, fmt) {
            let naive_dt = date.and_hms_opt(0, 0, 0)?;
            return Some(Utc.from_utc_datetime(&naive_dt));
        }
    }

    None
}

/// Parses datetime strings with named timezones (MST, PST, EST, etc.).
/// chrono's %Z doesn't parse these, so the offset is applied by hand.
fn parse_with_named_timezone(s: &str) -> Option<DateTime<Utc>> {
    const TZ_OFFSETS: &[(&str, i32)] = &[
        ("GMT", 0),
        ("UTC", 0),
        ("UT", 0),
        ("Z", 0),
        ("EST", -5 * 3600),
        ("EDT", -4 * 3600),
        ("CST", -6 * 3600),
        ("CDT", -5 * 3600),
        ("MST", -7 * 3600),
        ("MDT", -6 * 3600),
        ("PST", -8 * 3600),
        ("PDT", -7 * 3600),
        ("AKST", -9 * 3600),
        ("AKDT", -8 * 3600),
        ("HST", -10 * 3600),
        ("CET", 3600),
        ("CEST", 2 * 3600),
        ("EET", 2 * 3600),
        ("EEST", 3 * 3600),
        ("BST", 3600),
        ("JST", 9 * 3600),
        ("KST", 9 * 3600),
        ("AEST", 10 * 3600),
        ("AEDT", 11 * 3600),
        ("NZST", 12 * 3600),
        ("NZDT", 13 * 3600),
    ];
    const FORMATS: [&str; 4] = [
        "%a, %d %b %Y %H:%M:%S",
        "%a, %e %b %Y %H:%M:%S",
        "%d %b %Y %H:%M:%S",
        "%e %b %Y %H:%M:%S",
    ];

    let (base, zone) = s.rsplit_once(' ')?;
    let offset_secs = TZ_OFFSETS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(zone))
        .map(|(_, offset)| *offset)?;
    let base = base.trim_end();

    for fmt in &FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(base, fmt) {
            let offset = FixedOffset::east_opt(offset_secs)?;
            let dt = offset.from_local_datetime(&naive).single()?;
            return Some(dt.with_timezone(&Utc));
        }
    }
    None
}

/// Parses an HTTP date header (`Last-Modified`, `Date`) to epoch seconds.
///
/// Accepts IMF-fixdate, the obsolete RFC 850 form and asctime, plus anything
/// [`parse_flexible_time`] understands, since servers are not strict either.
pub fn parse_http_date(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    // "Sunday, 06-Nov-94 08:49:37 GMT"
    if let Some(rest) = s.strip_suffix(" GMT") {
        if let Ok(naive) = NaiveDateTime::parse_from_str(rest, "%A, %d-%b-%y %H:%M:%S") {
            return Some(Utc.from_utc_datetime(&naive).timestamp());
        }
    }

    // "Sun Nov  6 08:49:37 1994"
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if let Ok(naive) = NaiveDateTime::parse_from_str(&collapsed, "%a %b %e %H:%M:%S %Y") {
        return Some(Utc.from_utc_datetime(&naive).timestamp());
    }

    parse_flexible_time(s).map(|dt| dt.timestamp())
}

/// Formats epoch seconds as an IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn format_http_date(epoch_secs: i64) -> Option<String> {
    let dt = DateTime::<Utc>::from_timestamp(epoch_secs, 0)?;
    Some(dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
}
