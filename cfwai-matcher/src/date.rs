use chrono::NaiveDate;

/// Formats the source accepts via `dateutil.parser.parse(..., fuzzy=True)`
/// for the handful of shapes this system actually sees: bare `YYYYMMDD`
/// ingress datecodes and ISO-ish `YYYY-MM-DD` airdates from the library
/// service.
const FORMATS: &[&str] = &["%Y%m%d", "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            // Tolerate an RFC3339-ish timestamp by taking its date prefix.
            trimmed
                .get(0..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        })
}

/// Absolute number of days between two parseable dates, or `-1` if either
/// fails to parse — matching `original_source/util.py::date_distance_days`'s
/// sentinel return.
pub fn date_distance_days(a: &str, b: &str) -> i64 {
    match (parse_date(a), parse_date(b)) {
        (Some(da), Some(db)) => (da - db).num_days().abs(),
        _ => -1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compact_datecode() {
        assert_eq!(
            parse_date("20250427"),
            Some(NaiveDate::from_ymd_opt(2025, 4, 27).unwrap())
        );
    }

    #[test]
    fn distance_is_symmetric_and_absolute() {
        assert_eq!(date_distance_days("20250427", "2025-04-26"), 1);
        assert_eq!(date_distance_days("2025-04-26", "20250427"), 1);
    }

    #[test]
    fn unparseable_dates_return_sentinel() {
        assert_eq!(date_distance_days("not-a-date", "20250427"), -1);
    }
}
