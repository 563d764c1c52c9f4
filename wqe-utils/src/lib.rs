//! Shared utility functions for WQE crates.

/// Date utility functions
pub mod dates {
    use crate::error::DateError;
    use chrono::{NaiveDate, NaiveDateTime};

    /// Timestamp layouts accepted in the `Date` column, tried in order.
    const TIMESTAMP_FORMATS: [&str; 3] =
        ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

    const MONTH_ABBR: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    /// Parse a date string in "YYYY-MM-DD" format
    pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?)
    }

    /// Parse a sample timestamp.
    ///
    /// Accepts a bare date (midnight) or a date with a time of day, separated
    /// by a space or a `T`.
    pub fn parse_timestamp(s: &str) -> anyhow::Result<NaiveDateTime> {
        let s = s.trim();
        for format in TIMESTAMP_FORMATS {
            if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(ts);
            }
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .ok_or_else(|| DateError(format!("unrecognised timestamp '{}'", s)).into())
    }

    /// Proleptic Gregorian ordinal: 0001-01-01 is day 1.
    pub fn to_ordinal(date: &NaiveDate) -> i64 {
        use chrono::Datelike;
        date.num_days_from_ce() as i64
    }

    /// Three letter English month abbreviation, empty for anything outside 1-12.
    pub fn month_abbr(month: u32) -> &'static str {
        match month {
            1..=12 => MONTH_ABBR[(month - 1) as usize],
            _ => "",
        }
    }

}

/// Shareable location references of the form `?id=<Location_ID>`.
pub mod links {
    use url::form_urlencoded;

    /// Build the query-string reference that deep-links to a location page.
    pub fn location_link(location_id: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("id", location_id)
            .finish();
        format!("?{}", query)
    }

    /// Extract the location id from a query string such as `?id=NW-123`.
    ///
    /// The leading `?` is optional. Returns `None` when no non-empty `id`
    /// parameter is present; the first `id` wins.
    pub fn parse_location_id(search: &str) -> Option<String> {
        let query = search.trim().trim_start_matches('?');
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "id")
            .map(|(_, value)| value.into_owned())
            .filter(|id| !id.is_empty())
    }

}

/// Error types
pub mod error {
    use std::fmt;

    #[derive(Debug)]
    pub struct DateError(pub String);

    impl fmt::Display for DateError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Date error: {}", self.0)
        }
    }

    impl std::error::Error for DateError {}
}
