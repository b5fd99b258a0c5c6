use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{Result, ScopeError};

/// Year, month and day labels of a `YYMMDD` date plus the calendar date they form.
///
/// The labels are kept as strings because they are the group keys of the
/// year/month/day aggregations and sort correctly as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateParts {
    pub year: String,
    pub month: String,
    pub day: String,
    pub date: NaiveDate,
}

/// Split a 6-character `YYMMDD` date into its parts.
///
/// Known limitation: every year is read as 19YY. The source data only covers
/// the 1990s, so `010203` becomes 1901-02-03, never 2001.
pub fn decompose_date(raw: &str, row: usize) -> Result<DateParts> {
    let invalid = || ScopeError::InvalidDate {
        row,
        value: raw.to_string(),
    };
    let s = raw.trim();
    if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let year = format!("19{}", &s[..2]);
    let month = s[2..4].to_string();
    let day = s[4..].to_string();

    let y: i32 = year.parse().map_err(|_| invalid())?;
    let m: u32 = month.parse().map_err(|_| invalid())?;
    let d: u32 = day.parse().map_err(|_| invalid())?;
    let date = NaiveDate::from_ymd_opt(y, m, d).ok_or_else(invalid)?;

    Ok(DateParts {
        year,
        month,
        day,
        date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decompose_date() {
        let parts = decompose_date("990615", 0).unwrap();
        assert_eq!(parts.year, "1999");
        assert_eq!(parts.month, "06");
        assert_eq!(parts.day, "15");
        assert_eq!(parts.date, NaiveDate::from_ymd_opt(1999, 6, 15).unwrap());
    }

    #[test]
    fn test_decompose_date_keeps_twentieth_century() {
        let parts = decompose_date("010203", 0).unwrap();
        assert_eq!(parts.year, "1901");
    }

    #[test]
    fn test_decompose_date_trims_whitespace() {
        assert_eq!(decompose_date(" 930101 ", 0).unwrap().year, "1993");
    }

    #[test]
    fn test_decompose_date_rejects_malformed() {
        assert!(decompose_date("99061", 0).is_err()); // too short
        assert!(decompose_date("1999061", 0).is_err()); // too long
        assert!(decompose_date("99O615", 0).is_err()); // letter O
        assert!(decompose_date("930101.0", 0).is_err());
    }

    #[test]
    fn test_decompose_date_rejects_invalid_calendar_dates() {
        assert!(decompose_date("991301", 0).is_err()); // month 13
        assert!(decompose_date("990230", 0).is_err()); // Feb 30
        assert!(decompose_date("990600", 0).is_err()); // day 0
        // 1900 is not a leap year
        assert!(decompose_date("000229", 0).is_err());
        assert!(decompose_date("960229", 0).is_ok());
    }

    #[test]
    fn test_decompose_date_error_carries_row() {
        match decompose_date("xx", 7) {
            Err(ScopeError::InvalidDate { row, value }) => {
                assert_eq!(row, 7);
                assert_eq!(value, "xx");
            }
            other => panic!("expected InvalidDate, got {other:?}"),
        }
    }
}
