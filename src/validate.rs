use chrono::{DateTime, Datelike, Duration, Utc};

use crate::error::{Error, Result};

pub const MAX_TITLE_LEN: usize = 255;
pub const MAX_DESCRIPTION_LEN: usize = 1000;
pub const MAX_YEAR: i32 = 9999;

/// Timestamps are stored as four-digit-year text, so years outside
/// 1..=9999 cannot be written.
pub fn validate_year(field: &'static str, ts: DateTime<Utc>) -> Result<()> {
    if !(1..=MAX_YEAR).contains(&ts.year()) {
        return Err(Error::validation(
            field,
            format!("year {} is outside 1..={MAX_YEAR}", ts.year()),
        ));
    }
    Ok(())
}

/// Validate a task title and return it trimmed: must be non-blank and at most
/// 255 characters.
pub fn validate_title(title: &str) -> Result<&str> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("title", "must not be empty"));
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(Error::validation(
            "title",
            format!("must be at most {MAX_TITLE_LEN} characters"),
        ));
    }
    Ok(trimmed)
}

pub fn validate_description(description: &str) -> Result<()> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(Error::validation(
            "description",
            format!("must be at most {MAX_DESCRIPTION_LEN} characters"),
        ));
    }
    Ok(())
}

/// A due date may lie up to one day in the past, so that a date-only value
/// for today (midnight UTC) is still accepted.
pub fn validate_due_date(due: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Result<()> {
    if let Some(due) = due {
        validate_year("due_date", due)?;
        let earliest = now - Duration::days(1);
        if due < earliest {
            return Err(Error::validation(
                "due_date",
                format!("{} is in the past", due.format("%Y-%m-%d %H:%M")),
            ));
        }
    }
    Ok(())
}

pub fn validate_id(id: i64) -> Result<()> {
    if id <= 0 {
        return Err(Error::validation("id", format!("{id} must be positive")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn valid_titles() {
        assert_eq!(validate_title("Buy milk").unwrap(), "Buy milk");
        assert_eq!(validate_title("  padded  ").unwrap(), "padded");
        assert!(validate_title(&"x".repeat(MAX_TITLE_LEN)).is_ok());
        // Counted in characters, not bytes.
        assert!(validate_title(&"é".repeat(MAX_TITLE_LEN)).is_ok());
    }

    #[test]
    fn invalid_titles() {
        assert!(validate_title("").is_err());
        assert!(validate_title(" \t\n").is_err());
        assert!(matches!(
            validate_title(&"x".repeat(MAX_TITLE_LEN + 1)),
            Err(Error::Validation { field: "title", .. })
        ));
    }

    #[test]
    fn description_length() {
        assert!(validate_description("").is_ok());
        assert!(validate_description(&"d".repeat(MAX_DESCRIPTION_LEN)).is_ok());
        assert!(validate_description(&"d".repeat(MAX_DESCRIPTION_LEN + 1)).is_err());
    }

    #[test]
    fn due_date_grace_window() {
        let now = Utc.with_ymd_and_hms(2026, 4, 2, 10, 0, 0).unwrap();
        assert!(validate_due_date(None, now).is_ok());
        assert!(validate_due_date(Some(now + Duration::days(3)), now).is_ok());
        assert!(validate_due_date(Some(now - Duration::hours(23)), now).is_ok());
        assert!(validate_due_date(Some(now - Duration::days(1)), now).is_ok());
        assert!(matches!(
            validate_due_date(Some(now - Duration::days(1) - Duration::seconds(1)), now),
            Err(Error::Validation { field: "due_date", .. })
        ));
    }

    #[test]
    fn due_date_year_must_fit_four_digits() {
        let now = Utc.with_ymd_and_hms(2026, 4, 2, 10, 0, 0).unwrap();
        let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(
            validate_due_date(Some(far), now),
            Err(Error::Validation { field: "due_date", .. })
        ));
        let last = Utc.with_ymd_and_hms(9999, 12, 31, 0, 0, 0).unwrap();
        assert!(validate_due_date(Some(last), now).is_ok());
        let ancient = Utc.with_ymd_and_hms(0, 1, 1, 0, 0, 0).unwrap();
        assert!(validate_year("due_from", ancient).is_err());
    }

    #[test]
    fn ids_must_be_positive() {
        assert!(validate_id(1).is_ok());
        assert!(validate_id(0).is_err());
        assert!(validate_id(-4).is_err());
    }
}
