use crate::error::AppError;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

pub fn now_local() -> OffsetDateTime {
    OffsetDateTime::now_utc().to_offset(local_offset())
}

/// Parses a timestamp sent by the server.
pub fn parse_timestamp(value: &str, field: &str) -> Result<OffsetDateTime, AppError> {
    OffsetDateTime::parse(value.trim(), &Rfc3339)
        .map_err(|_| AppError::invalid_data(format!("{field} must be RFC3339")))
}

pub fn format_timestamp(value: OffsetDateTime) -> Result<String, AppError> {
    value
        .format(&Rfc3339)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

/// Normalizes a user supplied date/time into RFC3339.
///
/// Accepts RFC3339, the `datetime-local` shape `YYYY-MM-DDTHH:MM[:SS]`, the
/// same with a space separator, and a bare date (midnight). Values without an
/// offset are read in the local timezone.
pub fn parse_user_datetime(input: &str, field: &str) -> Result<String, AppError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input(format!("{field} is required")));
    }

    if let Ok(parsed) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return format_timestamp(parsed);
    }

    let naive = parse_naive(trimmed).ok_or_else(|| {
        AppError::invalid_input(format!(
            "{field} must be RFC3339 or YYYY-MM-DD[THH:MM[:SS]]"
        ))
    })?;
    format_timestamp(naive.assume_offset(local_offset()))
}

fn parse_naive(value: &str) -> Option<PrimitiveDateTime> {
    let with_t_seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let with_t = format_description!("[year]-[month]-[day]T[hour]:[minute]");
    let with_space_seconds = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let with_space = format_description!("[year]-[month]-[day] [hour]:[minute]");
    let date_only = format_description!("[year]-[month]-[day]");

    PrimitiveDateTime::parse(value, &with_t_seconds)
        .or_else(|_| PrimitiveDateTime::parse(value, &with_t))
        .or_else(|_| PrimitiveDateTime::parse(value, &with_space_seconds))
        .or_else(|_| PrimitiveDateTime::parse(value, &with_space))
        .ok()
        .or_else(|| Date::parse(value, &date_only).ok().map(Date::midnight))
}

#[cfg(test)]
mod tests {
    use super::{local_offset, parse_timestamp, parse_user_datetime};
    use time::OffsetDateTime;
    use time::format_description::well_known::Rfc3339;
    use time::macros::datetime;

    #[test]
    fn parse_user_datetime_keeps_rfc3339() {
        let value = parse_user_datetime("2025-12-21T09:00:00Z", "remind_at").unwrap();
        assert_eq!(value, "2025-12-21T09:00:00Z");
    }

    #[test]
    fn parse_user_datetime_reads_datetime_local_shape() {
        let value = parse_user_datetime("2025-12-21T09:30", "remind_at").unwrap();
        let parsed = OffsetDateTime::parse(&value, &Rfc3339).unwrap();
        let expected = datetime!(2025-12-21 09:30).assume_offset(local_offset());

        assert_eq!(parsed, expected);
    }

    #[test]
    fn parse_user_datetime_reads_bare_date_as_midnight() {
        let value = parse_user_datetime("2025-12-21", "target_date").unwrap();
        let parsed = OffsetDateTime::parse(&value, &Rfc3339).unwrap();

        assert_eq!(parsed.hour(), 0);
        assert_eq!(parsed.minute(), 0);
    }

    #[test]
    fn parse_user_datetime_rejects_blank_and_garbage() {
        let blank = parse_user_datetime("  ", "remind_at").unwrap_err();
        assert_eq!(blank.code(), "invalid_input");
        assert!(blank.message().contains("remind_at"));

        let garbage = parse_user_datetime("tomorrow", "remind_at").unwrap_err();
        assert_eq!(garbage.code(), "invalid_input");
    }

    #[test]
    fn parse_timestamp_accepts_fractional_seconds() {
        let parsed = parse_timestamp("2025-12-21T09:00:00.123456Z", "changed_at").unwrap();
        assert_eq!(parsed.unix_timestamp(), 1766307600);
    }

    #[test]
    fn parse_timestamp_reports_field() {
        let err = parse_timestamp("yesterday", "failed_at").unwrap_err();
        assert_eq!(err.code(), "invalid_data");
        assert!(err.message().contains("failed_at"));
    }
}
