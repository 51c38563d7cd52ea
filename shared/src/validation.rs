//! Validation utilities for the warehouse platform

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};

use crate::error::{DomainError, DomainResult};

// ============================================================================
// Quantity Validations
// ============================================================================

/// Movement quantities (inbound, outbound) must be strictly positive
pub fn ensure_positive_quantity(field: &str, quantity: i32) -> DomainResult<()> {
    if quantity <= 0 {
        return Err(DomainError::validation(field, "quantity must be greater than 0"));
    }
    Ok(())
}

/// Counted quantities and thresholds may be zero but never negative
pub fn ensure_non_negative(field: &str, value: i32) -> DomainResult<()> {
    if value < 0 {
        return Err(DomainError::validation(field, "value cannot be negative"));
    }
    Ok(())
}

/// Reject blank strings for required text fields
pub fn ensure_not_blank(field: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(field, "value cannot be empty"));
    }
    Ok(())
}

// ============================================================================
// Account Validations
// ============================================================================

/// Validate username format (3-80 chars, no whitespace)
pub fn validate_username(username: &str) -> DomainResult<()> {
    let len = username.chars().count();
    if !(3..=80).contains(&len) {
        return Err(DomainError::validation("username", "username must be 3-80 characters"));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(DomainError::validation("username", "username cannot contain whitespace"));
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> DomainResult<()> {
    if password.chars().count() < 6 {
        return Err(DomainError::validation("password", "password must be at least 6 characters"));
    }
    Ok(())
}

/// Derive a login name from a free-text display name
pub fn username_from_display_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// First of `base`, `base_2`, `base_3`, ... not present in `taken`
pub fn next_free_username(base: &str, taken: &[String]) -> String {
    if !taken.iter().any(|t| t == base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

// ============================================================================
// Date Parsing
// ============================================================================

/// Parse a calendar date in `YYYY-MM-DD` form
pub fn parse_date(field: &str, value: &str) -> DomainResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| DomainError::validation(field, "date must use YYYY-MM-DD format"))
}

/// Parse a filter timestamp.
///
/// Accepts RFC 3339 (zone dropped, wall-clock kept), naive ISO 8601 with or
/// without fractional seconds, or a bare date meaning midnight.
pub fn parse_datetime(field: &str, value: &str) -> DomainResult<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(crate::time::start_of_day(date));
    }
    Err(DomainError::validation(field, "invalid date/time format"))
}

/// Half-open time filter `[from, until)` built from optional query bounds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: Option<NaiveDateTime>,
    pub until: Option<NaiveDateTime>,
}

/// Parse list-filter bounds.
///
/// The start is inclusive. A bare end date covers that whole day; an end
/// timestamp is inclusive to the microsecond.
pub fn parse_time_window(start: Option<&str>, end: Option<&str>) -> DomainResult<TimeWindow> {
    fn nonblank(v: Option<&str>) -> Option<&str> {
        v.map(str::trim).filter(|v| !v.is_empty())
    }

    let from = nonblank(start)
        .map(|v| parse_datetime("start_date", v))
        .transpose()?;
    let until = match nonblank(end) {
        Some(v) => Some(match NaiveDate::parse_from_str(v, "%Y-%m-%d") {
            Ok(date) => crate::time::end_of_day_exclusive(date),
            Err(_) => parse_datetime("end_date", v)?
                .checked_add_signed(Duration::microseconds(1))
                .ok_or_else(|| DomainError::validation("end_date", "end_date is out of range"))?,
        }),
        None => None,
    };

    if let (Some(from), Some(until)) = (from, until) {
        if from >= until {
            return Err(DomainError::validation(
                "start_date",
                "start_date cannot be after end_date",
            ));
        }
    }
    Ok(TimeWindow { from, until })
}
