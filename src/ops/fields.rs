use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::model::Priority;

/// A form field that failed to parse
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        ValidationError {
            field,
            message: message.into(),
        }
    }
}

pub const DUE_FORMATS: &str = "YYYY-MM-DD or YYYY-MM-DD HH:MM";

/// Empty input keeps the default priority.
pub fn parse_priority(input: &str) -> Result<Priority, ValidationError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Priority::default());
    }
    Priority::parse(input).ok_or_else(|| {
        ValidationError::new("priority", format!("unknown priority '{}' (low, medium, high)", input))
    })
}

/// Parse a due value as UTC. Empty input or `-` clears it.
pub fn parse_due(input: &str) -> Result<Option<DateTime<Utc>>, ValidationError> {
    let input = input.trim();
    if input.is_empty() || input == "-" {
        return Ok(None);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M") {
        return Ok(Some(Utc.from_utc_datetime(&ndt)));
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Some(Utc.from_utc_datetime(&ndt)));
        }
    }
    Err(ValidationError::new(
        "due",
        format!("invalid date '{}' (expected {})", input, DUE_FORMATS),
    ))
}

/// Midnight values render as a bare date.
pub fn format_due(due: Option<DateTime<Utc>>) -> String {
    match due {
        None => String::new(),
        Some(dt) => {
            let naive = dt.naive_utc();
            if naive.time() == chrono::NaiveTime::MIN {
                naive.format("%Y-%m-%d").to_string()
            } else {
                naive.format("%Y-%m-%d %H:%M").to_string()
            }
        }
    }
}

/// Split a comma-separated list, trimming entries and dropping empties and
/// exact repeats.
pub fn parse_list(input: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !out.iter().any(|x| x == item) {
            out.push(item.to_string());
        }
    }
    out
}

pub fn format_list(items: &[String]) -> String {
    items.join(", ")
}

/// Titles must have visible content.
pub fn parse_title(input: &str) -> Result<String, ValidationError> {
    let title = input.trim();
    if title.is_empty() {
        return Err(ValidationError::new("title", "title is required"));
    }
    Ok(title.to_string())
}
