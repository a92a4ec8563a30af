use std::fmt;

use chrono::NaiveDate;

use crate::leaves::types::{parse_day, LeaveType, LeaveUpdate};

pub const REASON_MIN_CHARS: usize = 10;
pub const REASON_MAX_CHARS: usize = 500;

/// Raw user input for a new or edited request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaveForm {
    pub leave_type: String,
    pub start_date: String,
    pub end_date: String,
    pub reason: String,
}

/// Every problem with a form, keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub leave_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub reason: Option<String>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("leave_type", &self.leave_type),
            ("start_date", &self.start_date),
            ("end_date", &self.end_date),
            ("reason", &self.reason),
        ]
        .into_iter()
        .filter_map(|(name, message)| message.as_deref().map(|m| (name, m)))
        .collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.fields().iter().map(|(name, msg)| format!("{}: {}", name, msg)).collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Checks a form and returns the typed request body.
pub fn validate(form: &LeaveForm) -> Result<LeaveUpdate, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let leave_type = form.leave_type.parse::<LeaveType>().ok();
    if leave_type.is_none() {
        errors.leave_type = Some("Please select a valid leave type".to_owned());
    }

    let start = required_day(&form.start_date, "Start date is required", &mut errors.start_date);
    let end = required_day(&form.end_date, "End date is required", &mut errors.end_date);
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            errors.end_date = Some("End date cannot be before start date".to_owned());
        }
    }

    let reason = form.reason.trim();
    let reason_len = reason.chars().count();
    if reason.is_empty() {
        errors.reason = Some("Reason is required".to_owned());
    } else if reason_len < REASON_MIN_CHARS {
        errors.reason = Some(format!("Reason must be at least {} characters", REASON_MIN_CHARS));
    } else if reason_len > REASON_MAX_CHARS {
        errors.reason = Some(format!("Reason must be at most {} characters", REASON_MAX_CHARS));
    }

    match (leave_type, start, end) {
        (Some(leave_type), Some(start_date), Some(end_date)) if errors.is_empty() => Ok(LeaveUpdate {
            leave_type,
            start_date,
            end_date,
            reason: reason.to_owned(),
        }),
        _ => Err(errors),
    }
}

fn required_day(value: &str, missing: &str, slot: &mut Option<String>) -> Option<NaiveDate> {
    if value.trim().is_empty() {
        *slot = Some(missing.to_owned());
        return None;
    }
    let day = parse_day(value);
    if day.is_none() {
        *slot = Some(format!("'{}' is not a YYYY-MM-DD date", value.trim()));
    }
    day
}
