use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

use crate::leaves::allowances::Allowances;
use crate::leaves::types::{parse_day, Leave, LeaveStatus, LeaveType};

pub const ALL: &str = "all";
const UNKNOWN_EMPLOYEE: &str = "unknown";

/// Parse a filter choice where `all` means no restriction.
pub fn parse_choice<T>(value: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr<Err = anyhow::Error>,
{
    if value.trim().eq_ignore_ascii_case(ALL) {
        return Ok(None);
    }
    value.parse().map(Some)
}

/// Client-side report filter. `None` fields do not restrict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub status: Option<LeaveStatus>,
    pub leave_type: Option<LeaveType>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub employee: Option<String>,
}

impl ReportFilter {
    /// Query parameters for `GET /api/admin/leaves`. Type and status are
    /// always sent, `all` when unrestricted.
    pub fn query(&self) -> Vec<(String, String)> {
        let mut query = Vec::with_capacity(5);
        if let Some(start) = self.start {
            query.push(("start".to_owned(), start.to_string()));
        }
        if let Some(end) = self.end {
            query.push(("end".to_owned(), end.to_string()));
        }
        query.push((
            "type".to_owned(),
            self.leave_type.map_or(ALL, |t| t.as_str()).to_owned(),
        ));
        query.push((
            "status".to_owned(),
            self.status.map_or(ALL, |s| s.as_str()).to_owned(),
        ));
        if let Some(employee) = self.employee_key() {
            query.push(("employee".to_owned(), employee));
        }
        query
    }

    fn employee_key(&self) -> Option<String> {
        self.employee
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_lowercase)
    }

    /// A row overlapping the window is kept. With a bound set, a row whose
    /// date does not parse is dropped.
    pub fn matches(&self, leave: &Leave) -> bool {
        if let Some(status) = self.status {
            if leave.state() != Some(status) {
                return false;
            }
        }
        if let Some(kind) = self.leave_type {
            if leave.kind() != Some(kind) {
                return false;
            }
        }
        if let Some(start) = self.start {
            match leave.end() {
                Some(end) if end >= start => {}
                _ => return false,
            }
        }
        if let Some(end) = self.end {
            match leave.start() {
                Some(start) if start <= end => {}
                _ => return false,
            }
        }
        if let Some(employee) = self.employee_key() {
            if leave.user_id.trim().to_lowercase() != employee {
                return false;
            }
        }
        true
    }

    pub fn apply<'a>(&self, leaves: &'a [Leave]) -> Vec<&'a Leave> {
        leaves.iter().filter(|leave| self.matches(leave)).collect()
    }
}

/// Calendar days from `start` to `end`, both included. Zero when either
/// date is missing or invalid and when `end` precedes `start`.
pub fn days_between_inclusive(start: &str, end: &str) -> i64 {
    match (parse_day(start), parse_day(end)) {
        (Some(start), Some(end)) => {
            let diff = (end - start).num_days();
            if diff >= 0 {
                diff + 1
            } else {
                0
            }
        }
        _ => 0,
    }
}

pub fn leave_days(leave: &Leave) -> i64 {
    days_between_inclusive(&leave.start_date, &leave.end_date)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportTotals {
    pub total_days: i64,
    /// keyed by the raw backend type string
    pub taken_by_type: BTreeMap<String, i64>,
    pub remaining_by_type: BTreeMap<LeaveType, i64>,
}

pub fn totals(rows: &[&Leave], allowances: &Allowances) -> ReportTotals {
    let mut report = ReportTotals::default();
    for leave in rows {
        let days = leave_days(leave);
        report.total_days += days;
        *report.taken_by_type.entry(leave.leave_type.clone()).or_default() += days;
    }
    for kind in LeaveType::ALL {
        let taken = report.taken_by_type.get(kind.as_str()).copied().unwrap_or(0);
        let remaining = (i64::from(allowances.get(kind)) - taken).max(0);
        report.remaining_by_type.insert(kind, remaining);
    }
    report
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmployeeSummary {
    pub total_days: i64,
    pub days_by_type: BTreeMap<String, i64>,
    /// request count per lowercased status
    pub requests_by_status: BTreeMap<String, u32>,
    pub requests: u32,
}

pub fn employee_summary(rows: &[&Leave]) -> BTreeMap<String, EmployeeSummary> {
    let mut summaries: BTreeMap<String, EmployeeSummary> = BTreeMap::new();
    for leave in rows {
        let employee = if leave.user_id.is_empty() {
            UNKNOWN_EMPLOYEE.to_owned()
        } else {
            leave.user_id.clone()
        };
        let days = leave_days(leave);
        let summary = summaries.entry(employee).or_default();
        summary.total_days += days;
        summary.requests += 1;
        *summary.days_by_type.entry(leave.leave_type.clone()).or_default() += days;
        *summary.requests_by_status.entry(leave.status.to_lowercase()).or_default() += 1;
    }
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leave(user: &str, kind: &str, start: &str, end: &str, status: &str) -> Leave {
        Leave {
            leave_id: format!("{}-{}", user, start),
            user_id: user.to_owned(),
            leave_type: kind.to_owned(),
            start_date: start.to_owned(),
            end_date: end.to_owned(),
            reason: "planned time off".to_owned(),
            status: status.to_owned(),
            created_at: None,
        }
    }

    fn day(value: &str) -> Option<NaiveDate> {
        parse_day(value)
    }

    #[test]
    fn inclusive_day_counts() {
        assert_eq!(days_between_inclusive("2024-05-01", "2024-05-01"), 1);
        assert_eq!(days_between_inclusive("2024-02-27", "2024-03-01"), 4);
        assert_eq!(days_between_inclusive("2024-05-03", "2024-05-01"), 0);
        assert_eq!(days_between_inclusive("", "2024-05-01"), 0);
        assert_eq!(days_between_inclusive("2024-13-01", "2024-05-01"), 0);
    }

    #[test]
    fn window_keeps_overlapping_rows() {
        let rows = vec![
            leave("a@corp.io", "annual", "2024-04-28", "2024-05-02", "approved"),
            leave("a@corp.io", "annual", "2024-05-10", "2024-05-12", "approved"),
            leave("a@corp.io", "annual", "2024-04-01", "2024-04-05", "approved"),
        ];
        let filter = ReportFilter {
            start: day("2024-05-01"),
            end: day("2024-05-10"),
            ..ReportFilter::default()
        };
        let kept: Vec<&str> = filter.apply(&rows).iter().map(|l| l.start_date.as_str()).collect();
        assert_eq!(kept, vec!["2024-04-28", "2024-05-10"]);
    }

    #[test]
    fn status_type_and_employee_filters() {
        let rows = vec![
            leave("A@Corp.io", "sick", "2024-01-02", "2024-01-03", "APPROVED"),
            leave("a@corp.io", "annual", "2024-01-02", "2024-01-03", "approved"),
            leave("b@corp.io", "sick", "2024-01-02", "2024-01-03", "approved"),
            leave("a@corp.io", "sick", "2024-01-02", "2024-01-03", "pending"),
        ];
        let filter = ReportFilter {
            status: Some(LeaveStatus::Approved),
            leave_type: Some(LeaveType::Sick),
            employee: Some("  a@corp.IO ".to_owned()),
            ..ReportFilter::default()
        };
        let kept = filter.apply(&rows);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].user_id, "A@Corp.io");
        assert_eq!(ReportFilter::default().apply(&rows).len(), 4);
    }

    #[test]
    fn query_always_sends_type_and_status() {
        let filter = ReportFilter {
            status: Some(LeaveStatus::Pending),
            start: day("2024-01-01"),
            employee: Some(" ".to_owned()),
            ..ReportFilter::default()
        };
        let query = filter.query();
        assert_eq!(
            query,
            vec![
                ("start".to_owned(), "2024-01-01".to_owned()),
                ("type".to_owned(), "all".to_owned()),
                ("status".to_owned(), "pending".to_owned()),
            ]
        );
    }

    #[test]
    fn choices_accept_all() {
        assert_eq!(parse_choice::<LeaveType>("ALL").unwrap(), None);
        assert_eq!(parse_choice::<LeaveType>("casual").unwrap(), Some(LeaveType::Casual));
        assert!(parse_choice::<LeaveStatus>("archived").is_err());
    }

    #[test]
    fn totals_floor_remaining_at_zero() {
        let rows = vec![
            leave("a@corp.io", "casual", "2024-01-01", "2024-01-10", "approved"),
            leave("a@corp.io", "annual", "2024-02-01", "2024-02-02", "approved"),
        ];
        let refs: Vec<&Leave> = rows.iter().collect();
        let report = totals(&refs, &Allowances::default());
        assert_eq!(report.total_days, 12);
        assert_eq!(report.taken_by_type["casual"], 10);
        assert_eq!(report.remaining_by_type[&LeaveType::Casual], 0);
        assert_eq!(report.remaining_by_type[&LeaveType::Annual], 18);
        assert_eq!(report.remaining_by_type[&LeaveType::Sick], 10);
    }

    #[test]
    fn employee_summary_groups_rows() {
        let rows = vec![
            leave("a@corp.io", "sick", "2024-01-01", "2024-01-02", "Approved"),
            leave("a@corp.io", "annual", "2024-03-01", "2024-03-01", "pending"),
            leave("", "annual", "2024-03-01", "2024-03-03", "approved"),
        ];
        let refs: Vec<&Leave> = rows.iter().collect();
        let summary = employee_summary(&refs);
        let a = &summary["a@corp.io"];
        assert_eq!(a.total_days, 3);
        assert_eq!(a.requests, 2);
        assert_eq!(a.days_by_type["sick"], 2);
        assert_eq!(a.requests_by_status["approved"], 1);
        assert_eq!(a.requests_by_status["pending"], 1);
        assert_eq!(summary["unknown"].total_days, 3);
    }
}
