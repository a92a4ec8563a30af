use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Error};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveType {
    Annual,
    Sick,
    Casual,
}

impl LeaveType {
    pub const ALL: [LeaveType; 3] = [LeaveType::Annual, LeaveType::Sick, LeaveType::Casual];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveType::Annual => "annual",
            LeaveType::Sick => "sick",
            LeaveType::Casual => "casual",
        }
    }
}

impl FromStr for LeaveType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "annual" => Ok(LeaveType::Annual),
            "sick" => Ok(LeaveType::Sick),
            "casual" => Ok(LeaveType::Casual),
            other => Err(anyhow!("unknown leave type '{}'", other)),
        }
    }
}

impl fmt::Display for LeaveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub const ALL: [LeaveStatus; 3] = [LeaveStatus::Approved, LeaveStatus::Pending, LeaveStatus::Rejected];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "pending",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for LeaveStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(LeaveStatus::Pending),
            "approved" => Ok(LeaveStatus::Approved),
            "rejected" => Ok(LeaveStatus::Rejected),
            other => Err(anyhow!("unknown leave status '{}'", other)),
        }
    }
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A leave request as the backend returns it. Type and status stay raw
/// strings; the backend owns their vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leave {
    pub leave_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub leave_type: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Leave {
    pub fn kind(&self) -> Option<LeaveType> {
        self.leave_type.parse().ok()
    }

    pub fn state(&self) -> Option<LeaveStatus> {
        self.status.parse().ok()
    }

    pub fn start(&self) -> Option<NaiveDate> {
        parse_day(&self.start_date)
    }

    pub fn end(&self) -> Option<NaiveDate> {
        parse_day(&self.end_date)
    }
}

/// `YYYY-MM-DD`, tolerating a trailing time part.
pub fn parse_day(value: &str) -> Option<NaiveDate> {
    let day = value.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Body of `POST /api/leaves`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaveSubmission {
    pub leave_id: String,
    pub user_id: String,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: LeaveStatus,
}

/// Body of `PUT /api/leaves/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaveUpdate {
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaveAction<'a> {
    pub leave_id: &'a str,
}

/// `GET /api/users/me` data.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CurrentUser {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "isAdmin")]
    pub is_admin: bool,
}
