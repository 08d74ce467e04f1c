use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::approver::ApprovalPolicy;

/// Lifecycle status of a leave request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Waiting on the approver chain
    Pending,
    /// Approved by the chain (terminal)
    Approved,
    /// Declined by an approver (terminal)
    Declined,
    /// Canceled by the requester or an admin (terminal)
    Canceled,
}

impl RequestStatus {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Declined | Self::Canceled)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Declined => write!(f, "declined"),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "declined" => Ok(Self::Declined),
            "canceled" => Ok(Self::Canceled),
            _ => Err(format!("Invalid request status: {s}")),
        }
    }
}

impl Default for RequestStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Granularity in which the absence is booked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveUnit {
    Days,
    HalfDays,
    Hours,
    Minutes30,
    Minutes15,
    Minutes5,
    Minutes1,
}

impl LeaveUnit {
    /// Day-granularity requests render date-only ranges and may become
    /// all-day calendar events; everything finer carries explicit times.
    pub fn is_day_granularity(&self) -> bool {
        matches!(self, Self::Days | Self::HalfDays)
    }
}

/// Boundary marker for the first and last day of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayBoundary {
    Morning,
    Afternoon,
    Lunchtime,
    EndOfDay,
}

/// A leave/absence request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: Uuid,
    pub workspace_id: Uuid,
    /// Member the absence is for
    pub requester_member_id: Uuid,
    /// Member who entered the request; differs for created-on-behalf
    pub created_by_member_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub start_at: DayBoundary,
    pub end_at: DayBoundary,
    pub leave_unit: LeaveUnit,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Request {
    /// A request created by someone other than the person it is for.
    pub fn is_created_on_behalf(&self) -> bool {
        self.requester_member_id != self.created_by_member_id
    }
}

/// 1:1 extension of [`Request`] holding leave-type and approval context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDetails {
    pub request_id: Uuid,
    pub leave_type_id: Uuid,
    pub leave_type_name: String,
    pub reason: Option<String>,
    pub cancel_reason: Option<String>,
    /// Computed absence duration in minutes
    pub duration_minutes: i64,
    /// Approval-process policy snapshotted at creation time
    pub approval_policy: ApprovalPolicy,
}
