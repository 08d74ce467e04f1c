use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Approval-process policy snapshotted onto each request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalPolicy {
    /// Approvers act one after another; every one must agree
    LinearAllHaveToAgree,
    /// Approvers act one after another; the first agreement resolves the set
    LinearOneHasToAgree,
    /// Approvers act independently; every one must agree
    ParallelAllHaveToAgree,
    /// Approvers act independently; the first agreement resolves the set
    ParallelOneHasToAgree,
}

impl ApprovalPolicy {
    pub fn is_sequential(&self) -> bool {
        matches!(self, Self::LinearAllHaveToAgree | Self::LinearOneHasToAgree)
    }

    /// One approver acting resolves the whole set.
    pub fn resolves_on_single_agreement(&self) -> bool {
        matches!(self, Self::LinearOneHasToAgree | Self::ParallelOneHasToAgree)
    }
}

/// Status of a single approval step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproverStatus {
    Pending,
    Approved,
    Declined,
    Canceled,
    /// Resolved implicitly because another manager agreed first
    ApprovedByAnotherManager,
    /// Resolved implicitly because another manager declined first
    DeclinedByAnotherManager,
}

impl ApproverStatus {
    /// Anything but Pending is settled; settled steps never transition again.
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// An explicit decision by this approver (not an implicit resolution).
    pub fn is_own_decision(&self) -> bool {
        matches!(self, Self::Approved | Self::Declined)
    }
}

impl fmt::Display for ApproverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Declined => write!(f, "declined"),
            Self::Canceled => write!(f, "canceled"),
            Self::ApprovedByAnotherManager => write!(f, "approved_by_another_manager"),
            Self::DeclinedByAnotherManager => write!(f, "declined_by_another_manager"),
        }
    }
}

/// One approval step for a request's details.
///
/// Steps for the same request form a singly-linked list through
/// `predecessor_approver_member_id`: the root step carries `None`, every
/// other step points at the approver member id of the step before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestApprover {
    pub id: Uuid,
    pub request_details_id: Uuid,
    /// Nullable: the approver's membership may have been deleted
    pub approver_member_id: Option<Uuid>,
    pub status: ApproverStatus,
    /// Link to the previous step's approver member id; None marks the root
    pub predecessor_approver_member_id: Option<Uuid>,
    pub decline_reason: Option<String>,
    pub reminder_sent_at: Option<DateTime<Utc>>,
    /// Chat-card id issued by the messenger on first send, kept for in-place
    /// updates and as the dispatch idempotency token
    pub chat_message_id: Option<String>,
}
