use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Billing plan tier gating optional features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Free,
    Small,
    Business,
    Enterprise,
}

/// Billing/plan aggregate for a workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub workspace_id: Uuid,
    pub plan: PlanTier,
    /// Seat count last reported to the billing provider
    pub quantity: u32,
    pub provider_subscription_id: Option<String>,
    pub cancelled: bool,
}

impl Subscription {
    /// Whether the workspace currently has a valid/paid plan.
    pub fn has_paid_plan(&self) -> bool {
        !self.cancelled && !matches!(self.plan, PlanTier::Free)
    }

    /// Per-tier flag: calendar sync to shared/group calendars.
    pub fn allows_shared_calendar_sync(&self) -> bool {
        self.has_paid_plan()
    }
}

/// Working-day boundaries used to resolve half-day and boundary markers
/// into concrete local times
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceSchedule {
    pub morning_start: NaiveTime,
    pub morning_end: NaiveTime,
    pub afternoon_start: NaiveTime,
    pub afternoon_end: NaiveTime,
}

impl Default for WorkspaceSchedule {
    fn default() -> Self {
        Self {
            morning_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            morning_end: NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default(),
            afternoon_start: NaiveTime::from_hms_opt(13, 0, 0).unwrap_or_default(),
            afternoon_end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
        }
    }
}

/// Workspace owning requests, members, and sync configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    /// Fallback zone when a member carries none
    pub default_timezone: String,
    pub schedule: WorkspaceSchedule,
    /// Calendar category applied to synced events when opted in
    pub outside_tracking_category: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paid_plan_flags() {
        let sub = Subscription {
            workspace_id: Uuid::new_v4(),
            plan: PlanTier::Business,
            quantity: 12,
            provider_subscription_id: Some("sub_123".to_string()),
            cancelled: false,
        };
        assert!(sub.has_paid_plan());
        assert!(sub.allows_shared_calendar_sync());

        let free = Subscription { plan: PlanTier::Free, ..sub.clone() };
        assert!(!free.has_paid_plan());

        let cancelled = Subscription { cancelled: true, ..sub };
        assert!(!cancelled.has_paid_plan());
    }
}
