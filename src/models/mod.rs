//! # Domain Model Layer
//!
//! Plain, serializable domain entities for the leave-management core. The
//! relational store itself is an external collaborator; these types define the
//! selection shapes the orchestration logic reads and writes through the
//! [`crate::store`] traits.

pub mod approver;
pub mod calendar_setting;
pub mod holiday;
pub mod member;
pub mod request;
pub mod sync_log;
pub mod workspace;

pub use approver::{ApprovalPolicy, ApproverStatus, RequestApprover};
pub use calendar_setting::CalendarSyncSetting;
pub use holiday::{HolidayCacheKey, HolidayPushStatus, PublicHolidayDaySyncStatus};
pub use member::{Member, MembershipStatus, NotificationChannel, TimeFormat};
pub use request::{DayBoundary, LeaveUnit, Request, RequestDetails, RequestStatus};
pub use sync_log::{RequestSyncLog, SyncStatus, SyncType};
pub use workspace::{PlanTier, Subscription, Workspace, WorkspaceSchedule};
