use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use super::payload::CalendarEventPayload;
use super::provider::{CalendarApiError, CalendarProvider};
use super::target::{SkipReason, SyncTarget};
use super::SyncOutcome;
use crate::config::CalendarSyncConfig;
use crate::error::Result;
use crate::models::{RequestSyncLog, SyncStatus};
use crate::store::SyncLogStore;

/// Drives create/update/delete against one resolved sync target, recording
/// outcome and retry state on the [`RequestSyncLog`] row.
///
/// Failure discipline:
/// - rate limits propagate as [`SyncOutcome::RateLimited`] and never touch
///   the retry count; the job layer reschedules after the carried delay
/// - ordinary failures increment the count; at `max_attempts` the row
///   settles as terminal Failed with the error detail preserved
/// - delete of an already-gone event is success
pub struct CalendarSyncOrchestrator {
    provider: Arc<dyn CalendarProvider>,
    sync_logs: Arc<dyn SyncLogStore>,
    config: CalendarSyncConfig,
}

impl CalendarSyncOrchestrator {
    pub fn new(
        provider: Arc<dyn CalendarProvider>,
        sync_logs: Arc<dyn SyncLogStore>,
        config: CalendarSyncConfig,
    ) -> Self {
        Self {
            provider,
            sync_logs,
            config,
        }
    }

    /// Create the event for `request_id` on `target`.
    ///
    /// Re-entrant: a row already Synced returns its stored id without a
    /// provider call, and a poisoned row returns Failed without one.
    pub async fn sync_request(
        &self,
        request_id: Uuid,
        target: &SyncTarget,
        payload: &CalendarEventPayload,
    ) -> Result<SyncOutcome> {
        let log = self.find_or_create_log(request_id, target).await?;

        if log.status == SyncStatus::Synced {
            if let Some(external_id) = log.external_event_id {
                return Ok(SyncOutcome::Synced { external_id });
            }
        }
        if log.retry_count >= self.config.max_attempts {
            return Ok(SyncOutcome::Failed {
                error: log
                    .error
                    .unwrap_or_else(|| "retry budget exhausted".to_string()),
                terminal: true,
            });
        }

        match self.provider.create_event(target, payload).await {
            Ok(external_id) => {
                self.sync_logs.record_synced(log.id, &external_id).await?;
                info!(
                    request_id = %request_id,
                    sync_type = ?target.sync_type(),
                    external_id = %external_id,
                    "calendar event created"
                );
                Ok(SyncOutcome::Synced { external_id })
            }
            Err(err) => self.handle_mutation_error(log.id, request_id, err).await,
        }
    }

    /// Patch the previously synced event with a fresh payload.
    ///
    /// When the stored sync used a different target type than current
    /// settings require, the stale row is left as-is and the caller queues a
    /// fresh create instead (no migration).
    pub async fn update_sync(
        &self,
        log_id: Uuid,
        target: &SyncTarget,
        payload: &CalendarEventPayload,
    ) -> Result<SyncOutcome> {
        let Some(log) = self.sync_logs.get(log_id).await? else {
            return Ok(SyncOutcome::Skipped {
                reason: SkipReason::NoViableTarget,
            });
        };

        if log.sync_type != target.sync_type() {
            info!(
                request_id = %log.request_id,
                stored = ?log.sync_type,
                required = ?target.sync_type(),
                "sync target changed since create, leaving stale entry"
            );
            return Ok(SyncOutcome::Skipped {
                reason: SkipReason::StaleTarget,
            });
        }

        let Some(external_id) = log.external_event_id.clone() else {
            return Ok(SyncOutcome::Skipped {
                reason: SkipReason::NoViableTarget,
            });
        };

        match self
            .provider
            .update_event(target, &external_id, payload)
            .await
        {
            Ok(()) => Ok(SyncOutcome::Synced { external_id }),
            Err(err) => {
                self.handle_mutation_error(log.id, log.request_id, err)
                    .await
            }
        }
    }

    /// Delete the synced event. Not-found means already gone: success.
    /// Rate limiting on the delete path is RateLimited, never Failed.
    pub async fn delete_sync(&self, log_id: Uuid, target: &SyncTarget) -> Result<SyncOutcome> {
        let Some(log) = self.sync_logs.get(log_id).await? else {
            return Ok(SyncOutcome::Skipped {
                reason: SkipReason::NoViableTarget,
            });
        };
        let Some(external_id) = log.external_event_id.clone() else {
            // Never made it to the provider; settle the bookkeeping row.
            self.sync_logs.settle(log.id, SyncStatus::Removed).await?;
            return Ok(SyncOutcome::Skipped {
                reason: SkipReason::NoViableTarget,
            });
        };

        match self.provider.delete_event(target, &external_id).await {
            Ok(()) | Err(CalendarApiError::NotFound) => {
                self.sync_logs.settle(log.id, SyncStatus::Removed).await?;
                info!(
                    request_id = %log.request_id,
                    external_id = %external_id,
                    "calendar event removed"
                );
                Ok(SyncOutcome::Synced { external_id })
            }
            Err(CalendarApiError::RateLimited { retry_after }) => {
                Ok(SyncOutcome::RateLimited {
                    retry_after: retry_after.unwrap_or(self.config.default_retry_after()),
                })
            }
            Err(err) => {
                self.handle_mutation_error(log.id, log.request_id, err)
                    .await
            }
        }
    }

    /// Record a skipped sync so the decision is visible in sync status.
    pub async fn record_skip(
        &self,
        request_id: Uuid,
        target_type: crate::models::SyncType,
        reason: &SkipReason,
    ) -> Result<()> {
        let mut log = RequestSyncLog::new(request_id, target_type);
        log.status = SyncStatus::Skipped;
        log.error = Some(reason.to_string());
        self.sync_logs.upsert(log).await
    }

    async fn find_or_create_log(
        &self,
        request_id: Uuid,
        target: &SyncTarget,
    ) -> Result<RequestSyncLog> {
        let existing = self
            .sync_logs
            .find_for_request(request_id)
            .await?
            .into_iter()
            .find(|l| l.sync_type == target.sync_type());

        if let Some(log) = existing {
            return Ok(log);
        }

        let mut log = RequestSyncLog::new(request_id, target.sync_type());
        log.tenant_id = target.tenant_key().map(str::to_string);
        if let SyncTarget::Shared { setting } = target {
            log.calendar_id = Some(setting.calendar_id.clone());
            log.calendar_sync_setting_id = Some(setting.id);
        }
        if let SyncTarget::Native { user_id, .. } = target {
            log.user_id = Some(user_id.clone());
        }
        self.sync_logs.upsert(log.clone()).await?;
        Ok(log)
    }

    async fn handle_mutation_error(
        &self,
        log_id: Uuid,
        request_id: Uuid,
        err: CalendarApiError,
    ) -> Result<SyncOutcome> {
        match err {
            CalendarApiError::RateLimited { retry_after } => {
                let delay = retry_after.unwrap_or(self.config.default_retry_after());
                warn!(
                    request_id = %request_id,
                    delay_ms = delay.as_millis() as u64,
                    "calendar provider rate limited"
                );
                Ok(SyncOutcome::RateLimited { retry_after: delay })
            }
            other => {
                let detail = other.to_string();
                let count = self.sync_logs.record_failure(log_id, &detail).await?;
                let terminal = count >= self.config.max_attempts;
                if terminal {
                    error!(
                        request_id = %request_id,
                        retry_count = count,
                        error = %detail,
                        "sync failed terminally, giving up"
                    );
                } else {
                    warn!(
                        request_id = %request_id,
                        retry_count = count,
                        error = %detail,
                        "sync attempt failed"
                    );
                }
                Ok(SyncOutcome::Failed {
                    error: detail,
                    terminal,
                })
            }
        }
    }
}
