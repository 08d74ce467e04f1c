//! # Billing Provider Capability
//!
//! Collaborator trait for the external billing system. The reconciliation
//! jobs call it to keep reported seat counts in line with actual active
//! membership; the orchestration core never sees invoices or payment state.

use async_trait::async_trait;

#[derive(Debug, Clone, thiserror::Error)]
pub enum BillingError {
    #[error("unknown subscription: {0}")]
    UnknownSubscription(String),

    #[error("billing provider rejected the request: {0}")]
    Rejected(String),

    #[error("billing provider unavailable: {0}")]
    Unavailable(String),
}

/// Price delta the provider would apply for a quantity change.
#[derive(Debug, Clone, PartialEq)]
pub struct ProrationPreview {
    pub proration_id: String,
    pub amount_cents: i64,
    pub currency: String,
}

#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Report the current seat count for a subscription.
    async fn update_subscription_quantity(
        &self,
        provider_subscription_id: &str,
        quantity: u32,
    ) -> Result<(), BillingError>;

    /// Preview the proration a quantity change would cause, without applying
    /// it.
    async fn preview_proration(
        &self,
        provider_subscription_id: &str,
        quantity: u32,
    ) -> Result<ProrationPreview, BillingError>;

    /// Apply a previously previewed proration.
    async fn apply_proration(
        &self,
        provider_subscription_id: &str,
        proration_id: &str,
    ) -> Result<(), BillingError>;

    /// One-off charge outside the subscription cycle.
    async fn create_charge(
        &self,
        provider_customer_id: &str,
        amount_cents: i64,
        currency: &str,
        description: &str,
    ) -> Result<(), BillingError>;
}
