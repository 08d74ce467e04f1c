//! # Mail/CRM Provider Capability
//!
//! Collaborator trait for the external contact/CRM system. Contacts are
//! keyed by e-mail address, companies by the workspace id; the
//! reconciliation jobs drive both through upserts so repeated runs converge
//! instead of duplicating.

use async_trait::async_trait;
use uuid::Uuid;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CrmError {
    #[error("contact not found: {0}")]
    ContactNotFound(String),

    #[error("crm provider rejected the request: {0}")]
    Rejected(String),

    #[error("crm provider unavailable: {0}")]
    Unavailable(String),
}

/// Contact projection of a workspace member.
#[derive(Debug, Clone, PartialEq)]
pub struct CrmContact {
    pub email: String,
    pub display_name: String,
    pub locale: String,
    pub workspace_id: Uuid,
    pub is_admin: bool,
}

/// Company projection of a workspace.
#[derive(Debug, Clone, PartialEq)]
pub struct CrmCompany {
    pub workspace_id: Uuid,
    pub name: String,
    pub plan: String,
    pub member_count: u32,
}

#[async_trait]
pub trait CrmProvider: Send + Sync {
    /// Create-or-update keyed by the contact's e-mail address.
    async fn upsert_contact(&self, contact: &CrmContact) -> Result<(), CrmError>;

    async fn delete_contact(&self, email: &str) -> Result<(), CrmError>;

    /// Add or remove a contact from a mailing list.
    async fn set_list_membership(
        &self,
        email: &str,
        list_id: &str,
        member: bool,
    ) -> Result<(), CrmError>;

    /// Create-or-update keyed by the workspace id, reconciling linked
    /// contacts on the provider side.
    async fn upsert_company(&self, company: &CrmCompany) -> Result<(), CrmError>;
}
