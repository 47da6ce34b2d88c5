use serde::{Deserialize, Serialize};

use crate::TenantId;

/// Caller context resolved by the upstream gateway for one application action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    tenant_id: TenantId,
    user_id: Option<String>,
    roles: Vec<String>,
}

impl CallerIdentity {
    /// Creates a caller identity from tenancy and role data.
    #[must_use]
    pub fn new(tenant_id: TenantId, user_id: Option<String>, roles: Vec<String>) -> Self {
        Self {
            tenant_id,
            user_id,
            roles,
        }
    }

    /// Returns the tenant the caller acts in.
    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the end-user identifier, if the caller is acting for a user.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Returns role names granted to the caller.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        self.roles.as_slice()
    }

    /// Returns whether the caller holds the given role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|granted| granted == role)
    }
}
