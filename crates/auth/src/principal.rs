use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use tessera_core::{TenantId, UserId};

use crate::{AccessClaims, Permission, RoleName};

/// An authenticated principal acting within one tenant.
///
/// Built from validated token claims; no storage lookup is involved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub email: String,
    pub roles: Vec<RoleName>,
    pub permissions: BTreeSet<Permission>,
}

impl Principal {
    pub fn from_claims(claims: AccessClaims) -> Self {
        Self {
            user_id: claims.sub,
            tenant_id: claims.tenant_id,
            email: claims.email,
            roles: claims.roles,
            permissions: claims.permissions.into_iter().collect(),
        }
    }

    pub fn has_permission(&self, token: &str) -> bool {
        self.permissions.contains(token)
    }

    /// Permission tokens as plain strings.
    pub fn permission_strings(&self) -> BTreeSet<String> {
        self.permissions.iter().map(|p| p.as_str().to_string()).collect()
    }
}
