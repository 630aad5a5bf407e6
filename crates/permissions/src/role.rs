//! Roles: named, tenant-scoped bundles of permission tokens.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tessera_core::{DomainError, DomainResult, MenuItemId, RoleId, TenantId};

use crate::codec::{self, PermissionMatrix};
use crate::flags::CapabilityFlags;

const MAX_ROLE_NAME_LEN: usize = 50;

/// A role and the raw tokens it grants.
///
/// `tenant_id == None` marks a platform-wide system role. Tokens are stored
/// verbatim; unknown or legacy tokens survive every rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub tenant_id: Option<TenantId>,
    pub name: String,
    pub description: Option<String>,
    pub permissions: BTreeSet<String>,
    pub is_system: bool,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// A new (version 0) role owned by `tenant_id`.
    pub fn for_tenant(
        tenant_id: TenantId,
        name: impl Into<String>,
        description: Option<String>,
        permissions: BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RoleId::new(),
            tenant_id: Some(tenant_id),
            name: name.into(),
            description,
            permissions,
            is_system: false,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Decoded capability matrix of every stored token.
    pub fn matrix(&self) -> PermissionMatrix {
        codec::parse_tokens(&self.permissions)
    }

    /// System roles are read-only.
    pub fn ensure_mutable(&self) -> DomainResult<()> {
        if self.is_system {
            return Err(DomainError::validation(format!(
                "system role '{}' cannot be modified",
                self.name
            )));
        }
        Ok(())
    }

    /// Whether the role is visible from `tenant_id` (its own or a system role).
    pub fn visible_to(&self, tenant_id: TenantId) -> bool {
        match self.tenant_id {
            Some(owner) => owner == tenant_id,
            None => self.is_system,
        }
    }
}

/// One row of the role editor's capability grid.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuPermissionGrant {
    pub menu_item_id: MenuItemId,
    #[serde(flatten)]
    pub flags: CapabilityFlags,
}

/// Input for creating a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<MenuPermissionGrant>,
}

/// Partial update of a role; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Option<Vec<MenuPermissionGrant>>,
}

/// Trim and bound-check a role name.
pub fn validate_role_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("role name must not be empty"));
    }
    if name.chars().count() > MAX_ROLE_NAME_LEN {
        return Err(DomainError::validation(format!(
            "role name must be at most {MAX_ROLE_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(ts: &[&str]) -> BTreeSet<String> {
        ts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn matrix_decodes_stored_tokens() {
        let role = Role::for_tenant(
            TenantId::new(),
            "clerk",
            None,
            tokens(&["units.view", "units.create"]),
            Utc::now(),
        );
        let flags = role.matrix().get("units.view").unwrap();
        assert!(flags.can_view && flags.can_create);
    }

    #[test]
    fn system_roles_are_immutable_and_visible_everywhere() {
        let mut role = Role::for_tenant(TenantId::new(), "auditor", None, BTreeSet::new(), Utc::now());
        role.tenant_id = None;
        role.is_system = true;

        assert!(role.ensure_mutable().is_err());
        assert!(role.visible_to(TenantId::new()));
    }

    #[test]
    fn tenant_roles_are_invisible_to_other_tenants() {
        let owner = TenantId::new();
        let role = Role::for_tenant(owner, "clerk", None, BTreeSet::new(), Utc::now());
        assert!(role.visible_to(owner));
        assert!(!role.visible_to(TenantId::new()));
    }

    #[test]
    fn role_names_are_trimmed_and_bounded() {
        assert_eq!(validate_role_name("  Cashier ").unwrap(), "Cashier");
        assert!(validate_role_name("   ").is_err());
        assert!(validate_role_name(&"x".repeat(51)).is_err());
        assert!(validate_role_name(&"x".repeat(50)).is_ok());
    }

    #[test]
    fn grant_deserializes_flat_grid_rows() {
        let grant: MenuPermissionGrant = serde_json::from_str(
            r#"{"menu_item_id": "0190a0b0-0000-7000-8000-000000000001", "can_view": true, "can_create": true}"#,
        )
        .unwrap();
        assert!(grant.flags.can_view && grant.flags.can_create);
        assert!(!grant.flags.can_export);
    }
}
