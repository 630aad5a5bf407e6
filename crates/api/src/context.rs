use std::collections::BTreeSet;

use tessera_auth::{Principal, RoleName};
use tessera_core::{TenantId, UserId};

/// Tenant context for a request.
///
/// Derived from the bearer token; immutable and present on every protected route.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TenantContext {
    tenant_id: TenantId,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId) -> Self {
        Self { tenant_id }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

/// Principal context for a request (authenticated identity, roles and the
/// permission set carried by the token).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }

    pub fn email(&self) -> &str {
        &self.principal.email
    }

    pub fn roles(&self) -> &[RoleName] {
        &self.principal.roles
    }

    pub fn permissions(&self) -> BTreeSet<String> {
        self.principal.permission_strings()
    }
}
