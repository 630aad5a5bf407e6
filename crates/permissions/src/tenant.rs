use serde::{Deserialize, Serialize};

use tessera_core::{PlanId, TenantId, UserId};

use crate::plan::DEFAULT_PLAN_CODE;

/// A customer organization.
///
/// `plan` is the legacy plan code kept for tenants created before plans had
/// their own table; `subscription_plan_id` wins when both are set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub subscription_plan_id: Option<PlanId>,
    pub plan: String,
    pub is_active: bool,
}

impl Tenant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TenantId::new(),
            name: name.into(),
            subscription_plan_id: None,
            plan: DEFAULT_PLAN_CODE.to_string(),
            is_active: true,
        }
    }

    pub fn with_plan(mut self, plan_id: PlanId) -> Self {
        self.subscription_plan_id = Some(plan_id);
        self
    }

    pub fn with_legacy_plan(mut self, code: impl Into<String>) -> Self {
        self.plan = code.into();
        self
    }
}

/// A user's membership in a tenant, carrying role *names*.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTenant {
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub roles: Vec<String>,
    pub is_primary: bool,
}

impl UserTenant {
    pub fn new(user_id: UserId, tenant_id: TenantId, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            user_id,
            tenant_id,
            roles: roles.into_iter().map(Into::into).collect(),
            is_primary: true,
        }
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r == name)
    }
}
