//! Subscription plans and the menu items they entitle.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use tessera_core::{MenuItemId, PlanId};

/// Plan code used when a tenant has no resolvable plan.
pub const DEFAULT_PLAN_CODE: &str = "basic";

/// A subscription tier. Prices are in minor currency units (cents).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: PlanId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub price_monthly: Option<u64>,
    pub price_yearly: Option<u64>,
    pub is_active: bool,
    pub sort_order: i32,
}

impl SubscriptionPlan {
    /// The `basic` plan row created when a tenant's plan cannot be resolved.
    pub fn fallback_basic() -> Self {
        Self {
            id: PlanId::new(),
            code: DEFAULT_PLAN_CODE.to_string(),
            name: "Basic Plan".to_string(),
            description: Some("Essential features for small businesses".to_string()),
            price_monthly: Some(2_900),
            price_yearly: Some(29_000),
            is_active: true,
            sort_order: 1,
        }
    }
}

/// Inclusion of a menu item in a plan; unique per (plan, menu item).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanMenuItem {
    pub plan_id: PlanId,
    pub menu_item_id: MenuItemId,
    pub is_included: bool,
}

/// The menu items a plan includes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entitlements(BTreeSet<MenuItemId>);

impl Entitlements {
    /// Collect the included rows; excluded rows grant nothing.
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a PlanMenuItem>) -> Self {
        Self(
            rows.into_iter()
                .filter(|row| row.is_included)
                .map(|row| row.menu_item_id)
                .collect(),
        )
    }

    pub fn includes(&self, menu_item_id: MenuItemId) -> bool {
        self.0.contains(&menu_item_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excluded_rows_are_not_entitlements() {
        let plan_id = PlanId::new();
        let included = MenuItemId::new();
        let excluded = MenuItemId::new();
        let rows = [
            PlanMenuItem {
                plan_id,
                menu_item_id: included,
                is_included: true,
            },
            PlanMenuItem {
                plan_id,
                menu_item_id: excluded,
                is_included: false,
            },
        ];

        let entitlements = Entitlements::from_rows(&rows);
        assert!(entitlements.includes(included));
        assert!(!entitlements.includes(excluded));
        assert_eq!(entitlements.len(), 1);
    }
}
