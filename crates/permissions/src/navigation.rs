//! Navigation tree builder.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use tessera_core::{MenuItemId, ModuleId};

use crate::catalog::{order_menu_items, MenuItem, Module};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationItem {
    pub id: MenuItemId,
    pub code: String,
    pub name: String,
    pub route: String,
    pub icon: Option<String>,
    pub permission_key: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationModule {
    pub id: ModuleId,
    pub code: String,
    pub name: String,
    pub icon: Option<String>,
    pub sort_order: i32,
    pub items: Vec<NavigationItem>,
}

/// Group the plan-scoped `items` into a module tree, keeping only items whose
/// view key is in `allowed_keys` and that have a route.
///
/// Modules are ordered by sort order, items by sort order within their module,
/// and modules left without items are dropped. The output depends only on the
/// inputs.
pub fn build_navigation(
    modules: &[Module],
    items: &[MenuItem],
    allowed_keys: &BTreeSet<String>,
) -> Vec<NavigationModule> {
    let visible: Vec<MenuItem> = items
        .iter()
        .filter(|item| allowed_keys.contains(item.permission_key.as_str()))
        .filter(|item| item.route.as_deref().is_some_and(|r| !r.is_empty()))
        .cloned()
        .collect();

    let ordered = order_menu_items(modules, visible);

    let mut grouped: HashMap<ModuleId, Vec<NavigationItem>> = HashMap::new();
    for item in ordered {
        let Some(route) = item.route else { continue };
        grouped.entry(item.module_id).or_default().push(NavigationItem {
            id: item.id,
            code: item.code,
            name: item.name,
            route,
            icon: item.icon,
            permission_key: item.permission_key.into(),
            sort_order: item.sort_order,
        });
    }

    let mut tree: Vec<NavigationModule> = modules
        .iter()
        .filter_map(|module| {
            let items = grouped.remove(&module.id)?;
            Some(NavigationModule {
                id: module.id,
                code: module.code.clone(),
                name: module.name.clone(),
                icon: module.icon.clone(),
                sort_order: module.sort_order,
                items,
            })
        })
        .collect();

    tree.sort_by(|a, b| (a.sort_order, &a.code).cmp(&(b.sort_order, &b.code)));
    tree
}
