//! Menu catalog: modules and the menu items grouped under them.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use tessera_core::{DomainError, DomainResult, MenuItemId, ModuleId};

use crate::codec::PermissionKey;

/// A functional area of the ERP (finance, inventory, ...).
///
/// Modules form an adjacency list that is at most one level deep: a module's
/// parent must itself be a root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub parent_id: Option<ModuleId>,
    pub sort_order: i32,
    pub icon: Option<String>,
    pub is_active: bool,
}

/// A navigable screen within a module.
///
/// Only the canonical view key is stored; action tokens are derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub module_id: ModuleId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub route: Option<String>,
    pub permission_key: PermissionKey,
    pub sort_order: i32,
    pub icon: Option<String>,
    pub is_active: bool,
}

/// A menu item together with its owning module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItemWithModule {
    #[serde(flatten)]
    pub item: MenuItem,
    pub module: Module,
}

/// Validated snapshot of modules and menu items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    modules: Vec<Module>,
    menu_items: Vec<MenuItem>,
}

impl Catalog {
    /// Build a catalog, checking:
    /// - module codes are unique
    /// - the module tree is at most one level deep
    /// - every item references a known module
    /// - item codes are unique within their module
    pub fn new(modules: Vec<Module>, menu_items: Vec<MenuItem>) -> DomainResult<Self> {
        let mut codes = HashSet::new();
        for module in &modules {
            if !codes.insert(module.code.as_str()) {
                return Err(DomainError::validation(format!(
                    "duplicate module code '{}'",
                    module.code
                )));
            }
        }

        validate_module_tree(&modules)?;

        let known: HashSet<ModuleId> = modules.iter().map(|m| m.id).collect();
        let mut item_codes = HashSet::new();
        for item in &menu_items {
            if !known.contains(&item.module_id) {
                return Err(DomainError::not_found(format!(
                    "module {} for menu item '{}'",
                    item.module_id, item.code
                )));
            }
            if !item_codes.insert((item.module_id, item.code.as_str())) {
                return Err(DomainError::validation(format!(
                    "duplicate menu item code '{}' in module {}",
                    item.code, item.module_id
                )));
            }
        }

        Ok(Self {
            modules,
            menu_items,
        })
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn menu_items(&self) -> &[MenuItem] {
        &self.menu_items
    }

    pub fn menu_item_by_code(&self, code: &str) -> Option<&MenuItem> {
        self.menu_items.iter().find(|i| i.code == code)
    }
}

/// Reject module trees deeper than one level (a parent must be a root).
pub fn validate_module_tree(modules: &[Module]) -> DomainResult<()> {
    let by_id: HashMap<ModuleId, &Module> = modules.iter().map(|m| (m.id, m)).collect();

    for module in modules {
        let Some(parent_id) = module.parent_id else {
            continue;
        };
        if parent_id == module.id {
            return Err(DomainError::validation(format!(
                "module '{}' cannot be its own parent",
                module.code
            )));
        }
        let parent = by_id.get(&parent_id).ok_or_else(|| {
            DomainError::not_found(format!("parent module {parent_id} of '{}'", module.code))
        })?;
        if parent.parent_id.is_some() {
            return Err(DomainError::validation(format!(
                "module '{}' nests under '{}', which is not a root module",
                module.code, parent.code
            )));
        }
    }

    Ok(())
}

/// Active modules in display order.
pub fn active_modules(modules: &[Module]) -> Vec<Module> {
    let mut out: Vec<Module> = modules.iter().filter(|m| m.is_active).cloned().collect();
    out.sort_by(|a, b| (a.sort_order, &a.code).cmp(&(b.sort_order, &b.code)));
    out
}

/// Active items whose module is active, ordered by module sort order then item
/// sort order.
pub fn order_menu_items(modules: &[Module], items: Vec<MenuItem>) -> Vec<MenuItem> {
    let module_order: HashMap<ModuleId, (i32, &str)> = modules
        .iter()
        .filter(|m| m.is_active)
        .map(|m| (m.id, (m.sort_order, m.code.as_str())))
        .collect();

    let mut out: Vec<MenuItem> = items
        .into_iter()
        .filter(|i| i.is_active && module_order.contains_key(&i.module_id))
        .collect();

    out.sort_by(|a, b| {
        let ma = module_order.get(&a.module_id);
        let mb = module_order.get(&b.module_id);
        (ma, a.sort_order, &a.code).cmp(&(mb, b.sort_order, &b.code))
    });
    out
}

/// Attach each item's module; items whose module is unknown are dropped.
pub fn with_modules(modules: &[Module], items: Vec<MenuItem>) -> Vec<MenuItemWithModule> {
    let by_id: HashMap<ModuleId, &Module> = modules.iter().map(|m| (m.id, m)).collect();
    items
        .into_iter()
        .filter_map(|item| {
            let module = (*by_id.get(&item.module_id)?).clone();
            Some(MenuItemWithModule { item, module })
        })
        .collect()
}

/// Set of canonical keys present in `items`.
pub fn catalog_keys(items: &[MenuItem]) -> BTreeSet<PermissionKey> {
    items.iter().map(|i| i.permission_key.clone()).collect()
}
