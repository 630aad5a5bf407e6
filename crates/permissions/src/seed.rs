//! Production seed data: the menu catalog, the three subscription plans and
//! the default tenant roles.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};

use tessera_core::{DomainError, DomainResult, MenuItemId, ModuleId, PlanId, TenantId};

use crate::catalog::{Catalog, MenuItem, Module};
use crate::codec::PermissionKey;
use crate::plan::{PlanMenuItem, SubscriptionPlan};
use crate::role::Role;

struct ModuleDef {
    code: &'static str,
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    items: &'static [ItemDef],
}

struct ItemDef {
    code: &'static str,
    name: &'static str,
    route: &'static str,
    /// Legacy key as first seeded; report keys lack the `.view` suffix.
    key: &'static str,
    icon: &'static str,
}

const fn item(
    code: &'static str,
    name: &'static str,
    route: &'static str,
    key: &'static str,
    icon: &'static str,
) -> ItemDef {
    ItemDef {
        code,
        name,
        route,
        key,
        icon,
    }
}

const MODULES: &[ModuleDef] = &[
    ModuleDef {
        code: "master_data",
        name: "Master Data",
        description: "Catalogue foundational business references",
        icon: "database",
        items: &[
            item("master_products", "Products", "/master-data/products", "products.view", "package"),
            item("master_product_categories", "Product Categories", "/master-data/product-categories", "product_categories.view", "tags"),
            item("master_contacts", "Contacts", "/master-data/contacts", "contacts.view", "users"),
            item("master_chart_of_accounts", "Chart of Accounts", "/master-data/chart-of-accounts", "chart_of_accounts.view", "book-open"),
            item("master_locations", "Locations", "/master-data/locations", "locations.view", "map-pin"),
            item("master_currencies", "Currencies", "/master-data/currencies", "currencies.view", "coins"),
            item("master_units", "Units", "/master-data/units", "units.view", "ruler"),
            item("master_payment_terms", "Payment Terms", "/master-data/payment-terms", "payment_terms.view", "calendar-clock"),
            item("master_taxes", "Taxes", "/master-data/taxes", "taxes.view", "percent"),
        ],
    },
    ModuleDef {
        code: "finance",
        name: "Finance",
        description: "Manage cash, journals, and statutory reporting",
        icon: "wallet",
        items: &[
            item("finance_cash_bank_in", "Cash/Bank In", "/finance/cash-bank-in", "finance.cash_bank_in.view", "log-in"),
            item("finance_cash_bank_out", "Cash/Bank Out", "/finance/cash-bank-out", "finance.cash_bank_out.view", "log-out"),
            item("finance_journal_general", "General Journal", "/finance/journal-entries", "finance.journal.view", "book"),
            item("finance_ap_payment", "AP Payments", "/finance/ap-payments", "finance.ap_payments.view", "wallet-cards"),
            item("finance_ar_payment", "AR Payments", "/finance/ar-payments", "finance.ar_payments.view", "wallet"),
            item("finance_report_general_ledger", "General Ledger", "/finance/reports/general-ledger", "finance.reports.general_ledger", "book-open"),
            item("finance_report_ap_aging", "AP Aging", "/finance/reports/ap-aging", "finance.reports.ap_aging", "timer"),
            item("finance_report_ar_aging", "AR Aging", "/finance/reports/ar-aging", "finance.reports.ar_aging", "timer-reset"),
            item("finance_report_balance_sheet", "Balance Sheet", "/finance/reports/balance-sheet", "finance.reports.balance_sheet", "scale"),
            item("finance_report_cash_flow", "Cash Flow", "/finance/reports/cash-flow", "finance.reports.cash_flow", "waves"),
            item("finance_report_ar_recap", "AR Recap", "/finance/reports/ar-recap", "finance.reports.ar_recap", "list"),
            item("finance_report_ap_recap", "AP Recap", "/finance/reports/ap-recap", "finance.reports.ap_recap", "list-checks"),
        ],
    },
    ModuleDef {
        code: "inventory",
        name: "Inventory",
        description: "Monitor and control stock movements",
        icon: "boxes",
        items: &[
            item("inventory_product_mutation", "Product Mutation", "/inventory/product-mutations", "inventory.product_mutations.view", "shuffle"),
            item("inventory_stock_opname", "Stock Opname", "/inventory/stock-opname", "inventory.stock_opname.view", "clipboard-list"),
            item("inventory_stock_adjustment", "Stock Adjustment", "/inventory/stock-adjustments", "inventory.stock_adjustments.view", "sliders"),
            item("inventory_report_stock_card", "Stock Card", "/inventory/reports/stock-card", "inventory.reports.stock_card", "id-card"),
            item("inventory_report_inventory", "Inventory Report", "/inventory/reports/inventory", "inventory.reports.inventory", "bar-chart-2"),
        ],
    },
    ModuleDef {
        code: "purchasing",
        name: "Purchasing",
        description: "Procurement lifecycle from request to invoice",
        icon: "shopping-cart",
        items: &[
            item("purchasing_purchase_request", "Purchase Request", "/purchasing/purchase-requests", "purchasing.purchase_requests.view", "file-plus"),
            item("purchasing_request_for_quotation", "Request for Quotation", "/purchasing/request-for-quotation", "purchasing.rfq.view", "file-question"),
            item("purchasing_purchase_order", "Purchase Order", "/purchasing/purchase-orders", "purchasing.purchase_orders.view", "file-text"),
            item("purchasing_goods_receipt", "Goods Receipt", "/purchasing/goods-receipts", "purchasing.goods_receipts.view", "package-plus"),
            item("purchasing_receive_invoice", "Receive Invoice", "/purchasing/received-invoices", "purchasing.receive_invoices.view", "file-check"),
            item("purchasing_purchase_return", "Purchase Return", "/purchasing/purchase-returns", "purchasing.purchase_returns.view", "rotate-ccw"),
            item("purchasing_tukar_faktur", "Tukar Faktur", "/purchasing/tukar-faktur", "purchasing.tukar_faktur.view", "repeat"),
            item("purchasing_report_purchase", "Purchase Report", "/purchasing/reports/purchase", "purchasing.reports.purchase", "bar-chart"),
        ],
    },
    ModuleDef {
        code: "sales",
        name: "Sales",
        description: "Quote-to-cash activities and analytics",
        icon: "trending-up",
        items: &[
            item("sales_sales_quotation", "Sales Quotation", "/sales/quotations", "sales.quotations.view", "file-input"),
            item("sales_sales_order", "Sales Order", "/sales/orders", "sales.orders.view", "shopping-bag"),
            item("sales_sales_invoice", "Sales Invoice", "/sales/invoices", "sales.invoices.view", "receipt"),
            item("sales_sales_return", "Sales Return", "/sales/returns", "sales.returns.view", "rotate-cw"),
            item("sales_pos", "Point of Sale", "/sales/pos", "sales.pos.view", "touchpad"),
            item("sales_report_sales", "Sales Report", "/sales/reports/sales", "sales.reports.sales", "bar-chart-3"),
            item("sales_report_salesperson", "Salesperson Report", "/sales/reports/salesperson", "sales.reports.salesperson", "users-2"),
            item("sales_report_customer", "Customer Report", "/sales/reports/customers", "sales.reports.customer", "user-circle"),
            item("sales_report_item", "Item Sales Report", "/sales/reports/items", "sales.reports.item", "list"),
        ],
    },
    ModuleDef {
        code: "manufacturing",
        name: "Manufacturing",
        description: "Production planning and execution",
        icon: "factory",
        items: &[
            item("manufacturing_bill_of_material", "Bill of Material", "/manufacturing/bill-of-material", "manufacturing.bom.view", "layers"),
            item("manufacturing_production_order", "Production Order", "/manufacturing/production-orders", "manufacturing.production_orders.view", "factory"),
            item("manufacturing_work_center", "Work Center", "/manufacturing/work-centers", "manufacturing.work_centers.view", "server-cog"),
            item("manufacturing_report_production", "Production Report", "/manufacturing/reports/production", "manufacturing.reports.production", "chart-line"),
            item("manufacturing_report_work_center", "Work Center Report", "/manufacturing/reports/work-center", "manufacturing.reports.work_center", "wrench"),
        ],
    },
    ModuleDef {
        code: "administration",
        name: "Administration",
        description: "Tenant administration and access control",
        icon: "shield",
        items: &[
            item("admin_users", "User Management", "/users", "users.view", "users"),
            item("admin_roles", "Role Management", "/roles", "roles.view", "shield"),
        ],
    },
];

struct PlanDef {
    code: &'static str,
    name: &'static str,
    description: &'static str,
    price_monthly: u64,
    price_yearly: u64,
}

const PLANS: &[PlanDef] = &[
    PlanDef {
        code: "basic",
        name: "Basic Plan",
        description: "Essential features for small businesses",
        price_monthly: 2_900,
        price_yearly: 29_000,
    },
    PlanDef {
        code: "professional",
        name: "Professional Plan",
        description: "Advanced features for growing businesses",
        price_monthly: 7_900,
        price_yearly: 79_000,
    },
    PlanDef {
        code: "enterprise",
        name: "Enterprise Plan",
        description: "Full features for large organizations",
        price_monthly: 19_900,
        price_yearly: 199_000,
    },
];

const BASIC_MENU_CODES: &[&str] = &[
    "master_products",
    "master_product_categories",
    "master_contacts",
    "master_units",
    "master_currencies",
    "master_taxes",
    "master_payment_terms",
    "finance_cash_bank_in",
    "finance_cash_bank_out",
    "finance_ar_payment",
    "sales_sales_quotation",
    "sales_sales_order",
    "sales_sales_invoice",
    "purchasing_purchase_request",
    "purchasing_purchase_order",
    "inventory_stock_opname",
    "inventory_stock_adjustment",
    "admin_users",
    "admin_roles",
];

/// Added on top of the basic set.
const PROFESSIONAL_MENU_CODES: &[&str] = &[
    "master_chart_of_accounts",
    "master_locations",
    "finance_journal_general",
    "finance_ap_payment",
    "finance_report_general_ledger",
    "finance_report_balance_sheet",
    "finance_report_cash_flow",
    "inventory_product_mutation",
    "inventory_report_stock_card",
    "inventory_report_inventory",
    "purchasing_request_for_quotation",
    "purchasing_goods_receipt",
    "purchasing_receive_invoice",
    "purchasing_purchase_return",
    "purchasing_tukar_faktur",
    "purchasing_report_purchase",
    "sales_sales_return",
    "sales_pos",
    "sales_report_sales",
    "sales_report_salesperson",
    "sales_report_customer",
    "sales_report_item",
    "manufacturing_bill_of_material",
    "manufacturing_production_order",
    "manufacturing_work_center",
];

/// Non-menu tokens granted to the default roles, kept in their legacy form.
const BASE_ADMIN_TOKENS: &[&str] = &[
    "tenant.manage_settings",
    "users.invite_user",
    "users.deactivate_user",
    "users.create",
    "users.update",
    "users.delete",
    "roles.create_role",
    "roles.update",
    "roles.delete",
    "products.view",
    "products.create",
    "products.update",
    "products.delete",
    "product_categories.view",
    "product_categories.create",
    "product_categories.update",
    "product_categories.delete",
    "contacts.view",
    "contacts.create",
    "contacts.update",
    "contacts.delete",
    "chart_of_accounts.view",
    "chart_of_accounts.create",
    "chart_of_accounts.update",
    "chart_of_accounts.delete",
    "locations.view",
    "locations.create",
    "locations.update",
    "locations.delete",
    "currencies.view",
    "currencies.create",
    "currencies.update",
    "currencies.delete",
    "units.view",
    "units.create",
    "units.update",
    "units.delete",
    "payment_terms.view",
    "payment_terms.create",
    "payment_terms.update",
    "payment_terms.delete",
    "taxes.view",
    "taxes.create",
    "taxes.update",
    "taxes.delete",
    "finance.cash_bank_in.view",
    "finance.cash_bank_in.create",
    "finance.cash_bank_out.view",
    "finance.cash_bank_out.create",
    "finance.ap_payments.view",
    "finance.ap_payments.create",
    "finance.ar_payments.view",
    "finance.ar_payments.create",
    "finance.journal.view",
    "finance.journal.create",
    "finance.post_journal",
    "purchasing.purchase_requests.view",
    "purchasing.purchase_requests.create",
    "purchasing.rfq.view",
    "purchasing.rfq.create",
    "purchasing.purchase_orders.view",
    "purchasing.purchase_orders.create",
    "purchasing.goods_receipts.view",
    "purchasing.goods_receipts.create",
    "purchasing.receive_invoices.view",
    "purchasing.receive_invoices.create",
    "purchasing.purchase_returns.view",
    "purchasing.purchase_returns.create",
    "purchasing.tukar_faktur.view",
    "purchasing.tukar_faktur.create",
    "sales.quotations.view",
    "sales.create_order",
    "sales.quotations.create",
    "sales.invoices.view",
    "sales.invoices.create",
    "sales.returns.view",
    "sales.returns.create",
    "sales.orders.view",
    "sales.sync_marketplace",
    "sales.pos.view",
    "inventory.product_mutations.view",
    "inventory.stock_in_out",
    "inventory.transfer_stock",
    "inventory.product_mutations.create",
    "inventory.stock_opname.view",
    "inventory.stock_opname.create",
    "inventory.stock_adjustments.view",
    "inventory.stock_adjustments.create",
    "manufacturing.bom.view",
    "manufacturing.create_bom",
    "manufacturing.create_wo",
    "manufacturing.production_orders.view",
    "manufacturing.production_orders.create",
    "manufacturing.work_centers.view",
    "manufacturing.work_centers.update",
];

/// Names of the roles every tenant starts with.
pub const DEFAULT_ROLE_NAMES: [&str; 2] = ["owner", "admin"];

/// Catalog, plans and plan entitlements, with freshly generated ids.
#[derive(Debug, Clone)]
pub struct SeedData {
    pub catalog: Catalog,
    pub plans: Vec<SubscriptionPlan>,
    pub plan_menu_items: Vec<PlanMenuItem>,
}

impl SeedData {
    pub fn plan(&self, code: &str) -> Option<&SubscriptionPlan> {
        self.plans.iter().find(|p| p.code == code)
    }
}

/// Build the seed catalog. Report keys are normalized to `.view` form.
pub fn catalog() -> DomainResult<Catalog> {
    let mut modules = Vec::with_capacity(MODULES.len());
    let mut items = Vec::new();

    for (module_index, def) in MODULES.iter().enumerate() {
        let module_id = ModuleId::new();
        modules.push(Module {
            id: module_id,
            code: def.code.to_string(),
            name: def.name.to_string(),
            description: Some(def.description.to_string()),
            parent_id: None,
            sort_order: sort_position(module_index),
            icon: Some(def.icon.to_string()),
            is_active: true,
        });

        for (item_index, item) in def.items.iter().enumerate() {
            items.push(MenuItem {
                id: MenuItemId::new(),
                module_id,
                code: item.code.to_string(),
                name: item.name.to_string(),
                description: None,
                route: Some(item.route.to_string()),
                permission_key: PermissionKey::normalize(item.key)?,
                sort_order: sort_position(item_index),
                icon: Some(item.icon.to_string()),
                is_active: true,
            });
        }
    }

    Catalog::new(modules, items)
}

/// Build the full seed: catalog, plans and the included plan rows.
pub fn seed_data() -> DomainResult<SeedData> {
    let catalog = catalog()?;

    let all_codes: Vec<&str> = catalog.menu_items().iter().map(|i| i.code.as_str()).collect();
    let professional: Vec<&str> = BASIC_MENU_CODES
        .iter()
        .chain(PROFESSIONAL_MENU_CODES)
        .copied()
        .collect();

    let mut plans = Vec::with_capacity(PLANS.len());
    let mut plan_menu_items = Vec::new();

    for (index, def) in PLANS.iter().enumerate() {
        let plan = SubscriptionPlan {
            id: PlanId::new(),
            code: def.code.to_string(),
            name: def.name.to_string(),
            description: Some(def.description.to_string()),
            price_monthly: Some(def.price_monthly),
            price_yearly: Some(def.price_yearly),
            is_active: true,
            sort_order: sort_position(index),
        };

        let codes: &[&str] = match def.code {
            "basic" => BASIC_MENU_CODES,
            "professional" => &professional,
            _ => &all_codes,
        };

        let mut seen = HashSet::new();
        for code in codes {
            if !seen.insert(*code) {
                continue;
            }
            let item = catalog.menu_item_by_code(code).ok_or_else(|| {
                DomainError::not_found(format!("menu item '{code}' for plan '{}'", def.code))
            })?;
            plan_menu_items.push(PlanMenuItem {
                plan_id: plan.id,
                menu_item_id: item.id,
                is_included: true,
            });
        }

        plans.push(plan);
    }

    Ok(SeedData {
        catalog,
        plans,
        plan_menu_items,
    })
}

/// Token list of the default roles: every catalog key in its legacy form plus
/// the base administrative tokens.
pub fn default_role_tokens() -> BTreeSet<String> {
    MODULES
        .iter()
        .flat_map(|m| m.items.iter().map(|i| i.key))
        .chain(BASE_ADMIN_TOKENS.iter().copied())
        .map(str::to_string)
        .collect()
}

/// Fresh owner/admin roles for `tenant_id`.
pub fn default_roles(tenant_id: TenantId, now: DateTime<Utc>) -> Vec<Role> {
    let tokens = default_role_tokens();
    vec![
        Role::for_tenant(
            tenant_id,
            DEFAULT_ROLE_NAMES[0],
            Some("Tenant owner with full access".to_string()),
            tokens.clone(),
            now,
        ),
        Role::for_tenant(
            tenant_id,
            DEFAULT_ROLE_NAMES[1],
            Some("Tenant administrator with full menu access".to_string()),
            tokens,
            now,
        ),
    ]
}

fn sort_position(index: usize) -> i32 {
    i32::try_from(index + 1).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::parse_tokens;
    use crate::plan::Entitlements;

    #[test]
    fn catalog_has_seven_modules_and_fifty_items() {
        let catalog = catalog().unwrap();
        assert_eq!(catalog.modules().len(), 7);
        assert_eq!(catalog.menu_items().len(), 50);
        assert!(catalog
            .menu_items()
            .iter()
            .all(|i| i.permission_key.as_str().ends_with(".view")));
    }

    #[test]
    fn report_keys_are_normalized() {
        let catalog = catalog().unwrap();
        let ledger = catalog.menu_item_by_code("finance_report_general_ledger").unwrap();
        assert_eq!(ledger.permission_key.as_str(), "finance.reports.general_ledger.view");
    }

    #[test]
    fn plan_entitlements_nest() {
        let seed = seed_data().unwrap();
        let count = |code: &str| {
            let plan = seed.plan(code).unwrap();
            Entitlements::from_rows(seed.plan_menu_items.iter().filter(|r| r.plan_id == plan.id)).len()
        };

        assert_eq!(count("basic"), 19);
        assert_eq!(count("professional"), 44);
        assert_eq!(count("enterprise"), 50);
    }

    /// Decoding of the literal seed list, including the tokens whose suffix is
    /// not an action word.
    #[test]
    fn default_role_tokens_decode_to_expected_matrix() {
        let matrix = parse_tokens(default_role_tokens());

        let products = matrix.get("products.view").unwrap();
        assert!(products.can_view && products.can_create && products.can_edit && products.can_delete);
        assert!(!products.can_export);

        let journal = matrix.get("finance.journal.view").unwrap();
        assert!(journal.can_view && journal.can_create && !journal.can_edit);

        let work_centers = matrix.get("manufacturing.work_centers.view").unwrap();
        assert!(work_centers.can_edit && !work_centers.can_create);

        for legacy in [
            "sales.create_order.view",
            "sales.sync_marketplace.view",
            "finance.post_journal.view",
            "inventory.stock_in_out.view",
            "inventory.transfer_stock.view",
            "manufacturing.create_bom.view",
            "manufacturing.create_wo.view",
            "tenant.manage_settings.view",
            "users.invite_user.view",
            "roles.create_role.view",
            "finance.reports.general_ledger.view",
        ] {
            assert_eq!(
                matrix.get(legacy),
                Some(crate::flags::CapabilityFlags::VIEW_ONLY),
                "{legacy}"
            );
        }

        let roles = matrix.get("roles.view").unwrap();
        assert!(roles.can_view && roles.can_edit && roles.can_delete && !roles.can_create);
    }

    #[test]
    fn default_roles_are_tenant_scoped_and_mutable() {
        let tenant_id = TenantId::new();
        let roles = default_roles(tenant_id, Utc::now());
        let names: Vec<_> = roles.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, DEFAULT_ROLE_NAMES.to_vec());
        assert!(roles.iter().all(|r| r.tenant_id == Some(tenant_id) && !r.is_system));
    }
}
