/*!
 * # Permissions Module
 *
 * Permissions are `resource:action` strings. A grant of `resource:*` implies
 * every action on that resource and `*` implies everything.
 */

/// Permission actions
pub struct Actions;

impl Actions {
    pub const READ: &'static str = "read";
    pub const CREATE: &'static str = "create";
    pub const MANAGE: &'static str = "manage";
    pub const ALL: &'static str = "*";
}

/// Resource types
pub struct Resources;

impl Resources {
    pub const EMPLOYEES: &'static str = "employees";
    pub const VENDORS: &'static str = "vendors";
    pub const CATALOG: &'static str = "catalog";
    pub const PURCHASE_REQUESTS: &'static str = "purchase_requests";
    pub const RFQS: &'static str = "rfqs";
    pub const QUOTATIONS: &'static str = "quotations";
    pub const PURCHASE_ORDERS: &'static str = "purchase_orders";
    pub const GOODS_RECEIPTS: &'static str = "goods_receipts";
    pub const INVOICES: &'static str = "invoices";
    pub const PAYMENTS: &'static str = "payments";
    pub const NOTIFICATIONS: &'static str = "notifications";
    pub const DASHBOARD: &'static str = "dashboard";
    pub const VENDOR_PORTAL: &'static str = "vendor_portal";
}

/// Permission string constants used by the route guards.
pub mod consts {
    pub const EMPLOYEES_MANAGE: &str = "employees:manage";

    pub const VENDORS_READ: &str = "vendors:read";
    pub const VENDORS_MANAGE: &str = "vendors:manage";

    pub const CATALOG_READ: &str = "catalog:read";
    pub const CATALOG_MANAGE: &str = "catalog:manage";

    pub const PURCHASE_REQUESTS_READ: &str = "purchase_requests:read";
    pub const PURCHASE_REQUESTS_CREATE: &str = "purchase_requests:create";
    pub const PURCHASE_REQUESTS_REVIEW: &str = "purchase_requests:review";

    pub const RFQS_READ: &str = "rfqs:read";
    pub const RFQS_MANAGE: &str = "rfqs:manage";

    pub const QUOTATIONS_READ: &str = "quotations:read";
    pub const QUOTATIONS_MANAGE: &str = "quotations:manage";

    pub const PURCHASE_ORDERS_READ: &str = "purchase_orders:read";
    pub const PURCHASE_ORDERS_MANAGE: &str = "purchase_orders:manage";
    pub const PURCHASE_ORDERS_UPDATE_STATUS: &str = "purchase_orders:update_status";

    pub const GOODS_RECEIPTS_READ: &str = "goods_receipts:read";
    pub const GOODS_RECEIPTS_CREATE: &str = "goods_receipts:create";

    pub const INVOICES_READ: &str = "invoices:read";
    pub const INVOICES_MANAGE: &str = "invoices:manage";

    pub const PAYMENTS_READ: &str = "payments:read";
    pub const PAYMENTS_MANAGE: &str = "payments:manage";

    pub const NOTIFICATIONS_READ: &str = "notifications:read";

    pub const DASHBOARD_READ: &str = "dashboard:read";

    pub const VENDOR_PORTAL_ACCESS: &str = "vendor_portal:access";
}

/// Build a permission string from resource and action
pub fn format_permission(resource: &str, action: &str) -> String {
    format!("{}:{}", resource, action)
}

/// Whether a granted permission satisfies a required one.
pub fn permission_implies(granted: &str, required: &str) -> bool {
    if granted == required || granted == Actions::ALL {
        return true;
    }

    match (granted.split_once(':'), required.split_once(':')) {
        (Some((granted_resource, Actions::ALL)), Some((required_resource, _))) => {
            granted_resource == required_resource
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_wildcard_grants() {
        assert!(permission_implies(consts::RFQS_READ, consts::RFQS_READ));
        assert!(permission_implies("rfqs:*", consts::RFQS_MANAGE));
        assert!(permission_implies("*", consts::DASHBOARD_READ));
        assert!(!permission_implies(consts::RFQS_READ, consts::RFQS_MANAGE));
        assert!(!permission_implies("rfq:*", consts::RFQS_MANAGE));
    }

    #[test]
    fn formats_resource_action() {
        assert_eq!(
            format_permission(Resources::INVOICES, Actions::MANAGE),
            consts::INVOICES_MANAGE
        );
        assert_eq!(
            format_permission(Resources::GOODS_RECEIPTS, Actions::CREATE),
            consts::GOODS_RECEIPTS_CREATE
        );
    }
}
