/*!
 * # Role-Based Access Control (RBAC) Module
 *
 * Maps the three account roles to their permission grants. Administrators
 * hold the global wildcard; the route guards also let them through
 * unconditionally.
 */

use crate::auth::permissions::{consts, Actions};
use crate::models::UserRole;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Role definition with associated permissions
#[derive(Debug, Clone)]
pub struct Role {
    pub name: UserRole,
    pub description: &'static str,
    pub permissions: Vec<&'static str>,
}

pub static ROLES: Lazy<HashMap<UserRole, Role>> = Lazy::new(|| {
    let mut roles = HashMap::new();

    roles.insert(
        UserRole::Admin,
        Role {
            name: UserRole::Admin,
            description: "Administrator with full access",
            permissions: vec![Actions::ALL],
        },
    );

    roles.insert(
        UserRole::Employee,
        Role {
            name: UserRole::Employee,
            description: "Procurement staff",
            permissions: vec![
                consts::VENDORS_READ,
                consts::CATALOG_READ,
                consts::PURCHASE_REQUESTS_READ,
                consts::PURCHASE_REQUESTS_CREATE,
                consts::RFQS_READ,
                consts::QUOTATIONS_READ,
                consts::PURCHASE_ORDERS_READ,
                consts::PURCHASE_ORDERS_UPDATE_STATUS,
                consts::GOODS_RECEIPTS_READ,
                consts::GOODS_RECEIPTS_CREATE,
                consts::INVOICES_READ,
                consts::PAYMENTS_READ,
                consts::NOTIFICATIONS_READ,
            ],
        },
    );

    roles.insert(
        UserRole::Vendor,
        Role {
            name: UserRole::Vendor,
            description: "Supplier using the vendor portal",
            permissions: vec![
                consts::CATALOG_READ,
                consts::NOTIFICATIONS_READ,
                consts::VENDOR_PORTAL_ACCESS,
            ],
        },
    );

    roles
});

/// Permission grants for a role, as stored in access tokens.
pub fn permissions_for_role(role: UserRole) -> Vec<String> {
    ROLES
        .get(&role)
        .map(|r| r.permissions.iter().map(|p| p.to_string()).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::permissions::permission_implies;

    fn grants(role: UserRole, required: &str) -> bool {
        permissions_for_role(role)
            .iter()
            .any(|p| permission_implies(p, required))
    }

    #[test]
    fn admin_holds_everything() {
        assert!(grants(UserRole::Admin, consts::EMPLOYEES_MANAGE));
        assert!(grants(UserRole::Admin, consts::PAYMENTS_MANAGE));
    }

    #[test]
    fn employees_cannot_review_or_pay() {
        assert!(grants(UserRole::Employee, consts::PURCHASE_REQUESTS_CREATE));
        assert!(grants(UserRole::Employee, consts::PURCHASE_ORDERS_UPDATE_STATUS));
        assert!(!grants(UserRole::Employee, consts::PURCHASE_REQUESTS_REVIEW));
        assert!(!grants(UserRole::Employee, consts::PAYMENTS_MANAGE));
        assert!(!grants(UserRole::Employee, consts::VENDOR_PORTAL_ACCESS));
    }

    #[test]
    fn vendors_only_reach_their_portal() {
        assert!(grants(UserRole::Vendor, consts::VENDOR_PORTAL_ACCESS));
        assert!(!grants(UserRole::Vendor, consts::PURCHASE_ORDERS_READ));
        assert!(!grants(UserRole::Vendor, consts::INVOICES_READ));
    }
}
