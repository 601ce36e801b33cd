use sea_orm::sea_query::{Expr, Query};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Select};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::{
    errors::ServiceError,
    models::{
        invoice, product, purchase_order, purchase_request, rfq, user, user_profile, vendor,
        InvoiceStatus, PurchaseOrderStatus, PurchaseRequestStatus, RfqStatus, UserRole,
        VendorStatus,
    },
};

/// Counters shown on the administrator dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct AdminStats {
    pub total_employees: u64,
    pub active_employees: u64,
    pub total_vendors: u64,
    pub active_vendors: u64,
    pub pending_vendors: u64,
    pub approved_vendors: u64,
    pub rejected_vendors: u64,
    pub total_products: u64,
    pub total_purchase_orders: u64,
    pub pending_orders: u64,
    pub total_invoices: u64,
    pub pending_invoices: u64,
    pub total_purchase_requests: u64,
    pub pending_purchase_requests: u64,
    pub approved_purchase_requests: u64,
    pub rejected_purchase_requests: u64,
    pub total_rfqs: u64,
    /// RFQs still waiting for the vendor.
    pub pending_rfqs: u64,
    /// RFQs with a quotation returned.
    pub received_quotations: u64,
}

#[derive(Clone)]
pub struct DashboardService {
    db: Arc<DatabaseConnection>,
}

impl DashboardService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Non-staff accounts that are not tied to a vendor.
    fn employees(&self) -> Select<user::Entity> {
        let profile_vendors = Query::select()
            .column(user_profile::Column::UserId)
            .from(user_profile::Entity)
            .and_where(Expr::col(user_profile::Column::Role).eq(UserRole::Vendor.to_string()))
            .to_owned();
        let linked_vendors = Query::select()
            .column(vendor::Column::UserId)
            .from(vendor::Entity)
            .and_where(Expr::col(vendor::Column::UserId).is_not_null())
            .to_owned();
        user::Entity::find()
            .filter(user::Column::IsStaff.eq(false))
            .filter(user::Column::IsSuperuser.eq(false))
            .filter(user::Column::Id.not_in_subquery(profile_vendors))
            .filter(user::Column::Id.not_in_subquery(linked_vendors))
    }

    #[instrument(skip(self))]
    pub async fn admin_stats(&self) -> Result<AdminStats, ServiceError> {
        let db = &*self.db;
        let vendors = || vendor::Entity::find();
        let requests = || purchase_request::Entity::find();

        Ok(AdminStats {
            total_employees: self.employees().count(db).await?,
            active_employees: self
                .employees()
                .filter(user::Column::IsActive.eq(true))
                .count(db)
                .await?,
            total_vendors: vendors().count(db).await?,
            active_vendors: vendors()
                .filter(vendor::Column::IsActive.eq(true))
                .count(db)
                .await?,
            pending_vendors: vendors()
                .filter(vendor::Column::Status.eq(VendorStatus::Pending))
                .count(db)
                .await?,
            approved_vendors: vendors()
                .filter(vendor::Column::Status.eq(VendorStatus::Approved))
                .count(db)
                .await?,
            rejected_vendors: vendors()
                .filter(vendor::Column::Status.eq(VendorStatus::Rejected))
                .count(db)
                .await?,
            total_products: product::Entity::find().count(db).await?,
            total_purchase_orders: purchase_order::Entity::find().count(db).await?,
            pending_orders: purchase_order::Entity::find()
                .filter(purchase_order::Column::Status.eq(PurchaseOrderStatus::Pending))
                .count(db)
                .await?,
            total_invoices: invoice::Entity::find().count(db).await?,
            pending_invoices: invoice::Entity::find()
                .filter(invoice::Column::Status.eq(InvoiceStatus::Pending))
                .count(db)
                .await?,
            total_purchase_requests: requests().count(db).await?,
            pending_purchase_requests: requests()
                .filter(purchase_request::Column::Status.eq(PurchaseRequestStatus::Pending))
                .count(db)
                .await?,
            approved_purchase_requests: requests()
                .filter(purchase_request::Column::Status.eq(PurchaseRequestStatus::Approved))
                .count(db)
                .await?,
            rejected_purchase_requests: requests()
                .filter(purchase_request::Column::Status.eq(PurchaseRequestStatus::Rejected))
                .count(db)
                .await?,
            total_rfqs: rfq::Entity::find().count(db).await?,
            pending_rfqs: rfq::Entity::find()
                .filter(rfq::Column::Status.eq(RfqStatus::Sent))
                .count(db)
                .await?,
            received_quotations: rfq::Entity::find()
                .filter(rfq::Column::Status.eq(RfqStatus::Received))
                .count(db)
                .await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migrations::{Migrator, MigratorTrait};
    use sea_orm::{ActiveModelTrait, Database, Set};

    #[tokio::test]
    async fn vendor_logins_are_not_counted_as_employees() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let account = |name: &str| user::ActiveModel {
            username: Set(name.to_string()),
            email: Set(format!("{}@example.com", name)),
            password_hash: Set(String::new()),
            first_name: Set(String::new()),
            last_name: Set(String::new()),
            is_active: Set(true),
            is_staff: Set(false),
            is_superuser: Set(false),
            last_login: Set(None),
            ..Default::default()
        };
        account("alice").insert(&db).await.unwrap();
        let supplier = account("acme").insert(&db).await.unwrap();
        user_profile::ActiveModel {
            user_id: Set(supplier.id),
            role: Set(UserRole::Vendor),
            phone: Set(String::new()),
            department: Set(String::new()),
            is_active: Set(true),
            vendor_id: Set(None),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let stats = DashboardService::new(Arc::new(db)).admin_stats().await.unwrap();
        assert_eq!(stats.total_employees, 1);
        assert_eq!(stats.active_employees, 1);
        assert_eq!(stats.total_vendors, 0);
    }
}
