pub mod auth;
pub mod billing;
pub mod catalog;
pub mod common;
pub mod employees;
pub mod goods_receipts;
pub mod notifications;
pub mod purchase_orders;
pub mod purchase_requests;
pub mod sourcing;
pub mod vendor_portal;
pub mod vendors;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::{
    auth::AuthService,
    config::AppConfig,
    events::EventSender,
    services::{
        accounts::AccountService, billing::BillingService, catalog::CatalogService,
        dashboards::DashboardService, employees::EmployeeService, mailer::Mailer,
        notifications::NotificationService, ordering::OrderingService,
        payment_gateway::PaymentGateway, receiving::ReceivingService,
        requisitions::RequisitionService, sourcing::SourcingService,
        vendor_portal::VendorPortalService, vendors::VendorService,
    },
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub accounts: Arc<AccountService>,
    pub employees: Arc<EmployeeService>,
    pub vendors: Arc<VendorService>,
    pub catalog: Arc<CatalogService>,
    pub requisitions: Arc<RequisitionService>,
    pub sourcing: Arc<SourcingService>,
    pub ordering: Arc<OrderingService>,
    pub receiving: Arc<ReceivingService>,
    pub billing: Arc<BillingService>,
    pub notifications: Arc<NotificationService>,
    pub dashboards: Arc<DashboardService>,
    pub vendor_portal: Arc<VendorPortalService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        auth: Arc<AuthService>,
        mailer: Arc<dyn Mailer>,
        gateway: Arc<dyn PaymentGateway>,
        config: &AppConfig,
    ) -> Self {
        Self {
            accounts: Arc::new(AccountService::new(
                db.clone(),
                auth,
                event_sender.clone(),
                mailer.clone(),
            )),
            employees: Arc::new(EmployeeService::new(
                db.clone(),
                event_sender.clone(),
                mailer.clone(),
                config.hr_email.clone(),
            )),
            vendors: Arc::new(VendorService::new(
                db.clone(),
                event_sender.clone(),
                mailer.clone(),
            )),
            catalog: Arc::new(CatalogService::new(db.clone(), event_sender.clone())),
            requisitions: Arc::new(RequisitionService::new(db.clone(), event_sender.clone())),
            sourcing: Arc::new(SourcingService::new(db.clone(), event_sender.clone())),
            ordering: Arc::new(OrderingService::new(db.clone(), event_sender.clone())),
            receiving: Arc::new(ReceivingService::new(db.clone(), event_sender.clone())),
            billing: Arc::new(BillingService::new(
                db.clone(),
                event_sender.clone(),
                gateway,
                config.currency.clone(),
            )),
            notifications: Arc::new(NotificationService::new(db.clone())),
            dashboards: Arc::new(DashboardService::new(db.clone())),
            vendor_portal: Arc::new(VendorPortalService::new(
                db,
                event_sender,
                mailer,
                config.upload_dir.clone(),
                config.max_upload_bytes,
            )),
        }
    }
}
