//! Database entities, one module per table.

use sea_orm::{ActiveValue, Value};

pub mod category;
pub mod employee_profile;
pub mod goods_receipt;
pub mod goods_receipt_item;
pub mod invoice;
pub mod notification;
pub mod payment;
pub mod product;
pub mod purchase_order;
pub mod purchase_order_item;
pub mod purchase_request;
pub mod rfq;
pub mod user;
pub mod user_profile;
pub mod vendor;
pub mod vendor_quotation;

pub use goods_receipt::ReceiptCondition;
pub use invoice::InvoiceStatus;
pub use notification::NotificationType;
pub use payment::PaymentMethod;
pub use purchase_order::{DeliveryStatus, PurchaseOrderStatus};
pub use purchase_request::{PurchaseRequestStatus, UrgencyLevel};
pub use rfq::RfqStatus;
pub use user_profile::UserRole;
pub use vendor::VendorStatus;
pub use vendor_quotation::QuotationStatus;

/// Value held by an active model field, whether freshly set or loaded.
pub(crate) fn current_value<V>(value: &ActiveValue<V>) -> Option<V>
where
    V: Into<Value> + Clone,
{
    match value {
        ActiveValue::Set(v) | ActiveValue::Unchanged(v) => Some(v.clone()),
        ActiveValue::NotSet => None,
    }
}

pub mod prelude {
    pub use super::category::Entity as Category;
    pub use super::employee_profile::Entity as EmployeeProfile;
    pub use super::goods_receipt::Entity as GoodsReceipt;
    pub use super::goods_receipt_item::Entity as GoodsReceiptItem;
    pub use super::invoice::Entity as Invoice;
    pub use super::notification::Entity as Notification;
    pub use super::payment::Entity as Payment;
    pub use super::product::Entity as Product;
    pub use super::purchase_order::Entity as PurchaseOrder;
    pub use super::purchase_order_item::Entity as PurchaseOrderItem;
    pub use super::purchase_request::Entity as PurchaseRequest;
    pub use super::rfq::Entity as Rfq;
    pub use super::user::Entity as User;
    pub use super::user_profile::Entity as UserProfile;
    pub use super::vendor::Entity as Vendor;
    pub use super::vendor_quotation::Entity as VendorQuotation;
}
