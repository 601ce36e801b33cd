//! Self-service operations for vendor logins. Every call is scoped to the
//! vendor linked to the caller.

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        invoice, purchase_order, purchase_request, rfq, user_profile, vendor, vendor_quotation,
        DeliveryStatus, InvoiceStatus, NotificationType, QuotationStatus, RfqStatus,
    },
    services::{
        accounts::active_admins,
        amounts,
        billing::{grouped_amount, BillingService, InvoiceView},
        invoice_pdf,
        mailer::{deliver, templates, Mailer},
        notifications::{NewNotification, NotificationService},
        numbering,
        ordering::{OrderingService, PurchaseOrderDetail},
        sourcing::{mark_quotation_received, RfqDetail},
    },
};

pub const ALLOWED_INVOICE_EXTENSIONS: [&str; 6] = [".pdf", ".xlsx", ".xls", ".jpg", ".jpeg", ".png"];

/// Checks an uploaded invoice document and returns its lowercased extension.
pub fn check_invoice_upload(filename: &str, size: usize, max_bytes: usize) -> Result<String, ServiceError> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default();
    if !ALLOWED_INVOICE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ServiceError::ValidationError(format!(
            "Invalid file type. Allowed: {}",
            ALLOWED_INVOICE_EXTENSIONS.join(", ")
        )));
    }
    if size > max_bytes {
        return Err(ServiceError::ValidationError(format!(
            "File size too large. Maximum size is {}MB",
            max_bytes / (1024 * 1024)
        )));
    }
    Ok(ext)
}

fn no_vendor() -> ServiceError {
    ServiceError::Forbidden("No vendor account associated with this user".to_string())
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PortalStatusFilter {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct VendorStats {
    pub total_rfqs: u64,
    pub pending_rfqs: u64,
    pub submitted_quotations: u64,
    pub accepted_quotations: u64,
    pub total_orders: u64,
    pub pending_deliveries: u64,
    pub upcoming_deliveries: u64,
    pub pending_payments: u64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DeliveryUpdate {
    pub delivery_status: DeliveryStatus,
    pub shipment_date: Option<NaiveDate>,
    #[validate(length(max = 100))]
    pub tracking_number: Option<String>,
    pub delivery_notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct QuotationSubmission {
    #[validate(custom = "amounts::price")]
    pub unit_price: Decimal,
    /// Defaults to the requested quantity.
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
    pub quantity: Option<i32>,
    #[validate(custom = "amounts::rate")]
    pub tax_rate: Option<Decimal>,
    #[validate(custom = "amounts::price")]
    pub shipping_cost: Option<Decimal>,
    #[validate(range(
        min = 1,
        max = 3650,
        message = "Delivery estimate must be between 1 and 3650 days."
    ))]
    pub estimated_delivery_days: i32,
    pub quotation_valid_until: NaiveDate,
    pub payment_terms: Option<String>,
    #[serde(default)]
    pub warranty_terms: String,
    #[serde(default)]
    pub additional_notes: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VendorInvoiceSubmission {
    pub purchase_order: Uuid,
    #[validate(length(min = 1, max = 50, message = "This field is required."))]
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    #[validate(custom = "amounts::amount")]
    pub subtotal: Option<Decimal>,
    #[validate(custom = "amounts::amount")]
    pub tax_amount: Option<Decimal>,
    #[validate(custom = "amounts::amount")]
    pub total_amount: Option<Decimal>,
    #[serde(default)]
    pub notes: String,
}

pub struct InvoiceUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveryUpdated {
    pub message: String,
    pub purchase_order: PurchaseOrderDetail,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceMessage {
    pub message: String,
    pub invoice: InvoiceView,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuotationMessage {
    pub message: String,
    pub quotation: vendor_quotation::Model,
}

#[derive(Clone)]
pub struct VendorPortalService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    mailer: Arc<dyn Mailer>,
    notifications: NotificationService,
    upload_dir: PathBuf,
    max_upload_bytes: usize,
}

impl VendorPortalService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        mailer: Arc<dyn Mailer>,
        upload_dir: impl Into<PathBuf>,
        max_upload_bytes: usize,
    ) -> Self {
        let notifications = NotificationService::new(db.clone());
        Self {
            db,
            event_sender,
            mailer,
            notifications,
            upload_dir: upload_dir.into(),
            max_upload_bytes,
        }
    }

    /// Vendor linked to the caller through their profile or the vendor's
    /// own login link.
    pub async fn vendor_for(&self, caller: &AuthUser) -> Result<vendor::Model, ServiceError> {
        let via_profile = user_profile::Entity::find()
            .filter(user_profile::Column::UserId.eq(caller.user_id))
            .one(&*self.db)
            .await?
            .and_then(|p| p.vendor_id);
        if let Some(vendor_id) = via_profile.or(caller.vendor_id) {
            if let Some(v) = vendor::Entity::find_by_id(vendor_id).one(&*self.db).await? {
                return Ok(v);
            }
        }
        vendor::Entity::find()
            .filter(vendor::Column::UserId.eq(caller.user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(no_vendor)
    }

    #[instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn dashboard_stats(&self, caller: &AuthUser) -> Result<VendorStats, ServiceError> {
        let v = self.vendor_for(caller).await?;
        let db = &*self.db;
        let today = Utc::now().date_naive();
        let own_rfqs = || {
            Query::select()
                .column(rfq::Column::Id)
                .from(rfq::Entity)
                .and_where(rfq::Column::VendorId.eq(v.id))
                .to_owned()
        };
        let rfqs = || rfq::Entity::find().filter(rfq::Column::VendorId.eq(v.id));
        let orders = || purchase_order::Entity::find().filter(purchase_order::Column::VendorId.eq(v.id));

        Ok(VendorStats {
            total_rfqs: rfqs().count(db).await?,
            pending_rfqs: rfqs()
                .filter(rfq::Column::Status.eq(RfqStatus::Sent))
                .count(db)
                .await?,
            submitted_quotations: vendor_quotation::Entity::find()
                .filter(vendor_quotation::Column::RfqId.in_subquery(own_rfqs()))
                .filter(vendor_quotation::Column::Status.eq(QuotationStatus::Submitted))
                .count(db)
                .await?,
            accepted_quotations: vendor_quotation::Entity::find()
                .filter(vendor_quotation::Column::RfqId.in_subquery(own_rfqs()))
                .filter(vendor_quotation::Column::Status.eq(QuotationStatus::Accepted))
                .count(db)
                .await?,
            total_orders: orders().count(db).await?,
            pending_deliveries: orders()
                .filter(purchase_order::Column::DeliveryStatus.ne(DeliveryStatus::Delivered))
                .count(db)
                .await?,
            upcoming_deliveries: orders()
                .filter(purchase_order::Column::ExpectedDeliveryDate.between(today, today + Duration::days(7)))
                .count(db)
                .await?,
            pending_payments: invoice::Entity::find()
                .filter(invoice::Column::VendorId.eq(v.id))
                .filter(invoice::Column::Status.eq(InvoiceStatus::Pending))
                .count(db)
                .await?,
        })
    }

    pub async fn my_rfqs(
        &self,
        caller: &AuthUser,
        filter: PortalStatusFilter,
    ) -> Result<Vec<RfqDetail>, ServiceError> {
        let v = self.vendor_for(caller).await?;
        let mut query = rfq::Entity::find().filter(rfq::Column::VendorId.eq(v.id));
        if let Some(status) = filter.status.filter(|s| !s.is_empty()) {
            query = query.filter(rfq::Column::Status.eq(status));
        }
        let rows = query
            .order_by_desc(rfq::Column::SentDate)
            .find_also_related(vendor_quotation::Entity)
            .all(&*self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(rfq, quotation)| RfqDetail { rfq, quotation })
            .collect())
    }

    pub async fn my_quotations(
        &self,
        caller: &AuthUser,
        filter: PortalStatusFilter,
    ) -> Result<Vec<vendor_quotation::Model>, ServiceError> {
        let v = self.vendor_for(caller).await?;
        let own_rfqs = Query::select()
            .column(rfq::Column::Id)
            .from(rfq::Entity)
            .and_where(rfq::Column::VendorId.eq(v.id))
            .to_owned();
        let mut query =
            vendor_quotation::Entity::find().filter(vendor_quotation::Column::RfqId.in_subquery(own_rfqs));
        if let Some(status) = filter.status.filter(|s| !s.is_empty()) {
            query = query.filter(vendor_quotation::Column::Status.eq(status));
        }
        Ok(query
            .order_by_desc(vendor_quotation::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    pub async fn my_purchase_orders(
        &self,
        caller: &AuthUser,
        filter: PortalStatusFilter,
    ) -> Result<Vec<PurchaseOrderDetail>, ServiceError> {
        let v = self.vendor_for(caller).await?;
        let mut query = purchase_order::Entity::find().filter(purchase_order::Column::VendorId.eq(v.id));
        if let Some(status) = filter.status.filter(|s| !s.is_empty()) {
            query = query.filter(purchase_order::Column::Status.eq(status));
        }
        let orders = query
            .order_by_desc(purchase_order::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        OrderingService::details(&*self.db, orders).await
    }

    pub async fn my_invoices(&self, caller: &AuthUser) -> Result<Vec<InvoiceView>, ServiceError> {
        let v = self.vendor_for(caller).await?;
        let rows = invoice::Entity::find()
            .filter(invoice::Column::VendorId.eq(v.id))
            .order_by_desc(invoice::Column::InvoiceDate)
            .all(&*self.db)
            .await?;
        BillingService::views(&*self.db, rows).await
    }

    #[instrument(skip(self, caller, input), fields(user_id = %caller.user_id))]
    pub async fn update_delivery_status(
        &self,
        caller: &AuthUser,
        purchase_order_id: Uuid,
        input: DeliveryUpdate,
    ) -> Result<DeliveryUpdated, ServiceError> {
        input.validate()?;
        let v = self.vendor_for(caller).await?;
        let order = purchase_order::Entity::find_by_id(purchase_order_id)
            .filter(purchase_order::Column::VendorId.eq(v.id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Purchase order not found".to_string()))?;

        let mut active: purchase_order::ActiveModel = order.into();
        active.delivery_status = Set(input.delivery_status);
        if input.shipment_date.is_some() {
            active.shipment_date = Set(input.shipment_date);
        }
        if let Some(tracking) = input.tracking_number.filter(|t| !t.is_empty()) {
            active.tracking_number = Set(tracking);
        }
        if let Some(notes) = input.delivery_notes.filter(|n| !n.is_empty()) {
            active.delivery_notes = Set(notes);
        }
        active.last_status_update = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;

        info!(po_id = %purchase_order_id, delivery_status = %input.delivery_status, "delivery status updated");
        self.event_sender
            .publish(Event::DeliveryStatusUpdated {
                purchase_order_id,
                delivery_status: input.delivery_status.to_string(),
            })
            .await;
        Ok(DeliveryUpdated {
            message: "Delivery status updated successfully".to_string(),
            purchase_order: OrderingService::detail(&*self.db, updated).await?,
        })
    }

    /// Stores the invoice document under `invoices/YYYY/MM/` in the upload
    /// directory and records it on the invoice.
    #[instrument(skip(self, caller, upload), fields(filename = %upload.filename, size = upload.bytes.len()))]
    pub async fn upload_invoice(
        &self,
        caller: &AuthUser,
        invoice_id: Uuid,
        upload: InvoiceUpload,
    ) -> Result<InvoiceMessage, ServiceError> {
        let v = self.vendor_for(caller).await?;
        let inv = invoice::Entity::find_by_id(invoice_id)
            .filter(invoice::Column::VendorId.eq(v.id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Invoice not found".to_string()))?;
        let ext = check_invoice_upload(&upload.filename, upload.bytes.len(), self.max_upload_bytes)?;

        let now = Utc::now();
        let relative = PathBuf::from("invoices")
            .join(now.format("%Y").to_string())
            .join(now.format("%m").to_string())
            .join(format!("{}_{}{}", invoice_pdf::file_safe(&inv.invoice_number), Uuid::new_v4().simple(), ext));
        let target = self.upload_dir.join(&relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ServiceError::StorageError(e.to_string()))?;
        }
        tokio::fs::write(&target, &upload.bytes)
            .await
            .map_err(|e| ServiceError::StorageError(e.to_string()))?;

        let mut active: invoice::ActiveModel = inv.into();
        active.invoice_file = Set(Some(relative.to_string_lossy().replace('\\', "/")));
        active.uploaded_by = Set(Some(caller.user_id));
        active.upload_date = Set(Some(now));
        let updated = active.update(&*self.db).await?;

        info!(invoice_id = %invoice_id, path = %target.display(), "invoice document stored");
        self.event_sender
            .publish(Event::InvoiceUploaded(invoice_id))
            .await;
        Ok(InvoiceMessage {
            message: "Invoice uploaded successfully".to_string(),
            invoice: BillingService::view(&*self.db, updated).await?,
        })
    }

    /// Submits a quotation for one of the vendor's RFQs in a single step.
    #[instrument(skip(self, caller, input), fields(user_id = %caller.user_id))]
    pub async fn submit_quotation(
        &self,
        caller: &AuthUser,
        rfq_id: Uuid,
        input: QuotationSubmission,
    ) -> Result<QuotationMessage, ServiceError> {
        input.validate()?;
        let v = self.vendor_for(caller).await?;

        let txn = self.db.begin().await?;
        let (rfq, existing) = rfq::Entity::find_by_id(rfq_id)
            .filter(rfq::Column::VendorId.eq(v.id))
            .find_also_related(vendor_quotation::Entity)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("RFQ not found".to_string()))?;
        if existing.is_some() {
            return Err(ServiceError::InvalidOperation(
                "Quotation already exists for this RFQ".to_string(),
            ));
        }
        let requested_quantity = purchase_request::Entity::find_by_id(rfq.purchase_request_id)
            .one(&txn)
            .await?
            .map(|r| r.quantity)
            .unwrap_or(1);

        let now = Utc::now();
        let quotation = vendor_quotation::ActiveModel {
            rfq_id: Set(rfq.id),
            quotation_number: Set(numbering::quotation_number(now)),
            unit_price: Set(input.unit_price),
            quantity: Set(input.quantity.unwrap_or(requested_quantity)),
            tax_rate: Set(input.tax_rate.unwrap_or_default()),
            shipping_cost: Set(input.shipping_cost.unwrap_or_default()),
            estimated_delivery_days: Set(input.estimated_delivery_days),
            quotation_valid_until: Set(input.quotation_valid_until),
            payment_terms: Set(input.payment_terms.unwrap_or_else(|| "Net 30".to_string())),
            warranty_terms: Set(input.warranty_terms),
            additional_notes: Set(input.additional_notes),
            status: Set(QuotationStatus::Submitted),
            reviewed_by: Set(None),
            reviewed_date: Set(None),
            review_notes: Set(String::new()),
            submitted_date: Set(Some(now)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        mark_quotation_received(&txn, rfq).await?;
        txn.commit().await?;

        info!(quotation_id = %quotation.id, total = %quotation.total_amount, "quotation submitted by vendor");
        self.event_sender
            .publish(Event::QuotationSubmitted(quotation.id))
            .await;
        Ok(QuotationMessage {
            message: "Quotation submitted successfully".to_string(),
            quotation,
        })
    }

    /// Raises the invoice for one of the vendor's purchase orders and lets
    /// the administrators know.
    #[instrument(skip(self, caller, input), fields(user_id = %caller.user_id))]
    pub async fn create_invoice(
        &self,
        caller: &AuthUser,
        input: VendorInvoiceSubmission,
    ) -> Result<InvoiceMessage, ServiceError> {
        input.validate()?;
        let v = self.vendor_for(caller).await?;

        let txn = self.db.begin().await?;
        let order = purchase_order::Entity::find_by_id(input.purchase_order)
            .filter(purchase_order::Column::VendorId.eq(v.id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Purchase order not found".to_string()))?;
        let existing = invoice::Entity::find()
            .filter(invoice::Column::PurchaseOrderId.eq(order.id))
            .count(&txn)
            .await?;
        if existing > 0 {
            return Err(ServiceError::InvalidOperation(
                "Invoice already exists for this purchase order".to_string(),
            ));
        }
        let number_taken = invoice::Entity::find()
            .filter(invoice::Column::InvoiceNumber.eq(input.invoice_number.as_str()))
            .count(&txn)
            .await?;
        if number_taken > 0 {
            return Err(ServiceError::bad_request_with(
                "invoice with this invoice number already exists.",
                serde_json::json!({
                    "invoice_number": ["invoice with this invoice number already exists."]
                }),
            ));
        }

        let created = invoice::ActiveModel {
            invoice_number: Set(input.invoice_number),
            vendor_id: Set(v.id),
            purchase_order_id: Set(Some(order.id)),
            invoice_date: Set(input.invoice_date),
            due_date: Set(input.due_date),
            status: Set(InvoiceStatus::Pending),
            subtotal: Set(input.subtotal.unwrap_or(order.subtotal)),
            tax_amount: Set(input.tax_amount.unwrap_or(order.tax_amount)),
            total_amount: Set(input.total_amount.unwrap_or(order.total_amount)),
            paid_amount: Set(Decimal::ZERO),
            invoice_file: Set(None),
            uploaded_by: Set(Some(caller.user_id)),
            upload_date: Set(None),
            notes: Set(input.notes),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        let admins = active_admins(&txn).await?;
        let view = BillingService::view(&txn, created.clone()).await?;
        txn.commit().await?;

        info!(invoice_id = %created.id, po_id = %order.id, "invoice submitted by vendor");
        self.event_sender
            .publish(Event::InvoiceCreated(created.id))
            .await;

        let amount = grouped_amount(created.total_amount);
        let message = format!(
            "New invoice {} (\u{20b9}{}) submitted by {}",
            created.invoice_number, amount, v.company_name
        );
        self.notifications
            .dispatch(
                admins
                    .iter()
                    .map(|a| {
                        NewNotification::new(a.id, NotificationType::General, message.clone())
                            .order(order.id)
                    })
                    .collect(),
            )
            .await;

        let recipients: Vec<String> = admins
            .into_iter()
            .map(|a| a.email)
            .filter(|e| !e.is_empty())
            .collect();
        if !recipients.is_empty() {
            deliver(
                self.mailer.as_ref(),
                templates::invoice_submitted(
                    recipients,
                    &created.invoice_number,
                    &v.company_name,
                    &order.po_number,
                    &amount,
                    &created.due_date.to_string(),
                ),
            )
            .await;
        }

        Ok(InvoiceMessage {
            message: "Invoice created and submitted to admin successfully".to_string(),
            invoice: view,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const TEN_MIB: usize = 10 * 1024 * 1024;

    #[rstest]
    #[case("invoice.pdf", ".pdf")]
    #[case("Scan.JPG", ".jpg")]
    #[case("ledger.final.xlsx", ".xlsx")]
    fn accepts_known_document_types(#[case] name: &str, #[case] ext: &str) {
        assert_eq!(check_invoice_upload(name, 1024, TEN_MIB).unwrap(), ext);
    }

    #[rstest]
    #[case("payload.exe")]
    #[case("README")]
    #[case("archive.pdf.zip")]
    fn rejects_other_types(#[case] name: &str) {
        let err = check_invoice_upload(name, 10, TEN_MIB).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: Invalid file type. Allowed: .pdf, .xlsx, .xls, .jpg, .jpeg, .png"
        );
    }

    #[test]
    fn rejects_oversized_files() {
        let err = check_invoice_upload("big.pdf", TEN_MIB + 1, TEN_MIB).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: File size too large. Maximum size is 10MB"
        );
        assert!(check_invoice_upload("edge.pdf", TEN_MIB, TEN_MIB).is_ok());
    }
}
