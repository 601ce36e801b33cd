use chrono::{NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    models::{invoice, payment, purchase_order, vendor, InvoiceStatus, NotificationType, PaymentMethod},
    services::{
        amounts,
        invoice_pdf::{self, InvoiceDocument},
        notifications::{NewNotification, NotificationService},
        numbering,
        payment_gateway::{CreateOrderRequest, PaymentGateway},
        vendors::vendor_user_ids,
    },
};

/// Formats an amount with thousands separators and two decimals, e.g. `1,230.00`.
pub(crate) fn grouped_amount(amount: Decimal) -> String {
    let fixed = format!("{:.2}", amount.round_dp(2));
    let (sign, digits) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (whole, frac) = digits.split_once('.').unwrap_or((digits, "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{}{}.{}", sign, grouped, frac)
}

/// Amount in minor currency units (paise for INR).
fn minor_units(amount: Decimal) -> Option<i64> {
    (amount * Decimal::ONE_HUNDRED).round().to_i64()
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct InvoiceFilter {
    pub purchase_order: Option<Uuid>,
    pub status: Option<InvoiceStatus>,
    pub vendor: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PaymentFilter {
    pub invoice: Option<Uuid>,
    pub vendor: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInvoice {
    #[validate(length(min = 1, max = 50, message = "This field is required."))]
    pub invoice_number: String,
    pub vendor_id: Uuid,
    pub purchase_order_id: Option<Uuid>,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: Option<InvoiceStatus>,
    #[validate(custom = "amounts::amount")]
    pub subtotal: Option<Decimal>,
    #[validate(custom = "amounts::amount")]
    pub tax_amount: Option<Decimal>,
    #[validate(custom = "amounts::amount")]
    pub total_amount: Decimal,
    #[validate(custom = "amounts::amount")]
    pub paid_amount: Option<Decimal>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateInvoice {
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<InvoiceStatus>,
    #[validate(custom = "amounts::amount")]
    pub subtotal: Option<Decimal>,
    #[validate(custom = "amounts::amount")]
    pub tax_amount: Option<Decimal>,
    #[validate(custom = "amounts::amount")]
    pub total_amount: Option<Decimal>,
    #[validate(custom = "amounts::amount")]
    pub paid_amount: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePayment {
    pub invoice_id: Uuid,
    #[validate(custom = "amounts::positive_amount")]
    pub amount: Decimal,
    pub payment_date: Option<NaiveDate>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub transaction_reference: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct GatewayPaymentConfirmation {
    pub razorpay_payment_id: Option<String>,
    pub razorpay_order_id: Option<String>,
    pub razorpay_signature: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InvoiceView {
    #[serde(flatten)]
    pub invoice: invoice::Model,
    pub balance_due: Decimal,
    pub vendor_name: Option<String>,
    pub po_number: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GatewayCheckout {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub key_id: String,
    pub invoice_number: String,
    pub vendor_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecordedPayment {
    pub message: String,
    pub payment: payment::Model,
    pub invoice: InvoiceView,
}

pub struct InvoiceFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct BillingService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    notifications: NotificationService,
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
}

impl BillingService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        gateway: Arc<dyn PaymentGateway>,
        currency: String,
    ) -> Self {
        let notifications = NotificationService::new(db.clone());
        Self {
            db,
            event_sender,
            notifications,
            gateway,
            currency,
        }
    }

    pub(crate) async fn view<C: ConnectionTrait>(
        db: &C,
        inv: invoice::Model,
    ) -> Result<InvoiceView, ServiceError> {
        let vendor_name = vendor::Entity::find_by_id(inv.vendor_id)
            .one(db)
            .await?
            .map(|v| v.company_name);
        let po_number = match inv.purchase_order_id {
            Some(id) => purchase_order::Entity::find_by_id(id)
                .one(db)
                .await?
                .map(|po| po.po_number),
            None => None,
        };
        Ok(InvoiceView {
            balance_due: inv.balance_due(),
            invoice: inv,
            vendor_name,
            po_number,
        })
    }

    pub(crate) async fn views<C: ConnectionTrait>(
        db: &C,
        invoices: Vec<invoice::Model>,
    ) -> Result<Vec<InvoiceView>, ServiceError> {
        let mut out = Vec::with_capacity(invoices.len());
        for inv in invoices {
            out.push(Self::view(db, inv).await?);
        }
        Ok(out)
    }

    async fn load<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<invoice::Model, ServiceError> {
        invoice::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Invoice not found".to_string()))
    }

    /// Payment numbers are second-resolution timestamps; a clash within the
    /// same second gets a counter.
    async fn allocate_payment_number<C: ConnectionTrait>(db: &C) -> Result<String, ServiceError> {
        let base = numbering::payment_number(Utc::now());
        let mut candidate = base.clone();
        let mut n = 1;
        while payment::Entity::find()
            .filter(payment::Column::PaymentNumber.eq(candidate.as_str()))
            .count(db)
            .await?
            > 0
        {
            n += 1;
            candidate = format!("{}-{}", base, n);
        }
        Ok(candidate)
    }

    /// Inserts a payment and applies it to the invoice, settling the invoice
    /// once the paid amount reaches the total.
    async fn apply_payment<C: ConnectionTrait>(
        db: &C,
        inv: invoice::Model,
        record: payment::ActiveModel,
    ) -> Result<(payment::Model, invoice::Model), ServiceError> {
        let stored = record.insert(db).await?;
        let paid = inv.paid_amount + stored.amount;
        let settled = paid >= inv.total_amount;
        let mut active: invoice::ActiveModel = inv.into();
        active.paid_amount = Set(paid);
        if settled {
            active.status = Set(InvoiceStatus::Paid);
        }
        let updated = active.update(db).await?;
        Ok((stored, updated))
    }

    async fn announce_payment(&self, stored: &payment::Model, inv: &invoice::Model) {
        info!(
            payment_id = %stored.id,
            invoice_id = %inv.id,
            amount = %stored.amount,
            "payment recorded"
        );
        self.event_sender
            .publish(Event::PaymentRecorded {
                payment_id: stored.id,
                invoice_id: inv.id,
                amount: stored.amount,
            })
            .await;
        if inv.status == InvoiceStatus::Paid {
            self.event_sender.publish(Event::InvoicePaid(inv.id)).await;
        }
    }

    #[instrument(skip(self))]
    pub async fn list_invoices(&self, filter: InvoiceFilter) -> Result<Vec<InvoiceView>, ServiceError> {
        let mut query = invoice::Entity::find();
        if let Some(po) = filter.purchase_order {
            query = query.filter(invoice::Column::PurchaseOrderId.eq(po));
        }
        if let Some(status) = filter.status {
            query = query.filter(invoice::Column::Status.eq(status));
        }
        if let Some(vendor_id) = filter.vendor {
            query = query.filter(invoice::Column::VendorId.eq(vendor_id));
        }
        let rows = query
            .order_by_desc(invoice::Column::InvoiceDate)
            .all(&*self.db)
            .await?;
        Self::views(&*self.db, rows).await
    }

    pub async fn get_invoice(&self, id: Uuid) -> Result<InvoiceView, ServiceError> {
        let inv = Self::load(&*self.db, id).await?;
        Self::view(&*self.db, inv).await
    }

    #[instrument(skip(self, input), fields(invoice_number = %input.invoice_number))]
    pub async fn create_invoice(&self, input: CreateInvoice) -> Result<InvoiceView, ServiceError> {
        input.validate()?;
        if vendor::Entity::find_by_id(input.vendor_id)
            .one(&*self.db)
            .await?
            .is_none()
        {
            return Err(ServiceError::NotFound("Vendor not found".to_string()));
        }
        let taken = invoice::Entity::find()
            .filter(invoice::Column::InvoiceNumber.eq(input.invoice_number.as_str()))
            .count(&*self.db)
            .await?;
        if taken > 0 {
            return Err(ServiceError::bad_request_with(
                "invoice with this invoice number already exists.",
                json!({ "invoice_number": ["invoice with this invoice number already exists."] }),
            ));
        }

        let created = invoice::ActiveModel {
            invoice_number: Set(input.invoice_number),
            vendor_id: Set(input.vendor_id),
            purchase_order_id: Set(input.purchase_order_id),
            invoice_date: Set(input.invoice_date),
            due_date: Set(input.due_date),
            status: Set(input.status.unwrap_or(InvoiceStatus::Pending)),
            subtotal: Set(input.subtotal.unwrap_or_default()),
            tax_amount: Set(input.tax_amount.unwrap_or_default()),
            total_amount: Set(input.total_amount),
            paid_amount: Set(input.paid_amount.unwrap_or_default()),
            invoice_file: Set(None),
            uploaded_by: Set(None),
            upload_date: Set(None),
            notes: Set(input.notes),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(invoice_id = %created.id, "invoice created");
        self.event_sender
            .publish(Event::InvoiceCreated(created.id))
            .await;
        Self::view(&*self.db, created).await
    }

    #[instrument(skip(self, input))]
    pub async fn update_invoice(
        &self,
        id: Uuid,
        input: UpdateInvoice,
    ) -> Result<InvoiceView, ServiceError> {
        input.validate()?;
        let existing = Self::load(&*self.db, id).await?;
        let mut active: invoice::ActiveModel = existing.into();
        if let Some(v) = input.invoice_date {
            active.invoice_date = Set(v);
        }
        if let Some(v) = input.due_date {
            active.due_date = Set(v);
        }
        if let Some(v) = input.status {
            active.status = Set(v);
        }
        if let Some(v) = input.subtotal {
            active.subtotal = Set(v);
        }
        if let Some(v) = input.tax_amount {
            active.tax_amount = Set(v);
        }
        if let Some(v) = input.total_amount {
            active.total_amount = Set(v);
        }
        if let Some(v) = input.paid_amount {
            active.paid_amount = Set(v);
        }
        if let Some(v) = input.notes {
            active.notes = Set(v);
        }
        let updated = active.update(&*self.db).await?;
        Self::view(&*self.db, updated).await
    }

    #[instrument(skip(self))]
    pub async fn delete_invoice(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = Self::load(&*self.db, id).await?;
        let payments = payment::Entity::find()
            .filter(payment::Column::InvoiceId.eq(id))
            .count(&*self.db)
            .await?;
        if payments > 0 {
            return Err(ServiceError::InvalidOperation(
                "Invoice has recorded payments and cannot be deleted".to_string(),
            ));
        }
        invoice::Entity::delete_by_id(existing.id)
            .exec(&*self.db)
            .await?;
        info!(invoice_id = %id, "invoice deleted");
        Ok(())
    }

    /// Renders the invoice as a PDF document.
    #[instrument(skip(self))]
    pub async fn download(&self, id: Uuid) -> Result<InvoiceFile, ServiceError> {
        let inv = Self::load(&*self.db, id).await?;
        let supplier = vendor::Entity::find_by_id(inv.vendor_id).one(&*self.db).await?;
        let po_number = match inv.purchase_order_id {
            Some(po) => purchase_order::Entity::find_by_id(po)
                .one(&*self.db)
                .await?
                .map(|o| o.po_number),
            None => None,
        };

        let (vendor_name, vendor_address) = match supplier {
            Some(v) => {
                let address = vec![
                    v.address.clone(),
                    format!("{} {} {}", v.city, v.state, v.postal_code)
                        .trim()
                        .to_string(),
                    v.country.clone(),
                ];
                (v.company_name, address)
            }
            None => (String::new(), Vec::new()),
        };
        let doc = InvoiceDocument {
            invoice_number: inv.invoice_number.clone(),
            invoice_date: inv.invoice_date,
            due_date: inv.due_date,
            status: inv.status.to_string(),
            vendor_name,
            vendor_address,
            po_number,
            subtotal: inv.subtotal,
            tax_amount: inv.tax_amount,
            total_amount: inv.total_amount,
            paid_amount: inv.paid_amount,
            balance_due: inv.balance_due(),
            notes: inv.notes.clone(),
        };
        Ok(InvoiceFile {
            filename: doc.filename(),
            bytes: invoice_pdf::render(&doc)?,
        })
    }

    /// Opens a gateway order for the invoice's outstanding balance.
    #[instrument(skip(self))]
    pub async fn create_gateway_order(&self, id: Uuid) -> Result<GatewayCheckout, ServiceError> {
        let inv = Self::load(&*self.db, id).await?;
        if inv.status == InvoiceStatus::Paid {
            return Err(ServiceError::InvalidOperation(
                "Invoice is already paid".to_string(),
            ));
        }
        let amount = minor_units(inv.balance_due())
            .filter(|a| *a > 0)
            .ok_or_else(|| {
                ServiceError::InvalidOperation("Invoice has no balance due".to_string())
            })?;
        let vendor_name = vendor::Entity::find_by_id(inv.vendor_id)
            .one(&*self.db)
            .await?
            .map(|v| v.company_name)
            .unwrap_or_default();

        let order = self
            .gateway
            .create_order(CreateOrderRequest {
                amount,
                currency: self.currency.clone(),
                receipt: format!("invoice_{}", inv.invoice_number),
                payment_capture: 1,
            })
            .await?;

        info!(invoice_id = %id, order_id = %order.id, amount, "gateway order created");
        Ok(GatewayCheckout {
            order_id: order.id,
            amount,
            currency: self.currency.clone(),
            key_id: self.gateway.key_id().to_string(),
            invoice_number: inv.invoice_number,
            vendor_name,
        })
    }

    /// Verifies the checkout signature and records the gateway payment.
    #[instrument(skip(self, input))]
    pub async fn verify_gateway_payment(
        &self,
        id: Uuid,
        caller_id: Uuid,
        input: GatewayPaymentConfirmation,
    ) -> Result<RecordedPayment, ServiceError> {
        let (payment_id, order_id, signature) = match (
            input.razorpay_payment_id.filter(|s| !s.is_empty()),
            input.razorpay_order_id.filter(|s| !s.is_empty()),
            input.razorpay_signature.filter(|s| !s.is_empty()),
        ) {
            (Some(p), Some(o), Some(s)) => (p, o, s),
            _ => {
                return Err(ServiceError::ValidationError(
                    "Missing payment details".to_string(),
                ))
            }
        };
        if !self.gateway.verify_signature(&order_id, &payment_id, &signature) {
            warn!(invoice_id = %id, %order_id, "payment signature mismatch");
            return Err(ServiceError::ValidationError(
                "Invalid payment signature".to_string(),
            ));
        }

        let inv = Self::load(&*self.db, id).await?;
        if inv.status == InvoiceStatus::Paid {
            return Err(ServiceError::InvalidOperation(
                "Invoice is already paid".to_string(),
            ));
        }
        let amount = match self.gateway.fetch_payment(&payment_id).await {
            Ok(fetched) => Decimal::from(fetched.amount) / Decimal::ONE_HUNDRED,
            Err(e) => {
                warn!(%payment_id, error = %e, "payment fetch failed, using balance due");
                inv.balance_due()
            }
        };

        let txn = self.db.begin().await?;
        let inv = Self::load(&txn, id).await?;
        if inv.status == InvoiceStatus::Paid {
            return Err(ServiceError::InvalidOperation(
                "Invoice is already paid".to_string(),
            ));
        }
        let already_recorded = payment::Entity::find()
            .filter(payment::Column::GatewayPaymentId.eq(payment_id.as_str()))
            .one(&txn)
            .await?;
        if already_recorded.is_some() {
            warn!(invoice_id = %id, %payment_id, "gateway payment replayed");
            return Err(ServiceError::Conflict(
                "This payment has already been recorded".to_string(),
            ));
        }
        let record = payment::ActiveModel {
            payment_number: Set(Self::allocate_payment_number(&txn).await?),
            invoice_id: Set(inv.id),
            vendor_id: Set(inv.vendor_id),
            amount: Set(amount),
            payment_date: Set(Utc::now().date_naive()),
            payment_method: Set(PaymentMethod::Razorpay),
            gateway_order_id: Set(Some(order_id)),
            gateway_payment_id: Set(Some(payment_id.clone())),
            gateway_signature: Set(Some(signature)),
            transaction_reference: Set(payment_id),
            notes: Set("Razorpay online payment".to_string()),
            created_by: Set(Some(caller_id)),
            ..Default::default()
        };
        let (stored, updated) = Self::apply_payment(&txn, inv, record).await?;
        let recipients = vendor_user_ids(&txn, updated.vendor_id).await?;
        let view = Self::view(&txn, updated.clone()).await?;
        txn.commit().await?;

        self.announce_payment(&stored, &updated).await;
        let message = format!(
            "Payment of \u{20b9}{} received for Invoice {}",
            grouped_amount(stored.amount),
            updated.invoice_number
        );
        self.notifications
            .dispatch(
                recipients
                    .into_iter()
                    .map(|user_id| {
                        let n = NewNotification::new(user_id, NotificationType::General, message.clone());
                        match updated.purchase_order_id {
                            Some(po) => n.order(po),
                            None => n,
                        }
                    })
                    .collect(),
            )
            .await;

        Ok(RecordedPayment {
            message: "Payment verified and recorded successfully".to_string(),
            payment: stored,
            invoice: view,
        })
    }

    #[instrument(skip(self))]
    pub async fn list_payments(&self, filter: PaymentFilter) -> Result<Vec<payment::Model>, ServiceError> {
        let mut query = payment::Entity::find();
        if let Some(invoice_id) = filter.invoice {
            query = query.filter(payment::Column::InvoiceId.eq(invoice_id));
        }
        if let Some(vendor_id) = filter.vendor {
            query = query.filter(payment::Column::VendorId.eq(vendor_id));
        }
        Ok(query
            .order_by_desc(payment::Column::PaymentDate)
            .all(&*self.db)
            .await?)
    }

    pub async fn get_payment(&self, id: Uuid) -> Result<payment::Model, ServiceError> {
        payment::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Payment not found".to_string()))
    }

    /// Records an offline payment. The vendor is taken from the invoice.
    #[instrument(skip(self, input), fields(invoice_id = %input.invoice_id))]
    pub async fn create_payment(
        &self,
        caller_id: Uuid,
        input: CreatePayment,
    ) -> Result<payment::Model, ServiceError> {
        input.validate()?;
        let txn = self.db.begin().await?;
        let inv = Self::load(&txn, input.invoice_id).await?;
        let record = payment::ActiveModel {
            payment_number: Set(Self::allocate_payment_number(&txn).await?),
            invoice_id: Set(inv.id),
            vendor_id: Set(inv.vendor_id),
            amount: Set(input.amount),
            payment_date: Set(input.payment_date.unwrap_or_else(|| Utc::now().date_naive())),
            payment_method: Set(input.payment_method),
            gateway_order_id: Set(None),
            gateway_payment_id: Set(None),
            gateway_signature: Set(None),
            transaction_reference: Set(input.transaction_reference),
            notes: Set(input.notes),
            created_by: Set(Some(caller_id)),
            ..Default::default()
        };
        let (stored, updated) = Self::apply_payment(&txn, inv, record).await?;
        txn.commit().await?;

        self.announce_payment(&stored, &updated).await;
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(0), "0.00")]
    #[case(dec!(999.5), "999.50")]
    #[case(dec!(1230), "1,230.00")]
    #[case(dec!(1234567.891), "1,234,567.89")]
    #[case(dec!(-2500), "-2,500.00")]
    fn groups_thousands(#[case] amount: Decimal, #[case] expected: &str) {
        assert_eq!(grouped_amount(amount), expected);
    }

    #[test]
    fn minor_units_are_hundredths() {
        assert_eq!(minor_units(dec!(1230)), Some(123_000));
        assert_eq!(minor_units(dec!(10.005)), Some(1_000));
        assert_eq!(minor_units(dec!(0.01)), Some(1));
    }
}
