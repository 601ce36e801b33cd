use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        product, purchase_order, purchase_order_item, purchase_request, rfq, vendor_quotation,
        DeliveryStatus, NotificationType, PurchaseOrderStatus, PurchaseRequestStatus,
        QuotationStatus, RfqStatus,
    },
    services::{
        amounts,
        notifications::{NewNotification, NotificationService},
        numbering,
        ordering::allocate_po_number,
        vendors::vendor_user_ids,
    },
};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct RfqFilter {
    pub status: Option<RfqStatus>,
    pub vendor_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct QuotationFilter {
    pub status: Option<QuotationStatus>,
}

/// An RFQ together with the vendor's quotation, if one was submitted.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RfqDetail {
    #[serde(flatten)]
    pub rfq: rfq::Model,
    pub quotation: Option<vendor_quotation::Model>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateQuotation {
    pub rfq_id: Uuid,
    #[validate(custom = "amounts::price")]
    pub unit_price: Decimal,
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
    pub quantity: i32,
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

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateQuotation {
    #[validate(custom = "amounts::price")]
    pub unit_price: Option<Decimal>,
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
    pub estimated_delivery_days: Option<i32>,
    pub quotation_valid_until: Option<NaiveDate>,
    pub payment_terms: Option<String>,
    pub warranty_terms: Option<String>,
    pub additional_notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RejectQuotation {
    pub review_notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AcceptedQuotation {
    pub message: String,
    pub rfq: RfqDetail,
    pub po: purchase_order::Model,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RejectedQuotation {
    pub message: String,
    pub rfq: RfqDetail,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmittedQuotation {
    pub message: String,
    pub quotation: vendor_quotation::Model,
}

/// The date a quotation's delivery estimate lands on, counted from `from`.
pub(crate) fn expected_delivery_date(from: NaiveDate, days: i32) -> Result<NaiveDate, ServiceError> {
    if !(1..=amounts::MAX_DELIVERY_DAYS).contains(&days) {
        return Err(ServiceError::ValidationError(format!(
            "Delivery estimate must be between 1 and {} days.",
            amounts::MAX_DELIVERY_DAYS
        )));
    }
    from.checked_add_signed(Duration::days(i64::from(days)))
        .ok_or_else(|| {
            ServiceError::ValidationError("Expected delivery date is out of range".to_string())
        })
}

/// A quotation came back for `rfq`: the RFQ moves to received and its
/// request to quotation_received.
pub(crate) async fn mark_quotation_received<C: ConnectionTrait>(
    db: &C,
    rfq: rfq::Model,
) -> Result<(), ServiceError> {
    let request_id = rfq.purchase_request_id;
    let mut active: rfq::ActiveModel = rfq.into();
    active.status = Set(RfqStatus::Received);
    active.update(db).await?;

    if let Some(request) = purchase_request::Entity::find_by_id(request_id).one(db).await? {
        let mut active: purchase_request::ActiveModel = request.into();
        active.status = Set(PurchaseRequestStatus::QuotationReceived);
        active.update(db).await?;
    }
    Ok(())
}

#[derive(Clone)]
pub struct SourcingService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    notifications: NotificationService,
}

impl SourcingService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        let notifications = NotificationService::new(db.clone());
        Self {
            db,
            event_sender,
            notifications,
        }
    }

    async fn load_rfq<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<RfqDetail, ServiceError> {
        let (rfq, quotation) = rfq::Entity::find_by_id(id)
            .find_also_related(vendor_quotation::Entity)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("RFQ not found".to_string()))?;
        Ok(RfqDetail { rfq, quotation })
    }

    async fn load_quotation<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<vendor_quotation::Model, ServiceError> {
        vendor_quotation::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Quotation not found".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn list_rfqs(&self, filter: RfqFilter) -> Result<Vec<RfqDetail>, ServiceError> {
        let mut query = rfq::Entity::find();
        if let Some(status) = filter.status {
            query = query.filter(rfq::Column::Status.eq(status));
        }
        if let Some(vendor_id) = filter.vendor_id {
            query = query.filter(rfq::Column::VendorId.eq(vendor_id));
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

    pub async fn get_rfq(&self, id: Uuid) -> Result<RfqDetail, ServiceError> {
        Self::load_rfq(&*self.db, id).await
    }

    /// Accepts the RFQ's submitted quotation and raises the purchase order
    /// for it. A quotation can only be accepted once.
    #[instrument(skip(self))]
    pub async fn accept_quotation(
        &self,
        rfq_id: Uuid,
        reviewer_id: Uuid,
    ) -> Result<AcceptedQuotation, ServiceError> {
        let txn = self.db.begin().await?;
        let RfqDetail { rfq, quotation } = Self::load_rfq(&txn, rfq_id).await?;
        let quotation = quotation.ok_or_else(|| {
            ServiceError::InvalidOperation("No quotation submitted for this RFQ".to_string())
        })?;
        if quotation.status != QuotationStatus::Submitted {
            return Err(ServiceError::InvalidOperation(
                "Only submitted quotations can be accepted".to_string(),
            ));
        }

        let now = Utc::now();
        let mut active: vendor_quotation::ActiveModel = quotation.clone().into();
        active.status = Set(QuotationStatus::Accepted);
        active.reviewed_by = Set(Some(reviewer_id));
        active.reviewed_date = Set(Some(now));
        let quotation_model = active.update(&txn).await?;

        let mut active: rfq::ActiveModel = rfq.clone().into();
        active.status = Set(RfqStatus::Accepted);
        active.update(&txn).await?;

        let request = purchase_request::Entity::find_by_id(rfq.purchase_request_id)
            .one(&txn)
            .await?;
        let mut item_product = None;
        let mut product_name = "Unknown Product".to_string();
        if let Some(request) = &request {
            product_name = request.item_name.clone();
            if let Some(product_id) = request.product_id {
                if let Some(p) = product::Entity::find_by_id(product_id).one(&txn).await? {
                    product_name = p.name;
                    item_product = Some(p.id);
                }
            }
            let mut active: purchase_request::ActiveModel = request.clone().into();
            active.status = Set(PurchaseRequestStatus::Completed);
            active.update(&txn).await?;
        }

        let today = now.date_naive();
        let expected_delivery = expected_delivery_date(today, quotation.estimated_delivery_days)?;
        let po_number = allocate_po_number(&txn, today).await?;
        let po = purchase_order::ActiveModel {
            po_number: Set(po_number),
            vendor_id: Set(rfq.vendor_id),
            order_date: Set(today),
            expected_delivery_date: Set(Some(expected_delivery)),
            delivery_deadline: Set(None),
            actual_delivery_date: Set(None),
            status: Set(PurchaseOrderStatus::Approved),
            delivery_status: Set(DeliveryStatus::Pending),
            purchase_request_id: Set(request.as_ref().map(|r| r.id)),
            vendor_quotation_id: Set(Some(quotation.id)),
            created_by: Set(Some(reviewer_id)),
            assigned_to: Set(None),
            subtotal: Set(quotation.subtotal),
            tax_amount: Set(quotation.tax_amount),
            shipping_cost: Set(quotation.shipping_cost),
            total_amount: Set(quotation.total_amount),
            total_quantity: Set(quotation.quantity),
            shipment_date: Set(None),
            tracking_number: Set(String::new()),
            delivery_notes: Set(String::new()),
            delay_reason: Set(String::new()),
            last_status_update: Set(None),
            status_updated_by: Set(None),
            notes: Set(format!("Created from quotation {}", quotation.quotation_number)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        purchase_order_item::ActiveModel {
            purchase_order_id: Set(po.id),
            product_id: Set(item_product),
            product_name: Set(product_name),
            quantity: Set(quotation.quantity),
            unit_price: Set(quotation.unit_price),
            received_quantity: Set(0),
            notes: Set(String::new()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let recipients = vendor_user_ids(&txn, rfq.vendor_id).await?;
        let detail = Self::load_rfq(&txn, rfq_id).await?;
        txn.commit().await?;

        info!(rfq_id = %rfq_id, po_number = %po.po_number, "quotation accepted");
        self.event_sender
            .publish(Event::QuotationAccepted {
                quotation_id: quotation_model.id,
                purchase_order_id: po.id,
            })
            .await;
        self.event_sender
            .publish(Event::PurchaseOrderCreated(po.id))
            .await;
        self.notifications
            .dispatch(
                recipients
                    .into_iter()
                    .map(|user_id| {
                        NewNotification::new(
                            user_id,
                            NotificationType::General,
                            format!("Purchase Order {} created from your quotation", po.po_number),
                        )
                        .order(po.id)
                    })
                    .collect(),
            )
            .await;

        Ok(AcceptedQuotation {
            message: "Quotation accepted, Purchase Order created".to_string(),
            rfq: detail,
            po,
        })
    }

    #[instrument(skip(self, input))]
    pub async fn reject_quotation(
        &self,
        rfq_id: Uuid,
        reviewer_id: Uuid,
        input: RejectQuotation,
    ) -> Result<RejectedQuotation, ServiceError> {
        let review_notes = input
            .review_notes
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "No reason provided".to_string());

        let txn = self.db.begin().await?;
        let RfqDetail { rfq, quotation } = Self::load_rfq(&txn, rfq_id).await?;
        let quotation = quotation.ok_or_else(|| {
            ServiceError::InvalidOperation("No quotation submitted for this RFQ".to_string())
        })?;

        let mut active: rfq::ActiveModel = rfq.clone().into();
        active.status = Set(RfqStatus::Rejected);
        active.update(&txn).await?;

        let quotation_id = quotation.id;
        let mut active: vendor_quotation::ActiveModel = quotation.into();
        active.status = Set(QuotationStatus::Rejected);
        active.reviewed_by = Set(Some(reviewer_id));
        active.reviewed_date = Set(Some(Utc::now()));
        active.review_notes = Set(review_notes);
        active.update(&txn).await?;

        let recipients = vendor_user_ids(&txn, rfq.vendor_id).await?;
        let detail = Self::load_rfq(&txn, rfq_id).await?;
        txn.commit().await?;

        info!(rfq_id = %rfq_id, "quotation rejected");
        self.event_sender
            .publish(Event::QuotationRejected(quotation_id))
            .await;
        self.notifications
            .dispatch(
                recipients
                    .into_iter()
                    .map(|user_id| {
                        NewNotification::new(
                            user_id,
                            NotificationType::General,
                            format!("Your quotation for RFQ {} has been rejected", rfq.rfq_number),
                        )
                        .rfq(rfq.id)
                    })
                    .collect(),
            )
            .await;

        Ok(RejectedQuotation {
            message: "Quotation rejected".to_string(),
            rfq: detail,
        })
    }

    #[instrument(skip(self))]
    pub async fn list_quotations(
        &self,
        filter: QuotationFilter,
    ) -> Result<Vec<vendor_quotation::Model>, ServiceError> {
        let mut query = vendor_quotation::Entity::find();
        if let Some(status) = filter.status {
            query = query.filter(vendor_quotation::Column::Status.eq(status));
        }
        Ok(query
            .order_by_desc(vendor_quotation::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    pub async fn get_quotation(&self, id: Uuid) -> Result<vendor_quotation::Model, ServiceError> {
        Self::load_quotation(&*self.db, id).await
    }

    /// Creates a draft quotation for an RFQ.
    #[instrument(skip(self, input), fields(rfq_id = %input.rfq_id))]
    pub async fn create_quotation(
        &self,
        input: CreateQuotation,
    ) -> Result<vendor_quotation::Model, ServiceError> {
        input.validate()?;
        let detail = Self::load_rfq(&*self.db, input.rfq_id).await?;
        if detail.quotation.is_some() {
            return Err(ServiceError::InvalidOperation(
                "Quotation already exists for this RFQ".to_string(),
            ));
        }

        let created = vendor_quotation::ActiveModel {
            rfq_id: Set(input.rfq_id),
            quotation_number: Set(numbering::quotation_number(Utc::now())),
            unit_price: Set(input.unit_price),
            quantity: Set(input.quantity),
            tax_rate: Set(input.tax_rate.unwrap_or_default()),
            shipping_cost: Set(input.shipping_cost.unwrap_or_default()),
            estimated_delivery_days: Set(input.estimated_delivery_days),
            quotation_valid_until: Set(input.quotation_valid_until),
            payment_terms: Set(input.payment_terms.unwrap_or_else(|| "Net 30".to_string())),
            warranty_terms: Set(input.warranty_terms),
            additional_notes: Set(input.additional_notes),
            status: Set(QuotationStatus::Draft),
            reviewed_by: Set(None),
            reviewed_date: Set(None),
            review_notes: Set(String::new()),
            submitted_date: Set(None),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(quotation_id = %created.id, total = %created.total_amount, "quotation drafted");
        Ok(created)
    }

    /// Updates quotation inputs; derived totals are recomputed on save.
    #[instrument(skip(self, input))]
    pub async fn update_quotation(
        &self,
        id: Uuid,
        input: UpdateQuotation,
    ) -> Result<vendor_quotation::Model, ServiceError> {
        input.validate()?;
        let existing = Self::load_quotation(&*self.db, id).await?;
        if matches!(
            existing.status,
            QuotationStatus::Accepted | QuotationStatus::Rejected
        ) {
            return Err(ServiceError::InvalidOperation(format!(
                "Cannot modify a {} quotation",
                existing.status
            )));
        }

        let mut active: vendor_quotation::ActiveModel = existing.into();
        if let Some(v) = input.unit_price {
            active.unit_price = Set(v);
        }
        if let Some(v) = input.quantity {
            active.quantity = Set(v);
        }
        if let Some(v) = input.tax_rate {
            active.tax_rate = Set(v);
        }
        if let Some(v) = input.shipping_cost {
            active.shipping_cost = Set(v);
        }
        if let Some(v) = input.estimated_delivery_days {
            active.estimated_delivery_days = Set(v);
        }
        if let Some(v) = input.quotation_valid_until {
            active.quotation_valid_until = Set(v);
        }
        if let Some(v) = input.payment_terms {
            active.payment_terms = Set(v);
        }
        if let Some(v) = input.warranty_terms {
            active.warranty_terms = Set(v);
        }
        if let Some(v) = input.additional_notes {
            active.additional_notes = Set(v);
        }
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn submit_quotation(&self, id: Uuid) -> Result<SubmittedQuotation, ServiceError> {
        let txn = self.db.begin().await?;
        let existing = Self::load_quotation(&txn, id).await?;
        if existing.status != QuotationStatus::Draft {
            return Err(ServiceError::InvalidOperation(
                "Only draft quotations can be submitted".to_string(),
            ));
        }

        let rfq_id = existing.rfq_id;
        let mut active: vendor_quotation::ActiveModel = existing.into();
        active.status = Set(QuotationStatus::Submitted);
        active.submitted_date = Set(Some(Utc::now()));
        let submitted = active.update(&txn).await?;

        if let Some(rfq) = rfq::Entity::find_by_id(rfq_id).one(&txn).await? {
            mark_quotation_received(&txn, rfq).await?;
        }
        txn.commit().await?;

        info!(quotation_id = %id, "quotation submitted");
        self.event_sender
            .publish(Event::QuotationSubmitted(id))
            .await;
        Ok(SubmittedQuotation {
            message: "Quotation submitted successfully".to_string(),
            quotation: submitted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn delivery_estimate_is_added_to_the_acceptance_date() {
        let from = NaiveDate::from_ymd_opt(2030, 1, 28).unwrap();
        assert_eq!(
            expected_delivery_date(from, 5).unwrap(),
            NaiveDate::from_ymd_opt(2030, 2, 2).unwrap()
        );
    }

    #[test]
    fn out_of_range_estimates_are_validation_errors() {
        let from = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        assert_matches!(
            expected_delivery_date(from, 2_000_000_000),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(expected_delivery_date(from, 0), Err(ServiceError::ValidationError(_)));
        assert_matches!(
            expected_delivery_date(NaiveDate::MAX, 1),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn quotation_input_bounds_money_and_days() {
        let input = CreateQuotation {
            rfq_id: Uuid::new_v4(),
            unit_price: Decimal::MAX,
            quantity: 10,
            tax_rate: None,
            shipping_cost: None,
            estimated_delivery_days: 2_000_000_000,
            quotation_valid_until: NaiveDate::from_ymd_opt(2031, 1, 1).unwrap(),
            payment_terms: None,
            warranty_terms: String::new(),
            additional_notes: String::new(),
        };
        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("unit_price"));
        assert!(fields.contains_key("estimated_delivery_days"));
    }
}
