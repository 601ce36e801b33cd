use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
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
        goods_receipt, product, purchase_order, purchase_order_item, vendor, DeliveryStatus,
        NotificationType, PurchaseOrderStatus,
    },
    services::{
        amounts,
        notifications::{NewNotification, NotificationService},
        numbering,
        vendors::vendor_user_ids,
    },
};

/// Next purchase order number, continuing the sequence of the highest
/// stored number.
pub(crate) async fn allocate_po_number<C: ConnectionTrait>(
    db: &C,
    today: NaiveDate,
) -> Result<String, DbErr> {
    let highest: Option<String> = purchase_order::Entity::find()
        .select_only()
        .column(purchase_order::Column::PoNumber)
        .filter(purchase_order::Column::PoNumber.starts_with(numbering::PO_NUMBER_PREFIX))
        .order_by_desc(purchase_order::Column::PoNumber)
        .into_tuple()
        .one(db)
        .await?;
    Ok(numbering::next_po_number(today, highest.as_deref()))
}

/// Recomputes an order's subtotal and quantity from its lines. The order
/// total follows on save.
pub(crate) async fn recompute_order_totals<C: ConnectionTrait>(
    db: &C,
    purchase_order_id: Uuid,
) -> Result<purchase_order::Model, ServiceError> {
    let order = purchase_order::Entity::find_by_id(purchase_order_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Purchase order not found".to_string()))?;
    let items = purchase_order_item::Entity::find()
        .filter(purchase_order_item::Column::PurchaseOrderId.eq(purchase_order_id))
        .all(db)
        .await?;

    let (subtotal, quantity) = sum_lines(&items)?;
    let mut active: purchase_order::ActiveModel = order.into();
    active.subtotal = Set(subtotal);
    active.total_quantity = Set(quantity);
    Ok(active.update(db).await?)
}

fn sum_lines(items: &[purchase_order_item::Model]) -> Result<(Decimal, i32), ServiceError> {
    let subtotal = items
        .iter()
        .try_fold(Decimal::ZERO, |acc, i| acc.checked_add(i.line_total))
        .ok_or_else(|| ServiceError::ValidationError("Order subtotal is too large".to_string()))?;
    let quantity = items
        .iter()
        .try_fold(0i32, |acc, i| acc.checked_add(i.quantity))
        .ok_or_else(|| ServiceError::ValidationError("Order quantity is too large".to_string()))?;
    Ok((subtotal, quantity))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PurchaseOrderFilter {
    pub status: Option<PurchaseOrderStatus>,
    pub delivery_status: Option<DeliveryStatus>,
    pub vendor_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct OrderItemFilter {
    pub purchase_order: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct NewOrderLine {
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub product_name: String,
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
    pub quantity: i32,
    #[validate(custom = "amounts::price")]
    pub unit_price: Decimal,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseOrder {
    /// Generated when blank.
    pub po_number: Option<String>,
    pub vendor_id: Uuid,
    pub order_date: Option<NaiveDate>,
    pub expected_delivery_date: Option<NaiveDate>,
    pub delivery_deadline: Option<NaiveDate>,
    pub status: Option<PurchaseOrderStatus>,
    pub purchase_request_id: Option<Uuid>,
    pub vendor_quotation_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    #[validate(custom = "amounts::amount")]
    pub tax_amount: Option<Decimal>,
    #[validate(custom = "amounts::price")]
    pub shipping_cost: Option<Decimal>,
    #[serde(default)]
    pub notes: String,
    #[validate]
    #[serde(default)]
    pub items: Vec<NewOrderLine>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdatePurchaseOrder {
    pub vendor_id: Option<Uuid>,
    pub order_date: Option<NaiveDate>,
    pub expected_delivery_date: Option<NaiveDate>,
    pub delivery_deadline: Option<NaiveDate>,
    pub actual_delivery_date: Option<NaiveDate>,
    pub status: Option<PurchaseOrderStatus>,
    pub delivery_status: Option<DeliveryStatus>,
    pub assigned_to: Option<Uuid>,
    #[validate(custom = "amounts::amount")]
    pub tax_amount: Option<Decimal>,
    #[validate(custom = "amounts::price")]
    pub shipping_cost: Option<Decimal>,
    pub shipment_date: Option<NaiveDate>,
    pub tracking_number: Option<String>,
    pub delivery_notes: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrderItem {
    pub purchase_order_id: Uuid,
    #[validate]
    #[serde(flatten)]
    pub line: NewOrderLine,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderItem {
    pub product_id: Option<Uuid>,
    pub product_name: Option<String>,
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
    pub quantity: Option<i32>,
    #[validate(custom = "amounts::price")]
    pub unit_price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub received_quantity: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct StatusUpdate {
    pub status: Option<String>,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PurchaseOrderDetail {
    #[serde(flatten)]
    pub order: purchase_order::Model,
    pub vendor_name: Option<String>,
    pub items: Vec<purchase_order_item::Model>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusUpdated {
    pub message: String,
    pub purchase_order: PurchaseOrderDetail,
}

fn invalid_status() -> ServiceError {
    let allowed: Vec<String> = PurchaseOrderStatus::ASSIGNABLE
        .iter()
        .map(ToString::to_string)
        .collect();
    ServiceError::ValidationError(format!(
        "Invalid status. Must be one of: {}",
        allowed.join(", ")
    ))
}

fn parse_assignable(raw: Option<&str>) -> Result<PurchaseOrderStatus, ServiceError> {
    raw.and_then(|s| PurchaseOrderStatus::from_str(s).ok())
        .filter(|s| PurchaseOrderStatus::ASSIGNABLE.contains(s))
        .ok_or_else(invalid_status)
}

#[derive(Clone)]
pub struct OrderingService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    notifications: NotificationService,
}

impl OrderingService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        let notifications = NotificationService::new(db.clone());
        Self {
            db,
            event_sender,
            notifications,
        }
    }

    async fn load<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<purchase_order::Model, ServiceError> {
        purchase_order::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Purchase order not found".to_string()))
    }

    pub(crate) async fn detail<C: ConnectionTrait>(
        db: &C,
        order: purchase_order::Model,
    ) -> Result<PurchaseOrderDetail, ServiceError> {
        let vendor_name = vendor::Entity::find_by_id(order.vendor_id)
            .one(db)
            .await?
            .map(|v| v.company_name);
        let items = purchase_order_item::Entity::find()
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(order.id))
            .order_by_asc(purchase_order_item::Column::CreatedAt)
            .all(db)
            .await?;
        Ok(PurchaseOrderDetail {
            order,
            vendor_name,
            items,
        })
    }

    pub(crate) async fn details<C: ConnectionTrait>(
        db: &C,
        orders: Vec<purchase_order::Model>,
    ) -> Result<Vec<PurchaseOrderDetail>, ServiceError> {
        let mut out = Vec::with_capacity(orders.len());
        for order in orders {
            out.push(Self::detail(db, order).await?);
        }
        Ok(out)
    }

    async fn line_name<C: ConnectionTrait>(
        db: &C,
        product_id: Option<Uuid>,
        given: String,
    ) -> Result<String, ServiceError> {
        if !given.trim().is_empty() {
            return Ok(given);
        }
        match product_id {
            Some(id) => Ok(product::Entity::find_by_id(id)
                .one(db)
                .await?
                .map(|p| p.name)
                .unwrap_or_default()),
            None => Ok(given),
        }
    }

    async fn insert_line<C: ConnectionTrait>(
        db: &C,
        purchase_order_id: Uuid,
        line: NewOrderLine,
    ) -> Result<purchase_order_item::Model, ServiceError> {
        let product_name = Self::line_name(db, line.product_id, line.product_name).await?;
        Ok(purchase_order_item::ActiveModel {
            purchase_order_id: Set(purchase_order_id),
            product_id: Set(line.product_id),
            product_name: Set(product_name),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            received_quantity: Set(0),
            notes: Set(line.notes),
            ..Default::default()
        }
        .insert(db)
        .await?)
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: PurchaseOrderFilter,
    ) -> Result<Vec<PurchaseOrderDetail>, ServiceError> {
        let mut query = purchase_order::Entity::find();
        if let Some(status) = filter.status {
            query = query.filter(purchase_order::Column::Status.eq(status));
        }
        if let Some(delivery) = filter.delivery_status {
            query = query.filter(purchase_order::Column::DeliveryStatus.eq(delivery));
        }
        if let Some(vendor_id) = filter.vendor_id {
            query = query.filter(purchase_order::Column::VendorId.eq(vendor_id));
        }
        let orders = query
            .order_by_desc(purchase_order::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Self::details(&*self.db, orders).await
    }

    /// Orders assigned to the caller.
    pub async fn assigned(&self, caller: &AuthUser) -> Result<Vec<PurchaseOrderDetail>, ServiceError> {
        let orders = purchase_order::Entity::find()
            .filter(purchase_order::Column::AssignedTo.eq(caller.user_id))
            .order_by_desc(purchase_order::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Self::details(&*self.db, orders).await
    }

    pub async fn get(&self, id: Uuid) -> Result<PurchaseOrderDetail, ServiceError> {
        let order = Self::load(&*self.db, id).await?;
        Self::detail(&*self.db, order).await
    }

    #[instrument(skip(self, caller, input), fields(vendor_id = %input.vendor_id))]
    pub async fn create(
        &self,
        caller: &AuthUser,
        input: CreatePurchaseOrder,
    ) -> Result<PurchaseOrderDetail, ServiceError> {
        input.validate()?;
        if vendor::Entity::find_by_id(input.vendor_id)
            .one(&*self.db)
            .await?
            .is_none()
        {
            return Err(ServiceError::NotFound("Vendor not found".to_string()));
        }

        let txn = self.db.begin().await?;
        let today = Utc::now().date_naive();
        let po_number = match input.po_number.filter(|n| !n.trim().is_empty()) {
            Some(number) => {
                let taken = purchase_order::Entity::find()
                    .filter(purchase_order::Column::PoNumber.eq(number.as_str()))
                    .count(&txn)
                    .await?;
                if taken > 0 {
                    return Err(ServiceError::bad_request_with(
                        "purchase order with this po number already exists.",
                        serde_json::json!({
                            "po_number": ["purchase order with this po number already exists."]
                        }),
                    ));
                }
                number
            }
            None => allocate_po_number(&txn, today).await?,
        };

        let order = purchase_order::ActiveModel {
            po_number: Set(po_number),
            vendor_id: Set(input.vendor_id),
            order_date: Set(input.order_date.unwrap_or(today)),
            expected_delivery_date: Set(input.expected_delivery_date),
            delivery_deadline: Set(input.delivery_deadline),
            actual_delivery_date: Set(None),
            status: Set(input.status.unwrap_or(PurchaseOrderStatus::Draft)),
            delivery_status: Set(DeliveryStatus::Pending),
            purchase_request_id: Set(input.purchase_request_id),
            vendor_quotation_id: Set(input.vendor_quotation_id),
            created_by: Set(Some(caller.user_id)),
            assigned_to: Set(input.assigned_to),
            subtotal: Set(Decimal::ZERO),
            tax_amount: Set(input.tax_amount.unwrap_or_default()),
            shipping_cost: Set(input.shipping_cost.unwrap_or_default()),
            total_quantity: Set(0),
            shipment_date: Set(None),
            tracking_number: Set(String::new()),
            delivery_notes: Set(String::new()),
            delay_reason: Set(String::new()),
            last_status_update: Set(None),
            status_updated_by: Set(None),
            notes: Set(input.notes),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let has_lines = !input.items.is_empty();
        for line in input.items {
            Self::insert_line(&txn, order.id, line).await?;
        }
        let order = if has_lines {
            recompute_order_totals(&txn, order.id).await?
        } else {
            order
        };
        let detail = Self::detail(&txn, order).await?;
        txn.commit().await?;

        info!(po_id = %detail.order.id, po_number = %detail.order.po_number, "purchase order created");
        self.event_sender
            .publish(Event::PurchaseOrderCreated(detail.order.id))
            .await;
        Ok(detail)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdatePurchaseOrder,
    ) -> Result<PurchaseOrderDetail, ServiceError> {
        input.validate()?;
        let existing = Self::load(&*self.db, id).await?;
        let mut active: purchase_order::ActiveModel = existing.into();
        if let Some(v) = input.vendor_id {
            active.vendor_id = Set(v);
        }
        if let Some(v) = input.order_date {
            active.order_date = Set(v);
        }
        if input.expected_delivery_date.is_some() {
            active.expected_delivery_date = Set(input.expected_delivery_date);
        }
        if input.delivery_deadline.is_some() {
            active.delivery_deadline = Set(input.delivery_deadline);
        }
        if input.actual_delivery_date.is_some() {
            active.actual_delivery_date = Set(input.actual_delivery_date);
        }
        if let Some(v) = input.status {
            active.status = Set(v);
        }
        if let Some(v) = input.delivery_status {
            active.delivery_status = Set(v);
        }
        if input.assigned_to.is_some() {
            active.assigned_to = Set(input.assigned_to);
        }
        if let Some(v) = input.tax_amount {
            active.tax_amount = Set(v);
        }
        if let Some(v) = input.shipping_cost {
            active.shipping_cost = Set(v);
        }
        if input.shipment_date.is_some() {
            active.shipment_date = Set(input.shipment_date);
        }
        if let Some(v) = input.tracking_number {
            active.tracking_number = Set(v);
        }
        if let Some(v) = input.delivery_notes {
            active.delivery_notes = Set(v);
        }
        if let Some(v) = input.notes {
            active.notes = Set(v);
        }
        let updated = active.update(&*self.db).await?;
        Self::detail(&*self.db, updated).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = Self::load(&*self.db, id).await?;
        let receipts = goods_receipt::Entity::find()
            .filter(goods_receipt::Column::PurchaseOrderId.eq(id))
            .count(&*self.db)
            .await?;
        if receipts > 0 {
            return Err(ServiceError::InvalidOperation(
                "Purchase order has goods receipts and cannot be deleted".to_string(),
            ));
        }
        purchase_order::Entity::delete_by_id(existing.id)
            .exec(&*self.db)
            .await?;
        info!(po_id = %id, "purchase order deleted");
        Ok(())
    }

    /// Sets an assignable status. Only administrators and the assignee may
    /// call this.
    #[instrument(skip(self, caller, input), fields(user_id = %caller.user_id))]
    pub async fn update_status(
        &self,
        caller: &AuthUser,
        id: Uuid,
        input: StatusUpdate,
    ) -> Result<StatusUpdated, ServiceError> {
        let existing = Self::load(&*self.db, id).await?;
        if !caller.is_admin() && existing.assigned_to != Some(caller.user_id) {
            return Err(ServiceError::Forbidden(
                "You are not assigned to this purchase order".to_string(),
            ));
        }
        let new_status = parse_assignable(input.status.as_deref())?;

        let old_status = existing.status;
        let mut active: purchase_order::ActiveModel = existing.into();
        active.status = Set(new_status);
        if new_status == PurchaseOrderStatus::Delayed {
            active.delay_reason = Set(input.reason);
        }
        active.last_status_update = Set(Some(Utc::now()));
        active.status_updated_by = Set(Some(caller.user_id));
        let updated = active.update(&*self.db).await?;

        info!(po_id = %id, from = %old_status, to = %new_status, "purchase order status updated");
        self.event_sender
            .publish(Event::PurchaseOrderStatusChanged {
                purchase_order_id: id,
                old_status: old_status.to_string(),
                new_status: new_status.to_string(),
            })
            .await;

        if matches!(
            new_status,
            PurchaseOrderStatus::Received | PurchaseOrderStatus::Delivered
        ) {
            let recipients = vendor_user_ids(&*self.db, updated.vendor_id).await?;
            self.notifications
                .dispatch(
                    recipients
                        .into_iter()
                        .map(|user_id| {
                            NewNotification::new(
                                user_id,
                                NotificationType::General,
                                format!(
                                    "Purchase Order {} status updated to {}",
                                    updated.po_number, new_status
                                ),
                            )
                            .order(id)
                        })
                        .collect(),
                )
                .await;
        }

        Ok(StatusUpdated {
            message: format!("Status updated to {}", new_status),
            purchase_order: Self::detail(&*self.db, updated).await?,
        })
    }

    #[instrument(skip(self))]
    pub async fn list_items(
        &self,
        filter: OrderItemFilter,
    ) -> Result<Vec<purchase_order_item::Model>, ServiceError> {
        let mut query = purchase_order_item::Entity::find();
        if let Some(po) = filter.purchase_order {
            query = query.filter(purchase_order_item::Column::PurchaseOrderId.eq(po));
        }
        Ok(query
            .order_by_asc(purchase_order_item::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    pub async fn get_item(&self, id: Uuid) -> Result<purchase_order_item::Model, ServiceError> {
        purchase_order_item::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Purchase order item not found".to_string()))
    }

    #[instrument(skip(self, input), fields(po_id = %input.purchase_order_id))]
    pub async fn create_item(
        &self,
        input: CreateOrderItem,
    ) -> Result<purchase_order_item::Model, ServiceError> {
        input.validate()?;
        let txn = self.db.begin().await?;
        Self::load(&txn, input.purchase_order_id).await?;
        let item = Self::insert_line(&txn, input.purchase_order_id, input.line).await?;
        recompute_order_totals(&txn, item.purchase_order_id).await?;
        txn.commit().await?;
        Ok(item)
    }

    #[instrument(skip(self, input))]
    pub async fn update_item(
        &self,
        id: Uuid,
        input: UpdateOrderItem,
    ) -> Result<purchase_order_item::Model, ServiceError> {
        input.validate()?;
        let txn = self.db.begin().await?;
        let existing = purchase_order_item::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Purchase order item not found".to_string()))?;

        let product_id = input.product_id.or(existing.product_id);
        let mut active: purchase_order_item::ActiveModel = existing.into();
        if input.product_id.is_some() {
            active.product_id = Set(input.product_id);
        }
        if let Some(name) = input.product_name {
            active.product_name = Set(Self::line_name(&txn, product_id, name).await?);
        }
        if let Some(v) = input.quantity {
            active.quantity = Set(v);
        }
        if let Some(v) = input.unit_price {
            active.unit_price = Set(v);
        }
        if let Some(v) = input.received_quantity {
            active.received_quantity = Set(v);
        }
        if let Some(v) = input.notes {
            active.notes = Set(v);
        }
        let item = active.update(&txn).await?;
        recompute_order_totals(&txn, item.purchase_order_id).await?;
        txn.commit().await?;
        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn delete_item(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        let existing = purchase_order_item::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Purchase order item not found".to_string()))?;
        purchase_order_item::Entity::delete_by_id(id).exec(&txn).await?;
        recompute_order_totals(&txn, existing.purchase_order_id).await?;
        txn.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("pending", PurchaseOrderStatus::Pending)]
    #[case("in_progress", PurchaseOrderStatus::InProgress)]
    #[case("received", PurchaseOrderStatus::Received)]
    #[case("delivered", PurchaseOrderStatus::Delivered)]
    #[case("delayed", PurchaseOrderStatus::Delayed)]
    fn assignable_statuses_parse(#[case] raw: &str, #[case] expected: PurchaseOrderStatus) {
        assert_eq!(parse_assignable(Some(raw)).unwrap(), expected);
    }

    #[rstest]
    #[case(None)]
    #[case(Some("approved"))]
    #[case(Some("cancelled"))]
    #[case(Some("shipped"))]
    fn other_statuses_are_refused(#[case] raw: Option<&str>) {
        let err = parse_assignable(raw).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: Invalid status. Must be one of: pending, in_progress, received, delivered, delayed"
        );
    }

    fn line(quantity: i32, line_total: Decimal) -> purchase_order_item::Model {
        purchase_order_item::Model {
            id: Uuid::new_v4(),
            purchase_order_id: Uuid::nil(),
            product_id: None,
            product_name: "Gloves".into(),
            quantity,
            unit_price: Decimal::ONE,
            line_total,
            received_quantity: 0,
            notes: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn lines_are_summed() {
        let items = [line(10, Decimal::new(100000, 2)), line(2, Decimal::new(5050, 2))];
        let (subtotal, quantity) = sum_lines(&items).unwrap();
        assert_eq!(subtotal, Decimal::new(105050, 2));
        assert_eq!(quantity, 12);
        assert_eq!(sum_lines(&[]).unwrap(), (Decimal::ZERO, 0));
    }

    #[test]
    fn oversized_quantities_are_refused() {
        let items = [line(i32::MAX, Decimal::ONE), line(1, Decimal::ONE)];
        let err = sum_lines(&items).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Order quantity is too large");
    }

    #[test]
    fn oversized_subtotals_are_refused() {
        let items = [line(1, Decimal::MAX), line(1, Decimal::MAX)];
        let err = sum_lines(&items).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Order subtotal is too large");
    }
}
