use sea_orm::sea_query::Expr;
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
        goods_receipt, goods_receipt_item, product, purchase_order, purchase_order_item, user,
        vendor, PurchaseOrderStatus, ReceiptCondition,
    },
};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct GoodsReceiptFilter {
    pub purchase_order: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ReceiptItemFilter {
    pub goods_receipt: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReceiptInput {
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub delivered_quantity: i32,
    pub condition: Option<ReceiptCondition>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateGoodsReceipt {
    pub purchase_order_id: Uuid,
    #[validate]
    #[serde(flatten)]
    pub receipt: ReceiptInput,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReceiptItem {
    pub goods_receipt_id: Uuid,
    pub purchase_order_item_id: Uuid,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub quantity_received: i32,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub quantity_accepted: i32,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    #[serde(default)]
    pub quantity_rejected: i32,
    #[serde(default)]
    pub rejection_reason: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GoodsReceiptView {
    #[serde(flatten)]
    pub receipt: goods_receipt::Model,
    pub purchase_order_number: Option<String>,
    pub vendor_name: Option<String>,
    pub received_by_name: String,
}

/// Adds `quantity` to a product's stock counter in place.
async fn increment_stock<C: ConnectionTrait>(
    db: &C,
    product_id: Uuid,
    quantity: i32,
) -> Result<(), ServiceError> {
    product::Entity::update_many()
        .col_expr(
            product::Column::CurrentStock,
            Expr::col(product::Column::CurrentStock).add(quantity),
        )
        .filter(product::Column::Id.eq(product_id))
        .exec(db)
        .await?;
    Ok(())
}

#[derive(Clone)]
pub struct ReceivingService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ReceivingService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    async fn view<C: ConnectionTrait>(
        db: &C,
        receipt: goods_receipt::Model,
    ) -> Result<GoodsReceiptView, ServiceError> {
        let order = purchase_order::Entity::find_by_id(receipt.purchase_order_id)
            .one(db)
            .await?;
        let vendor_name = match &order {
            Some(o) => vendor::Entity::find_by_id(o.vendor_id)
                .one(db)
                .await?
                .map(|v| v.company_name),
            None => None,
        };
        let received_by_name = match receipt.received_by {
            Some(id) => user::Entity::find_by_id(id)
                .one(db)
                .await?
                .map(|u| {
                    let full = u.full_name();
                    if full.is_empty() {
                        u.username
                    } else {
                        full
                    }
                })
                .unwrap_or_else(|| "\u{2014}".to_string()),
            None => "\u{2014}".to_string(),
        };
        Ok(GoodsReceiptView {
            receipt,
            purchase_order_number: order.map(|o| o.po_number),
            vendor_name,
            received_by_name,
        })
    }

    async fn insert_receipt<C: ConnectionTrait>(
        db: &C,
        purchase_order_id: Uuid,
        received_by: Uuid,
        input: ReceiptInput,
    ) -> Result<goods_receipt::Model, ServiceError> {
        Ok(goods_receipt::ActiveModel {
            purchase_order_id: Set(purchase_order_id),
            delivered_quantity: Set(input.delivered_quantity),
            condition: Set(input.condition.unwrap_or(ReceiptCondition::Good)),
            notes: Set(input.notes),
            received_by: Set(Some(received_by)),
            ..Default::default()
        }
        .insert(db)
        .await?)
    }

    async fn load_order<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<purchase_order::Model, ServiceError> {
        purchase_order::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Purchase order not found".to_string()))
    }

    /// Records a delivery against an order from the order's goods-receipt
    /// action. A delivery in good condition marks the order received; stock is
    /// left to the receipt items.
    #[instrument(skip(self, input))]
    pub async fn receive_for_order(
        &self,
        purchase_order_id: Uuid,
        received_by: Uuid,
        input: ReceiptInput,
    ) -> Result<GoodsReceiptView, ServiceError> {
        input.validate()?;
        let txn = self.db.begin().await?;
        let order = Self::load_order(&txn, purchase_order_id).await?;
        let receipt = Self::insert_receipt(&txn, order.id, received_by, input).await?;

        if receipt.condition == ReceiptCondition::Good {
            let mut active: purchase_order::ActiveModel = order.into();
            active.status = Set(PurchaseOrderStatus::Received);
            active.update(&txn).await?;
        }
        let view = Self::view(&txn, receipt).await?;
        txn.commit().await?;

        self.announce(&view.receipt).await;
        Ok(view)
    }

    /// Creates a goods receipt. Good and partial deliveries add the delivered
    /// quantity to the stock of every product on the order; a good delivery
    /// also closes the order as delivered.
    #[instrument(skip(self, input), fields(po_id = %input.purchase_order_id))]
    pub async fn create(
        &self,
        received_by: Uuid,
        input: CreateGoodsReceipt,
    ) -> Result<GoodsReceiptView, ServiceError> {
        input.validate()?;
        let txn = self.db.begin().await?;
        let order = Self::load_order(&txn, input.purchase_order_id).await?;
        let receipt = Self::insert_receipt(&txn, order.id, received_by, input.receipt).await?;

        let mut stocked = Vec::new();
        if receipt.condition.adds_stock() {
            let items = purchase_order_item::Entity::find()
                .filter(purchase_order_item::Column::PurchaseOrderId.eq(order.id))
                .all(&txn)
                .await?;
            for product_id in items.iter().filter_map(|i| i.product_id) {
                increment_stock(&txn, product_id, receipt.delivered_quantity).await?;
                stocked.push(product_id);
            }

            if receipt.condition == ReceiptCondition::Good {
                let mut active: purchase_order::ActiveModel = order.into();
                active.status = Set(PurchaseOrderStatus::Delivered);
                active.actual_delivery_date = Set(Some(receipt.received_at.date_naive()));
                active.update(&txn).await?;
            }
        }
        let view = Self::view(&txn, receipt).await?;
        txn.commit().await?;

        for product_id in stocked {
            self.event_sender
                .publish(Event::StockIncremented {
                    product_id,
                    quantity: view.receipt.delivered_quantity,
                })
                .await;
        }
        self.announce(&view.receipt).await;
        Ok(view)
    }

    async fn announce(&self, receipt: &goods_receipt::Model) {
        info!(
            receipt_id = %receipt.id,
            po_id = %receipt.purchase_order_id,
            condition = %receipt.condition,
            quantity = receipt.delivered_quantity,
            "goods received"
        );
        self.event_sender
            .publish(Event::GoodsReceived {
                receipt_id: receipt.id,
                purchase_order_id: receipt.purchase_order_id,
                condition: receipt.condition.to_string(),
            })
            .await;
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filter: GoodsReceiptFilter) -> Result<Vec<GoodsReceiptView>, ServiceError> {
        let mut query = goods_receipt::Entity::find();
        if let Some(po) = filter.purchase_order {
            query = query.filter(goods_receipt::Column::PurchaseOrderId.eq(po));
        }
        let receipts = query
            .order_by_desc(goods_receipt::Column::ReceivedAt)
            .all(&*self.db)
            .await?;
        let mut out = Vec::with_capacity(receipts.len());
        for receipt in receipts {
            out.push(Self::view(&*self.db, receipt).await?);
        }
        Ok(out)
    }

    pub async fn get(&self, id: Uuid) -> Result<GoodsReceiptView, ServiceError> {
        let receipt = goods_receipt::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Goods receipt not found".to_string()))?;
        Self::view(&*self.db, receipt).await
    }

    pub async fn list_items(
        &self,
        filter: ReceiptItemFilter,
    ) -> Result<Vec<goods_receipt_item::Model>, ServiceError> {
        let mut query = goods_receipt_item::Entity::find();
        if let Some(receipt) = filter.goods_receipt {
            query = query.filter(goods_receipt_item::Column::GoodsReceiptId.eq(receipt));
        }
        Ok(query.all(&*self.db).await?)
    }

    /// Records one received line. The accepted quantity is added to the
    /// linked product's stock on every call.
    #[instrument(skip(self, input), fields(receipt_id = %input.goods_receipt_id))]
    pub async fn create_item(
        &self,
        input: CreateReceiptItem,
    ) -> Result<goods_receipt_item::Model, ServiceError> {
        input.validate()?;
        let txn = self.db.begin().await?;
        if goods_receipt::Entity::find_by_id(input.goods_receipt_id)
            .one(&txn)
            .await?
            .is_none()
        {
            return Err(ServiceError::NotFound("Goods receipt not found".to_string()));
        }
        let line = purchase_order_item::Entity::find_by_id(input.purchase_order_item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Purchase order item not found".to_string()))?;
        let received_total = line
            .received_quantity
            .checked_add(input.quantity_received)
            .ok_or_else(|| {
                ServiceError::ValidationError("Received quantity is too large".to_string())
            })?;

        let item = goods_receipt_item::ActiveModel {
            goods_receipt_id: Set(input.goods_receipt_id),
            purchase_order_item_id: Set(line.id),
            quantity_received: Set(input.quantity_received),
            quantity_accepted: Set(input.quantity_accepted),
            quantity_rejected: Set(input.quantity_rejected),
            rejection_reason: Set(input.rejection_reason),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let product_id = line.product_id;
        let mut active: purchase_order_item::ActiveModel = line.into();
        active.received_quantity = Set(received_total);
        active.update(&txn).await?;

        if let Some(product_id) = product_id {
            increment_stock(&txn, product_id, item.quantity_accepted).await?;
        }
        txn.commit().await?;

        if let Some(product_id) = product_id {
            self.event_sender
                .publish(Event::StockIncremented {
                    product_id,
                    quantity: item.quantity_accepted,
                })
                .await;
        }
        Ok(item)
    }
}
