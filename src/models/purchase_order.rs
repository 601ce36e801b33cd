use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::current_value;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PurchaseOrderStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "sent")]
    Sent,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "received")]
    Received,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "delayed")]
    Delayed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl PurchaseOrderStatus {
    /// Statuses an administrator or the assignee may set through the
    /// update-status action.
    pub const ASSIGNABLE: [PurchaseOrderStatus; 5] = [
        PurchaseOrderStatus::Pending,
        PurchaseOrderStatus::InProgress,
        PurchaseOrderStatus::Received,
        PurchaseOrderStatus::Delivered,
        PurchaseOrderStatus::Delayed,
    ];
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeliveryStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "shipped")]
    Shipped,
    #[sea_orm(string_value = "in_transit")]
    InTransit,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "delayed")]
    Delayed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "purchase_orders")]
#[schema(as = PurchaseOrder)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub po_number: String,
    pub vendor_id: Uuid,
    pub order_date: NaiveDate,
    pub expected_delivery_date: Option<NaiveDate>,
    pub delivery_deadline: Option<NaiveDate>,
    pub actual_delivery_date: Option<NaiveDate>,
    pub status: PurchaseOrderStatus,
    pub delivery_status: DeliveryStatus,
    pub purchase_request_id: Option<Uuid>,
    pub vendor_quotation_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub shipping_cost: Decimal,
    pub total_amount: Decimal,
    pub total_quantity: i32,
    pub shipment_date: Option<NaiveDate>,
    pub tracking_number: String,
    pub delivery_notes: String,
    pub delay_reason: String,
    pub last_status_update: Option<DateTime<Utc>>,
    pub status_updated_by: Option<Uuid>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vendor::Entity",
        from = "Column::VendorId",
        to = "super::vendor::Column::Id",
        on_delete = "Restrict"
    )]
    Vendor,
    #[sea_orm(has_many = "super::purchase_order_item::Entity")]
    Items,
    #[sea_orm(has_many = "super::goods_receipt::Entity")]
    GoodsReceipts,
}

impl Related<super::vendor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vendor.def()
    }
}

impl Related<super::purchase_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::goods_receipt::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GoodsReceipts.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr> {
        let mut active_model = self;
        let now = Utc::now();
        if insert {
            if active_model.id.is_not_set() {
                active_model.id = Set(Uuid::new_v4());
            }
            if active_model.order_date.is_not_set() {
                active_model.order_date = Set(now.date_naive());
            }
            active_model.created_at = Set(now);
        }
        active_model.updated_at = Set(now);

        if let Some(subtotal) = current_value(&active_model.subtotal) {
            let tax = current_value(&active_model.tax_amount).unwrap_or_default();
            let shipping = current_value(&active_model.shipping_cost).unwrap_or_default();
            active_model.tax_amount = Set(tax);
            active_model.shipping_cost = Set(shipping);
            let total = order_total(subtotal, tax, shipping)
                .ok_or_else(|| DbErr::Custom("Purchase order total is too large".to_string()))?;
            active_model.total_amount = Set(total);
        }

        Ok(active_model)
    }
}

pub fn order_total(
    subtotal: Decimal,
    tax_amount: Decimal,
    shipping_cost: Decimal,
) -> Option<Decimal> {
    subtotal.checked_add(tax_amount)?.checked_add(shipping_cost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    #[test]
    fn total_sums_components() {
        assert_eq!(order_total(dec!(1000), dec!(180), dec!(50)), Some(dec!(1230)));
        assert_eq!(order_total(Decimal::MAX, dec!(1), dec!(0)), None);
    }

    #[test]
    fn status_parses_snake_case() {
        assert_eq!(
            PurchaseOrderStatus::from_str("in_progress").unwrap(),
            PurchaseOrderStatus::InProgress
        );
        assert!(PurchaseOrderStatus::from_str("shipped").is_err());
        assert_eq!(PurchaseOrderStatus::Delayed.to_string(), "delayed");
    }
}
