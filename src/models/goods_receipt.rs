use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

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
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReceiptCondition {
    #[sea_orm(string_value = "good")]
    Good,
    #[sea_orm(string_value = "damaged")]
    Damaged,
    #[sea_orm(string_value = "partial")]
    Partial,
    #[sea_orm(string_value = "shortage")]
    Shortage,
}

impl ReceiptCondition {
    /// Conditions whose delivered quantity is added to stock.
    pub fn adds_stock(self) -> bool {
        matches!(self, ReceiptCondition::Good | ReceiptCondition::Partial)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "goods_receipts")]
#[schema(as = GoodsReceipt)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub purchase_order_id: Uuid,
    pub delivered_quantity: i32,
    pub condition: ReceiptCondition,
    pub notes: String,
    pub received_by: Option<Uuid>,
    pub received_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::purchase_order::Entity",
        from = "Column::PurchaseOrderId",
        to = "super::purchase_order::Column::Id",
        on_delete = "Restrict"
    )]
    PurchaseOrder,
    #[sea_orm(has_many = "super::goods_receipt_item::Entity")]
    Items,
}

impl Related<super::purchase_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrder.def()
    }
}

impl Related<super::goods_receipt_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr> {
        let mut active_model = self;
        if insert {
            let now = Utc::now();
            if active_model.id.is_not_set() {
                active_model.id = Set(Uuid::new_v4());
            }
            active_model.received_at = Set(now);
            active_model.created_at = Set(now);
        }
        Ok(active_model)
    }
}
