use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Per-line breakdown of a goods receipt. Accepted quantity feeds stock.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "goods_receipt_items")]
#[schema(as = GoodsReceiptItem)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub goods_receipt_id: Uuid,
    pub purchase_order_item_id: Uuid,
    pub quantity_received: i32,
    pub quantity_accepted: i32,
    pub quantity_rejected: i32,
    pub rejection_reason: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::goods_receipt::Entity",
        from = "Column::GoodsReceiptId",
        to = "super::goods_receipt::Column::Id",
        on_delete = "Cascade"
    )]
    GoodsReceipt,
    #[sea_orm(
        belongs_to = "super::purchase_order_item::Entity",
        from = "Column::PurchaseOrderItemId",
        to = "super::purchase_order_item::Column::Id",
        on_delete = "Restrict"
    )]
    PurchaseOrderItem,
}

impl Related<super::goods_receipt::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GoodsReceipt.def()
    }
}

impl Related<super::purchase_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrderItem.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr> {
        let mut active_model = self;
        if insert && active_model.id.is_not_set() {
            active_model.id = Set(Uuid::new_v4());
        }
        Ok(active_model)
    }
}
