use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PurchaseOrders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseOrders::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::PoNumber)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(PurchaseOrders::VendorId).uuid().not_null())
                    .col(ColumnDef::new(PurchaseOrders::OrderDate).date().not_null())
                    .col(ColumnDef::new(PurchaseOrders::ExpectedDeliveryDate).date())
                    .col(ColumnDef::new(PurchaseOrders::DeliveryDeadline).date())
                    .col(ColumnDef::new(PurchaseOrders::ActualDeliveryDate).date())
                    .col(
                        ColumnDef::new(PurchaseOrders::Status)
                            .string_len(20)
                            .not_null()
                            .default("draft"),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::DeliveryStatus)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(PurchaseOrders::PurchaseRequestId).uuid())
                    .col(ColumnDef::new(PurchaseOrders::VendorQuotationId).uuid())
                    .col(ColumnDef::new(PurchaseOrders::CreatedBy).uuid())
                    .col(ColumnDef::new(PurchaseOrders::AssignedTo).uuid())
                    .col(
                        ColumnDef::new(PurchaseOrders::Subtotal)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::TaxAmount)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::ShippingCost)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::TotalAmount)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::TotalQuantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(PurchaseOrders::ShipmentDate).date())
                    .col(
                        ColumnDef::new(PurchaseOrders::TrackingNumber)
                            .string_len(100)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::DeliveryNotes)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::DelayReason)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(PurchaseOrders::LastStatusUpdate).timestamp_with_time_zone())
                    .col(ColumnDef::new(PurchaseOrders::StatusUpdatedBy).uuid())
                    .col(ColumnDef::new(PurchaseOrders::Notes).text().not_null().default(""))
                    .col(
                        ColumnDef::new(PurchaseOrders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_orders_vendor")
                            .from(PurchaseOrders::Table, PurchaseOrders::VendorId)
                            .to(Vendors::Table, Vendors::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_orders_request")
                            .from(PurchaseOrders::Table, PurchaseOrders::PurchaseRequestId)
                            .to(PurchaseRequests::Table, PurchaseRequests::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_orders_quotation")
                            .from(PurchaseOrders::Table, PurchaseOrders::VendorQuotationId)
                            .to(VendorQuotations::Table, VendorQuotations::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_orders_created_by")
                            .from(PurchaseOrders::Table, PurchaseOrders::CreatedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_orders_assigned_to")
                            .from(PurchaseOrders::Table, PurchaseOrders::AssignedTo)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_orders_status_updated_by")
                            .from(PurchaseOrders::Table, PurchaseOrders::StatusUpdatedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_purchase_orders_vendor")
                    .table(PurchaseOrders::Table)
                    .col(PurchaseOrders::VendorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PurchaseOrderItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseOrderItems::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::PurchaseOrderId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PurchaseOrderItems::ProductId).uuid())
                    .col(
                        ColumnDef::new(PurchaseOrderItems::ProductName)
                            .string_len(255)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(PurchaseOrderItems::Quantity).integer().not_null())
                    .col(
                        ColumnDef::new(PurchaseOrderItems::UnitPrice)
                            .decimal_len(10, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::LineTotal)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::ReceivedQuantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::Notes)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_order_items_order")
                            .from(PurchaseOrderItems::Table, PurchaseOrderItems::PurchaseOrderId)
                            .to(PurchaseOrders::Table, PurchaseOrders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_order_items_product")
                            .from(PurchaseOrderItems::Table, PurchaseOrderItems::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GoodsReceipts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GoodsReceipts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GoodsReceipts::PurchaseOrderId).uuid().not_null())
                    .col(
                        ColumnDef::new(GoodsReceipts::DeliveredQuantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GoodsReceipts::Condition)
                            .string_len(20)
                            .not_null()
                            .default("good"),
                    )
                    .col(ColumnDef::new(GoodsReceipts::Notes).text().not_null().default(""))
                    .col(ColumnDef::new(GoodsReceipts::ReceivedBy).uuid())
                    .col(
                        ColumnDef::new(GoodsReceipts::ReceivedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GoodsReceipts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_goods_receipts_order")
                            .from(GoodsReceipts::Table, GoodsReceipts::PurchaseOrderId)
                            .to(PurchaseOrders::Table, PurchaseOrders::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_goods_receipts_received_by")
                            .from(GoodsReceipts::Table, GoodsReceipts::ReceivedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GoodsReceiptItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GoodsReceiptItems::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GoodsReceiptItems::GoodsReceiptId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GoodsReceiptItems::PurchaseOrderItemId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GoodsReceiptItems::QuantityReceived)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GoodsReceiptItems::QuantityAccepted)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GoodsReceiptItems::QuantityRejected)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(GoodsReceiptItems::RejectionReason)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_goods_receipt_items_receipt")
                            .from(GoodsReceiptItems::Table, GoodsReceiptItems::GoodsReceiptId)
                            .to(GoodsReceipts::Table, GoodsReceipts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_goods_receipt_items_order_item")
                            .from(
                                GoodsReceiptItems::Table,
                                GoodsReceiptItems::PurchaseOrderItemId,
                            )
                            .to(PurchaseOrderItems::Table, PurchaseOrderItems::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GoodsReceiptItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GoodsReceipts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchaseOrderItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchaseOrders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Vendors {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum PurchaseRequests {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum VendorQuotations {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum PurchaseOrders {
    Table,
    Id,
    PoNumber,
    VendorId,
    OrderDate,
    ExpectedDeliveryDate,
    DeliveryDeadline,
    ActualDeliveryDate,
    Status,
    DeliveryStatus,
    PurchaseRequestId,
    VendorQuotationId,
    CreatedBy,
    AssignedTo,
    Subtotal,
    TaxAmount,
    ShippingCost,
    TotalAmount,
    TotalQuantity,
    ShipmentDate,
    TrackingNumber,
    DeliveryNotes,
    DelayReason,
    LastStatusUpdate,
    StatusUpdatedBy,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PurchaseOrderItems {
    Table,
    Id,
    PurchaseOrderId,
    ProductId,
    ProductName,
    Quantity,
    UnitPrice,
    LineTotal,
    ReceivedQuantity,
    Notes,
    CreatedAt,
}

#[derive(DeriveIden)]
enum GoodsReceipts {
    Table,
    Id,
    PurchaseOrderId,
    DeliveredQuantity,
    Condition,
    Notes,
    ReceivedBy,
    ReceivedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum GoodsReceiptItems {
    Table,
    Id,
    GoodsReceiptId,
    PurchaseOrderItemId,
    QuantityReceived,
    QuantityAccepted,
    QuantityRejected,
    RejectionReason,
}
