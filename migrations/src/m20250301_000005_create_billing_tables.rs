use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Invoices::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Invoices::InvoiceNumber)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Invoices::VendorId).uuid().not_null())
                    .col(ColumnDef::new(Invoices::PurchaseOrderId).uuid())
                    .col(ColumnDef::new(Invoices::InvoiceDate).date().not_null())
                    .col(ColumnDef::new(Invoices::DueDate).date().not_null())
                    .col(
                        ColumnDef::new(Invoices::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Invoices::Subtotal)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Invoices::TaxAmount)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Invoices::TotalAmount)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::PaidAmount)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Invoices::InvoiceFile).string_len(255))
                    .col(ColumnDef::new(Invoices::UploadedBy).uuid())
                    .col(ColumnDef::new(Invoices::UploadDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(Invoices::Notes).text().not_null().default(""))
                    .col(
                        ColumnDef::new(Invoices::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Invoices::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoices_vendor")
                            .from(Invoices::Table, Invoices::VendorId)
                            .to(Vendors::Table, Vendors::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoices_purchase_order")
                            .from(Invoices::Table, Invoices::PurchaseOrderId)
                            .to(PurchaseOrders::Table, PurchaseOrders::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_invoices_uploaded_by")
                            .from(Invoices::Table, Invoices::UploadedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_invoices_status")
                    .table(Invoices::Table)
                    .col(Invoices::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Payments::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Payments::PaymentNumber)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Payments::InvoiceId).uuid().not_null())
                    .col(ColumnDef::new(Payments::VendorId).uuid().not_null())
                    .col(ColumnDef::new(Payments::Amount).decimal_len(12, 2).not_null())
                    .col(ColumnDef::new(Payments::PaymentDate).date().not_null())
                    .col(
                        ColumnDef::new(Payments::PaymentMethod)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Payments::GatewayOrderId).string_len(100))
                    .col(ColumnDef::new(Payments::GatewayPaymentId).string_len(100))
                    .col(ColumnDef::new(Payments::GatewaySignature).string_len(200))
                    .col(
                        ColumnDef::new(Payments::TransactionReference)
                            .string_len(100)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Payments::Notes).text().not_null().default(""))
                    .col(ColumnDef::new(Payments::CreatedBy).uuid())
                    .col(
                        ColumnDef::new(Payments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payments_invoice")
                            .from(Payments::Table, Payments::InvoiceId)
                            .to(Invoices::Table, Invoices::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payments_vendor")
                            .from(Payments::Table, Payments::VendorId)
                            .to(Vendors::Table, Vendors::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payments_created_by")
                            .from(Payments::Table, Payments::CreatedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payments_invoice")
                    .table(Payments::Table)
                    .col(Payments::InvoiceId)
                    .to_owned(),
            )
            .await?;

        // A gateway payment id may be recorded once; manual payments leave it NULL.
        manager
            .create_index(
                Index::create()
                    .name("idx_payments_gateway_payment_id")
                    .table(Payments::Table)
                    .col(Payments::GatewayPaymentId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Invoices::Table).to_owned())
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
enum PurchaseOrders {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Invoices {
    Table,
    Id,
    InvoiceNumber,
    VendorId,
    PurchaseOrderId,
    InvoiceDate,
    DueDate,
    Status,
    Subtotal,
    TaxAmount,
    TotalAmount,
    PaidAmount,
    InvoiceFile,
    UploadedBy,
    UploadDate,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Payments {
    Table,
    Id,
    PaymentNumber,
    InvoiceId,
    VendorId,
    Amount,
    PaymentDate,
    PaymentMethod,
    GatewayOrderId,
    GatewayPaymentId,
    GatewaySignature,
    TransactionReference,
    Notes,
    CreatedBy,
    CreatedAt,
}
