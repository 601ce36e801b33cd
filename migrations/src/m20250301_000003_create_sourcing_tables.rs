use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PurchaseRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseRequests::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PurchaseRequests::EmployeeId).uuid())
                    .col(ColumnDef::new(PurchaseRequests::ProductId).uuid())
                    .col(
                        ColumnDef::new(PurchaseRequests::ItemName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PurchaseRequests::Quantity).integer().not_null())
                    .col(
                        ColumnDef::new(PurchaseRequests::Department)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseRequests::UrgencyLevel)
                            .string_len(10)
                            .not_null()
                            .default("medium"),
                    )
                    .col(
                        ColumnDef::new(PurchaseRequests::Justification)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(PurchaseRequests::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(PurchaseRequests::ReviewedBy).uuid())
                    .col(ColumnDef::new(PurchaseRequests::ReviewedDate).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(PurchaseRequests::RejectionReason)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(PurchaseRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseRequests::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_requests_employee")
                            .from(PurchaseRequests::Table, PurchaseRequests::EmployeeId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_requests_product")
                            .from(PurchaseRequests::Table, PurchaseRequests::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_purchase_requests_reviewer")
                            .from(PurchaseRequests::Table, PurchaseRequests::ReviewedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_purchase_requests_status")
                    .table(PurchaseRequests::Table)
                    .col(PurchaseRequests::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Rfqs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Rfqs::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Rfqs::RfqNumber)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Rfqs::PurchaseRequestId).uuid().not_null())
                    .col(ColumnDef::new(Rfqs::VendorId).uuid().not_null())
                    .col(ColumnDef::new(Rfqs::SentBy).uuid())
                    .col(
                        ColumnDef::new(Rfqs::SentDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Rfqs::ResponseDeadline).date())
                    .col(
                        ColumnDef::new(Rfqs::Status)
                            .string_len(20)
                            .not_null()
                            .default("sent"),
                    )
                    .col(ColumnDef::new(Rfqs::AdminNotes).text().not_null().default(""))
                    .col(
                        ColumnDef::new(Rfqs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Rfqs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rfqs_purchase_request")
                            .from(Rfqs::Table, Rfqs::PurchaseRequestId)
                            .to(PurchaseRequests::Table, PurchaseRequests::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rfqs_vendor")
                            .from(Rfqs::Table, Rfqs::VendorId)
                            .to(Vendors::Table, Vendors::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rfqs_sent_by")
                            .from(Rfqs::Table, Rfqs::SentBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // one RFQ per (request, vendor)
        manager
            .create_index(
                Index::create()
                    .name("idx_rfqs_request_vendor")
                    .table(Rfqs::Table)
                    .col(Rfqs::PurchaseRequestId)
                    .col(Rfqs::VendorId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(VendorQuotations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VendorQuotations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(VendorQuotations::RfqId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(VendorQuotations::QuotationNumber)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(VendorQuotations::UnitPrice)
                            .decimal_len(10, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(VendorQuotations::Quantity).integer().not_null())
                    .col(
                        ColumnDef::new(VendorQuotations::Subtotal)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(VendorQuotations::TaxRate)
                            .decimal_len(5, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(VendorQuotations::TaxAmount)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(VendorQuotations::ShippingCost)
                            .decimal_len(10, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(VendorQuotations::TotalAmount)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(VendorQuotations::EstimatedDeliveryDays)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VendorQuotations::QuotationValidUntil)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VendorQuotations::PaymentTerms)
                            .string_len(200)
                            .not_null()
                            .default("Net 30"),
                    )
                    .col(
                        ColumnDef::new(VendorQuotations::WarrantyTerms)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(VendorQuotations::AdditionalNotes)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(VendorQuotations::Status)
                            .string_len(20)
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(VendorQuotations::ReviewedBy).uuid())
                    .col(ColumnDef::new(VendorQuotations::ReviewedDate).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(VendorQuotations::ReviewNotes)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(VendorQuotations::SubmittedDate).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(VendorQuotations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VendorQuotations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vendor_quotations_rfq")
                            .from(VendorQuotations::Table, VendorQuotations::RfqId)
                            .to(Rfqs::Table, Rfqs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vendor_quotations_reviewer")
                            .from(VendorQuotations::Table, VendorQuotations::ReviewedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VendorQuotations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Rfqs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchaseRequests::Table).to_owned())
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
    EmployeeId,
    ProductId,
    ItemName,
    Quantity,
    Department,
    UrgencyLevel,
    Justification,
    Status,
    ReviewedBy,
    ReviewedDate,
    RejectionReason,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Rfqs {
    Table,
    Id,
    RfqNumber,
    PurchaseRequestId,
    VendorId,
    SentBy,
    SentDate,
    ResponseDeadline,
    Status,
    AdminNotes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum VendorQuotations {
    Table,
    Id,
    RfqId,
    QuotationNumber,
    UnitPrice,
    Quantity,
    Subtotal,
    TaxRate,
    TaxAmount,
    ShippingCost,
    TotalAmount,
    EstimatedDeliveryDays,
    QuotationValidUntil,
    PaymentTerms,
    WarrantyTerms,
    AdditionalNotes,
    Status,
    ReviewedBy,
    ReviewedDate,
    ReviewNotes,
    SubmittedDate,
    CreatedAt,
    UpdatedAt,
}
