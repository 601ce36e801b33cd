use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // users
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Users::Username)
                            .string_len(150)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Users::Email).string_len(254).not_null())
                    .col(ColumnDef::new(Users::PasswordHash).text().not_null())
                    .col(
                        ColumnDef::new(Users::FirstName)
                            .string_len(150)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Users::LastName)
                            .string_len(150)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Users::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Users::IsStaff)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Users::IsSuperuser)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Users::LastLogin).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_users_email")
                    .table(Users::Table)
                    .col(Users::Email)
                    .to_owned(),
            )
            .await?;

        // vendors
        manager
            .create_table(
                Table::create()
                    .table(Vendors::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Vendors::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Vendors::VendorCode)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Vendors::CompanyName).string_len(200).not_null())
                    .col(ColumnDef::new(Vendors::ContactPerson).string_len(100).not_null())
                    .col(ColumnDef::new(Vendors::Email).string_len(254).not_null())
                    .col(ColumnDef::new(Vendors::Phone).string_len(20).not_null())
                    .col(ColumnDef::new(Vendors::Address).text().not_null().default(""))
                    .col(ColumnDef::new(Vendors::City).string_len(100).not_null().default(""))
                    .col(ColumnDef::new(Vendors::State).string_len(100).not_null().default(""))
                    .col(
                        ColumnDef::new(Vendors::PostalCode)
                            .string_len(20)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Vendors::Country)
                            .string_len(100)
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Vendors::TaxId).string_len(50).not_null().default(""))
                    .col(
                        ColumnDef::new(Vendors::PaymentTerms)
                            .string_len(100)
                            .not_null()
                            .default("Net 30"),
                    )
                    .col(
                        ColumnDef::new(Vendors::CreditLimit)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Vendors::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Vendors::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Vendors::Rating)
                            .decimal_len(3, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Vendors::Notes).text().not_null().default(""))
                    .col(ColumnDef::new(Vendors::UserId).uuid().unique_key())
                    .col(ColumnDef::new(Vendors::ApprovedBy).uuid())
                    .col(ColumnDef::new(Vendors::ApprovedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Vendors::RejectionReason)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Vendors::RejectedBy).uuid())
                    .col(ColumnDef::new(Vendors::RejectedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Vendors::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Vendors::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vendors_user")
                            .from(Vendors::Table, Vendors::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vendors_approved_by")
                            .from(Vendors::Table, Vendors::ApprovedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vendors_rejected_by")
                            .from(Vendors::Table, Vendors::RejectedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vendors_status")
                    .table(Vendors::Table)
                    .col(Vendors::Status)
                    .to_owned(),
            )
            .await?;

        // user_profiles
        manager
            .create_table(
                Table::create()
                    .table(UserProfiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserProfiles::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UserProfiles::UserId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(UserProfiles::Role)
                            .string_len(20)
                            .not_null()
                            .default("employee"),
                    )
                    .col(
                        ColumnDef::new(UserProfiles::Phone)
                            .string_len(20)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(UserProfiles::Department)
                            .string_len(100)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(UserProfiles::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(UserProfiles::VendorId).uuid())
                    .col(
                        ColumnDef::new(UserProfiles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserProfiles::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_profiles_user")
                            .from(UserProfiles::Table, UserProfiles::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_profiles_vendor")
                            .from(UserProfiles::Table, UserProfiles::VendorId)
                            .to(Vendors::Table, Vendors::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // employee_profiles
        manager
            .create_table(
                Table::create()
                    .table(EmployeeProfiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EmployeeProfiles::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EmployeeProfiles::UserId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(EmployeeProfiles::Department).string_len(100))
                    .col(ColumnDef::new(EmployeeProfiles::Position).string_len(100))
                    .col(ColumnDef::new(EmployeeProfiles::Phone).string_len(20))
                    .col(
                        ColumnDef::new(EmployeeProfiles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EmployeeProfiles::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_employee_profiles_user")
                            .from(EmployeeProfiles::Table, EmployeeProfiles::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EmployeeProfiles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserProfiles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Vendors::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Username,
    Email,
    PasswordHash,
    FirstName,
    LastName,
    IsActive,
    IsStaff,
    IsSuperuser,
    LastLogin,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Vendors {
    Table,
    Id,
    VendorCode,
    CompanyName,
    ContactPerson,
    Email,
    Phone,
    Address,
    City,
    State,
    PostalCode,
    Country,
    TaxId,
    PaymentTerms,
    CreditLimit,
    IsActive,
    Status,
    Rating,
    Notes,
    UserId,
    ApprovedBy,
    ApprovedAt,
    RejectionReason,
    RejectedBy,
    RejectedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum UserProfiles {
    Table,
    Id,
    UserId,
    Role,
    Phone,
    Department,
    IsActive,
    VendorId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum EmployeeProfiles {
    Table,
    Id,
    UserId,
    Department,
    Position,
    Phone,
    CreatedAt,
    UpdatedAt,
}
