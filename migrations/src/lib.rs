pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_identity_tables;
mod m20250301_000002_create_catalog_tables;
mod m20250301_000003_create_sourcing_tables;
mod m20250301_000004_create_ordering_tables;
mod m20250301_000005_create_billing_tables;
mod m20250301_000006_create_notifications_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_identity_tables::Migration),
            Box::new(m20250301_000002_create_catalog_tables::Migration),
            Box::new(m20250301_000003_create_sourcing_tables::Migration),
            Box::new(m20250301_000004_create_ordering_tables::Migration),
            Box::new(m20250301_000005_create_billing_tables::Migration),
            Box::new(m20250301_000006_create_notifications_table::Migration),
        ]
    }
}
