pub use sea_orm_migration::prelude::*;

mod m20260301_000000_init;
mod m20260302_000000_fiscal_years;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000000_init::Migration),
            Box::new(m20260302_000000_fiscal_years::Migration),
        ]
    }
}
