//! Migration to create the tenants table.
//!
//! One row per isolated customer environment. The primary key is the
//! subdomain-derived identifier; provisioning_status is the persisted
//! lifecycle state (created/provisioning/ready/failed).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tenants::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tenants::Id).text().not_null().primary_key())
                    .col(ColumnDef::new(Tenants::SubscriberId).uuid().not_null())
                    .col(ColumnDef::new(Tenants::Theme).text().null())
                    .col(ColumnDef::new(Tenants::Data).json_binary().null())
                    .col(
                        ColumnDef::new(Tenants::ProvisioningStatus)
                            .text()
                            .not_null()
                            .default("created"),
                    )
                    .col(
                        ColumnDef::new(Tenants::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Tenants::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tenants_subscriber_id")
                            .from(Tenants::Table, Tenants::SubscriberId)
                            .to(Subscribers::Table, Subscribers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tenants_subscriber_id")
                    .table(Tenants::Table)
                    .col(Tenants::SubscriberId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_tenants_subscriber_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Tenants::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
    SubscriberId,
    Theme,
    Data,
    ProvisioningStatus,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Subscribers {
    Table,
    Id,
}
