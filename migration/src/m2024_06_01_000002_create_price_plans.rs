//! Migration to create the price_plans and plan_features tables.
//!
//! A price plan is a purchasable tier; its plan_features rows are the named
//! capability flags the feature catalog maps onto database modules.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PricePlans::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PricePlans::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PricePlans::Name).text().not_null())
                    .col(ColumnDef::new(PricePlans::PlanType).text().not_null())
                    .col(
                        ColumnDef::new(PricePlans::PriceCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PricePlans::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PricePlans::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PlanFeatures::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PlanFeatures::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PlanFeatures::PlanId).uuid().not_null())
                    .col(ColumnDef::new(PlanFeatures::Name).text().not_null())
                    .col(
                        ColumnDef::new(PlanFeatures::Status)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(PlanFeatures::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_plan_features_plan_id")
                            .from(PlanFeatures::Table, PlanFeatures::PlanId)
                            .to(PricePlans::Table, PricePlans::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_plan_features_plan_id")
                    .table(PlanFeatures::Table)
                    .col(PlanFeatures::PlanId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_plan_features_plan_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(PlanFeatures::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(PricePlans::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PricePlans {
    Table,
    Id,
    Name,
    PlanType,
    PriceCents,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PlanFeatures {
    Table,
    Id,
    PlanId,
    Name,
    Status,
    Position,
}
