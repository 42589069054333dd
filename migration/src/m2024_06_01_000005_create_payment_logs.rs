//! Migration to create the payment_logs table.
//!
//! Append-mostly records of subscription events (purchase, renewal, upgrade).
//! A tenant's current plan is the latest complete, unexpired row.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PaymentLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentLogs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PaymentLogs::SubscriberId).uuid().not_null())
                    .col(ColumnDef::new(PaymentLogs::PlanId).uuid().not_null())
                    .col(ColumnDef::new(PaymentLogs::TenantId).text().not_null())
                    .col(
                        ColumnDef::new(PaymentLogs::PaymentStatus)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(PaymentLogs::AmountCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PaymentLogs::CouponDiscountCents)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PaymentLogs::StartsAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PaymentLogs::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PaymentLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_logs_subscriber_id")
                            .from(PaymentLogs::Table, PaymentLogs::SubscriberId)
                            .to(Subscribers::Table, Subscribers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_logs_plan_id")
                            .from(PaymentLogs::Table, PaymentLogs::PlanId)
                            .to(PricePlans::Table, PricePlans::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_logs_tenant_id")
                            .from(PaymentLogs::Table, PaymentLogs::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Current-plan lookup: latest complete log per tenant.
        manager
            .create_index(
                Index::create()
                    .name("idx_payment_logs_tenant_status_created")
                    .table(PaymentLogs::Table)
                    .col(PaymentLogs::TenantId)
                    .col(PaymentLogs::PaymentStatus)
                    .col(PaymentLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_payment_logs_tenant_status_created")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(PaymentLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PaymentLogs {
    Table,
    Id,
    SubscriberId,
    PlanId,
    TenantId,
    PaymentStatus,
    AmountCents,
    CouponDiscountCents,
    StartsAt,
    ExpiresAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Subscribers {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum PricePlans {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
}
