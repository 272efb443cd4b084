use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Subscriptions {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum SubscriptionFreezes {
    Table,
    Id,
    SubscriptionId,
    FreezeStart,
    FreezeEnd,
    Reason,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SubscriptionFreezes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SubscriptionFreezes::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionFreezes::SubscriptionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionFreezes::FreezeStart)
                            .date()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SubscriptionFreezes::FreezeEnd).date().not_null())
                    .col(ColumnDef::new(SubscriptionFreezes::Reason).text().null())
                    .col(
                        ColumnDef::new(SubscriptionFreezes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscription_freezes_subscription")
                            .from(
                                SubscriptionFreezes::Table,
                                SubscriptionFreezes::SubscriptionId,
                            )
                            .to(Subscriptions::Table, Subscriptions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_subscription_freezes_subscription")
                    .table(SubscriptionFreezes::Table)
                    .col(SubscriptionFreezes::SubscriptionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(SubscriptionFreezes::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
