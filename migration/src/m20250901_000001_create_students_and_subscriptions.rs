use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Students {
    Table,
    Id,
    FullName,
    Email,
    Balance,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum SubscriptionTypes {
    Table,
    Id,
    Name,
    BillingType,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Subscriptions {
    Table,
    Id,
    StudentId,
    TypeId,
    TotalUnits,
    UsedUnits,
    RemainingUnits,
    StartDate,
    EndDate,
    PaidTill,
    FreezeDaysRemaining,
    Status,
    Version,
    PricePerUnit,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum BalanceTransactions {
    Table,
    Id,
    StudentId,
    TransactionType,
    Amount,
    BalanceAfter,
    SubscriptionId,
    AttendanceId,
    Description,
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
                    .table(Students::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Students::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Students::FullName).string_len(255).not_null())
                    .col(ColumnDef::new(Students::Email).string_len(255).null())
                    .col(
                        ColumnDef::new(Students::Balance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Students::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Students::UpdatedAt)
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
                    .table(SubscriptionTypes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SubscriptionTypes::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionTypes::Name)
                            .string_len(255)
                            .not_null(),
                    )
                    // per_lesson | monthly | unlimited
                    .col(
                        ColumnDef::new(SubscriptionTypes::BillingType)
                            .string_len(16)
                            .not_null()
                            .default("per_lesson"),
                    )
                    .col(
                        ColumnDef::new(SubscriptionTypes::CreatedAt)
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
                    .table(Subscriptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Subscriptions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::StudentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Subscriptions::TypeId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Subscriptions::TotalUnits)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::UsedUnits)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::RemainingUnits)
                            .integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Subscriptions::RemainingUnits).gte(0)),
                    )
                    .col(ColumnDef::new(Subscriptions::StartDate).date().not_null())
                    .col(ColumnDef::new(Subscriptions::EndDate).date().null())
                    .col(ColumnDef::new(Subscriptions::PaidTill).date().null())
                    .col(
                        ColumnDef::new(Subscriptions::FreezeDaysRemaining)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    // active | expired
                    .col(
                        ColumnDef::new(Subscriptions::Status)
                            .string_len(16)
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::Version)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Subscriptions::PricePerUnit).big_integer().null())
                    .col(
                        ColumnDef::new(Subscriptions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscriptions_student")
                            .from(Subscriptions::Table, Subscriptions::StudentId)
                            .to(Students::Table, Students::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_subscriptions_type")
                            .from(Subscriptions::Table, Subscriptions::TypeId)
                            .to(SubscriptionTypes::Table, SubscriptionTypes::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // 选取学生最新有效订阅
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_subscriptions_student_status")
                    .table(Subscriptions::Table)
                    .col(Subscriptions::StudentId)
                    .col(Subscriptions::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BalanceTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BalanceTransactions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BalanceTransactions::StudentId)
                            .big_integer()
                            .not_null(),
                    )
                    // deduction | top_up | refund
                    .col(
                        ColumnDef::new(BalanceTransactions::TransactionType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BalanceTransactions::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BalanceTransactions::BalanceAfter)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BalanceTransactions::SubscriptionId)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(BalanceTransactions::AttendanceId)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(BalanceTransactions::Description).text().null())
                    .col(
                        ColumnDef::new(BalanceTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_balance_transactions_student")
                            .from(BalanceTransactions::Table, BalanceTransactions::StudentId)
                            .to(Students::Table, Students::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_balance_transactions_student")
                    .table(BalanceTransactions::Table)
                    .col(BalanceTransactions::StudentId)
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
                    .table(BalanceTransactions::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Subscriptions::Table).to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(SubscriptionTypes::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Students::Table).to_owned())
            .await?;
        Ok(())
    }
}
