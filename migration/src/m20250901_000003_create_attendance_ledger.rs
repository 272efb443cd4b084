use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Students {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Lessons {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Subscriptions {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Attendances {
    Table,
    Id,
    LessonId,
    StudentId,
    SubscriptionId,
    Status,
    Reason,
    Notes,
    MarkedBy,
    MarkedAt,
}

#[derive(DeriveIden)]
enum SubscriptionConsumptions {
    Table,
    Id,
    SubscriptionId,
    AttendanceId,
    Units,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// 考勤记录与课时消耗流水。
///
/// - attendances: (lesson_id, student_id) 唯一，重复标记为 upsert
/// - subscription_consumptions: (subscription_id, attendance_id) 唯一，防止重复扣课
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Attendances::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Attendances::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Attendances::LessonId).big_integer().not_null())
                    .col(ColumnDef::new(Attendances::StudentId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Attendances::SubscriptionId)
                            .big_integer()
                            .null(),
                    )
                    // attended | missed | cancelled
                    .col(ColumnDef::new(Attendances::Status).string_len(16).not_null())
                    .col(ColumnDef::new(Attendances::Reason).string_len(255).null())
                    .col(ColumnDef::new(Attendances::Notes).text().null())
                    .col(ColumnDef::new(Attendances::MarkedBy).big_integer().null())
                    .col(
                        ColumnDef::new(Attendances::MarkedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attendances_lesson")
                            .from(Attendances::Table, Attendances::LessonId)
                            .to(Lessons::Table, Lessons::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attendances_student")
                            .from(Attendances::Table, Attendances::StudentId)
                            .to(Students::Table, Students::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attendances_subscription")
                            .from(Attendances::Table, Attendances::SubscriptionId)
                            .to(Subscriptions::Table, Subscriptions::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_attendances_lesson_student_unique")
                    .table(Attendances::Table)
                    .col(Attendances::LessonId)
                    .col(Attendances::StudentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SubscriptionConsumptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SubscriptionConsumptions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionConsumptions::SubscriptionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionConsumptions::AttendanceId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SubscriptionConsumptions::Units)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(SubscriptionConsumptions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_consumptions_subscription")
                            .from(
                                SubscriptionConsumptions::Table,
                                SubscriptionConsumptions::SubscriptionId,
                            )
                            .to(Subscriptions::Table, Subscriptions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_consumptions_attendance")
                            .from(
                                SubscriptionConsumptions::Table,
                                SubscriptionConsumptions::AttendanceId,
                            )
                            .to(Attendances::Table, Attendances::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_consumptions_subscription_attendance_unique")
                    .table(SubscriptionConsumptions::Table)
                    .col(SubscriptionConsumptions::SubscriptionId)
                    .col(SubscriptionConsumptions::AttendanceId)
                    .unique()
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
                    .table(SubscriptionConsumptions::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Attendances::Table).to_owned())
            .await?;
        Ok(())
    }
}
