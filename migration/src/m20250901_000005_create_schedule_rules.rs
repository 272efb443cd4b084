use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum ScheduleRules {
    Table,
    Id,
    OwnerType,
    OwnerId,
    RecurrenceExpr,
    WindowStart,
    WindowEnd,
    DurationMinutes,
    Timezone,
    Location,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum LessonOccurrences {
    Table,
    Id,
    RuleId,
    StartsAt,
    EndsAt,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ScheduleRules::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScheduleRules::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    // teacher | group | room
                    .col(
                        ColumnDef::new(ScheduleRules::OwnerType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ScheduleRules::OwnerId).big_integer().not_null())
                    .col(
                        ColumnDef::new(ScheduleRules::RecurrenceExpr)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ScheduleRules::WindowStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ScheduleRules::WindowEnd)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ScheduleRules::DurationMinutes)
                            .integer()
                            .not_null()
                            .default(60),
                    )
                    .col(
                        ColumnDef::new(ScheduleRules::Timezone)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ScheduleRules::Location).string_len(255).null())
                    .col(
                        ColumnDef::new(ScheduleRules::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ScheduleRules::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_schedule_rules_owner")
                    .table(ScheduleRules::Table)
                    .col(ScheduleRules::OwnerType)
                    .col(ScheduleRules::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LessonOccurrences::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LessonOccurrences::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LessonOccurrences::RuleId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LessonOccurrences::StartsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LessonOccurrences::EndsAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    // scheduled | done | cancelled
                    .col(
                        ColumnDef::new(LessonOccurrences::Status)
                            .string_len(16)
                            .not_null()
                            .default("scheduled"),
                    )
                    .col(
                        ColumnDef::new(LessonOccurrences::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(LessonOccurrences::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lesson_occurrences_rule")
                            .from(LessonOccurrences::Table, LessonOccurrences::RuleId)
                            .to(ScheduleRules::Table, ScheduleRules::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_lesson_occurrences_rule_starts_at")
                    .table(LessonOccurrences::Table)
                    .col(LessonOccurrences::RuleId)
                    .col(LessonOccurrences::StartsAt)
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
                    .table(LessonOccurrences::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(ScheduleRules::Table).to_owned())
            .await?;
        Ok(())
    }
}
