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
    Title,
    SubjectId,
    TeacherId,
    GroupId,
    StudentId,
    RoomId,
    StartTime,
    EndTime,
    Status,
    IsMakeup,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum LessonStudents {
    Table,
    Id,
    LessonId,
    StudentId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum GroupStudents {
    Table,
    Id,
    GroupId,
    StudentId,
    IsActive,
    JoinedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Lessons::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Lessons::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Lessons::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Lessons::SubjectId).big_integer().null())
                    .col(ColumnDef::new(Lessons::TeacherId).big_integer().null())
                    .col(ColumnDef::new(Lessons::GroupId).big_integer().null())
                    // 个人课程直接关联学生
                    .col(ColumnDef::new(Lessons::StudentId).big_integer().null())
                    .col(ColumnDef::new(Lessons::RoomId).big_integer().null())
                    .col(
                        ColumnDef::new(Lessons::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Lessons::EndTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    // scheduled | completed | cancelled
                    .col(
                        ColumnDef::new(Lessons::Status)
                            .string_len(16)
                            .not_null()
                            .default("scheduled"),
                    )
                    .col(
                        ColumnDef::new(Lessons::IsMakeup)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Lessons::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Lessons::UpdatedAt)
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
                    .name("idx_lessons_start_time")
                    .table(Lessons::Table)
                    .col(Lessons::StartTime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LessonStudents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LessonStudents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LessonStudents::LessonId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LessonStudents::StudentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LessonStudents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lesson_students_lesson")
                            .from(LessonStudents::Table, LessonStudents::LessonId)
                            .to(Lessons::Table, Lessons::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lesson_students_student")
                            .from(LessonStudents::Table, LessonStudents::StudentId)
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
                    .name("idx_lesson_students_unique")
                    .table(LessonStudents::Table)
                    .col(LessonStudents::LessonId)
                    .col(LessonStudents::StudentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GroupStudents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GroupStudents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GroupStudents::GroupId).big_integer().not_null())
                    .col(
                        ColumnDef::new(GroupStudents::StudentId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GroupStudents::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(GroupStudents::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_students_student")
                            .from(GroupStudents::Table, GroupStudents::StudentId)
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
                    .name("idx_group_students_student")
                    .table(GroupStudents::Table)
                    .col(GroupStudents::StudentId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().if_exists().table(GroupStudents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(LessonStudents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Lessons::Table).to_owned())
            .await?;
        Ok(())
    }
}
