use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Submission::Table)
                    .if_not_exists()
                    .col(string_len(Submission::Id, 36).primary_key())
                    .col(string_len(Submission::UserId, 128))
                    .col(string_len(Submission::CourseId, 128))
                    .col(string_len_null(Submission::SectionId, 128))
                    .col(string_len(Submission::ChapterId, 128))
                    .col(string_len(Submission::AssignmentId, 128))
                    // Language id as used by the sandbox table, e.g. "python", "cpp".
                    .col(string_len(Submission::Language, 16))
                    .col(text(Submission::SourceText))
                    // Full verdict as JSON; passed/score are duplicated for querying.
                    .col(text(Submission::Evaluation))
                    .col(boolean(Submission::Passed))
                    .col(
                        small_integer(Submission::Score)
                            .check(Expr::col(Submission::Score).gte(0))
                            .check(Expr::col(Submission::Score).lte(100)),
                    )
                    .col(
                        timestamp_with_time_zone(Submission::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_submission_user_course")
                    .table(Submission::Table)
                    .col(Submission::UserId)
                    .col(Submission::CourseId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_submission_assignment")
                    .table(Submission::Table)
                    .col(Submission::CourseId)
                    .col(Submission::ChapterId)
                    .col(Submission::AssignmentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_submission_created_at")
                    .table(Submission::Table)
                    .col(Submission::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ChapterProgress::Table)
                    .if_not_exists()
                    .col(string_len(ChapterProgress::UserId, 128))
                    .col(string_len(ChapterProgress::CourseId, 128))
                    .col(string_len(ChapterProgress::ChapterId, 128))
                    .col(boolean(ChapterProgress::Completed).default(false))
                    .col(boolean(ChapterProgress::QuizCompleted).default(false))
                    .col(
                        timestamp_with_time_zone(ChapterProgress::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(ChapterProgress::UserId)
                            .col(ChapterProgress::CourseId)
                            .col(ChapterProgress::ChapterId),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChapterProgress::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Submission::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Submission {
    Table,
    Id,
    UserId,
    CourseId,
    SectionId,
    ChapterId,
    AssignmentId,
    Language,
    SourceText,
    Evaluation,
    Passed,
    Score,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ChapterProgress {
    Table,
    UserId,
    CourseId,
    ChapterId,
    Completed,
    QuizCompleted,
    UpdatedAt,
}
