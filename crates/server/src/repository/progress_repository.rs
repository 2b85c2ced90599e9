use crate::entity::chapter_progress;
use crate::repository::store_error;
use assignment_engine::store::{ProgressStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use codelab_core::domain::{ChapterId, ChapterRecord, ChapterUpdate, CourseId, UserId};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

#[derive(Clone)]
pub struct SeaOrmProgressRepository {
    db: DatabaseConnection,
}

impl SeaOrmProgressRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn map_model(model: chapter_progress::Model) -> ChapterRecord {
        ChapterRecord {
            chapter_id: ChapterId::new(model.chapter_id),
            completed: model.completed,
            quiz_completed: model.quiz_completed,
            updated_at: model.updated_at,
        }
    }

    fn updated_column(update: ChapterUpdate) -> chapter_progress::Column {
        match update {
            ChapterUpdate::Completed(_) => chapter_progress::Column::Completed,
            ChapterUpdate::QuizCompleted => chapter_progress::Column::QuizCompleted,
        }
    }
}

#[async_trait]
impl ProgressStore for SeaOrmProgressRepository {
    async fn get_chapter(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        chapter_id: &ChapterId,
    ) -> Result<Option<ChapterRecord>, StoreError> {
        let model = chapter_progress::Entity::find_by_id((
            user_id.to_string(),
            course_id.to_string(),
            chapter_id.to_string(),
        ))
        .one(&self.db)
        .await
        .map_err(store_error)?;

        Ok(model.map(Self::map_model))
    }

    /// 冲突时只覆盖被更新的列，另一个标志保持数据库中的值。
    async fn update_chapter(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        chapter_id: &ChapterId,
        update: ChapterUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<ChapterRecord, StoreError> {
        let mut initial = ChapterRecord::new(chapter_id.clone());
        update.apply(&mut initial);

        let active_model = chapter_progress::ActiveModel {
            user_id: Set(user_id.to_string()),
            course_id: Set(course_id.to_string()),
            chapter_id: Set(chapter_id.to_string()),
            completed: Set(initial.completed),
            quiz_completed: Set(initial.quiz_completed),
            updated_at: Set(updated_at),
        };

        chapter_progress::Entity::insert(active_model)
            .on_conflict(
                OnConflict::columns([
                    chapter_progress::Column::UserId,
                    chapter_progress::Column::CourseId,
                    chapter_progress::Column::ChapterId,
                ])
                .update_columns([
                    Self::updated_column(update),
                    chapter_progress::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(store_error)?;

        self.get_chapter(user_id, course_id, chapter_id)
            .await?
            .ok_or_else(|| {
                StoreError::Permanent(format!("chapter progress for {chapter_id} vanished after upsert"))
            })
    }

    async fn query_course(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Vec<ChapterRecord>, StoreError> {
        let models = chapter_progress::Entity::find()
            .filter(chapter_progress::Column::UserId.eq(user_id.as_str()))
            .filter(chapter_progress::Column::CourseId.eq(course_id.as_str()))
            .all(&self.db)
            .await
            .map_err(store_error)?;

        Ok(models.into_iter().map(Self::map_model).collect())
    }
}
