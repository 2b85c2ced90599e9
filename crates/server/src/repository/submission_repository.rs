use crate::entity::submission;
use crate::repository::store_error;
use assignment_engine::store::{InsertOutcome, StoreError, SubmissionStore};
use async_trait::async_trait;
use codelab_core::domain::{
    AssignmentId, ChapterId, CourseId, EvaluationVerdict, Language, SectionId, Submission,
    SubmissionId, UserId,
};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::str::FromStr;

#[derive(Clone)]
pub struct SeaOrmSubmissionRepository {
    db: DatabaseConnection,
}

impl SeaOrmSubmissionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn map_model(model: submission::Model) -> Result<Submission, StoreError> {
        let submission_id = SubmissionId::from_str(&model.id).map_err(|e| {
            StoreError::Permanent(format!("invalid submission.id '{}' from database: {e}", model.id))
        })?;
        let language = Language::from_str(&model.language).map_err(|e| {
            StoreError::Permanent(format!("invalid submission.language from database: {e}"))
        })?;
        let evaluation: EvaluationVerdict = serde_json::from_str(&model.evaluation).map_err(|e| {
            StoreError::Permanent(format!(
                "invalid submission.evaluation for '{}' from database: {e}",
                model.id
            ))
        })?;

        Ok(Submission {
            submission_id,
            user_id: UserId::new(model.user_id),
            course_id: CourseId::new(model.course_id),
            section_id: model.section_id.map(SectionId::new),
            chapter_id: ChapterId::new(model.chapter_id),
            assignment_id: AssignmentId::new(model.assignment_id),
            language,
            source_text: model.source_text,
            evaluation,
            created_at: model.created_at,
        })
    }

    fn active_model(submission: &Submission) -> Result<submission::ActiveModel, StoreError> {
        let evaluation = serde_json::to_string(&submission.evaluation)
            .map_err(|e| StoreError::Permanent(format!("failed to encode verdict: {e}")))?;
        let score = i16::try_from(submission.evaluation.score.value())
            .map_err(|e| StoreError::Permanent(format!("score out of range: {e}")))?;

        Ok(submission::ActiveModel {
            id: Set(submission.submission_id.to_string()),
            user_id: Set(submission.user_id.to_string()),
            course_id: Set(submission.course_id.to_string()),
            section_id: Set(submission.section_id.as_ref().map(ToString::to_string)),
            chapter_id: Set(submission.chapter_id.to_string()),
            assignment_id: Set(submission.assignment_id.to_string()),
            language: Set(submission.language.as_str().to_string()),
            source_text: Set(submission.source_text.clone()),
            evaluation: Set(evaluation),
            passed: Set(submission.evaluation.passed),
            score: Set(score),
            created_at: Set(submission.created_at),
        })
    }
}

#[async_trait]
impl SubmissionStore for SeaOrmSubmissionRepository {
    async fn insert_if_absent(&self, submission: &Submission) -> Result<InsertOutcome, StoreError> {
        let inserted = submission::Entity::insert(Self::active_model(submission)?)
            .on_conflict(
                OnConflict::column(submission::Column::Id)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(store_error)?;

        Ok(if inserted == 0 {
            InsertOutcome::AlreadyExists
        } else {
            InsertOutcome::Inserted
        })
    }

    async fn get(&self, submission_id: SubmissionId) -> Result<Option<Submission>, StoreError> {
        let model = submission::Entity::find_by_id(submission_id.to_string())
            .one(&self.db)
            .await
            .map_err(store_error)?;

        model.map(Self::map_model).transpose()
    }

    async fn query_by_assignment(
        &self,
        course_id: &CourseId,
        chapter_id: &ChapterId,
        assignment_id: &AssignmentId,
    ) -> Result<Vec<Submission>, StoreError> {
        let models = submission::Entity::find()
            .filter(submission::Column::CourseId.eq(course_id.as_str()))
            .filter(submission::Column::ChapterId.eq(chapter_id.as_str()))
            .filter(submission::Column::AssignmentId.eq(assignment_id.as_str()))
            .order_by_asc(submission::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(store_error)?;

        models.into_iter().map(Self::map_model).collect()
    }

    async fn query_by_user(
        &self,
        user_id: &UserId,
        course_id: Option<&CourseId>,
    ) -> Result<Vec<Submission>, StoreError> {
        let mut query =
            submission::Entity::find().filter(submission::Column::UserId.eq(user_id.as_str()));
        if let Some(course_id) = course_id {
            query = query.filter(submission::Column::CourseId.eq(course_id.as_str()));
        }

        let models = query
            .order_by_asc(submission::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(store_error)?;

        models.into_iter().map(Self::map_model).collect()
    }
}
