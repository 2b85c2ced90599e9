use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AssignmentId, ChapterId, ChapterOutline, CourseId, CourseOutline, SectionId, Submission, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterState {
    NotStarted,
    InProgress,
    Completed,
}

/// Explicitly written progress for one (learner, course, chapter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRecord {
    pub chapter_id: ChapterId,
    pub completed: bool,
    pub quiz_completed: bool,
    pub updated_at: DateTime<Utc>,
}

impl ChapterRecord {
    pub fn new(chapter_id: ChapterId) -> Self {
        Self {
            chapter_id,
            completed: false,
            quiz_completed: false,
            updated_at: Utc::now(),
        }
    }
}

/// A change to one column of a chapter record. Stores apply it without
/// rewriting the other columns, so concurrent updates to different flags
/// do not overwrite each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterUpdate {
    Completed(bool),
    QuizCompleted,
}

impl ChapterUpdate {
    pub fn apply(self, record: &mut ChapterRecord) {
        match self {
            ChapterUpdate::Completed(completed) => record.completed = completed,
            ChapterUpdate::QuizCompleted => record.quiz_completed = true,
        }
    }
}

/// What a learner has submitted within one course.
///
/// Assignment ids are only unique within their chapter, so submissions are
/// keyed by `(chapter, assignment)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LearnerActivity {
    submitted: HashSet<(ChapterId, AssignmentId)>,
    chapters_with_submissions: HashSet<ChapterId>,
}

impl LearnerActivity {
    pub fn from_submissions<'a>(submissions: impl IntoIterator<Item = &'a Submission>) -> Self {
        let mut activity = Self::default();
        for submission in submissions {
            activity.submitted.insert((
                submission.chapter_id.clone(),
                submission.assignment_id.clone(),
            ));
            activity
                .chapters_with_submissions
                .insert(submission.chapter_id.clone());
        }
        activity
    }

    pub fn has_submitted(&self, chapter_id: &ChapterId, assignment_id: &AssignmentId) -> bool {
        self.submitted
            .contains(&(chapter_id.clone(), assignment_id.clone()))
    }

    pub fn touched_chapter(&self, chapter_id: &ChapterId) -> bool {
        self.chapters_with_submissions.contains(chapter_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterProgress {
    pub chapter_id: ChapterId,
    /// Stored explicit completion flag. Authoritative for `state`.
    pub completed: bool,
    pub quiz_completed: bool,
    pub state: ChapterState,
    /// Derived: every assignment of the chapter has at least one submission.
    pub assignments_satisfied: bool,
    pub missing_assignments: Vec<AssignmentId>,
}

impl ChapterProgress {
    pub fn derive(
        chapter: &ChapterOutline,
        record: Option<&ChapterRecord>,
        activity: &LearnerActivity,
    ) -> Self {
        let missing_assignments: Vec<AssignmentId> = chapter
            .assignments
            .iter()
            .filter(|assignment_id| !activity.has_submitted(&chapter.chapter_id, assignment_id))
            .cloned()
            .collect();

        let completed = record.is_some_and(|record| record.completed);
        let quiz_completed = record.is_some_and(|record| record.quiz_completed);

        let state = if completed {
            ChapterState::Completed
        } else if record.is_some() || activity.touched_chapter(&chapter.chapter_id) {
            ChapterState::InProgress
        } else {
            ChapterState::NotStarted
        };

        Self {
            chapter_id: chapter.chapter_id.clone(),
            completed,
            quiz_completed,
            state,
            assignments_satisfied: missing_assignments.is_empty(),
            missing_assignments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionProgress {
    pub section_id: SectionId,
    pub chapters: Vec<ChapterProgress>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseProgress {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub sections: Vec<SectionProgress>,
    /// Percentage in `[0, 100]`, recomputed on every projection.
    pub overall_progress: f64,
}

impl CourseProgress {
    /// Projects stored records and submissions onto the course outline.
    /// Records for chapters no longer in the outline are ignored.
    pub fn project(
        user_id: UserId,
        outline: &CourseOutline,
        records: &[ChapterRecord],
        activity: &LearnerActivity,
    ) -> Self {
        let by_chapter: HashMap<&ChapterId, &ChapterRecord> = records
            .iter()
            .map(|record| (&record.chapter_id, record))
            .collect();

        let sections: Vec<SectionProgress> = outline
            .sections
            .iter()
            .map(|section| SectionProgress {
                section_id: section.section_id.clone(),
                chapters: section
                    .chapters
                    .iter()
                    .map(|chapter| {
                        ChapterProgress::derive(
                            chapter,
                            by_chapter.get(&chapter.chapter_id).copied(),
                            activity,
                        )
                    })
                    .collect(),
            })
            .collect();

        let total = sections.iter().map(|section| section.chapters.len()).sum();
        let completed = sections
            .iter()
            .flat_map(|section| section.chapters.iter())
            .filter(|chapter| chapter.state == ChapterState::Completed)
            .count();

        Self {
            user_id,
            course_id: outline.course_id.clone(),
            sections,
            overall_progress: overall_progress(completed, total),
        }
    }

    pub fn chapter(&self, chapter_id: &ChapterId) -> Option<&ChapterProgress> {
        self.sections
            .iter()
            .flat_map(|section| section.chapters.iter())
            .find(|chapter| &chapter.chapter_id == chapter_id)
    }
}

pub fn overall_progress(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    completed as f64 * 100.0 / total as f64
}
