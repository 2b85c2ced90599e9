use serde::{Deserialize, Serialize};

use super::{AssignmentId, ChapterId, CourseId, SectionId};

/// Course structure as published by the content layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseOutline {
    pub course_id: CourseId,
    pub sections: Vec<SectionOutline>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionOutline {
    pub section_id: SectionId,
    pub chapters: Vec<ChapterOutline>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterOutline {
    pub chapter_id: ChapterId,
    #[serde(default)]
    pub assignments: Vec<AssignmentId>,
}

impl CourseOutline {
    pub fn find_chapter(&self, chapter_id: &ChapterId) -> Option<(&SectionOutline, &ChapterOutline)> {
        self.sections.iter().find_map(|section| {
            section
                .chapters
                .iter()
                .find(|chapter| &chapter.chapter_id == chapter_id)
                .map(|chapter| (section, chapter))
        })
    }
}
