pub mod chapter_progress;
pub mod submission;
