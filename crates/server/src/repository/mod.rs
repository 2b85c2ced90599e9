use sea_orm::DbErr;

use assignment_engine::store::StoreError;

pub mod progress_repository;
pub mod submission_repository;

pub use progress_repository::SeaOrmProgressRepository;
pub use submission_repository::SeaOrmSubmissionRepository;

/// 连接类错误可以重试，其余错误直接上报。
pub(crate) fn store_error(err: DbErr) -> StoreError {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => StoreError::Transient(err.to_string()),
        other => StoreError::Permanent(other.to_string()),
    }
}
