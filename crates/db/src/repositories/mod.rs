//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that take
//! `&PgPool`, a `&mut PgConnection` from an open transaction, or any
//! `PgExecutor` as the first argument.

pub mod comment_repo;
pub mod dashboard_repo;
pub mod event_repo;
pub mod history_repo;
pub mod note_repo;
pub mod notification_repo;
pub mod reception_repo;
pub mod template_repo;
pub mod user_repo;

pub use comment_repo::CommentRepo;
pub use dashboard_repo::DashboardRepo;
pub use event_repo::EventRepo;
pub use history_repo::HistoryRepo;
pub use note_repo::NoteRepo;
pub use notification_repo::NotificationRepo;
pub use reception_repo::ReceptionRepo;
pub use template_repo::TemplateRepo;
pub use user_repo::UserRepo;
