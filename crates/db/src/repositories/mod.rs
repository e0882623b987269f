pub mod agreement_score_repository;
pub mod annotation_repository;
pub mod annotation_review_repository;
pub mod billing_repository;
pub mod dataset_item_repository;
pub mod dataset_repository;
pub mod dataset_version_repository;
pub mod media_repository;
pub mod media_source_repository;
pub mod project_repository;
pub mod session_repository;
pub mod task_queue_repository;
pub mod training_job_repository;
pub mod user_repository;

pub use agreement_score_repository::AgreementScoreRepository;
pub use annotation_repository::AnnotationRepository;
pub use annotation_review_repository::AnnotationReviewRepository;
pub use billing_repository::BillingRepository;
pub use dataset_item_repository::DatasetItemRepository;
pub use dataset_repository::DatasetRepository;
pub use dataset_version_repository::DatasetVersionRepository;
pub use media_repository::MediaRepository;
pub use media_source_repository::MediaSourceRepository;
pub use project_repository::{ProjectMemberRepository, ProjectRepository};
pub use session_repository::SessionRepository;
pub use task_queue_repository::TaskQueueRepository;
pub use training_job_repository::TrainingJobRepository;
pub use user_repository::UserRepository;
