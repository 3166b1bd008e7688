//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod device_token_repo;
pub mod member_repo;
pub mod notification_log_repo;
pub mod provider_repo;
pub mod tenant_repo;

pub use device_token_repo::DeviceTokenRepo;
pub use member_repo::MemberRepo;
pub use notification_log_repo::NotificationLogRepo;
pub use provider_repo::ProviderRepo;
pub use tenant_repo::TenantRepo;
