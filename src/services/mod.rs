// Social services - one per repository, each over the shared SocialStore

pub mod comment_service;
pub mod feed_service;
pub mod follow_service;
pub mod interaction_service;
pub mod message_service;
pub mod notification_service;
pub mod post_service;
pub mod profile_service;

pub use comment_service::CommentService;
pub use feed_service::FeedService;
pub use follow_service::{FollowCounts, FollowService};
pub use interaction_service::InteractionService;
pub use message_service::MessageService;
pub use notification_service::NotificationService;
pub use post_service::PostService;
pub use profile_service::ProfileService;
