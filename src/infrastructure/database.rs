// Database Interface - the relational store surface every repository talks to
// Each method is one remote call: select / insert / update / delete / upsert / count

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{
    Comment, CommentRow, CredentialRecord, MembershipKind, Message, NewUser, Notification,
    NotificationId, Post, PostFilter, PostId, PostRow, ProfileUpdate, User, UserId,
};

#[async_trait]
pub trait SocialStore: Send + Sync {
    // Identity provider credentials
    async fn create_credentials(&self, record: &CredentialRecord) -> AppResult<()>;
    async fn credentials_by_email(&self, email: &str) -> AppResult<Option<CredentialRecord>>;
    async fn credentials_by_id(&self, user_id: UserId) -> AppResult<Option<CredentialRecord>>;
    async fn update_password_hash(&self, user_id: UserId, password_hash: &str) -> AppResult<()>;

    // Users
    /// Insert the row, or fill identity-derived fields that are still unset.
    async fn upsert_user(&self, user: &NewUser) -> AppResult<()>;
    async fn get_user(&self, id: UserId) -> AppResult<Option<User>>;
    async fn users_by_ids(&self, ids: &[UserId]) -> AppResult<Vec<User>>;
    /// Returns false when no row matched.
    async fn update_user(&self, id: UserId, update: &ProfileUpdate) -> AppResult<bool>;
    async fn list_users(&self, exclude: &[UserId], limit: i64) -> AppResult<Vec<User>>;

    // Posts
    async fn insert_post(&self, post: &Post) -> AppResult<()>;
    async fn get_post(&self, id: PostId) -> AppResult<Option<Post>>;
    async fn posts_by_ids(&self, ids: &[PostId]) -> AppResult<Vec<Post>>;
    /// Deletes only when `author_id` owns the post; dependent rows cascade.
    async fn delete_post(&self, id: PostId, author_id: UserId) -> AppResult<bool>;
    /// Posts joined to their author projection and aggregate counts, newest first.
    async fn query_posts(&self, filter: &PostFilter) -> AppResult<Vec<PostRow>>;

    // Viewer -> post memberships (likes, shares, saved_posts)
    /// Flip membership in one write transaction and return the new state.
    /// `NotFound` when the post does not exist.
    async fn toggle_membership(&self, kind: MembershipKind, user_id: UserId, post_id: PostId)
        -> AppResult<bool>;
    /// Post ids in the user's membership set, most recent membership first.
    async fn membership_post_ids(&self, kind: MembershipKind, user_id: UserId)
        -> AppResult<Vec<PostId>>;

    // Follow graph
    /// Returns false when the edge already existed.
    async fn insert_follow(&self, follower_id: UserId, following_id: UserId) -> AppResult<bool>;
    async fn delete_follow(&self, follower_id: UserId, following_id: UserId) -> AppResult<bool>;
    /// Flip the edge in one write transaction and return whether it now exists.
    async fn toggle_follow(&self, follower_id: UserId, following_id: UserId) -> AppResult<bool>;
    async fn follow_exists(&self, follower_id: UserId, following_id: UserId) -> AppResult<bool>;
    async fn following_ids(&self, follower_ids: &[UserId]) -> AppResult<Vec<UserId>>;
    async fn follower_ids(&self, following_id: UserId) -> AppResult<Vec<UserId>>;
    async fn count_following(&self, user_id: UserId) -> AppResult<u64>;
    async fn count_followers(&self, user_id: UserId) -> AppResult<u64>;

    // Comments
    async fn insert_comment(&self, comment: &Comment) -> AppResult<()>;
    /// Oldest first, joined to the author projection.
    async fn comments_for_post(&self, post_id: PostId) -> AppResult<Vec<CommentRow>>;
    /// Newest first.
    async fn comments_for_posts(&self, post_ids: &[PostId]) -> AppResult<Vec<Comment>>;

    // Messages
    async fn insert_message(&self, message: &Message) -> AppResult<()>;
    /// Newest first.
    async fn messages_sent_by(&self, sender_id: UserId) -> AppResult<Vec<Message>>;
    /// Newest first.
    async fn messages_received_by(&self, receiver_id: UserId) -> AppResult<Vec<Message>>;
    /// One direction only, oldest first.
    async fn messages_from_to(&self, sender_id: UserId, receiver_id: UserId)
        -> AppResult<Vec<Message>>;
    async fn mark_messages_read(&self, receiver_id: UserId, sender_id: UserId) -> AppResult<u64>;

    // Notifications
    async fn insert_notification(&self, notification: &Notification) -> AppResult<()>;
    /// Newest first.
    async fn notifications_for(&self, recipient_id: UserId) -> AppResult<Vec<Notification>>;
    /// Marks the given ids (or every unread row when `None`) belonging to the recipient.
    async fn mark_notifications_read(
        &self,
        recipient_id: UserId,
        ids: Option<&[NotificationId]>,
    ) -> AppResult<u64>;
}
