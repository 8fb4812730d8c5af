// Failing store - wraps a real store and fails the named calls on demand

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use social_hub::error::{AppError, AppResult};
use social_hub::infrastructure::SocialStore;
use social_hub::models::{
    Comment, CommentRow, CredentialRecord, MembershipKind, Message, NewUser, Notification,
    NotificationId, Post, PostFilter, PostId, PostRow, ProfileUpdate, User, UserId,
};

pub struct FailingStore {
    inner: Arc<dyn SocialStore>,
    failing: Mutex<HashSet<&'static str>>,
    attempted: Mutex<Vec<&'static str>>,
}

impl FailingStore {
    pub fn new(inner: Arc<dyn SocialStore>) -> Self {
        Self {
            inner,
            failing: Mutex::new(HashSet::new()),
            attempted: Mutex::new(Vec::new()),
        }
    }

    pub fn fail(&self, method: &'static str) {
        self.failing.lock().unwrap().insert(method);
    }

    pub fn heal(&self, method: &'static str) {
        self.failing.lock().unwrap().remove(method);
    }

    /// Whether a failing call to `method` was attempted
    pub fn was_failed(&self, method: &'static str) -> bool {
        self.attempted.lock().unwrap().contains(&method)
    }

    fn check(&self, method: &'static str) -> AppResult<()> {
        if self.failing.lock().unwrap().contains(method) {
            self.attempted.lock().unwrap().push(method);
            return Err(AppError::RemoteFailure(format!("{}: connection reset", method)));
        }
        Ok(())
    }
}

#[async_trait]
impl SocialStore for FailingStore {
    async fn create_credentials(&self, record: &CredentialRecord) -> AppResult<()> {
        self.check("create_credentials")?;
        self.inner.create_credentials(record).await
    }

    async fn credentials_by_email(&self, email: &str) -> AppResult<Option<CredentialRecord>> {
        self.check("credentials_by_email")?;
        self.inner.credentials_by_email(email).await
    }

    async fn credentials_by_id(&self, user_id: UserId) -> AppResult<Option<CredentialRecord>> {
        self.check("credentials_by_id")?;
        self.inner.credentials_by_id(user_id).await
    }

    async fn update_password_hash(&self, user_id: UserId, password_hash: &str) -> AppResult<()> {
        self.check("update_password_hash")?;
        self.inner.update_password_hash(user_id, password_hash).await
    }

    async fn upsert_user(&self, user: &NewUser) -> AppResult<()> {
        self.check("upsert_user")?;
        self.inner.upsert_user(user).await
    }

    async fn get_user(&self, id: UserId) -> AppResult<Option<User>> {
        self.check("get_user")?;
        self.inner.get_user(id).await
    }

    async fn users_by_ids(&self, ids: &[UserId]) -> AppResult<Vec<User>> {
        self.check("users_by_ids")?;
        self.inner.users_by_ids(ids).await
    }

    async fn update_user(&self, id: UserId, update: &ProfileUpdate) -> AppResult<bool> {
        self.check("update_user")?;
        self.inner.update_user(id, update).await
    }

    async fn list_users(&self, exclude: &[UserId], limit: i64) -> AppResult<Vec<User>> {
        self.check("list_users")?;
        self.inner.list_users(exclude, limit).await
    }

    async fn insert_post(&self, post: &Post) -> AppResult<()> {
        self.check("insert_post")?;
        self.inner.insert_post(post).await
    }

    async fn get_post(&self, id: PostId) -> AppResult<Option<Post>> {
        self.check("get_post")?;
        self.inner.get_post(id).await
    }

    async fn posts_by_ids(&self, ids: &[PostId]) -> AppResult<Vec<Post>> {
        self.check("posts_by_ids")?;
        self.inner.posts_by_ids(ids).await
    }

    async fn delete_post(&self, id: PostId, author_id: UserId) -> AppResult<bool> {
        self.check("delete_post")?;
        self.inner.delete_post(id, author_id).await
    }

    async fn query_posts(&self, filter: &PostFilter) -> AppResult<Vec<PostRow>> {
        self.check("query_posts")?;
        self.inner.query_posts(filter).await
    }

    async fn toggle_membership(
        &self,
        kind: MembershipKind,
        user_id: UserId,
        post_id: PostId,
    ) -> AppResult<bool> {
        self.check("toggle_membership")?;
        self.inner.toggle_membership(kind, user_id, post_id).await
    }

    async fn membership_post_ids(
        &self,
        kind: MembershipKind,
        user_id: UserId,
    ) -> AppResult<Vec<PostId>> {
        self.check("membership_post_ids")?;
        self.inner.membership_post_ids(kind, user_id).await
    }

    async fn insert_follow(&self, follower_id: UserId, following_id: UserId) -> AppResult<bool> {
        self.check("insert_follow")?;
        self.inner.insert_follow(follower_id, following_id).await
    }

    async fn delete_follow(&self, follower_id: UserId, following_id: UserId) -> AppResult<bool> {
        self.check("delete_follow")?;
        self.inner.delete_follow(follower_id, following_id).await
    }

    async fn toggle_follow(&self, follower_id: UserId, following_id: UserId) -> AppResult<bool> {
        self.check("toggle_follow")?;
        self.inner.toggle_follow(follower_id, following_id).await
    }

    async fn follow_exists(&self, follower_id: UserId, following_id: UserId) -> AppResult<bool> {
        self.check("follow_exists")?;
        self.inner.follow_exists(follower_id, following_id).await
    }

    async fn following_ids(&self, follower_ids: &[UserId]) -> AppResult<Vec<UserId>> {
        self.check("following_ids")?;
        self.inner.following_ids(follower_ids).await
    }

    async fn follower_ids(&self, following_id: UserId) -> AppResult<Vec<UserId>> {
        self.check("follower_ids")?;
        self.inner.follower_ids(following_id).await
    }

    async fn count_following(&self, user_id: UserId) -> AppResult<u64> {
        self.check("count_following")?;
        self.inner.count_following(user_id).await
    }

    async fn count_followers(&self, user_id: UserId) -> AppResult<u64> {
        self.check("count_followers")?;
        self.inner.count_followers(user_id).await
    }

    async fn insert_comment(&self, comment: &Comment) -> AppResult<()> {
        self.check("insert_comment")?;
        self.inner.insert_comment(comment).await
    }

    async fn comments_for_post(&self, post_id: PostId) -> AppResult<Vec<CommentRow>> {
        self.check("comments_for_post")?;
        self.inner.comments_for_post(post_id).await
    }

    async fn comments_for_posts(&self, post_ids: &[PostId]) -> AppResult<Vec<Comment>> {
        self.check("comments_for_posts")?;
        self.inner.comments_for_posts(post_ids).await
    }

    async fn insert_message(&self, message: &Message) -> AppResult<()> {
        self.check("insert_message")?;
        self.inner.insert_message(message).await
    }

    async fn messages_sent_by(&self, sender_id: UserId) -> AppResult<Vec<Message>> {
        self.check("messages_sent_by")?;
        self.inner.messages_sent_by(sender_id).await
    }

    async fn messages_received_by(&self, receiver_id: UserId) -> AppResult<Vec<Message>> {
        self.check("messages_received_by")?;
        self.inner.messages_received_by(receiver_id).await
    }

    async fn messages_from_to(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
    ) -> AppResult<Vec<Message>> {
        self.check("messages_from_to")?;
        self.inner.messages_from_to(sender_id, receiver_id).await
    }

    async fn mark_messages_read(&self, receiver_id: UserId, sender_id: UserId) -> AppResult<u64> {
        self.check("mark_messages_read")?;
        self.inner.mark_messages_read(receiver_id, sender_id).await
    }

    async fn insert_notification(&self, notification: &Notification) -> AppResult<()> {
        self.check("insert_notification")?;
        self.inner.insert_notification(notification).await
    }

    async fn notifications_for(&self, recipient_id: UserId) -> AppResult<Vec<Notification>> {
        self.check("notifications_for")?;
        self.inner.notifications_for(recipient_id).await
    }

    async fn mark_notifications_read(
        &self,
        recipient_id: UserId,
        ids: Option<&[NotificationId]>,
    ) -> AppResult<u64> {
        self.check("mark_notifications_read")?;
        self.inner.mark_notifications_read(recipient_id, ids).await
    }
}
