// View models returned by the services and serialized by the HTTP layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CommentId, MessageId, NotificationId, NotificationType, PostId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: PostId,
    pub user_id: UserId,
    pub author: String,
    pub handle: String,
    pub avatar_url: String,
    pub image_url: String,
    pub caption: String,
    pub liked: bool,
    pub likes: u64,
    pub comments: u64,
    pub shared: bool,
    pub shares: u64,
    pub saved: bool,
    pub following: bool,
    pub time_ago: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub username: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: CommentId,
    pub post_id: PostId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author: CommentAuthor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    /// The counterparty's user id.
    pub id: UserId,
    pub name: String,
    pub handle: String,
    pub status: String,
    pub avatar_url: String,
    pub last_message: String,
    pub last_active: String,
    pub last_message_at: DateTime<Utc>,
    pub unread: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    You,
    Them,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadMessage {
    pub id: MessageId,
    pub from: MessageDirection,
    pub text: String,
    pub time: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub user_id: UserId,
    pub user_avatar: String,
    pub user_name: String,
    pub user_handle: String,
    pub post_id: Option<PostId>,
    pub post_image_url: Option<String>,
    pub comment_content: Option<String>,
    pub time_ago: String,
    pub is_read: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub date_of_birth: Option<String>,
    pub following_count: u64,
    pub follower_count: u64,
    pub is_following: bool,
    pub is_own_profile: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedProfile {
    pub id: UserId,
    pub name: String,
    pub handle: String,
    pub avatar_url: String,
    pub is_following: bool,
    pub reason: String,
}
