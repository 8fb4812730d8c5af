// Social data model - rows as they live in the store, plus the view models handed to callers

pub mod views;

use serde::{Deserialize, Serialize};

pub use views::{
    CommentAuthor, CommentView, ConversationView, MessageDirection, NotificationView, PostView,
    ProfileView, SuggestedProfile, ThreadMessage,
};

/// Entity identifiers are Snowflake-style ids from `IdGenerator`.
pub type UserId = i64;
pub type PostId = i64;
pub type CommentId = i64;
pub type MessageId = i64;
pub type NotificationId = i64;

/// Milliseconds since the Unix epoch.
pub type Millis = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub date_of_birth: Option<String>,
    pub created_at: Millis,
    pub updated_at: Millis,
}

/// The subset of a user row embedded next to posts, comments and notifications.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AuthorProfile {
    pub id: UserId,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl AuthorProfile {
    /// True when no field usable for a display name is set.
    pub fn is_incomplete(&self) -> bool {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        blank(&self.username) && blank(&self.first_name) && blank(&self.last_name)
    }
}

impl From<&User> for AuthorProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: Some(user.username.clone()),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// Identity-derived fields written by profile provisioning.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub id: UserId,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub date_of_birth: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self == &ProfileUpdate::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub content: String,
    pub image_url: Option<String>,
    pub created_at: Millis,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCounts {
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
}

/// A related row as returned by a join: a single object, a list, or nothing at all.
#[derive(Debug, Clone, PartialEq)]
pub enum Embedded<T> {
    Object(T),
    List(Vec<T>),
    Absent,
}

pub trait Keyed {
    fn key(&self) -> i64;
}

impl Keyed for AuthorProfile {
    fn key(&self) -> i64 {
        self.id
    }
}

impl<T: Keyed> Embedded<T> {
    pub fn is_present(&self) -> bool {
        match self {
            Embedded::Object(_) => true,
            Embedded::List(items) => !items.is_empty(),
            Embedded::Absent => false,
        }
    }

    /// Pick the related row for `expected`. A list prefers the matching key and falls
    /// back to its first element; a single object must match when a key is expected.
    pub fn resolve(self, expected: Option<i64>) -> Option<T> {
        match self {
            Embedded::Object(item) => match expected {
                Some(key) if item.key() != key => None,
                _ => Some(item),
            },
            Embedded::List(items) => {
                let position = expected
                    .and_then(|key| items.iter().position(|item| item.key() == key))
                    .unwrap_or(0);
                items.into_iter().nth(position)
            }
            Embedded::Absent => None,
        }
    }
}

/// A post joined with its author projection and aggregate counts.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRow {
    pub post: Post,
    pub author: Embedded<AuthorProfile>,
    pub counts: PostCounts,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PostFilter {
    All,
    Authors(Vec<UserId>),
    Author(UserId),
    Ids(Vec<PostId>),
}

/// Viewer -> post membership tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MembershipKind {
    Like,
    Share,
    Save,
}

impl MembershipKind {
    pub fn table(&self) -> &'static str {
        match self {
            MembershipKind::Like => "likes",
            MembershipKind::Share => "shares",
            MembershipKind::Save => "saved_posts",
        }
    }

    /// Notification emitted to the post author when the membership is created.
    pub fn notification(&self) -> Option<NotificationType> {
        match self {
            MembershipKind::Like => Some(NotificationType::Like),
            MembershipKind::Share => Some(NotificationType::Share),
            MembershipKind::Save => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: UserId,
    pub content: String,
    pub created_at: Millis,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentRow {
    pub comment: Comment,
    pub author: Embedded<AuthorProfile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub created_at: Millis,
    pub is_read: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Like,
    Comment,
    Share,
    Follow,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Like => "like",
            NotificationType::Comment => "comment",
            NotificationType::Share => "share",
            NotificationType::Follow => "follow",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "like" => Some(NotificationType::Like),
            "comment" => Some(NotificationType::Comment),
            "share" => Some(NotificationType::Share),
            "follow" => Some(NotificationType::Follow),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_id: UserId,
    pub actor_id: UserId,
    pub post_id: Option<PostId>,
    pub kind: NotificationType,
    pub created_at: Millis,
    pub is_read: bool,
}

/// Free-form metadata attached to an identity at sign-up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    pub username: Option<String>,
    pub name: Option<String>,
    #[serde(alias = "avatarUrl")]
    pub avatar_url: Option<String>,
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub email: Option<String>,
    pub metadata: UserMetadata,
}

/// Identity provider row.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialRecord {
    pub user_id: UserId,
    pub email: String,
    pub password_hash: String,
    pub metadata: UserMetadata,
    pub created_at: Millis,
}

impl CredentialRecord {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.user_id,
            email: Some(self.email.clone()),
            metadata: self.metadata.clone(),
        }
    }
}

/// Named feed compositions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedView {
    /// Viewer's own posts plus posts from followed users.
    ForYou,
    /// Posts from followed users only.
    Following,
    /// Every post.
    Explore,
    /// Posts by one author.
    Author(UserId),
}

impl FeedView {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "for-you" | "for_you" | "foryou" => Some(FeedView::ForYou),
            "following" => Some(FeedView::Following),
            "explore" | "global" => Some(FeedView::Explore),
            _ => None,
        }
    }
}
