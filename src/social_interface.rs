// Social Interface - single entry point bundling the session provider and every service
// Used by the HTTP router below and by the presentation layer

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::HeaderMap,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, patch, post},
    Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::SocialStore;
use crate::infrastructure::id_generator::IdGenerator;
use crate::infrastructure::middleware::{
    extract_bearer_token, viewer_context_middleware, HasAuthService, Vc,
};
use crate::infrastructure::object_storage::{LocalObjectStorage, ObjectStorage};
use crate::infrastructure::security::{AuthService, Session};
use crate::infrastructure::sqlite_database::SqliteStore;
use crate::infrastructure::viewer::ViewerContext;
use crate::models::{
    CommentView, FeedView, Identity, Post, PostId, PostView, ProfileUpdate, UserId, UserMetadata,
};
use crate::presentation::FeedController;
use crate::services::{
    CommentService, FeedService, FollowService, InteractionService, MessageService,
    NotificationService, PostService, ProfileService,
};

const DEFAULT_SUGGESTION_LIMIT: usize = 5;

#[derive(Clone)]
pub struct SocialInterface {
    store: Arc<dyn SocialStore>,
    auth: Arc<AuthService>,
    profiles: Arc<ProfileService>,
    follows: Arc<FollowService>,
    posts: Arc<PostService>,
    feed: Arc<FeedService>,
    interactions: Arc<InteractionService>,
    comments: Arc<CommentService>,
    messages: Arc<MessageService>,
    notifications: Arc<NotificationService>,
    view_capacity: usize,
}

impl SocialInterface {
    pub fn new(store: Arc<dyn SocialStore>, storage: Arc<dyn ObjectStorage>, config: &Config) -> Self {
        let ids = Arc::new(IdGenerator::new(config.node_id));
        let bucket = config.storage.bucket.as_str();
        let posts = Arc::new(PostService::new(store.clone(), storage.clone(), ids.clone(), bucket));

        Self {
            auth: Arc::new(AuthService::new(store.clone(), ids.clone(), config.session.ttl_secs)),
            profiles: Arc::new(ProfileService::new(store.clone(), storage, bucket)),
            follows: Arc::new(FollowService::new(store.clone(), ids.clone())),
            feed: Arc::new(FeedService::new(store.clone(), posts.clone())),
            interactions: Arc::new(InteractionService::new(store.clone(), ids.clone())),
            comments: Arc::new(CommentService::new(store.clone(), ids.clone())),
            messages: Arc::new(MessageService::new(store.clone(), ids)),
            notifications: Arc::new(NotificationService::new(store.clone())),
            posts,
            store,
            view_capacity: config.cache.view_capacity,
        }
    }

    /// SQLite store and on-disk object storage as configured
    pub async fn from_config(config: &Config) -> AppResult<Self> {
        let sqlite = SqliteStore::connect(&config.database.url).await?;
        sqlite.health_check().await?;
        let store: Arc<dyn SocialStore> = Arc::new(sqlite);
        let storage: Arc<dyn ObjectStorage> = Arc::new(LocalObjectStorage::new(
            &config.storage.root,
            &config.storage.public_url,
        ));
        Ok(Self::new(store, storage, config))
    }

    pub fn store(&self) -> &Arc<dyn SocialStore> {
        &self.store
    }

    pub fn auth(&self) -> &Arc<AuthService> {
        &self.auth
    }

    pub fn profiles(&self) -> &ProfileService {
        &self.profiles
    }

    pub fn follows(&self) -> &FollowService {
        &self.follows
    }

    pub fn posts(&self) -> &PostService {
        &self.posts
    }

    pub fn feed(&self) -> &FeedService {
        &self.feed
    }

    pub fn interactions(&self) -> &InteractionService {
        &self.interactions
    }

    pub fn comments(&self) -> &CommentService {
        &self.comments
    }

    pub fn messages(&self) -> &MessageService {
        &self.messages
    }

    pub fn notifications(&self) -> &NotificationService {
        &self.notifications
    }

    /// Register, then provision the user row
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: UserMetadata,
    ) -> AppResult<Session> {
        let session = self.auth.sign_up(email, password, metadata).await?;
        self.profiles.ensure_profile(&session.identity).await?;
        Ok(session)
    }

    /// Sign in, then make sure the user row exists
    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<Session> {
        let session = self.auth.sign_in(email, password).await?;
        self.profiles.ensure_profile(&session.identity).await?;
        Ok(session)
    }

    pub async fn current_user(&self, token: Option<&str>) -> AppResult<Identity> {
        self.auth.current_user(token).await
    }

    /// Viewer for a bearer token; anonymous when the token does not resolve
    pub async fn viewer(&self, token: Option<&str>) -> ViewerContext {
        match token {
            Some(token) => match self.auth.get_session(token).await {
                Some(identity) => ViewerContext::authenticated(identity),
                None => ViewerContext::anonymous(),
            },
            None => ViewerContext::anonymous(),
        }
    }

    pub async fn create_post(
        &self,
        vc: &ViewerContext,
        content: &str,
        image_url: Option<String>,
    ) -> AppResult<Post> {
        self.profiles.ensure_profile(vc.identity()?).await?;
        self.posts.create_post(vc, content, image_url).await
    }

    pub async fn upload_post_image(&self, vc: &ViewerContext, bytes: &[u8]) -> AppResult<String> {
        self.profiles.ensure_profile(vc.identity()?).await?;
        self.posts.upload_post_image(vc, bytes).await
    }

    pub async fn create_comment(
        &self,
        vc: &ViewerContext,
        post_id: PostId,
        content: &str,
    ) -> AppResult<CommentView> {
        self.profiles.ensure_profile(vc.identity()?).await?;
        self.comments.create_comment(vc, post_id, content).await
    }

    pub async fn fetch_feed(&self, vc: &ViewerContext, view: FeedView) -> AppResult<Vec<PostView>> {
        self.feed.fetch_feed(vc, view).await
    }

    /// Feed controller for one viewer, sized from the configured view cache
    pub fn feed_controller(&self, vc: ViewerContext) -> FeedController {
        FeedController::new(self.clone(), vc, self.view_capacity)
    }
}

impl HasAuthService for SocialInterface {
    fn auth_service(&self) -> &Arc<AuthService> {
        &self.auth
    }
}

// Request bodies

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContentRequest {
    pub content: String,
}

/// Base64-encoded file body
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ListBody<T> {
    data: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Fetch endpoints never leave stale data behind: a failure still answers with an
/// empty list, next to the error message and the error's status.
fn list_response<T: Serialize>(result: AppResult<Vec<T>>) -> Response {
    match result {
        Ok(data) => Json(ListBody { data, error: None }).into_response(),
        Err(err) => {
            let status = err.status_code();
            let body = ListBody::<T> {
                data: Vec::new(),
                error: Some(err.public_message()),
            };
            (status, Json(body)).into_response()
        }
    }
}

fn decode_upload(req: &UploadRequest) -> AppResult<Vec<u8>> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(req.data.trim())
        .map_err(|e| AppError::Validation(format!("Upload is not valid base64: {}", e)))?;
    if bytes.is_empty() {
        return Err(AppError::Validation("Upload is empty".to_string()));
    }
    Ok(bytes)
}

fn parse_view(view: &str) -> AppResult<FeedView> {
    FeedView::parse(view).ok_or_else(|| AppError::Validation(format!("Unknown feed view: {}", view)))
}

// HTTP Handlers

pub async fn sign_up_handler(
    State(social): State<SocialInterface>,
    Json(req): Json<SignUpRequest>,
) -> Result<Json<Session>, AppError> {
    let metadata = UserMetadata {
        username: req.username,
        name: req.name,
        avatar_url: req.avatar_url,
    };
    Ok(Json(social.sign_up(&req.email, &req.password, metadata).await?))
}

pub async fn sign_in_handler(
    State(social): State<SocialInterface>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<Session>, AppError> {
    Ok(Json(social.sign_in(&req.email, &req.password).await?))
}

pub async fn sign_out_handler(
    State(social): State<SocialInterface>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let token = extract_bearer_token(&headers)
        .map_err(|_| AppError::Validation("Malformed authorization header".to_string()))?
        .ok_or_else(|| AppError::Unauthenticated("Auth session missing!".to_string()))?;
    let signed_out = social.auth().sign_out(&token).await;
    Ok(Json(json!({ "signedOut": signed_out })))
}

pub async fn session_handler(vc: Vc) -> Result<Json<Identity>, AppError> {
    Ok(Json(vc.identity()?.clone()))
}

pub async fn change_password_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, AppError> {
    social
        .auth()
        .change_password(vc.identity()?, &req.current_password, &req.new_password)
        .await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn get_profile_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    AxumPath(user_id): AxumPath<UserId>,
) -> Result<Json<Value>, AppError> {
    let profile = social.profiles().fetch_profile(&vc, user_id).await?;
    Ok(Json(json!(profile)))
}

pub async fn update_profile_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Value>, AppError> {
    social.profiles().ensure_profile(vc.identity()?).await?;
    let profile = social.profiles().update_profile(&vc, update).await?;
    Ok(Json(json!(profile)))
}

pub async fn upload_avatar_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    Json(req): Json<UploadRequest>,
) -> Result<Json<Value>, AppError> {
    let bytes = decode_upload(&req)?;
    social.profiles().ensure_profile(vc.identity()?).await?;
    let url = social.profiles().upload_avatar(&vc, &bytes).await?;
    Ok(Json(json!({ "url": url })))
}

pub async fn suggested_profiles_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    Query(query): Query<LimitQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(DEFAULT_SUGGESTION_LIMIT);
    list_response(social.profiles().suggested_profiles(&vc, limit).await)
}

pub async fn follow_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    AxumPath(user_id): AxumPath<UserId>,
) -> Result<Json<Value>, AppError> {
    social.follows().follow(&vc, user_id).await?;
    Ok(Json(json!({ "following": true })))
}

pub async fn unfollow_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    AxumPath(user_id): AxumPath<UserId>,
) -> Result<Json<Value>, AppError> {
    social.follows().unfollow(&vc, user_id).await?;
    Ok(Json(json!({ "following": false })))
}

pub async fn toggle_follow_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    AxumPath(user_id): AxumPath<UserId>,
) -> Result<Json<Value>, AppError> {
    let following = social.follows().toggle_follow(&vc, user_id).await?;
    Ok(Json(json!({ "following": following })))
}

pub async fn following_handler(
    State(social): State<SocialInterface>,
    AxumPath(user_id): AxumPath<UserId>,
) -> Response {
    list_response(social.follows().following_ids(user_id).await)
}

pub async fn followers_handler(
    State(social): State<SocialInterface>,
    AxumPath(user_id): AxumPath<UserId>,
) -> Response {
    list_response(social.follows().follower_ids(user_id).await)
}

pub async fn follow_counts_handler(
    State(social): State<SocialInterface>,
    AxumPath(user_id): AxumPath<UserId>,
) -> Result<Json<Value>, AppError> {
    let counts = social.follows().counts(user_id).await?;
    Ok(Json(json!(counts)))
}

pub async fn feed_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    AxumPath(view): AxumPath<String>,
) -> Response {
    let result = match parse_view(&view) {
        Ok(view) => social.fetch_feed(&vc, view).await,
        Err(e) => Err(e),
    };
    list_response(result)
}

pub async fn author_posts_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    AxumPath(user_id): AxumPath<UserId>,
) -> Response {
    list_response(social.fetch_feed(&vc, FeedView::Author(user_id)).await)
}

pub async fn saved_posts_handler(State(social): State<SocialInterface>, vc: Vc) -> Response {
    list_response(social.feed().fetch_saved_posts(&vc).await)
}

pub async fn create_post_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    Json(req): Json<CreatePostRequest>,
) -> Result<Json<Value>, AppError> {
    let post = social.create_post(&vc, &req.content, req.image_url).await?;
    Ok(Json(json!({ "id": post.id, "createdAt": post.created_at })))
}

pub async fn get_post_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    AxumPath(post_id): AxumPath<PostId>,
) -> Result<Json<PostView>, AppError> {
    Ok(Json(social.posts().fetch_post(&vc, post_id).await?))
}

pub async fn delete_post_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    AxumPath(post_id): AxumPath<PostId>,
) -> Result<Json<Value>, AppError> {
    social.posts().delete_post(&vc, post_id).await?;
    Ok(Json(json!({ "deleted": true })))
}

pub async fn upload_post_image_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    Json(req): Json<UploadRequest>,
) -> Result<Json<Value>, AppError> {
    let bytes = decode_upload(&req)?;
    let url = social.upload_post_image(&vc, &bytes).await?;
    Ok(Json(json!({ "url": url })))
}

pub async fn toggle_like_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    AxumPath(post_id): AxumPath<PostId>,
) -> Result<Json<Value>, AppError> {
    let liked = social.interactions().toggle_like(&vc, post_id).await?;
    Ok(Json(json!({ "liked": liked })))
}

pub async fn toggle_share_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    AxumPath(post_id): AxumPath<PostId>,
) -> Result<Json<Value>, AppError> {
    let shared = social.interactions().toggle_share(&vc, post_id).await?;
    Ok(Json(json!({ "shared": shared })))
}

pub async fn toggle_save_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    AxumPath(post_id): AxumPath<PostId>,
) -> Result<Json<Value>, AppError> {
    let saved = social.interactions().toggle_save(&vc, post_id).await?;
    Ok(Json(json!({ "saved": saved })))
}

pub async fn comments_handler(
    State(social): State<SocialInterface>,
    AxumPath(post_id): AxumPath<PostId>,
) -> Response {
    list_response(social.comments().fetch_comments(post_id).await)
}

pub async fn create_comment_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    AxumPath(post_id): AxumPath<PostId>,
    Json(req): Json<ContentRequest>,
) -> Result<Json<CommentView>, AppError> {
    Ok(Json(social.create_comment(&vc, post_id, &req.content).await?))
}

pub async fn conversations_handler(State(social): State<SocialInterface>, vc: Vc) -> Response {
    list_response(social.messages().fetch_conversations(&vc).await)
}

pub async fn thread_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    AxumPath(user_id): AxumPath<UserId>,
) -> Response {
    list_response(social.messages().fetch_thread_messages(&vc, user_id).await)
}

pub async fn send_message_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    AxumPath(user_id): AxumPath<UserId>,
    Json(req): Json<ContentRequest>,
) -> Result<Json<Value>, AppError> {
    let message = social.messages().send_message(&vc, user_id, &req.content).await?;
    Ok(Json(json!(message)))
}

pub async fn mark_conversation_read_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    AxumPath(user_id): AxumPath<UserId>,
) -> Result<Json<Value>, AppError> {
    let updated = social.messages().mark_read(&vc, user_id).await?;
    Ok(Json(json!({ "updated": updated })))
}

pub async fn unread_messages_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
) -> Result<Json<Value>, AppError> {
    let unread = social.messages().unread_message_total(&vc).await?;
    Ok(Json(json!({ "unread": unread })))
}

pub async fn notifications_handler(State(social): State<SocialInterface>, vc: Vc) -> Response {
    list_response(social.notifications().fetch_notifications(&vc).await)
}

pub async fn mark_notification_read_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
    AxumPath(notification_id): AxumPath<i64>,
) -> Result<Json<Value>, AppError> {
    let updated = social
        .notifications()
        .mark_notification_read(&vc, notification_id)
        .await?;
    Ok(Json(json!({ "updated": updated })))
}

pub async fn mark_all_notifications_read_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
) -> Result<Json<Value>, AppError> {
    let updated = social.notifications().mark_all_notifications_read(&vc).await?;
    Ok(Json(json!({ "updated": updated })))
}

pub async fn unread_notifications_handler(
    State(social): State<SocialInterface>,
    vc: Vc,
) -> Result<Json<Value>, AppError> {
    let unread = social.notifications().unread_notification_count(&vc).await?;
    Ok(Json(json!({ "unread": unread })))
}

/// JSON API with viewer resolution on every route
pub fn create_social_router(social: SocialInterface) -> Router {
    info!("Building social API router");
    Router::new()
        // Session
        .route("/auth/sign-up", post(sign_up_handler))
        .route("/auth/sign-in", post(sign_in_handler))
        .route("/auth/sign-out", post(sign_out_handler))
        .route("/auth/session", get(session_handler))
        .route("/auth/password", post(change_password_handler))

        // Profiles and follow graph
        .route("/profiles/me", patch(update_profile_handler))
        .route("/profiles/me/avatar", post(upload_avatar_handler))
        .route("/profiles/suggested", get(suggested_profiles_handler))
        .route("/profiles/{user_id}", get(get_profile_handler))
        .route("/users/{user_id}/follow", post(follow_handler).delete(unfollow_handler))
        .route("/users/{user_id}/follow/toggle", post(toggle_follow_handler))
        .route("/users/{user_id}/following", get(following_handler))
        .route("/users/{user_id}/followers", get(followers_handler))
        .route("/users/{user_id}/follow-counts", get(follow_counts_handler))
        .route("/users/{user_id}/posts", get(author_posts_handler))

        // Feed and posts
        .route("/feed/{view}", get(feed_handler))
        .route("/posts", post(create_post_handler))
        .route("/posts/saved", get(saved_posts_handler))
        .route("/posts/images", post(upload_post_image_handler))
        .route("/posts/{post_id}", get(get_post_handler))
        .route("/posts/{post_id}", delete(delete_post_handler))
        .route("/posts/{post_id}/like", post(toggle_like_handler))
        .route("/posts/{post_id}/share", post(toggle_share_handler))
        .route("/posts/{post_id}/save", post(toggle_save_handler))
        .route("/posts/{post_id}/comments", get(comments_handler).post(create_comment_handler))

        // Messaging
        .route("/conversations", get(conversations_handler))
        .route("/conversations/unread-count", get(unread_messages_handler))
        .route("/conversations/{user_id}/messages", get(thread_handler).post(send_message_handler))
        .route("/conversations/{user_id}/read", post(mark_conversation_read_handler))

        // Notifications
        .route("/notifications", get(notifications_handler))
        .route("/notifications/unread-count", get(unread_notifications_handler))
        .route("/notifications/read-all", post(mark_all_notifications_read_handler))
        .route("/notifications/{notification_id}/read", post(mark_notification_read_handler))

        .layer(middleware::from_fn_with_state(
            social.clone(),
            viewer_context_middleware::<SocialInterface>,
        ))
        .with_state(social)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_decode_upload() {
        let ok = UploadRequest {
            data: base64::engine::general_purpose::STANDARD.encode(b"png-bytes"),
        };
        assert_eq!(decode_upload(&ok).unwrap(), b"png-bytes");

        let bad = UploadRequest {
            data: "not base64!".into(),
        };
        assert!(matches!(decode_upload(&bad), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_list_response_fails_empty() {
        let response = list_response::<PostView>(Err(AppError::Unauthenticated(
            "Auth session missing!".into(),
        )));
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_parse_view() {
        assert_eq!(parse_view("explore").unwrap(), FeedView::Explore);
        assert!(parse_view("trending").is_err());
    }
}
