// Comment Service - append-only comments per post

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::core::{current_time_millis, to_datetime};
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::SocialStore;
use crate::infrastructure::id_generator::IdGenerator;
use crate::infrastructure::viewer::ViewerContext;
use crate::models::{
    AuthorProfile, Comment, CommentAuthor, CommentRow, CommentView, NotificationType, PostId,
};
use crate::services::notification_service::notify_best_effort;

pub fn comment_author(author: Option<&AuthorProfile>) -> CommentAuthor {
    let username = author
        .and_then(|a| a.username.as_deref())
        .filter(|u| !u.is_empty())
        .unwrap_or("user")
        .to_string();
    let avatar_url = author
        .and_then(|a| a.avatar_url.clone())
        .filter(|url| !url.trim().is_empty());
    CommentAuthor {
        username,
        avatar_url,
    }
}

fn to_comment_view(comment: Comment, author: Option<&AuthorProfile>) -> CommentView {
    CommentView {
        id: comment.id,
        post_id: comment.post_id,
        user_id: comment.author_id,
        content: comment.content,
        created_at: to_datetime(comment.created_at),
        author: comment_author(author),
    }
}

pub struct CommentService {
    store: Arc<dyn SocialStore>,
    ids: Arc<IdGenerator>,
}

impl CommentService {
    pub fn new(store: Arc<dyn SocialStore>, ids: Arc<IdGenerator>) -> Self {
        Self { store, ids }
    }

    /// Append a comment, then notify the post author
    #[instrument(skip(self, vc, content))]
    pub async fn create_comment(
        &self,
        vc: &ViewerContext,
        post_id: PostId,
        content: &str,
    ) -> AppResult<CommentView> {
        let viewer_id = vc.user_id()?;
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Comment cannot be empty".to_string()));
        }

        let comment = Comment {
            id: self.ids.next_id(),
            post_id,
            author_id: viewer_id,
            content: content.to_string(),
            created_at: current_time_millis(),
        };
        self.store.insert_comment(&comment).await?;
        info!("User {} commented on post {}", viewer_id, post_id);

        match self.store.get_post(post_id).await {
            Ok(Some(post)) => {
                notify_best_effort(
                    self.store.as_ref(),
                    &self.ids,
                    post.author_id,
                    viewer_id,
                    Some(post_id),
                    NotificationType::Comment,
                )
                .await
            }
            Ok(None) => {}
            Err(e) => warn!("Failed to look up author of post {}: {}", post_id, e),
        }

        let author = match self.store.get_user(viewer_id).await {
            Ok(user) => user.as_ref().map(AuthorProfile::from),
            Err(e) => {
                warn!("Failed to load comment author {}: {}", viewer_id, e);
                None
            }
        };
        Ok(to_comment_view(comment, author.as_ref()))
    }

    /// Oldest first
    pub async fn fetch_comments(&self, post_id: PostId) -> AppResult<Vec<CommentView>> {
        let rows = self.store.comments_for_post(post_id).await?;
        Ok(rows
            .into_iter()
            .map(|CommentRow { comment, author }| {
                let author = author.resolve(None);
                to_comment_view(comment, author.as_ref())
            })
            .collect())
    }
}
