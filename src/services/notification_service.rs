// Notification Service - read model over actor/action/target rows

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::core::{avatar_url, current_time_millis, display_name, time_ago};
use crate::error::AppResult;
use crate::infrastructure::database::SocialStore;
use crate::infrastructure::id_generator::IdGenerator;
use crate::infrastructure::viewer::ViewerContext;
use crate::models::{
    AuthorProfile, Comment, Notification, NotificationId, NotificationType, NotificationView,
    Post, PostId, UserId,
};

/// Write a notification unless the actor is the recipient. Failures are logged, never returned.
pub async fn notify_best_effort(
    store: &dyn SocialStore,
    ids: &IdGenerator,
    recipient_id: UserId,
    actor_id: UserId,
    post_id: Option<PostId>,
    kind: NotificationType,
) {
    if recipient_id == actor_id {
        return;
    }

    let notification = Notification {
        id: ids.next_id(),
        recipient_id,
        actor_id,
        post_id,
        kind,
        created_at: current_time_millis(),
        is_read: false,
    };
    match store.insert_notification(&notification).await {
        Ok(()) => debug!("Notified {} of {} by {}", recipient_id, kind.as_str(), actor_id),
        Err(e) => warn!(
            "Failed to create {} notification for {}: {}",
            kind.as_str(),
            recipient_id,
            e
        ),
    }
}

pub struct NotificationService {
    store: Arc<dyn SocialStore>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn SocialStore>) -> Self {
        Self { store }
    }

    /// Newest first. Rows whose actor no longer resolves are dropped.
    #[instrument(skip(self, vc))]
    pub async fn fetch_notifications(&self, vc: &ViewerContext) -> AppResult<Vec<NotificationView>> {
        let viewer_id = vc.user_id()?;
        let rows = self.store.notifications_for(viewer_id).await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let actor_ids: Vec<UserId> = unique(rows.iter().map(|n| n.actor_id));
        let post_ids: Vec<PostId> = unique(rows.iter().filter_map(|n| n.post_id));
        let comment_post_ids: Vec<PostId> = unique(
            rows.iter()
                .filter(|n| n.kind == NotificationType::Comment)
                .filter_map(|n| n.post_id),
        );

        let (actors, posts, comments) = futures::join!(
            self.store.users_by_ids(&actor_ids),
            self.store.posts_by_ids(&post_ids),
            self.store.comments_for_posts(&comment_post_ids)
        );

        let actors: HashMap<UserId, AuthorProfile> = actors?
            .iter()
            .map(|user| (user.id, AuthorProfile::from(user)))
            .collect();
        let posts = posts.unwrap_or_else(|e| {
            warn!("Failed to resolve notification posts: {}", e);
            Vec::new()
        });
        let comments = comments.unwrap_or_else(|e| {
            warn!("Failed to resolve notification comments: {}", e);
            Vec::new()
        });

        Ok(assemble_notifications(rows, &actors, &posts, &comments))
    }

    /// Returns false when the id is unknown, already read, or belongs to someone else
    pub async fn mark_notification_read(
        &self,
        vc: &ViewerContext,
        notification_id: NotificationId,
    ) -> AppResult<bool> {
        let viewer_id = vc.user_id()?;
        let updated = self
            .store
            .mark_notifications_read(viewer_id, Some(&[notification_id]))
            .await?;
        Ok(updated > 0)
    }

    pub async fn mark_all_notifications_read(&self, vc: &ViewerContext) -> AppResult<u64> {
        let viewer_id = vc.user_id()?;
        self.store.mark_notifications_read(viewer_id, None).await
    }

    pub async fn unread_notification_count(&self, vc: &ViewerContext) -> AppResult<u64> {
        let viewer_id = vc.user_id()?;
        let rows = self.store.notifications_for(viewer_id).await?;
        Ok(rows.iter().filter(|n| !n.is_read).count() as u64)
    }
}

fn unique<I: Iterator<Item = i64>>(ids: I) -> Vec<i64> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}

/// Join notification rows with their actor, target post image and, for comments,
/// the actor's most recent comment on that post. `comments` must be newest first.
pub fn assemble_notifications(
    rows: Vec<Notification>,
    actors: &HashMap<UserId, AuthorProfile>,
    posts: &[Post],
    comments: &[Comment],
) -> Vec<NotificationView> {
    rows.into_iter()
        .filter_map(|row| {
            let Some(actor) = actors.get(&row.actor_id) else {
                debug!("Dropping notification {} with unknown actor {}", row.id, row.actor_id);
                return None;
            };

            let post_image_url = row
                .post_id
                .and_then(|id| posts.iter().find(|p| p.id == id))
                .and_then(|p| p.image_url.clone())
                .filter(|url| !url.is_empty());

            let comment_content = match (row.kind, row.post_id) {
                (NotificationType::Comment, Some(post_id)) => comments
                    .iter()
                    .find(|c| c.post_id == post_id && c.author_id == row.actor_id)
                    .map(|c| c.content.clone()),
                _ => None,
            };

            Some(NotificationView {
                id: row.id,
                kind: row.kind,
                user_id: actor.id,
                user_avatar: avatar_url(Some(actor)),
                user_name: display_name(Some(actor)),
                user_handle: actor
                    .username
                    .clone()
                    .filter(|u| !u.is_empty())
                    .unwrap_or_else(|| "user".to_string()),
                post_id: row.post_id,
                post_image_url,
                comment_content,
                time_ago: time_ago(row.created_at),
                is_read: row.is_read,
            })
        })
        .collect()
}
