// Post Service - post CRUD, author resolution and per-viewer annotation
// Every fetch goes through resolve_post_authors so a missing join never drops a post

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::core::{avatar_url, current_time_millis, display_name, handle, time_ago_at, to_datetime};
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::SocialStore;
use crate::infrastructure::id_generator::IdGenerator;
use crate::infrastructure::object_storage::{ObjectStorage, UploadOptions};
use crate::infrastructure::viewer::ViewerContext;
use crate::models::{
    AuthorProfile, Millis, MembershipKind, Post, PostCounts, PostFilter, PostId, PostRow, PostView,
    User, UserId,
};

/// A post with its author settled, either from the join or from the fallback lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPost {
    pub post: Post,
    pub counts: PostCounts,
    pub author: Option<AuthorProfile>,
}

impl ResolvedPost {
    fn needs_fallback(&self) -> bool {
        self.author.as_ref().map_or(true, AuthorProfile::is_incomplete)
    }
}

/// What the viewer has done to the posts being rendered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewerInteractions {
    pub liked: HashSet<PostId>,
    pub shared: HashSet<PostId>,
    pub saved: HashSet<PostId>,
    pub following: HashSet<UserId>,
}

/// Settle each row's author: take the joined projection when it matches, then fill any
/// missing or incomplete author from one batched user lookup merged by id.
pub async fn resolve_post_authors(store: &dyn SocialStore, rows: Vec<PostRow>) -> Vec<ResolvedPost> {
    let resolved: Vec<ResolvedPost> = rows
        .into_iter()
        .map(|row| ResolvedPost {
            author: row.author.resolve(Some(row.post.author_id)),
            post: row.post,
            counts: row.counts,
        })
        .collect();

    let mut missing: Vec<UserId> = resolved
        .iter()
        .filter(|r| r.needs_fallback())
        .map(|r| r.post.author_id)
        .collect();
    missing.sort_unstable();
    missing.dedup();
    if missing.is_empty() {
        return resolved;
    }

    let users = match store.users_by_ids(&missing).await {
        Ok(users) => users,
        Err(e) => {
            warn!("Author fallback lookup failed for {} users: {}", missing.len(), e);
            Vec::new()
        }
    };
    merge_fallback_authors(resolved, &users)
}

pub fn merge_fallback_authors(resolved: Vec<ResolvedPost>, users: &[User]) -> Vec<ResolvedPost> {
    let by_id: HashMap<UserId, &User> = users.iter().map(|u| (u.id, u)).collect();
    resolved
        .into_iter()
        .map(|mut item| {
            if item.needs_fallback() {
                if let Some(user) = by_id.get(&item.post.author_id) {
                    item.author = Some(AuthorProfile::from(*user));
                }
            }
            item
        })
        .collect()
}

pub fn to_post_view(item: ResolvedPost, interactions: &ViewerInteractions, now: Millis) -> PostView {
    match &item.author {
        None => warn!("Post {} missing author data", item.post.id),
        Some(author) if author.is_incomplete() => {
            warn!("Post {} author data incomplete", item.post.id)
        }
        Some(_) => {}
    }

    let author = item.author.as_ref();
    let id = item.post.id;
    PostView {
        id,
        user_id: item.post.author_id,
        author: display_name(author),
        handle: handle(author),
        avatar_url: avatar_url(author),
        image_url: item.post.image_url.unwrap_or_default(),
        caption: item.post.content,
        liked: interactions.liked.contains(&id),
        likes: item.counts.likes,
        comments: item.counts.comments,
        shared: interactions.shared.contains(&id),
        shares: item.counts.shares,
        saved: interactions.saved.contains(&id),
        following: interactions.following.contains(&item.post.author_id),
        time_ago: time_ago_at(item.post.created_at, now),
        created_at: to_datetime(item.post.created_at),
    }
}

pub struct PostService {
    store: Arc<dyn SocialStore>,
    storage: Arc<dyn ObjectStorage>,
    ids: Arc<IdGenerator>,
    bucket: String,
}

impl PostService {
    pub fn new(
        store: Arc<dyn SocialStore>,
        storage: Arc<dyn ObjectStorage>,
        ids: Arc<IdGenerator>,
        bucket: &str,
    ) -> Self {
        Self {
            store,
            storage,
            ids,
            bucket: bucket.to_string(),
        }
    }

    #[instrument(skip(self, vc, content))]
    pub async fn create_post(
        &self,
        vc: &ViewerContext,
        content: &str,
        image_url: Option<String>,
    ) -> AppResult<Post> {
        let author_id = vc.user_id()?;
        let image_url = image_url.filter(|url| !url.trim().is_empty());
        if content.trim().is_empty() && image_url.is_none() {
            return Err(AppError::Validation("Post needs text or an image".to_string()));
        }

        let post = Post {
            id: self.ids.next_id(),
            author_id,
            content: content.to_string(),
            image_url,
            created_at: current_time_millis(),
        };
        self.store.insert_post(&post).await?;
        info!("User {} created post {}", author_id, post.id);
        Ok(post)
    }

    /// Only the author may delete; anyone else gets `Forbidden` and the row stays
    #[instrument(skip(self, vc))]
    pub async fn delete_post(&self, vc: &ViewerContext, post_id: PostId) -> AppResult<()> {
        let viewer_id = vc.user_id()?;
        let post = self
            .store
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))?;

        if post.author_id != viewer_id {
            warn!("User {} tried to delete post {} owned by {}", viewer_id, post_id, post.author_id);
            return Err(AppError::Forbidden("You can only delete your own posts".to_string()));
        }

        if !self.store.delete_post(post_id, viewer_id).await? {
            return Err(AppError::NotFound(format!("Post {} not found", post_id)));
        }
        info!("User {} deleted post {}", viewer_id, post_id);
        Ok(())
    }

    /// Store a post image under a fresh key and return its public URL
    #[instrument(skip(self, vc, bytes), fields(size = bytes.len()))]
    pub async fn upload_post_image(&self, vc: &ViewerContext, bytes: &[u8]) -> AppResult<String> {
        let user_id = vc.user_id()?;
        let key = format!("post-{}-{}.png", user_id, current_time_millis());
        let options = UploadOptions {
            cache_control: 3600,
            upsert: false,
        };
        self.storage.upload(&self.bucket, &key, bytes, &options).await?;
        Ok(self.storage.public_url(&self.bucket, &key))
    }

    /// Posts matching `filter`, newest first, annotated for the viewer
    pub async fn fetch_posts(&self, vc: &ViewerContext, filter: PostFilter) -> AppResult<Vec<PostView>> {
        let viewer_id = vc.user_id()?;
        let rows = self.store.query_posts(&filter).await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let resolved = resolve_post_authors(self.store.as_ref(), rows).await;
        let interactions = self.viewer_interactions(viewer_id).await?;
        let now = current_time_millis();
        Ok(resolved
            .into_iter()
            .map(|item| to_post_view(item, &interactions, now))
            .collect())
    }

    pub async fn fetch_post(&self, vc: &ViewerContext, post_id: PostId) -> AppResult<PostView> {
        self.fetch_posts(vc, PostFilter::Ids(vec![post_id]))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))
    }

    /// Membership sets are required; the follow set is best-effort
    pub async fn viewer_interactions(&self, viewer_id: UserId) -> AppResult<ViewerInteractions> {
        let (liked, shared, saved) = futures::try_join!(
            self.store.membership_post_ids(MembershipKind::Like, viewer_id),
            self.store.membership_post_ids(MembershipKind::Share, viewer_id),
            self.store.membership_post_ids(MembershipKind::Save, viewer_id)
        )?;

        let following = match self.store.following_ids(&[viewer_id]).await {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                warn!("Failed to fetch following ids: {}", e);
                HashSet::new()
            }
        };

        Ok(ViewerInteractions {
            liked: liked.into_iter().collect(),
            shared: shared.into_iter().collect(),
            saved: saved.into_iter().collect(),
            following,
        })
    }
}
