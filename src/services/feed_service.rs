// Feed Service - composes the follow graph with post queries into named views

use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::AppResult;
use crate::infrastructure::database::SocialStore;
use crate::infrastructure::viewer::ViewerContext;
use crate::models::{FeedView, MembershipKind, PostFilter, PostView, UserId};
use crate::services::post_service::PostService;

/// Post filter for a view, given the viewer and the users they follow.
/// `None` means the view is empty without querying posts.
pub fn feed_filter(view: FeedView, viewer_id: UserId, following: &[UserId]) -> Option<PostFilter> {
    match view {
        FeedView::ForYou => {
            let mut authors = Vec::with_capacity(following.len() + 1);
            authors.push(viewer_id);
            authors.extend(following.iter().copied().filter(|id| *id != viewer_id));
            Some(PostFilter::Authors(authors))
        }
        FeedView::Following if following.is_empty() => None,
        FeedView::Following => Some(PostFilter::Authors(following.to_vec())),
        FeedView::Explore => Some(PostFilter::All),
        FeedView::Author(author_id) => Some(PostFilter::Author(author_id)),
    }
}

pub struct FeedService {
    store: Arc<dyn SocialStore>,
    posts: Arc<PostService>,
}

impl FeedService {
    pub fn new(store: Arc<dyn SocialStore>, posts: Arc<PostService>) -> Self {
        Self { store, posts }
    }

    #[instrument(skip(self, vc))]
    pub async fn fetch_feed(&self, vc: &ViewerContext, view: FeedView) -> AppResult<Vec<PostView>> {
        let viewer_id = vc.user_id()?;
        let following = match view {
            FeedView::ForYou | FeedView::Following => self.store.following_ids(&[viewer_id]).await?,
            FeedView::Explore | FeedView::Author(_) => Vec::new(),
        };

        match feed_filter(view, viewer_id, &following) {
            Some(filter) => self.posts.fetch_posts(vc, filter).await,
            None => {
                debug!("Viewer {} follows nobody; {:?} is empty", viewer_id, view);
                Ok(Vec::new())
            }
        }
    }

    /// Posts the viewer saved, most recently saved first
    #[instrument(skip(self, vc))]
    pub async fn fetch_saved_posts(&self, vc: &ViewerContext) -> AppResult<Vec<PostView>> {
        let viewer_id = vc.user_id()?;
        let saved_ids = self
            .store
            .membership_post_ids(MembershipKind::Save, viewer_id)
            .await?;
        if saved_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut posts = self.posts.fetch_posts(vc, PostFilter::Ids(saved_ids.clone())).await?;
        posts.sort_by_key(|post| {
            saved_ids
                .iter()
                .position(|id| *id == post.id)
                .unwrap_or(usize::MAX)
        });
        Ok(posts)
    }
}
