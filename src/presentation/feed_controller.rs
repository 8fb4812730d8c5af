// Feed Controller - drives one screen's post list against the social interface
// Loads fail empty with a banner; mutations apply optimistically and roll back on failure

use tracing::{debug, instrument, warn};

use crate::error::AppResult;
use crate::infrastructure::cache::Cache;
use crate::infrastructure::viewer::ViewerContext;
use crate::models::{FeedView, PostId, PostView, UserId};
use crate::presentation::feed_state::{apply, filter_posts, FeedAction, FeedState, Optimistic};
use crate::social_interface::SocialInterface;

/// Which list the controller is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKey {
    View(FeedView),
    Saved,
}

pub struct FeedController {
    social: SocialInterface,
    vc: ViewerContext,
    current: FeedKey,
    state: FeedState,
    /// Last good list per key, shown immediately when switching back
    cache: Cache<FeedKey, Vec<PostView>>,
}

impl FeedController {
    pub fn new(social: SocialInterface, vc: ViewerContext, capacity: usize) -> Self {
        Self {
            social,
            vc,
            current: FeedKey::View(FeedView::ForYou),
            state: FeedState::default(),
            cache: Cache::new(capacity),
        }
    }

    pub fn state(&self) -> &FeedState {
        &self.state
    }

    pub fn posts(&self) -> &[PostView] {
        &self.state.posts
    }

    pub fn banner(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    pub fn current(&self) -> FeedKey {
        self.current
    }

    pub fn dismiss_banner(&mut self) {
        self.state.error = None;
    }

    /// Search the loaded list without touching the remote
    pub fn search(&self, query: &str) -> Vec<PostView> {
        filter_posts(&self.state.posts, query)
    }

    async fn fetch(&self, key: FeedKey) -> AppResult<Vec<PostView>> {
        match key {
            FeedKey::View(view) => self.social.fetch_feed(&self.vc, view).await,
            FeedKey::Saved => self.social.feed().fetch_saved_posts(&self.vc).await,
        }
    }

    /// Switch to `key` without a remote call, showing its last good list if one is
    /// cached. Returns whether the cache had it; on a miss the list is empty.
    pub fn show(&mut self, key: FeedKey) -> bool {
        self.current = key;
        match self.cache.get(&key) {
            Some(cached) => {
                debug!("Showing {} cached posts for {:?}", cached.len(), key);
                self.state = FeedState {
                    posts: cached.clone(),
                    error: None,
                };
                true
            }
            None => {
                self.state = FeedState::default();
                false
            }
        }
    }

    /// Show `key` from the cache, then revalidate it against the remote.
    /// On failure the list is empty and the banner is set.
    #[instrument(skip(self))]
    pub async fn load(&mut self, key: FeedKey) -> &FeedState {
        self.show(key);

        match self.fetch(key).await {
            Ok(posts) => {
                self.cache.insert(key, posts.clone());
                self.state = FeedState { posts, error: None };
            }
            Err(e) => {
                warn!("Failed to load {:?}: {}", key, e);
                self.cache.remove(&key);
                self.state = FeedState {
                    posts: Vec::new(),
                    error: Some(e.public_message()),
                };
            }
        }
        &self.state
    }

    pub async fn refresh(&mut self) -> &FeedState {
        self.load(self.current).await
    }

    async fn send(&self, action: &FeedAction) -> AppResult<()> {
        match action {
            FeedAction::ToggleLike(id) => {
                self.social.interactions().toggle_like(&self.vc, *id).await?;
                Ok(())
            }
            FeedAction::ToggleShare(id) => {
                self.social.interactions().toggle_share(&self.vc, *id).await?;
                Ok(())
            }
            FeedAction::ToggleSave(id) => {
                self.social.interactions().toggle_save(&self.vc, *id).await?;
                Ok(())
            }
            FeedAction::SetFollowing {
                author_id,
                following: true,
            } => self.social.follows().follow(&self.vc, *author_id).await,
            FeedAction::SetFollowing {
                author_id,
                following: false,
            } => self.social.follows().unfollow(&self.vc, *author_id).await,
            FeedAction::Remove(id) => self.social.posts().delete_post(&self.vc, *id).await,
            FeedAction::Prepend(_) => Ok(()),
        }
    }

    /// Apply locally, write remotely, then reconcile counts with a refetch.
    /// A failed write restores the previous list and sets the banner.
    #[instrument(skip(self))]
    pub async fn perform(&mut self, action: FeedAction) -> AppResult<()> {
        let pending = Optimistic::begin(&mut self.state, &action);
        match self.send(&action).await {
            Ok(()) => {
                pending.commit();
                self.refresh().await;
                Ok(())
            }
            Err(e) => {
                warn!("Rolling back {:?}: {}", action, e);
                pending.rollback(&mut self.state);
                self.state.error = Some(e.public_message());
                Err(e)
            }
        }
    }

    pub async fn toggle_like(&mut self, post_id: PostId) -> AppResult<()> {
        self.perform(FeedAction::ToggleLike(post_id)).await
    }

    pub async fn toggle_share(&mut self, post_id: PostId) -> AppResult<()> {
        self.perform(FeedAction::ToggleShare(post_id)).await
    }

    pub async fn toggle_save(&mut self, post_id: PostId) -> AppResult<()> {
        self.perform(FeedAction::ToggleSave(post_id)).await
    }

    /// Flip the follow edge to the author of the rendered posts
    pub async fn toggle_follow(&mut self, author_id: UserId) -> AppResult<()> {
        let following = !self
            .state
            .posts
            .iter()
            .any(|p| p.user_id == author_id && p.following);
        self.perform(FeedAction::SetFollowing {
            author_id,
            following,
        })
        .await
    }

    pub async fn delete_post(&mut self, post_id: PostId) -> AppResult<()> {
        self.perform(FeedAction::Remove(post_id)).await
    }

    /// Create a post and put it at the top of the list
    #[instrument(skip(self, content))]
    pub async fn create_post(
        &mut self,
        content: &str,
        image_url: Option<String>,
    ) -> AppResult<PostView> {
        let created: AppResult<PostView> = async {
            let post = self.social.create_post(&self.vc, content, image_url).await?;
            self.social.posts().fetch_post(&self.vc, post.id).await
        }
        .await;

        match created {
            Ok(view) => {
                self.state = apply(&self.state, &FeedAction::Prepend(view.clone()));
                self.cache.insert(self.current, self.state.posts.clone());
                Ok(view)
            }
            Err(e) => {
                self.state.error = Some(e.public_message());
                Err(e)
            }
        }
    }

    pub fn viewer_id(&self) -> AppResult<UserId> {
        self.vc.user_id()
    }
}
