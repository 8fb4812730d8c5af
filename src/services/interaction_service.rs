// Interaction Service - like / share / save toggles on viewer -> post memberships

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::error::AppResult;
use crate::infrastructure::database::SocialStore;
use crate::infrastructure::id_generator::IdGenerator;
use crate::infrastructure::viewer::ViewerContext;
use crate::models::{MembershipKind, PostId};
use crate::services::notification_service::notify_best_effort;

pub struct InteractionService {
    store: Arc<dyn SocialStore>,
    ids: Arc<IdGenerator>,
}

impl InteractionService {
    pub fn new(store: Arc<dyn SocialStore>, ids: Arc<IdGenerator>) -> Self {
        Self { store, ids }
    }

    /// Flip the viewer's membership and return the new state. Creating a like or a
    /// share notifies the post author; that write never fails the toggle.
    #[instrument(skip(self, vc))]
    pub async fn toggle(
        &self,
        vc: &ViewerContext,
        kind: MembershipKind,
        post_id: PostId,
    ) -> AppResult<bool> {
        let viewer_id = vc.user_id()?;
        let active = self.store.toggle_membership(kind, viewer_id, post_id).await?;
        info!("User {} set {} on post {} to {}", viewer_id, kind.table(), post_id, active);

        if let (true, Some(notification)) = (active, kind.notification()) {
            match self.store.get_post(post_id).await {
                Ok(Some(post)) => {
                    notify_best_effort(
                        self.store.as_ref(),
                        &self.ids,
                        post.author_id,
                        viewer_id,
                        Some(post_id),
                        notification,
                    )
                    .await
                }
                Ok(None) => warn!("Post {} vanished before notifying its author", post_id),
                Err(e) => warn!("Failed to look up author of post {}: {}", post_id, e),
            }
        }

        Ok(active)
    }

    pub async fn toggle_like(&self, vc: &ViewerContext, post_id: PostId) -> AppResult<bool> {
        self.toggle(vc, MembershipKind::Like, post_id).await
    }

    pub async fn toggle_share(&self, vc: &ViewerContext, post_id: PostId) -> AppResult<bool> {
        self.toggle(vc, MembershipKind::Share, post_id).await
    }

    pub async fn toggle_save(&self, vc: &ViewerContext, post_id: PostId) -> AppResult<bool> {
        self.toggle(vc, MembershipKind::Save, post_id).await
    }
}
