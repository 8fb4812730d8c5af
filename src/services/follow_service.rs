// Follow Service - the directed follows relation between users

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::{AppError, AppResult};
use crate::infrastructure::database::SocialStore;
use crate::infrastructure::id_generator::IdGenerator;
use crate::infrastructure::viewer::ViewerContext;
use crate::models::{NotificationType, UserId};
use crate::services::notification_service::notify_best_effort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowCounts {
    pub following: u64,
    pub followers: u64,
}

pub struct FollowService {
    store: Arc<dyn SocialStore>,
    ids: Arc<IdGenerator>,
}

impl FollowService {
    pub fn new(store: Arc<dyn SocialStore>, ids: Arc<IdGenerator>) -> Self {
        Self { store, ids }
    }

    /// Following an already-followed user succeeds without a second edge
    #[instrument(skip(self, vc))]
    pub async fn follow(&self, vc: &ViewerContext, target_id: UserId) -> AppResult<()> {
        let viewer_id = vc.user_id()?;
        if viewer_id == target_id {
            return Err(AppError::SelfFollow);
        }

        if self.store.insert_follow(viewer_id, target_id).await? {
            info!("User {} followed {}", viewer_id, target_id);
            self.notify_followed(viewer_id, target_id).await;
        }
        Ok(())
    }

    #[instrument(skip(self, vc))]
    pub async fn unfollow(&self, vc: &ViewerContext, target_id: UserId) -> AppResult<()> {
        let viewer_id = vc.user_id()?;
        if self.store.delete_follow(viewer_id, target_id).await? {
            info!("User {} unfollowed {}", viewer_id, target_id);
        }
        Ok(())
    }

    /// Returns whether the viewer follows the target afterwards
    #[instrument(skip(self, vc))]
    pub async fn toggle_follow(&self, vc: &ViewerContext, target_id: UserId) -> AppResult<bool> {
        let viewer_id = vc.user_id()?;
        if viewer_id == target_id {
            return Err(AppError::SelfFollow);
        }

        let following = self.store.toggle_follow(viewer_id, target_id).await?;
        if following {
            self.notify_followed(viewer_id, target_id).await;
        }
        Ok(following)
    }

    pub async fn is_following(&self, vc: &ViewerContext, target_id: UserId) -> AppResult<bool> {
        let viewer_id = vc.user_id()?;
        self.store.follow_exists(viewer_id, target_id).await
    }

    pub async fn following_ids(&self, user_id: UserId) -> AppResult<Vec<UserId>> {
        self.store.following_ids(&[user_id]).await
    }

    pub async fn follower_ids(&self, user_id: UserId) -> AppResult<Vec<UserId>> {
        self.store.follower_ids(user_id).await
    }

    /// Users followed by `direct_ids`, minus the direct set itself
    pub async fn second_level_following_ids(&self, direct_ids: &[UserId]) -> AppResult<Vec<UserId>> {
        let direct: HashSet<UserId> = direct_ids.iter().copied().collect();
        let second = self.store.following_ids(direct_ids).await?;
        Ok(second.into_iter().filter(|id| !direct.contains(id)).collect())
    }

    pub async fn counts(&self, user_id: UserId) -> AppResult<FollowCounts> {
        let (following, followers) = futures::try_join!(
            self.store.count_following(user_id),
            self.store.count_followers(user_id)
        )?;
        Ok(FollowCounts {
            following,
            followers,
        })
    }

    async fn notify_followed(&self, follower_id: UserId, target_id: UserId) {
        notify_best_effort(
            self.store.as_ref(),
            &self.ids,
            target_id,
            follower_id,
            None,
            NotificationType::Follow,
        )
        .await;
    }
}
