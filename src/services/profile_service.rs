// Profile Service - user row provisioning, the profile read model, edits and avatars

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::core::{current_time_millis, display_name, handle};
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::SocialStore;
use crate::infrastructure::object_storage::{ObjectStorage, UploadOptions};
use crate::infrastructure::viewer::ViewerContext;
use crate::models::{
    AuthorProfile, Identity, NewUser, ProfileUpdate, ProfileView, SuggestedProfile, User, UserId,
};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

pub const FOLLOWED_BY_FOLLOWING: &str = "Followed by people you follow";
pub const SUGGESTED_FOR_YOU: &str = "Suggested for you";
/// Upper bound on suggestions per request, whatever the caller asks for
pub const MAX_SUGGESTIONS: usize = 50;

/// Identity-derived user fields: username from metadata or the email local part,
/// full name split on the first whitespace run.
pub fn derive_new_user(identity: &Identity) -> NewUser {
    let non_empty = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    let username = non_empty(&identity.metadata.username)
        .or_else(|| {
            identity
                .email
                .as_deref()
                .and_then(|email| email.split('@').next())
                .filter(|local| !local.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "user".to_string());

    let (first_name, last_name) = match non_empty(&identity.metadata.name) {
        Some(name) => {
            let mut parts = WHITESPACE.splitn(&name, 2);
            let first = parts.next().map(str::to_string);
            let last = parts.next().map(str::to_string).filter(|v| !v.is_empty());
            (first, last)
        }
        None => (None, None),
    };

    NewUser {
        id: identity.id,
        username,
        first_name,
        last_name,
        avatar_url: non_empty(&identity.metadata.avatar_url),
    }
}

pub struct ProfileService {
    store: Arc<dyn SocialStore>,
    storage: Arc<dyn ObjectStorage>,
    bucket: String,
}

impl ProfileService {
    pub fn new(store: Arc<dyn SocialStore>, storage: Arc<dyn ObjectStorage>, bucket: &str) -> Self {
        Self {
            store,
            storage,
            bucket: bucket.to_string(),
        }
    }

    /// Idempotently make sure the identity has a user row
    #[instrument(skip(self, identity), fields(user_id = identity.id))]
    pub async fn ensure_profile(&self, identity: &Identity) -> AppResult<()> {
        self.store.upsert_user(&derive_new_user(identity)).await
    }

    pub async fn fetch_profile(&self, vc: &ViewerContext, user_id: UserId) -> AppResult<ProfileView> {
        let viewer_id = vc.user_id()?;
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        let is_own_profile = viewer_id == user_id;
        let (following_count, follower_count, is_following) = futures::try_join!(
            self.store.count_following(user_id),
            self.store.count_followers(user_id),
            async {
                if is_own_profile {
                    Ok(false)
                } else {
                    self.store.follow_exists(viewer_id, user_id).await
                }
            }
        )?;

        Ok(ProfileView {
            id: user.id,
            display_name: display_name(Some(&AuthorProfile::from(&user))),
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            avatar_url: user.avatar_url,
            bio: user.bio,
            date_of_birth: user.date_of_birth,
            following_count,
            follower_count,
            is_following,
            is_own_profile,
        })
    }

    #[instrument(skip(self, vc, update))]
    pub async fn update_profile(
        &self,
        vc: &ViewerContext,
        mut update: ProfileUpdate,
    ) -> AppResult<ProfileView> {
        let user_id = vc.user_id()?;
        if let Some(username) = update.username.as_mut() {
            *username = username.trim().to_string();
            if username.is_empty() {
                return Err(AppError::Validation("Username cannot be empty".to_string()));
            }
        }
        if update.is_empty() {
            return self.fetch_profile(vc, user_id).await;
        }

        if !self.store.update_user(user_id, &update).await? {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }
        info!("Profile {} updated", user_id);
        self.fetch_profile(vc, user_id).await
    }

    /// Store the avatar image and point the profile at its public URL
    #[instrument(skip(self, vc, bytes), fields(size = bytes.len()))]
    pub async fn upload_avatar(&self, vc: &ViewerContext, bytes: &[u8]) -> AppResult<String> {
        let user_id = vc.user_id()?;
        let key = format!("avatar-{}-{}.png", user_id, current_time_millis());
        let options = UploadOptions {
            cache_control: 3600,
            upsert: true,
        };

        self.storage.upload(&self.bucket, &key, bytes, &options).await?;
        let url = self.storage.public_url(&self.bucket, &key);

        let update = ProfileUpdate {
            avatar_url: Some(url.clone()),
            ..Default::default()
        };
        if !self.store.update_user(user_id, &update).await? {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }
        Ok(url)
    }

    /// Users the viewer does not follow yet. Friends of friends come first.
    pub async fn suggested_profiles(
        &self,
        vc: &ViewerContext,
        limit: usize,
    ) -> AppResult<Vec<SuggestedProfile>> {
        let viewer_id = vc.user_id()?;
        let limit = limit.min(MAX_SUGGESTIONS);
        if limit == 0 {
            return Ok(Vec::new());
        }
        let direct = self.store.following_ids(&[viewer_id]).await?;

        let second_level = match self.store.following_ids(&direct).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Failed to fetch second-level follows: {}", e);
                Vec::new()
            }
        };

        let mut excluded: HashSet<UserId> = direct.iter().copied().collect();
        excluded.insert(viewer_id);
        let second_level: Vec<UserId> = second_level
            .into_iter()
            .filter(|id| !excluded.contains(id))
            .take(limit)
            .collect();

        let mut suggestions = Vec::new();
        let friends_of_friends = self.store.users_by_ids(&second_level).await?;
        for id in &second_level {
            if let Some(user) = friends_of_friends.iter().find(|u| u.id == *id) {
                suggestions.push(suggestion(user, FOLLOWED_BY_FOLLOWING));
            }
        }

        if suggestions.len() < limit {
            excluded.extend(second_level.iter().copied());
            let exclude: Vec<UserId> = excluded.into_iter().collect();
            let remaining = i64::try_from(limit - suggestions.len()).unwrap_or(0);
            for user in self.store.list_users(&exclude, remaining).await? {
                suggestions.push(suggestion(&user, SUGGESTED_FOR_YOU));
            }
        }

        Ok(suggestions)
    }
}

fn suggestion(user: &User, reason: &str) -> SuggestedProfile {
    let author = AuthorProfile::from(user);
    SuggestedProfile {
        id: user.id,
        name: display_name(Some(&author)),
        handle: handle(Some(&author)),
        avatar_url: crate::core::avatar_url(Some(&author)),
        is_following: false,
        reason: reason.to_string(),
    }
}
