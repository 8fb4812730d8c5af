// Feed state - pure reducer over the rendered post list, plus snapshot/rollback

use crate::models::{PostId, PostView, UserId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    pub posts: Vec<PostView>,
    /// Banner shown above the list after a failed load or mutation.
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedAction {
    ToggleLike(PostId),
    ToggleShare(PostId),
    ToggleSave(PostId),
    SetFollowing { author_id: UserId, following: bool },
    Remove(PostId),
    Prepend(PostView),
}

fn flip_count(active: bool, count: u64) -> u64 {
    if active {
        count.saturating_add(1)
    } else {
        count.saturating_sub(1)
    }
}

/// Apply an action to a copy of `state`
pub fn apply(state: &FeedState, action: &FeedAction) -> FeedState {
    let mut next = state.clone();
    match action {
        FeedAction::ToggleLike(id) => {
            for post in next.posts.iter_mut().filter(|p| p.id == *id) {
                post.liked = !post.liked;
                post.likes = flip_count(post.liked, post.likes);
            }
        }
        FeedAction::ToggleShare(id) => {
            for post in next.posts.iter_mut().filter(|p| p.id == *id) {
                post.shared = !post.shared;
                post.shares = flip_count(post.shared, post.shares);
            }
        }
        FeedAction::ToggleSave(id) => {
            for post in next.posts.iter_mut().filter(|p| p.id == *id) {
                post.saved = !post.saved;
            }
        }
        FeedAction::SetFollowing {
            author_id,
            following,
        } => {
            for post in next.posts.iter_mut().filter(|p| p.user_id == *author_id) {
                post.following = *following;
            }
        }
        FeedAction::Remove(id) => next.posts.retain(|p| p.id != *id),
        FeedAction::Prepend(post) => {
            if !next.posts.iter().any(|p| p.id == post.id) {
                next.posts.insert(0, post.clone());
            }
        }
    }
    next
}

/// An applied action whose remote write has not settled yet
#[must_use = "an optimistic update must be committed or rolled back"]
#[derive(Debug)]
pub struct Optimistic {
    snapshot: FeedState,
}

impl Optimistic {
    pub fn begin(state: &mut FeedState, action: &FeedAction) -> Self {
        let snapshot = state.clone();
        *state = apply(&snapshot, action);
        Self { snapshot }
    }

    pub fn commit(self) {}

    /// Restore the state exactly as it was before `begin`
    pub fn rollback(self, state: &mut FeedState) {
        *state = self.snapshot;
    }
}

/// Case-insensitive search over caption, author name and handle
pub fn filter_posts(posts: &[PostView], query: &str) -> Vec<PostView> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return posts.to_vec();
    }
    posts
        .iter()
        .filter(|p| {
            p.caption.to_lowercase().contains(&query)
                || p.author.to_lowercase().contains(&query)
                || p.handle.to_lowercase().contains(&query)
        })
        .cloned()
        .collect()
}
