mod common;

use common::setup;
use social_hub::core::{current_time_millis, time_ago, time_ago_at};
use social_hub::models::{FeedView, NotificationType, Post};
use social_hub::infrastructure::{SocialStore, ViewerContext};
use social_hub::AppError;

#[tokio::test]
async fn test_like_twice_restores_state() {
    let app = setup().await;
    let ada = app.register("ada").await;
    let post = app.social.create_post(&ada.vc, "first", None).await.unwrap();

    let interactions = app.social.interactions();
    assert!(interactions.toggle_like(&ada.vc, post.id).await.unwrap());
    assert!(!interactions.toggle_like(&ada.vc, post.id).await.unwrap());
    assert!(interactions.toggle_save(&ada.vc, post.id).await.unwrap());
    assert!(!interactions.toggle_save(&ada.vc, post.id).await.unwrap());

    let view = app.social.posts().fetch_post(&ada.vc, post.id).await.unwrap();
    assert!(!view.liked);
    assert!(!view.saved);
    assert_eq!(view.likes, 0);
}

#[tokio::test]
async fn test_follow_edges_stay_unique() {
    let app = setup().await;
    let ada = app.register("ada").await;
    let bob = app.register("bob").await;
    let follows = app.social.follows();

    follows.follow(&ada.vc, bob.id).await.unwrap();
    follows.follow(&ada.vc, bob.id).await.unwrap();
    assert_eq!(follows.following_ids(ada.id).await.unwrap(), vec![bob.id]);
    assert_eq!(follows.counts(bob.id).await.unwrap().followers, 1);

    assert!(!follows.toggle_follow(&ada.vc, bob.id).await.unwrap());
    assert!(follows.toggle_follow(&ada.vc, bob.id).await.unwrap());
    assert!(follows.is_following(&ada.vc, bob.id).await.unwrap());

    follows.unfollow(&ada.vc, bob.id).await.unwrap();
    follows.unfollow(&ada.vc, bob.id).await.unwrap();
    assert!(follows.following_ids(ada.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_self_follow_is_rejected() {
    let app = setup().await;
    let ada = app.register("ada").await;

    let result = app.social.follows().follow(&ada.vc, ada.id).await;
    assert!(matches!(result, Err(AppError::SelfFollow)));
    assert!(app.social.follows().following_ids(ada.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_anonymous_viewer_cannot_write() {
    let app = setup().await;
    let anonymous = ViewerContext::anonymous();

    let result = app.social.create_post(&anonymous, "hello", None).await;
    match result {
        Err(AppError::Unauthenticated(msg)) => assert_eq!(msg, "Auth session missing!"),
        other => panic!("expected Unauthenticated, got {:?}", other),
    }
}

#[tokio::test]
async fn test_sessions_resolve_to_identity() {
    let app = setup().await;
    let ada = app.register("ada").await;

    let identity = app.social.current_user(Some(&ada.token)).await.unwrap();
    assert_eq!(identity.id, ada.id);
    assert_eq!(identity.email.as_deref(), Some("ada@example.com"));
    assert!(app.social.viewer(Some(&ada.token)).await.is_authenticated());

    assert!(app.social.auth().sign_out(&ada.token).await);
    assert!(matches!(
        app.social.current_user(Some(&ada.token)).await,
        Err(AppError::Unauthenticated(_))
    ));
}

#[test]
fn test_time_buckets() {
    let now = 1_700_000_000_000;
    assert_eq!(time_ago_at(now - 45_000, now), "just now");
    assert_eq!(time_ago_at(now - 90_000, now), "1m");
    assert_eq!(time_ago_at(now - 3_700_000, now), "1h");
    assert_eq!(time_ago_at(now - 8 * 86_400_000, now), "1w");
    assert_eq!(time_ago_at(now - 400 * 86_400_000, now), "1y");
    assert_eq!(time_ago_at(now + 60_000, now), "just now");
    assert_eq!(time_ago_at(now - 5 * 60_000, now), "5m");
    assert_eq!(time_ago_at(now - 3 * 3_600_000, now), "3h");
    assert_eq!(time_ago_at(now - 2 * 86_400_000, now), "2d");
    assert_eq!(time_ago(current_time_millis()), "just now");
}

#[tokio::test]
async fn test_only_author_can_delete() {
    let app = setup().await;
    let ada = app.register("ada").await;
    let bob = app.register("bob").await;
    let post = app.social.create_post(&ada.vc, "mine", None).await.unwrap();

    let result = app.social.posts().delete_post(&bob.vc, post.id).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
    assert!(app.store.get_post(post.id).await.unwrap().is_some());

    app.social.posts().delete_post(&ada.vc, post.id).await.unwrap();
    assert!(app.store.get_post(post.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_post_without_author_row_renders_placeholder() {
    let app = setup().await;
    let ada = app.register("ada").await;
    let orphan = Post {
        id: 424242,
        author_id: 999_999,
        content: "orphaned".into(),
        image_url: None,
        created_at: current_time_millis(),
    };
    app.store.insert_post(&orphan).await.unwrap();

    let feed = app.social.fetch_feed(&ada.vc, FeedView::Explore).await.unwrap();
    let view = feed.iter().find(|p| p.id == orphan.id).unwrap();
    assert_eq!(view.author, "User");
    assert_eq!(view.handle, "@user");
    assert_eq!(view.caption, "orphaned");
}

#[tokio::test]
async fn test_like_notifies_author_but_not_self() {
    let app = setup().await;
    let ada = app.register("ada").await;
    let bob = app.register("bob").await;
    let post = app.social.create_post(&ada.vc, "notify me", None).await.unwrap();

    app.social.interactions().toggle_like(&ada.vc, post.id).await.unwrap();
    assert!(app.social.notifications().fetch_notifications(&ada.vc).await.unwrap().is_empty());

    app.social.interactions().toggle_like(&bob.vc, post.id).await.unwrap();
    let notifications = app.social.notifications().fetch_notifications(&ada.vc).await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationType::Like);
    assert_eq!(notifications[0].user_id, bob.id);
    assert_eq!(notifications[0].user_name, "Bob Tester");
    assert_eq!(notifications[0].user_handle, "bob");
    assert_eq!(notifications[0].post_id, Some(post.id));
    assert!(!notifications[0].is_read);

    let service = app.social.notifications();
    assert_eq!(service.unread_notification_count(&ada.vc).await.unwrap(), 1);
    assert_eq!(service.mark_all_notifications_read(&ada.vc).await.unwrap(), 1);
    assert_eq!(service.unread_notification_count(&ada.vc).await.unwrap(), 0);
}

#[tokio::test]
async fn test_comment_notifies_with_text() {
    let app = setup().await;
    let ada = app.register("ada").await;
    let bob = app.register("bob").await;
    let post = app.social.create_post(&ada.vc, "discuss", None).await.unwrap();

    let comment = app.social.create_comment(&bob.vc, post.id, "  nice  ").await.unwrap();
    assert_eq!(comment.content, "nice");
    assert_eq!(comment.author.username, "bob");

    let comments = app.social.comments().fetch_comments(post.id).await.unwrap();
    assert_eq!(comments.len(), 1);

    let notifications = app.social.notifications().fetch_notifications(&ada.vc).await.unwrap();
    assert_eq!(notifications[0].kind, NotificationType::Comment);
    assert_eq!(notifications[0].comment_content.as_deref(), Some("nice"));

    let empty = app.social.create_comment(&bob.vc, post.id, "   ").await;
    assert!(matches!(empty, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_feed_views_follow_the_graph() {
    let app = setup().await;
    let ada = app.register("ada").await;
    let bob = app.register("bob").await;
    let cy = app.register("cy").await;

    let own = app.social.create_post(&ada.vc, "from ada", None).await.unwrap();
    let followed = app.social.create_post(&bob.vc, "from bob", None).await.unwrap();
    let stranger = app.social.create_post(&cy.vc, "from cy", None).await.unwrap();
    app.social.follows().follow(&ada.vc, bob.id).await.unwrap();

    let ids = |posts: Vec<social_hub::models::PostView>| {
        let mut ids: Vec<_> = posts.into_iter().map(|p| p.id).collect();
        ids.sort_unstable();
        ids
    };
    let sorted = |mut v: Vec<i64>| {
        v.sort_unstable();
        v
    };

    let for_you = app.social.fetch_feed(&ada.vc, FeedView::ForYou).await.unwrap();
    assert_eq!(ids(for_you), sorted(vec![own.id, followed.id]));

    let following = app.social.fetch_feed(&ada.vc, FeedView::Following).await.unwrap();
    assert!(following.iter().all(|p| p.following));
    assert_eq!(ids(following), vec![followed.id]);

    let explore = app.social.fetch_feed(&ada.vc, FeedView::Explore).await.unwrap();
    assert_eq!(ids(explore), sorted(vec![own.id, followed.id, stranger.id]));

    let by_cy = app.social.fetch_feed(&ada.vc, FeedView::Author(cy.id)).await.unwrap();
    assert_eq!(ids(by_cy), vec![stranger.id]);

    let cy_for_you = app.social.fetch_feed(&cy.vc, FeedView::ForYou).await.unwrap();
    assert_eq!(ids(cy_for_you), vec![stranger.id]);

    let empty = app.social.fetch_feed(&cy.vc, FeedView::Following).await.unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn test_saved_posts() {
    let app = setup().await;
    let ada = app.register("ada").await;
    let bob = app.register("bob").await;
    let post = app.social.create_post(&bob.vc, "save me", None).await.unwrap();

    app.social.interactions().toggle_save(&ada.vc, post.id).await.unwrap();
    let saved = app.social.feed().fetch_saved_posts(&ada.vc).await.unwrap();
    assert_eq!(saved.len(), 1);
    assert!(saved[0].saved);
    assert!(app.social.feed().fetch_saved_posts(&bob.vc).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_messages_and_unread_counts() {
    let app = setup().await;
    let ada = app.register("ada").await;
    let bob = app.register("bob").await;
    let messages = app.social.messages();

    messages.send_message(&ada.vc, bob.id, "hi bob").await.unwrap();
    messages.send_message(&ada.vc, bob.id, "are you there?").await.unwrap();
    messages.send_message(&bob.vc, ada.id, "yes").await.unwrap();

    let conversations = messages.fetch_conversations(&bob.vc).await.unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].id, ada.id);
    assert_eq!(conversations[0].unread, 2);
    assert_eq!(messages.unread_message_total(&bob.vc).await.unwrap(), 2);

    let thread = messages.fetch_thread_messages(&bob.vc, ada.id).await.unwrap();
    assert_eq!(thread.len(), 3);
    assert_eq!(thread[0].text, "hi bob");

    assert_eq!(messages.mark_read(&bob.vc, ada.id).await.unwrap(), 2);
    assert_eq!(messages.unread_message_total(&bob.vc).await.unwrap(), 0);
    let conversations = messages.fetch_conversations(&bob.vc).await.unwrap();
    assert_eq!(conversations[0].unread, 0);
    assert_eq!(messages.unread_message_total(&ada.vc).await.unwrap(), 1);
    assert_eq!(messages.mark_read(&ada.vc, bob.id).await.unwrap(), 1);
    assert_eq!(messages.unread_message_total(&ada.vc).await.unwrap(), 0);

    let to_self = messages.send_message(&ada.vc, ada.id, "note").await;
    assert!(matches!(to_self, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_profile_read_model_and_edits() {
    let app = setup().await;
    let ada = app.register("ada").await;
    let bob = app.register("bob").await;
    app.social.follows().follow(&bob.vc, ada.id).await.unwrap();

    let profile = app.social.profiles().fetch_profile(&bob.vc, ada.id).await.unwrap();
    assert_eq!(profile.username, "ada");
    assert_eq!(profile.display_name, "Ada Tester");
    assert_eq!(profile.follower_count, 1);
    assert!(profile.is_following);
    assert!(!profile.is_own_profile);

    let update = social_hub::models::ProfileUpdate {
        bio: Some("Analyst".into()),
        ..Default::default()
    };
    let updated = app.social.profiles().update_profile(&ada.vc, update).await.unwrap();
    assert_eq!(updated.bio.as_deref(), Some("Analyst"));
    assert!(updated.is_own_profile);

    // Signing in again must not clobber the edit
    app.social.sign_in("ada@example.com", "password123").await.unwrap();
    let again = app.social.profiles().fetch_profile(&ada.vc, ada.id).await.unwrap();
    assert_eq!(again.bio.as_deref(), Some("Analyst"));
}

#[tokio::test]
async fn test_suggestions_prefer_friends_of_friends() {
    let app = setup().await;
    let ada = app.register("ada").await;
    let bob = app.register("bob").await;
    let cy = app.register("cy").await;
    let dee = app.register("dee").await;
    app.social.follows().follow(&ada.vc, bob.id).await.unwrap();
    app.social.follows().follow(&bob.vc, cy.id).await.unwrap();

    let suggestions = app.social.profiles().suggested_profiles(&ada.vc, 5).await.unwrap();
    assert_eq!(suggestions[0].id, cy.id);
    assert_eq!(suggestions[0].reason, "Followed by people you follow");
    assert!(suggestions.iter().any(|s| s.id == dee.id));
    assert!(suggestions.iter().all(|s| s.id != ada.id && s.id != bob.id));
}

#[tokio::test]
async fn test_suggestion_limit_is_capped() {
    use social_hub::services::profile_service::MAX_SUGGESTIONS;

    let app = setup().await;
    let ada = app.register("ada").await;
    for i in 0..3 {
        app.register(&format!("user{}", i)).await;
    }

    let profiles = app.social.profiles();
    let all = profiles.suggested_profiles(&ada.vc, usize::MAX).await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.len() <= MAX_SUGGESTIONS);

    let huge = profiles.suggested_profiles(&ada.vc, 10_000_000_000_000).await.unwrap();
    assert_eq!(huge, all);
    assert!(profiles.suggested_profiles(&ada.vc, 0).await.unwrap().is_empty());
    assert_eq!(profiles.suggested_profiles(&ada.vc, 2).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_interactions_on_missing_post_are_not_found() {
    let app = setup().await;
    let ada = app.register("ada").await;

    let liked = app.social.interactions().toggle_like(&ada.vc, 777).await;
    assert!(matches!(liked, Err(AppError::NotFound(msg)) if msg == "Post 777 not found"));

    let commented = app.social.create_comment(&ada.vc, 777, "anyone?").await;
    assert!(matches!(commented, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_post_image_upload_returns_public_url() {
    let app = setup().await;
    let ada = app.register("ada").await;

    let url = app.social.upload_post_image(&ada.vc, b"fake-png").await.unwrap();
    assert!(url.starts_with("http://localhost/storage/Social/post-"));
    let post = app.social.create_post(&ada.vc, "", Some(url.clone())).await.unwrap();
    assert_eq!(post.image_url, Some(url));

    let blank = app.social.create_post(&ada.vc, "  ", None).await;
    assert!(matches!(blank, Err(AppError::Validation(_))));
}
