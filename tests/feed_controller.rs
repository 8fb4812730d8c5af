mod common;

use common::setup;
use social_hub::models::FeedView;
use social_hub::presentation::{FeedController, FeedKey};

#[tokio::test]
async fn test_load_and_optimistic_like() {
    let app = setup().await;
    let ada = app.register("ada").await;
    let post = app.social.create_post(&ada.vc, "hello world", None).await.unwrap();

    let mut controller = app.social.feed_controller(ada.vc.clone());
    let state = controller.load(FeedKey::View(FeedView::ForYou)).await;
    assert_eq!(state.posts.len(), 1);
    assert!(state.error.is_none());

    controller.toggle_like(post.id).await.unwrap();
    assert!(controller.posts()[0].liked);
    assert_eq!(controller.posts()[0].likes, 1);

    controller.toggle_like(post.id).await.unwrap();
    assert!(!controller.posts()[0].liked);
    assert_eq!(controller.posts()[0].likes, 0);
}

#[tokio::test]
async fn test_failed_delete_rolls_back_and_shows_banner() {
    let app = setup().await;
    let ada = app.register("ada").await;
    let bob = app.register("bob").await;
    let post = app.social.create_post(&ada.vc, "not yours", None).await.unwrap();

    let mut controller = app.social.feed_controller(bob.vc.clone());
    controller.load(FeedKey::View(FeedView::Explore)).await;
    let before = controller.posts().to_vec();

    assert!(controller.delete_post(post.id).await.is_err());
    assert_eq!(controller.posts(), before.as_slice());
    assert_eq!(controller.banner(), Some("You can only delete your own posts"));

    controller.dismiss_banner();
    assert!(controller.banner().is_none());
}

#[tokio::test]
async fn test_anonymous_load_fails_empty() {
    let app = setup().await;
    let ada = app.register("ada").await;
    app.social.create_post(&ada.vc, "hidden", None).await.unwrap();

    let stale = app.social.viewer(Some("stale-token")).await;
    assert_eq!(stale.identity, None);

    let mut controller = app.social.feed_controller(stale);
    let state = controller.load(FeedKey::View(FeedView::Explore)).await;
    assert!(state.posts.is_empty());
    assert_eq!(state.error.as_deref(), Some("Auth session missing!"));
}

#[tokio::test]
async fn test_follow_and_create_from_controller() {
    let app = setup().await;
    let ada = app.register("ada").await;
    let bob = app.register("bob").await;
    app.social.create_post(&bob.vc, "bob writes", None).await.unwrap();

    let mut controller = app.social.feed_controller(ada.vc.clone());
    controller.load(FeedKey::View(FeedView::Explore)).await;
    assert!(!controller.posts()[0].following);

    controller.toggle_follow(bob.id).await.unwrap();
    assert!(controller.posts()[0].following);
    assert!(app.social.follows().is_following(&ada.vc, bob.id).await.unwrap());

    let created = controller.create_post("ada writes", None).await.unwrap();
    assert_eq!(controller.posts()[0].id, created.id);
    assert_eq!(controller.search("ADA WRITES").len(), 1);

    controller.load(FeedKey::Saved).await;
    assert!(controller.posts().is_empty());
    assert_eq!(controller.current(), FeedKey::Saved);
}

#[tokio::test]
async fn test_switching_back_shows_cached_list_before_revalidating() {
    let app = setup().await;
    let ada = app.register("ada").await;
    let bob = app.register("bob").await;
    app.social.create_post(&ada.vc, "mine", None).await.unwrap();
    let theirs = app.social.create_post(&bob.vc, "theirs", None).await.unwrap();

    let mut controller = app.social.feed_controller(ada.vc.clone());
    let for_you = controller.load(FeedKey::View(FeedView::ForYou)).await.posts.clone();
    assert_eq!(for_you.len(), 1);
    controller.load(FeedKey::View(FeedView::Explore)).await;
    assert_eq!(controller.posts().len(), 2);

    // Stale until revalidated: the remote changes, the cached list does not
    app.social.follows().follow(&ada.vc, bob.id).await.unwrap();
    assert!(controller.show(FeedKey::View(FeedView::ForYou)));
    assert_eq!(controller.posts(), for_you.as_slice());

    controller.refresh().await;
    assert_eq!(controller.posts().len(), 2);
    assert!(controller.posts().iter().any(|p| p.id == theirs.id));

    assert!(!controller.show(FeedKey::Saved));
    assert!(controller.posts().is_empty());
    assert!(controller.banner().is_none());
}

#[tokio::test]
async fn test_view_cache_evicts_least_recent_view() {
    let app = setup().await;
    let ada = app.register("ada").await;
    app.social.create_post(&ada.vc, "hello", None).await.unwrap();

    let mut controller = FeedController::new(app.social.clone(), ada.vc.clone(), 1);
    controller.load(FeedKey::View(FeedView::ForYou)).await;
    controller.load(FeedKey::View(FeedView::Explore)).await;

    assert!(controller.show(FeedKey::View(FeedView::Explore)));
    assert!(!controller.show(FeedKey::View(FeedView::ForYou)));
}
