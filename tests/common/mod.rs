#![allow(dead_code)]

mod failing_store;

use std::sync::Arc;
use tempfile::TempDir;

use social_hub::config::Config;
use social_hub::infrastructure::{LocalObjectStorage, ObjectStorage, SocialStore, SqliteStore};
use social_hub::infrastructure::ViewerContext;
use social_hub::models::{UserId, UserMetadata};
use social_hub::SocialInterface;

pub use failing_store::FailingStore;

pub struct TestApp {
    pub social: SocialInterface,
    pub store: Arc<dyn SocialStore>,
    pub config: Config,
    _storage_dir: TempDir,
}

pub async fn setup() -> TestApp {
    let store: Arc<dyn SocialStore> = Arc::new(SqliteStore::new_in_memory().await.unwrap());
    setup_with(store)
}

/// App over a store whose calls can be made to fail one method at a time
pub async fn setup_failing() -> (TestApp, Arc<FailingStore>) {
    let inner: Arc<dyn SocialStore> = Arc::new(SqliteStore::new_in_memory().await.unwrap());
    let failing = Arc::new(FailingStore::new(inner));
    (setup_with(failing.clone()), failing)
}

fn setup_with(store: Arc<dyn SocialStore>) -> TestApp {
    let storage_dir = tempfile::tempdir().unwrap();
    let config = Config::for_testing(storage_dir.path().to_str().unwrap());
    let storage: Arc<dyn ObjectStorage> = Arc::new(LocalObjectStorage::new(
        &config.storage.root,
        &config.storage.public_url,
    ));
    let social = SocialInterface::new(store.clone(), storage, &config);

    TestApp {
        social,
        store,
        config,
        _storage_dir: storage_dir,
    }
}

pub struct TestUser {
    pub id: UserId,
    pub token: String,
    pub vc: ViewerContext,
}

impl TestApp {
    pub async fn register(&self, username: &str) -> TestUser {
        let metadata = UserMetadata {
            username: Some(username.to_string()),
            name: Some(format!("{} tester", username)),
            avatar_url: None,
        };
        let session = self
            .social
            .sign_up(&format!("{}@example.com", username), "password123", metadata)
            .await
            .unwrap();

        TestUser {
            id: session.identity.id,
            token: session.access_token.clone(),
            vc: ViewerContext::authenticated(session.identity),
        }
    }
}
