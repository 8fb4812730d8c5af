// Infrastructure - storage, sessions, ids and request plumbing
pub mod cache;              // Bounded LRU cache
pub mod database;           // SocialStore trait
pub mod id_generator;       // Snowflake ids
pub mod middleware;         // Bearer token -> ViewerContext
pub mod object_storage;     // Image uploads
pub mod security;           // Password auth and sessions
pub mod sqlite_database;    // SQLite SocialStore
pub mod viewer;             // Viewer context

pub use cache::Cache;
pub use database::SocialStore;
pub use id_generator::IdGenerator;
pub use object_storage::{LocalObjectStorage, ObjectStorage, UploadOptions};
pub use security::{AuthService, Session};
pub use sqlite_database::SqliteStore;
pub use viewer::ViewerContext;
