use async_trait::async_trait;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row};
use std::str::FromStr;
use tracing::info;

use crate::core::current_time_millis;
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::SocialStore;
use crate::models::{
    AuthorProfile, Comment, CommentRow, CredentialRecord, Embedded, MembershipKind, Message,
    NewUser, Notification, NotificationId, NotificationType, Post, PostCounts, PostFilter, PostId,
    PostRow, ProfileUpdate, User, UserId, UserMetadata,
};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS auth_users (
        id INTEGER PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        metadata TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        username TEXT NOT NULL,
        first_name TEXT,
        last_name TEXT,
        avatar_url TEXT,
        bio TEXT,
        date_of_birth TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS posts (
        id INTEGER PRIMARY KEY,
        user_id INTEGER NOT NULL,
        content TEXT NOT NULL,
        image_url TEXT,
        created_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS likes (
        user_id INTEGER NOT NULL,
        post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
        created_at INTEGER NOT NULL,
        PRIMARY KEY (user_id, post_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS shares (
        user_id INTEGER NOT NULL,
        post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
        created_at INTEGER NOT NULL,
        PRIMARY KEY (user_id, post_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS saved_posts (
        user_id INTEGER NOT NULL,
        post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
        created_at INTEGER NOT NULL,
        PRIMARY KEY (user_id, post_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS follows (
        follower_id INTEGER NOT NULL,
        following_id INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        PRIMARY KEY (follower_id, following_id),
        CHECK (follower_id <> following_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS comments (
        id INTEGER PRIMARY KEY,
        post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
        user_id INTEGER NOT NULL,
        content TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY,
        sender_id INTEGER NOT NULL,
        receiver_id INTEGER NOT NULL,
        content TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        is_read INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS notifications (
        id INTEGER PRIMARY KEY,
        user_id INTEGER NOT NULL,
        actor_id INTEGER NOT NULL,
        post_id INTEGER REFERENCES posts(id) ON DELETE CASCADE,
        type TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        is_read INTEGER NOT NULL DEFAULT 0
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_posts_user_created ON posts(user_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_follows_following ON follows(following_id)",
    "CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_messages_sender ON messages(sender_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_messages_receiver ON messages(receiver_id, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, created_at DESC)",
];

const USER_COLUMNS: &str =
    "id, username, first_name, last_name, avatar_url, bio, date_of_birth, created_at, updated_at";

const POST_SELECT: &str = r#"
    SELECT p.id, p.user_id, p.content, p.image_url, p.created_at,
           u.id AS author_id, u.username, u.first_name, u.last_name, u.avatar_url,
           (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS like_count,
           (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count,
           (SELECT COUNT(*) FROM shares s WHERE s.post_id = p.id) AS share_count
    FROM posts p
    LEFT JOIN users u ON u.id = p.user_id
"#;

fn remote(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::RemoteFailure(format!("{}: {}", context, e))
}

/// Like `remote`, but a dangling post reference reads as a missing post
fn post_write(context: &'static str, post_id: PostId) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| match &e {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            AppError::NotFound(format!("Post {} not found", post_id))
        }
        _ => AppError::RemoteFailure(format!("{}: {}", context, e)),
    }
}

fn user_from_row(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        avatar_url: row.get("avatar_url"),
        bio: row.get("bio"),
        date_of_birth: row.get("date_of_birth"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Author projection from a LEFT JOIN; absent when the join found no user.
fn joined_author(row: &SqliteRow) -> Embedded<AuthorProfile> {
    match row.get::<Option<i64>, _>("author_id") {
        Some(id) => Embedded::Object(AuthorProfile {
            id,
            username: row.get("username"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            avatar_url: row.get("avatar_url"),
        }),
        None => Embedded::Absent,
    }
}

fn comment_from_row(row: &SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        post_id: row.get("post_id"),
        author_id: row.get("user_id"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}

fn message_from_row(row: &SqliteRow) -> Message {
    Message {
        id: row.get("id"),
        sender_id: row.get("sender_id"),
        receiver_id: row.get("receiver_id"),
        content: row.get("content"),
        created_at: row.get("created_at"),
        is_read: row.get("is_read"),
    }
}

fn credentials_from_row(row: &SqliteRow) -> AppResult<CredentialRecord> {
    let metadata: String = row.get("metadata");
    let metadata: UserMetadata = serde_json::from_str(&metadata)
        .map_err(|e| AppError::Internal(format!("Corrupt identity metadata: {}", e)))?;
    Ok(CredentialRecord {
        user_id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        metadata,
        created_at: row.get("created_at"),
    })
}

fn push_id_list(qb: &mut QueryBuilder<'_, Sqlite>, ids: &[i64]) {
    qb.push("(");
    let mut separated = qb.separated(",");
    for id in ids {
        separated.push_bind(*id);
    }
    qb.push(")");
}

/// SQLite implementation of the social store
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(url: &str) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(remote("Invalid SQLite URL"))?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to ":memory:" is a separate database, so pin a single one.
        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(8)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(remote("Failed to connect to SQLite"))?;

        let store = Self { pool };
        store.initialize().await?;
        info!("SQLite store ready at {}", url);
        Ok(store)
    }

    pub async fn new_in_memory() -> AppResult<Self> {
        Self::connect("sqlite::memory:").await
    }

    /// Create tables and indexes when missing
    pub async fn initialize(&self) -> AppResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(remote("Failed to initialize schema"))?;
        }
        Ok(())
    }

    /// Health check to verify database connectivity
    pub async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(remote("Database health check failed"))?;
        Ok(())
    }
}

#[async_trait]
impl SocialStore for SqliteStore {
    async fn create_credentials(&self, record: &CredentialRecord) -> AppResult<()> {
        let metadata = serde_json::to_string(&record.metadata)
            .map_err(|e| AppError::Internal(format!("Failed to encode metadata: {}", e)))?;
        let result = sqlx::query(
            "INSERT INTO auth_users (id, email, password_hash, metadata, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(record.user_id)
        .bind(&record.email)
        .bind(&record.password_hash)
        .bind(metadata)
        .bind(record.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Conflict(
                "User already registered".to_string(),
            )),
            Err(e) => Err(AppError::RemoteFailure(format!("Failed to create credentials: {}", e))),
        }
    }

    async fn credentials_by_email(&self, email: &str) -> AppResult<Option<CredentialRecord>> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, metadata, created_at FROM auth_users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(remote("Failed to look up credentials"))?;
        row.as_ref().map(credentials_from_row).transpose()
    }

    async fn credentials_by_id(&self, user_id: UserId) -> AppResult<Option<CredentialRecord>> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, metadata, created_at FROM auth_users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(remote("Failed to look up credentials"))?;
        row.as_ref().map(credentials_from_row).transpose()
    }

    async fn update_password_hash(&self, user_id: UserId, password_hash: &str) -> AppResult<()> {
        let result = sqlx::query("UPDATE auth_users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(remote("Failed to update password"))?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Identity {} not found", user_id)));
        }
        Ok(())
    }

    async fn upsert_user(&self, user: &NewUser) -> AppResult<()> {
        let now = current_time_millis();
        sqlx::query(
            r#"
            INSERT INTO users (id, username, first_name, last_name, avatar_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                first_name = COALESCE(users.first_name, excluded.first_name),
                last_name = COALESCE(users.last_name, excluded.last_name),
                avatar_url = COALESCE(users.avatar_url, excluded.avatar_url)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.avatar_url)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(remote("Failed to provision user profile"))?;
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> AppResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(remote("Failed to get user"))?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn users_by_ids(&self, ids: &[UserId]) -> AppResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM users WHERE id IN ", USER_COLUMNS));
        push_id_list(&mut qb, ids);

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(remote("Failed to get users"))?;
        Ok(rows.iter().map(user_from_row).collect())
    }

    async fn update_user(&self, id: UserId, update: &ProfileUpdate) -> AppResult<bool> {
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE users SET updated_at = ");
        qb.push_bind(current_time_millis());

        let fields = [
            ("username", &update.username),
            ("first_name", &update.first_name),
            ("last_name", &update.last_name),
            ("bio", &update.bio),
            ("avatar_url", &update.avatar_url),
            ("date_of_birth", &update.date_of_birth),
        ];
        for (column, value) in fields {
            if let Some(value) = value {
                qb.push(format!(", {} = ", column));
                qb.push_bind(value.clone());
            }
        }
        qb.push(" WHERE id = ");
        qb.push_bind(id);

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(remote("Failed to update user"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_users(&self, exclude: &[UserId], limit: i64) -> AppResult<Vec<User>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM users", USER_COLUMNS));
        if !exclude.is_empty() {
            qb.push(" WHERE id NOT IN ");
            push_id_list(&mut qb, exclude);
        }
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        qb.push_bind(limit);

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(remote("Failed to list users"))?;
        Ok(rows.iter().map(user_from_row).collect())
    }

    async fn insert_post(&self, post: &Post) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO posts (id, user_id, content, image_url, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(post.id)
        .bind(post.author_id)
        .bind(&post.content)
        .bind(&post.image_url)
        .bind(post.created_at)
        .execute(&self.pool)
        .await
        .map_err(remote("Failed to create post"))?;
        Ok(())
    }

    async fn get_post(&self, id: PostId) -> AppResult<Option<Post>> {
        let row = sqlx::query("SELECT id, user_id, content, image_url, created_at FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(remote("Failed to get post"))?;
        Ok(row.map(|row| Post {
            id: row.get("id"),
            author_id: row.get("user_id"),
            content: row.get("content"),
            image_url: row.get("image_url"),
            created_at: row.get("created_at"),
        }))
    }

    async fn posts_by_ids(&self, ids: &[PostId]) -> AppResult<Vec<Post>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, user_id, content, image_url, created_at FROM posts WHERE id IN ",
        );
        push_id_list(&mut qb, ids);

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(remote("Failed to get posts"))?;
        Ok(rows
            .into_iter()
            .map(|row| Post {
                id: row.get("id"),
                author_id: row.get("user_id"),
                content: row.get("content"),
                image_url: row.get("image_url"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn delete_post(&self, id: PostId, author_id: UserId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(author_id)
            .execute(&self.pool)
            .await
            .map_err(remote("Failed to delete post"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn query_posts(&self, filter: &PostFilter) -> AppResult<Vec<PostRow>> {
        let mut qb = QueryBuilder::<Sqlite>::new(POST_SELECT);
        match filter {
            PostFilter::All => {}
            PostFilter::Author(id) => {
                qb.push(" WHERE p.user_id = ");
                qb.push_bind(*id);
            }
            PostFilter::Authors(ids) => {
                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                qb.push(" WHERE p.user_id IN ");
                push_id_list(&mut qb, ids);
            }
            PostFilter::Ids(ids) => {
                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                qb.push(" WHERE p.id IN ");
                push_id_list(&mut qb, ids);
            }
        }
        qb.push(" ORDER BY p.created_at DESC, p.id DESC");

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(remote("Failed to fetch posts"))?;

        Ok(rows
            .iter()
            .map(|row| PostRow {
                post: Post {
                    id: row.get("id"),
                    author_id: row.get("user_id"),
                    content: row.get("content"),
                    image_url: row.get("image_url"),
                    created_at: row.get("created_at"),
                },
                author: joined_author(row),
                counts: PostCounts {
                    likes: row.get::<i64, _>("like_count") as u64,
                    comments: row.get::<i64, _>("comment_count") as u64,
                    shares: row.get::<i64, _>("share_count") as u64,
                },
            })
            .collect())
    }

    async fn toggle_membership(
        &self,
        kind: MembershipKind,
        user_id: UserId,
        post_id: PostId,
    ) -> AppResult<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(remote("Failed to begin transaction"))?;

        // The DELETE takes the write lock, so the check and the flip cannot interleave.
        let removed = sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = ? AND post_id = ?",
            kind.table()
        ))
        .bind(user_id)
        .bind(post_id)
        .execute(&mut *tx)
        .await
        .map_err(remote("Failed to toggle membership"))?
        .rows_affected();

        if removed == 0 {
            sqlx::query(&format!(
                "INSERT INTO {} (user_id, post_id, created_at) VALUES (?, ?, ?)",
                kind.table()
            ))
            .bind(user_id)
            .bind(post_id)
            .bind(current_time_millis())
            .execute(&mut *tx)
            .await
            .map_err(post_write("Failed to toggle membership", post_id))?;
        }

        tx.commit().await.map_err(remote("Failed to commit transaction"))?;
        Ok(removed == 0)
    }

    async fn membership_post_ids(
        &self,
        kind: MembershipKind,
        user_id: UserId,
    ) -> AppResult<Vec<PostId>> {
        let rows = sqlx::query(&format!(
            "SELECT post_id FROM {} WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
            kind.table()
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(remote("Failed to fetch memberships"))?;
        Ok(rows.iter().map(|row| row.get("post_id")).collect())
    }

    async fn insert_follow(&self, follower_id: UserId, following_id: UserId) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO follows (follower_id, following_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(follower_id)
        .bind(following_id)
        .bind(current_time_millis())
        .execute(&self.pool)
        .await
        .map_err(remote("Failed to follow user"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_follow(&self, follower_id: UserId, following_id: UserId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND following_id = ?")
            .bind(follower_id)
            .bind(following_id)
            .execute(&self.pool)
            .await
            .map_err(remote("Failed to unfollow user"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn toggle_follow(&self, follower_id: UserId, following_id: UserId) -> AppResult<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(remote("Failed to begin transaction"))?;

        let removed = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND following_id = ?")
            .bind(follower_id)
            .bind(following_id)
            .execute(&mut *tx)
            .await
            .map_err(remote("Failed to toggle follow"))?
            .rows_affected();

        if removed == 0 {
            sqlx::query("INSERT INTO follows (follower_id, following_id, created_at) VALUES (?, ?, ?)")
                .bind(follower_id)
                .bind(following_id)
                .bind(current_time_millis())
                .execute(&mut *tx)
                .await
                .map_err(remote("Failed to toggle follow"))?;
        }

        tx.commit().await.map_err(remote("Failed to commit transaction"))?;
        Ok(removed == 0)
    }

    async fn follow_exists(&self, follower_id: UserId, following_id: UserId) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 FROM follows WHERE follower_id = ? AND following_id = ?")
            .bind(follower_id)
            .bind(following_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(remote("Failed to check follow"))?;
        Ok(row.is_some())
    }

    async fn following_ids(&self, follower_ids: &[UserId]) -> AppResult<Vec<UserId>> {
        if follower_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT following_id, MAX(created_at) AS latest FROM follows WHERE follower_id IN ",
        );
        push_id_list(&mut qb, follower_ids);
        qb.push(" GROUP BY following_id ORDER BY latest DESC, following_id");

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(remote("Failed to fetch following ids"))?;
        Ok(rows.iter().map(|row| row.get("following_id")).collect())
    }

    async fn follower_ids(&self, following_id: UserId) -> AppResult<Vec<UserId>> {
        let rows = sqlx::query(
            "SELECT follower_id FROM follows WHERE following_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(following_id)
        .fetch_all(&self.pool)
        .await
        .map_err(remote("Failed to fetch follower ids"))?;
        Ok(rows.iter().map(|row| row.get("follower_id")).collect())
    }

    async fn count_following(&self, user_id: UserId) -> AppResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM follows WHERE follower_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(remote("Failed to count following"))?;
        Ok(row.get::<i64, _>("count") as u64)
    }

    async fn count_followers(&self, user_id: UserId) -> AppResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM follows WHERE following_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(remote("Failed to count followers"))?;
        Ok(row.get::<i64, _>("count") as u64)
    }

    async fn insert_comment(&self, comment: &Comment) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO comments (id, post_id, user_id, content, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(comment.id)
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await
        .map_err(post_write("Failed to create comment", comment.post_id))?;
        Ok(())
    }

    async fn comments_for_post(&self, post_id: PostId) -> AppResult<Vec<CommentRow>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.post_id, c.user_id, c.content, c.created_at,
                   u.id AS author_id, u.username, u.first_name, u.last_name, u.avatar_url
            FROM comments c
            LEFT JOIN users u ON u.id = c.user_id
            WHERE c.post_id = ?
            ORDER BY c.created_at ASC, c.id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(remote("Failed to fetch comments"))?;

        Ok(rows
            .iter()
            .map(|row| CommentRow {
                comment: comment_from_row(row),
                author: joined_author(row),
            })
            .collect())
    }

    async fn comments_for_posts(&self, post_ids: &[PostId]) -> AppResult<Vec<Comment>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, post_id, user_id, content, created_at FROM comments WHERE post_id IN ",
        );
        push_id_list(&mut qb, post_ids);
        qb.push(" ORDER BY created_at DESC, id DESC");

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(remote("Failed to fetch comments"))?;
        Ok(rows.iter().map(comment_from_row).collect())
    }

    async fn insert_message(&self, message: &Message) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO messages (id, sender_id, receiver_id, content, created_at, is_read) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(message.id)
        .bind(message.sender_id)
        .bind(message.receiver_id)
        .bind(&message.content)
        .bind(message.created_at)
        .bind(message.is_read)
        .execute(&self.pool)
        .await
        .map_err(remote("Failed to send message"))?;
        Ok(())
    }

    async fn messages_sent_by(&self, sender_id: UserId) -> AppResult<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT id, sender_id, receiver_id, content, created_at, is_read FROM messages WHERE sender_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(sender_id)
        .fetch_all(&self.pool)
        .await
        .map_err(remote("Failed to fetch sent messages"))?;
        Ok(rows.iter().map(message_from_row).collect())
    }

    async fn messages_received_by(&self, receiver_id: UserId) -> AppResult<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT id, sender_id, receiver_id, content, created_at, is_read FROM messages WHERE receiver_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(receiver_id)
        .fetch_all(&self.pool)
        .await
        .map_err(remote("Failed to fetch received messages"))?;
        Ok(rows.iter().map(message_from_row).collect())
    }

    async fn messages_from_to(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
    ) -> AppResult<Vec<Message>> {
        let rows = sqlx::query(
            "SELECT id, sender_id, receiver_id, content, created_at, is_read FROM messages WHERE sender_id = ? AND receiver_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(sender_id)
        .bind(receiver_id)
        .fetch_all(&self.pool)
        .await
        .map_err(remote("Failed to fetch conversation messages"))?;
        Ok(rows.iter().map(message_from_row).collect())
    }

    async fn mark_messages_read(&self, receiver_id: UserId, sender_id: UserId) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE messages SET is_read = 1 WHERE receiver_id = ? AND sender_id = ? AND is_read = 0",
        )
        .bind(receiver_id)
        .bind(sender_id)
        .execute(&self.pool)
        .await
        .map_err(remote("Failed to mark messages read"))?;
        Ok(result.rows_affected())
    }

    async fn insert_notification(&self, notification: &Notification) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, actor_id, post_id, type, created_at, is_read) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(notification.id)
        .bind(notification.recipient_id)
        .bind(notification.actor_id)
        .bind(notification.post_id)
        .bind(notification.kind.as_str())
        .bind(notification.created_at)
        .bind(notification.is_read)
        .execute(&self.pool)
        .await
        .map_err(remote("Failed to create notification"))?;
        Ok(())
    }

    async fn notifications_for(&self, recipient_id: UserId) -> AppResult<Vec<Notification>> {
        let rows = sqlx::query(
            "SELECT id, user_id, actor_id, post_id, type, created_at, is_read FROM notifications WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(recipient_id)
        .fetch_all(&self.pool)
        .await
        .map_err(remote("Failed to fetch notifications"))?;

        let mut notifications = Vec::with_capacity(rows.len());
        for row in rows {
            let kind: String = row.get("type");
            let Some(kind) = NotificationType::parse(&kind) else {
                tracing::warn!("Skipping notification with unknown type {:?}", kind);
                continue;
            };
            notifications.push(Notification {
                id: row.get("id"),
                recipient_id: row.get("user_id"),
                actor_id: row.get("actor_id"),
                post_id: row.get("post_id"),
                kind,
                created_at: row.get("created_at"),
                is_read: row.get("is_read"),
            });
        }
        Ok(notifications)
    }

    async fn mark_notifications_read(
        &self,
        recipient_id: UserId,
        ids: Option<&[NotificationId]>,
    ) -> AppResult<u64> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "UPDATE notifications SET is_read = 1 WHERE is_read = 0 AND user_id = ",
        );
        qb.push_bind(recipient_id);
        if let Some(ids) = ids {
            if ids.is_empty() {
                return Ok(0);
            }
            qb.push(" AND id IN ");
            push_id_list(&mut qb, ids);
        }

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(remote("Failed to mark notifications read"))?;
        Ok(result.rows_affected())
    }
}
