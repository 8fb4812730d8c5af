// Identity provider - credentials, password hashing and bearer sessions
// Sessions are opaque tokens held in memory; credentials live in the social store

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::core::current_time_millis;
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::SocialStore;
use crate::infrastructure::id_generator::IdGenerator;
use crate::models::{CredentialRecord, Identity, Millis, UserMetadata};

pub const PASSWORD_MIN_LENGTH: usize = 6;

/// An authenticated session handed back to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub identity: Identity,
    pub expires_at: Millis,
}

pub struct AuthService {
    store: Arc<dyn SocialStore>,
    ids: Arc<IdGenerator>,
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    session_ttl_ms: i64,
}

impl AuthService {
    pub fn new(store: Arc<dyn SocialStore>, ids: Arc<IdGenerator>, session_ttl_secs: u64) -> Self {
        Self {
            store,
            ids,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            session_ttl_ms: (session_ttl_secs as i64).saturating_mul(1000),
        }
    }

    /// Register a new identity and open a session for it
    #[instrument(skip(self, password, metadata))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: UserMetadata,
    ) -> AppResult<Session> {
        let email = normalize_email(email)?;
        validate_password(password)?;

        let record = CredentialRecord {
            user_id: self.ids.next_id(),
            email: email.clone(),
            password_hash: hash_password(password)?,
            metadata,
            created_at: current_time_millis(),
        };
        self.store.create_credentials(&record).await?;

        info!("Identity {} registered for {}", record.user_id, email);
        Ok(self.open_session(record.identity()).await)
    }

    /// Exchange email and password for a session
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<Session> {
        let email = normalize_email(email)?;
        let record = self
            .store
            .credentials_by_email(&email)
            .await?
            .ok_or_else(invalid_credentials)?;

        if !verify_password(password, &record.password_hash)? {
            warn!("Failed sign-in attempt for {}", email);
            return Err(invalid_credentials());
        }

        info!("Identity {} signed in", record.user_id);
        Ok(self.open_session(record.identity()).await)
    }

    /// Resolve a bearer token; expired sessions are evicted on read
    pub async fn get_session(&self, token: &str) -> Option<Identity> {
        let now = current_time_millis();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                Some(session) if session.expires_at > now => return Some(session.identity.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        self.sessions.write().await.remove(token);
        None
    }

    /// The identity behind the token, or `Unauthenticated`
    pub async fn current_user(&self, token: Option<&str>) -> AppResult<Identity> {
        match token {
            Some(token) => self
                .get_session(token)
                .await
                .ok_or_else(|| AppError::Unauthenticated("Auth session missing!".to_string())),
            None => Err(AppError::Unauthenticated("Auth session missing!".to_string())),
        }
    }

    /// Re-check the current password before replacing it
    #[instrument(skip(self, current_password, new_password))]
    pub async fn change_password(
        &self,
        identity: &Identity,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        validate_password(new_password)?;

        let record = self
            .store
            .credentials_by_id(identity.id)
            .await?
            .ok_or_else(|| AppError::Unauthenticated("Auth session missing!".to_string()))?;

        if !verify_password(current_password, &record.password_hash)? {
            return Err(AppError::Forbidden("Current password is incorrect".to_string()));
        }

        let password_hash = hash_password(new_password)?;
        self.store.update_password_hash(identity.id, &password_hash).await?;
        info!("Password updated for identity {}", identity.id);
        Ok(())
    }

    /// Returns false when the token had no session
    #[instrument(skip(self, token))]
    pub async fn sign_out(&self, token: &str) -> bool {
        let removed = self.sessions.write().await.remove(token);
        if let Some(session) = &removed {
            info!("Identity {} signed out", session.identity.id);
        }
        removed.is_some()
    }

    pub async fn cleanup_expired_sessions(&self) -> usize {
        let now = current_time_millis();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.expires_at > now);
        before - sessions.len()
    }

    async fn open_session(&self, identity: Identity) -> Session {
        let session = Session {
            access_token: Uuid::new_v4().to_string(),
            identity,
            expires_at: current_time_millis().saturating_add(self.session_ttl_ms),
        };
        self.sessions
            .write()
            .await
            .insert(session.access_token.clone(), session.clone());
        session
    }
}

fn invalid_credentials() -> AppError {
    AppError::Unauthenticated("Invalid login credentials".to_string())
}

fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AppError::Validation("A valid email address is required".to_string())),
    }
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN_LENGTH
        )));
    }
    Ok(())
}

/// Hash password securely using Argon2
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| AppError::Internal(format!("Failed to build salt: {}", e)))?;

    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verify password against hash
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
