// ViewerContext - the request-scoped caller every social operation runs as

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Identity, UserId};

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerContext {
    pub identity: Option<Identity>,
    pub request_id: String,
}

impl ViewerContext {
    pub fn authenticated(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            request_id: new_request_id(),
        }
    }

    pub fn anonymous() -> Self {
        Self {
            identity: None,
            request_id: new_request_id(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// The caller's identity, or `Unauthenticated` when there is no session
    pub fn identity(&self) -> AppResult<&Identity> {
        self.identity
            .as_ref()
            .ok_or_else(|| AppError::Unauthenticated("Auth session missing!".to_string()))
    }

    pub fn user_id(&self) -> AppResult<UserId> {
        self.identity().map(|identity| identity.id)
    }
}

fn new_request_id() -> String {
    format!("req-{}", Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserMetadata;

    #[test]
    fn test_anonymous_viewer_is_unauthenticated() {
        let vc = ViewerContext::anonymous();
        assert!(!vc.is_authenticated());
        assert!(matches!(vc.user_id(), Err(AppError::Unauthenticated(_))));
    }

    #[test]
    fn test_authenticated_viewer() {
        let vc = ViewerContext::authenticated(Identity {
            id: 42,
            email: None,
            metadata: UserMetadata::default(),
        });
        assert_eq!(vc.user_id().unwrap(), 42);
        assert!(vc.request_id.starts_with("req-"));
    }
}
