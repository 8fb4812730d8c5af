// ViewerContext Middleware - resolves the bearer session once per request
// Handlers only ever see the resulting ViewerContext

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::infrastructure::security::AuthService;
use crate::infrastructure::viewer::ViewerContext;

/// Application state that can resolve sessions
pub trait HasAuthService {
    fn auth_service(&self) -> &Arc<AuthService>;
}

/// Insert an `Arc<ViewerContext>` into the request extensions. A missing or stale
/// token yields an anonymous viewer; operations that need an identity reject it later.
pub async fn viewer_context_middleware<T>(
    State(app_state): State<T>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode>
where
    T: HasAuthService + Clone + Send + Sync + 'static,
{
    let token = extract_bearer_token(request.headers())?;
    let viewer_context = create_viewer_context(token.as_deref(), app_state.auth_service()).await;

    request.extensions_mut().insert(viewer_context);
    Ok(next.run(request).await)
}

/// `Authorization: Bearer <token>`; other schemes are treated as no token
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<Option<String>, StatusCode> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| StatusCode::BAD_REQUEST)?;

    Ok(value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string))
}

pub async fn create_viewer_context(token: Option<&str>, auth: &AuthService) -> Arc<ViewerContext> {
    let identity = match token {
        Some(token) => auth.get_session(token).await,
        None => None,
    };

    let viewer_context = match identity {
        Some(identity) => ViewerContext::authenticated(identity),
        None => ViewerContext::anonymous(),
    };
    debug!(
        request_id = %viewer_context.request_id,
        authenticated = viewer_context.is_authenticated(),
        "Viewer resolved"
    );
    Arc::new(viewer_context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer token123"));
        assert_eq!(extract_bearer_token(&headers).unwrap().as_deref(), Some("token123"));
    }

    #[test]
    fn test_other_schemes_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer_token(&headers).unwrap(), None);
    }

    #[test]
    fn test_missing_header_is_anonymous() {
        let headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers).unwrap(), None);
    }
}
