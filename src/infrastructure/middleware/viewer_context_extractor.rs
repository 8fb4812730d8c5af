// ViewerContext Extractor - hands the request's viewer to handlers

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use std::sync::Arc;

use crate::infrastructure::viewer::ViewerContext;

/// Cheap-to-clone handle on the request's `ViewerContext`.
///
/// ```ignore
/// async fn handler(vc: Vc) -> AppResult<Json<Value>> {
///     let me = vc.user_id()?;
///     ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Vc(Arc<ViewerContext>);

impl Vc {
    pub fn new(vc: Arc<ViewerContext>) -> Self {
        Self(vc)
    }

    pub fn arc(self) -> Arc<ViewerContext> {
        self.0
    }
}

impl std::ops::Deref for Vc {
    type Target = ViewerContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<ViewerContext> for Vc {
    fn as_ref(&self) -> &ViewerContext {
        &self.0
    }
}

// The middleware must run first; without it there is no viewer to extract
impl<S> FromRequestParts<S> for Vc
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let vc = parts
            .extensions
            .get::<Arc<ViewerContext>>()
            .map(|vc| Vc(vc.clone()))
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR);

        async move { vc }
    }
}
