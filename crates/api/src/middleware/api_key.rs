//! API-key authentication extractor for the dispatch endpoints.
//!
//! The key is read from `X-API-Key: <key>` or `Authorization: ApiKey <key>`
//! and resolved through the shared [`IdentityCache`](herald_notify::IdentityCache).

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use herald_db::models::member::Member;
use herald_db::models::tenant::Tenant;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying a raw API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// `Authorization` scheme carrying an API key.
const API_KEY_SCHEME: &str = "ApiKey ";

/// Member (and tenant, if any) that owns the presented API key.
#[derive(Debug, Clone)]
pub struct ApiKeyAuth {
    pub member: Member,
    pub tenant: Option<Tenant>,
}

impl ApiKeyAuth {
    pub fn tenant_id(&self) -> Option<herald_core::types::DbId> {
        self.tenant.as_ref().map(|t| t.id)
    }
}

/// Extract the presented API key. An absent key yields `""`, which the
/// identity cache rejects as a missing credential.
pub fn presented_api_key(headers: &HeaderMap) -> &str {
    if let Some(key) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        return key.trim();
    }
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(API_KEY_SCHEME))
        .map(str::trim)
        .unwrap_or_default()
}

impl FromRequestParts<AppState> for ApiKeyAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let key = presented_api_key(&parts.headers);
        let identity = state.identity.resolve(key).await?;
        Ok(ApiKeyAuth {
            member: identity.member,
            tenant: identity.tenant,
        })
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn reads_dedicated_header_first() {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("ak_one"));
        headers.insert("authorization", HeaderValue::from_static("ApiKey ak_two"));
        assert_eq!(presented_api_key(&headers), "ak_one");
    }

    #[test]
    fn falls_back_to_authorization_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("ApiKey ak_two"));
        assert_eq!(presented_api_key(&headers), "ak_two");

        headers.insert("authorization", HeaderValue::from_static("Bearer jwt"));
        assert_eq!(presented_api_key(&headers), "");
    }
}
