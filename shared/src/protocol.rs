use crate::date::Timestamp;
use crate::error::LunaResult;
use crate::role::RoleAssignment;
use crate::session::REFRESH_MARGIN;
use crate::{Identity, IdentityId, ProfileRecord};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;

/// HTTP Methods for API Requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A trait that defines the request-response relationship and metadata for an API endpoint.
pub trait ApiRequest {
    /// The response type returned by this request.
    type Response: DeserializeOwned;
    /// The URL path relative to the backend base URL.
    const PATH: &'static str;
    /// The HTTP method.
    const METHOD: HttpMethod;
    /// Whether the endpoint returns a JSON body (false for 204 endpoints).
    const HAS_BODY: bool = true;

    /// Query string parameters, already in backend filter syntax.
    fn query(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// JSON request body.
    fn body(&self) -> LunaResult<Option<String>> {
        Ok(None)
    }
}

/// REST equality filter (`eq.<value>`)
fn eq_filter(value: &str) -> String {
    format!("eq.{}", value)
}

// =========================================================
// Data Requests
// =========================================================

/// List all role assignments of one identity
#[derive(Debug, Serialize, Deserialize)]
pub struct ListRolesRequest {
    pub user_id: IdentityId,
}

impl ApiRequest for ListRolesRequest {
    type Response = Vec<RoleAssignment>;
    const PATH: &'static str = "/rest/v1/user_roles";
    const METHOD: HttpMethod = HttpMethod::Get;

    fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("user_id", eq_filter(self.user_id.as_str())),
            ("select", "*".to_string()),
        ]
    }
}

/// Fetch the profile row; the response is a list with zero or one row
#[derive(Debug, Serialize, Deserialize)]
pub struct GetProfileRequest {
    pub id: IdentityId,
}

impl ApiRequest for GetProfileRequest {
    type Response = Vec<ProfileRecord>;
    const PATH: &'static str = "/rest/v1/profiles";
    const METHOD: HttpMethod = HttpMethod::Get;

    fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", eq_filter(self.id.as_str())),
            (
                "select",
                "id,onboarding_completed,display_name".to_string(),
            ),
            ("limit", "1".to_string()),
        ]
    }
}

// =========================================================
// Auth Requests
// =========================================================

/// Email + password sign-in
#[derive(Debug, Serialize, Deserialize)]
pub struct PasswordGrantRequest {
    pub email: String,
    pub password: String,
}

impl ApiRequest for PasswordGrantRequest {
    type Response = AuthSession;
    const PATH: &'static str = "/auth/v1/token";
    const METHOD: HttpMethod = HttpMethod::Post;

    fn query(&self) -> Vec<(&'static str, String)> {
        vec![("grant_type", "password".to_string())]
    }

    fn body(&self) -> LunaResult<Option<String>> {
        Ok(Some(serde_json::to_string(self)?))
    }
}

/// Exchange a refresh token for a new session
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

impl ApiRequest for RefreshTokenRequest {
    type Response = AuthSession;
    const PATH: &'static str = "/auth/v1/token";
    const METHOD: HttpMethod = HttpMethod::Post;

    fn query(&self) -> Vec<(&'static str, String)> {
        vec![("grant_type", "refresh_token".to_string())]
    }

    fn body(&self) -> LunaResult<Option<String>> {
        Ok(Some(serde_json::to_string(self)?))
    }
}

/// Validate the current access token and return its user
#[derive(Debug, Serialize, Deserialize)]
pub struct GetUserRequest;

impl ApiRequest for GetUserRequest {
    type Response = Identity;
    const PATH: &'static str = "/auth/v1/user";
    const METHOD: HttpMethod = HttpMethod::Get;
}

/// Revoke the current session
#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutRequest;

impl ApiRequest for LogoutRequest {
    type Response = ();
    const PATH: &'static str = "/auth/v1/logout";
    const METHOD: HttpMethod = HttpMethod::Post;
    const HAS_BODY: bool = false;
}

// =========================================================
// Session payloads
// =========================================================

/// Token endpoint response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until the access token expires
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: Option<String>,
    pub user: Identity,
}

/// Session persisted in local storage between launches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Timestamp,
    pub user: Identity,
}

impl StoredSession {
    pub fn from_auth(session: AuthSession, now: Timestamp) -> Self {
        Self {
            expires_at: now + Duration::from_secs(session.expires_in),
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            user: session.user,
        }
    }

    /// 距过期不足 `REFRESH_MARGIN` 即视为需要刷新
    pub fn needs_refresh(&self, now: Timestamp) -> bool {
        now + REFRESH_MARGIN >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_query_filters_by_user() {
        let req = ListRolesRequest {
            user_id: IdentityId::new("u-42"),
        };
        assert_eq!(
            req.query(),
            vec![
                ("user_id", "eq.u-42".to_string()),
                ("select", "*".to_string())
            ]
        );
    }

    #[test]
    fn test_profile_query_limits_to_one_row() {
        let req = GetProfileRequest {
            id: IdentityId::new("u-42"),
        };
        let query = req.query();
        assert!(query.contains(&("id", "eq.u-42".to_string())));
        assert!(query.contains(&("limit", "1".to_string())));
    }

    #[test]
    fn test_password_grant_body() {
        let req = PasswordGrantRequest {
            email: "a@luna.app".to_string(),
            password: "pw".to_string(),
        };
        let body = req.body().unwrap().unwrap();
        assert_eq!(body, r#"{"email":"a@luna.app","password":"pw"}"#);
        assert_eq!(req.query(), vec![("grant_type", "password".to_string())]);
        assert!(GetUserRequest.body().unwrap().is_none());
    }

    #[test]
    fn test_stored_session_expiry() {
        let json = r#"{
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": {"id": "u1", "email": "a@luna.app"}
        }"#;
        let auth: AuthSession = serde_json::from_str(json).unwrap();
        let stored = StoredSession::from_auth(auth, Timestamp::new(0));

        assert_eq!(stored.expires_at, Timestamp::new(3_600_000));
        assert!(!stored.needs_refresh(Timestamp::new(3_000_000)));
        assert!(stored.needs_refresh(Timestamp::new(3_540_000)));
    }
}
