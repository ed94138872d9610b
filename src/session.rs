//! Session management for the ticketdesk SDK
//!
//! [`SessionManager`] is the single owner of the credential state: the
//! access/refresh token pair and the cached profile of the logged-in user.
//! Every mutation writes through to a [`SessionStorage`] so a later process
//! can restore the session. Other components read the state through the
//! accessors and change it only through the operations defined here.

use parking_lot::RwLock;
use reqwest::StatusCode;
use std::sync::Arc;
use tokio::sync::watch;
use validator::Validate;

use ticketdesk_protocol::api::{
    CredentialPair, LoginRequest, LogoutRequest, RefreshTokenRequest, RefreshTokenResponse,
    RegisterRequest, RegisterResponse,
};
use ticketdesk_protocol::common::UserProfile;

use crate::client::{ApiRequest, Transport};
use crate::error::{DeskError, Result};
use crate::gatekeeper::Gatekeeper;
use crate::store::{SessionStorage, ACCESS_TOKEN_KEY, CURRENT_USER_KEY, REFRESH_TOKEN_KEY};

pub const LOGIN_PATH: &str = "/api/auth/login/";
pub const REGISTER_PATH: &str = "/api/auth/register/";
pub const USER_PATH: &str = "/api/auth/user/";
pub const REFRESH_PATH: &str = "/api/auth/refresh/";
pub const LOGOUT_PATH: &str = "/api/auth/logout/";

/// Where the user is sent when the session ends
pub trait Navigator: Send + Sync {
    fn redirect_to_login(&self);
}

#[derive(Debug, Clone, Default)]
struct SessionState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    current_user: Option<UserProfile>,
    authenticated: bool,
}

pub struct SessionManager<T: Transport> {
    transport: Arc<T>,
    storage: Arc<dyn SessionStorage>,
    navigator: Arc<dyn Navigator>,
    state: RwLock<SessionState>,
    user_tx: watch::Sender<Option<UserProfile>>,
}

impl<T: Transport> SessionManager<T> {
    /// Create an empty session; call [`restore_session`](Self::restore_session)
    /// to pick up persisted credentials.
    pub fn new(
        transport: Arc<T>,
        storage: Arc<dyn SessionStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (user_tx, _) = watch::channel(None);
        Self {
            transport,
            storage,
            navigator,
            state: RwLock::new(SessionState::default()),
            user_tx,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state.read().refresh_token.clone()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.state.read().current_user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().authenticated
    }

    /// Observe the current user; `None` means logged out
    pub fn subscribe(&self) -> watch::Receiver<Option<UserProfile>> {
        self.user_tx.subscribe()
    }

    fn has_credentials(&self) -> bool {
        let state = self.state.read();
        state.access_token.is_some() || state.refresh_token.is_some()
    }

    /// Exchange username and password for a token pair and load the profile
    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile> {
        let credentials = LoginRequest {
            username: username.trim().to_string(),
            password: password.to_string(),
        };
        credentials.validate()?;

        let request = ApiRequest::post(LOGIN_PATH).with_json(&credentials)?;
        let response = Gatekeeper::new(self).send(request).await?;

        if response.status == StatusCode::UNAUTHORIZED {
            return Err(DeskError::invalid_credentials(response.error_detail()));
        }
        let tokens: CredentialPair = response.error_for_status(LOGIN_PATH)?.json()?;

        self.store_credentials(&tokens)?;

        match self.fetch_user().await {
            Ok(user) => {
                if let Err(e) = self.set_user(user.clone()) {
                    self.reset_local();
                    return Err(e);
                }
                tracing::info!("Logged in as {}", user.username);
                Ok(user)
            }
            Err(e) => {
                tracing::warn!("Profile fetch after login failed: {}", e);
                self.reset_local();
                Err(e)
            }
        }
    }

    /// Create an account; the server answers with tokens and the new user
    pub async fn register(&self, registration: &RegisterRequest) -> Result<UserProfile> {
        registration.validate()?;

        let request = ApiRequest::post(REGISTER_PATH).with_json(registration)?;
        let response = Gatekeeper::new(self)
            .send(request)
            .await?
            .error_for_status(REGISTER_PATH)?;
        let registered: RegisterResponse = response.json()?;

        self.store_credentials(&registered.tokens)?;
        if let Err(e) = self.set_user(registered.user.clone()) {
            self.reset_local();
            return Err(e);
        }
        tracing::info!("Registered and logged in as {}", registered.user.username);
        Ok(registered.user)
    }

    /// Invalidate the refresh token server-side (best effort) and clear the session
    pub async fn logout(&self) {
        let (access_token, refresh_token) = {
            let state = self.state.read();
            (state.access_token.clone(), state.refresh_token.clone())
        };
        // A leftover refresh token is only on disk when restore found no access token
        let refresh_token = refresh_token.or_else(|| self.storage.get_item(REFRESH_TOKEN_KEY));

        if let Some(refresh) = refresh_token {
            if let Err(e) = self.revoke_refresh_token(refresh, access_token).await {
                tracing::warn!("Server-side logout failed, clearing local session anyway: {}", e);
            }
        }

        self.clear_session();
    }

    async fn revoke_refresh_token(&self, refresh: String, access: Option<String>) -> Result<()> {
        let mut request = ApiRequest::post(LOGOUT_PATH).with_json(&LogoutRequest { refresh })?;
        if let Some(token) = access {
            request.set_bearer(&token)?;
        }

        self.transport
            .send(request)
            .await?
            .error_for_status(LOGOUT_PATH)?;
        Ok(())
    }

    /// Mint a new access token from the stored refresh token
    ///
    /// Never clears the session; the caller decides what a failure means.
    pub async fn refresh(&self) -> Result<String> {
        let refresh = self
            .refresh_token()
            .ok_or_else(|| DeskError::refresh_expired("No refresh token available"))?;

        let request = ApiRequest::post(REFRESH_PATH).with_json(&RefreshTokenRequest { refresh })?;
        let response = self.transport.send(request).await?;

        match response.status {
            StatusCode::UNAUTHORIZED | StatusCode::BAD_REQUEST | StatusCode::FORBIDDEN => {
                return Err(DeskError::refresh_expired(response.error_detail()));
            }
            _ => {}
        }

        let refreshed: RefreshTokenResponse = response.error_for_status(REFRESH_PATH)?.json()?;
        self.set_access_token(&refreshed.access)?;
        tracing::debug!("Access token refreshed");
        Ok(refreshed.access)
    }

    /// Pick up persisted credentials at startup
    ///
    /// A cached profile is replayed without a round trip; otherwise the
    /// profile is fetched. Any failure clears the session without surfacing
    /// an error. Returns whether the session is authenticated afterwards.
    pub async fn restore_session(&self) -> bool {
        let access_token = self.storage.get_item(ACCESS_TOKEN_KEY);
        let refresh_token = self.storage.get_item(REFRESH_TOKEN_KEY);

        if access_token.is_none() {
            return false;
        }

        let cached_user = self
            .storage
            .get_item(CURRENT_USER_KEY)
            .and_then(|raw| match serde_json::from_str::<UserProfile>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    tracing::debug!("Ignoring unreadable cached profile: {}", e);
                    None
                }
            });

        {
            let mut state = self.state.write();
            state.access_token = access_token;
            state.refresh_token = refresh_token;
        }

        if let Some(user) = cached_user {
            tracing::debug!("Restored session for {} from cache", user.username);
            self.publish_user(user);
            return true;
        }

        match self.fetch_user().await {
            Ok(user) => match self.set_user(user) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("Could not persist restored profile: {}", e);
                    self.is_authenticated()
                }
            },
            Err(e) => {
                tracing::debug!("Session restore failed: {}", e);
                if self.has_credentials() {
                    self.clear_session();
                }
                false
            }
        }
    }

    /// Fetch the profile again, replacing the cached copy
    pub async fn reload_user(&self) -> Result<UserProfile> {
        match self.fetch_user().await {
            Ok(user) => {
                self.set_user(user.clone())?;
                Ok(user)
            }
            Err(e) => {
                if self.has_credentials() {
                    self.clear_session();
                }
                Err(e)
            }
        }
    }

    async fn fetch_user(&self) -> Result<UserProfile> {
        Gatekeeper::new(self)
            .send(ApiRequest::get(USER_PATH))
            .await?
            .error_for_status(USER_PATH)?
            .json()
    }

    /// Drop every credential, notify observers and send the user to login
    pub fn clear_session(&self) {
        self.reset_local();
        tracing::info!("Session cleared");
        self.navigator.redirect_to_login();
    }

    fn reset_local(&self) {
        *self.state.write() = SessionState::default();

        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, CURRENT_USER_KEY] {
            if let Err(e) = self.storage.remove_item(key) {
                tracing::warn!("Failed to remove {} from storage: {}", key, e);
            }
        }

        self.user_tx.send_replace(None);
    }

    /// Persist the pair, then adopt it; a failed write leaves no tokens behind
    fn store_credentials(&self, tokens: &CredentialPair) -> Result<()> {
        let persisted = self
            .storage
            .set_item(ACCESS_TOKEN_KEY, &tokens.access)
            .and_then(|()| self.storage.set_item(REFRESH_TOKEN_KEY, &tokens.refresh));
        if let Err(e) = persisted {
            tracing::warn!("Could not persist credentials: {}", e);
            self.reset_local();
            return Err(e);
        }

        let mut state = self.state.write();
        state.access_token = Some(tokens.access.clone());
        state.refresh_token = Some(tokens.refresh.clone());
        Ok(())
    }

    fn set_access_token(&self, access: &str) -> Result<()> {
        self.storage.set_item(ACCESS_TOKEN_KEY, access)?;
        self.state.write().access_token = Some(access.to_string());
        Ok(())
    }

    fn set_user(&self, user: UserProfile) -> Result<()> {
        let serialized = serde_json::to_string(&user)?;
        self.publish_user(user);
        self.storage.set_item(CURRENT_USER_KEY, &serialized)
    }

    fn publish_user(&self, user: UserProfile) {
        {
            let mut state = self.state.write();
            state.current_user = Some(user.clone());
            state.authenticated = true;
        }
        self.user_tx.send_replace(Some(user));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::store::{FileStorage, FileStorageConfig, MemoryStorage};
    use crate::tests::mocks::{MockTransport, RecordingNavigator};
    use crate::tests::utils::test_helpers::{create_temp_dir, sample_user};
    use reqwest::Method;
    use serde_json::json;

    struct Harness {
        session: SessionManager<MockTransport>,
        transport: Arc<MockTransport>,
        storage: Arc<MemoryStorage>,
        navigator: Arc<RecordingNavigator>,
    }

    fn harness(storage: MemoryStorage) -> Harness {
        let transport = Arc::new(MockTransport::new());
        let storage = Arc::new(storage);
        let navigator = Arc::new(RecordingNavigator::default());
        let session = SessionManager::new(transport.clone(), storage.clone(), navigator.clone());
        Harness {
            session,
            transport,
            storage,
            navigator,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Login / Register
    // ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_login_success_persists_tokens_and_user() {
        let h = harness(MemoryStorage::new());
        h.transport
            .reply(LOGIN_PATH, 200, json!({ "access": "A1", "refresh": "R1" }));
        h.transport.reply(USER_PATH, 200, sample_user());
        let mut updates = h.session.subscribe();

        let user = h.session.login("alice", "pw").await.unwrap();

        assert_eq!(user.username, "alice");
        assert!(h.session.is_authenticated());
        assert_eq!(h.session.access_token().as_deref(), Some("A1"));
        assert_eq!(h.storage.get_item(ACCESS_TOKEN_KEY).as_deref(), Some("A1"));
        assert_eq!(h.storage.get_item(REFRESH_TOKEN_KEY).as_deref(), Some("R1"));
        assert!(h.storage.get_item(CURRENT_USER_KEY).is_some());

        assert!(updates.has_changed().unwrap());
        assert_eq!(
            updates.borrow_and_update().as_ref().map(|u| u.id),
            Some(user.id)
        );

        let requests = h.transport.requests();
        assert_eq!(requests[0].path, LOGIN_PATH);
        assert_eq!(requests[0].authorization, None);
        assert_eq!(
            requests[0].body,
            Some(json!({ "username": "alice", "password": "pw" }))
        );
        assert_eq!(requests[1].path, USER_PATH);
        assert_eq!(requests[1].authorization.as_deref(), Some("Bearer A1"));
    }

    #[tokio::test]
    async fn test_login_rejected_is_invalid_credentials() {
        let h = harness(MemoryStorage::new());
        h.transport.reply(
            LOGIN_PATH,
            401,
            json!({ "detail": "No active account found with the given credentials" }),
        );

        let err = h.session.login("alice", "wrong").await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::InvalidCredentials);
        assert!(err.to_string().contains("No active account"));
        assert!(!h.session.is_authenticated());
        assert!(h.storage.is_empty());
        assert_eq!(h.navigator.redirects(), 0);
        assert_eq!(h.transport.count(REFRESH_PATH), 0);
    }

    #[tokio::test]
    async fn test_login_network_failure_leaves_session_untouched() {
        let h = harness(MemoryStorage::with_items([(REFRESH_TOKEN_KEY, "R0")]));
        h.transport.fail(LOGIN_PATH);

        let err = h.session.login("alice", "pw").await.unwrap_err();

        assert!(err.is_network_error());
        assert_eq!(h.storage.get_item(REFRESH_TOKEN_KEY).as_deref(), Some("R0"));
        assert_eq!(h.navigator.redirects(), 0);
    }

    #[tokio::test]
    async fn test_login_validates_before_sending() {
        let h = harness(MemoryStorage::new());

        let err = h.session.login("  ", "pw").await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::ValidationFailed);
        assert!(h.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_login_discards_tokens_when_profile_fetch_fails() {
        let h = harness(MemoryStorage::new());
        h.transport
            .reply(LOGIN_PATH, 200, json!({ "access": "A1", "refresh": "R1" }));
        h.transport.fail(USER_PATH);

        assert!(h.session.login("alice", "pw").await.is_err());
        assert!(h.session.access_token().is_none());
        assert!(h.storage.is_empty());
        assert_eq!(h.navigator.redirects(), 0);
    }

    #[tokio::test]
    async fn test_login_with_unwritable_storage_keeps_nothing() {
        let temp_dir = create_temp_dir();
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let storage = Arc::new(
            FileStorage::new(FileStorageConfig {
                storage_path: Some(blocker.join("session.json")),
                encryption_key: None,
            })
            .unwrap(),
        );
        let transport = Arc::new(MockTransport::new());
        let navigator = Arc::new(RecordingNavigator::default());
        let session = SessionManager::new(transport.clone(), storage.clone(), navigator.clone());
        transport.reply(LOGIN_PATH, 200, json!({ "access": "A1", "refresh": "R1" }));

        assert!(session.login("alice", "pw").await.is_err());

        assert!(session.access_token().is_none());
        assert!(session.refresh_token().is_none());
        assert!(!session.is_authenticated());
        assert!(storage.get_item(ACCESS_TOKEN_KEY).is_none());
        assert_eq!(transport.count(USER_PATH), 0);
        assert_eq!(navigator.redirects(), 0);
    }

    #[tokio::test]
    async fn test_register_stores_tokens_and_user() {
        let h = harness(MemoryStorage::new());
        h.transport.reply(
            REGISTER_PATH,
            201,
            json!({ "tokens": { "access": "A1", "refresh": "R1" }, "user": sample_user() }),
        );

        let registration = RegisterRequest {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "correct-horse".to_string(),
            password2: "correct-horse".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Liddell".to_string(),
        };
        let user = h.session.register(&registration).await.unwrap();

        assert_eq!(user.username, "alice");
        assert!(h.session.is_authenticated());
        assert_eq!(h.storage.get_item(REFRESH_TOKEN_KEY).as_deref(), Some("R1"));
        let requests = h.transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].authorization, None);
    }

    #[tokio::test]
    async fn test_register_rejects_mismatched_passwords_locally() {
        let h = harness(MemoryStorage::new());
        let registration = RegisterRequest {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "correct-horse".to_string(),
            password2: "battery-staple".to_string(),
            first_name: String::new(),
            last_name: String::new(),
        };

        let err = h.session.register(&registration).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationFailed);
        assert!(h.transport.requests().is_empty());
    }

    // ─────────────────────────────────────────────────────────────
    // Logout
    // ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_logout_clears_even_when_server_call_fails() {
        let h = harness(MemoryStorage::with_items([
            (ACCESS_TOKEN_KEY, "A1"),
            (REFRESH_TOKEN_KEY, "R1"),
        ]));
        h.transport.reply(USER_PATH, 200, sample_user());
        assert!(h.session.restore_session().await);
        h.transport.fail(LOGOUT_PATH);

        h.session.logout().await;

        assert!(h.session.access_token().is_none());
        assert!(h.session.refresh_token().is_none());
        assert!(h.session.current_user().is_none());
        assert!(!h.session.is_authenticated());
        assert!(h.storage.is_empty());
        assert_eq!(h.navigator.redirects(), 1);

        let logout = h.transport.last(LOGOUT_PATH).unwrap();
        assert_eq!(logout.body, Some(json!({ "refresh": "R1" })));
    }

    #[tokio::test]
    async fn test_logout_without_refresh_token_skips_server() {
        let h = harness(MemoryStorage::new());

        h.session.logout().await;

        assert_eq!(h.transport.count(LOGOUT_PATH), 0);
        assert_eq!(h.navigator.redirects(), 1);
    }

    #[tokio::test]
    async fn test_logout_wipes_orphaned_refresh_token() {
        let h = harness(MemoryStorage::with_items([(REFRESH_TOKEN_KEY, "R1")]));
        assert!(!h.session.restore_session().await);
        h.transport.reply(LOGOUT_PATH, 200, json!({}));

        h.session.logout().await;

        assert!(h.storage.is_empty());
        let logout = h.transport.last(LOGOUT_PATH).unwrap();
        assert_eq!(logout.body, Some(json!({ "refresh": "R1" })));
        assert_eq!(logout.authorization, None);
        assert_eq!(h.navigator.redirects(), 1);
    }

    // ─────────────────────────────────────────────────────────────
    // Refresh
    // ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_refresh_updates_access_token_only() {
        let h = harness(MemoryStorage::with_items([
            (ACCESS_TOKEN_KEY, "A1"),
            (REFRESH_TOKEN_KEY, "R1"),
            (CURRENT_USER_KEY, sample_user().to_string().as_str()),
        ]));
        h.session.restore_session().await;
        h.transport.reply(REFRESH_PATH, 200, json!({ "access": "A2" }));

        let token = h.session.refresh().await.unwrap();

        assert_eq!(token, "A2");
        assert_eq!(h.session.access_token().as_deref(), Some("A2"));
        assert_eq!(h.session.refresh_token().as_deref(), Some("R1"));
        assert_eq!(h.storage.get_item(ACCESS_TOKEN_KEY).as_deref(), Some("A2"));

        let call = h.transport.last(REFRESH_PATH).unwrap();
        assert_eq!(call.method, Method::POST);
        assert_eq!(call.body, Some(json!({ "refresh": "R1" })));
    }

    #[tokio::test]
    async fn test_refresh_rejected_is_refresh_expired_and_keeps_state() {
        let h = harness(MemoryStorage::with_items([
            (ACCESS_TOKEN_KEY, "A1"),
            (REFRESH_TOKEN_KEY, "R1"),
            (CURRENT_USER_KEY, sample_user().to_string().as_str()),
        ]));
        h.session.restore_session().await;
        h.transport.reply(
            REFRESH_PATH,
            401,
            json!({ "detail": "Token is invalid or expired", "code": "token_not_valid" }),
        );

        let err = h.session.refresh().await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::RefreshExpired);
        assert_eq!(h.session.refresh_token().as_deref(), Some("R1"));
        assert_eq!(h.navigator.redirects(), 0);
    }

    #[tokio::test]
    async fn test_refresh_server_error_is_api_error() {
        let h = harness(MemoryStorage::with_items([
            (ACCESS_TOKEN_KEY, "A1"),
            (REFRESH_TOKEN_KEY, "R1"),
            (CURRENT_USER_KEY, sample_user().to_string().as_str()),
        ]));
        h.session.restore_session().await;
        h.transport.reply(REFRESH_PATH, 500, json!({ "detail": "boom" }));

        let err = h.session.refresh().await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::ApiError);
        assert_eq!(err.status(), Some(500));
        assert_eq!(h.session.access_token().as_deref(), Some("A1"));
        assert_eq!(h.navigator.redirects(), 0);
    }

    #[tokio::test]
    async fn test_refresh_without_token_fails_without_request() {
        let h = harness(MemoryStorage::new());

        let err = h.session.refresh().await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::RefreshExpired);
        assert!(h.transport.requests().is_empty());
    }

    // ─────────────────────────────────────────────────────────────
    // Restore
    // ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_restore_fetches_profile_with_stored_token() {
        let h = harness(MemoryStorage::with_items([
            (ACCESS_TOKEN_KEY, "A1"),
            (REFRESH_TOKEN_KEY, "R1"),
        ]));
        h.transport.reply(USER_PATH, 200, sample_user());

        assert!(h.session.restore_session().await);

        assert!(h.session.is_authenticated());
        assert_eq!(
            h.session.current_user().map(|u| u.username),
            Some("alice".to_string())
        );
        assert_eq!(
            h.transport.last(USER_PATH).unwrap().authorization.as_deref(),
            Some("Bearer A1")
        );
        assert!(h.storage.get_item(CURRENT_USER_KEY).is_some());
    }

    #[tokio::test]
    async fn test_restore_replays_cached_profile_without_network() {
        let h = harness(MemoryStorage::with_items([
            (ACCESS_TOKEN_KEY, "A1"),
            (REFRESH_TOKEN_KEY, "R1"),
            (CURRENT_USER_KEY, sample_user().to_string().as_str()),
        ]));
        let updates = h.session.subscribe();

        assert!(h.session.restore_session().await);

        assert!(h.session.is_authenticated());
        assert!(h.transport.requests().is_empty());
        assert_eq!(
            updates.borrow().as_ref().map(|u| u.username.clone()),
            Some("alice".to_string())
        );
    }

    #[tokio::test]
    async fn test_restore_with_stale_access_token_refreshes_once() {
        let h = harness(MemoryStorage::with_items([
            (ACCESS_TOKEN_KEY, "A1"),
            (REFRESH_TOKEN_KEY, "R1"),
        ]));
        h.transport.reply(
            USER_PATH,
            401,
            json!({ "detail": "Given token not valid for any token type" }),
        );
        h.transport.reply(REFRESH_PATH, 200, json!({ "access": "A2" }));
        h.transport.reply(USER_PATH, 200, sample_user());

        assert!(h.session.restore_session().await);

        assert_eq!(h.session.access_token().as_deref(), Some("A2"));
        assert_eq!(h.storage.get_item(ACCESS_TOKEN_KEY).as_deref(), Some("A2"));
        let user_calls: Vec<_> = h
            .transport
            .requests()
            .into_iter()
            .filter(|r| r.path == USER_PATH)
            .collect();
        assert_eq!(user_calls.len(), 2);
        assert_eq!(user_calls[0].authorization.as_deref(), Some("Bearer A1"));
        assert_eq!(user_calls[1].authorization.as_deref(), Some("Bearer A2"));
        assert_eq!(h.navigator.redirects(), 0);
    }

    #[tokio::test]
    async fn test_restore_without_access_token_is_noop() {
        let h = harness(MemoryStorage::with_items([(REFRESH_TOKEN_KEY, "R1")]));

        assert!(!h.session.restore_session().await);

        assert!(!h.session.is_authenticated());
        assert!(h.transport.requests().is_empty());
        assert_eq!(h.storage.get_item(REFRESH_TOKEN_KEY).as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn test_restore_failure_clears_silently() {
        let h = harness(MemoryStorage::with_items([
            (ACCESS_TOKEN_KEY, "A1"),
            (REFRESH_TOKEN_KEY, "R1"),
        ]));
        h.transport.reply(USER_PATH, 500, json!({ "detail": "boom" }));

        assert!(!h.session.restore_session().await);

        assert!(!h.session.is_authenticated());
        assert!(h.storage.is_empty());
        assert_eq!(h.navigator.redirects(), 1);
    }

    #[tokio::test]
    async fn test_restore_with_empty_storage_is_noop() {
        let h = harness(MemoryStorage::new());

        assert!(!h.session.restore_session().await);
        assert!(h.transport.requests().is_empty());
        assert_eq!(h.navigator.redirects(), 0);
    }

    #[tokio::test]
    async fn test_clear_session_notifies_observers() {
        let h = harness(MemoryStorage::with_items([
            (ACCESS_TOKEN_KEY, "A1"),
            (CURRENT_USER_KEY, sample_user().to_string().as_str()),
        ]));
        h.session.restore_session().await;
        let mut updates = h.session.subscribe();

        h.session.clear_session();

        assert!(updates.has_changed().unwrap());
        assert!(updates.borrow_and_update().is_none());
        assert!(h.session.current_user().is_none());
    }

    #[tokio::test]
    async fn test_reload_user_replaces_cached_profile() {
        let h = harness(MemoryStorage::with_items([
            (ACCESS_TOKEN_KEY, "A1"),
            (REFRESH_TOKEN_KEY, "R1"),
            (CURRENT_USER_KEY, sample_user().to_string().as_str()),
        ]));
        h.session.restore_session().await;
        let mut renamed = sample_user();
        renamed["first_name"] = json!("Alicia");
        h.transport.reply(USER_PATH, 200, renamed);

        let user = h.session.reload_user().await.unwrap();

        assert_eq!(user.first_name, "Alicia");
        assert_eq!(
            h.session.current_user().map(|u| u.first_name),
            Some("Alicia".to_string())
        );
        assert!(h.storage.get_item(CURRENT_USER_KEY).unwrap().contains("Alicia"));
    }

    #[tokio::test]
    async fn test_reload_user_failure_clears_session() {
        let h = harness(MemoryStorage::with_items([
            (ACCESS_TOKEN_KEY, "A1"),
            (CURRENT_USER_KEY, sample_user().to_string().as_str()),
        ]));
        h.session.restore_session().await;
        h.transport.reply(USER_PATH, 403, json!({ "detail": "disabled" }));

        let err = h.session.reload_user().await.unwrap_err();

        assert_eq!(err.code(), ErrorCode::AuthorizationDenied);
        assert!(!h.session.is_authenticated());
        assert_eq!(h.navigator.redirects(), 1);
    }
}
