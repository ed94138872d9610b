//! Request gatekeeper
//!
//! Wraps every authenticated call: attaches the bearer token, and on a 401
//! runs at most one refresh-and-retry before tearing the session down.

use reqwest::StatusCode;

use crate::client::{ApiRequest, RawResponse, Transport};
use crate::error::{DeskError, Result};
use crate::session::SessionManager;

const PUBLIC_PATHS: [&str; 2] = ["/auth/login", "/auth/register"];
const REFRESH_PATH_FRAGMENT: &str = "/auth/refresh";

fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|fragment| path.contains(fragment))
}

pub struct Gatekeeper<'a, T: Transport> {
    session: &'a SessionManager<T>,
}

impl<'a, T: Transport> Gatekeeper<'a, T> {
    pub fn new(session: &'a SessionManager<T>) -> Self {
        Self { session }
    }

    /// Dispatch `request`, resolving a 401 with one token refresh
    ///
    /// Every outcome except a 401 comes back exactly as the transport
    /// produced it. Login and register requests pass through untouched, so
    /// their 401 is returned as a raw response for the caller to map. URLs
    /// on other hosts also pass through: no bearer, no refresh, no teardown.
    pub async fn send(&self, request: ApiRequest) -> Result<RawResponse> {
        if is_public(&request.path) {
            return self.session.transport().send(request).await;
        }

        if !self.session.transport().targets_api(&request.path) {
            tracing::debug!("{} is off the API host, sending without credentials", request.path);
            return self.session.transport().send(request).await;
        }

        let mut authorized = request.clone();
        if let Some(token) = self.session.access_token() {
            authorized.set_bearer(&token)?;
        }

        let response = self.session.transport().send(authorized).await?;
        if response.status != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let detail = response.error_detail();

        if request.path.contains(REFRESH_PATH_FRAGMENT) {
            return Err(DeskError::unauthorized(detail));
        }

        if self.session.refresh_token().is_none() {
            tracing::info!("{} rejected and no refresh token is available", request.path);
            self.session.clear_session();
            return Err(DeskError::unauthorized(detail));
        }

        tracing::debug!("{} returned 401, refreshing access token", request.path);
        let token = match self.session.refresh().await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Token refresh failed: {}", e);
                self.session.clear_session();
                return Err(e);
            }
        };

        let mut retry = request;
        retry.set_bearer(&token)?;
        let response = self.session.transport().send(retry).await?;

        if response.status == StatusCode::UNAUTHORIZED {
            tracing::warn!("Retried request still unauthorized, ending session");
            let detail = response.error_detail();
            self.session.clear_session();
            return Err(DeskError::unauthorized(detail));
        }

        Ok(response)
    }
}
