//! Authentication API DTOs
//!
//! This module contains data transfer objects for the `/api/auth/` endpoints:
//! login, registration, token refresh and logout.

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use crate::common::{CredentialPair, UserProfile};

// ============================================================================
// Login DTOs
// ============================================================================

/// Username/password login request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Login response
pub type LoginResponse = CredentialPair;

// ============================================================================
// Registration DTOs
// ============================================================================

/// Account registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(must_match(other = "password"))]
    pub password2: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// Registration response carrying both the new tokens and the created user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub tokens: CredentialPair,
    pub user: UserProfile,
}

// ============================================================================
// Token Refresh DTOs
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh: String,
}

/// Refresh response; only the access token is renewed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenResponse {
    pub access: String,
}

/// Logout request, invalidates the refresh token server-side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutRequest {
    pub refresh: String,
}
