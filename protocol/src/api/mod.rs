//! API DTOs module
//!
//! This module contains all API data transfer objects organized by domain:
//! - `auth`: Login, registration, token refresh and logout
//! - `ticket`: Tickets, comments, attachments and lookup tables

pub mod auth;
pub mod ticket;

pub use auth::*;
pub use ticket::*;
