//! Wire types for the ticketdesk REST API
//!
//! `common` holds the resources the server returns, `api` the request and
//! response envelopes of individual endpoints.

pub mod api;
pub mod common;
