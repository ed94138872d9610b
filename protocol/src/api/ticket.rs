//! Ticket API DTOs
//!
//! Request bodies and query parameters for the ticket, comment, attachment
//! and category endpoints.

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use crate::common::{
    Attachment, Category, Comment, Priority, Status, Ticket, TicketHistory, TicketStatistics,
};

// ============================================================================
// Ticket DTOs
// ============================================================================

/// Create ticket request
///
/// Used for POST /api/tickets/
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TicketCreate {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(range(min = 1))]
    pub category: u64,
    #[validate(range(min = 1))]
    pub priority: u64,
    #[validate(range(min = 1))]
    pub status: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Partial ticket update
///
/// Used for PATCH /api/tickets/{id}/. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct TicketUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1))]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl TicketUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.assigned_to.is_none()
            && self.tags.is_none()
    }
}

/// Assign request; `None` unassigns the ticket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignTicketRequest {
    pub user_id: Option<u64>,
}

/// Filters accepted by GET /api/tickets/
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
}

impl TicketQuery {
    /// Query-string pairs for the filters that are set and non-blank
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        [
            ("search", &self.search),
            ("status", &self.status),
            ("priority", &self.priority),
            ("category", &self.category),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (key.to_string(), v.to_string()))
        })
        .collect()
    }
}

// ============================================================================
// Comment & Attachment DTOs
// ============================================================================

/// Used for POST /api/tickets/{id}/add_comment/
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddCommentRequest {
    #[validate(length(min = 1))]
    pub content: String,
    #[serde(default)]
    pub is_internal: bool,
}

/// Used for DELETE /api/tickets/{id}/delete_attachment/
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteAttachmentRequest {
    pub attachment_id: u64,
}

// ============================================================================
// Category DTOs
// ============================================================================

/// Create or partially update a category
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CategoryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
