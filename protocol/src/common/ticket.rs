//! Ticket-related data structures
//!
//! Resources served under `/api/`: tickets and their comments, history and
//! attachments, plus the category, priority and status lookup tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Lookup Tables
// ============================================================================

/// Compact user reference embedded in tickets and comments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Priority {
    pub id: u64,
    /// Machine name such as `HIGH`
    pub name: String,
    pub display_name: String,
    pub level: i32,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub id: u64,
    /// Machine name such as `IN_PROGRESS`
    pub name: String,
    pub display_name: String,
    pub is_closed: bool,
}

// ============================================================================
// Ticket Structures
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub ticket: u64,
    pub user: UserSummary,
    pub content: String,
    #[serde(default)]
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One field change recorded by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketHistory {
    pub id: u64,
    pub ticket: u64,
    pub user: UserSummary,
    pub field_name: String,
    #[serde(default)]
    pub old_value: String,
    #[serde(default)]
    pub new_value: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: u64,
    pub ticket: u64,
    pub uploaded_by: UserSummary,
    pub file: String,
    pub file_url: String,
    pub filename: String,
    pub file_size: u64,
    #[serde(default)]
    pub file_size_display: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub file_extension: String,
    #[serde(default)]
    pub is_image: bool,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: u64,
    pub ticket_number: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub priority: Priority,
    pub status: Status,
    pub created_by: UserSummary,
    pub assigned_to: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub comments: Option<Vec<Comment>>,
    #[serde(default)]
    pub history: Option<Vec<TicketHistory>>,
    #[serde(default)]
    pub attachments_files: Option<Vec<Attachment>>,
    #[serde(default)]
    pub comments_count: Option<u64>,
}

// ============================================================================
// Statistics
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCount {
    #[serde(rename = "priority__name")]
    pub priority_name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    #[serde(rename = "category__name")]
    pub category_name: String,
    pub count: u64,
}

/// Aggregate counters served by `/api/tickets/statistics/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketStatistics {
    pub total: u64,
    pub open: u64,
    pub in_progress: u64,
    pub resolved: u64,
    pub closed: u64,
    #[serde(default)]
    pub by_priority: Vec<PriorityCount>,
    #[serde(default)]
    pub by_category: Vec<CategoryCount>,
}
