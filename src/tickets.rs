//! Ticket operations for ticketdesk clients
//!
//! Every call goes through [`ApiClient`], so it carries the bearer token and
//! benefits from the refresh-and-retry cycle.

use std::path::Path;
use validator::Validate;

use ticketdesk_protocol::api::{
    AddCommentRequest, AssignTicketRequest, CategoryRequest, DeleteAttachmentRequest,
    TicketCreate, TicketQuery, TicketUpdate,
};
use ticketdesk_protocol::common::{
    Attachment, Category, Comment, Priority, Status, Ticket, TicketStatistics,
};

use crate::client::{ApiClient, ApiRequest, MultipartField, Transport};
use crate::error::{DeskError, Result};
use crate::utils::{format_file_size, is_valid_file_size, is_valid_file_type, DEFAULT_MAX_SIZE_MB};

const TICKETS_PATH: &str = "/api/tickets/";
const COMMENTS_PATH: &str = "/api/comments/";
const CATEGORIES_PATH: &str = "/api/categories/";
const PRIORITIES_PATH: &str = "/api/priorities/";
const STATUSES_PATH: &str = "/api/statuses/";

fn ticket_path(id: u64) -> String {
    format!("{}{}/", TICKETS_PATH, id)
}

fn ticket_action(id: u64, action: &str) -> String {
    format!("{}{}/{}/", TICKETS_PATH, id, action)
}

fn category_path(id: u64) -> String {
    format!("{}{}/", CATEGORIES_PATH, id)
}

/// File ready to be attached to a ticket
#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    pub filename: String,
    pub content: Vec<u8>,
    pub description: Option<String>,
}

impl AttachmentUpload {
    /// Read a local file, keeping only its file name
    pub async fn from_path(path: &Path, description: Option<String>) -> Result<Self> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                DeskError::invalid_input(format!("Not a file path: {}", path.display()))
            })?
            .to_string();

        if !path.is_file() {
            return Err(DeskError::file_not_found(path.display().to_string()));
        }

        let content = tokio::fs::read(path).await.map_err(|e| {
            DeskError::io_from_error(format!("Failed to read {}", path.display()), e)
        })?;

        Ok(Self {
            filename,
            content,
            description,
        })
    }

    /// Check extension and size before anything is sent
    pub fn validate(&self, max_size_mb: u64) -> Result<()> {
        if !is_valid_file_type(&self.filename) {
            return Err(DeskError::validation_field(
                format!("File type not allowed: {}", self.filename),
                "file",
            ));
        }

        let size = self.content.len() as u64;
        if !is_valid_file_size(size, max_size_mb) {
            return Err(DeskError::validation_field(
                format!(
                    "{} is {}, the limit is {} MB",
                    self.filename,
                    format_file_size(size),
                    max_size_mb
                ),
                "file",
            ));
        }

        Ok(())
    }

    fn into_fields(self) -> Vec<MultipartField> {
        let mut fields = vec![MultipartField::File {
            name: "file".to_string(),
            filename: self.filename,
            content: self.content,
        }];

        if let Some(description) = self.description.filter(|d| !d.is_empty()) {
            fields.push(MultipartField::Text {
                name: "description".to_string(),
                value: description,
            });
        }

        fields
    }
}

/// Ticket service for the ticket, comment, attachment and lookup endpoints
pub struct TicketService<'a, T: Transport> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> TicketService<'a, T> {
    pub fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    // ─────────────────────────────────────────────────────────────
    // Tickets
    // ─────────────────────────────────────────────────────────────

    /// List tickets; unset filters are left out of the query string
    pub async fn list(&self, query: &TicketQuery) -> Result<Vec<Ticket>> {
        self.client
            .request(ApiRequest::get(TICKETS_PATH).with_query(query.to_pairs()))
            .await
    }

    pub async fn get(&self, id: u64) -> Result<Ticket> {
        self.client.request(ApiRequest::get(ticket_path(id))).await
    }

    pub async fn create(&self, ticket: &TicketCreate) -> Result<Ticket> {
        ticket.validate()?;
        self.client
            .request(ApiRequest::post(TICKETS_PATH).with_json(ticket)?)
            .await
    }

    pub async fn update(&self, id: u64, update: &TicketUpdate) -> Result<Ticket> {
        if update.is_empty() {
            return Err(DeskError::invalid_input("Nothing to update"));
        }
        update.validate()?;
        self.client
            .request(ApiRequest::patch(ticket_path(id)).with_json(update)?)
            .await
    }

    pub async fn delete(&self, id: u64) -> Result<()> {
        self.client
            .request_empty(ApiRequest::delete(ticket_path(id)))
            .await
    }

    /// Tickets created by the current user
    pub async fn my_tickets(&self) -> Result<Vec<Ticket>> {
        self.client
            .request(ApiRequest::get(format!("{}my_tickets/", TICKETS_PATH)))
            .await
    }

    pub async fn assigned_to_me(&self) -> Result<Vec<Ticket>> {
        self.client
            .request(ApiRequest::get(format!("{}assigned_to_me/", TICKETS_PATH)))
            .await
    }

    pub async fn statistics(&self) -> Result<TicketStatistics> {
        self.client
            .request(ApiRequest::get(format!("{}statistics/", TICKETS_PATH)))
            .await
    }

    /// Assign to `user_id`, or unassign with `None`
    pub async fn assign(&self, id: u64, user_id: Option<u64>) -> Result<Ticket> {
        let request = ApiRequest::post(ticket_action(id, "assign"))
            .with_json(&AssignTicketRequest { user_id })?;
        self.client.request(request).await
    }

    // ─────────────────────────────────────────────────────────────
    // Comments
    // ─────────────────────────────────────────────────────────────

    pub async fn add_comment(&self, id: u64, content: &str, is_internal: bool) -> Result<Comment> {
        let comment = AddCommentRequest {
            content: content.trim().to_string(),
            is_internal,
        };
        comment.validate()?;

        let request = ApiRequest::post(ticket_action(id, "add_comment")).with_json(&comment)?;
        self.client.request(request).await
    }

    pub async fn comments(&self, id: u64) -> Result<Vec<Comment>> {
        let request =
            ApiRequest::get(COMMENTS_PATH).with_query(vec![("ticket".to_string(), id.to_string())]);
        self.client.request(request).await
    }

    // ─────────────────────────────────────────────────────────────
    // Attachments
    // ─────────────────────────────────────────────────────────────

    pub async fn upload_attachment(&self, id: u64, upload: AttachmentUpload) -> Result<Attachment> {
        upload.validate(DEFAULT_MAX_SIZE_MB)?;
        tracing::debug!(
            "Uploading {} ({}) to ticket {}",
            upload.filename,
            format_file_size(upload.content.len() as u64),
            id
        );

        let request =
            ApiRequest::post(ticket_action(id, "upload_attachment")).with_multipart(upload.into_fields());
        self.client.request(request).await
    }

    /// The server expects the attachment id in a DELETE body
    pub async fn delete_attachment(&self, id: u64, attachment_id: u64) -> Result<()> {
        let request = ApiRequest::delete(ticket_action(id, "delete_attachment"))
            .with_json(&DeleteAttachmentRequest { attachment_id })?;
        self.client.request_empty(request).await
    }

    pub async fn attachments(&self, id: u64) -> Result<Vec<Attachment>> {
        self.client
            .request(ApiRequest::get(ticket_action(id, "attachments")))
            .await
    }

    /// Fetch an attachment's content from its `file_url`
    pub async fn download_attachment(&self, file_url: &str) -> Result<Vec<u8>> {
        self.client.request_bytes(ApiRequest::get(file_url)).await
    }

    // ─────────────────────────────────────────────────────────────
    // Lookup tables
    // ─────────────────────────────────────────────────────────────

    pub async fn categories(&self) -> Result<Vec<Category>> {
        self.client.request(ApiRequest::get(CATEGORIES_PATH)).await
    }

    pub async fn create_category(&self, category: &CategoryRequest) -> Result<Category> {
        if category.name.is_none() {
            return Err(DeskError::validation_field("Category name is required", "name"));
        }
        category.validate()?;
        self.client
            .request(ApiRequest::post(CATEGORIES_PATH).with_json(category)?)
            .await
    }

    pub async fn update_category(&self, id: u64, category: &CategoryRequest) -> Result<Category> {
        category.validate()?;
        self.client
            .request(ApiRequest::patch(category_path(id)).with_json(category)?)
            .await
    }

    pub async fn delete_category(&self, id: u64) -> Result<()> {
        self.client
            .request_empty(ApiRequest::delete(category_path(id)))
            .await
    }

    pub async fn priorities(&self) -> Result<Vec<Priority>> {
        self.client.request(ApiRequest::get(PRIORITIES_PATH)).await
    }

    pub async fn statuses(&self) -> Result<Vec<Status>> {
        self.client.request(ApiRequest::get(STATUSES_PATH)).await
    }
}
