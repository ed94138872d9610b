//! Test utilities and helpers for unit tests

pub mod test_helpers {
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    use crate::client::ApiClient;
    use crate::session::SessionManager;
    use crate::store::{MemoryStorage, ACCESS_TOKEN_KEY, CURRENT_USER_KEY, REFRESH_TOKEN_KEY};
    use crate::tests::mocks::{MockTransport, RecordingNavigator};

    /// Create a temporary directory for testing
    pub fn create_temp_dir() -> TempDir {
        tempfile::tempdir().expect("Failed to create temp dir")
    }

    /// Create a temporary file with content
    pub fn create_temp_file_with_content(dir: &TempDir, filename: &str, content: &[u8]) -> PathBuf {
        let file_path = dir.path().join(filename);
        std::fs::write(&file_path, content).expect("Failed to write temp file");
        file_path
    }

    /// Profile as served by `/api/auth/user/`
    pub fn sample_user() -> serde_json::Value {
        json!({
            "id": 1,
            "username": "alice",
            "email": "alice@example.com",
            "first_name": "Alice",
            "last_name": "Liddell",
            "is_staff": true,
            "is_superuser": false,
            "date_joined": "2024-03-01T09:30:00Z",
            "groups": [{ "id": 2, "name": "Support" }],
            "role": "Agent",
            "permissions": ["tickets.view_ticket", "tickets.change_ticket"]
        })
    }

    pub fn sample_ticket(id: u64) -> serde_json::Value {
        json!({
            "id": id,
            "ticket_number": format!("TKT-{:05}", id),
            "title": format!("Printer on floor {} is jammed", id),
            "description": "Paper stuck in tray 2",
            "category": { "id": 1, "name": "Hardware", "description": "", "created_at": "2024-01-01T00:00:00Z" },
            "priority": { "id": 3, "name": "HIGH", "display_name": "High", "level": 3, "color": "#f97316" },
            "status": { "id": 1, "name": "OPEN", "display_name": "Open", "is_closed": false },
            "created_by": { "id": 1, "username": "alice", "email": "alice@example.com", "first_name": "Alice", "last_name": "Liddell" },
            "assigned_to": null,
            "created_at": "2024-05-02T10:00:00Z",
            "updated_at": "2024-05-02T10:00:00Z",
            "resolved_at": null,
            "closed_at": null,
            "attachments": [],
            "tags": ["printer"],
            "comments_count": 0
        })
    }

    /// Logged-in client over a mock transport, restored from a cached profile
    pub async fn authenticated_client() -> (ApiClient<MockTransport>, Arc<MockTransport>) {
        let user = sample_user().to_string();
        let storage = Arc::new(MemoryStorage::with_items([
            (ACCESS_TOKEN_KEY, "A1"),
            (REFRESH_TOKEN_KEY, "R1"),
            (CURRENT_USER_KEY, user.as_str()),
        ]));
        let transport = Arc::new(MockTransport::new());
        let session = Arc::new(SessionManager::new(
            transport.clone(),
            storage,
            Arc::new(RecordingNavigator::default()),
        ));
        session.restore_session().await;
        (ApiClient::new(session), transport)
    }
}
