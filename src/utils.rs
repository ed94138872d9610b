//! Attachment helpers

use std::path::Path;

/// Extensions the server accepts for ticket attachments
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "jpg", "jpeg", "png", "gif", "bmp", "txt", "zip", "rar",
];

pub const DEFAULT_MAX_SIZE_MB: u64 = 10;

/// Whether the file name carries an allowed extension (case-insensitive)
pub fn is_valid_file_type(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

pub fn is_valid_file_size(size: u64, max_size_mb: u64) -> bool {
    size <= max_size_mb.saturating_mul(1024 * 1024)
}

/// Format bytes into human readable string, e.g. `1.5 KB`
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;
    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    let rounded = (size * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit_index])
}
