use console::{strip_ansi_codes, Term};
use owo_colors::OwoColorize;
use unicode_width::UnicodeWidthStr;

use ticketdesk_protocol::common::{Ticket, UserProfile};

use std::default::Default;

/// Human label for a priority machine name; unknown names pass through
pub fn priority_label(name: &str) -> &str {
    match name {
        "LOW" => "Low",
        "MEDIUM" => "Medium",
        "HIGH" => "High",
        "CRITICAL" => "Critical",
        other => other,
    }
}

/// Role shown next to a user; superusers are always administrators
pub fn role_label(user: &UserProfile) -> String {
    if user.is_superuser {
        return "Administrator".to_string();
    }
    user.role
        .as_deref()
        .filter(|role| !role.is_empty())
        .unwrap_or("User")
        .to_string()
}

/// Enhanced UI utilities
pub struct UI {
    term: Term,
}

impl UI {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }

    /// Helper method to conditionally apply color based on terminal support
    fn colorize<F>(&self, text: &str, color_fn: F) -> String
    where
        F: FnOnce(&str) -> String,
    {
        if self.supports_color() {
            color_fn(text)
        } else {
            text.to_string()
        }
    }

    /// Print a success message (color only if supported)
    pub fn success(&self, message: &str) {
        let output = self.colorize(message, |m| m.green().bold().to_string());
        println!("{}", output);
    }

    /// Print an error message (color only if supported)
    pub fn error(&self, message: &str) {
        let output = self.colorize(message, |m| m.red().bold().to_string());
        eprintln!("{}", output);
    }

    pub fn warning(&self, message: &str) {
        let output = self.colorize(message, |m| m.yellow().bold().to_string());
        println!("{}", output);
    }

    pub fn info(&self, message: &str) {
        let output = self.colorize(message, |m| m.blue().bold().to_string());
        println!("{}", output);
    }

    /// Format authentication status with appropriate color (if supported)
    pub fn format_auth_status(&self, authenticated: bool) -> String {
        if authenticated {
            self.colorize("Authenticated", |t| t.green().to_string())
        } else {
            self.colorize("Not authenticated", |t| t.red().to_string())
        }
    }

    /// Status name coloured by workflow stage
    pub fn format_status(&self, name: &str, display: &str) -> String {
        if !self.supports_color() {
            return display.to_string();
        }
        match name {
            "OPEN" => display.blue().to_string(),
            "IN_PROGRESS" => display.yellow().to_string(),
            "ON_HOLD" => display.magenta().to_string(),
            "RESOLVED" => display.green().to_string(),
            _ => display.dimmed().to_string(),
        }
    }

    pub fn format_priority(&self, name: &str) -> String {
        let label = priority_label(name);
        if !self.supports_color() {
            return label.to_string();
        }
        match name {
            "CRITICAL" => label.red().bold().to_string(),
            "HIGH" => label.red().to_string(),
            "MEDIUM" => label.yellow().to_string(),
            _ => label.to_string(),
        }
    }

    pub fn format_role(&self, user: &UserProfile) -> String {
        let label = role_label(user);
        if user.is_superuser {
            self.colorize(&label, |l| l.magenta().bold().to_string())
        } else {
            label
        }
    }

    /// Format user field with fallback for missing data
    pub fn format_user_field(&self, value: Option<String>) -> String {
        value
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "-".to_string())
    }

    /// Print a blank line for spacing
    pub fn blank_line(&self) {
        println!();
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        let term_width = self.width();
        let title_len = title.width() + 4;
        let line_len = if term_width > title_len {
            (term_width - title_len) / 2
        } else {
            0
        };

        let line = "═".repeat(line_len.min(30));

        println!();
        if self.supports_color() {
            println!("{} {} {}", line.cyan(), title.cyan().bold(), line.cyan());
        } else {
            println!("{} {} {}", line, title, line);
        }
        println!();
    }

    /// Print a separator line
    pub fn separator(&self) {
        let line = "─".repeat(self.width().min(80));
        println!("{}", self.colorize(&line, |l| l.dimmed().to_string()));
    }

    /// Create a card-style display for information
    pub fn card(&self, title: &str, content: Vec<(&str, String)>) {
        let card_width = self.width().saturating_sub(4).clamp(50, 80);
        let supports_color = self.supports_color();

        println!("╭{}╮", "─".repeat(card_width - 2));
        let title_spaces = card_width.saturating_sub(title.width() + 4);
        if supports_color {
            println!("│ {} {}│", title.cyan().bold(), " ".repeat(title_spaces));
        } else {
            println!("│ {} {}│", title, " ".repeat(title_spaces));
        }
        println!("├{}┤", "─".repeat(card_width - 2));

        for (label, value) in content {
            // Strip ANSI codes for width calculations
            let label_width = strip_ansi_codes(label).width();
            let value_width = strip_ansi_codes(&value).width();
            let content_width = label_width + value_width + 4;

            let spaces = if content_width < card_width - 1 {
                card_width - content_width - 1
            } else {
                1
            };

            if supports_color {
                println!("│ {}: {}{}│", label.dimmed(), value, " ".repeat(spaces));
            } else {
                println!("│ {}: {}{}│", label, value, " ".repeat(spaces));
            }
        }

        println!("╰{}╯", "─".repeat(card_width - 2));
        println!();
    }

    /// One line per ticket: number, status, priority, title
    pub fn ticket_table(&self, tickets: &[Ticket]) {
        if tickets.is_empty() {
            println!("{}", self.colorize("No tickets", |t| t.dimmed().to_string()));
            return;
        }

        let title_width = self.width().saturating_sub(48).clamp(20, 60);
        for ticket in tickets {
            let status = self.format_status(&ticket.status.name, &ticket.status.display_name);
            let priority = self.format_priority(&ticket.priority.name);
            println!(
                "{}  {}  {}  {}",
                pad(&ticket.ticket_number, 12),
                pad(&status, 12),
                pad(&priority, 9),
                truncate_to_width(&ticket.title, title_width),
            );
        }
    }

    /// Get terminal width for responsive layout
    pub fn width(&self) -> usize {
        self.term.size().1 as usize
    }

    /// Check if terminal supports color
    pub fn supports_color(&self) -> bool {
        self.term.features().colors_supported()
    }
}

impl Default for UI {
    fn default() -> Self {
        Self::new()
    }
}

/// Right-pad to `width` display columns, ignoring colour codes
fn pad(text: &str, width: usize) -> String {
    let visible = strip_ansi_codes(text).width();
    format!("{}{}", text, " ".repeat(width.saturating_sub(visible)))
}

fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }

    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 3 > max_width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push_str("...");
    out
}
