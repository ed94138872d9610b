//! ticketdesk: client SDK and command-line tool for the ticketdesk support API
//!
//! The SDK side is [`session::SessionManager`] (credential state),
//! [`gatekeeper::Gatekeeper`] (bearer attachment and refresh-and-retry),
//! [`client::ApiClient`] and [`tickets::TicketService`]. The CLI side is
//! [`cli::CliHandler`] driven by the [`Cli`] argument parser.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod cli;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod gatekeeper;
pub mod session;
pub mod store;
pub mod tickets;
pub mod ui;
pub mod utils;
pub mod version;

#[cfg(test)]
mod tests;

pub use client::{ApiClient, ApiRequest, HttpTransport, RawResponse, Transport};
pub use error::{DeskError, ErrorCode, Result};
pub use session::{Navigator, SessionManager};

use version::CURRENT_VERSION;

#[derive(Parser)]
#[command(
    name = "ticketdesk",
    about = "Command-line client for the ticketdesk support-ticket API",
    long_about = "ticketdesk - manage support tickets from the terminal

WORKFLOW:
  1. Point the client at your server (ticketdesk config set-endpoint <URL>)
  2. Login with your username and password
  3. List, create, update and comment on tickets

QUICK START:
  ticketdesk login -u alice              # Authenticate (password is prompted)
  ticketdesk dashboard                   # Statistics and your ticket queues
  ticketdesk tickets list --status 1     # Filter tickets
  ticketdesk tickets show 42             # Ticket details with comments
  ticketdesk comment 42 \"On it\"          # Add a comment
  ticketdesk status                      # Check authentication status",
    version = CURRENT_VERSION,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, env = "TICKETDESK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Keep the session in memory only; nothing is read from or written to disk
    #[arg(long, global = true)]
    pub no_store: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Login with username and password
    Login(LoginArgs),

    /// Create an account and login
    Register(RegisterArgs),

    /// Logout and forget the stored session
    Logout,

    /// Show authentication status
    #[command(aliases = &["st"])]
    Status,

    /// Ticket statistics plus your created and assigned tickets
    #[command(aliases = &["dash"])]
    Dashboard,

    /// Manage tickets
    #[command(aliases = &["t"])]
    Tickets(TicketsArgs),

    /// Add a comment to a ticket
    Comment(CommentArgs),

    /// Attach a file to a ticket
    Attach(AttachArgs),

    /// Remove an attachment from a ticket
    Detach(DetachArgs),

    /// Download an attachment by its file URL
    Download(DownloadArgs),

    /// Manage ticket categories
    Categories(CategoriesArgs),

    /// List ticket priorities
    Priorities,

    /// List ticket statuses
    Statuses,

    /// Configure settings
    #[command(aliases = &["cfg"])]
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct LoginArgs {
    #[arg(short, long)]
    pub username: Option<String>,
}

#[derive(Args)]
pub struct RegisterArgs {
    #[arg(short, long)]
    pub username: Option<String>,

    #[arg(short, long)]
    pub email: Option<String>,

    #[arg(long)]
    pub first_name: Option<String>,

    #[arg(long)]
    pub last_name: Option<String>,
}

#[derive(Args)]
pub struct TicketsArgs {
    #[command(subcommand)]
    pub command: TicketCommand,
}

#[derive(Subcommand)]
pub enum TicketCommand {
    /// List tickets, optionally filtered
    #[command(aliases = &["ls"])]
    List(ListArgs),

    /// Show one ticket with its comments and attachments
    Show { id: u64 },

    /// Create a ticket
    Create(CreateArgs),

    /// Change fields of a ticket
    Update(UpdateArgs),

    /// Delete a ticket
    #[command(aliases = &["rm"])]
    Delete {
        id: u64,

        #[arg(short, long)]
        force: bool,
    },

    /// Assign a ticket; omit --user to unassign
    Assign {
        id: u64,

        #[arg(long)]
        user: Option<u64>,
    },
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(short, long)]
    pub search: Option<String>,

    #[arg(long)]
    pub status: Option<String>,

    #[arg(long)]
    pub priority: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    /// Only tickets you created
    #[arg(long, conflicts_with = "assigned")]
    pub mine: bool,

    /// Only tickets assigned to you
    #[arg(long)]
    pub assigned: bool,
}

#[derive(Args)]
pub struct CreateArgs {
    #[arg(short, long)]
    pub title: String,

    #[arg(short, long)]
    pub description: String,

    #[arg(long)]
    pub category: u64,

    #[arg(long)]
    pub priority: u64,

    #[arg(long)]
    pub status: u64,

    #[arg(long)]
    pub assign_to: Option<u64>,

    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Args)]
pub struct UpdateArgs {
    pub id: u64,

    #[arg(short, long)]
    pub title: Option<String>,

    #[arg(short, long)]
    pub description: Option<String>,

    #[arg(long)]
    pub category: Option<u64>,

    #[arg(long)]
    pub priority: Option<u64>,

    #[arg(long)]
    pub status: Option<u64>,

    #[arg(long)]
    pub assign_to: Option<u64>,

    /// Replaces all tags
    #[arg(long = "tag")]
    pub tags: Option<Vec<String>>,
}

#[derive(Args)]
pub struct CommentArgs {
    pub ticket_id: u64,

    pub text: String,

    /// Visible to staff only
    #[arg(long)]
    pub internal: bool,
}

#[derive(Args)]
pub struct AttachArgs {
    pub ticket_id: u64,

    pub file: PathBuf,

    #[arg(short, long)]
    pub description: Option<String>,
}

#[derive(Args)]
pub struct DetachArgs {
    pub ticket_id: u64,

    pub attachment_id: u64,
}

#[derive(Args)]
pub struct DownloadArgs {
    pub url: String,

    pub dest: PathBuf,
}

#[derive(Args)]
pub struct CategoriesArgs {
    #[command(subcommand)]
    pub command: CategoryCommand,
}

#[derive(Subcommand)]
pub enum CategoryCommand {
    #[command(aliases = &["ls"])]
    List,
    Create {
        name: String,

        #[arg(short, long)]
        description: Option<String>,
    },
    Update {
        id: u64,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        description: Option<String>,
    },
    #[command(aliases = &["rm"])]
    Delete {
        id: u64,

        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    Show,
    SetEndpoint { url: String },
    SetTimeout { seconds: u64 },
    SetVerbose { enabled: String },
    Reset,
}
