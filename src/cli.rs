use dialoguer::{Confirm, Input, Password};
use std::path::PathBuf;
use std::sync::Arc;

use ticketdesk_protocol::api::{CategoryRequest, RegisterRequest, TicketCreate, TicketQuery, TicketUpdate};
use ticketdesk_protocol::common::{Ticket, UserProfile};

use crate::client::{ApiClient, HttpTransport};
use crate::config::{ConfigService, DeskConfig};
use crate::dashboard::Dashboard;
use crate::error::{DeskError, Result};
use crate::session::{Navigator, SessionManager};
use crate::store::{FileStorage, MemoryStorage, SessionStorage};
use crate::tickets::{AttachmentUpload, TicketService};
use crate::ui::{role_label, UI};
use crate::utils::format_file_size;
use crate::version::format_version_info;
use crate::{
    AttachArgs, CategoryCommand, Commands, CommentArgs, ConfigArgs, CreateArgs, DetachArgs,
    DownloadArgs, ListArgs, LoginArgs, RegisterArgs, TicketCommand, UpdateArgs,
};

/// Tells the terminal user to log in again once the session is gone
#[derive(Debug, Default)]
pub struct CliNavigator;

impl Navigator for CliNavigator {
    fn redirect_to_login(&self) {
        eprintln!("Your session has ended. Run `ticketdesk login` to sign in again.");
    }
}

/// CLI handler for processing commands
pub struct CliHandler {
    config_path: Option<PathBuf>,
    persist_session: bool,
    ui: UI,
}

impl CliHandler {
    /// Create a new CLI handler with a custom config path
    pub fn with_config_path(config_path: Option<PathBuf>) -> Self {
        Self {
            config_path,
            persist_session: true,
            ui: UI::new(),
        }
    }

    /// Disable the on-disk session file for this run
    pub fn without_session_storage(mut self) -> Self {
        self.persist_session = false;
        self
    }

    async fn load_config(&self) -> Result<DeskConfig> {
        DeskConfig::load(self.config_path.as_deref()).await
    }

    /// Build the client stack and restore any persisted session
    async fn connect(&self) -> Result<ApiClient<HttpTransport>> {
        let config = self.load_config().await?;
        let client_config = config.to_client_config()?;

        let storage: Arc<dyn SessionStorage> = if self.persist_session && client_config.token_storage.enabled {
            Arc::new(FileStorage::new(client_config.token_storage.clone().into())?)
        } else {
            Arc::new(MemoryStorage::new())
        };

        let transport = Arc::new(HttpTransport::new(client_config)?);
        let session = Arc::new(SessionManager::new(
            transport,
            storage,
            Arc::new(CliNavigator),
        ));
        session.restore_session().await;

        Ok(ApiClient::new(session))
    }

    async fn authenticated_client(&self) -> Result<ApiClient<HttpTransport>> {
        let client = self.connect().await?;
        if !client.session().is_authenticated() {
            return Err(DeskError::session_not_found());
        }
        Ok(client)
    }

    /// Execute a CLI command
    pub async fn execute(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Login(args) => self.handle_login(args).await,
            Commands::Register(args) => self.handle_register(args).await,
            Commands::Logout => self.handle_logout().await,
            Commands::Status => self.handle_status().await,
            Commands::Dashboard => self.handle_dashboard().await,
            Commands::Tickets(args) => self.handle_tickets(args.command).await,
            Commands::Comment(args) => self.handle_comment(args).await,
            Commands::Attach(args) => self.handle_attach(args).await,
            Commands::Detach(args) => self.handle_detach(args).await,
            Commands::Download(args) => self.handle_download(args).await,
            Commands::Categories(args) => self.handle_categories(args.command).await,
            Commands::Priorities => self.handle_priorities().await,
            Commands::Statuses => self.handle_statuses().await,
            Commands::Config(args) => self.handle_config(args).await,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Session
    // ─────────────────────────────────────────────────────────────

    async fn handle_login(&mut self, args: LoginArgs) -> Result<()> {
        let client = self.connect().await?;

        let username = match args.username {
            Some(username) => username,
            None => Input::<String>::new()
                .with_prompt("Username")
                .interact_text()?,
        };
        let password = Password::new().with_prompt("Password").interact()?;

        let user = client.session().login(&username, &password).await?;
        self.ui
            .success(&format!("Logged in as {} ({})", user.display_name(), role_label(&user)));
        Ok(())
    }

    async fn handle_register(&mut self, args: RegisterArgs) -> Result<()> {
        let client = self.connect().await?;

        let prompt = |value: Option<String>, label: &str, allow_empty: bool| -> Result<String> {
            match value {
                Some(value) => Ok(value),
                None => Ok(Input::<String>::new()
                    .with_prompt(label)
                    .allow_empty(allow_empty)
                    .interact_text()?),
            }
        };

        let username = prompt(args.username, "Username", false)?;
        let email = prompt(args.email, "Email", false)?;
        let first_name = prompt(args.first_name, "First name", true)?;
        let last_name = prompt(args.last_name, "Last name", true)?;
        let password = Password::new()
            .with_prompt("Password")
            .with_confirmation("Repeat password", "Passwords do not match")
            .interact()?;

        let registration = RegisterRequest {
            username,
            email,
            password2: password.clone(),
            password,
            first_name,
            last_name,
        };

        let user = client.session().register(&registration).await?;
        self.ui.success(&format!("Account created, logged in as {}", user.username));
        Ok(())
    }

    async fn handle_logout(&mut self) -> Result<()> {
        let client = self.connect().await?;
        let was_authenticated = client.session().is_authenticated();

        client.session().logout().await;

        if !was_authenticated {
            self.ui.info("Not logged in; removed any leftover credentials");
        }
        Ok(())
    }

    async fn handle_status(&mut self) -> Result<()> {
        let config = self.load_config().await?;
        let client = self.connect().await?;
        let session = client.session();

        let mut rows = vec![
            ("Version", format_version_info()),
            ("Server", config.endpoint.clone()),
            (
                "Authentication",
                self.ui.format_auth_status(session.is_authenticated()),
            ),
        ];

        if let Some(user) = session.current_user() {
            rows.extend(self.user_rows(&user));
        }

        self.ui.card("Status", rows);
        Ok(())
    }

    fn user_rows(&self, user: &UserProfile) -> Vec<(&'static str, String)> {
        let groups = user
            .groups
            .iter()
            .map(|g| g.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        vec![
            ("Username", user.username.clone()),
            ("Name", user.display_name()),
            ("Email", self.ui.format_user_field(Some(user.email.clone()))),
            ("Role", self.ui.format_role(user)),
            ("Groups", self.ui.format_user_field(Some(groups))),
        ]
    }

    async fn handle_dashboard(&mut self) -> Result<()> {
        let client = self.authenticated_client().await?;
        let dashboard = Dashboard::load(&client).await?;
        let stats = &dashboard.statistics;

        self.ui.card(
            "Statistics",
            vec![
                ("Total", stats.total.to_string()),
                ("Open", stats.open.to_string()),
                ("In progress", stats.in_progress.to_string()),
                ("Resolved", stats.resolved.to_string()),
                ("Closed", stats.closed.to_string()),
            ],
        );

        self.ui.header("My tickets");
        self.ui.ticket_table(&dashboard.my_tickets);
        self.ui.header("Assigned to me");
        self.ui.ticket_table(&dashboard.assigned_tickets);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Tickets
    // ─────────────────────────────────────────────────────────────

    async fn handle_tickets(&mut self, command: TicketCommand) -> Result<()> {
        let client = self.authenticated_client().await?;
        let service = TicketService::new(&client);

        match command {
            TicketCommand::List(args) => self.list_tickets(&service, args).await,
            TicketCommand::Show { id } => self.show_ticket(&service, id).await,
            TicketCommand::Create(args) => self.create_ticket(&service, args).await,
            TicketCommand::Update(args) => self.update_ticket(&service, args).await,
            TicketCommand::Delete { id, force } => {
                if !force && !self.confirm(&format!("Delete ticket {}?", id))? {
                    return Err(DeskError::user_cancelled());
                }
                service.delete(id).await?;
                self.ui.success(&format!("Ticket {} deleted", id));
                Ok(())
            }
            TicketCommand::Assign { id, user } => {
                let ticket = service.assign(id, user).await?;
                let assignee = ticket
                    .assigned_to
                    .map(|u| u.username)
                    .unwrap_or_else(|| "nobody".to_string());
                self.ui
                    .success(&format!("{} assigned to {}", ticket.ticket_number, assignee));
                Ok(())
            }
        }
    }

    async fn list_tickets(&self, service: &TicketService<'_, HttpTransport>, args: ListArgs) -> Result<()> {
        let tickets = if args.mine {
            service.my_tickets().await?
        } else if args.assigned {
            service.assigned_to_me().await?
        } else {
            let query = TicketQuery {
                search: args.search,
                status: args.status,
                priority: args.priority,
                category: args.category,
            };
            service.list(&query).await?
        };

        self.ui.ticket_table(&tickets);
        Ok(())
    }

    async fn show_ticket(&self, service: &TicketService<'_, HttpTransport>, id: u64) -> Result<()> {
        let ticket = service.get(id).await?;
        self.print_ticket(&ticket);

        let comments = match ticket.comments.clone() {
            Some(comments) => comments,
            None => service.comments(id).await?,
        };
        if !comments.is_empty() {
            self.ui.header("Comments");
            for comment in comments {
                let marker = if comment.is_internal { " [internal]" } else { "" };
                println!(
                    "{} {}{}",
                    comment.user.username,
                    comment.created_at.format("%Y-%m-%d %H:%M"),
                    marker
                );
                println!("  {}", comment.content);
            }
        }

        let attachments = match ticket.attachments_files.clone() {
            Some(attachments) => attachments,
            None => service.attachments(id).await?,
        };
        if !attachments.is_empty() {
            self.ui.header("Attachments");
            for attachment in attachments {
                println!(
                    "#{} {} ({})  {}",
                    attachment.id,
                    attachment.filename,
                    format_file_size(attachment.file_size),
                    attachment.file_url
                );
            }
        }

        Ok(())
    }

    fn print_ticket(&self, ticket: &Ticket) {
        let assignee = ticket
            .assigned_to
            .as_ref()
            .map(|u| u.username.clone());

        self.ui.card(
            &format!("{}  {}", ticket.ticket_number, ticket.title),
            vec![
                (
                    "Status",
                    self.ui
                        .format_status(&ticket.status.name, &ticket.status.display_name),
                ),
                ("Priority", self.ui.format_priority(&ticket.priority.name)),
                ("Category", ticket.category.name.clone()),
                ("Created by", ticket.created_by.username.clone()),
                ("Assigned to", self.ui.format_user_field(assignee)),
                ("Created", ticket.created_at.format("%Y-%m-%d %H:%M").to_string()),
                ("Tags", self.ui.format_user_field(Some(ticket.tags.join(", ")))),
            ],
        );
        println!("{}", ticket.description);
        self.ui.blank_line();
    }

    async fn create_ticket(&self, service: &TicketService<'_, HttpTransport>, args: CreateArgs) -> Result<()> {
        let ticket = TicketCreate {
            title: args.title,
            description: args.description,
            category: args.category,
            priority: args.priority,
            status: args.status,
            assigned_to: args.assign_to,
            tags: args.tags,
        };

        let created = service.create(&ticket).await?;
        self.ui.success(&format!(
            "Created {} (id {})",
            created.ticket_number, created.id
        ));
        Ok(())
    }

    async fn update_ticket(&self, service: &TicketService<'_, HttpTransport>, args: UpdateArgs) -> Result<()> {
        let update = TicketUpdate {
            title: args.title,
            description: args.description,
            category: args.category,
            priority: args.priority,
            status: args.status,
            assigned_to: args.assign_to,
            tags: args.tags,
        };

        let ticket = service.update(args.id, &update).await?;
        self.ui.success(&format!("Updated {}", ticket.ticket_number));
        Ok(())
    }

    async fn handle_comment(&mut self, args: CommentArgs) -> Result<()> {
        let client = self.authenticated_client().await?;
        let service = TicketService::new(&client);

        service
            .add_comment(args.ticket_id, &args.text, args.internal)
            .await?;
        self.ui.success("Comment added");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Attachments
    // ─────────────────────────────────────────────────────────────

    async fn handle_attach(&mut self, args: AttachArgs) -> Result<()> {
        let upload = AttachmentUpload::from_path(&args.file, args.description).await?;
        let client = self.authenticated_client().await?;
        let service = TicketService::new(&client);

        let attachment = service.upload_attachment(args.ticket_id, upload).await?;
        self.ui.success(&format!(
            "Attached {} ({}) as #{}",
            attachment.filename,
            format_file_size(attachment.file_size),
            attachment.id
        ));
        Ok(())
    }

    async fn handle_detach(&mut self, args: DetachArgs) -> Result<()> {
        let client = self.authenticated_client().await?;
        let service = TicketService::new(&client);

        service
            .delete_attachment(args.ticket_id, args.attachment_id)
            .await?;
        self.ui.success(&format!("Attachment #{} removed", args.attachment_id));
        Ok(())
    }

    async fn handle_download(&mut self, args: DownloadArgs) -> Result<()> {
        let client = self.authenticated_client().await?;
        let service = TicketService::new(&client);

        let content = service.download_attachment(&args.url).await?;
        tokio::fs::write(&args.dest, &content).await.map_err(|e| {
            DeskError::io_from_error(format!("Failed to write {}", args.dest.display()), e)
        })?;

        self.ui.success(&format!(
            "Saved {} to {}",
            format_file_size(content.len() as u64),
            args.dest.display()
        ));
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Lookup tables
    // ─────────────────────────────────────────────────────────────

    async fn handle_categories(&mut self, command: CategoryCommand) -> Result<()> {
        let client = self.authenticated_client().await?;
        let service = TicketService::new(&client);

        match command {
            CategoryCommand::List => {
                for category in service.categories().await? {
                    println!("{:>4}  {}  {}", category.id, category.name, category.description);
                }
            }
            CategoryCommand::Create { name, description } => {
                let category = service
                    .create_category(&CategoryRequest {
                        name: Some(name),
                        description,
                    })
                    .await?;
                self.ui
                    .success(&format!("Created category {} (id {})", category.name, category.id));
            }
            CategoryCommand::Update {
                id,
                name,
                description,
            } => {
                let category = service
                    .update_category(id, &CategoryRequest { name, description })
                    .await?;
                self.ui.success(&format!("Updated category {}", category.name));
            }
            CategoryCommand::Delete { id, force } => {
                if !force && !self.confirm(&format!("Delete category {}?", id))? {
                    return Err(DeskError::user_cancelled());
                }
                service.delete_category(id).await?;
                self.ui.success(&format!("Category {} deleted", id));
            }
        }
        Ok(())
    }

    async fn handle_priorities(&mut self) -> Result<()> {
        let client = self.authenticated_client().await?;
        let mut priorities = TicketService::new(&client).priorities().await?;
        priorities.sort_by_key(|p| p.level);

        for priority in priorities {
            println!(
                "{:>4}  {}  (level {})",
                priority.id,
                self.ui.format_priority(&priority.name),
                priority.level
            );
        }
        Ok(())
    }

    async fn handle_statuses(&mut self) -> Result<()> {
        let client = self.authenticated_client().await?;

        for status in TicketService::new(&client).statuses().await? {
            let closed = if status.is_closed { "  (closed)" } else { "" };
            println!(
                "{:>4}  {}{}",
                status.id,
                self.ui.format_status(&status.name, &status.display_name),
                closed
            );
        }
        Ok(())
    }

    async fn handle_config(&mut self, args: ConfigArgs) -> Result<()> {
        let config = self.load_config().await?;
        let mut service = match self.config_path.clone() {
            Some(path) => ConfigService::with_config_path(config, path),
            None => ConfigService::new(config),
        };
        service.handle_config(args.command).await
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        Ok(Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?)
    }
}
