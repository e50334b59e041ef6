// ABOUTME: CLI argument definitions for the zd Zendesk client
// ABOUTME: Defines the command-line interface structure using clap derive macros

use crate::completions::Shell;
use crate::config::AuthType;
use crate::output::Format;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use zendesk_sdk::constants::{paging, urls};

/// Page size for user, organization and group listings
pub const LIST_PER_PAGE: u32 = paging::MAX_PER_PAGE;

/// Page size for ticket listings
pub const TICKET_PER_PAGE: u32 = paging::DEFAULT_PER_PAGE;

#[derive(Parser, Debug)]
#[command(name = "zd")]
#[command(about = "A CLI for Zendesk", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Use this instance instead of the current one
    #[arg(long, global = true)]
    pub instance: Option<String>,

    /// Config file path (default: ~/.zd/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable verbose output for debugging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Retry rate-limited and failed requests with backoff
    #[arg(long, global = true)]
    pub retry: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Set up the first Zendesk instance interactively
    Init {
        /// Instance name
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        setup: InstanceSetup,
    },
    /// Manage configured Zendesk instances
    Instance {
        #[command(subcommand)]
        command: InstanceCommand,
    },
    /// Test the connection to the current instance
    Test {
        /// Bypass cache and fetch fresh data
        #[arg(long)]
        refresh: bool,
    },
    /// Re-run OAuth authorization for an instance
    Reauth {
        /// Instance name (default: current instance)
        name: Option<String>,

        /// Local port for the OAuth callback
        #[arg(long, default_value_t = urls::OAUTH_CALLBACK_PORT)]
        port: u16,
    },
    /// Inspect or clear the local response cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
    /// Work with users
    User {
        #[command(subcommand)]
        command: UserCommand,
    },
    /// Work with tickets
    Ticket {
        #[command(subcommand)]
        command: TicketCommand,
    },
    /// Work with organizations
    #[command(alias = "organization")]
    Org {
        #[command(subcommand)]
        command: OrgCommand,
    },
    /// Work with groups
    Group {
        #[command(subcommand)]
        command: GroupCommand,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Credentials for a new instance; anything missing is prompted for
#[derive(Args, Debug, Clone, Default)]
pub struct InstanceSetup {
    /// Zendesk subdomain (the "acme" in acme.zendesk.com)
    #[arg(long)]
    pub subdomain: Option<String>,

    /// Authentication method
    #[arg(long, value_enum)]
    pub auth: Option<AuthType>,

    /// Agent email for API token authentication
    #[arg(long)]
    pub email: Option<String>,

    /// API token
    #[arg(long)]
    pub api_token: Option<String>,

    /// OAuth client ID
    #[arg(long)]
    pub client_id: Option<String>,

    /// OAuth client secret
    #[arg(long)]
    pub client_secret: Option<String>,

    /// Local port for the OAuth callback
    #[arg(long, default_value_t = urls::OAUTH_CALLBACK_PORT)]
    pub port: u16,
}

#[derive(Subcommand, Debug)]
pub enum InstanceCommand {
    /// Add a new instance
    Add {
        /// Instance name
        name: Option<String>,

        #[command(flatten)]
        setup: InstanceSetup,

        /// Make the new instance current
        #[arg(long)]
        switch: bool,
    },
    /// List configured instances
    List,
    /// Switch the current instance
    Switch {
        /// Instance name
        name: String,
    },
    /// Remove an instance
    Remove {
        /// Instance name
        name: String,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// Show the current instance
    Current,
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Show cache location, size and TTL
    Info,
    /// Remove every cached response
    Clear,
    /// Remove expired entries only
    Prune,
}

/// Output format selection shared by every command that prints records
#[derive(Args, Debug, Clone, Copy)]
pub struct OutputArgs {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t = Format::Table)]
    pub format: Format,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct ReadArgs {
    /// Bypass cache and fetch fresh data
    #[arg(long)]
    pub refresh: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct ListArgs {
    /// Page number
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,

    /// Results per page (max 100; larger values are capped) [default: 100, tickets: 30]
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub per_page: Option<u32>,

    #[command(flatten)]
    pub read: ReadArgs,
}

impl ListArgs {
    /// Requested page size, falling back to the listing's own default
    pub fn page_size(&self, default: u32) -> u32 {
        self.per_page.unwrap_or(default)
    }
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// List users
    List {
        #[command(flatten)]
        list: ListArgs,
    },
    /// Show a user
    Show {
        id: i64,
        #[command(flatten)]
        read: ReadArgs,
    },
    /// Show the authenticated user
    Me {
        #[command(flatten)]
        read: ReadArgs,
    },
    /// Search users by name or email
    Search {
        query: String,
        #[command(flatten)]
        read: ReadArgs,
    },
    /// Create a user
    Create {
        /// User name
        #[arg(long)]
        name: Option<String>,

        /// User email
        #[arg(long)]
        email: Option<String>,

        /// User role: end-user, agent, admin
        #[arg(long, default_value = "end-user")]
        role: String,

        /// Phone number
        #[arg(long)]
        phone: Option<String>,

        /// Organization ID
        #[arg(long)]
        organization: Option<i64>,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Update a user
    Update {
        id: i64,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New email
        #[arg(long)]
        email: Option<String>,

        /// New phone
        #[arg(long)]
        phone: Option<String>,

        /// New role: end-user, agent, admin
        #[arg(long)]
        role: Option<String>,

        /// Mark as verified
        #[arg(long)]
        verified: bool,

        /// New organization ID
        #[arg(long)]
        organization: Option<i64>,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Suspend a user
    Suspend {
        id: i64,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Lift a user's suspension
    Unsuspend {
        id: i64,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Delete a user
    Delete {
        id: i64,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum TicketCommand {
    /// List tickets
    List {
        /// Filter by status: new, open, pending, hold, solved, closed
        #[arg(long)]
        status: Option<String>,

        #[command(flatten)]
        list: ListArgs,
    },
    /// Show a ticket
    Show {
        id: i64,
        #[command(flatten)]
        read: ReadArgs,
    },
    /// Show the comments on a ticket
    Comments {
        id: i64,
        #[command(flatten)]
        read: ReadArgs,
    },
    /// Search tickets using Zendesk search syntax
    Search {
        query: String,
        #[command(flatten)]
        read: ReadArgs,
    },
    /// Create a ticket
    Create {
        /// Ticket subject
        #[arg(long)]
        subject: Option<String>,

        /// Ticket description
        #[arg(long)]
        description: Option<String>,

        /// Priority: low, normal, high, urgent
        #[arg(long)]
        priority: Option<String>,

        /// Type: problem, incident, question, task
        #[arg(long = "type", default_value = "incident")]
        ticket_type: String,

        /// Status: new, open, pending, hold, solved, closed
        #[arg(long, default_value = "new")]
        status: String,

        /// Requester user ID
        #[arg(long)]
        requester: Option<i64>,

        /// Assignee user ID
        #[arg(long)]
        assignee: Option<i64>,

        /// Group ID
        #[arg(long)]
        group: Option<i64>,

        /// Tags (comma-separated)
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Update a ticket
    Update {
        id: i64,

        /// New subject
        #[arg(long)]
        subject: Option<String>,

        /// New priority: low, normal, high, urgent
        #[arg(long)]
        priority: Option<String>,

        /// New status: new, open, pending, hold, solved, closed
        #[arg(long)]
        status: Option<String>,

        /// New type: problem, incident, question, task
        #[arg(long = "type")]
        ticket_type: Option<String>,

        /// New assignee user ID
        #[arg(long)]
        assignee: Option<i64>,

        /// New group ID
        #[arg(long)]
        group: Option<i64>,

        /// Tags to set (comma-separated)
        #[arg(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Add a comment to a ticket
    Comment {
        id: i64,

        /// Comment message
        #[arg(long, short)]
        message: Option<String>,

        /// Make the comment private (internal note)
        #[arg(long)]
        private: bool,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Assign a ticket to a user
    Assign {
        id: i64,
        user_id: i64,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Close a ticket
    Close {
        id: i64,

        /// Optional closing comment
        #[arg(long)]
        comment: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum OrgCommand {
    /// List organizations
    List {
        #[command(flatten)]
        list: ListArgs,
    },
    /// Show an organization
    Show {
        id: i64,
        #[command(flatten)]
        read: ReadArgs,
    },
    /// Search organizations by name
    Search {
        name: String,
        #[command(flatten)]
        read: ReadArgs,
    },
    /// List the users of an organization
    Users {
        id: i64,
        #[command(flatten)]
        list: ListArgs,
    },
    /// List the tickets of an organization
    Tickets {
        id: i64,
        #[command(flatten)]
        list: ListArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum GroupCommand {
    /// List groups
    List {
        #[command(flatten)]
        list: ListArgs,
    },
    /// Show a group
    Show {
        id: i64,
        #[command(flatten)]
        read: ReadArgs,
    },
    /// List the agents in a group
    Users {
        id: i64,
        #[command(flatten)]
        list: ListArgs,
    },
    /// List the memberships of a group
    Memberships {
        id: i64,
        #[command(flatten)]
        list: ListArgs,
    },
}
