// ABOUTME: This module handles output formatting for the zd CLI
// ABOUTME: It renders Zendesk records as tables with color support, JSON, or CSV

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::ValueEnum;
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;
use zendesk_sdk::{Comment, Group, GroupMembership, Organization, Ticket, User};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    #[default]
    Table,
    Json,
    Csv,
}

/// A Zendesk record that can be shown as a table row, a detail view, or CSV
pub trait Record: Serialize {
    /// Compact columns for list tables
    fn table_headers() -> &'static [&'static str];
    fn table_row(&self, style: &Styler) -> Vec<String>;

    /// Every exported column, used for CSV and detail views
    fn csv_headers() -> &'static [&'static str];
    fn csv_row(&self) -> Vec<String>;
}

pub trait OutputFormat {
    fn format_list<T: Record>(&self, items: &[T]) -> Result<String>;
    fn format_item<T: Record>(&self, item: &T) -> Result<String>;
}

/// Colors statuses and priorities when color output is enabled
#[derive(Debug, Clone, Copy)]
pub struct Styler {
    use_color: bool,
}

impl Styler {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    pub fn status(&self, status: &str) -> String {
        if !self.use_color {
            return status.to_string();
        }
        match status {
            "new" => status.cyan().to_string(),
            "open" => status.blue().to_string(),
            "pending" => status.yellow().to_string(),
            "hold" => status.magenta().to_string(),
            "solved" => status.green().to_string(),
            "closed" => status.bright_black().to_string(),
            _ => status.to_string(),
        }
    }

    pub fn priority(&self, priority: Option<&str>) -> String {
        let text = priority.unwrap_or("-");
        if !self.use_color {
            return text.to_string();
        }
        match text {
            "urgent" => text.red().bold().to_string(),
            "high" => text.yellow().to_string(),
            "low" | "-" => text.dimmed().to_string(),
            _ => text.to_string(),
        }
    }

    pub fn muted(&self, text: &str) -> String {
        if self.use_color {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }
}

pub struct TableFormatter {
    style: Styler,
}

impl TableFormatter {
    pub fn new(use_color: bool) -> Self {
        Self {
            style: Styler::new(use_color),
        }
    }
}

impl OutputFormat for TableFormatter {
    fn format_list<T: Record>(&self, items: &[T]) -> Result<String> {
        let mut builder = Builder::default();
        builder.push_record(T::table_headers().iter().map(|header| header.to_string()));
        for item in items {
            builder.push_record(item.table_row(&self.style));
        }

        let mut table = builder.build();
        table.with(Style::psql());
        Ok(table.to_string())
    }

    fn format_item<T: Record>(&self, item: &T) -> Result<String> {
        let mut builder = Builder::default();
        for (header, value) in T::csv_headers().iter().zip(item.csv_row()) {
            let value = if value.is_empty() {
                self.style.muted("-")
            } else {
                value
            };
            builder.push_record([field_label(header), value]);
        }

        let mut table = builder.build();
        table.with(Style::blank());
        Ok(table.to_string())
    }
}

pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        let encoded = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        encoded.context("Failed to encode JSON output")
    }
}

impl OutputFormat for JsonFormatter {
    fn format_list<T: Record>(&self, items: &[T]) -> Result<String> {
        self.encode(items)
    }

    fn format_item<T: Record>(&self, item: &T) -> Result<String> {
        self.encode(item)
    }
}

pub struct CsvFormatter;

impl CsvFormatter {
    fn write<T: Record>(items: &[&T]) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(T::csv_headers())?;
        for item in items {
            writer.write_record(item.csv_row())?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV output: {}", e.error()))?;
        String::from_utf8(bytes).context("CSV output was not valid UTF-8")
    }
}

impl OutputFormat for CsvFormatter {
    fn format_list<T: Record>(&self, items: &[T]) -> Result<String> {
        Self::write(&items.iter().collect::<Vec<_>>())
    }

    fn format_item<T: Record>(&self, item: &T) -> Result<String> {
        Self::write(&[item])
    }
}

pub fn render_list<T: Record>(format: Format, use_color: bool, items: &[T]) -> Result<String> {
    match format {
        Format::Table => TableFormatter::new(use_color).format_list(items),
        Format::Json => JsonFormatter::new(true).format_list(items),
        Format::Csv => CsvFormatter.format_list(items),
    }
}

pub fn render_item<T: Record>(format: Format, use_color: bool, item: &T) -> Result<String> {
    match format {
        Format::Table => TableFormatter::new(use_color).format_item(item),
        Format::Json => JsonFormatter::new(true).format_item(item),
        Format::Csv => CsvFormatter.format_item(item),
    }
}

/// Shorten to `max_chars` characters, marking the cut with "..."
pub fn truncate(text: &str, max_chars: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= max_chars {
        return single_line;
    }
    let kept: String = single_line.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// `2024-01-15T10:30:00Z` -> `2024-01-15 10:30`; anything unparseable is shown as-is
pub fn short_date(value: &str) -> String {
    DateTime::parse_from_rfc3339(value)
        .map(|date| date.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| value.to_string())
}

fn field_label(header: &str) -> String {
    let label = header.replace('_', " ");
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn id_or_dash(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

impl Record for User {
    fn table_headers() -> &'static [&'static str] {
        &["ID", "Name", "Email", "Role", "State"]
    }

    fn table_row(&self, style: &Styler) -> Vec<String> {
        let state = if self.suspended {
            "suspended".to_string()
        } else if self.active {
            "active".to_string()
        } else {
            style.muted("inactive")
        };
        vec![
            self.id.to_string(),
            truncate(&self.name, 30),
            self.email.clone(),
            self.role.clone(),
            state,
        ]
    }

    fn csv_headers() -> &'static [&'static str] {
        &[
            "id",
            "name",
            "email",
            "role",
            "active",
            "verified",
            "suspended",
            "organization_id",
            "phone",
            "time_zone",
            "created_at",
            "updated_at",
        ]
    }

    fn csv_row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.email.clone(),
            self.role.clone(),
            self.active.to_string(),
            self.verified.to_string(),
            self.suspended.to_string(),
            opt(self.organization_id),
            opt(self.phone.as_deref()),
            opt(self.time_zone.as_deref()),
            self.created_at.clone(),
            self.updated_at.clone(),
        ]
    }
}

impl Record for Ticket {
    fn table_headers() -> &'static [&'static str] {
        &["ID", "Subject", "Status", "Priority", "Assignee", "Updated"]
    }

    fn table_row(&self, style: &Styler) -> Vec<String> {
        vec![
            self.id.to_string(),
            truncate(&self.subject, 50),
            style.status(&self.status),
            style.priority(self.priority.as_deref()),
            id_or_dash(self.assignee_id),
            short_date(&self.updated_at),
        ]
    }

    fn csv_headers() -> &'static [&'static str] {
        &[
            "id",
            "subject",
            "status",
            "priority",
            "type",
            "requester_id",
            "assignee_id",
            "group_id",
            "organization_id",
            "tags",
            "created_at",
            "updated_at",
        ]
    }

    fn csv_row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.subject.clone(),
            self.status.clone(),
            opt(self.priority.as_deref()),
            opt(self.ticket_type.as_deref()),
            opt(self.requester_id),
            opt(self.assignee_id),
            opt(self.group_id),
            opt(self.organization_id),
            self.tags.join(";"),
            self.created_at.clone(),
            self.updated_at.clone(),
        ]
    }
}

impl Record for Comment {
    fn table_headers() -> &'static [&'static str] {
        &["ID", "Author", "Visibility", "Created", "Body"]
    }

    fn table_row(&self, style: &Styler) -> Vec<String> {
        let visibility = if self.public {
            "public".to_string()
        } else {
            style.muted("private")
        };
        vec![
            self.id.to_string(),
            id_or_dash(self.author_id),
            visibility,
            short_date(&self.created_at),
            truncate(comment_text(self), 60),
        ]
    }

    fn csv_headers() -> &'static [&'static str] {
        &["id", "author_id", "body", "public", "created_at"]
    }

    fn csv_row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            opt(self.author_id),
            comment_text(self).to_string(),
            self.public.to_string(),
            self.created_at.clone(),
        ]
    }
}

fn comment_text(comment: &Comment) -> &str {
    if comment.plain_body.is_empty() {
        &comment.body
    } else {
        &comment.plain_body
    }
}

impl Record for Organization {
    fn table_headers() -> &'static [&'static str] {
        &["ID", "Name", "Domains", "Created"]
    }

    fn table_row(&self, _style: &Styler) -> Vec<String> {
        vec![
            self.id.to_string(),
            truncate(&self.name, 40),
            truncate(&self.domain_names.join(", "), 40),
            short_date(&self.created_at),
        ]
    }

    fn csv_headers() -> &'static [&'static str] {
        &[
            "id",
            "name",
            "domain_names",
            "group_id",
            "shared_tickets",
            "shared_comments",
            "created_at",
            "updated_at",
        ]
    }

    fn csv_row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.domain_names.join(";"),
            opt(self.group_id),
            self.shared_tickets.to_string(),
            self.shared_comments.to_string(),
            self.created_at.clone(),
            self.updated_at.clone(),
        ]
    }
}

impl Record for Group {
    fn table_headers() -> &'static [&'static str] {
        &["ID", "Name", "Default", "Description"]
    }

    fn table_row(&self, style: &Styler) -> Vec<String> {
        let description = match self.description.as_deref() {
            Some(text) if !text.is_empty() => truncate(text, 50),
            _ => style.muted("-"),
        };
        vec![
            self.id.to_string(),
            self.name.clone(),
            if self.default { "yes" } else { "no" }.to_string(),
            description,
        ]
    }

    fn csv_headers() -> &'static [&'static str] {
        &["id", "name", "description", "default", "deleted", "created_at", "updated_at"]
    }

    fn csv_row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            opt(self.description.as_deref()),
            self.default.to_string(),
            self.deleted.to_string(),
            self.created_at.clone(),
            self.updated_at.clone(),
        ]
    }
}

impl Record for GroupMembership {
    fn table_headers() -> &'static [&'static str] {
        &["ID", "User ID", "Group ID", "Default", "Created"]
    }

    fn table_row(&self, _style: &Styler) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.user_id.to_string(),
            self.group_id.to_string(),
            if self.default { "yes" } else { "no" }.to_string(),
            short_date(&self.created_at),
        ]
    }

    fn csv_headers() -> &'static [&'static str] {
        &["id", "user_id", "group_id", "default", "created_at", "updated_at"]
    }

    fn csv_row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.user_id.to_string(),
            self.group_id.to_string(),
            self.default.to_string(),
            self.created_at.clone(),
            self.updated_at.clone(),
        ]
    }
}
