// ABOUTME: End-to-end tests running zd commands against a mock Zendesk API
// ABOUTME: Exercises config loading, client construction, caching, output formats and error paths

use chrono::{Duration as ChronoDuration, Utc};
use clap::Parser;
use mockito::{Matcher, Server, ServerGuard};
use secrecy::SecretString;
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use zendesk_cli::cli::Cli;
use zendesk_cli::cli_output::CliOutput;
use zendesk_cli::commands::App;
use zendesk_cli::config::{CliConfig, InstanceConfig};
use zendesk_sdk::OAuthTokens;

/// Captures everything a command writes to stdout
#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

struct Harness {
    temp_dir: TempDir,
    server: ServerGuard,
    output: SharedBuffer,
}

impl Harness {
    async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let mut config = CliConfig::default();
        config
            .add_instance(
                "work",
                InstanceConfig::token("acme", "agent@acme.com", "tok123"),
                true,
            )
            .unwrap();
        config.save_to_file(temp_dir.path().join("config.toml")).unwrap();

        Self {
            temp_dir,
            server: Server::new_async().await,
            output: SharedBuffer::default(),
        }
    }

    fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join("config.toml")
    }

    fn cache_dir(&self) -> PathBuf {
        self.temp_dir.path().join("cache")
    }

    fn app(&self) -> App {
        App::new(self.config_path(), CancellationToken::new())
            .with_api_base_url(self.server.url())
            .with_cache_dir(self.cache_dir())
            .with_output(Box::new(self.output.clone()))
    }

    async fn run(&self, args: &[&str]) -> anyhow::Result<String> {
        let mut argv = vec!["zd"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv)?;

        let mut app = self.app().with_instance(cli.instance).with_retry(cli.retry);
        app.run(cli.command).await?;
        Ok(self.output.contents())
    }
}

fn user(id: i64, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "email": format!("{}@acme.com", name.to_lowercase()),
        "role": "agent",
        "active": true,
        "suspended": false,
        "verified": true,
        "created_at": "2024-01-15T10:30:00Z",
        "updated_at": "2024-01-16T14:45:00Z"
    })
}

fn ticket(id: i64, subject: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "subject": subject,
        "description": "Smoke is coming out of tray 2",
        "status": status,
        "priority": "high",
        "type": "incident",
        "requester_id": 1,
        "assignee_id": null,
        "group_id": null,
        "tags": ["hardware"],
        "created_at": "2024-01-15T10:30:00Z",
        "updated_at": "2024-01-16T14:45:00Z"
    })
}

fn first_page(per_page: &str) -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("page".into(), "1".into()),
        Matcher::UrlEncoded("per_page".into(), per_page.into()),
    ])
}

#[tokio::test]
async fn test_user_list_table_with_next_page() {
    let mut harness = Harness::new().await;
    let mock = harness
        .server
        .mock("GET", "/users.json")
        .match_query(first_page("100"))
        .match_header("authorization", Matcher::Regex("^Basic ".to_string()))
        .with_status(200)
        .with_body(
            json!({
                "users": [user(1, "Ada"), user(2, "Grace")],
                "next_page": "https://acme.zendesk.com/api/v2/users.json?page=2",
                "count": 4
            })
            .to_string(),
        )
        .create_async()
        .await;

    let output = harness.run(&["user", "list"]).await.unwrap();

    assert!(output.contains("Ada"));
    assert!(output.contains("grace@acme.com"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_oversized_per_page_is_capped() {
    let mut harness = Harness::new().await;
    let mock = harness
        .server
        .mock("GET", "/users.json")
        .match_query(first_page("100"))
        .with_status(200)
        .with_body(json!({ "users": [user(1, "Ada")], "next_page": null }).to_string())
        .expect(1)
        .create_async()
        .await;

    let output = harness
        .run(&["user", "list", "--per-page", "500"])
        .await
        .unwrap();

    assert!(output.contains("Ada"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_expired_oauth_token_is_refreshed_and_saved() {
    let mut harness = Harness::new().await;
    let mut config = CliConfig::load_from_file(harness.config_path()).unwrap();
    let stale = OAuthTokens {
        access_token: SecretString::from("access-1".to_string()),
        refresh_token: Some(SecretString::from("refresh-1".to_string())),
        expires_at: Some(Utc::now() - ChronoDuration::minutes(5)),
    };
    config
        .add_instance(
            "sandbox",
            InstanceConfig::oauth("acme-sandbox", "zd_cli", "shh", &stale),
            false,
        )
        .unwrap();
    config.save_to_file(harness.config_path()).unwrap();

    let token = harness
        .server
        .mock("POST", "/oauth/tokens")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            Matcher::UrlEncoded("refresh_token".into(), "refresh-1".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "access_token": "access-2",
                "refresh_token": "refresh-2",
                "token_type": "bearer",
                "expires_in": 7200
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let me = harness
        .server
        .mock("GET", "/users/me.json")
        .match_header("authorization", "Bearer access-2")
        .with_status(200)
        .with_body(json!({ "user": user(1, "Ada") }).to_string())
        .expect(1)
        .create_async()
        .await;

    let mut app = harness
        .app()
        .with_instance(Some("sandbox".to_string()))
        .with_oauth_endpoint(harness.server.url());
    let cli = Cli::try_parse_from(["zd", "user", "me", "-o", "json"]).unwrap();
    app.run(cli.command).await.unwrap();

    token.assert_async().await;
    me.assert_async().await;

    let saved = CliConfig::load_from_file(harness.config_path()).unwrap();
    let sandbox = &saved.instances["sandbox"];
    assert_eq!(sandbox.oauth_token.as_deref(), Some("access-2"));
    assert_eq!(sandbox.oauth_refresh.as_deref(), Some("refresh-2"));
    assert!(sandbox.oauth_expiry.unwrap() > Utc::now() + ChronoDuration::minutes(60));
    assert_eq!(saved.current.as_deref(), Some("work"));
}

#[tokio::test]
async fn test_ticket_show_json() {
    let mut harness = Harness::new().await;
    harness
        .server
        .mock("GET", "/tickets/42.json")
        .with_status(200)
        .with_body(json!({ "ticket": ticket(42, "Printer on fire", "open") }).to_string())
        .create_async()
        .await;

    let output = harness
        .run(&["ticket", "show", "42", "-o", "json"])
        .await
        .unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["id"], 42);
    assert_eq!(parsed["subject"], "Printer on fire");
    assert_eq!(parsed["type"], "incident");
}

#[tokio::test]
async fn test_ticket_list_csv() {
    let mut harness = Harness::new().await;
    harness
        .server
        .mock("GET", "/tickets.json")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), "1".into()),
            Matcher::UrlEncoded("per_page".into(), "30".into()),
            Matcher::UrlEncoded("status".into(), "open".into()),
        ]))
        .with_status(200)
        .with_body(
            json!({
                "tickets": [ticket(1, "Printer on fire", "open")],
                "next_page": null,
                "count": 1
            })
            .to_string(),
        )
        .create_async()
        .await;

    let output = harness
        .run(&["ticket", "list", "--status", "open", "-o", "csv"])
        .await
        .unwrap();

    let mut lines = output.lines();
    assert!(lines.next().unwrap().starts_with("id,subject,status"));
    assert!(lines.next().unwrap().starts_with("1,Printer on fire,open"));
}

#[tokio::test]
async fn test_empty_list_message() {
    let mut harness = Harness::new().await;
    harness
        .server
        .mock("GET", "/groups.json")
        .match_query(first_page("100"))
        .with_status(200)
        .with_body(json!({ "groups": [], "next_page": null, "count": 0 }).to_string())
        .create_async()
        .await;

    let output = harness.run(&["group", "list"]).await.unwrap();
    assert_eq!(output.trim(), "No groups found.");
}

#[tokio::test]
async fn test_reads_are_cached_until_refresh() {
    let mut harness = Harness::new().await;
    let mock = harness
        .server
        .mock("GET", "/users/7.json")
        .with_status(200)
        .with_body(json!({ "user": user(7, "Ada") }).to_string())
        .expect(2)
        .create_async()
        .await;

    harness.run(&["user", "show", "7", "-o", "json"]).await.unwrap();
    harness.run(&["user", "show", "7", "-o", "json"]).await.unwrap();
    harness
        .run(&["user", "show", "7", "-o", "json", "--refresh"])
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_ticket_create_sends_defaults_and_tags() {
    let mut harness = Harness::new().await;
    let mock = harness
        .server
        .mock("POST", "/tickets.json")
        .match_body(Matcher::PartialJson(json!({
            "ticket": {
                "subject": "Printer on fire",
                "comment": { "body": "Smoke is coming out of tray 2" },
                "type": "incident",
                "status": "new",
                "tags": ["hardware", "office"]
            }
        })))
        .with_status(201)
        .with_body(json!({ "ticket": ticket(99, "Printer on fire", "new") }).to_string())
        .create_async()
        .await;

    let output = harness
        .run(&[
            "ticket",
            "create",
            "--subject",
            "Printer on fire",
            "--description",
            "Smoke is coming out of tray 2",
            "--tags",
            "hardware,office",
            "--assignee",
            "0",
            "-o",
            "json",
        ])
        .await
        .unwrap();

    assert!(output.contains("\"id\": 99"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_ticket_create_without_subject_fails_non_interactively() {
    let harness = Harness::new().await;
    let err = harness
        .run(&["ticket", "create", "--description", "x"])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("--subject"));
}

#[tokio::test]
async fn test_ticket_close_with_comment() {
    let mut harness = Harness::new().await;
    let mock = harness
        .server
        .mock("PUT", "/tickets/5.json")
        .match_body(Matcher::PartialJson(json!({
            "ticket": {
                "status": "closed",
                "comment": { "body": "Fixed", "public": true }
            }
        })))
        .with_status(200)
        .with_body(json!({ "ticket": ticket(5, "Printer on fire", "closed") }).to_string())
        .create_async()
        .await;

    harness
        .run(&["ticket", "close", "5", "--comment", "Fixed", "-o", "json"])
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_user_delete_requires_force_without_tty() {
    let mut harness = Harness::new().await;
    let mock = harness
        .server
        .mock("DELETE", "/users/3.json")
        .with_status(200)
        .with_body(json!({ "user": user(3, "Old") }).to_string())
        .expect(1)
        .create_async()
        .await;

    assert!(harness.run(&["user", "delete", "3"]).await.is_err());
    harness
        .run(&["user", "delete", "3", "--force"])
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_not_found_is_classified() {
    let mut harness = Harness::new().await;
    harness
        .server
        .mock("GET", "/tickets/404.json")
        .with_status(404)
        .with_body(json!({ "error": "RecordNotFound", "description": "Not found" }).to_string())
        .create_async()
        .await;

    let err = harness.run(&["ticket", "show", "404"]).await.unwrap_err();
    let lines = CliOutput::with_color(false).error_report(&err);

    assert!(lines[0].contains("Failed to get ticket 404"));
    assert!(lines
        .iter()
        .any(|line| line.starts_with("Suggestion: Verify the resource ID exists")));
}

#[tokio::test]
async fn test_unknown_instance_override() {
    let harness = Harness::new().await;
    let err = harness
        .run(&["user", "me", "--instance", "nope"])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Instance 'nope' not found"));
}

#[tokio::test]
async fn test_connection_summary() {
    let mut harness = Harness::new().await;
    harness
        .server
        .mock("GET", "/users/me.json")
        .with_status(200)
        .with_body(json!({ "user": user(1, "Ada") }).to_string())
        .expect_at_least(1)
        .create_async()
        .await;

    let output = harness.run(&["test"]).await.unwrap();

    assert!(output.contains("Authenticated as: Ada"));
    assert!(output.contains("Email: ada@acme.com"));
    assert!(output.contains("Role: agent"));
}

#[tokio::test]
async fn test_instance_commands_update_config() {
    let harness = Harness::new().await;

    harness
        .run(&[
            "instance",
            "add",
            "staging",
            "--subdomain",
            "https://acme-staging.zendesk.com",
            "--email",
            "agent@acme.com",
            "--api-token",
            "tok456",
        ])
        .await
        .unwrap();

    let config = CliConfig::load_from_file(harness.config_path()).unwrap();
    assert_eq!(config.instances["staging"].subdomain, "acme-staging");
    assert_eq!(config.current.as_deref(), Some("work"));

    harness.run(&["instance", "switch", "staging"]).await.unwrap();
    let output = harness.run(&["instance", "current"]).await.unwrap();
    assert!(output.contains("staging (acme-staging.zendesk.com, token auth)"));

    harness
        .run(&["instance", "remove", "staging", "--force"])
        .await
        .unwrap();
    let config = CliConfig::load_from_file(harness.config_path()).unwrap();
    assert_eq!(config.current.as_deref(), Some("work"));
    assert!(!config.instances.contains_key("staging"));
}

#[tokio::test]
async fn test_reauth_rejects_token_instances() {
    let harness = Harness::new().await;
    let err = harness.run(&["reauth", "work"]).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "instance 'work' uses token authentication, not OAuth"
    );

    let err = harness.run(&["reauth", "ghost"]).await.unwrap_err();
    assert_eq!(err.to_string(), "instance 'ghost' not found");
}

#[tokio::test]
async fn test_cache_info_and_clear() {
    let mut harness = Harness::new().await;
    harness
        .server
        .mock("GET", "/groups/400.json")
        .with_status(200)
        .with_body(
            json!({ "group": { "id": 400, "name": "Support", "created_at": "", "updated_at": "" } })
                .to_string(),
        )
        .create_async()
        .await;

    harness.run(&["group", "show", "400"]).await.unwrap();
    let output = harness.run(&["cache", "info"]).await.unwrap();
    assert!(output.contains("Entries:      1 (0 expired)"));
    assert!(output.contains("TTL:          10m"));

    harness.run(&["cache", "clear"]).await.unwrap();
    let entries = std::fs::read_dir(harness.cache_dir()).unwrap().count();
    assert_eq!(entries, 0);
}

#[tokio::test]
async fn test_completions_are_printed() {
    let harness = Harness::new().await;
    let output = harness.run(&["completions", "bash"]).await.unwrap();
    assert!(output.contains("zd"));
}
