// ABOUTME: User operations: listing, lookup, search, and account writes
// ABOUTME: Writes invalidate only the cached single-user entry

use crate::cache::CacheKey;
use crate::client::{decode, ZendeskClient};
use crate::models::{CreateUser, Page, PageEnvelope, Pagination, SingleEnvelope, UpdateUser, User};
use crate::Result;
use reqwest::Method;
use serde_json::json;

impl ZendeskClient {
    /// The user the credentials belong to
    pub async fn get_me(&self) -> Result<User> {
        let key = CacheKey::CurrentUser {
            subdomain: self.subdomain().to_string(),
        };
        let envelope: SingleEnvelope<User> = self
            .get_cached(key, "users/me.json", &[], "get current user")
            .await?;
        Ok(envelope.item)
    }

    pub async fn list_users(&self, page: u32, per_page: u32) -> Result<Page<User>> {
        let paging = Pagination::new(page, per_page);
        let key = CacheKey::UserList {
            subdomain: self.subdomain().to_string(),
            page: paging.page,
            per_page: paging.per_page,
        };
        let envelope: PageEnvelope<User> = self
            .get_cached(key, "users.json", &paging.query(), "list users")
            .await?;
        Ok(envelope.into())
    }

    pub async fn get_user(&self, id: i64) -> Result<User> {
        let envelope: SingleEnvelope<User> = self
            .get_cached(
                self.user_key(id),
                &format!("users/{id}.json"),
                &[],
                "get user",
            )
            .await?;
        Ok(envelope.item)
    }

    pub async fn search_users(&self, query: &str) -> Result<Page<User>> {
        let key = CacheKey::UserSearch {
            subdomain: self.subdomain().to_string(),
            query: query.to_string(),
        };
        let envelope: PageEnvelope<User> = self
            .get_cached(
                key,
                "users/search.json",
                &[("query", query.to_string())],
                "search users",
            )
            .await?;
        Ok(envelope.into())
    }

    pub async fn create_user(&self, user: &CreateUser) -> Result<User> {
        let body = self
            .write(
                Method::POST,
                "users.json",
                Some(json!({ "user": user })),
                &[],
                "create user",
            )
            .await?;
        Ok(decode::<SingleEnvelope<User>>(&body, "create user")?.item)
    }

    pub async fn update_user(&self, id: i64, update: &UpdateUser) -> Result<User> {
        self.put_user(id, json!({ "user": update }), "update user")
            .await
    }

    pub async fn suspend_user(&self, id: i64) -> Result<User> {
        self.put_user(id, json!({ "user": { "suspended": true } }), "suspend user")
            .await
    }

    pub async fn unsuspend_user(&self, id: i64) -> Result<User> {
        self.put_user(id, json!({ "user": { "suspended": false } }), "unsuspend user")
            .await
    }

    /// Delete a user; Zendesk answers 200 with the deleted record or 204
    pub async fn delete_user(&self, id: i64) -> Result<()> {
        self.write(
            Method::DELETE,
            &format!("users/{id}.json"),
            None,
            &[self.user_key(id)],
            "delete user",
        )
        .await?;
        Ok(())
    }

    async fn put_user(&self, id: i64, body: serde_json::Value, operation: &str) -> Result<User> {
        let body = self
            .write(
                Method::PUT,
                &format!("users/{id}.json"),
                Some(body),
                &[self.user_key(id)],
                operation,
            )
            .await?;
        Ok(decode::<SingleEnvelope<User>>(&body, operation)?.item)
    }

    fn user_key(&self, id: i64) -> CacheKey {
        CacheKey::User {
            subdomain: self.subdomain().to_string(),
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_helpers::*;
    use crate::{CreateUser, UpdateUser};
    use mockito::Matcher;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_list_users_reports_more_pages() {
        let mut server = mock_server().await;
        let mock = server
            .mock("GET", "/users.json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("per_page".into(), "30".into()),
            ]))
            .with_status(200)
            .with_body(
                mock_users_page(Some("https://acme.zendesk.com/api/v2/users.json?page=2"))
                    .to_string(),
            )
            .create_async()
            .await;

        let client = test_client(&server, None);
        let page = client.list_users(1, 30).await.unwrap();

        assert!(page.has_more());
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].name, "Ada");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_users_clamps_per_page() {
        let mut server = mock_server().await;
        let mock = server
            .mock("GET", "/users.json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("per_page".into(), "100".into()),
            ]))
            .with_status(200)
            .with_body(mock_users_page(None).to_string())
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server, None);
        let page = client.list_users(0, 500).await.unwrap();

        assert!(!page.has_more());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_cache_hit_avoids_network() {
        let temp_dir = TempDir::new().unwrap();
        let mut server = mock_server().await;
        let mock = server
            .mock("GET", "/users/1.json")
            .with_status(200)
            .with_body(json!({ "user": mock_user(1, "Ada") }).to_string())
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server, Some(temp_dir.path()));
        let first = client.get_user(1).await.unwrap();
        let second = client.get_user(1).await.unwrap();

        assert_eq!(first, second);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_invalidates_cached_user() {
        let temp_dir = TempDir::new().unwrap();
        let mut server = mock_server().await;
        let get = server
            .mock("GET", "/users/1.json")
            .with_status(200)
            .with_body(json!({ "user": mock_user(1, "Ada") }).to_string())
            .expect(2)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/users/1.json")
            .match_body(Matcher::Json(json!({ "user": { "name": "Ada L." } })))
            .with_status(200)
            .with_body(json!({ "user": mock_user(1, "Ada L.") }).to_string())
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server, Some(temp_dir.path()));
        client.get_user(1).await.unwrap();
        let updated = client
            .update_user(
                1,
                &UpdateUser {
                    name: Some("Ada L.".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Ada L.");
        client.get_user(1).await.unwrap();

        get.assert_async().await;
        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_write_leaves_list_cache_alone() {
        let temp_dir = TempDir::new().unwrap();
        let mut server = mock_server().await;
        let list = server
            .mock("GET", "/users.json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(mock_users_page(None).to_string())
            .expect(1)
            .create_async()
            .await;
        let _suspend = server
            .mock("PUT", "/users/1.json")
            .match_body(Matcher::Json(json!({ "user": { "suspended": true } })))
            .with_status(200)
            .with_body(json!({ "user": mock_user(1, "Ada") }).to_string())
            .create_async()
            .await;

        let client = test_client(&server, Some(temp_dir.path()));
        client.list_users(1, 30).await.unwrap();
        client.suspend_user(1).await.unwrap();
        client.list_users(1, 30).await.unwrap();

        list.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_users_uses_query_param() {
        let mut server = mock_server().await;
        let mock = server
            .mock("GET", "/users/search.json")
            .match_query(Matcher::UrlEncoded("query".into(), "ada lovelace".into()))
            .with_status(200)
            .with_body(mock_users_page(None).to_string())
            .create_async()
            .await;

        let client = test_client(&server, None);
        let page = client.search_users("ada lovelace").await.unwrap();

        assert_eq!(page.items.len(), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_user_wraps_body() {
        let mut server = mock_server().await;
        let mock = server
            .mock("POST", "/users.json")
            .match_body(Matcher::Json(json!({
                "user": { "name": "Grace", "email": "grace@example.com", "role": "agent" }
            })))
            .with_status(201)
            .with_body(json!({ "user": mock_user(7, "Grace") }).to_string())
            .create_async()
            .await;

        let client = test_client(&server, None);
        let user = client
            .create_user(&CreateUser {
                name: "Grace".to_string(),
                email: "grace@example.com".to_string(),
                role: Some("agent".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(user.id, 7);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_user_surfaces_validation_details() {
        let mut server = mock_server().await;
        let _mock = server
            .mock("POST", "/users.json")
            .with_status(422)
            .with_body(mock_validation_error_response().to_string())
            .create_async()
            .await;

        let client = test_client(&server, None);
        let error = client
            .create_user(&CreateUser {
                name: "Dup".to_string(),
                email: "dup@example.com".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();

        let api = error.api_error().unwrap();
        assert_eq!(api.status, 422);
        assert_eq!(api.message, "RecordInvalid");
        assert!(api.details.is_some());
    }

    #[tokio::test]
    async fn test_delete_user_accepts_no_content() {
        let mut server = mock_server().await;
        let mock = server
            .mock("DELETE", "/users/9.json")
            .with_status(204)
            .create_async()
            .await;

        let client = test_client(&server, None);
        client.delete_user(9).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let mut server = mock_server().await;
        let _mock = server
            .mock("GET", "/users/404.json")
            .with_status(404)
            .with_body(mock_not_found_response().to_string())
            .create_async()
            .await;

        let client = test_client(&server, None);
        let error = client.get_user(404).await.unwrap_err();
        assert!(error.is_not_found());
        assert_eq!(
            error.help_text(),
            Some("Verify the resource ID exists")
        );
    }

    #[tokio::test]
    async fn test_undecodable_body_is_not_cached() {
        let temp_dir = TempDir::new().unwrap();
        let mut server = mock_server().await;
        let mock = server
            .mock("GET", "/users/me.json")
            .with_status(200)
            .with_body(r#"{"unexpected": true}"#)
            .expect(2)
            .create_async()
            .await;

        let client = test_client(&server, Some(temp_dir.path()));
        assert!(client.get_me().await.is_err());
        assert!(client.get_me().await.is_err());
        mock.assert_async().await;
    }
}
