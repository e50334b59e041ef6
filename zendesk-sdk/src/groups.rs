// ABOUTME: Group operations: listing, lookup, members and memberships
// ABOUTME: All reads go through the response cache

use crate::cache::CacheKey;
use crate::client::ZendeskClient;
use crate::models::{Group, GroupMembership, Page, PageEnvelope, Pagination, SingleEnvelope, User};
use crate::Result;

impl ZendeskClient {
    pub async fn list_groups(&self, page: u32, per_page: u32) -> Result<Page<Group>> {
        let paging = Pagination::new(page, per_page);
        let key = CacheKey::GroupList {
            subdomain: self.subdomain().to_string(),
            page: paging.page,
            per_page: paging.per_page,
        };
        let envelope: PageEnvelope<Group> = self
            .get_cached(key, "groups.json", &paging.query(), "list groups")
            .await?;
        Ok(envelope.into())
    }

    pub async fn get_group(&self, id: i64) -> Result<Group> {
        let key = CacheKey::Group {
            subdomain: self.subdomain().to_string(),
            id,
        };
        let envelope: SingleEnvelope<Group> = self
            .get_cached(key, &format!("groups/{id}.json"), &[], "get group")
            .await?;
        Ok(envelope.item)
    }

    pub async fn get_group_users(&self, id: i64, page: u32, per_page: u32) -> Result<Page<User>> {
        let paging = Pagination::new(page, per_page);
        let key = CacheKey::GroupUsers {
            subdomain: self.subdomain().to_string(),
            id,
            page: paging.page,
            per_page: paging.per_page,
        };
        let envelope: PageEnvelope<User> = self
            .get_cached(
                key,
                &format!("groups/{id}/users.json"),
                &paging.query(),
                "list group users",
            )
            .await?;
        Ok(envelope.into())
    }

    pub async fn get_group_memberships(
        &self,
        id: i64,
        page: u32,
        per_page: u32,
    ) -> Result<Page<GroupMembership>> {
        let paging = Pagination::new(page, per_page);
        let key = CacheKey::GroupMemberships {
            subdomain: self.subdomain().to_string(),
            id,
            page: paging.page,
            per_page: paging.per_page,
        };
        let envelope: PageEnvelope<GroupMembership> = self
            .get_cached(
                key,
                &format!("groups/{id}/memberships.json"),
                &paging.query(),
                "list group memberships",
            )
            .await?;
        Ok(envelope.into())
    }
}

#[cfg(test)]
mod tests {
    use crate::test_helpers::*;
    use mockito::Matcher;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_list_groups_cached_per_page() {
        let temp_dir = TempDir::new().unwrap();
        let mut server = mock_server().await;
        let mock = server
            .mock("GET", "/groups.json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                json!({
                    "groups": [mock_group(1, "Support"), mock_group(2, "Billing")],
                    "next_page": "",
                    "count": 2
                })
                .to_string(),
            )
            .expect(2)
            .create_async()
            .await;

        let client = test_client(&server, Some(temp_dir.path()));
        let first = client.list_groups(1, 30).await.unwrap();
        client.list_groups(1, 30).await.unwrap();
        client.list_groups(2, 30).await.unwrap();

        assert!(first.items[0].default);
        assert!(!first.has_more());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_group_and_members() {
        let mut server = mock_server().await;
        let _group = server
            .mock("GET", "/groups/400.json")
            .with_status(200)
            .with_body(json!({ "group": mock_group(400, "Tier 2") }).to_string())
            .create_async()
            .await;
        let _users = server
            .mock("GET", "/groups/400/users.json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(mock_users_page(None).to_string())
            .create_async()
            .await;
        let _memberships = server
            .mock("GET", "/groups/400/memberships.json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(mock_memberships_page().to_string())
            .create_async()
            .await;

        let client = test_client(&server, None);
        assert_eq!(client.get_group(400).await.unwrap().name, "Tier 2");
        assert_eq!(client.get_group_users(400, 1, 30).await.unwrap().items.len(), 2);

        let memberships = client.get_group_memberships(400, 1, 30).await.unwrap();
        assert_eq!(memberships.items[0].user_id, 1);
        assert!(memberships.items[0].default);
    }
}
