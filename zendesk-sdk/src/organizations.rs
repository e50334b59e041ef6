// ABOUTME: Organization operations: listing, lookup, name search, members and tickets
// ABOUTME: All reads go through the response cache

use crate::cache::CacheKey;
use crate::client::ZendeskClient;
use crate::models::{Organization, Page, PageEnvelope, Pagination, SingleEnvelope, Ticket, User};
use crate::Result;

impl ZendeskClient {
    pub async fn list_organizations(&self, page: u32, per_page: u32) -> Result<Page<Organization>> {
        let paging = Pagination::new(page, per_page);
        let key = CacheKey::OrganizationList {
            subdomain: self.subdomain().to_string(),
            page: paging.page,
            per_page: paging.per_page,
        };
        let envelope: PageEnvelope<Organization> = self
            .get_cached(key, "organizations.json", &paging.query(), "list organizations")
            .await?;
        Ok(envelope.into())
    }

    pub async fn get_organization(&self, id: i64) -> Result<Organization> {
        let key = CacheKey::Organization {
            subdomain: self.subdomain().to_string(),
            id,
        };
        let envelope: SingleEnvelope<Organization> = self
            .get_cached(
                key,
                &format!("organizations/{id}.json"),
                &[],
                "get organization",
            )
            .await?;
        Ok(envelope.item)
    }

    /// Look up organizations by name
    pub async fn search_organizations(&self, name: &str) -> Result<Page<Organization>> {
        let key = CacheKey::OrganizationSearch {
            subdomain: self.subdomain().to_string(),
            name: name.to_string(),
        };
        let envelope: PageEnvelope<Organization> = self
            .get_cached(
                key,
                "organizations/search.json",
                &[("name", name.to_string())],
                "search organizations",
            )
            .await?;
        Ok(envelope.into())
    }

    pub async fn get_organization_users(
        &self,
        id: i64,
        page: u32,
        per_page: u32,
    ) -> Result<Page<User>> {
        let paging = Pagination::new(page, per_page);
        let key = CacheKey::OrganizationUsers {
            subdomain: self.subdomain().to_string(),
            id,
            page: paging.page,
            per_page: paging.per_page,
        };
        let envelope: PageEnvelope<User> = self
            .get_cached(
                key,
                &format!("organizations/{id}/users.json"),
                &paging.query(),
                "list organization users",
            )
            .await?;
        Ok(envelope.into())
    }

    pub async fn get_organization_tickets(
        &self,
        id: i64,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Ticket>> {
        let paging = Pagination::new(page, per_page);
        let key = CacheKey::OrganizationTickets {
            subdomain: self.subdomain().to_string(),
            id,
            page: paging.page,
            per_page: paging.per_page,
        };
        let envelope: PageEnvelope<Ticket> = self
            .get_cached(
                key,
                &format!("organizations/{id}/tickets.json"),
                &paging.query(),
                "list organization tickets",
            )
            .await?;
        Ok(envelope.into())
    }
}
