//! Access to the host's organization and hotel records.

use crate::error::Result;
use crate::subscription::TenantRef;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Read-only view of tenants, supplied by the host application.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Whether the tenant exists.
    async fn tenant_exists(&self, tenant: &TenantRef) -> Result<bool>;

    /// Hotels owned by the tenant. A hotel owns itself.
    async fn count_hotels(&self, tenant: &TenantRef) -> Result<u64>;

    /// Users belonging to the tenant.
    async fn count_users(&self, tenant: &TenantRef) -> Result<u64>;
}

#[derive(Debug, Clone, Default)]
struct HotelRecord {
    organization_id: Option<String>,
    users: u64,
}

#[derive(Default)]
struct DirectoryInner {
    organizations: HashMap<String, u64>,
    hotels: HashMap<String, HotelRecord>,
}

/// In-memory tenant directory for tests and single-node setups.
#[derive(Clone, Default)]
pub struct InMemoryTenantDirectory {
    inner: Arc<RwLock<DirectoryInner>>,
}

impl InMemoryTenantDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an organization with its own user count.
    pub async fn add_organization(&self, id: impl Into<String>, users: u64) {
        self.inner.write().await.organizations.insert(id.into(), users);
    }

    /// Add or replace a hotel, optionally owned by an organization.
    pub async fn add_hotel(&self, id: impl Into<String>, organization_id: Option<&str>, users: u64) {
        self.inner.write().await.hotels.insert(
            id.into(),
            HotelRecord {
                organization_id: organization_id.map(str::to_string),
                users,
            },
        );
    }

    /// Remove a hotel.
    pub async fn remove_hotel(&self, id: &str) {
        self.inner.write().await.hotels.remove(id);
    }

    /// Set the user count of an existing organization or hotel.
    pub async fn set_users(&self, tenant: &TenantRef, users: u64) {
        let mut inner = self.inner.write().await;
        match tenant {
            TenantRef::Organization(id) => {
                if let Some(count) = inner.organizations.get_mut(id) {
                    *count = users;
                }
            }
            TenantRef::Hotel(id) => {
                if let Some(hotel) = inner.hotels.get_mut(id) {
                    hotel.users = users;
                }
            }
        }
    }
}

#[async_trait]
impl TenantDirectory for InMemoryTenantDirectory {
    async fn tenant_exists(&self, tenant: &TenantRef) -> Result<bool> {
        let inner = self.inner.read().await;
        Ok(match tenant {
            TenantRef::Organization(id) => inner.organizations.contains_key(id),
            TenantRef::Hotel(id) => inner.hotels.contains_key(id),
        })
    }

    async fn count_hotels(&self, tenant: &TenantRef) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(match tenant {
            TenantRef::Organization(id) => inner
                .hotels
                .values()
                .filter(|h| h.organization_id.as_deref() == Some(id.as_str()))
                .count() as u64,
            TenantRef::Hotel(id) => u64::from(inner.hotels.contains_key(id)),
        })
    }

    /// Organization users are its own members plus the users of each owned hotel.
    async fn count_users(&self, tenant: &TenantRef) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(match tenant {
            TenantRef::Organization(id) => {
                let own = inner.organizations.get(id).copied().unwrap_or(0);
                let hotel_users: u64 = inner
                    .hotels
                    .values()
                    .filter(|h| h.organization_id.as_deref() == Some(id.as_str()))
                    .map(|h| h.users)
                    .sum();
                own + hotel_users
            }
            TenantRef::Hotel(id) => inner.hotels.get(id).map_or(0, |h| h.users),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_organization_counts() {
        let directory = InMemoryTenantDirectory::new();
        directory.add_organization("org_1", 2).await;
        directory.add_hotel("h_1", Some("org_1"), 3).await;
        directory.add_hotel("h_2", Some("org_1"), 4).await;
        directory.add_hotel("h_3", None, 9).await;

        let org = TenantRef::organization("org_1");
        assert!(directory.tenant_exists(&org).await.unwrap());
        assert_eq!(directory.count_hotels(&org).await.unwrap(), 2);
        assert_eq!(directory.count_users(&org).await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_hotel_counts() {
        let directory = InMemoryTenantDirectory::new();
        directory.add_hotel("h_1", None, 5).await;

        let hotel = TenantRef::hotel("h_1");
        assert_eq!(directory.count_hotels(&hotel).await.unwrap(), 1);
        assert_eq!(directory.count_users(&hotel).await.unwrap(), 5);

        directory.set_users(&hotel, 6).await;
        assert_eq!(directory.count_users(&hotel).await.unwrap(), 6);

        let missing = TenantRef::hotel("h_404");
        assert!(!directory.tenant_exists(&missing).await.unwrap());
        assert_eq!(directory.count_hotels(&missing).await.unwrap(), 0);
    }
}
