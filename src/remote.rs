use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

use crate::errors::ServiceError;
use crate::models::{
    ApiConfigRow, AuthUser, ContentItem, EngagementRecord, NewContentItem, NewEngagementRecord,
    Session, User,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Users,
    ContentItems,
    EngagementData,
    ApiConfig,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::ContentItems => "content_items",
            Table::EngagementData => "engagement_data",
            Table::ApiConfig => "api_config",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Hosted backend: authentication plus the four tables the tracker reads
/// and writes. Row scoping to the signed-in user is the backend's job.
#[async_trait]
pub trait DataService: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<Session, ServiceError>;

    /// Creates an auth account; `metadata` is stored alongside it.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> Result<AuthUser, ServiceError>;

    async fn sign_out(&self) -> Result<(), ServiceError>;

    async fn get_session(&self) -> Result<Option<Session>, ServiceError>;

    /// Single-row read; a missing row is an error.
    async fn fetch_profile(&self, user_id: &str) -> Result<User, ServiceError>;

    async fn insert_profile(&self, user: &User) -> Result<(), ServiceError>;

    async fn update_profile_name(&self, user_id: &str, name: &str) -> Result<User, ServiceError>;

    /// Newest `created_at` first.
    async fn list_content(&self) -> Result<Vec<ContentItem>, ServiceError>;

    async fn insert_content(&self, item: &NewContentItem) -> Result<ContentItem, ServiceError>;

    async fn delete_content(&self, id: &str) -> Result<(), ServiceError>;

    /// Newest `timestamp` first, each row carrying a snapshot of its content.
    async fn list_engagement(&self) -> Result<Vec<EngagementRecord>, ServiceError>;

    async fn insert_engagement(&self, records: &[NewEngagementRecord]) -> Result<(), ServiceError>;

    async fn list_api_config(&self) -> Result<Vec<ApiConfigRow>, ServiceError>;

    /// Insert or replace, one row per user and platform.
    async fn upsert_api_config(&self, rows: &[ApiConfigRow]) -> Result<(), ServiceError>;
}
