use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::{
    collections::{BTreeMap, HashSet},
    path::PathBuf,
    sync::atomic::{AtomicUsize, Ordering},
};
use tokio::sync::Mutex;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{
    ApiConfigRow, AuthUser, ContentItem, ContentSnapshot, EngagementRecord, NewContentItem,
    NewEngagementRecord, Session, User,
};
use crate::remote::{DataService, Table};
use crate::storage::{load_store, persist_store};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub password_digest: String,
    #[serde(default)]
    pub user_metadata: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEngagement {
    pub id: String,
    pub user_id: String,
    pub content_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub shares: u64,
    #[serde(default)]
    pub other_metrics: BTreeMap<String, Value>,
}

/// Everything the local backend knows, as stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalData {
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub content_items: Vec<ContentItem>,
    #[serde(default)]
    pub engagement_data: Vec<StoredEngagement>,
    #[serde(default)]
    pub api_config: Vec<ApiConfigRow>,
    #[serde(default)]
    pub session: Option<Session>,
}

pub fn password_digest(account_id: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(account_id.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Self-contained backend with the same contract as the hosted one, kept in
/// memory and optionally mirrored to a JSON file after every write.
pub struct LocalService {
    path: Option<PathBuf>,
    data: Mutex<LocalData>,
    failing: Mutex<HashSet<Table>>,
    calls: AtomicUsize,
}

impl LocalService {
    pub fn in_memory(data: LocalData) -> Self {
        Self {
            path: None,
            data: Mutex::new(data),
            failing: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub async fn open(path: PathBuf) -> Self {
        let data = load_store(&path).await;
        info!(
            "local store {} loaded: {} accounts, {} content items",
            path.display(),
            data.accounts.len(),
            data.content_items.len()
        );
        Self {
            path: Some(path),
            ..Self::in_memory(data)
        }
    }

    /// Makes every following operation on `table` fail until healed.
    pub async fn fail_table(&self, table: Table) {
        self.failing.lock().await.insert(table);
    }

    pub async fn heal_table(&self, table: Table) {
        self.failing.lock().await.remove(&table);
    }

    /// Number of operations served so far, auth included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> LocalData {
        self.data.lock().await.clone()
    }

    async fn enter(&self, table: Option<Table>) -> Result<(), ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(table) = table {
            if self.failing.lock().await.contains(&table) {
                return Err(ServiceError::Api {
                    status: 503,
                    message: format!("{table} is unavailable"),
                });
            }
        }
        Ok(())
    }

    /// Makes `next` the live store once it is on disk. A failed write leaves
    /// `current` untouched.
    async fn commit(&self, current: &mut LocalData, next: LocalData) -> Result<(), ServiceError> {
        if let Some(path) = &self.path {
            persist_store(path, &next).await.inspect_err(|err| {
                error!("failed to persist local store: {err}");
            })?;
        }
        *current = next;
        Ok(())
    }
}

fn session_user(data: &LocalData) -> Result<String, ServiceError> {
    data.session
        .as_ref()
        .map(|session| session.user.id.clone())
        .ok_or(ServiceError::NoSession)
}

fn api_error(status: u16, message: impl Into<String>) -> ServiceError {
    ServiceError::Api {
        status,
        message: message.into(),
    }
}

#[async_trait]
impl DataService for LocalService {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ServiceError> {
        self.enter(None).await?;
        let mut current = self.data.lock().await;
        let mut data = current.clone();
        let account = data
            .accounts
            .iter()
            .find(|account| account.email.eq_ignore_ascii_case(email.trim()))
            .filter(|account| account.password_digest == password_digest(&account.id, password))
            .ok_or_else(|| api_error(400, "Invalid login credentials"))?;

        let session = Session {
            access_token: Uuid::new_v4().to_string(),
            refresh_token: None,
            expires_at: None,
            user: AuthUser {
                id: account.id.clone(),
                email: Some(account.email.clone()),
                user_metadata: account.user_metadata.clone(),
            },
        };
        data.session = Some(session.clone());
        self.commit(&mut current, data).await?;
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> Result<AuthUser, ServiceError> {
        self.enter(None).await?;
        let email = email.trim();
        if !email.contains('@') {
            return Err(api_error(400, "Unable to validate email address: invalid format"));
        }
        if password.chars().count() < 6 {
            return Err(api_error(422, "Password should be at least 6 characters."));
        }

        let mut current = self.data.lock().await;
        let mut data = current.clone();
        if data
            .accounts
            .iter()
            .any(|account| account.email.eq_ignore_ascii_case(email))
        {
            return Err(api_error(422, "User already registered"));
        }

        let id = Uuid::new_v4().to_string();
        let account = Account {
            password_digest: password_digest(&id, password),
            id,
            email: email.to_string(),
            user_metadata: metadata,
            created_at: Utc::now(),
        };
        let user = AuthUser {
            id: account.id.clone(),
            email: Some(account.email.clone()),
            user_metadata: account.user_metadata.clone(),
        };
        data.accounts.push(account);
        self.commit(&mut current, data).await?;
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), ServiceError> {
        self.enter(None).await?;
        let mut current = self.data.lock().await;
        let mut data = current.clone();
        if data.session.take().is_some() {
            self.commit(&mut current, data).await?;
        }
        Ok(())
    }

    async fn get_session(&self) -> Result<Option<Session>, ServiceError> {
        self.enter(None).await?;
        Ok(self.data.lock().await.session.clone())
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<User, ServiceError> {
        self.enter(Some(Table::Users)).await?;
        self.data
            .lock()
            .await
            .users
            .iter()
            .find(|user| user.id == user_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound("User profile not found".into()))
    }

    async fn insert_profile(&self, user: &User) -> Result<(), ServiceError> {
        self.enter(Some(Table::Users)).await?;
        let mut current = self.data.lock().await;
        let mut data = current.clone();
        if data.users.iter().any(|existing| existing.id == user.id) {
            return Err(api_error(
                409,
                "duplicate key value violates unique constraint \"users_pkey\"",
            ));
        }
        let mut user = user.clone();
        user.created_at.get_or_insert_with(Utc::now);
        data.users.push(user);
        self.commit(&mut current, data).await
    }

    async fn update_profile_name(&self, user_id: &str, name: &str) -> Result<User, ServiceError> {
        self.enter(Some(Table::Users)).await?;
        let mut current = self.data.lock().await;
        let mut data = current.clone();
        if session_user(&data)? != user_id {
            return Err(api_error(403, "permission denied for table users"));
        }
        let user = data
            .users
            .iter_mut()
            .find(|user| user.id == user_id)
            .ok_or_else(|| ServiceError::NotFound("User profile not found".into()))?;
        user.name = name.to_string();
        let updated = user.clone();
        self.commit(&mut current, data).await?;
        Ok(updated)
    }

    async fn list_content(&self) -> Result<Vec<ContentItem>, ServiceError> {
        self.enter(Some(Table::ContentItems)).await?;
        let data = self.data.lock().await;
        let owner = session_user(&data)?;
        let mut items: Vec<ContentItem> = data
            .content_items
            .iter()
            .filter(|item| item.user_id.as_deref() == Some(owner.as_str()))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn insert_content(&self, item: &NewContentItem) -> Result<ContentItem, ServiceError> {
        self.enter(Some(Table::ContentItems)).await?;
        let mut current = self.data.lock().await;
        let mut data = current.clone();
        let owner = session_user(&data)?;
        let now = Utc::now();
        let stored = ContentItem {
            id: Uuid::new_v4().to_string(),
            user_id: Some(owner),
            name: item.name.clone(),
            description: item.description.clone(),
            platform: item.platform,
            url: item.url.clone(),
            content_id: item.content_id.clone(),
            published_date: item.published_date,
            duration: item.duration.clone(),
            created_at: now,
            updated_at: Some(now),
        };
        data.content_items.push(stored.clone());
        self.commit(&mut current, data).await?;
        Ok(stored)
    }

    async fn delete_content(&self, id: &str) -> Result<(), ServiceError> {
        self.enter(Some(Table::ContentItems)).await?;
        let mut current = self.data.lock().await;
        let mut data = current.clone();
        let owner = session_user(&data)?;
        let before = data.content_items.len();
        data.content_items
            .retain(|item| !(item.id == id && item.user_id.as_deref() == Some(owner.as_str())));
        if data.content_items.len() == before {
            return Ok(());
        }
        data.engagement_data.retain(|record| record.content_id != id);
        self.commit(&mut current, data).await
    }

    async fn list_engagement(&self) -> Result<Vec<EngagementRecord>, ServiceError> {
        self.enter(Some(Table::EngagementData)).await?;
        let data = self.data.lock().await;
        let owner = session_user(&data)?;
        let mut records: Vec<EngagementRecord> = data
            .engagement_data
            .iter()
            .filter(|record| record.user_id == owner)
            .map(|record| EngagementRecord {
                id: Some(record.id.clone()),
                content_id: record.content_id.clone(),
                timestamp: record.timestamp,
                views: record.views,
                likes: record.likes,
                comments: record.comments,
                shares: record.shares,
                other_metrics: record.other_metrics.clone(),
                content: data
                    .content_items
                    .iter()
                    .find(|item| item.id == record.content_id)
                    .map(ContentSnapshot::from),
            })
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    async fn insert_engagement(&self, records: &[NewEngagementRecord]) -> Result<(), ServiceError> {
        self.enter(Some(Table::EngagementData)).await?;
        let mut current = self.data.lock().await;
        let mut data = current.clone();
        let owner = session_user(&data)?;
        for record in records {
            let known = data.content_items.iter().any(|item| {
                item.id == record.content_id && item.user_id.as_deref() == Some(owner.as_str())
            });
            if !known {
                return Err(api_error(
                    409,
                    "insert or update on table \"engagement_data\" violates foreign key constraint",
                ));
            }
        }
        data.engagement_data
            .extend(records.iter().map(|record| StoredEngagement {
                id: Uuid::new_v4().to_string(),
                user_id: owner.clone(),
                content_id: record.content_id.clone(),
                timestamp: record.timestamp,
                views: record.views,
                likes: record.likes,
                comments: record.comments,
                shares: record.shares,
                other_metrics: record.other_metrics.clone(),
            }));
        self.commit(&mut current, data).await
    }

    async fn list_api_config(&self) -> Result<Vec<ApiConfigRow>, ServiceError> {
        self.enter(Some(Table::ApiConfig)).await?;
        let data = self.data.lock().await;
        let owner = session_user(&data)?;
        Ok(data
            .api_config
            .iter()
            .filter(|row| row.user_id.as_deref() == Some(owner.as_str()))
            .cloned()
            .collect())
    }

    async fn upsert_api_config(&self, rows: &[ApiConfigRow]) -> Result<(), ServiceError> {
        self.enter(Some(Table::ApiConfig)).await?;
        let mut current = self.data.lock().await;
        let mut data = current.clone();
        let owner = session_user(&data)?;
        for row in rows {
            data.api_config.retain(|existing| {
                !(existing.user_id.as_deref() == Some(owner.as_str())
                    && existing.platform == row.platform)
            });
            data.api_config.push(ApiConfigRow {
                user_id: Some(owner.clone()),
                platform: row.platform.clone(),
                config: row.config.clone(),
            });
        }
        self.commit(&mut current, data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Platform;
    use serde_json::json;

    async fn signed_in_service() -> (LocalService, String) {
        let service = LocalService::in_memory(LocalData::default());
        let user = service
            .sign_up("ada@example.com", "hunter22", json!({ "name": "Ada" }))
            .await
            .unwrap();
        service
            .insert_profile(&User {
                id: user.id.clone(),
                name: "Ada".into(),
                email: "ada@example.com".into(),
                created_at: None,
            })
            .await
            .unwrap();
        service
            .sign_in_with_password("ada@example.com", "hunter22")
            .await
            .unwrap();
        (service, user.id)
    }

    fn new_item(user_id: &str, name: &str) -> NewContentItem {
        NewContentItem {
            user_id: user_id.to_string(),
            name: name.to_string(),
            description: String::new(),
            platform: Platform::Youtube,
            url: format!("https://youtube.com/watch?v={name}"),
            content_id: name.to_string(),
            published_date: None,
            duration: None,
        }
    }

    #[tokio::test]
    async fn sign_in_checks_password_and_duplicates() {
        let (service, _) = signed_in_service().await;

        let err = service
            .sign_in_with_password("ada@example.com", "wrong")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid login credentials");

        let err = service
            .sign_up("ADA@example.com", "another1", Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "User already registered");
    }

    #[tokio::test]
    async fn deleting_content_drops_its_history() {
        let (service, user_id) = signed_in_service().await;
        let item = service.insert_content(&new_item(&user_id, "a")).await.unwrap();
        service
            .insert_engagement(&[NewEngagementRecord {
                user_id: user_id.clone(),
                content_id: item.id.clone(),
                timestamp: Utc::now(),
                views: 10,
                likes: 1,
                comments: 0,
                shares: 0,
                other_metrics: BTreeMap::new(),
            }])
            .await
            .unwrap();

        let records = service.list_engagement().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content.as_ref().map(|c| c.name.as_str()), Some("a"));

        service.delete_content(&item.id).await.unwrap();
        assert!(service.list_content().await.unwrap().is_empty());
        assert!(service.list_engagement().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rows_are_scoped_to_session_user() {
        let (service, user_id) = signed_in_service().await;
        service.insert_content(&new_item(&user_id, "mine")).await.unwrap();
        service.sign_out().await.unwrap();

        let err = service.list_content().await.unwrap_err();
        assert!(matches!(err, ServiceError::NoSession));

        service
            .sign_up("bob@example.com", "hunter33", Value::Null)
            .await
            .unwrap();
        service
            .sign_in_with_password("bob@example.com", "hunter33")
            .await
            .unwrap();
        assert!(service.list_content().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn injected_failure_hits_only_that_table() {
        let (service, _) = signed_in_service().await;
        service.fail_table(Table::EngagementData).await;

        assert!(service.list_content().await.is_ok());
        let err = service.list_engagement().await.unwrap_err();
        assert_eq!(err.to_string(), "engagement_data is unavailable");

        service.heal_table(Table::EngagementData).await;
        assert!(service.list_engagement().await.is_ok());
    }

    #[tokio::test]
    async fn failed_write_leaves_store_unchanged() {
        let (service, user_id) = signed_in_service().await;
        let blocker = std::env::temp_dir().join(format!(
            "engagement_tracker_blocker_{}_{}",
            std::process::id(),
            Uuid::new_v4()
        ));
        std::fs::write(&blocker, b"not a directory").unwrap();
        let service = LocalService {
            path: Some(blocker.join("store.json")),
            ..LocalService::in_memory(service.snapshot().await)
        };

        let err = service
            .insert_content(&new_item(&user_id, "lost"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));
        assert!(service.list_content().await.unwrap().is_empty());

        assert!(service.sign_out().await.is_err());
        assert!(service.get_session().await.unwrap().is_some());

        std::fs::remove_file(&blocker).unwrap();
    }

    #[tokio::test]
    async fn upsert_keeps_one_row_per_platform() {
        let (service, _) = signed_in_service().await;
        let row = |key: &str| ApiConfigRow {
            user_id: None,
            platform: "youtube".into(),
            config: json!({ "apiKey": key }),
        };
        service.upsert_api_config(&[row("one")]).await.unwrap();
        service.upsert_api_config(&[row("two")]).await.unwrap();

        let rows = service.list_api_config().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].config["apiKey"], "two");
    }
}
