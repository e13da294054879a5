use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::errors::ServiceError;
use crate::models::{
    ApiConfigRow, AuthUser, ContentItem, EngagementRecord, NewContentItem, NewEngagementRecord,
    Session, User,
};
use crate::remote::{DataService, Table};

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const ENGAGEMENT_SELECT: &str = "*,content:content_id(id,name,platform,url)";

/// Hosted Supabase project: GoTrue for auth, PostgREST for the tables.
/// The session lives only in this object.
pub struct SupabaseService {
    client: Client,
    base_url: String,
    anon_key: String,
    session: Mutex<Option<Session>>,
}

impl SupabaseService {
    pub fn new(client: Client, base_url: &str, anon_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            session: Mutex::new(None),
        }
    }

    fn auth_request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/auth/v1/{path}", self.base_url))
            .header("apikey", &self.anon_key)
    }

    async fn table_request(&self, method: Method, table: Table) -> RequestBuilder {
        let token = self.access_token().await;
        self.client
            .request(method, format!("{}/rest/v1/{table}", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
    }

    async fn access_token(&self) -> String {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|session| session.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, ServiceError> {
        let response = self
            .auth_request(Method::POST, "token")
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        read_json(response).await
    }
}

#[async_trait]
impl DataService for SupabaseService {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ServiceError> {
        let response = self
            .auth_request(Method::POST, "token")
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let session: Session = read_json(response).await?;
        *self.session.lock().await = Some(session.clone());
        info!(user_id = %session.user.id, "signed in");
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> Result<AuthUser, ServiceError> {
        let response = self
            .auth_request(Method::POST, "signup")
            .json(&json!({ "email": email, "password": password, "data": metadata }))
            .send()
            .await?;
        let body: Value = read_json(response).await?;

        // With email confirmation enabled the user comes back bare; otherwise
        // it is wrapped in a fresh session.
        if body.get("access_token").is_some() {
            let session: Session =
                serde_json::from_value(body).map_err(|e| ServiceError::Decode(e.to_string()))?;
            let user = session.user.clone();
            *self.session.lock().await = Some(session);
            return Ok(user);
        }
        let user = body.get("user").cloned().unwrap_or(body);
        serde_json::from_value(user).map_err(|e| ServiceError::Decode(e.to_string()))
    }

    async fn sign_out(&self) -> Result<(), ServiceError> {
        let Some(session) = self.session.lock().await.take() else {
            return Ok(());
        };
        let response = self
            .auth_request(Method::POST, "logout")
            .bearer_auth(&session.access_token)
            .send()
            .await?;
        expect_success(response).await
    }

    async fn get_session(&self) -> Result<Option<Session>, ServiceError> {
        let current = self.session.lock().await.clone();
        let Some(session) = current else {
            return Ok(None);
        };
        let expired = session
            .expires_at
            .is_some_and(|expires_at| expires_at <= Utc::now().timestamp());
        if !expired {
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token.as_deref() else {
            *self.session.lock().await = None;
            return Ok(None);
        };
        match self.refresh(refresh_token).await {
            Ok(fresh) => {
                *self.session.lock().await = Some(fresh.clone());
                Ok(Some(fresh))
            }
            Err(err) => {
                warn!("session refresh failed: {err}");
                *self.session.lock().await = None;
                Ok(None)
            }
        }
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<User, ServiceError> {
        let response = self
            .table_request(Method::GET, Table::Users)
            .await
            .query(&[("select", "*".to_string()), ("id", format!("eq.{user_id}"))])
            .header(header::ACCEPT, SINGLE_OBJECT)
            .send()
            .await?;
        read_json(response).await
    }

    async fn insert_profile(&self, user: &User) -> Result<(), ServiceError> {
        let response = self
            .table_request(Method::POST, Table::Users)
            .await
            .header("Prefer", "return=minimal")
            .json(&[user])
            .send()
            .await?;
        expect_success(response).await
    }

    async fn update_profile_name(&self, user_id: &str, name: &str) -> Result<User, ServiceError> {
        let response = self
            .table_request(Method::PATCH, Table::Users)
            .await
            .query(&[("id", format!("eq.{user_id}"))])
            .header("Prefer", "return=representation")
            .header(header::ACCEPT, SINGLE_OBJECT)
            .json(&json!({ "name": name }))
            .send()
            .await?;
        read_json(response).await
    }

    async fn list_content(&self) -> Result<Vec<ContentItem>, ServiceError> {
        let response = self
            .table_request(Method::GET, Table::ContentItems)
            .await
            .query(&[("select", "*"), ("order", "created_at.desc")])
            .send()
            .await?;
        read_json(response).await
    }

    async fn insert_content(&self, item: &NewContentItem) -> Result<ContentItem, ServiceError> {
        let response = self
            .table_request(Method::POST, Table::ContentItems)
            .await
            .header("Prefer", "return=representation")
            .header(header::ACCEPT, SINGLE_OBJECT)
            .json(item)
            .send()
            .await?;
        read_json(response).await
    }

    async fn delete_content(&self, id: &str) -> Result<(), ServiceError> {
        let response = self
            .table_request(Method::DELETE, Table::ContentItems)
            .await
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await?;
        expect_success(response).await
    }

    async fn list_engagement(&self) -> Result<Vec<EngagementRecord>, ServiceError> {
        let response = self
            .table_request(Method::GET, Table::EngagementData)
            .await
            .query(&[("select", ENGAGEMENT_SELECT), ("order", "timestamp.desc")])
            .send()
            .await?;
        read_json(response).await
    }

    async fn insert_engagement(&self, records: &[NewEngagementRecord]) -> Result<(), ServiceError> {
        if records.is_empty() {
            return Ok(());
        }
        let response = self
            .table_request(Method::POST, Table::EngagementData)
            .await
            .header("Prefer", "return=minimal")
            .json(records)
            .send()
            .await?;
        expect_success(response).await
    }

    async fn list_api_config(&self) -> Result<Vec<ApiConfigRow>, ServiceError> {
        let response = self
            .table_request(Method::GET, Table::ApiConfig)
            .await
            .query(&[("select", "*")])
            .send()
            .await?;
        read_json(response).await
    }

    async fn upsert_api_config(&self, rows: &[ApiConfigRow]) -> Result<(), ServiceError> {
        let response = self
            .table_request(Method::POST, Table::ApiConfig)
            .await
            .query(&[("on_conflict", "user_id,platform")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows)
            .send()
            .await?;
        expect_success(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }
    response
        .json::<T>()
        .await
        .map_err(|e| ServiceError::Decode(e.to_string()))
}

async fn expect_success(response: Response) -> Result<(), ServiceError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(api_error(response).await)
    }
}

async fn api_error(response: Response) -> ServiceError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    ServiceError::Api {
        status,
        message: error_message(&body),
    }
}

/// GoTrue and PostgREST disagree on where the human-readable text goes.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            ["msg", "message", "error_description", "error"]
                .iter()
                .find_map(|key| value.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}
