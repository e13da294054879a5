use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Servicenow,
    Linkedin,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Youtube, Platform::Servicenow, Platform::Linkedin];

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Servicenow => "servicenow",
            Platform::Linkedin => "linkedin",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Platform::Youtube => "YouTube",
            Platform::Servicenow => "ServiceNow",
            Platform::Linkedin => "LinkedIn",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "youtube" => Ok(Platform::Youtube),
            "servicenow" => Ok(Platform::Servicenow),
            "linkedin" => Ok(Platform::Linkedin),
            other => Err(format!("unknown platform '{other}'")),
        }
    }
}

/// Profile row of the `users` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Identity returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub platform: Platform,
    pub url: String,
    #[serde(default)]
    pub content_id: String,
    #[serde(default)]
    pub published_date: Option<NaiveDate>,
    #[serde(default)]
    pub duration: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewContentItem {
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub platform: Platform,
    pub url: String,
    pub content_id: String,
    pub published_date: Option<NaiveDate>,
    pub duration: Option<String>,
}

/// Minimal view of a content item embedded in each engagement row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSnapshot {
    pub id: String,
    pub name: String,
    pub platform: Platform,
    pub url: String,
}

impl From<&ContentItem> for ContentSnapshot {
    fn from(item: &ContentItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            platform: item.platform,
            url: item.url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
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
    #[serde(default)]
    pub content: Option<ContentSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEngagementRecord {
    pub user_id: String,
    pub content_id: String,
    pub timestamp: DateTime<Utc>,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub other_metrics: BTreeMap<String, Value>,
}

/// Metrics reported by a platform, before they are tied to a user and time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub other_metrics: BTreeMap<String, Value>,
}

impl MetricsSnapshot {
    pub fn into_record(
        self,
        user_id: &str,
        content_id: &str,
        timestamp: DateTime<Utc>,
    ) -> NewEngagementRecord {
        NewEngagementRecord {
            user_id: user_id.to_string(),
            content_id: content_id.to_string(),
            timestamp,
            views: self.views,
            likes: self.likes,
            comments: self.comments,
            shares: self.shares,
            other_metrics: self.other_metrics,
        }
    }
}

/// Row of the `api_config` table. The platform is kept as text so rows for
/// platforms this build does not know about are skipped instead of failing
/// the whole load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfigRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub platform: String,
    #[serde(default)]
    pub config: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct YoutubeConfig {
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceNowConfig {
    pub instance: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinkedInConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
}

/// Credential bundles for all three platforms. Platforms without a stored
/// row keep the empty shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub youtube: YoutubeConfig,
    pub servicenow: ServiceNowConfig,
    pub linkedin: LinkedInConfig,
}

impl ApiConfig {
    pub fn from_rows(rows: &[ApiConfigRow]) -> Self {
        let mut config = ApiConfig::default();
        for row in rows {
            let Ok(platform) = row.platform.parse::<Platform>() else {
                tracing::warn!("ignoring api config for unknown platform '{}'", row.platform);
                continue;
            };
            let applied = match platform {
                Platform::Youtube => serde_json::from_value(row.config.clone())
                    .map(|value| config.youtube = value),
                Platform::Servicenow => serde_json::from_value(row.config.clone())
                    .map(|value| config.servicenow = value),
                Platform::Linkedin => serde_json::from_value(row.config.clone())
                    .map(|value| config.linkedin = value),
            };
            if let Err(err) = applied {
                tracing::warn!("ignoring malformed {platform} api config: {err}");
            }
        }
        config
    }

    pub fn to_rows(&self, user_id: &str) -> Vec<ApiConfigRow> {
        Platform::ALL
            .iter()
            .map(|platform| ApiConfigRow {
                user_id: Some(user_id.to_string()),
                platform: platform.as_str().to_string(),
                config: self.platform_value(*platform),
            })
            .collect()
    }

    fn platform_value(&self, platform: Platform) -> Value {
        let value = match platform {
            Platform::Youtube => serde_json::to_value(&self.youtube),
            Platform::Servicenow => serde_json::to_value(&self.servicenow),
            Platform::Linkedin => serde_json::to_value(&self.linkedin),
        };
        value.unwrap_or(Value::Null)
    }

    pub fn is_configured(&self, platform: Platform) -> bool {
        match platform {
            Platform::Youtube => present(&self.youtube.api_key),
            Platform::Servicenow => {
                present(&self.servicenow.instance)
                    && present(&self.servicenow.username)
                    && present(&self.servicenow.password)
            }
            Platform::Linkedin => present(&self.linkedin.access_token),
        }
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentForm {
    pub url: String,
    pub platform: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub published_date: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub content_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngagementForm {
    pub content_url: String,
    #[serde(default)]
    pub views: String,
    #[serde(default)]
    pub likes: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub shares: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiSettingsForm {
    #[serde(default)]
    pub youtube_api_key: String,
    #[serde(default)]
    pub servicenow_instance: String,
    #[serde(default)]
    pub servicenow_username: String,
    #[serde(default)]
    pub servicenow_password: String,
    #[serde(default)]
    pub linkedin_client_id: String,
    #[serde(default)]
    pub linkedin_client_secret: String,
    #[serde(default)]
    pub linkedin_access_token: String,
}

impl ApiSettingsForm {
    pub fn into_config(self) -> ApiConfig {
        ApiConfig {
            youtube: YoutubeConfig {
                api_key: non_empty(self.youtube_api_key),
            },
            servicenow: ServiceNowConfig {
                instance: non_empty(self.servicenow_instance),
                username: non_empty(self.servicenow_username),
                password: non_empty(self.servicenow_password),
            },
            linkedin: LinkedInConfig {
                client_id: non_empty(self.linkedin_client_id),
                client_secret: non_empty(self.linkedin_client_secret),
                access_token: non_empty(self.linkedin_access_token),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub name: String,
}

pub(crate) fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub content_count: usize,
    pub total_engagements: u64,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformPoint {
    pub platform: Platform,
    pub content_count: usize,
    pub views: u64,
    pub interactions: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPoint {
    pub id: String,
    pub name: String,
    pub platform: Platform,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: String,
    pub views: u64,
    pub interactions: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsResponse {
    pub totals: Totals,
    pub platforms: Vec<PlatformPoint>,
    pub content: Vec<ContentPoint>,
    pub last_7_days: Vec<DailyPoint>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub signed_in: bool,
    pub user: Option<User>,
    pub dark_mode: bool,
}
