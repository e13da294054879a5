//! Per-platform engagement metric fetchers.
//!
//! Each platform exposes its numbers differently; a [`MetricsFetcher`] hides
//! that behind one call so the tracker can refresh every content item the
//! same way, picking the implementation by the item's platform tag.

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde_json::Value;
use std::{collections::BTreeMap, sync::Arc};

use crate::errors::FetchError;
use crate::models::{ApiConfig, ContentItem, MetricsSnapshot, Platform};

#[async_trait]
pub trait MetricsFetcher: Send + Sync {
    fn platform(&self) -> Platform;

    async fn fetch_metrics(
        &self,
        item: &ContentItem,
        config: &ApiConfig,
    ) -> Result<MetricsSnapshot, FetchError>;
}

/// One fetcher per platform.
#[derive(Clone)]
pub struct MetricsFetchers {
    fetchers: Vec<Arc<dyn MetricsFetcher>>,
}

impl MetricsFetchers {
    pub fn new(fetchers: Vec<Arc<dyn MetricsFetcher>>) -> Self {
        Self { fetchers }
    }

    pub fn http(client: Client, youtube_base: &str, linkedin_base: &str) -> Self {
        Self::new(vec![
            Arc::new(YoutubeFetcher::new(client.clone(), youtube_base)),
            Arc::new(ServiceNowFetcher::new(client.clone())),
            Arc::new(LinkedInFetcher::new(client, linkedin_base)),
        ])
    }

    pub fn fetcher_for(&self, platform: Platform) -> Option<&dyn MetricsFetcher> {
        self.fetchers
            .iter()
            .find(|fetcher| fetcher.platform() == platform)
            .map(|fetcher| fetcher.as_ref())
    }
}

pub struct YoutubeFetcher {
    client: Client,
    base_url: String,
}

impl YoutubeFetcher {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct YoutubeVideos {
    #[serde(default)]
    items: Vec<YoutubeVideo>,
}

#[derive(Debug, Deserialize)]
struct YoutubeVideo {
    #[serde(default)]
    statistics: BTreeMap<String, Value>,
}

#[async_trait]
impl MetricsFetcher for YoutubeFetcher {
    fn platform(&self) -> Platform {
        Platform::Youtube
    }

    async fn fetch_metrics(
        &self,
        item: &ContentItem,
        config: &ApiConfig,
    ) -> Result<MetricsSnapshot, FetchError> {
        let api_key = required(&config.youtube.api_key, Platform::Youtube)?;
        let video_id = content_id(item)?;

        let response = self
            .client
            .get(format!("{}/youtube/v3/videos", self.base_url))
            .query(&[("part", "statistics"), ("id", video_id), ("key", api_key)])
            .send()
            .await?;
        let videos: YoutubeVideos = read_json(Platform::Youtube, response).await?;
        let video = videos
            .items
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::NotFound(video_id.to_string()))?;

        let stats = &video.statistics;
        let mut snapshot = MetricsSnapshot {
            views: count(stats.get("viewCount")),
            likes: count(stats.get("likeCount")),
            comments: count(stats.get("commentCount")),
            shares: 0,
            other_metrics: BTreeMap::new(),
        };
        if let Some(favorites) = stats.get("favoriteCount") {
            snapshot
                .other_metrics
                .insert("favorites".into(), Value::from(count(Some(favorites))));
        }
        Ok(snapshot)
    }
}

pub struct ServiceNowFetcher {
    client: Client,
}

impl ServiceNowFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// `dev123` → `https://dev123.service-now.com`; hosts and full URLs pass through.
fn instance_url(instance: &str) -> String {
    let instance = instance.trim().trim_end_matches('/');
    if instance.starts_with("http://") || instance.starts_with("https://") {
        instance.to_string()
    } else if instance.contains('.') {
        format!("https://{instance}")
    } else {
        format!("https://{instance}.service-now.com")
    }
}

#[derive(Debug, Deserialize)]
struct ServiceNowRecord {
    result: BTreeMap<String, Value>,
}

#[async_trait]
impl MetricsFetcher for ServiceNowFetcher {
    fn platform(&self) -> Platform {
        Platform::Servicenow
    }

    async fn fetch_metrics(
        &self,
        item: &ContentItem,
        config: &ApiConfig,
    ) -> Result<MetricsSnapshot, FetchError> {
        let instance = required(&config.servicenow.instance, Platform::Servicenow)?;
        let username = required(&config.servicenow.username, Platform::Servicenow)?;
        let password = required(&config.servicenow.password, Platform::Servicenow)?;
        let sys_id = content_id(item)?;

        let mut url = Url::parse(&instance_url(instance))
            .map_err(|e| FetchError::Decode(format!("bad instance url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::Decode("instance url cannot be a base".into()))?
            .pop_if_empty()
            .extend(["api", "now", "table", "kb_knowledge", sys_id]);

        let response = self
            .client
            .get(url)
            .basic_auth(username, Some(password))
            .query(&[("sysparm_fields", "sys_view_count,helpful_count,rating")])
            .send()
            .await?;
        let record: ServiceNowRecord = read_json(Platform::Servicenow, response).await?;

        let mut other_metrics = BTreeMap::new();
        if let Some(rating) = record.result.get("rating").filter(|v| !is_blank(v)) {
            other_metrics.insert("rating".into(), rating.clone());
        }
        Ok(MetricsSnapshot {
            views: count(record.result.get("sys_view_count")),
            likes: count(record.result.get("helpful_count")),
            comments: 0,
            shares: 0,
            other_metrics,
        })
    }
}

pub struct LinkedInFetcher {
    client: Client,
    base_url: String,
}

impl LinkedInFetcher {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SocialActions {
    #[serde(default)]
    likes_summary: Option<LikesSummary>,
    #[serde(default)]
    comments_summary: Option<CommentsSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LikesSummary {
    #[serde(default)]
    total_likes: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentsSummary {
    #[serde(default)]
    aggregated_total_comments: u64,
}

#[async_trait]
impl MetricsFetcher for LinkedInFetcher {
    fn platform(&self) -> Platform {
        Platform::Linkedin
    }

    async fn fetch_metrics(
        &self,
        item: &ContentItem,
        config: &ApiConfig,
    ) -> Result<MetricsSnapshot, FetchError> {
        let token = required(&config.linkedin.access_token, Platform::Linkedin)?;
        let urn = content_id(item)?;

        let mut url = Url::parse(&self.base_url)
            .map_err(|e| FetchError::Decode(format!("bad LinkedIn base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::Decode("LinkedIn base url cannot be a base".into()))?
            .pop_if_empty()
            .extend(["v2", "socialActions", urn]);

        let response = self.client.get(url).bearer_auth(token).send().await?;
        let actions: SocialActions = read_json(Platform::Linkedin, response).await?;

        Ok(MetricsSnapshot {
            views: 0,
            likes: actions.likes_summary.map_or(0, |s| s.total_likes),
            comments: actions
                .comments_summary
                .map_or(0, |s| s.aggregated_total_comments),
            shares: 0,
            other_metrics: BTreeMap::new(),
        })
    }
}

fn required(value: &Option<String>, platform: Platform) -> Result<&str, FetchError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(FetchError::NotConfigured(platform))
}

fn content_id(item: &ContentItem) -> Result<&str, FetchError> {
    let id = item.content_id.trim();
    if id.is_empty() {
        Err(FetchError::MissingContentId)
    } else {
        Ok(id)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    platform: Platform,
    response: Response,
) -> Result<T, FetchError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(FetchError::Api {
            platform,
            status: status.as_u16(),
            message: message.trim().to_string(),
        });
    }
    response
        .json()
        .await
        .map_err(|e| FetchError::Decode(e.without_url().to_string()))
}

fn is_blank(value: &Value) -> bool {
    matches!(value, Value::Null) || value.as_str().is_some_and(|s| s.trim().is_empty())
}

/// Platforms report counts as numbers or decimal strings.
fn count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Best-effort platform id for a content URL, used when none is given.
pub fn derive_content_id(platform: Platform, url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    if platform == Platform::Youtube {
        if let Some((_, v)) = parsed.query_pairs().find(|(key, _)| key == "v") {
            return Some(v.into_owned()).filter(|v| !v.is_empty());
        }
        let host = parsed.host_str().unwrap_or_default();
        let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());
        return match (host.ends_with("youtu.be"), segments.next()) {
            (true, Some(id)) => Some(id.to_string()),
            (false, Some("shorts" | "embed" | "live")) => segments.next().map(str::to_string),
            _ => None,
        };
    }
    parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn youtube_ids_from_common_urls() {
        let id = |url| derive_content_id(Platform::Youtube, url);
        assert_eq!(id("https://youtube.com/watch?v=test123").as_deref(), Some("test123"));
        assert_eq!(id("https://www.youtube.com/watch?list=x&v=abc").as_deref(), Some("abc"));
        assert_eq!(id("https://youtu.be/xyz789").as_deref(), Some("xyz789"));
        assert_eq!(id("https://youtube.com/shorts/short1").as_deref(), Some("short1"));
        assert_eq!(id("https://youtube.com/channel"), None);
        assert_eq!(id("not a url"), None);
    }

    #[test]
    fn other_platforms_use_last_path_segment() {
        assert_eq!(
            derive_content_id(Platform::Servicenow, "https://community.servicenow.com/blog/test456/")
                .as_deref(),
            Some("test456")
        );
        assert_eq!(
            derive_content_id(Platform::Linkedin, "https://www.linkedin.com/feed/update/urn:li:share:42")
                .as_deref(),
            Some("urn:li:share:42")
        );
    }

    #[test]
    fn counts_accept_strings_and_numbers() {
        assert_eq!(count(Some(&json!("2000"))), 2000);
        assert_eq!(count(Some(&json!(15))), 15);
        assert_eq!(count(Some(&json!("n/a"))), 0);
        assert_eq!(count(None), 0);
    }

    #[test]
    fn instance_url_forms() {
        assert_eq!(instance_url("dev123"), "https://dev123.service-now.com");
        assert_eq!(instance_url("acme.service-now.com"), "https://acme.service-now.com");
        assert_eq!(instance_url("http://127.0.0.1:9000/"), "http://127.0.0.1:9000");
    }

    #[tokio::test]
    async fn transport_errors_keep_api_key_out_of_message() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .and_then(|listener| listener.local_addr())
            .map(|addr| addr.port())
            .unwrap();
        let fetcher = YoutubeFetcher::new(Client::new(), &format!("http://127.0.0.1:{port}"));
        let item = ContentItem {
            id: "c1".into(),
            user_id: None,
            name: "Video".into(),
            description: String::new(),
            platform: Platform::Youtube,
            url: "https://youtube.com/watch?v=x".into(),
            content_id: "x".into(),
            published_date: None,
            duration: None,
            created_at: chrono::Utc::now(),
            updated_at: None,
        };
        let mut config = ApiConfig::default();
        config.youtube.api_key = Some("SECRET-KEY-123".into());

        let err = fetcher.fetch_metrics(&item, &config).await.unwrap_err();
        assert!(matches!(err, FetchError::Request(_)));
        assert!(!err.to_string().contains("SECRET-KEY-123"), "{err}");
        assert!(!format!("{err:?}").contains("SECRET-KEY-123"));
    }

    #[test]
    fn registry_selects_by_platform() {
        let fetchers = MetricsFetchers::http(Client::new(), "https://www.googleapis.com", "https://api.linkedin.com");
        for platform in Platform::ALL {
            assert_eq!(fetchers.fetcher_for(platform).map(|f| f.platform()), Some(platform));
        }
        assert!(MetricsFetchers::new(Vec::new()).fetcher_for(Platform::Youtube).is_none());
    }
}
