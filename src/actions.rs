use chrono::{NaiveDate, Utc};
use reqwest::Url;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::errors::{FetchError, TrackerError};
use crate::models::{
    non_empty, ApiConfig, ContentForm, ContentItem, EngagementForm, NewContentItem,
    NewEngagementRecord, Platform, User,
};
use crate::platforms::derive_content_id;
use crate::tracker::{Notice, Tracker};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RefreshSummary {
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Tracker {
    /// Stores a new item. A failed reload afterwards does not undo or hide
    /// the insert; the loader reports it and the item is still returned.
    pub async fn add_content(&mut self, form: ContentForm) -> Result<ContentItem, TrackerError> {
        match self.try_add_content(form).await {
            Ok((item, false)) => Ok(item),
            result => self.report(result.map(|(item, _)| item), |item| {
                format!("Added \"{}\"", item.name)
            }),
        }
    }

    async fn try_add_content(
        &mut self,
        form: ContentForm,
    ) -> Result<(ContentItem, bool), TrackerError> {
        let user = self.require_user()?;
        let item = validate_content(&user, form)?;
        if self.content_by_url(&item.url).is_some() {
            return Err(TrackerError::Validation(
                "This URL is already being tracked".into(),
            ));
        }

        let stored = self.service.insert_content(&item).await?;
        info!(content_id = %stored.id, platform = %stored.platform, "content added");
        let reloaded = self.load_user_data().await.is_ok();
        Ok((stored, reloaded))
    }

    pub async fn delete_content(&mut self, id: &str) -> Result<(), TrackerError> {
        let result = self.try_delete_content(id).await;
        self.report(result, |name| format!("Deleted \"{name}\""))
            .map(|_| ())
    }

    async fn try_delete_content(&mut self, id: &str) -> Result<String, TrackerError> {
        self.require_user()?;
        let name = self
            .content
            .iter()
            .find(|item| item.id == id)
            .map(|item| item.name.clone())
            .ok_or_else(|| TrackerError::Validation("Unknown content item".into()))?;

        self.service.delete_content(id).await?;
        info!(content_id = %id, "content deleted");
        self.load_user_data().await?;
        Ok(name)
    }

    /// Appends a manually entered snapshot for the item tracked at `content_url`.
    pub async fn record_engagement(&mut self, form: EngagementForm) -> Result<(), TrackerError> {
        let result = self.try_record_engagement(form).await;
        self.report(result, |name| format!("Recorded engagement for \"{name}\""))
            .map(|_| ())
    }

    async fn try_record_engagement(&mut self, form: EngagementForm) -> Result<String, TrackerError> {
        let user = self.require_user()?;
        let item = self
            .content_by_url(&form.content_url)
            .ok_or_else(|| TrackerError::Validation("No tracked content for that URL".into()))?;
        let (content_id, name) = (item.id.clone(), item.name.clone());

        let record = NewEngagementRecord {
            user_id: user.id,
            content_id,
            timestamp: Utc::now(),
            views: parse_count("views", &form.views)?,
            likes: parse_count("likes", &form.likes)?,
            comments: parse_count("comments", &form.comments)?,
            shares: parse_count("shares", &form.shares)?,
            other_metrics: BTreeMap::new(),
        };
        self.service.insert_engagement(&[record]).await?;
        self.load_user_data().await?;
        Ok(name)
    }

    /// Asks each item's platform for fresh numbers and appends them as new
    /// records. Items whose platform is not configured are skipped.
    pub async fn refresh_metrics(&mut self) -> Result<RefreshSummary, TrackerError> {
        let result = self.try_refresh_metrics().await;
        self.report(result, |summary| {
            let mut message = format!("Updated metrics for {} item(s)", summary.updated);
            if summary.skipped > 0 {
                message.push_str(&format!(", {} skipped", summary.skipped));
            }
            if summary.failed > 0 {
                message.push_str(&format!(", {} failed", summary.failed));
            }
            message
        })
    }

    async fn try_refresh_metrics(&mut self) -> Result<RefreshSummary, TrackerError> {
        let user = self.require_user()?;
        let now = Utc::now();
        let mut summary = RefreshSummary::default();
        let mut records = Vec::new();

        for item in &self.content {
            let Some(fetcher) = self.fetchers.fetcher_for(item.platform) else {
                summary.skipped += 1;
                continue;
            };
            match fetcher.fetch_metrics(item, &self.api_config).await {
                Ok(snapshot) => records.push(snapshot.into_record(&user.id, &item.id, now)),
                Err(FetchError::NotConfigured(_)) | Err(FetchError::MissingContentId) => {
                    summary.skipped += 1;
                }
                Err(err) => {
                    warn!(content_id = %item.id, platform = %item.platform, "metrics fetch failed: {err}");
                    summary.failed += 1;
                }
            }
        }

        summary.updated = records.len();
        if !records.is_empty() {
            self.service.insert_engagement(&records).await?;
            self.load_user_data().await?;
        }
        info!(
            updated = summary.updated,
            skipped = summary.skipped,
            failed = summary.failed,
            "metrics refreshed"
        );
        Ok(summary)
    }

    pub async fn save_api_config(&mut self, config: ApiConfig) -> Result<(), TrackerError> {
        let result = self.try_save_api_config(config).await;
        self.report(result, |_| "API settings saved".to_string())
    }

    async fn try_save_api_config(&mut self, config: ApiConfig) -> Result<(), TrackerError> {
        let user = self.require_user()?;
        self.service
            .upsert_api_config(&config.to_rows(&user.id))
            .await?;
        let configured: Vec<&str> = Platform::ALL
            .iter()
            .filter(|p| config.is_configured(**p))
            .map(|p| p.as_str())
            .collect();
        info!(configured = ?configured, "api settings saved");
        self.api_config = config;
        Ok(())
    }

    pub async fn update_profile(&mut self, name: &str) -> Result<User, TrackerError> {
        let result = self.try_update_profile(name).await;
        match &result {
            Ok(_) => self.view.profile_notice = Some(Notice::success("Profile updated")),
            Err(err) => self.view.profile_notice = Some(Notice::error(err.to_string())),
        }
        result
    }

    async fn try_update_profile(&mut self, name: &str) -> Result<User, TrackerError> {
        let user = self.require_user()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(TrackerError::Validation("Display name is required".into()));
        }
        let updated = self.service.update_profile_name(&user.id, name).await?;
        self.user = Some(updated.clone());
        Ok(updated)
    }

    /// Turns an operation result into the page notification. Load failures
    /// have already raised their own.
    fn report<T>(
        &mut self,
        result: Result<T, TrackerError>,
        success: impl FnOnce(&T) -> String,
    ) -> Result<T, TrackerError> {
        match &result {
            Ok(value) => self.notify(Notice::success(success(value))),
            Err(TrackerError::DataLoad(_)) => {}
            Err(err) => self.notify(Notice::error(err.to_string())),
        }
        result
    }
}

fn validate_content(user: &User, form: ContentForm) -> Result<NewContentItem, TrackerError> {
    let invalid = |message: &str| TrackerError::Validation(message.to_string());

    let url = form.url.trim().to_string();
    if Url::parse(&url).is_err() {
        return Err(invalid("A valid content URL is required"));
    }
    let platform: Platform = form
        .platform
        .parse()
        .map_err(|_| invalid("Choose YouTube, ServiceNow or LinkedIn"))?;
    let name = form.name.trim().to_string();
    if name.is_empty() {
        return Err(invalid("Content name is required"));
    }
    let published_date = match form.published_date.trim() {
        "" => None,
        value => Some(
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map_err(|_| invalid("Published date must look like 2024-01-31"))?,
        ),
    };
    let content_id = non_empty(form.content_id)
        .or_else(|| derive_content_id(platform, &url))
        .unwrap_or_default();

    Ok(NewContentItem {
        user_id: user.id.clone(),
        name,
        description: form.description.trim().to_string(),
        platform,
        url,
        content_id,
        published_date,
        duration: non_empty(form.duration),
    })
}

fn parse_count(field: &str, value: &str) -> Result<u64, TrackerError> {
    let value = value.trim().replace(',', "");
    if value.is_empty() {
        return Ok(0);
    }
    value
        .parse()
        .map_err(|_| TrackerError::Validation(format!("{field} must be a whole number")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: "u1".into(),
            name: "Test User".into(),
            email: "test@example.com".into(),
            created_at: None,
        }
    }

    #[test]
    fn content_form_is_validated_and_enriched() {
        let item = validate_content(
            &user(),
            ContentForm {
                url: " https://youtube.com/watch?v=newvideo ".into(),
                platform: "youtube".into(),
                name: "New Test Video".into(),
                published_date: "2023-03-15".into(),
                duration: "".into(),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(item.url, "https://youtube.com/watch?v=newvideo");
        assert_eq!(item.content_id, "newvideo");
        assert_eq!(item.published_date, NaiveDate::from_ymd_opt(2023, 3, 15));
        assert_eq!(item.duration, None);
        assert_eq!(item.user_id, "u1");
    }

    #[test]
    fn content_form_rejects_bad_input() {
        let base = ContentForm {
            url: "https://youtube.com/watch?v=x".into(),
            platform: "youtube".into(),
            name: "Video".into(),
            ..Default::default()
        };
        let bad_url = ContentForm { url: "youtube".into(), ..base.clone() };
        let bad_platform = ContentForm { platform: "vimeo".into(), ..base.clone() };
        let bad_date = ContentForm { published_date: "15/03/2023".into(), ..base.clone() };
        let no_name = ContentForm { name: " ".into(), ..base };
        for form in [bad_url, bad_platform, bad_date, no_name] {
            assert!(matches!(validate_content(&user(), form), Err(TrackerError::Validation(_))));
        }
    }

    #[test]
    fn counts_allow_blank_and_separators() {
        assert_eq!(parse_count("views", "").unwrap(), 0);
        assert_eq!(parse_count("views", "2,000").unwrap(), 2000);
        assert!(parse_count("views", "-5").is_err());
    }
}
