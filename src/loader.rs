use chrono::Local;
use tracing::{info, warn};

use crate::errors::{ServiceError, TrackerError};
use crate::models::{ApiConfig, ContentItem, EngagementRecord};
use crate::stats::build_stats;
use crate::tracker::{Notice, Tracker};

struct Loaded {
    content: Vec<ContentItem>,
    engagement: Vec<EngagementRecord>,
    api_config: ApiConfig,
}

impl Tracker {
    /// Replaces every collection with a fresh copy from the service. Nothing
    /// is replaced unless all three fetches succeed.
    pub async fn load_user_data(&mut self) -> Result<(), TrackerError> {
        self.require_user()?;

        let loaded = match self.fetch_collections().await {
            Ok(loaded) => loaded,
            Err(err) => {
                let err = TrackerError::DataLoad(err.to_string());
                warn!("{err}");
                self.notify(Notice::error(err.to_string()));
                return Err(err);
            }
        };

        self.content = loaded.content;
        self.rebuild_url_index();
        self.engagement = loaded.engagement;
        self.api_config = loaded.api_config;
        self.view.default_published = Some(Local::now().date_naive());
        self.stats = build_stats(&self.content, &self.engagement);

        info!(
            content = self.content.len(),
            engagement = self.engagement.len(),
            "user data loaded"
        );
        Ok(())
    }

    /// Manual reload from the page toolbar.
    pub async fn reload(&mut self) -> Result<(), TrackerError> {
        self.load_user_data().await?;
        self.notify(Notice::info("Data reloaded"));
        Ok(())
    }

    async fn fetch_collections(&self) -> Result<Loaded, ServiceError> {
        let content = self.service.list_content().await?;
        let engagement = self.service.list_engagement().await?;
        let rows = self.service.list_api_config().await?;
        Ok(Loaded {
            content,
            engagement,
            api_config: ApiConfig::from_rows(&rows),
        })
    }
}
