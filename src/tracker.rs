use chrono::NaiveDate;
use serde::Serialize;
use std::{collections::HashMap, sync::Arc};

use crate::errors::TrackerError;
use crate::models::{ApiConfig, ContentItem, EngagementRecord, StatsResponse, User};
use crate::platforms::MetricsFetchers;
use crate::remote::DataService;

/// Which half of the page is showing. Exactly one is visible at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
    Auth,
    Main,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthTab {
    Login,
    Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }
}

/// Everything the page shows besides the data itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub screen: Screen,
    pub auth_tab: AuthTab,
    pub login_error: Option<String>,
    pub login_email: String,
    pub register_notice: Option<Notice>,
    pub register_name: String,
    pub register_email: String,
    pub notification: Option<Notice>,
    pub profile_notice: Option<Notice>,
    pub dark_mode: bool,
    pub default_published: Option<NaiveDate>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            screen: Screen::Auth,
            auth_tab: AuthTab::Login,
            login_error: None,
            login_email: String::new(),
            register_notice: None,
            register_name: String::new(),
            register_email: String::new(),
            notification: None,
            profile_notice: None,
            dark_mode: false,
            default_published: None,
        }
    }
}

/// The application controller. It alone owns the signed-in user and the
/// loaded collections; they change only through the auth transitions, the
/// data loader and the mutation methods.
pub struct Tracker {
    pub(crate) service: Arc<dyn DataService>,
    pub(crate) fetchers: MetricsFetchers,
    pub(crate) user: Option<User>,
    pub(crate) content: Vec<ContentItem>,
    pub(crate) url_index: HashMap<String, String>,
    pub(crate) engagement: Vec<EngagementRecord>,
    pub(crate) api_config: ApiConfig,
    pub(crate) stats: StatsResponse,
    pub(crate) view: ViewState,
}

impl Tracker {
    pub fn new(service: Arc<dyn DataService>, fetchers: MetricsFetchers) -> Self {
        Self {
            service,
            fetchers,
            user: None,
            content: Vec::new(),
            url_index: HashMap::new(),
            engagement: Vec::new(),
            api_config: ApiConfig::default(),
            stats: StatsResponse::default(),
            view: ViewState::default(),
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn content(&self) -> &[ContentItem] {
        &self.content
    }

    pub fn engagement(&self) -> &[EngagementRecord] {
        &self.engagement
    }

    pub fn api_config(&self) -> &ApiConfig {
        &self.api_config
    }

    pub fn stats(&self) -> &StatsResponse {
        &self.stats
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn content_by_url(&self, url: &str) -> Option<&ContentItem> {
        let id = self.url_index.get(canonical_url(url))?;
        self.content.iter().find(|item| &item.id == id)
    }

    /// Hands the pending notification to the page that is about to show it.
    pub fn take_notification(&mut self) -> Option<Notice> {
        self.view.notification.take()
    }

    pub fn select_auth_tab(&mut self, tab: AuthTab) {
        self.view.auth_tab = tab;
        self.view.login_error = None;
    }

    pub fn toggle_dark_mode(&mut self) -> bool {
        self.view.dark_mode = !self.view.dark_mode;
        self.view.dark_mode
    }

    pub(crate) fn require_user(&self) -> Result<User, TrackerError> {
        self.user.clone().ok_or(TrackerError::NotAuthenticated)
    }

    pub(crate) fn notify(&mut self, notice: Notice) {
        self.view.notification = Some(notice);
    }

    pub(crate) fn rebuild_url_index(&mut self) {
        self.url_index = self
            .content
            .iter()
            .map(|item| (canonical_url(&item.url).to_string(), item.id.clone()))
            .collect();
    }

    /// Drops the user and every loaded collection.
    pub(crate) fn clear_session_data(&mut self) {
        self.user = None;
        self.content.clear();
        self.url_index.clear();
        self.engagement.clear();
        self.api_config = ApiConfig::default();
        self.stats = StatsResponse::default();
        self.view.profile_notice = None;
    }
}

pub(crate) fn canonical_url(url: &str) -> &str {
    url.trim().trim_end_matches('/')
}
