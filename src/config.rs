use std::{env, path::PathBuf, time::Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Local,
    Supabase,
}

/// Runtime configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub backend: Backend,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub data_path: PathBuf,
    pub youtube_api_base: String,
    pub linkedin_api_base: String,
    pub http_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match var("PORT") {
            Some(value) => value.parse().map_err(|_| format!("Invalid PORT '{value}'"))?,
            None => 8080,
        };

        let supabase_url = var("SUPABASE_URL").map(|url| url.trim_end_matches('/').to_string());
        let supabase_anon_key = var("SUPABASE_ANON_KEY");

        let backend = match var("TRACKER_BACKEND").as_deref() {
            Some("local") => Backend::Local,
            Some("supabase") => Backend::Supabase,
            Some(other) => return Err(format!("Invalid TRACKER_BACKEND '{other}'")),
            None if supabase_url.is_some() => Backend::Supabase,
            None => Backend::Local,
        };

        if backend == Backend::Supabase && (supabase_url.is_none() || supabase_anon_key.is_none()) {
            return Err("SUPABASE_URL and SUPABASE_ANON_KEY must be set for the supabase backend".into());
        }

        let data_path = var("APP_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data/tracker.json"));

        let http_timeout = match var("HTTP_TIMEOUT_SECS") {
            Some(value) => Duration::from_secs(
                value
                    .parse()
                    .map_err(|_| format!("Invalid HTTP_TIMEOUT_SECS '{value}'"))?,
            ),
            None => Duration::from_secs(15),
        };

        Ok(Config {
            port,
            backend,
            supabase_url,
            supabase_anon_key,
            data_path,
            youtube_api_base: var("YOUTUBE_API_BASE")
                .unwrap_or_else(|| "https://www.googleapis.com".to_string()),
            linkedin_api_base: var("LINKEDIN_API_BASE")
                .unwrap_or_else(|| "https://api.linkedin.com".to_string()),
            http_timeout,
        })
    }
}
