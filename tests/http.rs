use axum::{routing::get, Json, Router};
use chrono::Utc;
use engagement_tracker::local::{password_digest, Account, LocalData, StoredEngagement};
use engagement_tracker::models::{
    ApiConfigRow, AuthUser, ContentItem, Platform, Session, StatsResponse, User,
};
use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::collections::BTreeMap;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

const USER_ID: &str = "user-1";
const EMAIL: &str = "test@example.com";
const PASSWORD: &str = "password123";

struct TestServer {
    base_url: String,
    child: Child,
    data_path: String,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_file(&self.data_path);
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

#[cfg(unix)]
mod cleanup {
    use std::sync::Mutex;
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PIDS: Mutex<Vec<i32>> = Mutex::new(Vec::new());

    pub fn register(pid: u32) {
        if let Ok(mut pids) = PIDS.lock() {
            pids.push(pid as i32);
        }
        REGISTER.call_once(|| unsafe {
            libc::atexit(on_exit);
        });
    }

    extern "C" fn on_exit() {
        if let Ok(pids) = PIDS.lock() {
            for pid in pids.iter().copied().filter(|pid| *pid > 0) {
                unsafe {
                    libc::kill(pid, libc::SIGTERM);
                }
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_path() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("engagement_tracker_http_{}_{}.json", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

fn seeded(with_session: bool) -> LocalData {
    let now = Utc::now();
    let item = |id: &str, name: &str, platform: Platform, url: &str, content_id: &str| ContentItem {
        id: id.into(),
        user_id: Some(USER_ID.into()),
        name: name.into(),
        description: String::new(),
        platform,
        url: url.into(),
        content_id: content_id.into(),
        published_date: None,
        duration: None,
        created_at: now,
        updated_at: Some(now),
    };
    let record = |content_id: &str, views: u64| StoredEngagement {
        id: format!("e-{content_id}"),
        user_id: USER_ID.into(),
        content_id: content_id.into(),
        timestamp: now - chrono::Duration::hours(1),
        views,
        likes: 5,
        comments: 1,
        shares: 0,
        other_metrics: BTreeMap::new(),
    };

    LocalData {
        accounts: vec![Account {
            id: USER_ID.into(),
            email: EMAIL.into(),
            password_digest: password_digest(USER_ID, PASSWORD),
            user_metadata: json!({ "name": "Test User" }),
            created_at: now,
        }],
        users: vec![User {
            id: USER_ID.into(),
            name: "Test User".into(),
            email: EMAIL.into(),
            created_at: None,
        }],
        content_items: vec![
            item(
                "c1",
                "Test Video",
                Platform::Youtube,
                "https://youtube.com/watch?v=test123",
                "test123",
            ),
            item(
                "c2",
                "Test Article",
                Platform::Servicenow,
                "https://dev.service-now.com/kb?sys_kb_id=abc",
                "abc",
            ),
        ],
        engagement_data: vec![record("c1", 1000), record("c2", 500)],
        api_config: Vec::new(),
        session: with_session.then(|| Session {
            access_token: "token".into(),
            refresh_token: None,
            expires_at: None,
            user: AuthUser {
                id: USER_ID.into(),
                email: Some(EMAIL.into()),
                user_metadata: json!({}),
            },
        }),
    }
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/session")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server(data: &LocalData, youtube_base: Option<&str>) -> TestServer {
    let port = pick_free_port();
    let data_path = unique_data_path();
    std::fs::write(&data_path, serde_json::to_vec_pretty(data).unwrap()).unwrap();

    let mut command = Command::new(env!("CARGO_BIN_EXE_engagement_tracker"));
    command
        .env("PORT", port.to_string())
        .env("TRACKER_BACKEND", "local")
        .env("APP_DATA_PATH", &data_path)
        .env("HTTP_TIMEOUT_SECS", "5")
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    if let Some(base) = youtube_base {
        command.env("YOUTUBE_API_BASE", base);
    }
    let child = command.spawn().expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer {
        base_url,
        child,
        data_path,
    }
}

/// Serves a fixed statistics payload for any video id.
async fn spawn_youtube_stub() -> String {
    let app = Router::new().route(
        "/youtube/v3/videos",
        get(|| async {
            Json(json!({
                "items": [{
                    "statistics": {
                        "viewCount": "4321",
                        "likeCount": "12",
                        "commentCount": "3",
                        "favoriteCount": "0"
                    }
                }]
            }))
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

async fn page(client: &Client, server: &TestServer) -> String {
    client
        .get(format!("{}/", server.base_url))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap()
}

async fn post_form(client: &Client, server: &TestServer, path: &str, form: &[(&str, &str)]) -> String {
    let response = client
        .post(format!("{}{path}", server.base_url))
        .form(form)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success(), "{path} -> {}", response.status());
    response.text().await.unwrap()
}

async fn stats(client: &Client, server: &TestServer) -> StatsResponse {
    client
        .get(format!("{}/api/stats", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn http_shows_login_without_session() {
    let _guard = TEST_LOCK.lock().await;
    let server = spawn_server(&seeded(false), None).await;
    let client = Client::new();

    let html = page(&client, &server).await;
    assert!(html.contains(r#"<section id="auth-content" class="">"#));
    assert!(html.contains(r#"<section id="main-content" class="hidden""#));
    assert!(html.contains(r#"id="login-form""#));

    let response = client
        .get(format!("{}/api/stats", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn http_login_form_shows_dashboard() {
    let _guard = TEST_LOCK.lock().await;
    let server = spawn_server(&seeded(false), None).await;
    let client = Client::new();

    let html = post_form(
        &client,
        &server,
        "/auth/login",
        &[("email", EMAIL), ("password", PASSWORD)],
    )
    .await;
    assert!(html.contains(r#"<section id="auth-content" class="hidden">"#));
    assert!(html.contains(r#"<span id="current-user-name">Test User</span>"#));
    assert!(html.contains(r#"<span id="total-content" class="value">2</span>"#));
    assert!(html.contains(r#"<span id="total-engagements" class="value">1,500</span>"#));

    let stats = stats(&client, &server).await;
    assert_eq!(stats.totals.total_engagements, 1500);

    let html = post_form(&client, &server, "/auth/logout", &[]).await;
    assert!(html.contains(r#"<section id="auth-content" class="">"#));
}

#[tokio::test]
async fn http_login_failure_keeps_login_screen() {
    let _guard = TEST_LOCK.lock().await;
    let server = spawn_server(&seeded(false), None).await;
    let client = Client::new();

    let html = post_form(
        &client,
        &server,
        "/auth/login",
        &[("email", EMAIL), ("password", "wrong-password")],
    )
    .await;
    assert!(html.contains(
        r#"<p id="login-error" class="form-message text-red-500">Invalid login credentials</p>"#
    ));
    assert!(html.contains(r#"<section id="main-content" class="hidden""#));
}

#[tokio::test]
async fn http_register_rejects_mismatched_passwords() {
    let _guard = TEST_LOCK.lock().await;
    let server = spawn_server(&LocalData::default(), None).await;
    let client = Client::new();

    post_form(&client, &server, "/auth/tab/register", &[]).await;
    let html = post_form(
        &client,
        &server,
        "/auth/register",
        &[
            ("name", "New User"),
            ("email", "new@example.com"),
            ("password", "password123"),
            ("confirm_password", "different"),
        ],
    )
    .await;
    assert!(html.contains("Passwords do not match"));
    assert!(html.contains(r#"value="new@example.com""#));
}

#[tokio::test]
async fn http_delete_content_updates_totals() {
    let _guard = TEST_LOCK.lock().await;
    let server = spawn_server(&seeded(true), None).await;
    let client = Client::new();

    let html = page(&client, &server).await;
    assert!(html.contains(r#"<span id="total-engagements" class="value">1,500</span>"#));

    let html = post_form(&client, &server, "/content/c1/delete", &[]).await;
    assert!(html.contains(r#"<span id="total-content" class="value">1</span>"#));
    assert!(html.contains(r#"<span id="total-engagements" class="value">500</span>"#));
    assert!(!html.contains(r#"data-content-id="c1""#));

    let content: Vec<ContentItem> = client
        .get(format!("{}/api/content", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(content.len(), 1);
    assert_eq!(content[0].id, "c2");
}

#[tokio::test]
async fn http_refresh_pulls_youtube_metrics() {
    let _guard = TEST_LOCK.lock().await;
    let youtube = spawn_youtube_stub().await;
    let mut data = seeded(true);
    data.api_config.push(ApiConfigRow {
        user_id: Some(USER_ID.into()),
        platform: "youtube".into(),
        config: json!({ "apiKey": "yt-key" }),
    });
    let server = spawn_server(&data, Some(&youtube)).await;
    let client = Client::new();

    let html = post_form(&client, &server, "/metrics/refresh", &[]).await;
    assert!(html.contains("Updated metrics for 1 item(s), 1 skipped"));

    let stats = stats(&client, &server).await;
    assert_eq!(stats.totals.total_engagements, 4321 + 500);
}

#[tokio::test]
async fn http_api_settings_update_status() {
    let _guard = TEST_LOCK.lock().await;
    let server = spawn_server(&seeded(true), None).await;
    let client = Client::new();

    let html = page(&client, &server).await;
    assert!(html.contains(r#"id="youtube-api-status" class="api-status bg-red-100""#));

    let html = post_form(
        &client,
        &server,
        "/settings/api",
        &[("youtube_api_key", "yt-key")],
    )
    .await;
    assert!(html.contains(r#"id="youtube-api-status" class="api-status bg-green-100""#));
    assert!(html.contains(r#"id="linkedin-api-status" class="api-status bg-red-100""#));
}

#[tokio::test]
async fn http_dark_mode_toggles_back() {
    let _guard = TEST_LOCK.lock().await;
    let server = spawn_server(&seeded(true), None).await;
    let client = Client::new();

    let html = post_form(&client, &server, "/preferences/dark-mode", &[]).await;
    assert!(html.contains(r#"<html lang="en" class="dark">"#));

    let html = post_form(&client, &server, "/preferences/dark-mode", &[]).await;
    assert!(html.contains(r#"<html lang="en" class="">"#));
    assert!(html.contains(r#"<span id="total-content" class="value">2</span>"#));
}
