use crate::models::{ApiConfig, ContentItem, EngagementRecord, Platform, StatsResponse};
use crate::stats::format_count;
use crate::tracker::{AuthTab, Notice, NoticeKind, Screen, Tracker};

pub fn render_index(tracker: &Tracker, notification: Option<&Notice>) -> String {
    let view = tracker.view();
    let signed_in = view.screen == Screen::Main;
    let user_name = tracker.user().map(|u| u.name.as_str()).unwrap_or_default();
    let user_email = tracker.user().map(|u| u.email.as_str()).unwrap_or_default();
    let stats = tracker.stats();
    let hidden = |hide: bool| if hide { "hidden" } else { "" }.to_string();

    let values = [
        ("HTML_CLASS", if view.dark_mode { "dark" } else { "" }.to_string()),
        ("DARK_LABEL", if view.dark_mode { "Light mode" } else { "Dark mode" }.to_string()),
        ("NOTIFICATION", render_notice("notification", notification)),
        ("AUTH_HIDDEN", hidden(signed_in)),
        ("MAIN_HIDDEN", hidden(!signed_in)),
        ("LOGIN_TAB_ACTIVE", active(view.auth_tab == AuthTab::Login).to_string()),
        ("REGISTER_TAB_ACTIVE", active(view.auth_tab == AuthTab::Register).to_string()),
        ("LOGIN_HIDDEN", hidden(view.auth_tab != AuthTab::Login)),
        ("REGISTER_HIDDEN", hidden(view.auth_tab != AuthTab::Register)),
        ("LOGIN_ERROR", render_login_error(view.login_error.as_deref())),
        ("REGISTER_NOTICE", render_register_notice(view.register_notice.as_ref())),
        ("LOGIN_EMAIL", escape(&view.login_email)),
        ("REGISTER_NAME", escape(&view.register_name)),
        ("REGISTER_EMAIL", escape(&view.register_email)),
        ("USER_NAME", escape(user_name)),
        ("USER_EMAIL", escape(user_email)),
        ("PROFILE_MESSAGE", render_notice("profile-message", view.profile_notice.as_ref())),
        ("TOTAL_CONTENT", stats.totals.content_count.to_string()),
        ("TOTAL_ENGAGEMENTS", format_count(stats.totals.total_engagements)),
        ("TOTAL_LIKES", format_count(stats.totals.likes)),
        ("TOTAL_COMMENTS", format_count(stats.totals.comments)),
        ("TOTAL_SHARES", format_count(stats.totals.shares)),
        (
            "DEFAULT_PUBLISHED",
            view.default_published.map(|d| d.to_string()).unwrap_or_default(),
        ),
        ("CONTENT_ROWS", render_content_rows(tracker.content(), stats)),
        ("CONTENT_OPTIONS", render_content_options(tracker.content())),
        ("ENGAGEMENT_ROWS", render_engagement_rows(tracker.engagement())),
        ("API_STATUS", render_api_status(tracker.api_config())),
        ("API_FIELDS", render_api_fields(tracker.api_config())),
    ];
    fill(INDEX_HTML, &values)
}

/// Substitutes `{{NAME}}` markers in a single pass over `template`, so text
/// coming from `values` is never scanned for markers itself.
fn fill(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len() * 2);
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = &after[..end];
        match values.iter().find(|(name, _)| *name == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

fn active(is_active: bool) -> &'static str {
    if is_active { "active" } else { "" }
}

fn notice_type(kind: NoticeKind) -> &'static str {
    match kind {
        NoticeKind::Success => "ok",
        NoticeKind::Error => "error",
        NoticeKind::Info => "info",
    }
}

fn render_notice(id: &str, notice: Option<&Notice>) -> String {
    match notice {
        Some(notice) => format!(
            r#"<div id="{id}" class="status" data-type="{}" role="status">{}</div>"#,
            notice_type(notice.kind),
            escape(&notice.message)
        ),
        None => format!(r#"<div id="{id}" class="status hidden" role="status"></div>"#),
    }
}

fn render_login_error(error: Option<&str>) -> String {
    match error {
        Some(message) => format!(
            r#"<p id="login-error" class="form-message text-red-500">{}</p>"#,
            escape(message)
        ),
        None => r#"<p id="login-error" class="form-message hidden"></p>"#.to_string(),
    }
}

fn render_register_notice(notice: Option<&Notice>) -> String {
    match notice {
        Some(notice) => {
            let class = if notice.kind == NoticeKind::Success {
                "text-green-500"
            } else {
                "text-red-500"
            };
            format!(
                r#"<p id="register-error" class="form-message {class}">{}</p>"#,
                escape(&notice.message)
            )
        }
        None => r#"<p id="register-error" class="form-message hidden"></p>"#.to_string(),
    }
}

fn render_content_rows(content: &[ContentItem], stats: &StatsResponse) -> String {
    if content.is_empty() {
        return String::new();
    }
    let mut rows = String::new();
    for item in content {
        let point = stats.content.iter().find(|p| p.id == item.id);
        let metric = |value: Option<u64>| value.map(format_count).unwrap_or_else(|| "0".into());
        let updated = point
            .and_then(|p| p.last_updated)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".into());
        rows.push_str(&format!(
            r#"<tr data-content-id="{id}">
  <td><a href="{url}" target="_blank" rel="noopener">{name}</a><div class="muted">{description}</div></td>
  <td><span class="badge badge-{platform}">{platform_label}</span></td>
  <td>{published}</td>
  <td>{views}</td>
  <td>{likes}</td>
  <td>{comments}</td>
  <td>{updated}</td>
  <td>
    <form method="post" action="/content/{id}/delete" onsubmit="return confirm('Delete this content item and its history?');">
      <button class="delete-content-btn btn-ghost" type="submit">Delete</button>
    </form>
  </td>
</tr>
"#,
            id = escape(&item.id),
            url = escape(&item.url),
            name = escape(&item.name),
            description = escape(&item.description),
            platform = item.platform.as_str(),
            platform_label = item.platform.label(),
            published = item
                .published_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".into()),
            views = metric(point.map(|p| p.views)),
            likes = metric(point.map(|p| p.likes)),
            comments = metric(point.map(|p| p.comments)),
            updated = updated,
        ));
    }
    rows
}

fn render_content_options(content: &[ContentItem]) -> String {
    content
        .iter()
        .map(|item| {
            format!(
                r#"<option value="{}">{} ({})</option>"#,
                escape(&item.url),
                escape(&item.name),
                item.platform.label()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_engagement_rows(engagement: &[EngagementRecord]) -> String {
    let mut rows = String::new();
    for record in engagement {
        let (name, platform) = record
            .content
            .as_ref()
            .map(|c| (escape(&c.name), c.platform.label()))
            .unwrap_or_else(|| ("(removed)".to_string(), "-"));
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            record.timestamp.format("%Y-%m-%d %H:%M"),
            name,
            platform,
            format_count(record.views),
            format_count(record.likes),
            format_count(record.comments),
            format_count(record.shares),
        ));
    }
    rows
}

fn render_api_status(config: &ApiConfig) -> String {
    Platform::ALL
        .iter()
        .map(|platform| {
            let (class, label) = if config.is_configured(*platform) {
                ("bg-green-100", "Configured")
            } else {
                ("bg-red-100", "Not configured")
            };
            format!(
                r#"<span id="{}-api-status" class="api-status {class}">{}: {label}</span>"#,
                platform.as_str(),
                platform.label()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_api_fields(config: &ApiConfig) -> String {
    let field = |id: &str, label: &str, kind: &str, value: &Option<String>| {
        format!(
            r#"<label for="{id}">{label}</label>
<input id="{id}" name="{name}" type="{kind}" value="{value}" autocomplete="off" />"#,
            name = id.replace('-', "_"),
            value = escape(value.as_deref().unwrap_or_default()),
        )
    };
    [
        "<fieldset><legend>YouTube</legend>".to_string(),
        field("youtube-api-key", "API key", "password", &config.youtube.api_key),
        "</fieldset><fieldset><legend>ServiceNow</legend>".to_string(),
        field("servicenow-instance", "Instance", "text", &config.servicenow.instance),
        field("servicenow-username", "Username", "text", &config.servicenow.username),
        field("servicenow-password", "Password", "password", &config.servicenow.password),
        "</fieldset><fieldset><legend>LinkedIn</legend>".to_string(),
        field("linkedin-client-id", "Client ID", "text", &config.linkedin.client_id),
        field("linkedin-client-secret", "Client secret", "password", &config.linkedin.client_secret),
        field("linkedin-access-token", "Access token", "password", &config.linkedin.access_token),
        "</fieldset>".to_string(),
    ]
    .join("\n")
}

pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en" class="{{HTML_CLASS}}">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Platform Engagement Tracker</title>
  <style>
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --bg-1: #f8f3e6;
      --bg-2: #f5d3a7;
      --ink: #2b2a28;
      --muted: #6f6a65;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --card: rgba(255, 255, 255, 0.86);
      --panel: white;
      --line: rgba(47, 72, 88, 0.08);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
    }

    html.dark {
      --bg-1: #15191d;
      --bg-2: #243340;
      --ink: #ece7df;
      --muted: #a7a099;
      --card: rgba(30, 36, 42, 0.92);
      --panel: #1d2329;
      --line: rgba(236, 231, 223, 0.08);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), var(--bg-1) 100%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      display: grid;
      justify-items: center;
      padding: 32px 18px 48px;
    }

    .hidden {
      display: none !important;
    }

    .app {
      width: min(1100px, 100%);
      background: var(--card);
      backdrop-filter: blur(12px);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 36px;
      display: grid;
      gap: 28px;
      animation: rise 600ms ease;
    }

    header {
      display: flex;
      flex-wrap: wrap;
      justify-content: space-between;
      align-items: center;
      gap: 12px;
    }

    h1 {
      font-family: "Fraunces", "Georgia", serif;
      font-weight: 600;
      font-size: clamp(1.8rem, 4vw, 2.6rem);
      margin: 0;
    }

    h2 {
      margin: 0 0 12px;
      font-size: 1.3rem;
    }

    .subtitle,
    .muted {
      margin: 0;
      color: var(--muted);
      font-size: 0.9rem;
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(160px, 1fr));
      gap: 16px;
    }

    .stat,
    .card {
      background: var(--panel);
      border-radius: 18px;
      padding: 18px;
      border: 1px solid var(--line);
      display: grid;
      gap: 8px;
    }

    .stat .label {
      font-size: 0.8rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: var(--muted);
    }

    .stat .value {
      font-size: 1.7rem;
      font-weight: 600;
      color: var(--accent-2);
    }

    html.dark .stat .value {
      color: var(--accent);
    }

    form.stack {
      display: grid;
      gap: 10px;
    }

    label {
      font-size: 0.85rem;
      color: var(--muted);
    }

    input,
    select,
    textarea {
      font: inherit;
      padding: 10px 12px;
      border-radius: 12px;
      border: 1px solid rgba(47, 72, 88, 0.2);
      background: var(--panel);
      color: var(--ink);
    }

    button {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 12px 18px;
      font-size: 0.95rem;
      font-weight: 600;
      cursor: pointer;
      background: var(--accent);
      color: white;
      transition: transform 150ms ease, box-shadow 150ms ease;
    }

    button:active {
      transform: scale(0.98);
    }

    button:disabled {
      opacity: 0.6;
      cursor: progress;
    }

    .btn-ghost {
      background: transparent;
      color: var(--accent);
      border: 1px solid var(--accent);
      padding: 6px 12px;
    }

    .toolbar {
      display: flex;
      flex-wrap: wrap;
      gap: 10px;
      align-items: center;
    }

    .tabs {
      display: flex;
      gap: 6px;
      padding: 6px;
      background: rgba(47, 72, 88, 0.08);
      border-radius: 999px;
      width: fit-content;
    }

    .tab {
      background: transparent;
      color: var(--muted);
      box-shadow: none;
    }

    .tab.active {
      background: var(--panel);
      color: var(--accent-2);
      box-shadow: 0 8px 16px rgba(47, 72, 88, 0.12);
    }

    #auth-content {
      max-width: 420px;
      width: 100%;
      justify-self: center;
      display: grid;
      gap: 18px;
    }

    .user-menu summary {
      list-style: none;
      cursor: pointer;
      font-weight: 600;
    }

    .user-menu[open] .menu {
      display: grid;
    }

    .menu {
      position: absolute;
      right: 48px;
      margin-top: 8px;
      background: var(--panel);
      border-radius: 14px;
      box-shadow: var(--shadow);
      padding: 12px;
      gap: 8px;
      z-index: 5;
    }

    .menu a {
      color: var(--ink);
      text-decoration: none;
    }

    table {
      width: 100%;
      border-collapse: collapse;
      font-size: 0.92rem;
    }

    th,
    td {
      text-align: left;
      padding: 10px 8px;
      border-bottom: 1px solid var(--line);
      vertical-align: top;
    }

    td a {
      color: var(--accent-2);
      font-weight: 600;
    }

    html.dark td a {
      color: var(--accent);
    }

    .badge,
    .api-status {
      display: inline-block;
      border-radius: 999px;
      padding: 3px 10px;
      font-size: 0.8rem;
      font-weight: 600;
    }

    .badge-youtube { background: #ffe1dc; color: #b0281a; }
    .badge-servicenow { background: #dff3e8; color: #1f6b45; }
    .badge-linkedin { background: #dde9f7; color: #1d4f8a; }
    .bg-green-100 { background: #dff3e8; color: #1f6b45; }
    .bg-red-100 { background: #fde2e0; color: #9b2c22; }

    .charts {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(320px, 1fr));
      gap: 16px;
    }

    .charts svg {
      width: 100%;
      height: 240px;
      display: block;
    }

    .chart-line {
      fill: none;
      stroke: var(--accent);
      stroke-width: 3;
    }

    .chart-point {
      fill: var(--panel);
      stroke: var(--accent);
      stroke-width: 2;
    }

    .chart-bar {
      fill: var(--accent-2);
    }

    html.dark .chart-bar {
      fill: var(--accent);
    }

    .chart-grid {
      stroke: rgba(47, 72, 88, 0.12);
    }

    .chart-label {
      fill: var(--muted);
      font-size: 11px;
    }

    .status {
      font-size: 0.95rem;
      padding: 10px 14px;
      border-radius: 12px;
      background: rgba(47, 72, 88, 0.06);
    }

    .status[data-type="error"] {
      color: #c63b2b;
    }

    .status[data-type="ok"] {
      color: #2d7a4b;
    }

    .form-message { margin: 0; font-size: 0.9rem; }
    .text-red-500 { color: #c63b2b; }
    .text-green-500 { color: #2d7a4b; }

    .modal {
      display: none;
      position: fixed;
      inset: 0;
      background: rgba(20, 24, 28, 0.45);
      align-items: center;
      justify-content: center;
      padding: 18px;
      z-index: 10;
    }

    .modal:target {
      display: flex;
    }

    .modal .card {
      width: min(520px, 100%);
      max-height: 90vh;
      overflow: auto;
    }

    fieldset {
      border: 1px solid var(--line);
      border-radius: 14px;
      display: grid;
      gap: 6px;
    }

    @keyframes rise {
      from {
        opacity: 0;
        transform: translateY(18px);
      }
      to {
        opacity: 1;
        transform: translateY(0);
      }
    }

    @media (max-width: 700px) {
      .app {
        padding: 28px 18px;
      }
      table {
        font-size: 0.82rem;
      }
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <div>
        <h1>Platform Engagement Tracker</h1>
        <p class="subtitle">Views, likes, comments and shares across YouTube, ServiceNow and LinkedIn.</p>
      </div>
      <details class="user-menu {{MAIN_HIDDEN}}">
        <summary id="user-menu-button"><span id="current-user-name">{{USER_NAME}}</span> ▾</summary>
        <div class="menu">
          <a id="user-profile-link" href="#profile-modal">Profile</a>
          <a id="show-settings-link" href="#api-settings">Settings</a>
          <form method="post" action="/auth/logout">
            <button id="logout-button" class="btn-ghost" type="submit">Log out</button>
          </form>
        </div>
      </details>
    </header>

    {{NOTIFICATION}}

    <section id="auth-content" class="{{AUTH_HIDDEN}}">
      <div class="tabs" role="tablist">
        <form method="post" action="/auth/tab/login"><button id="login-tab" class="tab {{LOGIN_TAB_ACTIVE}}" type="submit">Log in</button></form>
        <form method="post" action="/auth/tab/register"><button id="register-tab" class="tab {{REGISTER_TAB_ACTIVE}}" type="submit">Register</button></form>
      </div>
      {{REGISTER_NOTICE}}
      <form id="login-form" class="stack card {{LOGIN_HIDDEN}}" method="post" action="/auth/login" data-busy="Signing in...">
        <label for="login-email">Email</label>
        <input id="login-email" name="email" type="email" value="{{LOGIN_EMAIL}}" required />
        <label for="login-password">Password</label>
        <input id="login-password" name="password" type="password" required />
        {{LOGIN_ERROR}}
        <button type="submit">Sign in</button>
      </form>
      <form id="register-form" class="stack card {{REGISTER_HIDDEN}}" method="post" action="/auth/register" data-busy="Creating account...">
        <label for="register-name">Name</label>
        <input id="register-name" name="name" type="text" value="{{REGISTER_NAME}}" required />
        <label for="register-email">Email</label>
        <input id="register-email" name="email" type="email" value="{{REGISTER_EMAIL}}" required />
        <label for="register-password">Password</label>
        <input id="register-password" name="password" type="password" required />
        <label for="register-confirm-password">Confirm password</label>
        <input id="register-confirm-password" name="confirm_password" type="password" required />
        <button type="submit">Create account</button>
      </form>
    </section>

    <section id="main-content" class="{{MAIN_HIDDEN}}" style="display: grid; gap: 28px;">
      <section class="panel">
        <div class="stat"><span class="label">Content items</span><span id="total-content" class="value">{{TOTAL_CONTENT}}</span></div>
        <div class="stat"><span class="label">Total engagements</span><span id="total-engagements" class="value">{{TOTAL_ENGAGEMENTS}}</span></div>
        <div class="stat"><span class="label">Likes</span><span id="total-likes" class="value">{{TOTAL_LIKES}}</span></div>
        <div class="stat"><span class="label">Comments</span><span id="total-comments" class="value">{{TOTAL_COMMENTS}}</span></div>
        <div class="stat"><span class="label">Shares</span><span id="total-shares" class="value">{{TOTAL_SHARES}}</span></div>
      </section>

      <div class="toolbar">
        <form method="post" action="/metrics/refresh" data-busy="Refreshing...">
          <button id="refresh-data" type="submit">Refresh metrics</button>
        </form>
        <form method="post" action="/data/reload" data-busy="Reloading...">
          <button id="reload-data" class="btn-ghost" type="submit">Reload</button>
        </form>
      </div>

      <details id="add-content" class="card">
        <summary id="toggle-add-content">Add content</summary>
        <form id="content-form" class="stack" method="post" action="/content" data-busy="Saving...">
          <label for="content-url">URL</label>
          <input id="content-url" name="url" type="url" required />
          <label for="content-source">Platform</label>
          <select id="content-source" name="platform">
            <option value="youtube">YouTube</option>
            <option value="servicenow">ServiceNow</option>
            <option value="linkedin">LinkedIn</option>
          </select>
          <label for="content-name">Name</label>
          <input id="content-name" name="name" type="text" required />
          <label for="content-description">Description</label>
          <textarea id="content-description" name="description" rows="2"></textarea>
          <label for="content-published">Published</label>
          <input id="content-published" name="published_date" type="date" value="{{DEFAULT_PUBLISHED}}" />
          <label for="content-duration">Duration (optional)</label>
          <input id="content-duration" name="duration" type="text" placeholder="10:30" />
          <label for="content-platform-id">Platform content id (optional)</label>
          <input id="content-platform-id" name="content_id" type="text" />
          <button type="submit">Add content</button>
        </form>
      </details>

      <section class="card">
        <h2>Content</h2>
        <table>
          <thead><tr><th>Name</th><th>Platform</th><th>Published</th><th>Views</th><th>Likes</th><th>Comments</th><th>Updated</th><th></th></tr></thead>
          <tbody id="content-list">
{{CONTENT_ROWS}}
          </tbody>
        </table>
      </section>

      <section class="charts">
        <div class="card"><h2>Views, last 7 days</h2><svg id="trend-chart" viewBox="0 0 600 240" role="img" aria-label="Views trend"></svg></div>
        <div class="card"><h2>By platform</h2><svg id="platform-chart" viewBox="0 0 600 240" role="img" aria-label="Views by platform"></svg></div>
        <div class="card"><h2>By content</h2><svg id="content-chart" viewBox="0 0 600 240" role="img" aria-label="Views by content"></svg></div>
      </section>

      <section class="card">
        <h2>Record engagement</h2>
        <form id="engagement-form" class="toolbar" method="post" action="/engagement" data-busy="Saving...">
          <select id="engagement-content" name="content_url">
{{CONTENT_OPTIONS}}
          </select>
          <input name="views" type="number" min="0" placeholder="Views" />
          <input name="likes" type="number" min="0" placeholder="Likes" />
          <input name="comments" type="number" min="0" placeholder="Comments" />
          <input name="shares" type="number" min="0" placeholder="Shares" />
          <button type="submit">Record</button>
        </form>
      </section>

      <section class="card">
        <h2>Engagement history</h2>
        <table>
          <thead><tr><th>When</th><th>Content</th><th>Platform</th><th>Views</th><th>Likes</th><th>Comments</th><th>Shares</th></tr></thead>
          <tbody id="engagement-list">
{{ENGAGEMENT_ROWS}}
          </tbody>
        </table>
      </section>
    </section>
  </main>

  <div id="api-settings" class="modal">
    <div class="card">
      <h2>API settings</h2>
      <div class="toolbar">
{{API_STATUS}}
      </div>
      <form id="api-config-form" class="stack" method="post" action="/settings/api" data-busy="Saving...">
{{API_FIELDS}}
        <button id="save-api-config" type="submit">Save settings</button>
      </form>
      <form method="post" action="/preferences/dark-mode">
        <button id="dark-mode-toggle" class="btn-ghost" type="submit">{{DARK_LABEL}}</button>
      </form>
      <a href="#">Close</a>
    </div>
  </div>

  <div id="profile-modal" class="modal">
    <div class="card">
      <h2>Profile</h2>
      <p>Name: <span id="profile-name">{{USER_NAME}}</span></p>
      <p>Email: <span id="profile-email">{{USER_EMAIL}}</span></p>
      {{PROFILE_MESSAGE}}
      <form id="profile-form" class="stack" method="post" action="/profile">
        <label for="profile-display-name">Display name</label>
        <input id="profile-display-name" name="name" type="text" value="{{USER_NAME}}" required />
        <button id="save-profile" type="submit">Save profile</button>
      </form>
      <a href="#">Close</a>
    </div>
  </div>

  <script>
    const trendEl = document.getElementById('trend-chart');
    const platformEl = document.getElementById('platform-chart');
    const contentEl = document.getElementById('content-chart');

    const width = 600;
    const height = 240;
    const paddingX = 48;
    const paddingY = 34;
    const top = 20;

    document.querySelectorAll('form[data-busy]').forEach((form) => {
      form.addEventListener('submit', () => {
        const button = form.querySelector('button[type="submit"]');
        if (button) {
          button.disabled = true;
          button.textContent = form.dataset.busy;
        }
      });
    });

    const formatAxisValue = (value) => {
      const rounded = Math.round(value);
      return rounded.toLocaleString('en-US');
    };

    const empty = (el) => {
      el.innerHTML = '<text class="chart-label" x="50%" y="50%" text-anchor="middle">No data yet</text>';
    };

    const scale = (values) => {
      let max = Math.max(...values, 0);
      if (max === 0) {
        max = 1;
      }
      const scaleY = (height - top - paddingY) / max;
      return { max, y: (value) => height - paddingY - value * scaleY };
    };

    const gridLines = (max, y) => {
      const ticks = 4;
      let grid = '';
      for (let i = 0; i <= ticks; i += 1) {
        const value = (max * i) / ticks;
        const yPos = y(value);
        grid += `<line class="chart-grid" x1="${paddingX}" y1="${yPos}" x2="${width - paddingX}" y2="${yPos}" />`;
        grid += `<text class="chart-label" x="${paddingX - 10}" y="${yPos + 4}" text-anchor="end">${formatAxisValue(value)}</text>`;
      }
      return grid;
    };

    const renderLineChart = (el, points) => {
      if (!points.length) {
        empty(el);
        return;
      }
      const { max, y } = scale(points.map((point) => point.value));
      const xStep = points.length > 1 ? (width - paddingX * 2) / (points.length - 1) : 0;
      const x = (index) => paddingX + index * xStep;
      const path = points
        .map((point, index) => `${index === 0 ? 'M' : 'L'} ${x(index).toFixed(2)} ${y(point.value).toFixed(2)}`)
        .join(' ');
      const circles = points
        .map((point, index) => `<circle class="chart-point" cx="${x(index)}" cy="${y(point.value)}" r="4" />`)
        .join('');
      const labels = points
        .map((point, index) => `<text class="chart-label" x="${x(index)}" y="${height - paddingY + 18}" text-anchor="middle">${point.label}</text>`)
        .join('');
      el.innerHTML = `${gridLines(max, y)}<path class="chart-line" d="${path}" />${circles}${labels}`;
    };

    const renderBarChart = (el, points) => {
      if (!points.length) {
        empty(el);
        return;
      }
      const { max, y } = scale(points.map((point) => point.value));
      const slot = (width - paddingX * 2) / points.length;
      const barWidth = Math.min(56, slot * 0.6);
      const bars = points
        .map((point, index) => {
          const cx = paddingX + slot * index + slot / 2;
          const yPos = y(point.value);
          const label = point.label.length > 14 ? `${point.label.slice(0, 13)}…` : point.label;
          return `<rect class="chart-bar" x="${cx - barWidth / 2}" y="${yPos}" width="${barWidth}" height="${height - paddingY - yPos}" rx="6" />`
            + `<text class="chart-label" x="${cx}" y="${height - paddingY + 18}" text-anchor="middle">${label}</text>`;
        })
        .join('');
      el.innerHTML = `${gridLines(max, y)}${bars}`;
    };

    const escapeText = (text) => text.replace(/[&<>]/g, (ch) => ({ '&': '&amp;', '<': '&lt;', '>': '&gt;' }[ch]));

    const loadStats = async () => {
      const res = await fetch('/api/stats');
      if (!res.ok) {
        return;
      }
      const stats = await res.json();
      renderLineChart(trendEl, stats.last_7_days.map((day) => ({ label: day.date.slice(5), value: day.views })));
      renderBarChart(platformEl, stats.platforms.map((p) => ({ label: p.platform, value: p.views })));
      renderBarChart(contentEl, stats.content.slice(0, 8).map((c) => ({ label: escapeText(c.name), value: c.views })));
    };

    if (!document.getElementById('main-content').classList.contains('hidden')) {
      loadStats().catch(() => {});
    }
  </script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_handles_markup() {
        assert_eq!(escape(r#"<b>"Tom" & 'Jerry'</b>"#), "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;");
    }

    #[test]
    fn fill_leaves_unknown_markers_and_substituted_text_alone() {
        let values = [("A", "{{B}}".to_string()), ("B", "b".to_string())];
        assert_eq!(fill("<{{A}}|{{B}}|{{C}}|{{", &values), "<{{B}}|b|{{C}}|{{");
    }

    #[test]
    fn marker_text_in_user_data_is_rendered_literally() {
        use crate::local::{LocalData, LocalService};
        use crate::platforms::MetricsFetchers;
        use crate::stats::build_stats;
        use chrono::Utc;
        use std::sync::Arc;

        let mut tracker = Tracker::new(
            Arc::new(LocalService::in_memory(LocalData::default())),
            MetricsFetchers::new(Vec::new()),
        );
        let item = |id: &str, name: &str, description: &str| ContentItem {
            id: id.into(),
            user_id: None,
            name: name.into(),
            description: description.into(),
            platform: Platform::Youtube,
            url: format!("https://youtube.com/watch?v={id}"),
            content_id: id.into(),
            published_date: None,
            duration: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        let content = vec![
            item("c1", "{{ENGAGEMENT_ROWS}}", "{{API_FIELDS}}"),
            item("c2", "Plain", ""),
        ];
        let engagement: Vec<EngagementRecord> = content
            .iter()
            .map(|c| EngagementRecord {
                id: None,
                content_id: c.id.clone(),
                timestamp: Utc::now(),
                views: 10,
                likes: 0,
                comments: 0,
                shares: 0,
                other_metrics: Default::default(),
                content: Some(c.into()),
            })
            .collect();
        tracker.stats = build_stats(&content, &engagement);
        tracker.content = content;
        tracker.engagement = engagement;
        tracker.user = Some(crate::models::User {
            id: "u1".into(),
            name: "{{CONTENT_ROWS}}".into(),
            email: "u@example.com".into(),
            created_at: None,
        });
        tracker.view.screen = Screen::Main;

        let html = render_index(&tracker, None);
        let list_start = html.find(r#"<tbody id="content-list">"#).unwrap();
        let list_end = list_start + html[list_start..].find("</tbody>").unwrap();
        assert_eq!(html[list_start..list_end].matches("<tr").count(), 2);
        assert_eq!(html.matches(r#"id="youtube-api-key""#).count(), 1);
        assert_eq!(html.matches("data-content-id=").count(), 2);
        assert!(html.contains(r#"<span id="current-user-name">{{CONTENT_ROWS}}</span>"#));
    }

    #[test]
    fn api_status_marks_configured_platforms() {
        let mut config = ApiConfig::default();
        config.youtube.api_key = Some("key".into());
        let html = render_api_status(&config);
        assert!(html.contains(r#"id="youtube-api-status" class="api-status bg-green-100""#));
        assert!(html.contains(r#"id="linkedin-api-status" class="api-status bg-red-100""#));
    }
}
