//! Session bootstrap, login, registration and logout.
//!
//! Bootstrap and login share one pipeline: a (possibly failed) session goes
//! in, an [`AuthOutcome`] comes out, and a signed-in outcome always goes
//! through [`Tracker::enter_session`]. A session is only ever accepted once
//! its profile row has been read.

use serde_json::json;
use tracing::{error, info, warn};

use crate::errors::{ServiceError, TrackerError};
use crate::models::{RegisterForm, Session, User};
use crate::tracker::{AuthTab, Notice, Screen, Tracker};

const LOGIN_FALLBACK: &str = "Invalid email or password";
const REGISTER_FALLBACK: &str = "Error creating account";
const REGISTERED: &str = "Account created successfully! Please log in.";

#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    SignedIn(User),
    AuthFailed(String),
    ProfileMissing(String),
}

impl Tracker {
    /// Runs once at startup, before any request is served.
    pub async fn bootstrap(&mut self) -> bool {
        let session = match self.service.get_session().await {
            Ok(session) => session,
            Err(err) => {
                warn!("could not read existing session: {err}");
                None
            }
        };

        if let Some(session) = session {
            match self.resolve_session(Ok(session)).await {
                AuthOutcome::SignedIn(user) => {
                    info!(user_id = %user.id, "resumed existing session");
                    self.enter_session(user).await;
                    return true;
                }
                AuthOutcome::AuthFailed(message) | AuthOutcome::ProfileMissing(message) => {
                    warn!("session has no usable profile ({message}), signing out");
                    self.sign_out_quietly().await;
                }
            }
        }

        self.show_auth();
        false
    }

    pub async fn resolve_session(&self, attempt: Result<Session, ServiceError>) -> AuthOutcome {
        let session = match attempt {
            Ok(session) => session,
            Err(err) => {
                warn!("sign-in failed: {err}");
                return AuthOutcome::AuthFailed(err.user_message(LOGIN_FALLBACK));
            }
        };

        match self.service.fetch_profile(&session.user.id).await {
            Ok(user) => AuthOutcome::SignedIn(user),
            Err(err) => {
                warn!(user_id = %session.user.id, "profile lookup failed: {err}");
                AuthOutcome::ProfileMissing(err.user_message(LOGIN_FALLBACK))
            }
        }
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<User, TrackerError> {
        let email = email.trim();
        self.view.login_email = email.to_string();
        if email.is_empty() || password.is_empty() {
            return Err(self.fail_login(TrackerError::Validation(
                "Email and password are required".into(),
            )));
        }

        let attempt = self.service.sign_in_with_password(email, password).await;
        match self.resolve_session(attempt).await {
            AuthOutcome::SignedIn(user) => {
                self.view.login_email.clear();
                self.enter_session(user.clone()).await;
                Ok(user)
            }
            AuthOutcome::AuthFailed(message) => Err(self.fail_login(TrackerError::Auth(message))),
            AuthOutcome::ProfileMissing(message) => {
                self.sign_out_quietly().await;
                Err(self.fail_login(TrackerError::ProfileMissing(message)))
            }
        }
    }

    fn fail_login(&mut self, err: TrackerError) -> TrackerError {
        self.view.login_error = Some(err.to_string());
        err
    }

    /// Creates the auth account and its profile row. Does not sign in.
    pub async fn register(&mut self, form: RegisterForm) -> Result<(), TrackerError> {
        let name = form.name.trim().to_string();
        let email = form.email.trim().to_string();
        self.view.register_name = name.clone();
        self.view.register_email = email.clone();

        if name.is_empty() || email.is_empty() || form.password.is_empty() {
            return Err(self.fail_register(TrackerError::Validation(
                "All fields are required".into(),
            )));
        }
        if form.password != form.confirm_password {
            return Err(self.fail_register(TrackerError::Validation(
                "Passwords do not match".into(),
            )));
        }

        let account = match self
            .service
            .sign_up(&email, &form.password, json!({ "name": name }))
            .await
        {
            Ok(account) => account,
            Err(err) => {
                warn!("sign-up failed: {err}");
                return Err(self.fail_register(TrackerError::Auth(
                    err.user_message(REGISTER_FALLBACK),
                )));
            }
        };

        let profile = User {
            id: account.id.clone(),
            name,
            email,
            created_at: None,
        };
        if let Err(err) = self.insert_profile_with_retry(&profile).await {
            // The auth account exists but cannot be used without a profile.
            error!(user_id = %profile.id, "profile insert failed after sign-up: {err}");
            self.sign_out_quietly().await;
            return Err(self.fail_register(TrackerError::ProfileMissing(
                err.user_message(REGISTER_FALLBACK),
            )));
        }

        info!(user_id = %profile.id, "account registered");
        self.view.register_name.clear();
        self.view.register_email.clear();
        self.view.register_notice = Some(Notice::success(REGISTERED));
        self.view.login_error = None;
        self.view.auth_tab = AuthTab::Login;
        Ok(())
    }

    async fn insert_profile_with_retry(&self, profile: &User) -> Result<(), ServiceError> {
        match self.service.insert_profile(profile).await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(user_id = %profile.id, "profile insert failed, retrying once: {err}");
                self.service.insert_profile(profile).await
            }
        }
    }

    fn fail_register(&mut self, err: TrackerError) -> TrackerError {
        self.view.register_notice = Some(Notice::error(err.to_string()));
        err
    }

    pub async fn logout(&mut self) {
        if let Some(user) = &self.user {
            info!(user_id = %user.id, "signing out");
        }
        self.sign_out_quietly().await;
        self.show_auth();
        self.view.auth_tab = AuthTab::Login;
    }

    /// The one login transition, shared by bootstrap and login.
    pub(crate) async fn enter_session(&mut self, user: User) {
        self.user = Some(user);
        self.view.screen = Screen::Main;
        self.view.login_error = None;
        self.view.register_notice = None;
        if let Err(err) = self.load_user_data().await {
            warn!("initial data load failed: {err}");
        }
    }

    fn show_auth(&mut self) {
        self.clear_session_data();
        self.view.screen = Screen::Auth;
    }

    async fn sign_out_quietly(&self) {
        if let Err(err) = self.service.sign_out().await {
            warn!("sign-out failed: {err}");
        }
    }
}
