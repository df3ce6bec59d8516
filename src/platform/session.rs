//! Session lifecycle over the platform SDK
//!
//! Wraps SDK initialization, login and identity resolution behind a small
//! state machine, and degrades to a synthetic identity when the integration
//! is administratively disabled. One adapter instance serves one page
//! session; construct it explicitly and inject it where needed.

use std::time::{SystemTime, UNIX_EPOCH};

use log::{info, warn};
use parking_lot::Mutex;

use crate::error::Result;
use crate::platform::{EnvironmentInfo, PlatformSdk, Profile};
use crate::{RuntimeSettings, PLACEHOLDER_APP_ID};

/// Session lifecycle states.
///
/// `RedirectPending` is terminal for the current page load: the page is
/// expected to reload after the external login round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initializing,
    RedirectPending,
    Ready { user_id: String },
    Degraded { user_id: String },
    Failed { message: String },
}

/// Result of one `initialize` attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializationOutcome {
    pub success: bool,
    pub is_logged_in: bool,
    pub user_id: Option<String>,
    pub message: String,
}

/// Host session adapter: owns the SDK handle and the session state.
pub struct SessionAdapter<S: PlatformSdk> {
    sdk: S,
    platform_enabled: bool,
    app_id: String,
    post_login_redirect: Option<String>,
    state: Mutex<SessionState>,
    profile_cache: Mutex<Option<Profile>>,
    fallback_id: Mutex<Option<String>>,
}

/// Mint a synthetic identity, stable for the page lifetime only.
fn synthetic_user_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("dev_user_{millis}")
}

impl<S: PlatformSdk> SessionAdapter<S> {
    pub fn new(settings: &RuntimeSettings, sdk: S) -> Self {
        Self {
            sdk,
            platform_enabled: settings.platform_enabled,
            app_id: settings.app_id.clone(),
            post_login_redirect: settings.post_login_redirect.clone(),
            state: Mutex::new(SessionState::Uninitialized),
            profile_cache: Mutex::new(None),
            fallback_id: Mutex::new(None),
        }
    }

    pub fn sdk(&self) -> &S {
        &self.sdk
    }

    pub fn state(&self) -> SessionState {
        self.state.lock().clone()
    }

    /// Run the full initialization flow.
    ///
    /// With the integration disabled this resolves immediately to a synthetic
    /// identity without touching the SDK: the designed development/offline
    /// mode, not an error path. Calling it again re-runs the flow, which the
    /// store save-recovery path relies on.
    pub async fn initialize(&self) -> InitializationOutcome {
        if !self.platform_enabled {
            let user_id = self.fallback_identity();
            *self.state.lock() = SessionState::Degraded {
                user_id: user_id.clone(),
            };
            info!("platform integration disabled; using synthetic identity {user_id}");
            return InitializationOutcome {
                success: true,
                is_logged_in: true,
                user_id: Some(user_id),
                message: "Platform integration disabled; using synthetic identity (development mode)"
                    .to_string(),
            };
        }

        if self.app_id == PLACEHOLDER_APP_ID || self.app_id.is_empty() {
            let message =
                "Invalid application identifier; configure app_id or disable the platform integration"
                    .to_string();
            *self.state.lock() = SessionState::Failed {
                message: message.clone(),
            };
            return InitializationOutcome {
                success: false,
                is_logged_in: false,
                user_id: None,
                message,
            };
        }

        *self.state.lock() = SessionState::Initializing;

        if let Err(err) = self.sdk.init(&self.app_id).await {
            let message = format!("SDK initialization failed: {err}");
            warn!("{message}");
            *self.state.lock() = SessionState::Failed {
                message: message.clone(),
            };
            return InitializationOutcome {
                success: false,
                is_logged_in: false,
                user_id: None,
                message,
            };
        }

        if !self.sdk.is_logged_in() {
            return self.request_login("Not logged in; login redirect issued");
        }

        // Identity resolution order: cached identifier, then token subject.
        let resolved = self
            .sdk
            .cached_user_id()
            .or_else(|| self.sdk.decoded_token_subject());

        match resolved {
            Some(user_id) => {
                *self.state.lock() = SessionState::Ready {
                    user_id: user_id.clone(),
                };
                InitializationOutcome {
                    success: true,
                    is_logged_in: true,
                    user_id: Some(user_id),
                    message: "Session initialized".to_string(),
                }
            }
            None => self.request_login("No user identifier available; login redirect issued"),
        }
    }

    fn request_login(&self, message: &str) -> InitializationOutcome {
        self.sdk.login(self.post_login_redirect.as_deref());
        *self.state.lock() = SessionState::RedirectPending;
        InitializationOutcome {
            success: false,
            is_logged_in: false,
            user_id: None,
            message: message.to_string(),
        }
    }

    /// Last resolved identifier, or `None` before initialization completes
    pub fn user_id(&self) -> Option<String> {
        match &*self.state.lock() {
            SessionState::Ready { user_id } | SessionState::Degraded { user_id } => {
                Some(user_id.clone())
            }
            _ => None,
        }
    }

    /// Resolved identifier, falling back to a synthetic identity.
    ///
    /// The fallback is minted once and reused for the session lifetime, so
    /// repeated store calls see a stable identifier.
    pub fn resolve_user_id(&self) -> String {
        if let Some(user_id) = self.user_id() {
            return user_id;
        }
        let user_id = self.fallback_identity();
        warn!("no resolved user identifier; falling back to {user_id}");
        user_id
    }

    fn fallback_identity(&self) -> String {
        let mut cell = self.fallback_id.lock();
        cell.get_or_insert_with(synthetic_user_id).clone()
    }

    pub fn is_logged_in(&self) -> bool {
        match &*self.state.lock() {
            SessionState::Degraded { .. } => true,
            SessionState::Ready { .. } => self.sdk.is_logged_in(),
            _ => false,
        }
    }

    /// Fetch and cache the platform profile. Returns `None` when the session
    /// is not in a logged-in state or the fetch fails.
    pub async fn profile(&self) -> Option<Profile> {
        if !matches!(self.state(), SessionState::Ready { .. }) {
            return None;
        }
        match self.sdk.profile().await {
            Ok(profile) => {
                *self.state.lock() = SessionState::Ready {
                    user_id: profile.user_id.clone(),
                };
                *self.profile_cache.lock() = Some(profile.clone());
                Some(profile)
            }
            Err(err) => {
                warn!("profile fetch failed: {err}");
                None
            }
        }
    }

    pub fn cached_profile(&self) -> Option<Profile> {
        self.profile_cache.lock().clone()
    }

    pub fn logout(&self) {
        if matches!(self.state(), SessionState::Ready { .. }) {
            self.sdk.logout();
        }
        *self.state.lock() = SessionState::Uninitialized;
        *self.profile_cache.lock() = None;
    }

    pub fn environment_info(&self) -> EnvironmentInfo {
        self.sdk.environment_info()
    }

    /// Send message payloads through the SDK; requires a ready session.
    pub async fn send_messages(&self, messages: &[crate::platform::MessagePayload]) -> Result<()> {
        self.sdk.send_messages(messages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::DisconnectedSdk;

    fn disabled_settings() -> RuntimeSettings {
        RuntimeSettings {
            platform_enabled: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn disabled_platform_degrades_to_synthetic_identity() {
        let session = SessionAdapter::new(&disabled_settings(), DisconnectedSdk::new());
        let outcome = session.initialize().await;

        assert!(outcome.success);
        assert!(outcome.is_logged_in);
        let user_id = outcome.user_id.expect("synthetic identity");
        assert!(user_id.starts_with("dev_user_"));
        assert!(matches!(session.state(), SessionState::Degraded { .. }));
        assert!(session.is_logged_in());
    }

    #[tokio::test]
    async fn synthetic_identity_is_stable_for_the_session() {
        let session = SessionAdapter::new(&disabled_settings(), DisconnectedSdk::new());
        session.initialize().await;
        let first = session.resolve_user_id();
        let second = session.resolve_user_id();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn placeholder_app_id_fails_initialization() {
        let settings = RuntimeSettings {
            platform_enabled: true,
            ..Default::default()
        };
        let session = SessionAdapter::new(&settings, DisconnectedSdk::new());
        let outcome = session.initialize().await;

        assert!(!outcome.success);
        assert!(outcome.message.contains("application identifier"));
        assert!(matches!(session.state(), SessionState::Failed { .. }));
        assert!(session.user_id().is_none());
    }

    #[tokio::test]
    async fn sdk_failure_lands_in_failed_state() {
        let settings = RuntimeSettings {
            platform_enabled: true,
            app_id: "campaign-app".to_string(),
            ..Default::default()
        };
        // DisconnectedSdk refuses init, standing in for any SDK exception
        let session = SessionAdapter::new(&settings, DisconnectedSdk::new());
        let outcome = session.initialize().await;

        assert!(!outcome.success);
        assert!(matches!(session.state(), SessionState::Failed { .. }));
    }
}
