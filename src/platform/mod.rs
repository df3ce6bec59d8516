//! Platform SDK surface: login, profile, message send and share-sheet
//!
//! The messaging-platform client library is an external collaborator; this
//! module defines the typed contract the rest of the pipeline talks to, plus
//! a disconnected implementation used when the integration is switched off.

pub mod session;

pub use session::{InitializationOutcome, SessionAdapter, SessionState};

use crate::error::{Error, Result};

/// One outbound message payload. Sends and shares both accept an ordered
/// list of these.
#[derive(Debug, Clone, PartialEq)]
pub enum MessagePayload {
    /// Plain text message
    Text { text: String },
    /// Image message; the platform fetches both renditions itself
    Image {
        original_url: String,
        preview_url: String,
    },
    /// Rich template message with a fallback alt text
    Template {
        alt_text: String,
        content: serde_json::Value,
    },
}

impl MessagePayload {
    pub fn text(text: impl Into<String>) -> Self {
        MessagePayload::Text { text: text.into() }
    }

    /// Image payload reusing one rendition for both original and preview
    pub fn image(url: impl Into<String>) -> Self {
        let url = url.into();
        MessagePayload::Image {
            original_url: url.clone(),
            preview_url: url,
        }
    }
}

/// Platform user profile
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub user_id: String,
    pub display_name: String,
    pub picture_url: Option<String>,
}

/// Snapshot of the host platform environment
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentInfo {
    pub os: String,
    pub language: String,
    pub sdk_version: String,
    pub is_in_client: bool,
    pub is_logged_in: bool,
}

/// Contract over the messaging-platform client library.
///
/// Query methods are synchronous state reads; everything that talks to the
/// platform suspends. Implementations live at the host boundary; tests
/// substitute scripted fakes.
pub trait PlatformSdk {
    /// Initialize the SDK with the campaign's application identifier
    fn init(&self, app_id: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    fn is_logged_in(&self) -> bool;

    /// Whether the page runs inside the platform's embedded client
    fn is_in_client(&self) -> bool;

    /// Whether the host reports the named capability as available
    fn is_api_available(&self, api: &str) -> bool;

    /// Directly cached user identifier, when the platform context has one
    fn cached_user_id(&self) -> Option<String>;

    /// Subject claim of the decoded session token, when present
    fn decoded_token_subject(&self) -> Option<String>;

    /// Trigger the external login round trip; the page reloads afterwards
    fn login(&self, redirect_uri: Option<&str>);

    fn logout(&self);

    fn environment_info(&self) -> EnvironmentInfo;

    fn profile(&self) -> impl std::future::Future<Output = Result<Profile>> + Send;

    /// Send payloads to the current chat
    fn send_messages(
        &self,
        messages: &[MessagePayload],
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Open the share-sheet with the given payloads
    fn share_target_picker(
        &self,
        messages: &[MessagePayload],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// SDK stand-in for sessions where the platform integration is disabled.
///
/// Every suspending call fails with an actionable message; state queries
/// report a logged-out browser context. The session adapter short-circuits
/// to a synthetic identity before ever reaching these.
#[derive(Debug, Default)]
pub struct DisconnectedSdk;

impl DisconnectedSdk {
    pub fn new() -> Self {
        DisconnectedSdk
    }

    fn unavailable<T>(&self) -> Result<T> {
        Err(Error::PlatformError(
            "platform integration is disabled".to_string(),
        ))
    }
}

impl PlatformSdk for DisconnectedSdk {
    async fn init(&self, _app_id: &str) -> Result<()> {
        self.unavailable()
    }

    fn is_logged_in(&self) -> bool {
        false
    }

    fn is_in_client(&self) -> bool {
        false
    }

    fn is_api_available(&self, _api: &str) -> bool {
        false
    }

    fn cached_user_id(&self) -> Option<String> {
        None
    }

    fn decoded_token_subject(&self) -> Option<String> {
        None
    }

    fn login(&self, _redirect_uri: Option<&str>) {}

    fn logout(&self) {}

    fn environment_info(&self) -> EnvironmentInfo {
        EnvironmentInfo {
            os: "unknown".to_string(),
            language: "unknown".to_string(),
            sdk_version: "disabled".to_string(),
            is_in_client: false,
            is_logged_in: false,
        }
    }

    async fn profile(&self) -> Result<Profile> {
        self.unavailable()
    }

    async fn send_messages(&self, _messages: &[MessagePayload]) -> Result<()> {
        self.unavailable()
    }

    async fn share_target_picker(&self, _messages: &[MessagePayload]) -> Result<()> {
        self.unavailable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_payload_reuses_rendition() {
        let payload = MessagePayload::image("blob:abc");
        match payload {
            MessagePayload::Image {
                original_url,
                preview_url,
            } => {
                assert_eq!(original_url, "blob:abc");
                assert_eq!(preview_url, "blob:abc");
            }
            _ => panic!("unexpected payload"),
        }
    }

    #[tokio::test]
    async fn disconnected_sdk_refuses_suspending_calls() {
        let sdk = DisconnectedSdk::new();
        assert!(!sdk.is_logged_in());
        assert!(!sdk.is_api_available("shareTargetPicker"));
        assert!(sdk.init("app").await.is_err());
        assert!(sdk.send_messages(&[MessagePayload::text("hi")]).await.is_err());
    }
}
