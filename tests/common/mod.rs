//! Shared test doubles for the platform SDK

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use posterforge::error::Result;
use posterforge::platform::{EnvironmentInfo, MessagePayload, PlatformSdk, Profile};

/// Scripted platform SDK: state flags are set up front, outbound calls are
/// recorded, and the share-sheet can be gated on a notify handle so tests can
/// hold a share in flight.
#[derive(Default)]
pub struct MockSdk {
    pub logged_in: bool,
    pub in_client: bool,
    pub share_available: bool,
    pub cached_id: Option<String>,
    pub token_subject: Option<String>,
    pub share_gate: Option<Arc<Notify>>,
    pub login_calls: Mutex<Vec<Option<String>>>,
    pub shared: Mutex<Vec<Vec<MessagePayload>>>,
    pub sent: Mutex<Vec<Vec<MessagePayload>>>,
}

impl PlatformSdk for MockSdk {
    async fn init(&self, _app_id: &str) -> Result<()> {
        Ok(())
    }

    fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    fn is_in_client(&self) -> bool {
        self.in_client
    }

    fn is_api_available(&self, api: &str) -> bool {
        api == "shareTargetPicker" && self.share_available
    }

    fn cached_user_id(&self) -> Option<String> {
        self.cached_id.clone()
    }

    fn decoded_token_subject(&self) -> Option<String> {
        self.token_subject.clone()
    }

    fn login(&self, redirect_uri: Option<&str>) {
        self.login_calls
            .lock()
            .push(redirect_uri.map(|s| s.to_string()));
    }

    fn logout(&self) {}

    fn environment_info(&self) -> EnvironmentInfo {
        EnvironmentInfo {
            os: "test".to_string(),
            language: "zh-TW".to_string(),
            sdk_version: "mock".to_string(),
            is_in_client: self.in_client,
            is_logged_in: self.logged_in,
        }
    }

    async fn profile(&self) -> Result<Profile> {
        Ok(Profile {
            user_id: self
                .cached_id
                .clone()
                .unwrap_or_else(|| "U_mock".to_string()),
            display_name: "Mock User".to_string(),
            picture_url: None,
        })
    }

    async fn send_messages(&self, messages: &[MessagePayload]) -> Result<()> {
        self.sent.lock().push(messages.to_vec());
        Ok(())
    }

    async fn share_target_picker(&self, messages: &[MessagePayload]) -> Result<()> {
        if let Some(gate) = &self.share_gate {
            gate.notified().await;
        }
        self.shared.lock().push(messages.to_vec());
        Ok(())
    }
}
