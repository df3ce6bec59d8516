//! Posterforge Campaign Pipeline
//!
//! A library for turning short user text into a moderated, laid-out,
//! rasterized campaign poster and routing the result to a delivery path
//! (local download, platform share-sheet, or direct message send).
//!
//! # Features
//!
//! - **Moderation**: tiered banned-term redaction with per-tier statistics
//! - **Composition**: text wrapped and drawn over a themed background image
//! - **Delivery**: environment-aware download / share / send with a guarded
//!   one-at-a-time share policy
//!
//! # Example
//!
//! ```no_run
//! use posterforge::{EventType, RuntimeSettings};
//! use posterforge::moderation::ModerationEngine;
//! use posterforge::rendering::compose::{Compositor, RenderOptions};
//!
//! # async fn demo() -> posterforge::Result<()> {
//! let settings = RuntimeSettings::default();
//! let engine = ModerationEngine::new();
//!
//! let moderated = engine.moderate("金鐘60 應援!");
//! let compositor = Compositor::new(&settings);
//! let blob = compositor
//!     .compose("assets/cheer_bg.png", &moderated.filtered_text, EventType::Cheer, RenderOptions::default())
//!     .await?;
//! std::fs::write("poster.png", blob.bytes())?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Error, Result};

// Tiered banned-term moderation
pub mod moderation;

// Text layout and raster composition
pub mod rendering;

// Platform SDK surface and session lifecycle
pub mod platform;

// Environment-aware delivery paths (download / share-sheet / direct send)
pub mod delivery;

// Remote image-store API client
pub mod store;

// Re-export the most commonly constructed types at the crate root
pub use delivery::{DeliveryOrchestrator, HostEnvironment};
pub use moderation::{ModerationEngine, ModerationResult, Severity};
pub use platform::session::SessionAdapter;
pub use rendering::CompositeBlob;

/// Placeholder application identifier shipped in default settings.
///
/// Initialization against the real platform refuses to proceed while the
/// identifier still holds this value.
pub const PLACEHOLDER_APP_ID: &str = "YOUR_APP_ID";

/// Theme/event selector for the composite pipeline.
///
/// Each event type carries its own background art, text style profile and
/// share-message template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Fan-support poster: white centered text with a drop shadow
    Cheer,
    /// Acceptance-speech card: dark top-left text, slightly rotated
    AwardSpeech,
}

impl EventType {
    /// Wire name used by the store API and URL parameters
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Cheer => "cheer",
            EventType::AwardSpeech => "award_speech",
        }
    }

    /// Parse a wire name; unknown names fall back to `Cheer`, the default
    /// theme, mirroring how the page resolves its event type.
    pub fn parse_or_default(s: &str) -> Self {
        match s {
            "award_speech" => EventType::AwardSpeech,
            _ => EventType::Cheer,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote image-store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Base URL of the store API, e.g. `https://api.example.com`
    pub base_url: String,
    /// Overall request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_ms: 30000,
        }
    }
}

/// Runtime configuration for one page session
///
/// This is the Rust rendition of the page-global settings object: platform
/// integration switches, identifiers, share templates and store endpoints.
/// The defaults are chosen to be safe for development: the platform
/// integration is off, so sessions degrade to a synthetic identity without
/// any external SDK traffic.
///
/// # Examples
///
/// ```
/// let settings = posterforge::RuntimeSettings::default();
/// assert!(!settings.platform_enabled);
/// assert_eq!(settings.app_id, posterforge::PLACEHOLDER_APP_ID);
/// ```
///
/// Settings deserialize with defaults for every missing field, so a partial
/// page-global configuration object overlays cleanly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Whether the messaging-platform integration is enabled at all
    pub platform_enabled: bool,
    /// Application identifier used to initialize the platform SDK
    pub app_id: String,
    /// Companion official-account identifier, if configured
    pub companion_id: Option<String>,
    /// Whether the share-sheet path is enabled
    pub share_enabled: bool,
    /// Per-theme leading text sent ahead of the image payload when sharing
    pub share_templates: HashMap<EventType, String>,
    /// Explicit post-login redirect URL; defaults to the current page
    pub post_login_redirect: Option<String>,
    /// Origin of the hosting page, used to classify image references
    pub app_origin: Option<String>,
    /// Explicit font file used for text drawing; resolved from well-known
    /// locations when absent
    pub font_path: Option<PathBuf>,
    /// Remote image-store connection settings
    pub store: StoreSettings,
    /// Verbose request/response logging
    pub debug: bool,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        let mut share_templates = HashMap::new();
        share_templates.insert(
            EventType::Cheer,
            "我做了一張金鐘60應援海報，一起來應援吧！".to_string(),
        );
        share_templates.insert(
            EventType::AwardSpeech,
            "這是我的金鐘60得獎感言，也寫下你的吧！".to_string(),
        );

        Self {
            platform_enabled: false,
            app_id: PLACEHOLDER_APP_ID.to_string(),
            companion_id: None,
            share_enabled: true,
            share_templates,
            post_login_redirect: None,
            app_origin: None,
            font_path: None,
            store: StoreSettings::default(),
            debug: false,
        }
    }
}

impl RuntimeSettings {
    /// Leading share text for the given event type, when one is configured
    pub fn share_template(&self, event_type: EventType) -> Option<&str> {
        self.share_templates.get(&event_type).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = RuntimeSettings::default();
        assert!(!settings.platform_enabled);
        assert!(settings.share_enabled);
        assert_eq!(settings.store.timeout_ms, 30000);
        assert!(settings.share_template(EventType::Cheer).is_some());
    }

    #[test]
    fn partial_settings_overlay_the_defaults() {
        let settings: RuntimeSettings = serde_json::from_str(
            r#"{
                "platform_enabled": true,
                "app_id": "campaign-app",
                "store": { "base_url": "https://api.example.com" }
            }"#,
        )
        .unwrap();

        assert!(settings.platform_enabled);
        assert_eq!(settings.app_id, "campaign-app");
        assert_eq!(settings.store.base_url, "https://api.example.com");
        // unspecified fields keep their defaults
        assert!(settings.share_enabled);
        assert_eq!(settings.store.timeout_ms, 30000);
    }

    #[test]
    fn test_event_type_parse() {
        assert_eq!(EventType::parse_or_default("cheer"), EventType::Cheer);
        assert_eq!(
            EventType::parse_or_default("award_speech"),
            EventType::AwardSpeech
        );
        // unknown names resolve to the default theme
        assert_eq!(EventType::parse_or_default("banquet"), EventType::Cheer);
    }
}
