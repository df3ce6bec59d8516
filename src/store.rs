//! Remote image-store API client
//!
//! History, quota, detail and save endpoints for generated posters. Errors
//! surface the response body's `message` when present, otherwise a
//! status-keyed fallback. Exactly one automatic retry path exists: a save
//! rejected over the user identifier re-initializes the identity, warms the
//! account up, and retries once.

use std::time::Duration;

use futures::future;
use log::{debug, warn};
use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};
use crate::platform::{PlatformSdk, SessionAdapter};
use crate::rendering::CompositeBlob;
use crate::{EventType, RuntimeSettings};

/// Pause between identity re-initialization and the save retry, giving the
/// backend time to materialize the account.
const RETRY_PAUSE: Duration = Duration::from_millis(1000);

/// Status-keyed fallback messages, used when the error body carries none
fn status_message(status: u16) -> &'static str {
    match status {
        400 => "Bad request format",
        401 => "Unauthorized; please log in again",
        403 => "Access forbidden",
        404 => "Requested resource does not exist",
        500 => "Internal server error",
        503 => "Service temporarily unavailable",
        _ => "Unknown error",
    }
}

/// Whether a save failure looks like a user-identifier validation problem,
/// the one class of error that earns an automatic retry.
fn is_user_identifier_error(err: &Error) -> bool {
    let message = err.to_string().to_lowercase();
    message.contains("user id") || message.contains("user_id") || message.contains("422")
}

/// Client for the remote image-store API.
#[derive(Debug)]
pub struct ImageStoreClient {
    base_url: String,
    client: reqwest::Client,
    debug: bool,
}

impl ImageStoreClient {
    /// Build a client from the store settings.
    ///
    /// The base URL must be an absolute http(s) URL; anything else is a
    /// configuration error rather than a latent per-request failure.
    pub fn new(settings: &RuntimeSettings) -> Result<Self> {
        let base = settings.store.base_url.trim_end_matches('/').to_string();
        let parsed = Url::parse(&base)
            .map_err(|e| Error::ConfigError(format!("invalid store base URL: {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(Error::ConfigError(format!(
                "store base URL must be http(s), got {}",
                parsed.scheme()
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.store.timeout_ms))
            .build()
            .map_err(|e| Error::ConfigError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base,
            client,
            debug: settings.debug,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn handle_response(response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        let text = response.text().await?;
        let body: Option<Value> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            let message = body
                .as_ref()
                .and_then(|b| b.get("message"))
                .and_then(|m| m.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| status_message(status.as_u16()).to_string());
            return Err(Error::StoreError(message));
        }

        Ok(body.unwrap_or(Value::String(text)))
    }

    /// Generated-image history for a user
    pub async fn image_history(&self, user_id: &str, event_type: EventType) -> Result<Value> {
        let url = self.endpoint("gba60/images");
        if self.debug {
            debug!("GET {url} user_id={user_id} event_type={event_type}");
        }
        let response = self
            .client
            .get(&url)
            .query(&[("user_id", user_id), ("event_type", event_type.as_str())])
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Generated-image count and remaining quota for a user
    pub async fn image_count(&self, user_id: &str, event_type: EventType) -> Result<Value> {
        let response = self
            .client
            .get(self.endpoint("gba60/images/count"))
            .query(&[("user_id", user_id), ("event_type", event_type.as_str())])
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Detail for a single stored image; `user_id` scopes the permission check
    pub async fn image_detail(&self, image_id: &str, user_id: Option<&str>) -> Result<Value> {
        let mut request = self
            .client
            .get(self.endpoint(&format!("gba60/images/{image_id}")));
        if let Some(user_id) = user_id {
            request = request.query(&[("user_id", user_id)]);
        }
        Self::handle_response(request.send().await?).await
    }

    /// Store one generated poster with its text
    pub async fn save_image(
        &self,
        user_id: &str,
        event_type: EventType,
        text: &str,
        blob: &CompositeBlob,
    ) -> Result<Value> {
        let part = reqwest::multipart::Part::bytes(blob.bytes().to_vec())
            .file_name("poster.png")
            .mime_str(blob.mime_type())
            .map_err(|e| Error::InputError(format!("invalid blob mime type: {e}")))?;
        let form = reqwest::multipart::Form::new()
            .text("user_id", user_id.to_string())
            .text("event_type", event_type.as_str().to_string())
            .text("text", text.to_string())
            .part("image", part);

        if self.debug {
            debug!(
                "POST {} user_id={user_id} event_type={event_type} image_size={}",
                self.endpoint("gba60/images"),
                blob.len()
            );
        }

        let response = self
            .client
            .post(self.endpoint("gba60/images"))
            .multipart(form)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Warm up the account by touching the count and history endpoints, which
    /// the backend may use to auto-create the user. Failures are logged, not
    /// fatal.
    pub async fn warm_up(&self, user_id: &str, event_type: EventType) -> bool {
        let (count, history) = future::join(
            self.image_count(user_id, event_type),
            self.image_history(user_id, event_type),
        )
        .await;

        if let Err(e) = &count {
            debug!("warm-up count call failed: {e}");
        }
        if let Err(e) = &history {
            debug!("warm-up history call failed: {e}");
        }
        count.is_ok() || history.is_ok()
    }

    /// Save with the single guarded retry.
    ///
    /// A failure that looks like a user-identifier validation error triggers
    /// an explicit identity re-initialization and account warm-up, then one
    /// retry. A second failure is terminal and reports the resolved user
    /// identifier for support escalation.
    pub async fn save_with_recovery<S: PlatformSdk>(
        &self,
        session: &SessionAdapter<S>,
        event_type: EventType,
        text: &str,
        blob: &CompositeBlob,
    ) -> Result<Value> {
        let user_id = session.resolve_user_id();

        match self.save_image(&user_id, event_type, text, blob).await {
            Ok(saved) => Ok(saved),
            Err(err) if is_user_identifier_error(&err) => {
                warn!("save rejected over user identifier ({err}); re-initializing identity");

                session.initialize().await;
                let user_id = session.resolve_user_id();
                self.warm_up(&user_id, event_type).await;
                tokio::time::sleep(RETRY_PAUSE).await;

                self.save_image(&user_id, event_type, text, blob)
                    .await
                    .map_err(|retry_err| {
                        Error::StoreError(format!(
                            "Save failed after identity retry: {retry_err}. \
                             Contact support with user id {user_id}"
                        ))
                    })
            }
            Err(err) => Err(err),
        }
    }
}
