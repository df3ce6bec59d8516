//! Delivery orchestration for composed posters
//!
//! A composite blob leaves the pipeline through one of three paths: a local
//! download, the platform share-sheet, or a direct message send. The path is
//! chosen by caller intent; the host environment (classified once at
//! startup) shapes how each path behaves. Only the share path is serialized
//! against itself, through a process-wide one-at-a-time guard.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use log::{info, warn};

use crate::error::{Error, Result};
use crate::platform::{MessagePayload, PlatformSdk, SessionAdapter};
use crate::rendering::CompositeBlob;
use crate::{EventType, RuntimeSettings};

/// How long a transient object reference outlives the download trigger, so
/// the dependent host action can complete before release.
const RELEASE_DELAY: Duration = Duration::from_millis(1000);

/// Host environment, classified once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEnvironment {
    /// Running inside the platform's embedded client
    EmbeddedClient,
    /// Running in an external browser with the platform integration enabled
    ExternalBrowser,
    /// Platform integration disabled; local development
    LocalDev,
}

impl HostEnvironment {
    pub fn classify<S: PlatformSdk>(settings: &RuntimeSettings, sdk: &S) -> Self {
        if !settings.platform_enabled {
            HostEnvironment::LocalDev
        } else if sdk.is_in_client() {
            HostEnvironment::EmbeddedClient
        } else {
            HostEnvironment::ExternalBrowser
        }
    }
}

/// A transient object reference to blob bytes, owned by whoever created it
/// and released exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectUrl {
    href: String,
}

impl ObjectUrl {
    pub fn href(&self) -> &str {
        &self.href
    }
}

/// Host facilities the orchestrator needs: object-reference management and
/// the save/preview actions. Implementations live at the host boundary; the
/// filesystem shell below backs the CLI.
pub trait HostShell: Send + Sync {
    /// Materialize a transient reference to the blob's bytes
    fn create_object_url(&self, blob: &CompositeBlob) -> Result<ObjectUrl>;

    /// Release a reference created by this shell
    fn revoke_object_url(&self, url: &ObjectUrl);

    /// Trigger the host save action for the referenced bytes
    fn trigger_download(&self, url: &ObjectUrl, file_name: &str) -> Result<()>;

    /// Present the image for manual saving (embedded clients may silently
    /// block the programmatic save action)
    fn open_manual_save_view(&self, url: &ObjectUrl) -> Result<()>;
}

/// Filesystem-backed host shell: object references are temp files, the save
/// action copies into a download directory, and the manual-save view is a
/// small HTML page pointing at the reference.
pub struct FsShell {
    download_dir: PathBuf,
    counter: AtomicU64,
}

impl FsShell {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
            counter: AtomicU64::new(0),
        }
    }

    fn extension_for(mime_type: &str) -> &'static str {
        match mime_type {
            "image/jpeg" => "jpg",
            _ => "png",
        }
    }

    fn path_of(url: &ObjectUrl) -> PathBuf {
        PathBuf::from(url.href.strip_prefix("file://").unwrap_or(&url.href))
    }
}

impl HostShell for FsShell {
    fn create_object_url(&self, blob: &CompositeBlob) -> Result<ObjectUrl> {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        let name = format!(
            "posterforge-{}-{}.{}",
            millis,
            seq,
            Self::extension_for(blob.mime_type())
        );
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, blob.bytes())
            .map_err(|e| Error::Other(format!("failed to stage blob: {e}")))?;
        Ok(ObjectUrl {
            href: format!("file://{}", path.display()),
        })
    }

    fn revoke_object_url(&self, url: &ObjectUrl) {
        if let Err(e) = std::fs::remove_file(Self::path_of(url)) {
            warn!("failed to release object reference {}: {e}", url.href());
        }
    }

    fn trigger_download(&self, url: &ObjectUrl, file_name: &str) -> Result<()> {
        let mut name = file_name.to_string();
        if !name.contains('.') {
            name.push_str(".png");
        }
        std::fs::create_dir_all(&self.download_dir)
            .map_err(|e| Error::Other(format!("failed to create download dir: {e}")))?;
        let target = self.download_dir.join(name);
        std::fs::copy(Self::path_of(url), &target)
            .map_err(|e| Error::Other(format!("download failed: {e}")))?;
        info!("saved poster to {}", target.display());
        Ok(())
    }

    fn open_manual_save_view(&self, url: &ObjectUrl) -> Result<()> {
        let page = format!(
            "<!DOCTYPE html>\n<html><body style=\"margin:0;padding:20px;text-align:center;background:#000;color:#fff\">\n\
             <img src=\"{}\" alt=\"poster\" style=\"max-width:100%\"/>\n\
             <p>Long-press the image to save it to your photos.</p>\n\
             </body></html>\n",
            url.href()
        );
        std::fs::create_dir_all(&self.download_dir)
            .map_err(|e| Error::Other(format!("failed to create download dir: {e}")))?;
        let target = self.download_dir.join("poster-preview.html");
        std::fs::write(&target, page)
            .map_err(|e| Error::Other(format!("failed to write preview view: {e}")))?;
        info!("opened manual-save view at {}", target.display());
        Ok(())
    }
}

/// One-at-a-time guard for the share path.
///
/// Acquired synchronously before the share path's first suspension point and
/// released on every exit path via the returned hold.
#[derive(Debug, Default)]
pub struct ShareGuard {
    in_flight: AtomicBool,
}

impl ShareGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Result<ShareGuardHold<'_>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::ShareInProgress);
        }
        Ok(ShareGuardHold { guard: self })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Releases the guard on drop, whatever the exit path.
#[derive(Debug)]
pub struct ShareGuardHold<'a> {
    guard: &'a ShareGuard,
}

impl Drop for ShareGuardHold<'_> {
    fn drop(&mut self) {
        self.guard.in_flight.store(false, Ordering::Release);
    }
}

/// The three delivery paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPath {
    Download,
    ShareSheet,
    DirectSend,
}

/// Blob representation a platform path accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadRepr {
    /// A transient local object reference is enough
    TransientRef,
    /// The message transport needs the bytes fully embedded
    Embedded,
}

impl DeliveryPath {
    /// Representation each path accepts, resolved once rather than re-derived
    /// at each call site.
    pub fn accepted_repr(self) -> PayloadRepr {
        match self {
            DeliveryPath::Download | DeliveryPath::ShareSheet => PayloadRepr::TransientRef,
            DeliveryPath::DirectSend => PayloadRepr::Embedded,
        }
    }
}

enum ImageHandle {
    Transient(ObjectUrl),
    Embedded(String),
}

impl ImageHandle {
    fn href(&self) -> &str {
        match self {
            ImageHandle::Transient(url) => url.href(),
            ImageHandle::Embedded(uri) => uri,
        }
    }
}

/// Delivery orchestrator for one page session.
pub struct DeliveryOrchestrator {
    environment: HostEnvironment,
    share_enabled: bool,
    share_templates: HashMap<EventType, String>,
    shell: Box<dyn HostShell>,
    share_guard: ShareGuard,
}

impl DeliveryOrchestrator {
    pub fn new(
        settings: &RuntimeSettings,
        environment: HostEnvironment,
        shell: Box<dyn HostShell>,
    ) -> Self {
        Self {
            environment,
            share_enabled: settings.share_enabled,
            share_templates: settings.share_templates.clone(),
            shell,
            share_guard: ShareGuard::new(),
        }
    }

    pub fn environment(&self) -> HostEnvironment {
        self.environment
    }

    pub fn share_guard(&self) -> &ShareGuard {
        &self.share_guard
    }

    fn resolve_handle(&self, blob: &CompositeBlob, path: DeliveryPath) -> Result<ImageHandle> {
        match path.accepted_repr() {
            PayloadRepr::TransientRef => {
                Ok(ImageHandle::Transient(self.shell.create_object_url(blob)?))
            }
            PayloadRepr::Embedded => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(blob.bytes());
                Ok(ImageHandle::Embedded(format!(
                    "data:{};base64,{}",
                    blob.mime_type(),
                    encoded
                )))
            }
        }
    }

    fn release_handle(&self, handle: ImageHandle) {
        if let ImageHandle::Transient(url) = handle {
            self.shell.revoke_object_url(&url);
        }
    }

    /// Save the blob locally.
    ///
    /// Creates a transient reference, triggers the host save action, and
    /// releases the reference after a bounded delay. Inside the embedded
    /// client a manual-save view is opened as well, since the programmatic
    /// save may be silently blocked there.
    pub async fn download(&self, blob: CompositeBlob, file_name: &str) -> Result<()> {
        let handle = self.resolve_handle(&blob, DeliveryPath::Download)?;
        drop(blob);

        let outcome = match &handle {
            ImageHandle::Transient(url) => {
                let triggered = self.shell.trigger_download(url, file_name);
                if self.environment == HostEnvironment::EmbeddedClient {
                    if let Err(e) = self.shell.open_manual_save_view(url) {
                        warn!("manual-save view failed: {e}");
                    }
                }
                triggered
            }
            ImageHandle::Embedded(_) => Ok(()),
        };

        // The reference stays alive long enough for the host action, then is
        // released exactly once, on success and failure alike.
        tokio::time::sleep(RELEASE_DELAY).await;
        self.release_handle(handle);
        outcome
    }

    /// Open the platform share-sheet with the blob and the event's template
    /// text.
    ///
    /// Rejects immediately when a share is already in flight, when sharing is
    /// disabled by configuration, or when the host does not report the
    /// capability. The guard is acquired before the first suspension point
    /// and released on every exit path.
    pub async fn share<S: PlatformSdk>(
        &self,
        session: &SessionAdapter<S>,
        blob: CompositeBlob,
        event_type: EventType,
    ) -> Result<()> {
        let _hold = self.share_guard.try_acquire()?;

        if !self.share_enabled {
            return Err(Error::CapabilityUnavailable(
                "sharing is disabled by configuration".to_string(),
            ));
        }
        if !session.sdk().is_api_available("shareTargetPicker") {
            return Err(Error::CapabilityUnavailable(
                "share target picker is not available in this environment".to_string(),
            ));
        }

        let handle = self.resolve_handle(&blob, DeliveryPath::ShareSheet)?;
        drop(blob);

        let mut messages = Vec::new();
        if let Some(template) = self.share_templates.get(&event_type) {
            messages.push(MessagePayload::text(template.clone()));
        }
        messages.push(MessagePayload::image(handle.href()));

        let result = session.sdk().share_target_picker(&messages).await;
        self.release_handle(handle);
        result
    }

    /// Send the blob directly to the current chat.
    ///
    /// Requires confirmed login and a resolved user identifier. The message
    /// transport does not accept transient local references, so the blob is
    /// converted to its embedded representation first.
    pub async fn send_direct<S: PlatformSdk>(
        &self,
        session: &SessionAdapter<S>,
        blob: CompositeBlob,
    ) -> Result<()> {
        if !session.is_logged_in() {
            return Err(Error::PlatformError(
                "login required before sending a message".to_string(),
            ));
        }
        if session.user_id().is_none() {
            return Err(Error::PlatformError(
                "no resolved user identifier".to_string(),
            ));
        }

        let handle = self.resolve_handle(&blob, DeliveryPath::DirectSend)?;
        drop(blob);

        let messages = vec![MessagePayload::image(handle.href())];
        let result = session.send_messages(&messages).await;
        self.release_handle(handle);
        result
    }
}
