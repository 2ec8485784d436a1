//! Port for the cloud camera service.
//!
//! The collector, authenticator and capture step only talk to the camera
//! cloud through [`CameraService`]. [`crate::blink::BlinkClient`] is the
//! production implementation.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::auth::CredentialStore;
use crate::error::ServiceError;

/// Device family, which decides the endpoint used to request a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraKind {
    Camera,
    Mini,
    Doorbell,
}

/// A camera as last reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraInfo {
    pub name: String,
    pub id: i64,
    pub network_id: i64,
    pub kind: CameraKind,
    /// Reference to the newest image the cloud holds for this camera
    pub thumbnail: Option<String>,
}

/// What to log in with.
#[derive(Debug, Clone)]
pub enum LoginSource {
    /// A credential blob previously produced by a successful login.
    /// Starting from stored credentials never prompts.
    Stored(Value),
    /// Fresh username/password login.
    Fresh { username: String, password: String },
}

/// Successful outcomes of [`CameraService::start`]. Any other failure is
/// the `Err` side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    SecondFactorRequired,
}

#[async_trait]
pub trait CameraService: Send + Sync {
    /// Log in and load the account's devices.
    async fn start(&mut self, source: LoginSource) -> Result<StartOutcome, ServiceError>;

    /// Submit a one-time code after [`StartOutcome::SecondFactorRequired`].
    /// Returns `Ok(false)` when the service rejects the code.
    async fn send_2fa_code(&mut self, code: &str) -> Result<bool, ServiceError>;

    /// Current credential blob, if logged in.
    fn credentials(&self) -> Option<Value>;

    /// Whether the account is logged in and its devices are loaded.
    fn available(&self) -> bool;

    /// Cameras in discovery order.
    fn cameras(&self) -> Vec<CameraInfo>;

    /// Reload device state. Implementations may skip a non-forced refresh.
    async fn refresh(&mut self, force: bool) -> Result<(), ServiceError>;

    /// Ask a camera to take a new picture. Returns once the request is
    /// acknowledged, not once the picture is uploaded.
    async fn snap_picture(&self, camera: &str) -> Result<(), ServiceError>;

    /// Download the camera's current image to `path`. Fails rather than
    /// overwrite an existing file.
    async fn image_to_file(&self, camera: &str, path: &Path) -> Result<(), ServiceError>;

    /// Persist the current credentials to `path`.
    fn save(&self, path: &Path) -> Result<()> {
        let credentials = self
            .credentials()
            .ok_or_else(|| anyhow::anyhow!("No credentials to save - not logged in"))?;
        CredentialStore::new(path).save(&credentials)
    }
}
