//! The capture loop.
//!
//! A run authenticates once, resolves which cameras to capture, makes sure
//! every camera has an output directory, then captures one frame per camera
//! per cycle until it is stopped or, in single-shot mode, after one cycle.

use std::future::Future;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::auth::{Authenticator, EnvCredentials, Prompter};
use crate::capture::capture_frame;
use crate::config::CollectorConfig;
use crate::frames::ensure_camera_dir;
use crate::service::{CameraInfo, CameraService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Authenticating,
    Ready,
    Capturing,
    Waiting,
    Stopped,
}

/// Why a run ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The account did not report itself available after login
    Unavailable,
    /// The account has no cameras
    NoCameras,
    /// None of the requested camera names exist
    NoMatchingCameras,
    SingleShotComplete,
    Interrupted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub attempted: usize,
    pub captured: usize,
}

/// Names of the cameras to capture, in discovery order.
///
/// With a filter only discovered cameras whose name appears in it are kept.
pub fn resolve_cameras(discovered: &[CameraInfo], filter: Option<&[String]>) -> Vec<String> {
    discovered
        .iter()
        .filter(|camera| filter.map_or(true, |names| names.contains(&camera.name)))
        .map(|camera| camera.name.clone())
        .collect()
}

pub struct Collector<P> {
    config: CollectorConfig,
    authenticator: Authenticator<P>,
    state: CollectorState,
}

impl<P: Prompter> Collector<P> {
    pub fn new(config: CollectorConfig, env: EnvCredentials, prompter: P) -> Self {
        let authenticator = Authenticator::new(config.credentials_file.clone(), env, prompter);
        Self {
            config,
            authenticator,
            state: CollectorState::Authenticating,
        }
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    /// Like [`Collector::run`], but stops cleanly as soon as `shutdown`
    /// completes, whatever phase the run is in.
    pub async fn run_until<S, F, Fut>(&mut self, new_service: F, shutdown: Fut) -> Result<StopReason>
    where
        S: CameraService,
        F: FnMut() -> S,
        Fut: Future<Output = ()>,
    {
        let result = tokio::select! {
            result = self.run(new_service) => result,
            () = shutdown => {
                info!("Stopped by user.");
                Ok(StopReason::Interrupted)
            }
        };
        self.transition(CollectorState::Stopped);
        result
    }

    /// Authenticate, then capture until single-shot completion. Without
    /// single-shot mode this only returns on an early stop or an error.
    pub async fn run<S, F>(&mut self, new_service: F) -> Result<StopReason>
    where
        S: CameraService,
        F: FnMut() -> S,
    {
        self.transition(CollectorState::Authenticating);
        let mut service = self.authenticator.authenticate(new_service).await?;
        let mut saved = service.credentials();

        if !service.available() {
            error!("Blink system not available after authentication.");
            return Ok(self.stop(StopReason::Unavailable));
        }

        let discovered = service.cameras();
        if discovered.is_empty() {
            error!("No cameras found in your Blink account.");
            return Ok(self.stop(StopReason::NoCameras));
        }

        let available: Vec<&str> = discovered.iter().map(|c| c.name.as_str()).collect();
        info!(cameras = ?available, "Cameras found");

        let filter = self.config.camera_filter.as_deref();
        let cameras = resolve_cameras(&discovered, filter);
        if cameras.is_empty() {
            error!(available = ?available, "None of the specified cameras were found.");
            return Ok(self.stop(StopReason::NoMatchingCameras));
        }
        if let Some(names) = filter {
            for name in names.iter().filter(|n| !cameras.contains(*n)) {
                warn!(camera = %name, "Requested camera not found, skipping");
            }
        }

        let targets = cameras
            .into_iter()
            .map(|name| {
                let dir = ensure_camera_dir(&self.config.frames_dir, &name)
                    .with_context(|| format!("Failed to create output directory for '{}'", name))?;
                Ok((name, dir))
            })
            .collect::<Result<Vec<(String, PathBuf)>>>()?;

        self.transition(CollectorState::Ready);
        info!(
            cameras = targets.len(),
            interval_secs = self.config.interval.as_secs(),
            once = self.config.once,
            "Starting capture"
        );

        loop {
            let cycle_start = Instant::now();
            self.transition(CollectorState::Capturing);

            let summary = self.capture_cycle(&mut service, &targets).await;
            self.save_if_changed(&service, &mut saved);
            info!(
                captured = summary.captured,
                attempted = summary.attempted,
                "Capture cycle complete"
            );

            if self.config.once {
                return Ok(self.stop(StopReason::SingleShotComplete));
            }

            self.transition(CollectorState::Waiting);
            let next = cycle_start + self.config.interval;
            info!(
                "Next capture in {}s. Press Ctrl+C to stop.",
                next.saturating_duration_since(Instant::now()).as_secs()
            );
            tokio::time::sleep_until(next).await;
        }
    }

    async fn capture_cycle<S: CameraService>(
        &self,
        service: &mut S,
        targets: &[(String, PathBuf)],
    ) -> CycleSummary {
        if let Err(e) = service.refresh(true).await {
            warn!(error = %e, "Refresh failed, attempting captures anyway");
        }

        let mut summary = CycleSummary::default();
        for (name, dir) in targets {
            summary.attempted += 1;
            if capture_frame(service, name, dir, self.config.settle_delay).await {
                summary.captured += 1;
            }
        }
        summary
    }

    /// Re-save the credentials when the service's session changed since the
    /// last save, as it does after a re-login inside a refresh.
    fn save_if_changed<S: CameraService>(&self, service: &S, saved: &mut Option<Value>) {
        let current = service.credentials();
        if current.is_none() || current == *saved {
            return;
        }
        match service.save(&self.config.credentials_file) {
            Ok(()) => {
                debug!("Session renewed, credentials saved");
                *saved = current;
            }
            Err(e) => warn!(error = %format!("{:#}", e), "Failed to save renewed credentials"),
        }
    }

    fn transition(&mut self, next: CollectorState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "Collector state");
            self.state = next;
        }
    }

    fn stop(&mut self, reason: StopReason) -> StopReason {
        self.transition(CollectorState::Stopped);
        reason
    }
}
