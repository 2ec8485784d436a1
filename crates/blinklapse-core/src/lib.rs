//! Core library for blink-lapse.
//!
//! Periodically triggers Blink cameras to take a still, waits for it to reach
//! the cloud, and saves it as `<frames_dir>/<camera>/<YYYYMMDD_HHMMSS>.jpg`
//! so the frames sort into a timelapse sequence.
//!
//! - `auth`: login with saved-session reuse and 2FA
//! - `blink`: Blink REST client
//! - `capture`: one frame from one camera
//! - `collector`: the capture loop
//! - `service`: the camera service trait the rest is written against

pub mod auth;
pub mod blink;
pub mod capture;
pub mod collector;
pub mod config;
pub mod error;
pub mod frames;
pub mod service;

#[cfg(test)]
mod fake;

pub use auth::{Authenticator, EnvCredentials, Prompter, TerminalPrompter};
pub use blink::BlinkClient;
pub use collector::{Collector, CollectorState, StopReason};
pub use config::CollectorConfig;
pub use error::{AuthError, ServiceError};
pub use service::{CameraInfo, CameraKind, CameraService, LoginSource, StartOutcome};
