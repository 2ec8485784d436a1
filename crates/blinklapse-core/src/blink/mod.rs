//! Blink cloud client.
//!
//! `BlinkClient` implements [`crate::service::CameraService`] over the Blink
//! REST API. Requests authenticate with the token returned at login, which is
//! kept with the rest of the session in the persisted `LoginData` blob.

pub mod client;
pub mod models;

pub use client::BlinkClient;
pub use models::LoginData;
