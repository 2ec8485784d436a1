//! Client for the Blink REST API.
//!
//! This module provides the `BlinkClient` struct, the production
//! implementation of [`CameraService`].

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{header, Client, Method, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::ServiceError;
use crate::service::{CameraInfo, CameraKind, CameraService, LoginSource, StartOutcome};

use super::models::{Homescreen, LoginData, LoginResponse, PinVerifyResponse};

// ============================================================================
// Constants
// ============================================================================

/// Login is served from the shared host; everything else from the
/// account's regional tier.
const LOGIN_URL: &str = "https://rest-prod.immedia-semi.com/api/v5/account/login";

/// Name this client registers under in the Blink app's device list
const CLIENT_NAME: &str = "blink-lapse";

const USER_AGENT: &str = concat!("blink-lapse/", env!("CARGO_PKG_VERSION"));

/// Header carrying the session token (`TOKEN_AUTH`; header names are
/// case-insensitive and must be given lowercase here)
const TOKEN_HEADER: &str = "token_auth";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Minimum seconds between non-forced homescreen refreshes.
const DEFAULT_REFRESH_RATE_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Blink client holding one account session.
pub struct BlinkClient {
    client: Client,
    login: Option<LoginData>,
    cameras: Vec<CameraInfo>,
    loaded: bool,
    last_refresh: Option<Instant>,
    refresh_rate: Duration,
}

impl BlinkClient {
    pub fn new() -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self::with_http(client))
    }

    fn with_http(client: Client) -> Self {
        Self {
            client,
            login: None,
            cameras: Vec::new(),
            loaded: false,
            last_refresh: None,
            refresh_rate: Duration::from_secs(DEFAULT_REFRESH_RATE_SECS),
        }
    }

    /// A logged-out client sharing this one's connection pool.
    pub fn fresh(&self) -> Self {
        Self::with_http(self.client.clone()).with_refresh_rate(self.refresh_rate)
    }

    pub fn with_refresh_rate(mut self, refresh_rate: Duration) -> Self {
        self.refresh_rate = refresh_rate;
        self
    }

    fn session(&self) -> Result<&LoginData, ServiceError> {
        self.login
            .as_ref()
            .filter(|l| l.has_session())
            .ok_or(ServiceError::NotAuthenticated)
    }

    fn base_url(&self) -> Result<String, ServiceError> {
        let tier = self
            .session()?
            .tier
            .as_deref()
            .ok_or(ServiceError::NotAuthenticated)?;
        Ok(tier_url(tier))
    }

    fn account_id(&self) -> Result<i64, ServiceError> {
        self.session()?.account_id.ok_or(ServiceError::NotAuthenticated)
    }

    fn camera(&self, name: &str) -> Result<&CameraInfo, ServiceError> {
        self.cameras
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| ServiceError::UnknownCamera(name.to_string()))
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ServiceError> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = self.login.as_ref().and_then(|l| l.token.as_deref()) {
            let value = header::HeaderValue::from_str(token)
                .map_err(|e| ServiceError::InvalidCredentials(e.to_string()))?;
            headers.insert(TOKEN_HEADER, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(response: Response) -> Result<Option<Response>, ServiceError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ServiceError::from_status(status, &body))
        }
    }

    async fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Response, ServiceError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut request = self
                .client
                .request(method.clone(), url)
                .headers(self.auth_headers()?);
            if let Some(body) = body {
                request = request.json(body);
            }
            let response = request.send().await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => return Ok(response),
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ServiceError::RateLimited);
                    }
                    warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }

    async fn parse<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, ServiceError> {
        response
            .json()
            .await
            .map_err(|e| ServiceError::InvalidResponse(format!("Failed to parse {}: {}", what, e)))
    }

    async fn login_request(&mut self, mut data: LoginData) -> Result<StartOutcome, ServiceError> {
        let body = json!({
            "email": data.username,
            "password": data.password,
            "unique_id": data.uid,
            "device_identifier": CLIENT_NAME,
            "client_name": CLIENT_NAME,
            "reauth": true,
        });

        // Login must not carry a stale token
        self.login = None;
        self.loaded = false;
        let response = self.send(Method::POST, LOGIN_URL, Some(&body)).await?;
        let auth: LoginResponse = Self::parse(response, "login response").await?;

        data.apply(&auth);
        debug!(tier = %auth.account.tier, account_id = auth.account.account_id, "Logged in");
        self.login = Some(data);

        if auth.account.client_verification_required {
            return Ok(StartOutcome::SecondFactorRequired);
        }

        self.load_homescreen().await?;
        Ok(StartOutcome::Started)
    }

    async fn relogin(&mut self) -> Result<StartOutcome, ServiceError> {
        let data = self.login.clone().ok_or(ServiceError::NotAuthenticated)?;
        self.login_request(data).await
    }

    async fn load_homescreen(&mut self) -> Result<(), ServiceError> {
        let url = format!(
            "{}/api/v3/accounts/{}/homescreen",
            self.base_url()?,
            self.account_id()?
        );
        let response = self.send(Method::GET, &url, None).await?;
        let homescreen: Homescreen = Self::parse(response, "homescreen").await?;

        self.cameras = homescreen.into_cameras();
        self.loaded = true;
        self.last_refresh = Some(Instant::now());
        debug!(cameras = self.cameras.len(), "Homescreen loaded");
        Ok(())
    }
}

#[async_trait]
impl CameraService for BlinkClient {
    async fn start(&mut self, source: LoginSource) -> Result<StartOutcome, ServiceError> {
        match source {
            LoginSource::Fresh { username, password } => {
                self.login_request(LoginData::new(username, password)).await
            }
            LoginSource::Stored(value) => {
                let data: LoginData = serde_json::from_value(value)
                    .map_err(|e| ServiceError::InvalidCredentials(e.to_string()))?;

                if !data.has_session() {
                    return self.login_request(data).await;
                }

                self.login = Some(data);
                match self.load_homescreen().await {
                    Ok(()) => Ok(StartOutcome::Started),
                    Err(ServiceError::Unauthorized) => {
                        debug!("Stored token expired, logging in again");
                        self.relogin().await
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    async fn send_2fa_code(&mut self, code: &str) -> Result<bool, ServiceError> {
        let client_id = self
            .session()?
            .client_id
            .ok_or(ServiceError::NotAuthenticated)?;
        let url = format!(
            "{}/api/v4/account/{}/client/{}/pin/verify",
            self.base_url()?,
            self.account_id()?,
            client_id
        );

        let response = match self.send(Method::POST, &url, Some(&json!({ "pin": code }))).await {
            Ok(response) => response,
            Err(ServiceError::Unauthorized | ServiceError::AccessDenied(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        let verify: PinVerifyResponse = Self::parse(response, "pin verification").await?;
        if !verify.valid {
            warn!(message = ?verify.message, "Blink rejected the 2FA pin");
            return Ok(false);
        }

        self.load_homescreen().await?;
        Ok(true)
    }

    fn credentials(&self) -> Option<Value> {
        let login = self.login.as_ref().filter(|l| l.has_session())?;
        serde_json::to_value(login).ok()
    }

    fn available(&self) -> bool {
        self.loaded && self.session().is_ok()
    }

    fn cameras(&self) -> Vec<CameraInfo> {
        self.cameras.clone()
    }

    async fn refresh(&mut self, force: bool) -> Result<(), ServiceError> {
        if !force {
            if let Some(last) = self.last_refresh {
                if last.elapsed() < self.refresh_rate {
                    debug!("Skipping refresh, last one was recent");
                    return Ok(());
                }
            }
        }

        match self.load_homescreen().await {
            Err(ServiceError::Unauthorized) => {
                warn!("Session token rejected, logging in again");
                match self.relogin().await? {
                    StartOutcome::Started => Ok(()),
                    // Cannot prompt mid-run; the next start will handle it
                    StartOutcome::SecondFactorRequired => Err(ServiceError::Unauthorized),
                }
            }
            other => other,
        }
    }

    async fn snap_picture(&self, camera: &str) -> Result<(), ServiceError> {
        let device = self.camera(camera)?;
        let base = self.base_url()?;
        let account_id = self.account_id()?;
        let url = match device.kind {
            CameraKind::Camera => format!(
                "{}/network/{}/camera/{}/thumbnail",
                base, device.network_id, device.id
            ),
            CameraKind::Mini => format!(
                "{}/api/v1/accounts/{}/networks/{}/owls/{}/thumbnail",
                base, account_id, device.network_id, device.id
            ),
            CameraKind::Doorbell => format!(
                "{}/api/v1/accounts/{}/networks/{}/doorbells/{}/thumbnail",
                base, account_id, device.network_id, device.id
            ),
        };

        self.send(Method::POST, &url, Some(&json!({}))).await?;
        debug!(camera = %camera, "Snapshot requested");
        Ok(())
    }

    async fn image_to_file(&self, camera: &str, path: &Path) -> Result<(), ServiceError> {
        let device = self.camera(camera)?;
        let thumbnail = device
            .thumbnail
            .as_deref()
            .ok_or_else(|| ServiceError::NoImage(camera.to_string()))?;
        let url = thumbnail_url(&self.base_url()?, thumbnail);

        let bytes = self.send(Method::GET, &url, None).await?.bytes().await?;

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        debug!(camera = %camera, bytes = bytes.len(), "Image downloaded");
        Ok(())
    }
}

fn tier_url(tier: &str) -> String {
    format!("https://rest-{}.immedia-semi.com", tier)
}

/// Full download URL for a thumbnail reference. Older references are bare
/// paths that need the `.jpg` suffix; newer ones carry a query string and are
/// used as-is.
fn thumbnail_url(base: &str, thumbnail: &str) -> String {
    let mut url = if thumbnail.starts_with("https://") {
        thumbnail.to_string()
    } else {
        format!("{}{}", base, thumbnail)
    };
    if !url.contains('?') && !url.ends_with(".jpg") {
        url.push_str(".jpg");
    }
    url
}
