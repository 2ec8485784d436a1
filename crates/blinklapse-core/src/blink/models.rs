use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::service::{CameraInfo, CameraKind};

/// Prefix of the per-install identifier sent at login
const UID_PREFIX: &str = "BlinkLapse_";

/// Credential blob persisted between runs.
///
/// Keeping the password and the install `uid` lets an expired token be
/// replaced without prompting; reusing the `uid` keeps Blink from asking for
/// a new 2FA pin on every login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginData {
    pub username: String,
    pub password: String,
    pub uid: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub account_id: Option<i64>,
    #[serde(default)]
    pub client_id: Option<i64>,
    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,
}

impl LoginData {
    pub fn new(username: String, password: String) -> Self {
        Self {
            username,
            password,
            uid: generate_uid(),
            token: None,
            tier: None,
            account_id: None,
            client_id: None,
            issued_at: None,
        }
    }

    /// True once a login has filled in the token and account routing
    pub fn has_session(&self) -> bool {
        self.token.is_some() && self.tier.is_some() && self.account_id.is_some()
    }

    pub fn apply(&mut self, response: &LoginResponse) {
        self.token = Some(response.auth.token.clone());
        self.tier = Some(response.account.tier.clone());
        self.account_id = Some(response.account.account_id);
        self.client_id = Some(response.account.client_id);
        self.issued_at = Some(Utc::now());
    }
}

fn generate_uid() -> String {
    let n: u128 = rand::thread_rng().gen();
    format!("{}{:032x}", UID_PREFIX, n)
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub account: LoginAccount,
    pub auth: LoginAuth,
}

#[derive(Debug, Deserialize)]
pub struct LoginAccount {
    pub account_id: i64,
    pub client_id: i64,
    pub tier: String,
    #[serde(default)]
    pub client_verification_required: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginAuth {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct PinVerifyResponse {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Devices on the account, as returned by the homescreen endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct Homescreen {
    #[serde(default)]
    pub cameras: Vec<Device>,
    /// Blink Mini cameras
    #[serde(default)]
    pub owls: Vec<Device>,
    #[serde(default)]
    pub doorbells: Vec<Device>,
}

#[derive(Debug, Deserialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub network_id: i64,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl Homescreen {
    /// Flatten every device family into one list: cameras, then Minis, then
    /// doorbells, each in the order Blink returned them.
    pub fn into_cameras(self) -> Vec<CameraInfo> {
        let tagged = self
            .cameras
            .into_iter()
            .map(|d| (d, CameraKind::Camera))
            .chain(self.owls.into_iter().map(|d| (d, CameraKind::Mini)))
            .chain(self.doorbells.into_iter().map(|d| (d, CameraKind::Doorbell)));

        tagged
            .map(|(device, kind)| CameraInfo {
                name: device.name,
                id: device.id,
                network_id: device.network_id,
                kind,
                thumbnail: device.thumbnail.filter(|t| !t.is_empty()),
            })
            .collect()
    }
}
