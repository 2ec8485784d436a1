//! Scripted in-memory camera service and prompter for tests.

use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::auth::Prompter;
use crate::error::ServiceError;
use crate::service::{CameraInfo, CameraKind, CameraService, LoginSource, StartOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Start {
    Started,
    SecondFactor,
    Fail,
}

#[derive(Debug, Clone)]
pub struct Script {
    pub stored: Start,
    pub fresh: Start,
    pub valid_code: String,
    pub available: bool,
    pub cameras: Vec<String>,
    /// Cameras whose download produces an empty file
    pub empty_images: HashSet<String>,
    /// Cameras whose download produces no file at all
    pub missing_images: HashSet<String>,
    /// Cameras whose snapshot request errors
    pub failing_snaps: HashSet<String>,
    /// Every refresh renews the session token
    pub relogin_on_refresh: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            stored: Start::Started,
            fresh: Start::Started,
            valid_code: "123456".to_string(),
            available: true,
            cameras: vec!["front".to_string(), "back".to_string()],
            empty_images: HashSet::new(),
            missing_images: HashSet::new(),
            failing_snaps: HashSet::new(),
            relogin_on_refresh: false,
        }
    }
}

/// Everything the fakes observed, shared across service instances.
#[derive(Debug, Default)]
pub struct Calls {
    pub starts: Vec<&'static str>,
    pub codes: Vec<String>,
    pub refreshes: usize,
    pub snaps: Vec<String>,
    pub downloads: Vec<PathBuf>,
    pub username_prompts: usize,
    pub password_prompts: usize,
    pub code_prompts: usize,
    logins: usize,
}

#[derive(Clone, Default)]
pub struct Harness {
    pub script: Arc<Script>,
    pub calls: Arc<Mutex<Calls>>,
}

impl Harness {
    pub fn new(script: Script) -> Self {
        Self {
            script: Arc::new(script),
            calls: Arc::default(),
        }
    }

    pub fn service(&self) -> FakeService {
        FakeService {
            script: self.script.clone(),
            calls: self.calls.clone(),
            credentials: None,
            pending: None,
        }
    }

    pub fn factory(&self) -> impl FnMut() -> FakeService + '_ {
        move || self.service()
    }

    pub fn prompter(&self, code: &str) -> FakePrompter {
        FakePrompter {
            code: code.to_string(),
            calls: self.calls.clone(),
        }
    }

    pub fn calls(&self) -> std::sync::MutexGuard<'_, Calls> {
        self.calls.lock().unwrap()
    }
}

pub struct FakeService {
    script: Arc<Script>,
    calls: Arc<Mutex<Calls>>,
    credentials: Option<Value>,
    pending: Option<String>,
}

impl FakeService {
    fn issue(&self, username: &str) -> Value {
        let mut calls = self.calls.lock().unwrap();
        calls.logins += 1;
        json!({"username": username, "token": format!("token-{}", calls.logins)})
    }

    fn outcome(&mut self, start: Start, username: String) -> Result<StartOutcome, ServiceError> {
        match start {
            Start::Started => {
                self.credentials = Some(self.issue(&username));
                Ok(StartOutcome::Started)
            }
            Start::SecondFactor => {
                self.pending = Some(username);
                Ok(StartOutcome::SecondFactorRequired)
            }
            Start::Fail => Err(ServiceError::Unauthorized),
        }
    }
}

#[async_trait]
impl CameraService for FakeService {
    async fn start(&mut self, source: LoginSource) -> Result<StartOutcome, ServiceError> {
        match source {
            LoginSource::Stored(value) => {
                self.calls.lock().unwrap().starts.push("stored");
                let username = value["username"]
                    .as_str()
                    .ok_or_else(|| ServiceError::InvalidCredentials("no username".into()))?
                    .to_string();
                self.outcome(self.script.stored, username)
            }
            LoginSource::Fresh { username, .. } => {
                self.calls.lock().unwrap().starts.push("fresh");
                self.outcome(self.script.fresh, username)
            }
        }
    }

    async fn send_2fa_code(&mut self, code: &str) -> Result<bool, ServiceError> {
        self.calls.lock().unwrap().codes.push(code.to_string());
        let username = self.pending.take().ok_or(ServiceError::NotAuthenticated)?;
        if code == self.script.valid_code {
            self.credentials = Some(self.issue(&username));
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn credentials(&self) -> Option<Value> {
        self.credentials.clone()
    }

    fn available(&self) -> bool {
        self.script.available && self.credentials.is_some()
    }

    fn cameras(&self) -> Vec<CameraInfo> {
        self.script
            .cameras
            .iter()
            .enumerate()
            .map(|(i, name)| CameraInfo {
                name: name.clone(),
                id: i as i64 + 1,
                network_id: 1,
                kind: CameraKind::Camera,
                thumbnail: Some(format!("/media/{}", name)),
            })
            .collect()
    }

    async fn refresh(&mut self, _force: bool) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().refreshes += 1;
        if self.script.relogin_on_refresh {
            let username = self
                .credentials
                .as_ref()
                .and_then(|c| c["username"].as_str())
                .ok_or(ServiceError::NotAuthenticated)?
                .to_string();
            self.credentials = Some(self.issue(&username));
        }
        Ok(())
    }

    async fn snap_picture(&self, camera: &str) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().snaps.push(camera.to_string());
        if self.script.failing_snaps.contains(camera) {
            return Err(ServiceError::ServerError("camera offline".into()));
        }
        Ok(())
    }

    async fn image_to_file(&self, camera: &str, path: &Path) -> Result<(), ServiceError> {
        self.calls.lock().unwrap().downloads.push(path.to_path_buf());
        if self.script.missing_images.contains(camera) {
            return Ok(());
        }
        let bytes: &[u8] = if self.script.empty_images.contains(camera) {
            b""
        } else {
            b"\xff\xd8\xff\xe0jpeg"
        };
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)?;
        file.write_all(bytes)?;
        Ok(())
    }
}

pub struct FakePrompter {
    code: String,
    calls: Arc<Mutex<Calls>>,
}

#[async_trait]
impl Prompter for FakePrompter {
    async fn username(&self) -> io::Result<String> {
        self.calls.lock().unwrap().username_prompts += 1;
        Ok("prompted@example.com".to_string())
    }

    async fn password(&self) -> io::Result<String> {
        self.calls.lock().unwrap().password_prompts += 1;
        Ok("hunter2".to_string())
    }

    async fn two_factor_code(&self) -> io::Result<String> {
        self.calls.lock().unwrap().code_prompts += 1;
        Ok(self.code.clone())
    }
}
