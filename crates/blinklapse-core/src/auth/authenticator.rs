use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::error::AuthError;
use crate::service::{CameraService, LoginSource, StartOutcome};

use super::{CredentialStore, Prompter};

/// Username/password supplied through configuration instead of prompts.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl EnvCredentials {
    /// Empty values count as unset.
    pub fn new(username: Option<String>, password: Option<String>) -> Self {
        Self {
            username: username.filter(|u| !u.is_empty()),
            password: password.filter(|p| !p.is_empty()),
        }
    }
}

/// Logs in to the camera service, reusing saved credentials when they
/// still work, and saves the credentials after every successful login.
pub struct Authenticator<P> {
    store: CredentialStore,
    env: EnvCredentials,
    prompter: P,
}

impl<P: Prompter> Authenticator<P> {
    pub fn new(credentials_file: impl Into<PathBuf>, env: EnvCredentials, prompter: P) -> Self {
        Self {
            store: CredentialStore::new(credentials_file),
            env,
            prompter,
        }
    }

    /// Return a logged-in service built by `new_service`.
    ///
    /// Saved credentials are tried first. If they fail for any reason other
    /// than a 2FA challenge, a fresh login is done on a new service instance
    /// and the saved file is left in place until it is overwritten.
    pub async fn authenticate<S, F>(&self, mut new_service: F) -> Result<S, AuthError>
    where
        S: CameraService,
        F: FnMut() -> S,
    {
        if let Some(service) = self.try_saved(&mut new_service).await? {
            return Ok(service);
        }

        let username = match self.env.username {
            Some(ref username) => username.clone(),
            None => self.prompter.username().await?,
        };
        let password = match self.env.password {
            Some(ref password) => password.clone(),
            None => self.prompter.password().await?,
        };

        let mut service = new_service();
        match service.start(LoginSource::Fresh { username, password }).await {
            Ok(StartOutcome::Started) => {}
            Ok(StartOutcome::SecondFactorRequired) => self.two_factor(&mut service).await?,
            Err(e) => return Err(AuthError::LoginFailed(e)),
        }

        self.persist(&service)?;
        info!(path = %self.store.path().display(), "Credentials saved");
        Ok(service)
    }

    async fn try_saved<S, F>(&self, new_service: &mut F) -> Result<Option<S>, AuthError>
    where
        S: CameraService,
        F: FnMut() -> S,
    {
        let saved = match self.store.load() {
            Ok(Some(saved)) => saved,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!("Saved credentials unreadable ({:#}), falling back to login.", e);
                return Ok(None);
            }
        };

        info!(path = %self.store.path().display(), "Loading saved credentials");
        let mut service = new_service();
        match service.start(LoginSource::Stored(saved)).await {
            Ok(StartOutcome::Started) => {}
            Ok(StartOutcome::SecondFactorRequired) => self.two_factor(&mut service).await?,
            Err(e) => {
                warn!(error = %e, "Saved credentials failed, falling back to login.");
                return Ok(None);
            }
        }

        // Refresh the file so long-lived tokens do not go stale between runs
        self.persist(&service)?;
        Ok(Some(service))
    }

    async fn two_factor<S: CameraService>(&self, service: &mut S) -> Result<(), AuthError> {
        let code = self.prompter.two_factor_code().await?;
        match service.send_2fa_code(code.trim()).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                error!("2FA verification failed.");
                Err(AuthError::SecondFactorRejected)
            }
            Err(e) => Err(AuthError::SecondFactorFailed(e)),
        }
    }

    fn persist<S: CameraService>(&self, service: &S) -> Result<(), AuthError> {
        service.save(self.store.path()).map_err(AuthError::Persist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{Harness, Script, Start};
    use serde_json::json;
    use tempfile::tempdir;

    fn env() -> EnvCredentials {
        EnvCredentials::new(Some("env@example.com".into()), Some("secret".into()))
    }

    #[tokio::test]
    async fn test_fresh_login_saves_credentials() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".credentials.json");
        let harness = Harness::new(Script::default());
        let auth = Authenticator::new(&path, env(), harness.prompter("000000"));

        let service = auth.authenticate(harness.factory()).await.unwrap();

        assert!(service.available());
        let saved = CredentialStore::new(&path).load().unwrap().unwrap();
        assert_eq!(saved["username"], "env@example.com");
        let calls = harness.calls();
        assert_eq!(calls.starts, vec!["fresh"]);
        assert_eq!(calls.username_prompts, 0);
        assert_eq!(calls.password_prompts, 0);
    }

    #[tokio::test]
    async fn test_missing_env_credentials_prompt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".credentials.json");
        let harness = Harness::new(Script::default());
        let env = EnvCredentials::new(Some(String::new()), None);
        let auth = Authenticator::new(&path, env, harness.prompter("000000"));

        auth.authenticate(harness.factory()).await.unwrap();

        let saved = CredentialStore::new(&path).load().unwrap().unwrap();
        assert_eq!(saved["username"], "prompted@example.com");
        let calls = harness.calls();
        assert_eq!(calls.username_prompts, 1);
        assert_eq!(calls.password_prompts, 1);
    }

    #[tokio::test]
    async fn test_saved_credentials_are_refreshed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".credentials.json");
        let harness = Harness::new(Script::default());
        let auth = Authenticator::new(&path, env(), harness.prompter("000000"));

        auth.authenticate(harness.factory()).await.unwrap();
        let first = CredentialStore::new(&path).load().unwrap().unwrap();

        // Second run reuses the file and writes back a refreshed blob
        let service = auth.authenticate(harness.factory()).await.unwrap();
        let second = CredentialStore::new(&path).load().unwrap().unwrap();

        assert!(service.available());
        assert_ne!(first["token"], second["token"]);
        assert_eq!(harness.calls().starts, vec!["fresh", "stored"]);

        // And the refreshed file is usable again
        auth.authenticate(harness.factory()).await.unwrap();
        assert_eq!(harness.calls().starts, vec!["fresh", "stored", "stored"]);
    }

    #[tokio::test]
    async fn test_failed_saved_credentials_fall_back_to_login() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".credentials.json");
        CredentialStore::new(&path)
            .save(&json!({"username": "stale@example.com", "token": "old"}))
            .unwrap();
        let harness = Harness::new(Script {
            stored: Start::Fail,
            ..Script::default()
        });
        let auth = Authenticator::new(&path, env(), harness.prompter("000000"));

        let service = auth.authenticate(harness.factory()).await.unwrap();

        assert!(service.available());
        assert_eq!(harness.calls().starts, vec!["stored", "fresh"]);
        let saved = CredentialStore::new(&path).load().unwrap().unwrap();
        assert_eq!(saved["username"], "env@example.com");
    }

    #[tokio::test]
    async fn test_unparsable_saved_credentials_fall_back_to_login() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".credentials.json");
        std::fs::write(&path, "{ truncated").unwrap();
        let harness = Harness::new(Script::default());
        let auth = Authenticator::new(&path, env(), harness.prompter("000000"));

        auth.authenticate(harness.factory()).await.unwrap();

        assert_eq!(harness.calls().starts, vec!["fresh"]);
        assert!(CredentialStore::new(&path).load().is_ok());
    }

    #[tokio::test]
    async fn test_saved_credentials_second_factor_accepted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".credentials.json");
        CredentialStore::new(&path)
            .save(&json!({"username": "me@example.com", "token": "old"}))
            .unwrap();
        let harness = Harness::new(Script {
            stored: Start::SecondFactor,
            ..Script::default()
        });
        let auth = Authenticator::new(&path, env(), harness.prompter("123456"));

        let service = auth.authenticate(harness.factory()).await.unwrap();

        assert!(service.available());
        let calls = harness.calls();
        assert_eq!(calls.code_prompts, 1);
        assert_eq!(calls.codes, vec!["123456"]);
        assert_eq!(calls.starts, vec!["stored"]);
        drop(calls);
        let saved = CredentialStore::new(&path).load().unwrap().unwrap();
        assert_ne!(saved["token"], "old");
    }

    #[tokio::test]
    async fn test_rejected_second_factor_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".credentials.json");
        let stale = json!({"username": "me@example.com", "token": "old"});
        CredentialStore::new(&path).save(&stale).unwrap();
        let harness = Harness::new(Script {
            stored: Start::SecondFactor,
            ..Script::default()
        });
        let auth = Authenticator::new(&path, env(), harness.prompter("999999"));

        let result = auth.authenticate(harness.factory()).await;

        assert!(matches!(result, Err(AuthError::SecondFactorRejected)));
        let calls = harness.calls();
        assert_eq!(calls.code_prompts, 1);
        // No fallback login after a rejected code
        assert_eq!(calls.starts, vec!["stored"]);
        drop(calls);
        assert_eq!(CredentialStore::new(&path).load().unwrap(), Some(stale));
    }

    #[tokio::test]
    async fn test_fresh_login_second_factor() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".credentials.json");
        let harness = Harness::new(Script {
            fresh: Start::SecondFactor,
            ..Script::default()
        });
        let auth = Authenticator::new(&path, env(), harness.prompter(" 123456\n"));

        auth.authenticate(harness.factory()).await.unwrap();

        assert_eq!(harness.calls().codes, vec!["123456"]);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_fresh_login_failure_saves_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".credentials.json");
        let harness = Harness::new(Script {
            fresh: Start::Fail,
            ..Script::default()
        });
        let auth = Authenticator::new(&path, env(), harness.prompter("000000"));

        let result = auth.authenticate(harness.factory()).await;

        assert!(matches!(result, Err(AuthError::LoginFailed(_))));
        assert!(!path.exists());
    }
}
