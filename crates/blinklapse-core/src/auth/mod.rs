//! Authentication against the camera service.
//!
//! This module provides:
//! - `Authenticator`: saved-session reuse, fresh login and the 2FA exchange
//! - `CredentialStore`: the JSON file holding the reusable credential blob
//! - `Prompter`: interactive input for username, password and 2FA code
//!
//! Credentials are re-saved after every successful login so the next run
//! can start without prompting.

pub mod authenticator;
pub mod credentials;
pub mod prompt;

pub use authenticator::{Authenticator, EnvCredentials};
pub use credentials::CredentialStore;
pub use prompt::{Prompter, TerminalPrompter};
