//! Steam community web session
//!
//! Offer actions on the community site authenticate with the browser
//! session cookies, not the Web API key. The cookie values are secrets:
//! they are never logged, only a short SHA-256 fingerprint is.

use sha2::{Digest, Sha256};
use std::fmt;

use crate::common::errors::{ClientError, Result};
use crate::config::types::SteamConfig;

/// Cookies of a logged-in community session
#[derive(Clone)]
pub struct CommunitySession {
    session_id: String,
    login_secure: String,
}

impl CommunitySession {
    pub fn new(session_id: impl Into<String>, login_secure: impl Into<String>) -> Result<Self> {
        let session_id = session_id.into();
        let login_secure = login_secure.into();
        if session_id.trim().is_empty() || login_secure.trim().is_empty() {
            return Err(ClientError::Authentication(
                "session cookies must not be empty".into(),
            ));
        }
        Ok(Self {
            session_id,
            login_secure,
        })
    }

    /// Session from config, `None` when the cookies are not configured
    pub fn from_config(config: &SteamConfig) -> Option<Self> {
        match (&config.session_id, &config.login_secure) {
            (Some(id), Some(secure)) => Self::new(id.clone(), secure.clone()).ok(),
            _ => None,
        }
    }

    /// Value posted as the `sessionid` form field
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// `Cookie` header value
    pub fn cookie_header(&self) -> String {
        format!(
            "sessionid={}; steamLoginSecure={}",
            self.session_id, self.login_secure
        )
    }

    /// Short stable identifier of the session, safe to log
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.session_id.as_bytes());
        hasher.update(b":");
        hasher.update(self.login_secure.as_bytes());
        let digest = hex::encode(hasher.finalize());
        digest[..12].to_string()
    }
}

impl fmt::Debug for CommunitySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommunitySession")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}
