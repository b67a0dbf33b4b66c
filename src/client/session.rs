use std::fmt;

use crate::config::AppConfig;

/// Credentials for one buyer session, passed explicitly to the HTTP client.
#[derive(Clone, Default)]
pub struct Session {
    access_token: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            access_token: Some(token).filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        match &config.api_token {
            Some(token) => Self::bearer(token.clone()),
            None => Self::anonymous(),
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
