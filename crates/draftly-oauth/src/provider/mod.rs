//! Identity provider endpoints.

use crate::error::{Error, Result};
use url::Url;

/// Google's token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// An identity provider that can exchange refresh tokens.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Display name, for logs.
    pub name: String,
    /// Token endpoint.
    pub token_url: Url,
}

impl Provider {
    /// A provider with a custom token endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if `token_url` does not parse.
    pub fn new(name: impl Into<String>, token_url: &str) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            token_url: Url::parse(token_url)?,
        })
    }

    /// Google, which issues the Gmail send and read grants.
    ///
    /// # Errors
    ///
    /// Returns an error if URL parsing fails.
    pub fn google() -> Result<Self> {
        Self::new("Google", GOOGLE_TOKEN_URL)
    }

    /// Refuse plain-HTTP token endpoints other than `localhost`, since the
    /// refresh token travels in the request body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for an insecure endpoint.
    pub fn validate(&self) -> Result<()> {
        let local = self.token_url.host_str() == Some("localhost");
        if self.token_url.scheme() != "https" && !local {
            return Err(Error::InvalidConfig(format!(
                "{} token endpoint must use https: {}",
                self.name, self.token_url
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_google_endpoint() {
        let provider = Provider::google().unwrap();
        assert_eq!(provider.token_url.host_str(), Some("oauth2.googleapis.com"));
        provider.validate().unwrap();
    }

    #[test]
    fn test_plain_http_only_on_localhost() {
        let remote = Provider::new("Remote", "http://auth.example.com/token").unwrap();
        let err = remote.validate().unwrap_err();
        assert!(err.to_string().contains("Remote token endpoint must use https"));

        Provider::new("Local", "http://localhost:8080/token")
            .unwrap()
            .validate()
            .unwrap();
    }

    #[test]
    fn test_unparseable_endpoint() {
        assert!(Provider::new("Broken", "not a url").is_err());
    }
}
