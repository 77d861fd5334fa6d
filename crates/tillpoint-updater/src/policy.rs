//! Update policy handed to the update client.
//!
//! The policy is applied to the client before every check. Changing it while a
//! check is running only affects the next one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UpdateError};

/// Default release feed for Tillpoint builds.
pub const DEFAULT_FEED_URL: &str =
    "https://github.com/tillpoint/tillpoint-pos/releases/latest/download/";

/// Feed path suffix that points at the newest release's assets.
const LATEST_DOWNLOAD_SUFFIX: &str = "/latest/download";

/// Update behaviour flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdatePolicy {
    /// Start downloading as soon as an update is found.
    pub auto_download: bool,
    /// Let the client install a downloaded update when the app quits.
    pub auto_install_on_quit: bool,
    /// Offer pre-release builds.
    pub allow_prerelease: bool,
    /// Offer builds older than the running one.
    pub allow_downgrade: bool,
    /// Require a valid code signature on downloaded artifacts.
    pub verify_signature: bool,
    /// Release feed location.
    pub feed_url: String,
    /// Force update checks in unpackaged development builds.
    pub dev_mode_override: bool,
    /// Extra headers sent with feed requests.
    pub request_headers: BTreeMap<String, String>,
    /// Release page opened when automatic installation is impossible.
    pub release_page: Option<String>,
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        Self {
            auto_download: true,
            auto_install_on_quit: true,
            allow_prerelease: false,
            allow_downgrade: false,
            verify_signature: true,
            feed_url: DEFAULT_FEED_URL.to_string(),
            dev_mode_override: false,
            request_headers: BTreeMap::new(),
            release_page: None,
        }
    }
}

impl UpdatePolicy {
    /// Sets the feed URL.
    pub fn with_feed_url(mut self, url: impl Into<String>) -> Self {
        self.feed_url = url.into();
        self
    }

    /// Sets whether updates download automatically.
    pub fn with_auto_download(mut self, enabled: bool) -> Self {
        self.auto_download = enabled;
        self
    }

    /// Sets the development-mode override.
    pub fn with_dev_mode_override(mut self, enabled: bool) -> Self {
        self.dev_mode_override = enabled;
        self
    }

    /// Sets an explicit release page.
    pub fn with_release_page(mut self, url: impl Into<String>) -> Self {
        self.release_page = Some(url.into());
        self
    }

    /// Adds a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request_headers.insert(name.into(), value.into());
        self
    }

    /// Checks that the policy can drive an update client.
    ///
    /// A feed URL is required unless the development override is on, in which
    /// case the client falls back to its dev update config.
    pub fn validate(&self) -> Result<()> {
        let feed = self.feed_url.trim();
        if feed.is_empty() {
            if self.dev_mode_override {
                return Ok(());
            }
            return Err(UpdateError::InvalidPolicy("feed URL is empty".into()));
        }
        if !(feed.starts_with("https://") || feed.starts_with("http://")) {
            return Err(UpdateError::InvalidPolicy(format!(
                "feed URL must be http(s): {feed}"
            )));
        }
        Ok(())
    }

    /// Returns the page users can download releases from by hand.
    ///
    /// `.../releases/latest/download/` becomes `.../releases`.
    pub fn release_page_url(&self) -> String {
        if let Some(page) = &self.release_page {
            return page.clone();
        }
        let feed = self.feed_url.trim().trim_end_matches('/');
        feed.strip_suffix(LATEST_DOWNLOAD_SUFFIX)
            .unwrap_or(feed)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy() {
        let policy = UpdatePolicy::default();
        assert!(policy.auto_download);
        assert!(policy.auto_install_on_quit);
        assert!(policy.verify_signature);
        assert!(!policy.allow_prerelease);
        assert!(!policy.allow_downgrade);
        assert!(!policy.dev_mode_override);
        assert_eq!(policy.feed_url, DEFAULT_FEED_URL);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn release_page_is_derived_from_feed() {
        let policy = UpdatePolicy::default();
        assert_eq!(
            policy.release_page_url(),
            "https://github.com/tillpoint/tillpoint-pos/releases"
        );
    }

    #[test]
    fn release_page_without_latest_suffix() {
        let policy = UpdatePolicy::default().with_feed_url("https://updates.example.com/pos/");
        assert_eq!(policy.release_page_url(), "https://updates.example.com/pos");
    }

    #[test]
    fn explicit_release_page_wins() {
        let policy = UpdatePolicy::default().with_release_page("https://example.com/download");
        assert_eq!(policy.release_page_url(), "https://example.com/download");
    }

    #[test]
    fn empty_feed_requires_dev_override() {
        let policy = UpdatePolicy::default().with_feed_url("");
        assert!(matches!(
            policy.validate(),
            Err(UpdateError::InvalidPolicy(_))
        ));

        let policy = policy.with_dev_mode_override(true);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn non_http_feed_is_rejected() {
        let policy = UpdatePolicy::default().with_feed_url("ftp://example.com/releases");
        assert!(policy.validate().is_err());
    }

    #[test]
    fn missing_fields_use_defaults() {
        let policy: UpdatePolicy = serde_json::from_str(r#"{"auto_download": false}"#).unwrap();
        assert!(!policy.auto_download);
        assert!(policy.verify_signature);
        assert_eq!(policy.feed_url, DEFAULT_FEED_URL);
    }

    #[test]
    fn headers_are_kept() {
        let policy = UpdatePolicy::default().with_header("Authorization", "token abc");
        assert_eq!(
            policy.request_headers.get("Authorization").map(String::as_str),
            Some("token abc")
        );
    }
}
