//! Profile-page avatar enrichment
//!
//! Every distinct sender gets one HTTP GET against the public profile page
//! host. Fetches run strictly one at a time, each awaited to completion,
//! as a politeness constraint toward the remote host. Any failure along
//! the way (network, timeout, missing Open Graph markers) degrades to "no
//! avatar found"; enrichment never aborts the run.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use tracing::{info, warn};

/// Marker stored when no avatar could be resolved for a sender.
pub const NO_AVATAR: &str = "0";

const PROFILE_HOST: &str = "https://t.me";
const FETCH_TIMEOUT_SECS: u64 = 30;

/// Username to image-URL cache, populated once per run.
pub type AvatarLookup = HashMap<String, String>;

/// HTTP client for profile-page scraping.
pub struct AvatarClient {
    http: Client,
    base_url: String,
}

impl Default for AvatarClient {
    fn default() -> Self {
        Self::new()
    }
}

impl AvatarClient {
    pub fn new() -> Self {
        Self::with_base_url(PROFILE_HOST)
    }

    /// Point the client at a different host (used by tests).
    pub fn with_base_url(base_url: &str) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .user_agent("DigestImporter/0.1")
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the profile page for one username and extract its image URL.
    pub async fn fetch_avatar(&self, username: &str) -> Option<String> {
        let url = format!("{}/{}", self.base_url, username);
        let response = match self.http.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Avatar fetch for @{} failed: {}", username, e);
                return None;
            }
        };
        if !response.status().is_success() {
            warn!(
                "Avatar fetch for @{} returned HTTP {}",
                username,
                response.status()
            );
            return None;
        }
        let page = match response.text().await {
            Ok(page) => page,
            Err(e) => {
                warn!("Avatar fetch for @{} body read failed: {}", username, e);
                return None;
            }
        };
        cut_image_link(&page)
    }

    /// Resolve avatars for every username, sequentially and in order.
    ///
    /// The resulting lookup holds exactly one entry per username, with
    /// [`NO_AVATAR`] standing in wherever no image URL was found.
    pub async fn resolve_all(&self, usernames: &[String]) -> AvatarLookup {
        let mut lookup = AvatarLookup::new();
        for username in usernames {
            info!("Getting avatar for @{} user...", username);
            let avatar = self
                .fetch_avatar(username)
                .await
                .unwrap_or_else(|| NO_AVATAR.to_string());
            lookup.insert(username.clone(), avatar);
        }
        lookup
    }
}

/// Extract the og:image URL from a profile page.
///
/// Scans the window between the `og:image` and `og:site_name` meta tags,
/// then takes the first `http`..`">` substring inside it. Pages without
/// both markers resolve to `None`.
pub fn cut_image_link(page: &str) -> Option<String> {
    let image_at = page.find(r#"<meta property="og:image""#)?;
    let window = &page[image_at..];
    let site_name_at = window.find(r#"<meta property="og:site_name""#)?;
    let window = &window[..site_name_at];

    let url_at = window.find("http")?;
    let url = &window[url_at..];
    let url_end = url.find("\">")?;
    Some(url[..url_end].to_string())
}
