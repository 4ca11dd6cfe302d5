//! Mapping between invitation hashes and shareable links.
//!
//! Two link shapes exist: the native-scheme form `<scheme>://invite/<hash>`
//! and the web form `<domain><invite_path>/<hash>`. Links can arrive rewritten
//! by redirects or shorteners, so resolution falls back to locating an
//! `/invite/<hash>` path segment anywhere in the string.

use serde::{Deserialize, Serialize};

use crate::token::InvitationToken;

const INVITE_SEGMENT: &str = "/invite/";
const SEGMENT_END: &[char] = &['/', '?', '&', '#'];

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LinkConfig {
    pub scheme: String,
    pub domain: String,
    pub invite_path: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            scheme: String::from("tether"),
            domain: String::from("https://tether.app"),
            invite_path: String::from("/invite"),
        }
    }
}

impl LinkConfig {
    fn app_prefix(&self) -> String {
        self.scheme.clone() + "://invite/"
    }
    fn web_prefix(&self) -> String {
        self.domain.clone() + &self.invite_path + "/"
    }

    pub fn to_urls(&self, hash: impl AsRef<str>) -> InviteUrls {
        let hash = hash.as_ref();
        let web_url = self.web_prefix() + hash;
        InviteUrls {
            app_url: self.app_prefix() + hash,
            universal_url: web_url.clone(),
            web_url,
        }
    }

    /// Extracts the raw hash from either link shape, or from any string
    /// carrying an `/invite/<hash>` segment. The result is not validated.
    pub fn from_url(&self, url: &str) -> Option<String> {
        let segment = url
            .strip_prefix(&self.app_prefix())
            .or_else(|| url.strip_prefix(&self.web_prefix()))
            .map(until_segment_end)
            .or_else(|| fallback_segment(url))?;
        if segment.is_empty() {
            None
        } else {
            Some(segment.to_string())
        }
    }

    pub fn share_request(&self, hash: &InvitationToken, inviter_name: Option<&str>) -> ShareRequest {
        let urls = self.to_urls(hash);
        let message = match inviter_name {
            Some(name) if !name.trim().is_empty() => format!(
                "{} invited you to be their accountability partner: {}",
                name.trim(),
                urls.web_url
            ),
            _ => format!("You're invited to be my accountability partner: {}", urls.web_url),
        };
        ShareRequest {
            hash: hash.clone(),
            app_url: urls.app_url,
            web_url: urls.web_url,
            message,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InviteUrls {
    pub app_url: String,
    pub web_url: String,
    /// Always the web form: it degrades gracefully without the app installed.
    pub universal_url: String,
}

/// What the share transport receives. Delivery itself happens elsewhere.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    pub hash: InvitationToken,
    pub app_url: String,
    pub web_url: String,
    pub message: String,
}

fn until_segment_end(rest: &str) -> &str {
    rest.split(SEGMENT_END).next().unwrap_or_default()
}

fn fallback_segment(url: &str) -> Option<&str> {
    url.match_indices(INVITE_SEGMENT)
        .map(|(at, _)| until_segment_end(&url[at + INVITE_SEGMENT.len()..]))
        .find(|segment| !segment.is_empty())
}
