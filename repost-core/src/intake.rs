//! Ingestion boundary: the shape of items entering the engine.
//!
//! Inbound items are validated here, once, so nothing downstream has to
//! cope with partial objects. [`Candidate`] is what the scheduler queues;
//! [`FeedPost`] and [`FeedListing`] adapt Reddit-style listing JSON into
//! candidates.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RepostError, Result};

const FEED_BASE_URL: &str = "https://reddit.com";

/// A candidate item waiting to be fingerprinted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CandidateInput")]
pub struct Candidate {
    pub identity: String,
    pub content_locator: String,
    pub title: String,
    pub origin: String,
    pub author: String,
    pub external_link: String,
    /// Original post time as reported by the feed
    pub posted_at: Option<DateTime<Utc>>,
}

/// Unchecked wire shape of a [`Candidate`].
///
/// Accepts both snake_case and the camelCase names used by browser
/// clients. Missing descriptive fields default to empty strings.
#[derive(Debug, Default, Deserialize)]
pub struct CandidateInput {
    #[serde(default, alias = "id")]
    pub identity: Option<String>,
    #[serde(default, alias = "contentLocator", alias = "image_url", alias = "imageUrl")]
    pub content_locator: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "subreddit")]
    pub origin: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, alias = "externalLink", alias = "permalink")]
    pub external_link: Option<String>,
    #[serde(default, alias = "observedAt", alias = "observed_at")]
    pub posted_at: Option<DateTime<Utc>>,
}

impl TryFrom<CandidateInput> for Candidate {
    type Error = RepostError;

    fn try_from(input: CandidateInput) -> Result<Self> {
        let identity = non_blank(input.identity)
            .ok_or_else(|| RepostError::InvalidItem("identity must not be blank".into()))?;
        let content_locator = non_blank(input.content_locator).ok_or_else(|| {
            RepostError::InvalidItem(format!("item {identity}: content locator must not be blank"))
        })?;

        Ok(Self {
            identity,
            content_locator,
            title: input.title.unwrap_or_default(),
            origin: input.origin.unwrap_or_default(),
            author: input.author.unwrap_or_default(),
            external_link: input.external_link.unwrap_or_default(),
            posted_at: input.posted_at,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Candidate {
    /// Minimal candidate with empty metadata.
    pub fn new(identity: impl Into<String>, content_locator: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            content_locator: content_locator.into(),
            title: String::new(),
            origin: String::new(),
            author: String::new(),
            external_link: String::new(),
            posted_at: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_external_link(mut self, link: impl Into<String>) -> Self {
        self.external_link = link.into();
        self
    }

    pub fn with_posted_at(mut self, posted_at: DateTime<Utc>) -> Self {
        self.posted_at = Some(posted_at);
        self
    }
}

/// A post as it appears in a Reddit-style listing.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FeedPost {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub created_utc: Option<f64>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub preview: Option<Preview>,
    #[serde(default)]
    pub is_self: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Preview {
    #[serde(default)]
    pub images: Vec<PreviewImage>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PreviewImage {
    pub source: PreviewSource,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PreviewSource {
    pub url: String,
}

impl FeedPost {
    /// Resolve the image to fingerprint.
    ///
    /// Order: the first preview source (HTML-unescaped), then the post URL
    /// if it names an image file, then a real thumbnail.
    pub fn image_locator(&self) -> Option<String> {
        if let Some(source) = self
            .preview
            .as_ref()
            .and_then(|p| p.images.first())
            .map(|img| &img.source.url)
            .filter(|url| !url.is_empty())
        {
            return Some(source.replace("&amp;", "&"));
        }

        if let Some(url) = self.url.as_ref().filter(|url| is_image_url(url)) {
            return Some(url.clone());
        }

        self.thumbnail
            .as_ref()
            .filter(|t| !t.is_empty() && *t != "default" && *t != "self")
            .cloned()
    }

    /// Convert into a candidate, or `None` for self posts and posts
    /// without an image.
    pub fn to_candidate(&self) -> Option<Candidate> {
        if self.is_self || self.id.trim().is_empty() {
            return None;
        }
        let locator = self.image_locator()?;

        let mut candidate = Candidate::new(self.id.trim(), locator)
            .with_title(&self.title)
            .with_author(&self.author)
            .with_external_link(self.absolute_permalink());
        if !self.subreddit.is_empty() {
            candidate = candidate.with_origin(format!("r/{}", self.subreddit));
        }
        if let Some(posted_at) = self.created_utc.and_then(unix_seconds) {
            candidate = candidate.with_posted_at(posted_at);
        }
        Some(candidate)
    }

    fn absolute_permalink(&self) -> String {
        if self.permalink.is_empty() || self.permalink.starts_with("http") {
            self.permalink.clone()
        } else {
            format!("{FEED_BASE_URL}{}", self.permalink)
        }
    }
}

fn is_image_url(url: &str) -> bool {
    [".jpg", ".jpeg", ".png", ".gif"]
        .iter()
        .any(|ext| url.contains(ext))
}

fn unix_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    Utc.timestamp_millis_opt((secs * 1000.0) as i64).single()
}

/// The `data.children[].data` envelope of a listing response.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedListing {
    pub data: FeedListingData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedListingData {
    #[serde(default)]
    pub children: Vec<FeedChild>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedChild {
    pub data: FeedPost,
}

impl FeedListing {
    pub fn posts(&self) -> impl Iterator<Item = &FeedPost> {
        self.data.children.iter().map(|child| &child.data)
    }

    /// Candidates for every post that carries an image, in listing order.
    pub fn candidates(&self) -> Vec<Candidate> {
        self.posts().filter_map(FeedPost::to_candidate).collect()
    }
}
