//! Where page data comes from: the live CMS or a JSON snapshot of it.

use std::cmp::Reverse;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::model::{Author, Faq, SearchFaq, SiteSettings, parse_timestamp};
use crate::sanity::{SanityClient, SanityConfig};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("content API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to read snapshot {}: {source}", path.display())]
    SnapshotIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid snapshot {}: {source}", path.display())]
    SnapshotParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid content client configuration: {0}")]
    Config(String),
}

/// An offline copy of the dataset, using the CMS field names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSnapshot {
    #[serde(default)]
    pub faqs: Vec<Faq>,
    #[serde(default)]
    pub authors: Vec<Author>,
    pub site_settings: Option<SiteSettings>,
}

impl ContentSnapshot {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ContentError::SnapshotIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ContentError::SnapshotParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// FAQs with a slug, newest first. Undated FAQs sort last, keeping file order.
    fn listed_faqs(&self) -> Vec<&Faq> {
        let mut rows: Vec<&Faq> = self.faqs.iter().filter(|faq| faq.slug().is_some()).collect();
        rows.sort_by_key(|faq| {
            Reverse(
                faq.published_at
                    .as_deref()
                    .and_then(parse_timestamp)
                    .map(|ts| ts.timestamp()),
            )
        });
        rows
    }

    fn search_faqs(&self) -> Vec<SearchFaq> {
        self.faqs.iter().map(Faq::to_search_faq).collect()
    }

    fn latest_faqs(&self, limit: usize) -> Vec<Faq> {
        self.listed_faqs().into_iter().take(limit).cloned().collect()
    }

    fn all_faqs(&self) -> Vec<Faq> {
        self.listed_faqs().into_iter().cloned().collect()
    }

    fn tag_faqs(&self, tag: &str) -> Vec<Faq> {
        self.listed_faqs()
            .into_iter()
            .filter(|faq| faq.has_tag(tag))
            .cloned()
            .collect()
    }

    fn author(&self, slug: &str) -> Option<Author> {
        self.authors
            .iter()
            .find(|author| author.slug() == Some(slug))
            .cloned()
    }

    fn author_faqs(&self, author_id: &str) -> Vec<Faq> {
        self.listed_faqs()
            .into_iter()
            .filter(|faq| {
                faq.author
                    .as_ref()
                    .and_then(|author| author.id.as_deref())
                    == Some(author_id)
            })
            .cloned()
            .collect()
    }

    fn faq(&self, slug: &str) -> Option<Faq> {
        self.faqs.iter().find(|faq| faq.slug() == Some(slug)).cloned()
    }
}

/// The content store handed to pages and commands.
#[derive(Debug, Clone)]
pub enum ContentSource {
    Sanity(SanityClient),
    Snapshot(Arc<ContentSnapshot>),
}

impl ContentSource {
    pub fn sanity(config: SanityConfig) -> Result<Self, ContentError> {
        let client = SanityClient::new(config)?;
        info!(endpoint = %client.config().query_url(), "using Sanity content API");
        Ok(Self::Sanity(client))
    }

    pub fn snapshot_file(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        let snapshot = ContentSnapshot::from_path(path.as_ref())?;
        info!(
            path = %path.as_ref().display(),
            faqs = snapshot.faqs.len(),
            authors = snapshot.authors.len(),
            "using content snapshot"
        );
        Ok(Self::Snapshot(Arc::new(snapshot)))
    }

    pub fn from_snapshot(snapshot: ContentSnapshot) -> Self {
        Self::Snapshot(Arc::new(snapshot))
    }

    /// Every FAQ the search box can offer, including malformed rows; the
    /// match filter discards those.
    pub async fn search_candidates(&self) -> Result<Vec<SearchFaq>, ContentError> {
        match self {
            Self::Sanity(client) => client.search_faqs().await,
            Self::Snapshot(snapshot) => Ok(snapshot.search_faqs()),
        }
    }

    pub async fn latest_faqs(&self, limit: usize) -> Result<Vec<Faq>, ContentError> {
        match self {
            Self::Sanity(client) => client.latest_faqs(limit).await,
            Self::Snapshot(snapshot) => Ok(snapshot.latest_faqs(limit)),
        }
    }

    pub async fn all_faqs(&self) -> Result<Vec<Faq>, ContentError> {
        match self {
            Self::Sanity(client) => client.all_faqs().await,
            Self::Snapshot(snapshot) => Ok(snapshot.all_faqs()),
        }
    }

    /// FAQs with a keyword whose tag slug equals that of `tag`, newest first.
    pub async fn tag_faqs(&self, tag: &str) -> Result<Vec<Faq>, ContentError> {
        match self {
            Self::Sanity(client) => client.tag_faqs(tag).await,
            Self::Snapshot(snapshot) => Ok(snapshot.tag_faqs(tag)),
        }
    }

    pub async fn author(&self, slug: &str) -> Result<Option<Author>, ContentError> {
        match self {
            Self::Sanity(client) => client.author(slug).await,
            Self::Snapshot(snapshot) => Ok(snapshot.author(slug)),
        }
    }

    pub async fn author_faqs(&self, author_id: &str) -> Result<Vec<Faq>, ContentError> {
        match self {
            Self::Sanity(client) => client.author_faqs(author_id).await,
            Self::Snapshot(snapshot) => Ok(snapshot.author_faqs(author_id)),
        }
    }

    pub async fn faq(&self, slug: &str) -> Result<Option<Faq>, ContentError> {
        match self {
            Self::Sanity(client) => client.faq(slug).await,
            Self::Snapshot(snapshot) => Ok(snapshot.faq(slug)),
        }
    }

    /// Site-wide settings, falling back to the built-in defaults when the
    /// dataset has no settings document.
    pub async fn site_settings(&self) -> Result<SiteSettings, ContentError> {
        let settings = match self {
            Self::Sanity(client) => client.site_settings().await?,
            Self::Snapshot(snapshot) => snapshot.site_settings.clone(),
        };
        Ok(settings.unwrap_or_default())
    }
}
