use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

use crate::links::{display_tag, tag_slug};
use crate::portable_text::Block;

/// Sanity returns `null` for projected fields that are absent on a document,
/// so collection fields treat `null` like a missing key.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Parses CMS datetimes (RFC 3339) and bare `YYYY-MM-DD` dates.
pub fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).ok().or_else(|| {
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc().fixed_offset())
    })
}

/// `Mar 4, 2025` style date for cards and citations.
pub fn display_date(value: &str) -> Option<String> {
    parse_timestamp(value).map(|ts| ts.format("%b %-d, %Y").to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slug {
    pub current: Option<String>,
}

impl Slug {
    pub fn new(current: impl Into<String>) -> Self {
        Self {
            current: Some(current.into()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        non_empty(self.current.as_deref())
    }
}

/// A searchable FAQ as delivered by the search-box query.
///
/// Every field is optional on the wire; use [`SearchFaq::validate`] to obtain a
/// [`Candidate`] that is safe to match and link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFaq {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub question: Option<String>,
    pub slug: Option<Slug>,
    #[serde(rename = "summaryForAI")]
    pub summary: Option<String>,
}

/// Borrowed view of a [`SearchFaq`] whose identifier, locator and question are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub id: &'a str,
    pub question: &'a str,
    pub locator: &'a str,
    pub summary: Option<&'a str>,
}

impl SearchFaq {
    pub fn new(
        id: impl Into<String>,
        question: impl Into<String>,
        slug: impl Into<String>,
        summary: Option<&str>,
    ) -> Self {
        Self {
            id: Some(id.into()),
            question: Some(question.into()),
            slug: Some(Slug::new(slug)),
            summary: summary.map(str::to_string),
        }
    }

    pub fn validate(&self) -> Option<Candidate<'_>> {
        Some(Candidate {
            id: non_empty(self.id.as_deref())?,
            question: non_empty(self.question.as_deref())?,
            locator: self.slug.as_ref().and_then(Slug::as_str)?,
            summary: non_empty(self.summary.as_deref()),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAsset {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub asset: Option<ImageAsset>,
    pub alt: Option<String>,
    pub caption: Option<String>,
}

impl ImageRef {
    pub fn asset_url(&self) -> Option<&str> {
        non_empty(self.asset.as_ref().and_then(|asset| asset.url.as_deref()))
    }

    pub fn alt(&self) -> Option<&str> {
        non_empty(self.alt.as_deref())
    }

    pub fn caption(&self) -> Option<&str> {
        non_empty(self.caption.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default, deserialize_with = "null_default")]
    pub title: String,
    pub slug: Option<Slug>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialMedia {
    pub twitter: Option<String>,
    pub linkedin: Option<String>,
    pub website: Option<String>,
}

impl SocialMedia {
    /// Profile URL for the Twitter handle, accepting handles with or without `@`.
    pub fn twitter_url(&self) -> Option<String> {
        non_empty(self.twitter.as_deref()).map(|handle| {
            if handle.starts_with("http://") || handle.starts_with("https://") {
                handle.to_string()
            } else {
                format!("https://twitter.com/{}", handle.trim_start_matches('@'))
            }
        })
    }

    pub fn linkedin(&self) -> Option<&str> {
        non_empty(self.linkedin.as_deref())
    }

    pub fn website(&self) -> Option<&str> {
        non_empty(self.website.as_deref())
    }

    /// Twitter, LinkedIn and website links in that order, skipping blanks.
    pub fn same_as(&self) -> Vec<String> {
        self.twitter_url()
            .into_iter()
            .chain(self.linkedin().map(str::to_string))
            .chain(self.website().map(str::to_string))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    pub slug: Option<Slug>,
    pub job_title: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub bio: Vec<Block>,
    #[serde(default, deserialize_with = "null_default")]
    pub expertise: Vec<String>,
    pub social_media: Option<SocialMedia>,
    pub image: Option<ImageRef>,
}

impl Author {
    pub fn slug(&self) -> Option<&str> {
        self.slug.as_ref().and_then(Slug::as_str)
    }

    pub fn job_title(&self) -> Option<&str> {
        non_empty(self.job_title.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seo {
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faq {
    #[serde(rename = "_id", default, deserialize_with = "null_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub question: String,
    pub slug: Option<Slug>,
    #[serde(default, deserialize_with = "null_default")]
    pub answer: Vec<Block>,
    #[serde(rename = "summaryForAI")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub alternate_questions: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub keywords: Vec<String>,
    pub category: Option<Category>,
    #[serde(
        rename = "relatedFAQs",
        default,
        deserialize_with = "null_default"
    )]
    pub related_faqs: Vec<SearchFaq>,
    pub published_at: Option<String>,
    pub updated_at: Option<String>,
    pub author: Option<Author>,
    pub image: Option<ImageRef>,
    pub seo: Option<Seo>,
    pub custom_schema_markup: Option<String>,
}

impl Faq {
    pub fn slug(&self) -> Option<&str> {
        self.slug.as_ref().and_then(Slug::as_str)
    }

    pub fn summary(&self) -> Option<&str> {
        non_empty(self.summary.as_deref())
    }

    pub fn meta_title(&self) -> Option<&str> {
        non_empty(self.seo.as_ref().and_then(|seo| seo.meta_title.as_deref()))
    }

    pub fn meta_description(&self) -> Option<&str> {
        non_empty(
            self.seo
                .as_ref()
                .and_then(|seo| seo.meta_description.as_deref()),
        )
    }

    /// Date the answer was last touched: the update date, else the publish date.
    pub fn modified_at(&self) -> Option<&str> {
        non_empty(self.updated_at.as_deref()).or(non_empty(self.published_at.as_deref()))
    }

    pub fn published_date(&self) -> Option<String> {
        self.published_at.as_deref().and_then(display_date)
    }

    /// The keyword, as authored, whose tag slug equals that of `tag`.
    ///
    /// `E-numbers`, `e numbers` and `e-numbers` all name the same tag.
    pub fn tag_keyword(&self, tag: &str) -> Option<&str> {
        let wanted = tag_slug(tag);
        self.keywords
            .iter()
            .map(String::as_str)
            .find(|keyword| tag_slug(keyword) == wanted)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag_keyword(tag).is_some()
    }

    /// Projects the fields the search box needs.
    pub fn to_search_faq(&self) -> SearchFaq {
        SearchFaq {
            id: Some(self.id.clone()),
            question: Some(self.question.clone()),
            slug: self.slug.clone(),
            summary: self.summary.clone(),
        }
    }
}

/// Heading for a tag archive: the keyword as authored on the first FAQ that
/// carries it, else the title-cased slug.
pub fn tag_label(faqs: &[Faq], tag: &str) -> String {
    faqs.iter()
        .find_map(|faq| faq.tag_keyword(tag))
        .map(str::to_string)
        .unwrap_or_else(|| display_tag(tag))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    pub alternate_name: Option<String>,
    pub founding_date: Option<String>,
    pub area_served: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub knows_about: Vec<String>,
}

impl Default for Organization {
    fn default() -> Self {
        Self {
            name: "UPF FAQs".to_string(),
            alternate_name: None,
            founding_date: None,
            area_served: None,
            knows_about: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSocialMedia {
    pub twitter: Option<String>,
    pub linkedin: Option<String>,
    pub facebook: Option<String>,
}

impl SiteSocialMedia {
    pub fn same_as(&self) -> Vec<String> {
        [&self.twitter, &self.linkedin, &self.facebook]
            .into_iter()
            .filter_map(|link| non_empty(link.as_deref()).map(str::to_string))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchActionSettings {
    pub search_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "SiteSettingsDocument")]
pub struct SiteSettings {
    pub title: String,
    pub description: String,
    pub url: String,
    pub logo: Option<ImageRef>,
    pub organization: Organization,
    pub social_media: Option<SiteSocialMedia>,
    pub search_action: Option<SearchActionSettings>,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            title: "UPF FAQs".to_string(),
            description: "Quick answers to your ultra-processed food questions".to_string(),
            url: "https://upffaqs.com".to_string(),
            logo: None,
            organization: Organization::default(),
            social_media: None,
            search_action: None,
        }
    }
}

/// The settings document as the CMS projects it: any field may be missing or `null`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SiteSettingsDocument {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    logo: Option<ImageRef>,
    organization: Option<Organization>,
    social_media: Option<SiteSocialMedia>,
    search_action: Option<SearchActionSettings>,
}

fn or_fallback(value: Option<String>, fallback: String) -> String {
    value.filter(|v| !v.trim().is_empty()).unwrap_or(fallback)
}

impl From<SiteSettingsDocument> for SiteSettings {
    fn from(doc: SiteSettingsDocument) -> Self {
        let defaults = SiteSettings::default();
        let mut organization = doc.organization.unwrap_or_default();
        if organization.name.trim().is_empty() {
            organization.name = defaults.organization.name;
        }
        Self {
            title: or_fallback(doc.title, defaults.title),
            description: or_fallback(doc.description, defaults.description),
            url: or_fallback(doc.url, defaults.url),
            logo: doc.logo,
            organization,
            social_media: doc.social_media,
            search_action: doc.search_action,
        }
    }
}

impl SiteSettings {
    /// Site root without a trailing slash, ready for path concatenation.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    pub fn search_url(&self) -> Option<&str> {
        non_empty(
            self.search_action
                .as_ref()
                .and_then(|action| action.search_url.as_deref()),
        )
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn search_faq_validation_requires_navigation_fields() {
        let ok = SearchFaq::new("1", "Is sugar a UPF?", "is-sugar-a-upf", Some("Yes"));
        let candidate = ok.validate().expect("valid candidate");
        assert_eq!(candidate.locator, "is-sugar-a-upf");
        assert_eq!(candidate.summary, Some("Yes"));

        let missing_slug = SearchFaq {
            slug: None,
            ..ok.clone()
        };
        assert!(missing_slug.validate().is_none());

        let blank_slug = SearchFaq {
            slug: Some(Slug { current: None }),
            ..ok.clone()
        };
        assert!(blank_slug.validate().is_none());

        let empty_question = SearchFaq {
            question: Some(String::new()),
            ..ok.clone()
        };
        assert!(empty_question.validate().is_none());

        let missing_id = SearchFaq { id: None, ..ok };
        assert!(missing_id.validate().is_none());
    }

    #[test]
    fn faq_tolerates_null_projections() {
        let faq: Faq = serde_json::from_value(json!({
            "_id": "faq-1",
            "question": "Are additives safe?",
            "slug": { "current": "are-additives-safe" },
            "summaryForAI": null,
            "keywords": null,
            "relatedFAQs": null,
            "answer": null,
            "author": { "_id": "a1", "name": "Dana", "slug": { "current": "dana" }, "expertise": null }
        }))
        .expect("faq parses");
        assert!(faq.keywords.is_empty());
        assert!(faq.answer.is_empty());
        assert_eq!(faq.summary(), None);
        assert_eq!(faq.author.as_ref().and_then(Author::slug), Some("dana"));
    }

    #[test]
    fn social_links_normalize_twitter_handles() {
        let social = SocialMedia {
            twitter: Some("@upffaqs".to_string()),
            linkedin: Some(String::new()),
            website: Some("https://example.com".to_string()),
        };
        assert_eq!(
            social.same_as(),
            vec![
                "https://twitter.com/upffaqs".to_string(),
                "https://example.com".to_string()
            ]
        );
    }

    #[test]
    fn modified_at_prefers_update_date() {
        let mut faq = Faq {
            published_at: Some("2024-01-01T00:00:00Z".to_string()),
            ..Faq::default()
        };
        assert_eq!(faq.modified_at(), Some("2024-01-01T00:00:00Z"));
        faq.updated_at = Some("2024-02-01T00:00:00Z".to_string());
        assert_eq!(faq.modified_at(), Some("2024-02-01T00:00:00Z"));
    }

    #[test]
    fn dates_parse_and_display() {
        assert_eq!(
            display_date("2025-03-04T10:30:00Z").as_deref(),
            Some("Mar 4, 2025")
        );
        assert_eq!(display_date("2024-12-25").as_deref(), Some("Dec 25, 2024"));
        assert_eq!(display_date("yesterday"), None);
    }

    #[test]
    fn tags_match_by_slug() {
        let faq = Faq {
            keywords: vec![
                "Gut Health".to_string(),
                "UPF".to_string(),
                "E-numbers".to_string(),
            ],
            ..Faq::default()
        };
        assert!(faq.has_tag("gut health"));
        assert!(faq.has_tag("gut-health"));
        assert!(faq.has_tag("Upf"));
        assert_eq!(faq.tag_keyword("e-numbers"), Some("E-numbers"));
        assert_eq!(faq.tag_keyword("E Numbers"), Some("E-numbers"));
        assert!(!faq.has_tag("Sugar"));
    }

    #[test]
    fn site_settings_tolerate_null_projections() {
        let settings: SiteSettings = serde_json::from_value(json!({
            "title": "UPF FAQs CMS",
            "description": null,
            "url": null,
            "logo": null,
            "organization": null,
            "socialMedia": { "twitter": "https://twitter.com/upffaqs", "linkedin": null, "facebook": null },
            "searchAction": { "searchUrl": "https://upffaqs.com/search?q={search_term_string}" }
        }))
        .expect("settings parse");
        assert_eq!(settings.title, "UPF FAQs CMS");
        assert_eq!(settings.base_url(), "https://upffaqs.com");
        assert_eq!(settings.description, SiteSettings::default().description);
        assert_eq!(settings.organization.name, "UPF FAQs");
        assert_eq!(
            settings.social_media.as_ref().map(SiteSocialMedia::same_as),
            Some(vec!["https://twitter.com/upffaqs".to_string()])
        );
        assert!(settings.search_url().is_some());

        let org: SiteSettings = serde_json::from_value(json!({
            "organization": { "name": null, "alternateName": "UPF", "knowsAbout": null }
        }))
        .expect("settings parse");
        assert_eq!(org.organization.name, "UPF FAQs");
        assert_eq!(org.organization.alternate_name.as_deref(), Some("UPF"));
        assert!(org.organization.knows_about.is_empty());
    }

    #[test]
    fn site_settings_default_to_upf_brand() {
        let settings = SiteSettings::default().with_base_url("https://example.org/");
        assert_eq!(settings.base_url(), "https://example.org");
        assert_eq!(settings.organization.name, "UPF FAQs");
        assert!(settings.search_url().is_none());
    }
}
