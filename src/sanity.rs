//! Minimal client for Sanity's GROQ query HTTP API.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::content::ContentError;
use crate::links::tag_slug;
use crate::model::{Author, Faq, SearchFaq, SiteSettings};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Connection parameters for one Sanity project/dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanityConfig {
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    pub use_cdn: bool,
    pub token: Option<String>,
    /// Overrides `https://{project}.api[cdn].sanity.io`, e.g. for a local mock.
    pub api_host: Option<String>,
}

impl Default for SanityConfig {
    fn default() -> Self {
        Self {
            project_id: "shxuue68".to_string(),
            dataset: "production".to_string(),
            api_version: "2023-05-03".to_string(),
            use_cdn: true,
            token: None,
            api_host: None,
        }
    }
}

impl SanityConfig {
    pub fn query_url(&self) -> String {
        let host = match &self.api_host {
            Some(host) => host.trim_end_matches('/').to_string(),
            None => {
                let api = if self.use_cdn { "apicdn" } else { "api" };
                format!("https://{}.{api}.sanity.io", self.project_id)
            }
        };
        let version = self.api_version.trim_start_matches('v');
        format!("{host}/v{version}/data/query/{}", self.dataset)
    }

    fn validate(&self) -> Result<(), ContentError> {
        let valid_id = |value: &str| {
            !value.is_empty()
                && value
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        };
        if !valid_id(&self.project_id) {
            return Err(ContentError::Config(format!(
                "invalid project id {:?}",
                self.project_id
            )));
        }
        if !valid_id(&self.dataset) {
            return Err(ContentError::Config(format!(
                "invalid dataset {:?}",
                self.dataset
            )));
        }
        Ok(())
    }
}

macro_rules! faq_card_projection {
    () => {
        r#"{
  _id,
  question,
  slug,
  summaryForAI,
  keywords,
  category->{ title, slug },
  image { asset->{ _id, url }, alt },
  publishedAt,
  author->{ _id, name, slug }
}"#
    };
}

pub const SEARCH_FAQS_QUERY: &str = r#"*[_type == "faq" && defined(slug.current) && defined(question)] {
  _id,
  question,
  slug,
  summaryForAI
}"#;

pub const ALL_FAQS_QUERY: &str = concat!(
    r#"*[_type == "faq" && defined(slug.current)] | order(publishedAt desc, _createdAt desc) "#,
    faq_card_projection!()
);

pub const TAG_FAQS_QUERY: &str = concat!(
    r#"*[_type == "faq" && count(keywords[array::join(string::split(lower(@), " "), "-") == $tag]) > 0 && defined(slug.current)] | order(publishedAt desc, _createdAt desc) "#,
    faq_card_projection!()
);

pub const AUTHOR_FAQS_QUERY: &str = concat!(
    r#"*[_type == "faq" && author._ref == $authorId && defined(slug.current)] | order(publishedAt desc, _createdAt desc) "#,
    faq_card_projection!()
);

pub const AUTHOR_QUERY: &str = r#"*[_type == "author" && slug.current == $slug][0] {
  _id,
  name,
  slug,
  jobTitle,
  bio,
  expertise,
  socialMedia,
  image { asset->{ _id, url }, alt }
}"#;

pub const FAQ_QUERY: &str = r#"*[_type == "faq" && slug.current == $slug][0] {
  _id,
  question,
  slug,
  answer,
  summaryForAI,
  alternateQuestions,
  keywords,
  category->{ title, slug, description },
  "relatedFAQs": relatedFAQs[]->{ _id, question, slug, summaryForAI },
  publishedAt,
  updatedAt,
  author->{
    _id,
    name,
    slug,
    jobTitle,
    expertise,
    socialMedia,
    image { asset->{ _id, url }, alt }
  },
  image { asset->{ _id, url }, alt, caption },
  seo,
  customSchemaMarkup
}"#;

pub const SITE_SETTINGS_QUERY: &str = r#"*[_type == "siteSettings"][0] {
  title,
  description,
  url,
  logo { asset->{ _id, url }, alt },
  organization,
  socialMedia,
  searchAction
}"#;

#[derive(Deserialize)]
struct QueryResponse<T> {
    result: T,
}

#[derive(Debug, Clone)]
pub struct SanityClient {
    config: SanityConfig,
    endpoint: String,
    http: reqwest::Client,
}

impl SanityClient {
    pub fn new(config: SanityConfig) -> Result<Self, ContentError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            endpoint: config.query_url(),
            config,
            http,
        })
    }

    pub fn config(&self) -> &SanityConfig {
        &self.config
    }

    /// Runs a GROQ query. `params` are sent as JSON-encoded `$name` values so
    /// user input never becomes part of the query text.
    pub async fn fetch<T>(&self, query: &str, params: &[(&str, Value)]) -> Result<T, ContentError>
    where
        T: DeserializeOwned,
    {
        let mut pairs = vec![("query".to_string(), query.to_string())];
        for (name, value) in params {
            pairs.push((format!("${name}"), value.to_string()));
        }
        debug!(endpoint = %self.endpoint, params = params.len(), "querying content API");

        let mut request = self.http.get(&self.endpoint).query(&pairs);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ContentError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let payload: QueryResponse<T> = response.json().await?;
        Ok(payload.result)
    }

    pub async fn search_faqs(&self) -> Result<Vec<SearchFaq>, ContentError> {
        let rows: Option<Vec<SearchFaq>> = self.fetch(SEARCH_FAQS_QUERY, &[]).await?;
        Ok(rows.unwrap_or_default())
    }

    pub async fn latest_faqs(&self, limit: usize) -> Result<Vec<Faq>, ContentError> {
        // Slice bounds are literals in GROQ; `limit` is ours, never user text.
        let query = format!(
            r#"*[_type == "faq" && defined(slug.current)] | order(publishedAt desc, _createdAt desc) [0...{limit}] {}"#,
            faq_card_projection!()
        );
        let rows: Option<Vec<Faq>> = self.fetch(&query, &[]).await?;
        Ok(rows.unwrap_or_default())
    }

    pub async fn all_faqs(&self) -> Result<Vec<Faq>, ContentError> {
        let rows: Option<Vec<Faq>> = self.fetch(ALL_FAQS_QUERY, &[]).await?;
        Ok(rows.unwrap_or_default())
    }

    pub async fn tag_faqs(&self, tag: &str) -> Result<Vec<Faq>, ContentError> {
        let rows: Option<Vec<Faq>> = self
            .fetch(TAG_FAQS_QUERY, &[("tag", Value::from(tag_slug(tag)))])
            .await?;
        Ok(rows.unwrap_or_default())
    }

    pub async fn author(&self, slug: &str) -> Result<Option<Author>, ContentError> {
        self.fetch(AUTHOR_QUERY, &[("slug", Value::from(slug))])
            .await
    }

    pub async fn author_faqs(&self, author_id: &str) -> Result<Vec<Faq>, ContentError> {
        let rows: Option<Vec<Faq>> = self
            .fetch(AUTHOR_FAQS_QUERY, &[("authorId", Value::from(author_id))])
            .await?;
        Ok(rows.unwrap_or_default())
    }

    pub async fn faq(&self, slug: &str) -> Result<Option<Faq>, ContentError> {
        self.fetch(FAQ_QUERY, &[("slug", Value::from(slug))]).await
    }

    pub async fn site_settings(&self) -> Result<Option<SiteSettings>, ContentError> {
        self.fetch(SITE_SETTINGS_QUERY, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn mock_config(server: &MockServer) -> SanityConfig {
        SanityConfig {
            api_host: Some(server.uri()),
            ..SanityConfig::default()
        }
    }

    #[test]
    fn query_url_uses_cdn_host_by_default() {
        assert_eq!(
            SanityConfig::default().query_url(),
            "https://shxuue68.apicdn.sanity.io/v2023-05-03/data/query/production"
        );
        let live = SanityConfig {
            use_cdn: false,
            api_version: "v2024-01-01".to_string(),
            ..SanityConfig::default()
        };
        assert_eq!(
            live.query_url(),
            "https://shxuue68.api.sanity.io/v2024-01-01/data/query/production"
        );
    }

    #[test]
    fn rejects_unsafe_project_ids() {
        let config = SanityConfig {
            project_id: "evil.example.com/".to_string(),
            ..SanityConfig::default()
        };
        assert!(matches!(
            SanityClient::new(config),
            Err(ContentError::Config(_))
        ));
    }

    #[tokio::test]
    async fn author_lookup_passes_slug_as_parameter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2023-05-03/data/query/production"))
            .and(query_param("query", AUTHOR_QUERY))
            .and(query_param("$slug", "\"dana\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ms": 3,
                "query": AUTHOR_QUERY,
                "result": { "_id": "author-1", "name": "Dana Reyes", "slug": { "current": "dana" }, "bio": null }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = SanityClient::new(mock_config(&server)).expect("client");
        let author = client.author("dana").await.expect("fetch").expect("author");
        assert_eq!(author.name, "Dana Reyes");
        assert_eq!(author.id.as_deref(), Some("author-1"));
    }

    #[tokio::test]
    async fn tag_lookup_sends_the_tag_slug() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("query", TAG_FAQS_QUERY))
            .and(query_param("$tag", "\"e-numbers\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": [{ "_id": "1", "question": "Are E-numbers UPF?", "slug": { "current": "e" }, "keywords": ["E-numbers"] }]
            })))
            .expect(1)
            .mount(&server)
            .await;
        let client = SanityClient::new(mock_config(&server)).expect("client");
        let faqs = client.tag_faqs("E Numbers").await.expect("fetch");
        assert_eq!(faqs.len(), 1);
        assert!(faqs[0].has_tag("e-numbers"));
    }

    #[tokio::test]
    async fn site_settings_with_null_fields_keep_cms_values() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("query", SITE_SETTINGS_QUERY))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "title": "UPF FAQs CMS",
                    "description": null,
                    "url": null,
                    "logo": null,
                    "organization": null,
                    "socialMedia": null,
                    "searchAction": { "searchUrl": "https://upffaqs.com/search?q={search_term_string}" }
                }
            })))
            .mount(&server)
            .await;
        let client = SanityClient::new(mock_config(&server)).expect("client");
        let settings = client.site_settings().await.expect("fetch").expect("settings");
        assert_eq!(settings.title, "UPF FAQs CMS");
        assert_eq!(settings.base_url(), "https://upffaqs.com");
        assert!(settings.search_url().is_some());
    }

    #[tokio::test]
    async fn missing_document_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": null })))
            .mount(&server)
            .await;
        let client = SanityClient::new(mock_config(&server)).expect("client");
        assert!(client.faq("nope").await.expect("fetch").is_none());
        assert!(client.search_faqs().await.expect("fetch").is_empty());
    }

    #[tokio::test]
    async fn token_is_sent_as_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer sekret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": [{ "_id": "1", "question": "Q?", "slug": { "current": "q" }, "summaryForAI": null }]
            })))
            .expect(1)
            .mount(&server)
            .await;
        let config = SanityConfig {
            token: Some("sekret".to_string()),
            ..mock_config(&server)
        };
        let client = SanityClient::new(config).expect("client");
        let rows = client.search_faqs().await.expect("fetch");
        assert_eq!(rows.len(), 1);
        assert!(rows[0].validate().is_some());
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad groq"))
            .mount(&server)
            .await;
        let client = SanityClient::new(mock_config(&server)).expect("client");
        match client.all_faqs().await {
            Err(ContentError::Status { status, body }) => {
                assert_eq!(status, 400);
                assert_eq!(body, "bad groq");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
