use crate::content::{ContentError, ContentSource};
use crate::image::ImageUrlBuilder;
use crate::links::{absolute, author_path, display_tag, encode_component, faq_path, tag_path, tag_slug};
use crate::model::{Author, Faq, SearchFaq, SiteSettings, display_date, tag_label};
use crate::overlay::{OverlayView, SearchOverlay};
use crate::portable_text::{Block, to_markdown};
use crate::schema;
use crate::search::{SearchConfig, Segment};
use askama::Template;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use markdown::{Options as MarkdownOptions, to_html_with_options};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn};

type SharedState = Arc<AppState>;

const HOME_FAQ_COUNT: usize = 5;
const SEARCH_PLACEHOLDER: &str = "Search UPF questions...";

#[derive(Clone)]
pub struct AppState {
    pub content: ContentSource,
    pub search: SearchConfig,
    pub images: ImageUrlBuilder,
    /// Public origin used for canonical links, JSON-LD and the sitemap.
    pub base_url: String,
}

impl AppState {
    async fn site(&self) -> SiteSettings {
        let settings = match self.content.site_settings().await {
            Ok(settings) => settings,
            Err(err) => {
                warn!(%err, "site settings unavailable; using defaults");
                SiteSettings::default()
            }
        };
        settings.with_base_url(self.base_url.clone())
    }

    /// The search box keeps working with no candidates when the content
    /// source is down.
    async fn search_candidates(&self) -> Vec<SearchFaq> {
        match self.content.search_candidates().await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(%err, "search candidates unavailable");
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Chrome {
    body_class: &'static str,
    header_class: &'static str,
    brand_class: &'static str,
    main_class: &'static str,
    card_class: &'static str,
    eyebrow_class: &'static str,
    headline_class: &'static str,
    lede_class: &'static str,
    button_class: &'static str,
    tag_class: &'static str,
    prose_class: &'static str,
    muted_class: &'static str,
    mark_class: &'static str,
}

const CHROME: Chrome = Chrome {
    body_class: "min-h-screen bg-gradient-to-br from-orange-50 via-white to-red-50 text-slate-900",
    header_class: "border-b border-orange-100 bg-white/80 backdrop-blur",
    brand_class: "text-xl font-bold text-orange-700",
    main_class: "max-w-4xl mx-auto px-4 py-10 space-y-8",
    card_class: "bg-white p-6 rounded-lg shadow border border-orange-100 space-y-3",
    eyebrow_class: "uppercase tracking-wide text-sm text-orange-600 font-semibold",
    headline_class: "text-4xl font-extrabold tracking-tight",
    lede_class: "text-lg text-slate-600",
    button_class: "inline-flex items-center rounded-md bg-orange-600 px-4 py-2 text-white font-semibold shadow hover:bg-orange-700 transition-colors",
    tag_class: "inline-block rounded-full bg-orange-100 px-3 py-1 text-xs font-medium text-orange-800 hover:bg-orange-200",
    prose_class: "prose prose-slate max-w-none",
    muted_class: "text-sm text-slate-500",
    mark_class: "bg-yellow-200 px-1 rounded",
};

#[derive(Clone)]
pub struct WebConfig {
    pub addr: SocketAddr,
    pub base_url: String,
    pub search: SearchConfig,
    pub fallback_image: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            base_url: "https://upffaqs.com".to_string(),
            search: SearchConfig::default(),
            fallback_image: crate::image::DEFAULT_FALLBACK_IMAGE.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum WebError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub async fn serve(config: WebConfig, content: ContentSource) -> Result<(), WebError> {
    let state = Arc::new(AppState {
        content,
        search: config.search,
        images: ImageUrlBuilder::new(config.fallback_image.clone()),
        base_url: config.base_url.trim_end_matches('/').to_string(),
    });
    let router = build_router(state);
    info!(%config.addr, base = %config.base_url, "Binding HTTP listener");
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

/// JSON error body for `/api` routes.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        warn!(%err, "content fetch failed");
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: "content source unavailable".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.message });
        (self.status, Json(payload)).into_response()
    }
}

/// HTML error page for page routes.
#[derive(Debug)]
struct PageError {
    status: StatusCode,
    message: String,
}

impl PageError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<ContentError> for PageError {
    fn from(err: ContentError) -> Self {
        warn!(%err, "content fetch failed");
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: "We couldn't load this page right now. Please try again shortly.".to_string(),
        }
    }
}

impl From<askama::Error> for PageError {
    fn from(err: askama::Error) -> Self {
        warn!(%err, "template rendering failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Something went wrong while rendering this page.".to_string(),
        }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        (self.status, Html(render_error_page(self.status, &self.message))).into_response()
    }
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/faqs", get(faq_index))
        .route("/faqs/:slug", get(faq_page))
        .route("/authors/:slug", get(author_page))
        .route("/tags/:tag", get(tag_page))
        .route("/search/overlay", get(search_overlay))
        .route("/search/select", get(search_select))
        .route("/api/search", get(api_search))
        .route("/api/search/candidates", get(api_search_candidates))
        .route("/healthz", get(health))
        .route("/sitemap.xml", get(sitemap_xml))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "upf-faqs-web" }))
}

struct PageMeta {
    title: String,
    description: String,
    path: String,
    json_ld: Option<Value>,
}

fn render_page(site: &SiteSettings, meta: PageMeta, body: String) -> Result<Html<String>, PageError> {
    let template = LayoutTemplate {
        chrome: CHROME,
        site_title: &site.title,
        title: meta.title,
        description: meta.description,
        canonical_url: absolute(site.base_url(), &meta.path),
        json_ld: meta.json_ld.as_ref().map(schema::to_script_body),
        search_placeholder: SEARCH_PLACEHOLDER,
        body,
    };
    Ok(Html(template.render()?))
}

async fn home(State(state): State<SharedState>) -> Result<Html<String>, PageError> {
    let site = state.site().await;
    let faqs = state.content.latest_faqs(HOME_FAQ_COUNT).await?;
    let body = HomeTemplate {
        chrome: CHROME,
        site: &site,
        cards: render_cards(&faqs, &state.images)?,
    }
    .render()?;
    render_page(
        &site,
        PageMeta {
            title: site.title.clone(),
            description: site.description.clone(),
            path: "/".to_string(),
            json_ld: Some(schema::home_page(&site, &state.images)),
        },
        body,
    )
}

async fn faq_index(State(state): State<SharedState>) -> Result<Html<String>, PageError> {
    let site = state.site().await;
    let faqs = state.content.all_faqs().await?;
    let body = ListingTemplate {
        chrome: CHROME,
        eyebrow: "Browse",
        headline: "All questions".to_string(),
        lede: format!("{} answers about ultra-processed food.", faqs.len()),
        cards: render_cards(&faqs, &state.images)?,
    }
    .render()?;
    render_page(
        &site,
        PageMeta {
            title: format!("All FAQs - {}", site.title),
            description: site.description.clone(),
            path: "/faqs".to_string(),
            json_ld: None,
        },
        body,
    )
}

async fn faq_page(
    State(state): State<SharedState>,
    Path(slug): Path<String>,
) -> Result<Html<String>, PageError> {
    let site = state.site().await;
    let faq = state
        .content
        .faq(&slug)
        .await?
        .ok_or_else(|| PageError::not_found(format!("No FAQ found at {slug:?}.")))?;
    let json_ld = schema::faq_page(&faq, &site, &state.images);
    let related = faq
        .related_faqs
        .iter()
        .filter_map(|row| row.validate())
        .map(|candidate| RelatedLink {
            question: candidate.question.to_string(),
            href: faq_path(candidate.locator),
        })
        .collect();
    let body = FaqTemplate {
        chrome: CHROME,
        faq: &faq,
        summary: faq.summary(),
        answer_html: render_blocks(&faq.answer),
        image_url: state.images.cropped(faq.image.as_ref(), 1200, 600),
        image_alt: faq
            .image
            .as_ref()
            .and_then(|image| image.alt())
            .unwrap_or(&faq.question),
        image_caption: faq.image.as_ref().and_then(|image| image.caption()),
        published: faq.published_date(),
        updated: faq
            .updated_at
            .as_deref()
            .and_then(display_date)
            .filter(|updated| Some(updated) != faq.published_date().as_ref()),
        author: author_link(faq.author.as_ref()),
        category: faq.category.as_ref().map(|category| category.title.as_str()),
        tags: tag_links(&faq.keywords),
        related,
    }
    .render()?;
    render_page(
        &site,
        PageMeta {
            title: format!("{} - {}", faq.meta_title().unwrap_or(&faq.question), site.title),
            description: faq
                .meta_description()
                .or(faq.summary())
                .unwrap_or(&site.description)
                .to_string(),
            path: faq_path(&slug),
            json_ld: Some(json_ld),
        },
        body,
    )
}

async fn author_page(
    State(state): State<SharedState>,
    Path(slug): Path<String>,
) -> Result<Html<String>, PageError> {
    let site = state.site().await;
    let author = state
        .content
        .author(&slug)
        .await?
        .ok_or_else(|| PageError::not_found(format!("No author found at {slug:?}.")))?;
    let faqs = match author.id.as_deref() {
        Some(id) => state.content.author_faqs(id).await?,
        None => Vec::new(),
    };
    let social = author.social_media.clone().unwrap_or_default();
    let mut links = Vec::new();
    if let Some(url) = social.twitter_url() {
        links.push(ExternalLink { label: "Twitter", href: url });
    }
    if let Some(url) = social.linkedin() {
        links.push(ExternalLink { label: "LinkedIn", href: url.to_string() });
    }
    if let Some(url) = social.website() {
        links.push(ExternalLink { label: "Website", href: url.to_string() });
    }
    let body = AuthorTemplate {
        chrome: CHROME,
        author: &author,
        job_title: author.job_title(),
        image_url: state.images.url_for(author.image.as_ref(), Some(400), Some(400)),
        bio_html: render_blocks(&author.bio),
        links,
        faq_count: faqs.len(),
        cards: render_cards(&faqs, &state.images)?,
    }
    .render()?;
    render_page(
        &site,
        PageMeta {
            title: format!("{} - {} Author", author.name, site.title),
            description: format!(
                "Questions and answers about ultra-processed food by {}.",
                author.name
            ),
            path: author_path(&slug),
            json_ld: Some(schema::author_profile_page(&author, &site, &state.images)),
        },
        body,
    )
}

async fn tag_page(
    State(state): State<SharedState>,
    Path(tag): Path<String>,
) -> Result<Html<String>, PageError> {
    let site = state.site().await;
    let faqs = state.content.tag_faqs(&tag).await?;
    if faqs.is_empty() {
        return Err(PageError::not_found(format!(
            "No FAQs are tagged {:?}.",
            display_tag(&tag)
        )));
    }
    let label = tag_label(&faqs, &tag);
    let body = ListingTemplate {
        chrome: CHROME,
        eyebrow: "Tag",
        headline: label.clone(),
        lede: format!(
            "{} question{} about {label}.",
            faqs.len(),
            if faqs.len() == 1 { "" } else { "s" }
        ),
        cards: render_cards(&faqs, &state.images)?,
    }
    .render()?;
    render_page(
        &site,
        PageMeta {
            title: format!("{label} - {}", site.title),
            description: format!("All UPF FAQ questions and answers about {label}."),
            path: tag_path(&label),
            json_ld: Some(schema::tag_collection_page(&label, &faqs, &site)),
        },
        body,
    )
}

#[derive(Debug, Deserialize)]
struct OverlayParams {
    q: Option<String>,
    open: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct SelectParams {
    q: Option<String>,
    id: String,
}

/// Replays the client's search box state onto a fresh overlay.
fn overlay_for(candidates: Vec<SearchFaq>, config: SearchConfig, query: &str, open: bool) -> SearchOverlay {
    let mut overlay = SearchOverlay::new(candidates, config);
    overlay.input(query);
    if !open {
        overlay.click_outside();
    }
    overlay
}

async fn search_overlay(
    State(state): State<SharedState>,
    Query(params): Query<OverlayParams>,
) -> Result<Html<String>, PageError> {
    let candidates = state.search_candidates().await;
    let overlay = overlay_for(
        candidates,
        state.search,
        params.q.as_deref().unwrap_or_default(),
        params.open.unwrap_or(true),
    );
    let view = overlay.view();
    let template = OverlayTemplate::from_view(&view);
    Ok(Html(template.render()?))
}

async fn search_select(
    State(state): State<SharedState>,
    Query(params): Query<SelectParams>,
) -> Result<Redirect, PageError> {
    let candidates = state.search_candidates().await;
    let mut overlay = overlay_for(
        candidates,
        state.search,
        params.q.as_deref().unwrap_or_default(),
        true,
    );
    let request = overlay
        .select(&params.id)
        .ok_or_else(|| PageError::not_found("That search result is no longer available."))?;
    info!(id = %request.candidate_id, "search result selected");
    Ok(Redirect::to(&faq_path(&request.locator)))
}

#[derive(Debug, Deserialize)]
struct ApiSearchParams {
    q: Option<String>,
}

#[derive(Serialize)]
struct SearchResponse<'a> {
    #[serde(flatten)]
    view: &'a OverlayView<'a>,
    label: String,
}

async fn api_search(
    State(state): State<SharedState>,
    Query(params): Query<ApiSearchParams>,
) -> Result<Response, ApiError> {
    let candidates = state.content.search_candidates().await?;
    let overlay = overlay_for(
        candidates,
        state.search,
        params.q.as_deref().unwrap_or_default(),
        true,
    );
    let view = overlay.view();
    let payload = SearchResponse {
        label: view.result_label(),
        view: &view,
    };
    Ok(Json(&payload).into_response())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CandidateList<'a> {
    min_query_chars: usize,
    max_results: usize,
    candidates: Vec<CandidateRow<'a>>,
}

#[derive(Serialize)]
struct CandidateRow<'a> {
    id: &'a str,
    question: &'a str,
    locator: &'a str,
    summary: Option<&'a str>,
}

/// The search box's candidate list, fetched once per page view. Only
/// candidates that can be linked are included.
async fn api_search_candidates(State(state): State<SharedState>) -> Result<Response, ApiError> {
    let rows = state.content.search_candidates().await?;
    let payload = CandidateList {
        min_query_chars: state.search.min_query_chars,
        max_results: state.search.max_results,
        candidates: rows
            .iter()
            .filter_map(SearchFaq::validate)
            .map(|candidate| CandidateRow {
                id: candidate.id,
                question: candidate.question,
                locator: candidate.locator,
                summary: candidate.summary,
            })
            .collect(),
    };
    Ok(Json(&payload).into_response())
}

async fn sitemap_xml(State(state): State<SharedState>) -> Result<Response, PageError> {
    let site = state.site().await;
    let faqs = state.content.all_faqs().await?;
    let base = site.base_url();

    let mut tags = BTreeMap::new();
    let mut authors = BTreeSet::new();
    for faq in &faqs {
        for keyword in &faq.keywords {
            tags.entry(tag_slug(keyword)).or_insert_with(|| keyword.clone());
        }
        if let Some(slug) = faq.author.as_ref().and_then(Author::slug) {
            authors.insert(slug.to_string());
        }
    }

    let mut body = String::with_capacity(1024);
    body.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    body.push_str(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
    let mut push_url = |loc: String, lastmod: Option<&str>, priority: &str| {
        body.push_str("<url><loc>");
        body.push_str(&xml_escape(&loc));
        body.push_str("</loc>");
        if let Some(lastmod) = lastmod {
            body.push_str("<lastmod>");
            body.push_str(&xml_escape(lastmod));
            body.push_str("</lastmod>");
        }
        body.push_str("<changefreq>weekly</changefreq><priority>");
        body.push_str(priority);
        body.push_str("</priority></url>");
    };
    push_url(base.to_string(), None, "1.0");
    push_url(absolute(base, "/faqs"), None, "0.9");
    for faq in &faqs {
        if let Some(slug) = faq.slug() {
            push_url(absolute(base, &faq_path(slug)), faq.modified_at(), "0.8");
        }
    }
    for keyword in tags.values() {
        push_url(absolute(base, &tag_path(keyword)), None, "0.5");
    }
    for slug in &authors {
        push_url(absolute(base, &author_path(slug)), None, "0.5");
    }
    body.push_str("</urlset>");
    Ok(([(header::CONTENT_TYPE, "application/xml")], body).into_response())
}

fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Rich text arrives from the CMS as Portable Text; raw HTML in it is not trusted.
fn render_blocks(blocks: &[Block]) -> Option<String> {
    let source = to_markdown(blocks);
    let trimmed = source.trim();
    if trimmed.is_empty() {
        return None;
    }
    let html = to_html_with_options(trimmed, &MarkdownOptions::gfm())
        .unwrap_or_else(|_| format!("<p>{}</p>", xml_escape(trimmed)));
    Some(html)
}

#[derive(Debug, Clone)]
struct TagLink {
    label: String,
    href: String,
}

fn tag_links(keywords: &[String]) -> Vec<TagLink> {
    keywords
        .iter()
        .filter(|keyword| !keyword.trim().is_empty())
        .map(|keyword| TagLink {
            label: keyword.clone(),
            href: tag_path(keyword),
        })
        .collect()
}

#[derive(Debug, Clone)]
struct AuthorLink {
    name: String,
    href: String,
    job_title: Option<String>,
}

fn author_link(author: Option<&Author>) -> Option<AuthorLink> {
    let author = author?;
    Some(AuthorLink {
        name: author.name.clone(),
        href: author_path(author.slug()?),
        job_title: author.job_title().map(str::to_string),
    })
}

struct RelatedLink {
    question: String,
    href: String,
}

struct ExternalLink {
    label: &'static str,
    href: String,
}

struct FaqCard {
    question: String,
    href: String,
    summary: Option<String>,
    image_url: String,
    image_alt: String,
    published: Option<String>,
    author: Option<AuthorLink>,
    tags: Vec<TagLink>,
}

impl FaqCard {
    fn from_faq(faq: &Faq, images: &ImageUrlBuilder) -> Option<Self> {
        let slug = faq.slug()?;
        Some(Self {
            question: faq.question.clone(),
            href: faq_path(slug),
            summary: faq.summary().map(str::to_string),
            image_url: images.url_for(faq.image.as_ref(), Some(640), Some(360)),
            image_alt: faq
                .image
                .as_ref()
                .and_then(|image| image.alt())
                .unwrap_or(&faq.question)
                .to_string(),
            published: faq.published_date(),
            author: author_link(faq.author.as_ref()),
            tags: tag_links(&faq.keywords),
        })
    }
}

fn render_cards(faqs: &[Faq], images: &ImageUrlBuilder) -> Result<String, askama::Error> {
    let cards = faqs
        .iter()
        .filter_map(|faq| FaqCard::from_faq(faq, images))
        .collect();
    CardsTemplate {
        chrome: CHROME,
        cards,
    }
    .render()
}

fn render_error_page(status: StatusCode, message: &str) -> String {
    let template = ErrorTemplate {
        chrome: CHROME,
        status: status.as_u16(),
        title: if status == StatusCode::NOT_FOUND {
            "Page not found"
        } else {
            "Something went wrong"
        },
        message,
    };
    template
        .render()
        .unwrap_or_else(|_| format!("{} {}", status.as_u16(), xml_escape(message)))
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>{{ title }}</title>
    <meta name="description" content="{{ description }}" />
    <link rel="canonical" href="{{ canonical_url }}">
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
    {% if let Some(json_ld) = json_ld %}
    <script type="application/ld+json">
{{ json_ld|safe }}
    </script>
    {% endif %}
  </head>
  <body class="{{ chrome.body_class }}">
    <header class="{{ chrome.header_class }}">
      <div class="max-w-4xl mx-auto px-4 py-4 flex flex-wrap items-center gap-4 justify-between">
        <a href="/" class="{{ chrome.brand_class }}">{{ site_title }}</a>
        <nav class="text-sm font-semibold text-slate-600"><a href="/faqs">All FAQs</a></nav>
      </div>
      <div id="faq-search" class="relative max-w-xl mx-auto px-4 pb-4" data-mark-class="{{ chrome.mark_class }}">
        <input id="faq-search-input" type="text" autocomplete="off"
          class="w-full pl-4 pr-10 py-3 text-sm border border-slate-300 rounded-lg focus:ring-2 focus:ring-orange-500 bg-white shadow-sm"
          placeholder="{{ search_placeholder }}" aria-label="Search FAQs" />
        <button id="faq-search-clear" type="button" hidden
          class="absolute inset-y-0 right-4 pr-3 text-slate-400 hover:text-slate-600" aria-label="Clear search">&times;</button>
        <div id="faq-search-results"></div>
      </div>
    </header>
    <main class="{{ chrome.main_class }}">
{{ body|safe }}
    </main>
    <script>
      (() => {
        const root = document.getElementById('faq-search');
        const input = document.getElementById('faq-search-input');
        const clear = document.getElementById('faq-search-clear');
        const results = document.getElementById('faq-search-results');
        const markClass = root.dataset.markClass;
        let open = false;
        let catalogue = null;
        let loading = null;
        const load = () => {
          if (!loading) {
            loading = fetch('/api/search/candidates')
              .then((response) => (response.ok ? response.json() : Promise.reject(response.status)))
              .catch(() => ({ minQueryChars: 2, maxResults: 5, candidates: [] }))
              .then((data) => { catalogue = data; render(); });
          }
          return loading;
        };
        const escapeHtml = (text) => text.replace(/[&<>"']/g, (ch) => '&#' + ch.charCodeAt(0) + ';');
        const literal = (term) => term.replace(/[.*+?^$()|[\]\\{}]/g, '\\$&');
        const mark = (text, term) => {
          let out = '';
          let cursor = 0;
          for (const found of text.matchAll(new RegExp(literal(term), 'giu'))) {
            out += escapeHtml(text.slice(cursor, found.index));
            out += '<mark class="' + markClass + '">' + escapeHtml(found[0]) + '</mark>';
            cursor = found.index + found[0].length;
          }
          return out + escapeHtml(text.slice(cursor));
        };
        const render = () => {
          clear.hidden = input.value === '';
          const term = input.value.trim();
          if (!open || !catalogue || Array.from(term).length < catalogue.minQueryChars) {
            results.innerHTML = '';
            return;
          }
          const matcher = new RegExp(literal(term), 'iu');
          const hits = catalogue.candidates
            .filter((c) => matcher.test(c.question) || (c.summary != null && matcher.test(c.summary)))
            .slice(0, catalogue.maxResults);
          const panel = 'absolute top-full left-4 right-4 mt-2 bg-white rounded-lg shadow-xl border border-slate-200 z-50 max-h-80 overflow-y-auto';
          if (hits.length === 0) {
            results.innerHTML = '<div class="' + panel + '" data-overlay-state="open-no-results"><div class="px-4 py-6 text-center">'
              + '<h4 class="font-medium text-slate-800 mb-1 text-sm">No results found</h4>'
              + '<p class="text-xs text-slate-600">No UPF FAQs match "' + escapeHtml(input.value) + '"</p></div></div>';
            return;
          }
          const rows = hits.map((c) => '<a href="/faqs/' + encodeURIComponent(c.locator) + '" class="block px-4 py-2 hover:bg-orange-50">'
            + '<h4 class="font-medium text-slate-800 leading-snug mb-1 text-sm">' + mark(c.question, term) + '</h4>'
            + (c.summary != null ? '<p class="text-xs text-slate-600 line-clamp-2">' + mark(c.summary, term) + '</p>' : '')
            + '</a>').join('');
          const label = 'Found ' + hits.length + ' result' + (hits.length === 1 ? '' : 's');
          results.innerHTML = '<div class="' + panel + '" data-overlay-state="open-results">'
            + '<div class="px-4 py-2 border-b border-slate-100"><p class="text-xs font-medium text-slate-700">' + label + '</p></div>'
            + '<div class="py-1">' + rows + '</div></div>';
        };
        input.addEventListener('focus', () => { open = true; load(); render(); });
        input.addEventListener('input', () => { open = true; load(); render(); });
        clear.addEventListener('click', () => { input.value = ''; open = true; input.focus(); render(); });
        results.addEventListener('click', (event) => {
          if (event.target.closest('a')) { input.value = ''; open = false; }
        });
        document.addEventListener('click', (event) => {
          if (open && !root.contains(event.target)) { open = false; render(); }
        });
      })();
    </script>
  </body>
</html>"#,
    ext = "html"
)]
struct LayoutTemplate<'a> {
    chrome: Chrome,
    site_title: &'a str,
    title: String,
    description: String,
    canonical_url: String,
    json_ld: Option<String>,
    search_placeholder: &'static str,
    body: String,
}

#[derive(Template)]
#[template(
    source = r#"<ul class="space-y-4 list-none">
{% for card in cards %}
  <li class="{{ chrome.card_class }}">
    <a href="{{ card.href }}" class="block space-y-3">
      <img src="{{ card.image_url }}" alt="{{ card.image_alt }}" width="640" height="360" loading="lazy" class="w-full rounded-md object-cover" />
      <h2 class="text-xl font-semibold hover:text-orange-700">{{ card.question }}</h2>
    </a>
    {% if let Some(summary) = card.summary %}
    <p class="text-slate-600">{{ summary }}</p>
    {% endif %}
    <p class="{{ chrome.muted_class }}">
      {% if let Some(author) = card.author %}By <a href="{{ author.href }}" class="font-medium text-orange-700">{{ author.name }}</a>{% endif %}
      {% if let Some(date) = card.published %}<time>{{ date }}</time>{% endif %}
    </p>
    {% if !card.tags.is_empty() %}
    <div class="flex flex-wrap gap-2">
      {% for tag in card.tags %}<a href="{{ tag.href }}" class="{{ chrome.tag_class }}">{{ tag.label }}</a>{% endfor %}
    </div>
    {% endif %}
  </li>
{% endfor %}
</ul>"#,
    ext = "html"
)]
struct CardsTemplate {
    chrome: Chrome,
    cards: Vec<FaqCard>,
}

#[derive(Template)]
#[template(
    source = r#"<section class="text-center space-y-3">
  <p class="{{ chrome.eyebrow_class }}">Ultra-processed food, explained</p>
  <h1 class="{{ chrome.headline_class }}">{{ site.title }}</h1>
  <p class="{{ chrome.lede_class }}">{{ site.description }}</p>
</section>
<section class="space-y-4">
  <h2 class="text-2xl font-bold">Latest questions</h2>
  {{ cards|safe }}
  <a href="/faqs" class="{{ chrome.button_class }}">Browse all FAQs</a>
</section>"#,
    ext = "html"
)]
struct HomeTemplate<'a> {
    chrome: Chrome,
    site: &'a SiteSettings,
    cards: String,
}

#[derive(Template)]
#[template(
    source = r#"<section class="space-y-2">
  <p class="{{ chrome.eyebrow_class }}">{{ eyebrow }}</p>
  <h1 class="{{ chrome.headline_class }}">{{ headline }}</h1>
  <p class="{{ chrome.lede_class }}">{{ lede }}</p>
</section>
{{ cards|safe }}"#,
    ext = "html"
)]
struct ListingTemplate {
    chrome: Chrome,
    eyebrow: &'static str,
    headline: String,
    lede: String,
    cards: String,
}

#[derive(Template)]
#[template(
    source = r#"<article class="{{ chrome.card_class }}">
  <nav class="{{ chrome.muted_class }}" aria-label="Breadcrumb"><a href="/">Home</a> / <a href="/faqs">FAQs</a></nav>
  {% if let Some(category) = category %}<p class="{{ chrome.eyebrow_class }}">{{ category }}</p>{% endif %}
  <h1 class="{{ chrome.headline_class }} faq-question">{{ faq.question }}</h1>
  <p class="{{ chrome.muted_class }}">
    {% if let Some(author) = author %}By <a href="{{ author.href }}" class="font-medium text-orange-700">{{ author.name }}</a>{% if let Some(job) = author.job_title %}, {{ job }}{% endif %}{% endif %}
    {% if let Some(date) = published %}<time>Published {{ date }}</time>{% endif %}
    {% if let Some(date) = updated %}<time>Updated {{ date }}</time>{% endif %}
  </p>
  {% if let Some(url) = image_url %}
  <figure>
    <img src="{{ url }}" alt="{{ image_alt }}" width="1200" height="600" class="w-full rounded-md" />
    {% if let Some(caption) = image_caption %}<figcaption class="{{ chrome.muted_class }}">{{ caption }}</figcaption>{% endif %}
  </figure>
  {% endif %}
  {% if let Some(summary) = summary %}
  <p class="{{ chrome.lede_class }} faq-summary">{{ summary }}</p>
  {% endif %}
  <div class="{{ chrome.prose_class }} faq-answer">
    {% if let Some(html) = answer_html %}{{ html|safe }}{% else %}<p>An answer is on its way.</p>{% endif %}
  </div>
  {% if !faq.alternate_questions.is_empty() %}
  <section>
    <h2 class="text-lg font-semibold">Also asked as</h2>
    <ul class="list-disc pl-6">{% for question in faq.alternate_questions %}<li>{{ question }}</li>{% endfor %}</ul>
  </section>
  {% endif %}
  {% if !tags.is_empty() %}
  <div class="flex flex-wrap gap-2">
    {% for tag in tags %}<a href="{{ tag.href }}" class="{{ chrome.tag_class }}">{{ tag.label }}</a>{% endfor %}
  </div>
  {% endif %}
</article>
{% if !related.is_empty() %}
<section class="space-y-3">
  <h2 class="text-2xl font-bold">Related questions</h2>
  <ul class="space-y-2">
    {% for link in related %}<li><a href="{{ link.href }}" class="text-orange-700 hover:underline">{{ link.question }}</a></li>{% endfor %}
  </ul>
</section>
{% endif %}"#,
    ext = "html"
)]
struct FaqTemplate<'a> {
    chrome: Chrome,
    faq: &'a Faq,
    summary: Option<&'a str>,
    answer_html: Option<String>,
    image_url: Option<String>,
    image_alt: &'a str,
    image_caption: Option<&'a str>,
    published: Option<String>,
    updated: Option<String>,
    author: Option<AuthorLink>,
    category: Option<&'a str>,
    tags: Vec<TagLink>,
    related: Vec<RelatedLink>,
}

#[derive(Template)]
#[template(
    source = r#"<section class="{{ chrome.card_class }} flex flex-col md:flex-row gap-6">
  <img src="{{ image_url }}" alt="{{ author.name }}" width="200" height="200" class="rounded-full w-40 h-40 object-cover" />
  <div class="space-y-3">
    <p class="{{ chrome.eyebrow_class }}">Author</p>
    <h1 class="{{ chrome.headline_class }}">{{ author.name }}</h1>
    {% if let Some(job) = job_title %}<p class="{{ chrome.lede_class }}">{{ job }}</p>{% endif %}
    {% if let Some(html) = bio_html %}<div class="{{ chrome.prose_class }}">{{ html|safe }}</div>{% endif %}
    {% if !author.expertise.is_empty() %}
    <div class="flex flex-wrap gap-2">
      {% for area in author.expertise %}<span class="{{ chrome.tag_class }}">{{ area }}</span>{% endfor %}
    </div>
    {% endif %}
    {% if !links.is_empty() %}
    <p class="flex gap-4 text-sm font-semibold">
      {% for link in links %}<a href="{{ link.href }}" rel="me noopener" class="text-orange-700">{{ link.label }}</a>{% endfor %}
    </p>
    {% endif %}
  </div>
</section>
<section class="space-y-4">
  <h2 class="text-2xl font-bold">Questions answered ({{ faq_count }})</h2>
  {% if faq_count == 0 %}<p class="{{ chrome.muted_class }}">No published answers yet.</p>{% else %}{{ cards|safe }}{% endif %}
</section>"#,
    ext = "html"
)]
struct AuthorTemplate<'a> {
    chrome: Chrome,
    author: &'a Author,
    job_title: Option<&'a str>,
    image_url: String,
    bio_html: Option<String>,
    links: Vec<ExternalLink>,
    faq_count: usize,
    cards: String,
}

struct OverlayRow<'a> {
    href: String,
    question: &'a [Segment<'a>],
    summary: Option<&'a [Segment<'a>]>,
}

#[derive(Template)]
#[template(
    source = r#"<div class="absolute top-full left-4 right-4 mt-2 bg-white rounded-lg shadow-xl border border-slate-200 z-50 max-h-80 overflow-y-auto" data-overlay-state="{{ state }}"{% if !shows_dropdown %} hidden{% endif %}>
{% if shows_dropdown %}
{% if rows.is_empty() %}
  <div class="px-4 py-6 text-center">
    <h4 class="font-medium text-slate-800 mb-1 text-sm">No results found</h4>
    <p class="text-xs text-slate-600">No UPF FAQs match "{{ query }}"</p>
  </div>
{% else %}
  <div class="px-4 py-2 border-b border-slate-100"><p class="text-xs font-medium text-slate-700">{{ label }}</p></div>
  <div class="py-1">
  {% for row in rows %}
    <a href="{{ row.href }}" class="block px-4 py-2 hover:bg-orange-50">
      <h4 class="font-medium text-slate-800 leading-snug mb-1 text-sm">{% for segment in row.question %}{% if segment.is_match() %}<mark class="{{ mark_class }}">{{ segment.text }}</mark>{% else %}{{ segment.text }}{% endif %}{% endfor %}</h4>
      {% if let Some(summary) = row.summary %}
      <p class="text-xs text-slate-600 line-clamp-2">{% for segment in summary %}{% if segment.is_match() %}<mark class="{{ mark_class }}">{{ segment.text }}</mark>{% else %}{{ segment.text }}{% endif %}{% endfor %}</p>
      {% endif %}
    </a>
  {% endfor %}
  </div>
{% endif %}
{% endif %}
</div>"#,
    ext = "html"
)]
struct OverlayTemplate<'a> {
    state: String,
    shows_dropdown: bool,
    query: &'a str,
    label: String,
    mark_class: &'static str,
    rows: Vec<OverlayRow<'a>>,
}

impl<'a> OverlayTemplate<'a> {
    fn from_view(view: &'a OverlayView<'a>) -> Self {
        let rows = view
            .results
            .iter()
            .map(|result| OverlayRow {
                href: format!(
                    "/search/select?q={}&id={}",
                    encode_component(view.query),
                    encode_component(result.id)
                ),
                question: &result.question,
                summary: result.summary.as_deref(),
            })
            .collect();
        Self {
            state: view.state.to_string(),
            shows_dropdown: view.shows_dropdown(),
            query: view.query,
            label: view.result_label(),
            mark_class: CHROME.mark_class,
            rows,
        }
    }
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>UPF FAQs - {{ title }}</title>
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
  </head>
  <body class="{{ chrome.body_class }}">
    <main class="{{ chrome.main_class }}">
      <div class="{{ chrome.card_class }}">
        <p class="{{ chrome.eyebrow_class }}">Error {{ status }}</p>
        <h1 class="{{ chrome.headline_class }}">{{ title }}</h1>
        <p class="{{ chrome.lede_class }}">{{ message }}</p>
        <a href="/" class="{{ chrome.button_class }}">Back to home</a>
      </div>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct ErrorTemplate<'a> {
    chrome: Chrome,
    status: u16,
    title: &'static str,
    message: &'a str,
}
