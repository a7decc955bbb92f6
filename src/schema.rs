//! schema.org JSON-LD for every page type.
//!
//! Builders return `serde_json::Value`; [`to_script_body`] turns one into text
//! that is safe inside a `<script type="application/ld+json">` element.

use serde_json::{Value, json};
use tracing::warn;

use crate::image::ImageUrlBuilder;
use crate::links::{absolute, author_path, faq_path, tag_path};
use crate::model::{Author, Faq, SiteSettings, display_date};
use crate::portable_text::{to_plain_text, truncate_chars};

const LANGUAGE: &str = "en-US";
const ANSWER_EXCERPT_CHARS: usize = 300;
const TAG_PAGE_QUESTIONS: usize = 10;
const SPEAKABLE_SELECTORS: [&str; 3] = ["h1", ".faq-question", ".faq-answer"];

fn organization_ref(base: &str) -> Value {
    json!({ "@type": "Organization", "@id": format!("{base}/#organization") })
}

fn website_ref(site: &SiteSettings) -> Value {
    let base = site.base_url();
    json!({
        "@type": "WebSite",
        "@id": format!("{base}/#website"),
        "url": base,
        "name": site.title,
    })
}

fn person_id(base: &str, slug: &str) -> String {
    format!("{}#person", absolute(base, &author_path(slug)))
}

fn image_object(url: String, width: u32, height: u32) -> Value {
    json!({ "@type": "ImageObject", "url": url, "width": width, "height": height })
}

fn faq_description(faq: &Faq) -> String {
    faq.meta_description()
        .or(faq.summary())
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!(
                "Expert answer about ultra-processed foods: {}",
                faq.question
            )
        })
}

/// The full FAQ page graph: FAQPage, Article, WebPage, author Person,
/// WebSite and Organization.
///
/// A FAQ's `customSchemaMarkup` replaces the generated graph when it parses
/// as JSON.
pub fn faq_page(faq: &Faq, site: &SiteSettings, images: &ImageUrlBuilder) -> Value {
    if let Some(custom) = faq
        .custom_schema_markup
        .as_deref()
        .filter(|raw| !raw.trim().is_empty())
    {
        match serde_json::from_str::<Value>(custom) {
            Ok(value) => return value,
            Err(err) => warn!(faq = %faq.id, %err, "ignoring invalid custom schema markup"),
        }
    }

    let base = site.base_url();
    let page_url = absolute(base, &faq_path(faq.slug().unwrap_or_default()));
    let title = faq.meta_title().unwrap_or(&faq.question);
    let description = faq_description(faq);
    let published = faq.published_at.as_deref();
    let modified = faq.modified_at();
    let answer_text = faq.summary().map(str::to_string).unwrap_or_else(|| {
        truncate_chars(&to_plain_text(&faq.answer), ANSWER_EXCERPT_CHARS)
    });
    let author = faq.author.as_ref().filter(|author| author.slug().is_some());
    let author_ref = author.and_then(Author::slug).map(|slug| {
        json!({ "@type": "Person", "@id": person_id(base, slug) })
    });
    let featured_image = images.cropped(faq.image.as_ref(), 1200, 600);

    let mut accepted_answer = json!({
        "@type": "Answer",
        "@id": format!("{page_url}#answer1"),
        "text": answer_text,
        "dateCreated": published,
        "dateModified": modified,
        "url": format!("{page_url}#answer1"),
    });
    if let Some(author_ref) = &author_ref {
        accepted_answer["author"] = author_ref.clone();
    }

    let faq_page = json!({
        "@type": "FAQPage",
        "@id": format!("{page_url}#faqpage"),
        "url": page_url,
        "name": title,
        "description": description,
        "inLanguage": LANGUAGE,
        "datePublished": published,
        "dateModified": modified,
        "publisher": organization_ref(base),
        "mainEntity": [{
            "@type": "Question",
            "@id": format!("{page_url}#question1"),
            "name": faq.question,
            "text": faq.question,
            "answerCount": 1,
            "acceptedAnswer": accepted_answer,
        }],
        "speakable": { "@type": "SpeakableSpecification", "cssSelector": SPEAKABLE_SELECTORS },
    });

    let mut article = json!({
        "@type": "Article",
        "@id": format!("{page_url}#article"),
        "headline": title,
        "alternativeHeadline": faq.alternate_questions.first().unwrap_or(&faq.question),
        "description": description,
        "publisher": organization_ref(base),
        "datePublished": published,
        "dateModified": modified,
        "mainEntityOfPage": { "@type": "WebPage", "@id": format!("{page_url}#webpage") },
        "articleSection": "FAQ",
        "inLanguage": LANGUAGE,
        "about": [
            { "@type": "Thing", "name": "Ultra-Processed Foods", "sameAs": "https://en.wikipedia.org/wiki/Ultra-processed_food" },
            { "@type": "Thing", "name": "Food Science", "sameAs": "https://en.wikipedia.org/wiki/Food_science" }
        ],
    });
    if let Some(url) = &featured_image {
        let caption = faq
            .image
            .as_ref()
            .and_then(|image| image.caption().or(image.alt()))
            .unwrap_or(&faq.question);
        let mut image = image_object(url.clone(), 1200, 600);
        image["caption"] = json!(caption);
        article["image"] = image;
    }
    if let Some(author_ref) = &author_ref {
        article["author"] = author_ref.clone();
    }
    if let Some(author) = author {
        let date = published
            .map(|raw| display_date(raw).unwrap_or_else(|| raw.to_string()))
            .unwrap_or_default();
        article["citation"] = json!({
            "@type": "CreativeWork",
            "text": format!(
                "{}. \"{}\" {}, {}. {}",
                author.name, faq.question, site.organization.name, date, page_url
            ),
        });
    }

    let mut web_page = json!({
        "@type": "WebPage",
        "@id": format!("{page_url}#webpage"),
        "url": page_url,
        "name": format!("{title} - {}", site.title),
        "description": description,
        "inLanguage": LANGUAGE,
        "isPartOf": { "@type": "WebSite", "@id": format!("{base}/#website") },
        "datePublished": published,
        "dateModified": modified,
        "breadcrumb": breadcrumbs(base, &[("FAQs", format!("{base}/faqs")), (faq.question.as_str(), page_url.clone())]),
        "speakable": { "@type": "SpeakableSpecification", "cssSelector": SPEAKABLE_SELECTORS },
    });
    if let Some(url) = &featured_image {
        web_page["primaryImageOfPage"] = image_object(url.clone(), 1200, 600);
    }

    let mut graph = vec![faq_page, article, web_page];
    if let Some(author) = author {
        graph.push(person(author, site, images, 200));
    }
    graph.push(website(site));
    graph.push(organization(site, images));

    json!({ "@context": "https://schema.org", "@graph": graph })
}

fn breadcrumbs(base: &str, trail: &[(&str, String)]) -> Value {
    let mut items = vec![json!({ "@type": "ListItem", "position": 1, "name": "Home", "item": base })];
    for (idx, (name, url)) in trail.iter().enumerate() {
        items.push(json!({
            "@type": "ListItem",
            "position": idx + 2,
            "name": name,
            "item": url,
        }));
    }
    json!({ "@type": "BreadcrumbList", "itemListElement": items })
}

fn person(author: &Author, site: &SiteSettings, images: &ImageUrlBuilder, image_size: u32) -> Value {
    let base = site.base_url();
    let slug = author.slug().unwrap_or_default();
    let mut node = json!({
        "@type": "Person",
        "@id": person_id(base, slug),
        "name": author.name,
        "url": absolute(base, &author_path(slug)),
    });
    if let Some(job_title) = author.job_title() {
        node["jobTitle"] = json!(job_title);
    }
    if !author.expertise.is_empty() {
        node["knowsAbout"] = json!(author.expertise);
    }
    if let Some(url) = images.cropped(author.image.as_ref(), image_size, image_size) {
        node["image"] = image_object(url, image_size, image_size);
    }
    let same_as = author
        .social_media
        .as_ref()
        .map(|social| social.same_as())
        .unwrap_or_default();
    if !same_as.is_empty() {
        node["sameAs"] = json!(same_as);
    }
    node
}

/// The site's WebSite node, with a SearchAction when a search URL is configured.
pub fn website(site: &SiteSettings) -> Value {
    let base = site.base_url();
    let mut node = json!({
        "@type": "WebSite",
        "@id": format!("{base}/#website"),
        "name": site.title,
        "description": site.description,
        "url": base,
        "publisher": organization_ref(base),
    });
    if let Some(target) = site.search_url() {
        node["potentialAction"] = json!({
            "@type": "SearchAction",
            "target": target,
            "query-input": "required name=search_term_string",
        });
    }
    node
}

pub fn organization(site: &SiteSettings, images: &ImageUrlBuilder) -> Value {
    let base = site.base_url();
    let org = &site.organization;
    let mut node = json!({
        "@type": "Organization",
        "@id": format!("{base}/#organization"),
        "name": org.name,
        "url": base,
        "description": site.description,
    });
    if let Some(alternate) = org.alternate_name.as_deref().filter(|s| !s.is_empty()) {
        node["alternateName"] = json!(alternate);
    }
    if let Some(url) = images.cropped(site.logo.as_ref(), 200, 60) {
        node["logo"] = image_object(url, 200, 60);
    }
    if let Some(founded) = org.founding_date.as_deref().filter(|s| !s.is_empty()) {
        node["foundingDate"] = json!(founded);
    }
    if let Some(area) = org.area_served.as_deref().filter(|s| !s.is_empty()) {
        node["areaServed"] = json!(area);
    }
    if !org.knows_about.is_empty() {
        node["knowsAbout"] = json!(org.knows_about);
    }
    let same_as = site
        .social_media
        .as_ref()
        .map(|social| social.same_as())
        .unwrap_or_default();
    if !same_as.is_empty() {
        node["sameAs"] = json!(same_as);
    }
    node
}

/// Home page graph: the WebSite and its publishing Organization.
pub fn home_page(site: &SiteSettings, images: &ImageUrlBuilder) -> Value {
    json!({
        "@context": "https://schema.org",
        "@graph": [website(site), organization(site, images)],
    })
}

/// CollectionPage for a tag archive, listing the first ten questions.
pub fn tag_collection_page(display_tag: &str, faqs: &[Faq], site: &SiteSettings) -> Value {
    let base = site.base_url();
    let page_url = absolute(base, &tag_path(display_tag));
    let questions = faqs
        .iter()
        .filter_map(|faq| faq.slug().map(|slug| (faq, slug)))
        .take(TAG_PAGE_QUESTIONS)
        .map(|(faq, slug)| {
            json!({
                "@type": "Question",
                "name": faq.question,
                "url": absolute(base, &faq_path(slug)),
                "acceptedAnswer": {
                    "@type": "Answer",
                    "text": faq.summary().unwrap_or("Detailed answer available on the page."),
                },
            })
        })
        .collect::<Vec<_>>();
    json!({
        "@context": "https://schema.org",
        "@type": "CollectionPage",
        "@id": page_url,
        "url": page_url,
        "name": format!("{display_tag} - {}", site.title),
        "description": format!(
            "All UPF FAQ questions and answers about {display_tag}. Find comprehensive information about ultra-processed foods related to {display_tag}."
        ),
        "inLanguage": LANGUAGE,
        "isPartOf": website_ref(site),
        "mainEntity": questions,
    })
}

/// ProfilePage for an author biography.
pub fn author_profile_page(author: &Author, site: &SiteSettings, images: &ImageUrlBuilder) -> Value {
    let base = site.base_url();
    let page_url = absolute(base, &author_path(author.slug().unwrap_or_default()));
    json!({
        "@context": "https://schema.org",
        "@type": "ProfilePage",
        "@id": page_url,
        "url": page_url,
        "name": format!("{} - {} Author", author.name, site.title),
        "description": format!(
            "Learn about {}, {} at {}. Read their ultra-processed food questions and answers.",
            author.name,
            author.job_title().unwrap_or("contributor"),
            site.title
        ),
        "inLanguage": LANGUAGE,
        "isPartOf": website_ref(site),
        "mainEntity": person(author, site, images, 400),
    })
}

/// Pretty JSON with `<`, `>` and `&` escaped so the payload cannot close the
/// surrounding script element.
pub fn to_script_body(value: &Value) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|_| "{}".to_string())
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}
