use once_cell::sync::Lazy;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use regex::Regex;

/// Characters `encodeURIComponent` leaves alone, so links match the ones browsers build.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

pub fn faq_path(slug: &str) -> String {
    format!("/faqs/{}", encode_component(slug))
}

pub fn author_path(slug: &str) -> String {
    format!("/authors/{}", encode_component(slug))
}

/// Archive path for a keyword: lowercased, whitespace runs collapsed to `-`.
pub fn tag_path(keyword: &str) -> String {
    format!("/tags/{}", encode_component(&tag_slug(keyword)))
}

pub fn tag_slug(keyword: &str) -> String {
    WHITESPACE
        .replace_all(&keyword.trim().to_lowercase(), "-")
        .into_owned()
}

/// Turns a tag path segment back into the keyword as authored in the CMS:
/// `gut-health` becomes `Gut Health`.
pub fn display_tag(segment: &str) -> String {
    let decoded = percent_decode_str(segment).decode_utf8_lossy();
    let mut out = String::with_capacity(decoded.len());
    let mut previous_is_word = false;
    for ch in decoded.chars() {
        let ch = if ch == '-' { ' ' } else { ch };
        let is_word = ch.is_alphanumeric() || ch == '_';
        if is_word && !previous_is_word {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        previous_is_word = is_word;
    }
    out
}

pub fn absolute(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
