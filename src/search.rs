//! Search-as-you-type primitives: candidate matching and match highlighting.
//!
//! Both functions are total over their inputs and cheap enough to run on every
//! keystroke against the full FAQ list.

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::debug;

use crate::model::{Candidate, SearchFaq};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Trimmed queries shorter than this never match anything.
    pub min_query_chars: usize,
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_chars: 2,
            max_results: 5,
        }
    }
}

impl SearchConfig {
    /// Whether `query` is long enough to be matched at all.
    pub fn accepts(&self, query: &str) -> bool {
        query.trim().chars().count() >= self.min_query_chars
    }
}

/// Case-insensitive literal matcher shared by the filter and the highlighter,
/// so every matched candidate has at least one highlighted run.
fn literal_matcher(term: &str) -> Option<Regex> {
    match RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
    {
        Ok(pattern) => Some(pattern),
        Err(err) => {
            // An escaped literal only fails to compile when it exceeds the size limit.
            debug!(%err, "search term rejected");
            None
        }
    }
}

/// Returns the candidates whose question or summary contains `query`,
/// ignoring case, in input order and capped at `config.max_results`.
///
/// Candidates without an identifier, slug or question are skipped.
pub fn match_candidates<'a>(
    candidates: &'a [SearchFaq],
    query: &str,
    config: &SearchConfig,
) -> Vec<Candidate<'a>> {
    if !config.accepts(query) {
        return Vec::new();
    }
    let Some(pattern) = literal_matcher(query.trim()) else {
        return Vec::new();
    };
    candidates
        .iter()
        .filter_map(|faq| {
            let candidate = faq.validate();
            if candidate.is_none() {
                debug!(id = ?faq.id, "skipping search candidate without id, slug or question");
            }
            candidate
        })
        .filter(|candidate| {
            pattern.is_match(candidate.question)
                || candidate
                    .summary
                    .is_some_and(|summary| pattern.is_match(summary))
        })
        .take(config.max_results)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Plain,
    Matched,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment<'a> {
    pub kind: SegmentKind,
    pub text: &'a str,
}

impl<'a> Segment<'a> {
    pub fn plain(text: &'a str) -> Self {
        Self {
            kind: SegmentKind::Plain,
            text,
        }
    }

    pub fn matched(text: &'a str) -> Self {
        Self {
            kind: SegmentKind::Matched,
            text,
        }
    }

    pub fn is_match(&self) -> bool {
        self.kind == SegmentKind::Matched
    }
}

/// Splits `text` into plain and matched runs for every case-insensitive,
/// non-overlapping occurrence of `term`, scanning left to right.
///
/// The term is matched literally. Matched runs borrow from `text`, so they
/// keep the source casing, and concatenating all runs yields `text` again.
pub fn highlight<'a>(text: &'a str, term: &str) -> Vec<Segment<'a>> {
    if term.is_empty() || text.is_empty() {
        return vec![Segment::plain(text)];
    }
    let Some(pattern) = literal_matcher(term) else {
        return vec![Segment::plain(text)];
    };

    let mut segments = Vec::new();
    let mut cursor = 0;
    for found in pattern.find_iter(text) {
        if found.start() > cursor {
            segments.push(Segment::plain(&text[cursor..found.start()]));
        }
        segments.push(Segment::matched(found.as_str()));
        cursor = found.end();
    }
    if cursor < text.len() || segments.is_empty() {
        segments.push(Segment::plain(&text[cursor..]));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Slug;

    fn concat(segments: &[Segment<'_>]) -> String {
        segments.iter().map(|s| s.text).collect()
    }

    fn matched(segments: &[Segment<'_>]) -> Vec<String> {
        segments
            .iter()
            .filter(|s| s.is_match())
            .map(|s| s.text.to_string())
            .collect()
    }

    fn sample() -> Vec<SearchFaq> {
        vec![
            SearchFaq::new("1", "Is sugar a UPF?", "is-sugar-a-upf", Some("Yes, often.")),
            SearchFaq::new("2", "Are additives safe?", "are-additives-safe", Some("Depends.")),
        ]
    }

    #[test]
    fn short_queries_match_nothing() {
        let faqs = sample();
        let config = SearchConfig::default();
        for query in ["", " ", "a", "  s  ", "\t?\n"] {
            assert!(
                match_candidates(&faqs, query, &config).is_empty(),
                "query {query:?} should not match"
            );
        }
    }

    #[test]
    fn matches_question_or_summary_case_insensitively() {
        let faqs = sample();
        let config = SearchConfig::default();
        let hits = match_candidates(&faqs, "SUGAR", &config);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "1");

        let hits = match_candidates(&faqs, "depends", &config);
        assert_eq!(hits.iter().map(|c| c.id).collect::<Vec<_>>(), vec!["2"]);

        assert!(match_candidates(&faqs, "zz", &config).is_empty());
    }

    #[test]
    fn query_is_trimmed_before_matching() {
        let faqs = sample();
        let hits = match_candidates(&faqs, "  sugar ", &SearchConfig::default());
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn results_are_capped_and_keep_input_order() {
        let faqs: Vec<_> = (0..12)
            .map(|i| SearchFaq::new(format!("{i}"), format!("Question {i} about oils"), format!("q-{i}"), None))
            .collect();
        let hits = match_candidates(&faqs, "oils", &SearchConfig::default());
        assert_eq!(
            hits.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec!["0", "1", "2", "3", "4"]
        );
    }

    #[test]
    fn malformed_candidates_are_excluded() {
        let mut faqs = sample();
        faqs.insert(
            0,
            SearchFaq {
                id: Some("broken".to_string()),
                question: Some("Is sugar bad?".to_string()),
                slug: Some(Slug { current: None }),
                summary: None,
            },
        );
        faqs.push(SearchFaq {
            id: None,
            question: Some("More sugar".to_string()),
            slug: Some(Slug::new("more-sugar")),
            summary: None,
        });
        faqs.push(SearchFaq::default());
        let hits = match_candidates(&faqs, "sugar", &SearchConfig::default());
        assert_eq!(hits.iter().map(|c| c.id).collect::<Vec<_>>(), vec!["1"]);
    }

    #[test]
    fn every_match_has_a_highlighted_run() {
        let faqs = vec![
            SearchFaq::new("1", "ΠΡΟΣ ΤΙ ΤΡΩΜΕ;", "pros-ti", None),
            SearchFaq::new("2", "Crème fraîche", "creme", Some("Cultured CRÈME.")),
        ];
        let config = SearchConfig::default();
        for query in ["οσ", "ΟΣ", "crème", "CRÈME"] {
            let hits = match_candidates(&faqs, query, &config);
            assert!(!hits.is_empty(), "query {query:?} should match");
            for hit in hits {
                let marked = highlight(hit.question, query)
                    .iter()
                    .any(Segment::is_match)
                    || hit
                        .summary
                        .is_some_and(|s| highlight(s, query).iter().any(Segment::is_match));
                assert!(marked, "query {query:?} matched {} without a highlight", hit.id);
            }
        }
    }

    #[test]
    fn empty_candidate_list_is_fine() {
        assert!(match_candidates(&[], "sugar", &SearchConfig::default()).is_empty());
    }

    #[test]
    fn highlight_preserves_source_casing() {
        let segments = highlight("I love APPLE pie", "apple");
        assert_eq!(
            segments,
            vec![
                Segment::plain("I love "),
                Segment::matched("APPLE"),
                Segment::plain(" pie"),
            ]
        );
    }

    #[test]
    fn highlight_treats_term_literally() {
        let segments = highlight("Learn C++ basics", "C++");
        assert_eq!(matched(&segments), vec!["C++"]);
        assert_eq!(concat(&segments), "Learn C++ basics");

        let segments = highlight("Is (a|b) [x]? 100% .*", "(a|b) [x]?");
        assert_eq!(matched(&segments), vec!["(a|b) [x]?"]);
    }

    #[test]
    fn highlight_marks_every_occurrence_leftmost_first() {
        let segments = highlight("Sugar, sugar and SUGAR", "sugar");
        assert_eq!(matched(&segments), vec!["Sugar", "sugar", "SUGAR"]);
        assert_eq!(concat(&segments), "Sugar, sugar and SUGAR");

        let segments = highlight("aaaa", "aa");
        assert_eq!(
            segments,
            vec![Segment::matched("aa"), Segment::matched("aa")]
        );

        let segments = highlight("aaa", "aa");
        assert_eq!(segments, vec![Segment::matched("aa"), Segment::plain("a")]);
    }

    #[test]
    fn highlight_empty_inputs_return_single_plain_segment() {
        assert_eq!(highlight("text", ""), vec![Segment::plain("text")]);
        assert_eq!(highlight("", "term"), vec![Segment::plain("")]);
        assert_eq!(highlight("no hit here", "zz"), vec![Segment::plain("no hit here")]);
    }

    #[test]
    fn highlight_is_lossless_for_unicode_text() {
        let text = "Crème brûlée: CRÈME or crème?";
        let segments = highlight(text, "crème");
        assert_eq!(concat(&segments), text);
        assert_eq!(matched(&segments), vec!["Crème", "CRÈME", "crème"]);
    }
}
