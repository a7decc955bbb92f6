//! The search box dropdown as an explicit state machine.
//!
//! A host owns one [`SearchOverlay`] per mounted search box, feeds it focus,
//! input, selection, clear and outside-click events, and renders
//! [`SearchOverlay::view`]. Results are recomputed from the candidate list on
//! demand and never cached.

use std::fmt;

use serde::Serialize;

use crate::model::{Candidate, SearchFaq};
use crate::search::{SearchConfig, Segment, highlight, match_candidates};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayState {
    Closed,
    /// Open while the trimmed query is too short to search.
    OpenEmpty,
    OpenResults,
    OpenNoResults,
}

impl OverlayState {
    pub fn is_open(self) -> bool {
        self != OverlayState::Closed
    }
}

impl fmt::Display for OverlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlayState::Closed => write!(f, "closed"),
            OverlayState::OpenEmpty => write!(f, "open-empty"),
            OverlayState::OpenResults => write!(f, "open-results"),
            OverlayState::OpenNoResults => write!(f, "open-no-results"),
        }
    }
}

/// Emitted when a result is selected; the host performs the page transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationRequest {
    pub candidate_id: String,
    pub locator: String,
}

#[derive(Debug, Clone)]
pub struct SearchOverlay {
    candidates: Vec<SearchFaq>,
    config: SearchConfig,
    query: String,
    open: bool,
}

impl SearchOverlay {
    pub fn new(candidates: Vec<SearchFaq>, config: SearchConfig) -> Self {
        Self {
            candidates,
            config,
            query: String::new(),
            open: false,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn candidates(&self) -> &[SearchFaq] {
        &self.candidates
    }

    pub fn state(&self) -> OverlayState {
        self.state_with(self.results().len())
    }

    fn state_with(&self, result_count: usize) -> OverlayState {
        if !self.open {
            OverlayState::Closed
        } else if !self.config.accepts(&self.query) {
            OverlayState::OpenEmpty
        } else if result_count == 0 {
            OverlayState::OpenNoResults
        } else {
            OverlayState::OpenResults
        }
    }

    pub fn results(&self) -> Vec<Candidate<'_>> {
        match_candidates(&self.candidates, &self.query, &self.config)
    }

    pub fn focus(&mut self) -> OverlayState {
        self.open = true;
        self.state()
    }

    /// Replaces the query with the current input value and opens the dropdown.
    pub fn input(&mut self, text: impl Into<String>) -> OverlayState {
        self.query = text.into();
        self.open = true;
        self.state()
    }

    /// Selects the result with `candidate_id`. Ids that are not among the
    /// current results are ignored.
    pub fn select(&mut self, candidate_id: &str) -> Option<NavigationRequest> {
        if !self.open {
            return None;
        }
        let request = self
            .results()
            .into_iter()
            .find(|candidate| candidate.id == candidate_id)
            .map(|candidate| NavigationRequest {
                candidate_id: candidate.id.to_string(),
                locator: candidate.locator.to_string(),
            })?;
        self.query.clear();
        self.open = false;
        Some(request)
    }

    pub fn clear(&mut self) -> OverlayState {
        self.query.clear();
        self.open = true;
        self.state()
    }

    /// Dismisses the dropdown without touching the query.
    pub fn click_outside(&mut self) -> OverlayState {
        self.open = false;
        self.state()
    }

    pub fn view(&self) -> OverlayView<'_> {
        let term = self.query.trim();
        let results = self
            .results()
            .into_iter()
            .map(|candidate| ResultView {
                id: candidate.id,
                locator: candidate.locator,
                question: highlight(candidate.question, term),
                summary: candidate.summary.map(|summary| highlight(summary, term)),
            })
            .collect::<Vec<_>>();
        OverlayView {
            state: self.state_with(results.len()),
            query: &self.query,
            results,
        }
    }
}

/// Everything needed to draw the dropdown for one state.
#[derive(Debug, Clone, Serialize)]
pub struct OverlayView<'a> {
    pub state: OverlayState,
    pub query: &'a str,
    pub results: Vec<ResultView<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultView<'a> {
    pub id: &'a str,
    pub locator: &'a str,
    pub question: Vec<Segment<'a>>,
    pub summary: Option<Vec<Segment<'a>>>,
}

impl OverlayView<'_> {
    pub fn shows_dropdown(&self) -> bool {
        matches!(
            self.state,
            OverlayState::OpenResults | OverlayState::OpenNoResults
        )
    }

    /// "Found 1 result" / "Found 3 results".
    pub fn result_label(&self) -> String {
        let count = self.results.len();
        format!("Found {count} result{}", if count == 1 { "" } else { "s" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay() -> SearchOverlay {
        SearchOverlay::new(
            vec![
                SearchFaq::new("1", "Is sugar a UPF?", "is-sugar-a-upf", Some("Yes, often.")),
                SearchFaq::new("2", "Are additives safe?", "are-additives-safe", Some("Depends.")),
            ],
            SearchConfig::default(),
        )
    }

    #[test]
    fn starts_closed_and_focus_opens_empty() {
        let mut overlay = overlay();
        assert_eq!(overlay.state(), OverlayState::Closed);
        assert_eq!(overlay.focus(), OverlayState::OpenEmpty);
    }

    #[test]
    fn typing_moves_between_open_states() {
        let mut overlay = overlay();
        assert_eq!(overlay.input("sugar"), OverlayState::OpenResults);
        assert_eq!(
            overlay.results().iter().map(|c| c.id).collect::<Vec<_>>(),
            vec!["1"]
        );
        assert_eq!(overlay.input("zz"), OverlayState::OpenNoResults);
        assert!(overlay.results().is_empty());
        assert_eq!(overlay.input("a"), OverlayState::OpenEmpty);
        assert!(overlay.results().is_empty());
    }

    #[test]
    fn keystroke_while_closed_reopens() {
        let mut overlay = overlay();
        overlay.input("sugar");
        overlay.click_outside();
        assert_eq!(overlay.state(), OverlayState::Closed);
        assert_eq!(overlay.input("sugars"), OverlayState::OpenNoResults);
    }

    #[test]
    fn selecting_a_result_clears_and_closes() {
        let mut overlay = overlay();
        overlay.input("sugar");
        let request = overlay.select("1").expect("navigation request");
        assert_eq!(
            request,
            NavigationRequest {
                candidate_id: "1".to_string(),
                locator: "is-sugar-a-upf".to_string(),
            }
        );
        assert_eq!(overlay.query(), "");
        assert_eq!(overlay.state(), OverlayState::Closed);
    }

    #[test]
    fn selecting_a_non_result_changes_nothing() {
        let mut overlay = overlay();
        overlay.input("sugar");
        assert!(overlay.select("2").is_none());
        assert!(overlay.select("missing").is_none());
        assert_eq!(overlay.query(), "sugar");
        assert_eq!(overlay.state(), OverlayState::OpenResults);
    }

    #[test]
    fn clear_resets_query_and_stays_open() {
        let mut overlay = overlay();
        overlay.input("additives");
        assert_eq!(overlay.clear(), OverlayState::OpenEmpty);
        assert_eq!(overlay.query(), "");
    }

    #[test]
    fn outside_click_keeps_query() {
        let mut overlay = overlay();
        overlay.input("sugar");
        assert_eq!(overlay.click_outside(), OverlayState::Closed);
        assert_eq!(overlay.query(), "sugar");
        assert_eq!(overlay.focus(), OverlayState::OpenResults);
    }

    #[test]
    fn view_highlights_question_and_summary() {
        let mut overlay = overlay();
        overlay.input(" often ");
        let view = overlay.view();
        assert_eq!(view.state, OverlayState::OpenResults);
        assert!(view.shows_dropdown());
        assert_eq!(view.result_label(), "Found 1 result");
        let result = &view.results[0];
        assert!(result.question.iter().all(|s| !s.is_match()));
        let summary = result.summary.as_ref().expect("summary segments");
        assert_eq!(
            summary.iter().filter(|s| s.is_match()).map(|s| s.text).collect::<Vec<_>>(),
            vec!["often"]
        );
    }

    #[test]
    fn view_state_tracks_state_through_events() {
        let mut overlay = overlay();
        assert_eq!(overlay.view().state, overlay.state());
        let steps: [fn(&mut SearchOverlay); 6] = [
            |o| {
                o.focus();
            },
            |o| {
                o.input("sugar");
            },
            |o| {
                o.input("zz");
            },
            |o| {
                o.click_outside();
            },
            |o| {
                o.input("a");
            },
            |o| {
                o.clear();
            },
        ];
        for step in steps {
            step(&mut overlay);
            assert_eq!(overlay.view().state, overlay.state());
        }
    }

    #[test]
    fn empty_view_has_no_dropdown() {
        let mut overlay = overlay();
        overlay.focus();
        let view = overlay.view();
        assert_eq!(view.state, OverlayState::OpenEmpty);
        assert!(!view.shows_dropdown());
    }

    #[test]
    fn tolerates_empty_candidate_list() {
        let mut overlay = SearchOverlay::new(Vec::new(), SearchConfig::default());
        assert_eq!(overlay.input("sugar"), OverlayState::OpenNoResults);
        assert!(overlay.select("1").is_none());
    }
}
