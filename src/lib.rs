//! Content, search and page rendering for the UPF FAQs site.
//!
//! The search box is modelled by [`overlay::SearchOverlay`] on top of the
//! pure [`search::match_candidates`] and [`search::highlight`] functions.
//! Everything else feeds or renders it: the content model, a Sanity client
//! with an offline snapshot alternative, JSON-LD builders and the optional
//! axum front end.

pub mod content;
pub mod image;
pub mod links;
pub mod model;
pub mod overlay;
pub mod portable_text;
pub mod sanity;
pub mod schema;
pub mod search;

#[cfg(feature = "web")]
pub mod web;

pub use content::{ContentError, ContentSnapshot, ContentSource};
pub use image::ImageUrlBuilder;
pub use model::{Author, Candidate, Faq, SearchFaq, SiteSettings};
pub use overlay::{NavigationRequest, OverlayState, OverlayView, SearchOverlay};
pub use sanity::{SanityClient, SanityConfig};
pub use search::{SearchConfig, Segment, SegmentKind, highlight, match_candidates};
