use tracing::warn;
use url::Url;

use crate::model::ImageRef;

pub const DEFAULT_FALLBACK_IMAGE: &str = "/fallback.jpg";

/// Builds resized CDN URLs for Sanity image assets.
///
/// Sanity's image pipeline resizes on the fly from `w`, `h` and `fit` query
/// parameters on the asset URL, so the builder only has to rewrite the query.
#[derive(Debug, Clone)]
pub struct ImageUrlBuilder {
    fallback: String,
}

impl Default for ImageUrlBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_IMAGE)
    }
}

impl ImageUrlBuilder {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            fallback: fallback.into(),
        }
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// URL for `image` at the requested size, or the fallback image when the
    /// reference has no asset URL. Width and height together crop; width alone
    /// scales proportionally.
    pub fn url_for(&self, image: Option<&ImageRef>, width: Option<u32>, height: Option<u32>) -> String {
        match image.and_then(ImageRef::asset_url) {
            Some(raw) => resize(raw, width, height),
            None => self.fallback.clone(),
        }
    }

    /// Cropped URL for `image`, or `None` when there is no asset to point at.
    pub fn cropped(&self, image: Option<&ImageRef>, width: u32, height: u32) -> Option<String> {
        image
            .and_then(ImageRef::asset_url)
            .map(|raw| resize(raw, Some(width), Some(height)))
    }
}

fn resize(raw: &str, width: Option<u32>, height: Option<u32>) -> String {
    let mut url = match Url::parse(raw) {
        Ok(url) => url,
        Err(err) => {
            warn!(%err, url = raw, "image asset URL is not absolute; using it unchanged");
            return raw.to_string();
        }
    };
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !matches!(key.as_ref(), "w" | "h" | "fit"))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    {
        let mut query = url.query_pairs_mut();
        query.clear();
        for (key, value) in &retained {
            query.append_pair(key, value);
        }
        match (width, height) {
            (Some(w), Some(h)) => {
                query
                    .append_pair("w", &w.to_string())
                    .append_pair("h", &h.to_string())
                    .append_pair("fit", "crop");
            }
            (Some(w), None) => {
                query.append_pair("w", &w.to_string());
            }
            _ => {}
        }
    }
    if url.query() == Some("") {
        url.set_query(None);
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ImageAsset;

    const ASSET: &str = "https://cdn.sanity.io/images/shxuue68/production/abc123-2400x1200.jpg";

    fn image(url: &str) -> ImageRef {
        ImageRef {
            asset: Some(ImageAsset {
                id: None,
                url: Some(url.to_string()),
            }),
            alt: None,
            caption: None,
        }
    }

    #[test]
    fn crops_when_both_dimensions_given() {
        let builder = ImageUrlBuilder::default();
        assert_eq!(
            builder.url_for(Some(&image(ASSET)), Some(500), Some(300)),
            format!("{ASSET}?w=500&h=300&fit=crop")
        );
    }

    #[test]
    fn width_only_scales() {
        let builder = ImageUrlBuilder::default();
        assert_eq!(
            builder.url_for(Some(&image(ASSET)), Some(800), None),
            format!("{ASSET}?w=800")
        );
        assert_eq!(builder.url_for(Some(&image(ASSET)), None, None), ASSET);
    }

    #[test]
    fn replaces_existing_sizing_but_keeps_other_params() {
        let builder = ImageUrlBuilder::default();
        let url = format!("{ASSET}?w=10&auto=format");
        assert_eq!(
            builder.url_for(Some(&image(&url)), Some(200), Some(200)),
            format!("{ASSET}?auto=format&w=200&h=200&fit=crop")
        );
    }

    #[test]
    fn missing_asset_uses_fallback() {
        let builder = ImageUrlBuilder::default();
        assert_eq!(builder.url_for(None, Some(10), Some(10)), "/fallback.jpg");
        assert_eq!(
            builder.url_for(Some(&ImageRef::default()), Some(10), Some(10)),
            "/fallback.jpg"
        );
        assert_eq!(builder.cropped(Some(&ImageRef::default()), 10, 10), None);
    }

    #[test]
    fn relative_asset_url_is_returned_unchanged() {
        let builder = ImageUrlBuilder::new("/img/none.png");
        assert_eq!(
            builder.url_for(Some(&image("/static/photo.jpg")), Some(10), Some(10)),
            "/static/photo.jpg"
        );
    }
}
