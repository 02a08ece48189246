//! Intrinsic size lookup from an SVG document's `viewBox`.
//!
//! Only the view-box is consulted. Documents without a usable one fall back
//! to a fixed 750×1000 box regardless of their real aspect ratio.

use log::debug;
use scraper::{Html, Selector};

/// Fallback width used when no usable `viewBox` is declared
pub const DEFAULT_WIDTH: f64 = 750.0;
/// Fallback height used when no usable `viewBox` is declared
pub const DEFAULT_HEIGHT: f64 = 1000.0;

/// Logical size of a document in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

impl Dimensions {
    /// Pixel size of the raster produced at `scale`
    pub fn scaled(&self, scale: f64) -> (u32, u32) {
        (
            (self.width * scale).round() as u32,
            (self.height * scale).round() as u32,
        )
    }
}

/// Infer the logical size of `markup` from the first `<svg>` element's
/// `viewBox`, falling back to [`Dimensions::default`].
pub fn infer_dimensions(markup: &str) -> Dimensions {
    match find_view_box(markup).as_deref().and_then(parse_view_box) {
        Some(dims) => dims,
        None => {
            debug!(
                "no usable viewBox, using fallback {}x{}",
                DEFAULT_WIDTH, DEFAULT_HEIGHT
            );
            Dimensions::default()
        }
    }
}

fn find_view_box(markup: &str) -> Option<String> {
    let document = Html::parse_document(markup);
    let selector = Selector::parse("svg").ok()?;
    let svg = document.select(&selector).next()?;
    svg.value().attr("viewBox").map(str::to_string)
}

/// Parse `min-x min-y width height`; separators are whitespace and/or commas.
fn parse_view_box(value: &str) -> Option<Dimensions> {
    let fields = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect::<Option<Vec<_>>>()?;

    match fields.as_slice() {
        [_, _, width, height] if *width > 0.0 && *height > 0.0 => Some(Dimensions {
            width: *width,
            height: *height,
        }),
        _ => None,
    }
}
