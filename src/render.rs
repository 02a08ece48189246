//! Rendering of a single SVG document through an [`Engine`].

use crate::viewbox::Dimensions;
use crate::{Engine, Result, Viewport};
use log::debug;
use std::time::Duration;

/// Selector of the element that gets captured
pub const SVG_SELECTOR: &str = "svg";

/// Wrap `markup` in a minimal HTML page that pins the first `<svg>` to
/// exactly `dims` CSS pixels.
pub fn host_document(markup: &str, dims: Dimensions) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<style>
html, body {{
    margin: 0;
    padding: 0;
}}
body {{
    display: flex;
    justify-content: center;
    align-items: center;
}}
svg {{
    display: block;
    width: {w}px;
    height: {h}px;
}}
</style>
</head>
<body>
{markup}
</body>
</html>
"#,
        w = dims.width,
        h = dims.height,
        markup = markup,
    )
}

/// Render `markup` at `dims` and return PNG bytes of
/// `round(width*scale) × round(height*scale)` pixels.
///
/// The viewport is sized to the element so it sits at the origin; the
/// capture itself is scaled in CSS pixels, never through the device pixel
/// ratio.
pub fn render<E: Engine>(
    engine: &mut E,
    markup: &str,
    dims: Dimensions,
    scale: f64,
    wait: Duration,
) -> Result<Vec<u8>> {
    let viewport = Viewport {
        width: dims.width.ceil().max(1.0) as u32,
        height: dims.height.ceil().max(1.0) as u32,
    };
    let (out_w, out_h) = dims.scaled(scale);
    debug!(
        "rendering {}x{} at {}x -> {}x{} px",
        dims.width, dims.height, scale, out_w, out_h
    );

    engine.set_viewport(viewport)?;
    engine.load_html(&host_document(markup, dims))?;
    engine.wait_for_selector(SVG_SELECTOR, wait)?;
    engine.screenshot_element(SVG_SELECTOR, scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_document_pins_svg_size() {
        let html = host_document("<svg viewBox=\"0 0 200 300\"></svg>", Dimensions { width: 200.0, height: 300.0 });
        assert!(html.contains("width: 200px;"), "{}", html);
        assert!(html.contains("height: 300px;"), "{}", html);
        assert!(html.contains("<svg viewBox=\"0 0 200 300\"></svg>"));
        assert!(html.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn host_document_keeps_fractional_sizes() {
        let html = host_document("<svg/>", Dimensions { width: 120.5, height: 80.25 });
        assert!(html.contains("width: 120.5px;"));
        assert!(html.contains("height: 80.25px;"));
    }
}
