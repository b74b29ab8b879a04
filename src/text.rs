//! Axis text rasterization.
//!
//! Labels and tick numerals are laid out as a tiny SVG document and rendered
//! through `resvg`, which handles font lookup and shaping. The result is a
//! premultiplied overlay pixmap that the chart renderer composites onto each
//! frame; the overlay is static per chart, so it is built once.

use std::sync::Arc;

use tiny_skia::{Pixmap, Transform};

use crate::error::{ChartError, ChartResult};

/// Horizontal anchoring of a text span at its `(x, y)` position.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Anchor {
    Start,
    Middle,
}

/// One piece of text on the overlay, in pixel coordinates. `y` is the
/// baseline; rotation is about the anchor point.
#[derive(Clone, Debug)]
pub(crate) struct TextSpan {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size_px: f32,
    pub rgba: [u8; 4],
    pub rotate_deg: f32,
    pub anchor: Anchor,
}

/// Rasterize the given spans onto a transparent `width` x `height` pixmap.
/// Returns `None` when there is nothing to draw.
pub(crate) fn rasterize_spans(
    width: u32,
    height: u32,
    spans: &[TextSpan],
) -> ChartResult<Option<Pixmap>> {
    if spans.is_empty() {
        return Ok(None);
    }

    let svg = build_svg(width, height, spans);
    let opts = usvg::Options {
        fontdb: label_fontdb(),
        ..usvg::Options::default()
    };
    let tree = usvg::Tree::from_str(&svg, &opts)
        .map_err(|e| ChartError::validation(format!("axis text svg failed to parse: {e}")))?;

    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| ChartError::validation("failed to allocate axis text pixmap"))?;
    resvg::render(&tree, Transform::identity(), &mut pixmap.as_mut());
    Ok(Some(pixmap))
}

fn build_svg(width: u32, height: u32, spans: &[TextSpan]) -> String {
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
    for s in spans {
        let [r, g, b, a] = s.rgba;
        let anchor = match s.anchor {
            Anchor::Start => "start",
            Anchor::Middle => "middle",
        };
        svg.push_str(&format!(
            r##"<text x="{x}" y="{y}" font-family="sans-serif" font-size="{size}" fill="#{r:02x}{g:02x}{b:02x}" fill-opacity="{opacity}" text-anchor="{anchor}" transform="rotate({rot} {x} {y})">{text}</text>"##,
            x = s.x,
            y = s.y,
            size = s.size_px,
            opacity = f32::from(a) / 255.0,
            rot = s.rotate_deg,
            text = escape_xml(&s.text),
        ));
    }
    svg.push_str("</svg>");
    svg
}

pub(crate) fn label_fontdb() -> Arc<usvg::fontdb::Database> {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    Arc::new(db)
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
