//! Turns a resolution outcome into something a view can display
//!
//! Remote icons are linked, local icons are embedded as `data:` URLs, and
//! unresolved symbols get a generated glyph.

use serde::Serialize;

use crate::models::ResolvedIcon;

const PLACEHOLDER_GLYPH_CHARS: usize = 3;

/// What the view should show
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RenderedIcon {
    /// Image source URL (remote or `data:`)
    Url(String),
    /// Inline SVG markup
    Inline(String),
}

/// Deterministic placeholder glyph showing the first characters of `symbol`
pub fn placeholder_svg(symbol: &str) -> String {
    let trimmed = symbol.trim();
    let label: String = if trimmed.is_empty() {
        "?".to_string()
    } else {
        trimmed
            .chars()
            .take(PLACEHOLDER_GLYPH_CHARS)
            .collect::<String>()
            .to_uppercase()
    };

    format!(
        "<svg xmlns='http://www.w3.org/2000/svg' viewBox='0 0 28 28'>\
<rect width='100%' height='100%' rx='6' fill='#222'/>\
<text x='50%' y='50%' fill='#fff' font-size='10' text-anchor='middle' dominant-baseline='central'>{}</text>\
</svg>",
        quick_xml::escape::escape(&label)
    )
}

pub fn render(symbol: &str, icon: &ResolvedIcon) -> RenderedIcon {
    match icon {
        ResolvedIcon::Remote { url } => RenderedIcon::Url(url.clone()),
        ResolvedIcon::Local(local) => RenderedIcon::Url(local.to_data_url()),
        ResolvedIcon::Unresolved => RenderedIcon::Inline(placeholder_svg(symbol)),
    }
}
