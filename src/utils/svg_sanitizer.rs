//! Targeted repair of fetched SVG icon content
//!
//! Some icons in the remote repository carry a `crossorigin` attribute that
//! breaks rendering when the icon is embedded. This module strips the bare and
//! empty-valued forms of that attribute from start tags and leaves everything
//! else, text content included, untouched. It is a patch for one known defect,
//! not an SVG validator.

use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::models::LocalIcon;

/// Attribute that breaks rendering in the embedding context
pub const DISALLOWED_ATTRIBUTE: &str = "crossorigin";

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"<[A-Za-z][^<>]*(?:>|$)").expect("tag pattern is valid")
    })
}

fn attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"\s+crossorigin(?P<value>\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))?(?P<end>[\s/>]|$)"#,
        )
        .expect("crossorigin pattern is valid")
    })
}

/// What a quick look at fetched content found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContentInspection {
    /// Bare or empty-valued disallowed attribute present
    pub has_disallowed_attribute: bool,
    /// Body is an HTML page (typically an error page served with 200)
    pub looks_like_html: bool,
    pub has_svg_root: bool,
}

impl ContentInspection {
    pub fn needs_repair(&self) -> bool {
        self.has_disallowed_attribute || self.looks_like_html
    }
}

pub struct ContentSanitizer;

impl ContentSanitizer {
    /// Remove every bare or empty-valued `crossorigin` attribute
    ///
    /// Non-empty values such as `crossorigin="anonymous"` are kept. The
    /// whitespace preceding a removed attribute goes with it.
    ///
    /// ```rust
    /// use token_icon_resolver::utils::svg_sanitizer::ContentSanitizer;
    ///
    /// let repaired = ContentSanitizer::sanitize(r#"<svg crossorigin width="8"/>"#);
    /// assert_eq!(repaired, r#"<svg width="8"/>"#);
    /// ```
    pub fn sanitize(raw: &str) -> String {
        tag_pattern()
            .replace_all(raw, |caps: &Captures| strip_attribute(&caps[0]))
            .into_owned()
    }

    pub fn inspect(raw: &str) -> ContentInspection {
        let lowered = raw.to_ascii_lowercase();
        ContentInspection {
            has_disallowed_attribute: Self::sanitize(raw) != raw,
            looks_like_html: lowered.contains("<!doctype html") || lowered.contains("<html"),
            has_svg_root: lowered.contains("<svg"),
        }
    }

    /// Whether content can be rendered as-is
    pub fn is_renderable(raw: &str) -> bool {
        let inspection = Self::inspect(raw);
        inspection.has_svg_root && !inspection.needs_repair()
    }

    /// Wrap (already repaired) content as a locally-owned icon
    pub fn package(text: String) -> LocalIcon {
        LocalIcon::from_svg(text)
    }
}

/// Remove removable occurrences from a single start tag
fn strip_attribute(tag: &str) -> String {
    let mut current = tag.to_string();
    // A match consumes the separator after it, so adjacent attributes take
    // several passes; every change shrinks the tag
    loop {
        let next = attribute_pattern()
            .replace_all(&current, |caps: &Captures| {
                let removable = caps
                    .name("value")
                    .map(|value| is_blank_value(value.as_str()))
                    .unwrap_or(true);
                if removable {
                    caps.name("end")
                        .map(|end| end.as_str().to_string())
                        .unwrap_or_default()
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

fn is_blank_value(value: &str) -> bool {
    value
        .trim_start()
        .trim_start_matches('=')
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .is_empty()
}
