use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

pub const SVG_MEDIA_TYPE: &str = "image/svg+xml";

/// A token symbol as typed by the caller, plus its normalized cache key
///
/// The key is trimmed and upper-cased. The trimmed original is kept because
/// candidate generation permutes the caller's casing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    raw: String,
    key: String,
}

impl Symbol {
    /// Returns `None` for empty or whitespace-only input
    pub fn parse(input: &str) -> Option<Self> {
        let raw = input.trim();
        if raw.is_empty() {
            return None;
        }
        Some(Self {
            raw: raw.to_string(),
            key: raw.to_uppercase(),
        })
    }

    /// Trimmed input with its original casing
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Normalized cache key
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// One guessed location of a symbol's icon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Filename stem that produced the URL, or the override symbol
    pub name: String,
    pub url: String,
}

impl Candidate {
    pub fn new<N: Into<String>, U: Into<String>>(name: N, url: U) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Icon content that was fetched, repaired and is now owned locally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalIcon {
    /// Stable reference derived from the content hash, `local:sha256-<hex>`
    pub reference: String,
    pub media_type: String,
    pub content: String,
}

impl LocalIcon {
    pub fn from_svg(content: String) -> Self {
        let digest = Sha256::digest(content.as_bytes());
        Self {
            reference: format!("local:sha256-{}", hex::encode(digest)),
            media_type: SVG_MEDIA_TYPE.to_string(),
            content,
        }
    }

    /// Self-contained `data:` URL for embedding
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.media_type,
            STANDARD.encode(self.content.as_bytes())
        )
    }
}

/// Outcome of resolving a symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedIcon {
    /// A candidate that loaded as-is
    Remote { url: String },
    /// Repaired content re-hosted locally
    Local(LocalIcon),
    /// Nothing usable; render a placeholder
    Unresolved,
}

impl ResolvedIcon {
    pub fn remote<U: Into<String>>(url: U) -> Self {
        Self::Remote { url: url.into() }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved)
    }

    /// Reference handed to the presentation layer, if any
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::Remote { url } => Some(url),
            Self::Local(icon) => Some(&icon.reference),
            Self::Unresolved => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Remote { .. } => "remote",
            Self::Local(_) => "local",
            Self::Unresolved => "unresolved",
        }
    }
}
