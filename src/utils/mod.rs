pub mod http_client;
pub mod svg_sanitizer;

pub use http_client::{HttpIconFetcher, IconFetcher};
pub use svg_sanitizer::{ContentInspection, ContentSanitizer};
