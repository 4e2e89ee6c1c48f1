pub mod icon;

pub use icon::{Candidate, LocalIcon, ResolvedIcon, Symbol, SVG_MEDIA_TYPE};
