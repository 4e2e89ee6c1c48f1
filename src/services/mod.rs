pub mod candidates;
pub mod icon_resolver;
pub mod resolution_cache;

pub use candidates::{CandidateStrategy, CasePermutationStrategy, generate_candidates};
pub use icon_resolver::{IconResolver, ResolutionReport, ResolutionSource, ResolutionState};
pub use resolution_cache::{CacheStats, InMemoryResolutionCache, ResolutionCache};
