//! Candidate URL generation for icon lookups
//!
//! The remote repository does not publish an index and its filenames use
//! inconsistent casing, so candidates are guesses. Generation is a swappable
//! strategy; `CasePermutationStrategy` is the default.

use std::collections::{BTreeMap, HashSet};
use tracing::trace;

use crate::config::Config;
use crate::models::{Candidate, Symbol};

/// Turns a symbol into an ordered, finite list of candidate URLs
///
/// Implementations must be deterministic: the same symbol always yields the
/// same candidates in the same order.
pub trait CandidateStrategy: Send + Sync {
    fn generate(&self, symbol: &Symbol) -> Vec<Candidate>;
}

/// Case-permutation guesser with a manual override table
#[derive(Debug, Clone)]
pub struct CasePermutationStrategy {
    base_url: String,
    extension: String,
    max_split_depth: usize,
    extra_form_depth: usize,
    overrides: BTreeMap<String, String>,
}

impl CasePermutationStrategy {
    pub fn new<B: Into<String>, E: Into<String>>(base_url: B, extension: E) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            extension: extension.into(),
            max_split_depth: crate::config::defaults::DEFAULT_MAX_SPLIT_DEPTH,
            extra_form_depth: crate::config::defaults::DEFAULT_EXTRA_FORM_DEPTH,
            overrides: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.source.base_url, &config.source.extension)
            .with_split_depths(config.source.max_split_depth, config.source.extra_form_depth)
            .with_overrides(config.overrides.clone())
    }

    pub fn with_split_depths(mut self, max_split_depth: usize, extra_form_depth: usize) -> Self {
        self.max_split_depth = max_split_depth;
        self.extra_form_depth = extra_form_depth;
        self
    }

    /// Keys are matched against the upper-cased symbol
    pub fn with_overrides(mut self, overrides: BTreeMap<String, String>) -> Self {
        self.overrides = overrides
            .into_iter()
            .map(|(symbol, url)| (symbol.to_uppercase(), url))
            .collect();
        self
    }

    pub fn with_override<S: AsRef<str>, U: Into<String>>(mut self, symbol: S, url: U) -> Self {
        self.overrides
            .insert(symbol.as_ref().to_uppercase(), url.into());
        self
    }

    /// Distinct filename stems for `raw`, in generation order
    pub fn filename_variants(&self, raw: &str) -> Vec<String> {
        let chars: Vec<char> = raw.chars().collect();
        let split = |n: usize| -> (String, String) {
            (chars[..n].iter().collect(), chars[n..].iter().collect())
        };

        let mut names = Vec::new();
        names.push(raw.to_string());
        names.push(raw.to_lowercase());
        names.push(raw.to_uppercase());

        let last_split = chars.len().saturating_sub(1);
        for n in 1..=self.max_split_depth.min(last_split) {
            let (prefix, suffix) = split(n);
            names.push(format!("{}{}", prefix.to_lowercase(), suffix));
            names.push(format!("{}{}", prefix.to_lowercase(), suffix.to_uppercase()));
            names.push(format!("{}{}", prefix.to_uppercase(), suffix.to_lowercase()));
            names.push(format!("{}{}", prefix.to_uppercase(), suffix));
        }

        for n in 1..=self.extra_form_depth.min(last_split) {
            let (prefix, suffix) = split(n);
            names.push(format!("{}{}", prefix.to_lowercase(), suffix.to_uppercase()));
        }

        let mut seen = HashSet::new();
        names.retain(|name| seen.insert(name.clone()));
        names
    }

    fn candidate_url(&self, name: &str) -> String {
        format!(
            "{}/{}.{}",
            self.base_url,
            urlencoding::encode(name),
            self.extension
        )
    }
}

impl CandidateStrategy for CasePermutationStrategy {
    fn generate(&self, symbol: &Symbol) -> Vec<Candidate> {
        if let Some(url) = self.overrides.get(symbol.key()) {
            trace!("Override hit for {}: {}", symbol, url);
            return vec![Candidate::new(symbol.key(), url.clone())];
        }

        let candidates: Vec<Candidate> = self
            .filename_variants(symbol.raw())
            .into_iter()
            .map(|name| {
                let url = self.candidate_url(&name);
                Candidate::new(name, url)
            })
            .collect();

        trace!("Generated {} candidates for {}", candidates.len(), symbol);
        candidates
    }
}

/// Candidates for raw input; empty input yields no candidates
pub fn generate_candidates(strategy: &dyn CandidateStrategy, input: &str) -> Vec<Candidate> {
    match Symbol::parse(input) {
        Some(symbol) => strategy.generate(&symbol),
        None => Vec::new(),
    }
}
