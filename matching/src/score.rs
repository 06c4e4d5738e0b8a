//! Lost/found similarity scoring.
//!
//! The score is a cheap token-overlap heuristic: textual hits between the two
//! postings plus category and location bonuses, normalized to `0..=10`, with
//! a small random jitter on top. The deterministic part is exposed as
//! [`signal`] and the jitter source is pluggable through [`Jitter`], so the
//! whole thing can be pinned down in tests or replaced behind [`Scorer`].

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Mutex;

use crate::config::MatchingConfig;
use crate::types::Item;

pub const MAX_SCORE: u8 = 10;

/// Estimates whether a lost item and a found item describe the same object.
pub trait Scorer: Send + Sync {
    /// Confidence in `0..=MAX_SCORE`.
    fn score(&self, lost: &Item, found: &Item) -> u8;

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}

/// Source of the bounded noise added to the raw score.
pub trait Jitter: Send + Sync {
    /// A value in `[0, max)`; `0.0` when `max` is zero, negative or not finite.
    fn sample(&self, max: f64) -> f64;
}

/// Always zero. Makes scoring fully deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl Jitter for NoJitter {
    fn sample(&self, _max: f64) -> f64 {
        0.0
    }
}

/// Draws from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJitter;

impl Jitter for RandomJitter {
    fn sample(&self, max: f64) -> f64 {
        if max <= 0.0 || !max.is_finite() {
            return 0.0;
        }
        rand::rng().random_range(0.0..max)
    }
}

/// Reproducible jitter from a seeded generator.
#[derive(Debug)]
pub struct SeededJitter {
    rng: Mutex<StdRng>,
}

impl SeededJitter {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Jitter for SeededJitter {
    fn sample(&self, max: f64) -> f64 {
        if max <= 0.0 || !max.is_finite() {
            return 0.0;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.random_range(0.0..max)
    }
}

/// Lowercased whitespace tokens of title, description and category name.
///
/// Duplicates are kept: a repeated word counts once per occurrence, both as a
/// potential hit and toward the normalizing token count.
pub fn tokenize(item: &Item) -> Vec<String> {
    let text = format!(
        "{} {} {}",
        item.title,
        item.description,
        item.category.as_str()
    )
    .to_lowercase();
    text.split_whitespace().map(str::to_string).collect()
}

/// Deterministic raw score before jitter, rounding and clamping.
pub fn signal(lost: &Item, found: &Item, cfg: &MatchingConfig) -> f64 {
    let lost_tokens = tokenize(lost);
    let found_tokens = tokenize(found);

    let mut hits = lost_tokens
        .iter()
        .filter(|word| word.chars().count() >= cfg.min_token_len)
        .filter(|word| {
            found_tokens
                .iter()
                .any(|other| other.contains(word.as_str()) || word.contains(other.as_str()))
        })
        .count() as f64;

    if lost.category == found.category {
        hits += f64::from(cfg.category_bonus);
    }
    if lost.location == found.location {
        hits += f64::from(cfg.location_bonus);
    }

    let denom = lost_tokens.len().max(found_tokens.len());
    if denom == 0 {
        return 0.0;
    }
    hits / denom as f64 * f64::from(MAX_SCORE)
}

/// The token-overlap heuristic with a pluggable jitter source.
#[derive(Debug)]
pub struct TokenOverlapScorer<J = RandomJitter> {
    cfg: MatchingConfig,
    jitter: J,
}

impl TokenOverlapScorer<RandomJitter> {
    pub fn new(cfg: MatchingConfig) -> Self {
        Self::with_jitter(cfg, RandomJitter)
    }
}

impl<J: Jitter> TokenOverlapScorer<J> {
    pub fn with_jitter(cfg: MatchingConfig, jitter: J) -> Self {
        Self { cfg, jitter }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.cfg
    }

    pub fn signal(&self, lost: &Item, found: &Item) -> f64 {
        signal(lost, found, &self.cfg)
    }
}

impl<J: Jitter> Scorer for TokenOverlapScorer<J> {
    fn score(&self, lost: &Item, found: &Item) -> u8 {
        let raw = self.signal(lost, found) + self.jitter.sample(self.cfg.jitter_max);
        raw.round().clamp(0.0, f64::from(MAX_SCORE)) as u8
    }

    fn name(&self) -> &str {
        "token-overlap"
    }
}
