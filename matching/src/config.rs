use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;

use crate::score::MAX_SCORE;

pub const DEFAULT_THRESHOLD: u8 = 6;
pub const DEFAULT_CATEGORY_BONUS: u32 = 3;
pub const DEFAULT_LOCATION_BONUS: u32 = 2;
pub const DEFAULT_MIN_TOKEN_LEN: usize = 4;
pub const DEFAULT_JITTER_MAX: f64 = 2.0;

/// Tuning knobs for scoring and pairing.
///
/// Every field has a default so a TOML file only needs to name the values
/// it changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum score (inclusive) for a pair to become a match.
    pub threshold: u8,
    /// Hits added when both items share a category.
    pub category_bonus: u32,
    /// Hits added when both items share a location.
    pub location_bonus: u32,
    /// Lost-side tokens shorter than this never count as textual hits.
    pub min_token_len: usize,
    /// Upper bound (exclusive) of the random jitter added to the raw score.
    pub jitter_max: f64,
    /// Skip pairs where the lost and found items were posted by the same user.
    pub exclude_self_matches: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            category_bonus: DEFAULT_CATEGORY_BONUS,
            location_bonus: DEFAULT_LOCATION_BONUS,
            min_token_len: DEFAULT_MIN_TOKEN_LEN,
            jitter_max: DEFAULT_JITTER_MAX,
            exclude_self_matches: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid matching config: {0}")]
    Invalid(String),
}

impl MatchingConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&data)
    }

    /// Apply `LOSTFOUND_*` environment overrides on top of `self`.
    ///
    /// Recognized variables:
    /// - `LOSTFOUND_MATCH_THRESHOLD`
    /// - `LOSTFOUND_CATEGORY_BONUS`
    /// - `LOSTFOUND_LOCATION_BONUS`
    /// - `LOSTFOUND_MIN_TOKEN_LEN`
    /// - `LOSTFOUND_JITTER_MAX`
    /// - `LOSTFOUND_ALLOW_SELF_MATCHES` (`1`/`true` disables self-match exclusion)
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        fn parse<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
            raw.trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("{key}={raw} is not a valid value")))
        }

        if let Some(v) = lookup("LOSTFOUND_MATCH_THRESHOLD") {
            self.threshold = parse("LOSTFOUND_MATCH_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("LOSTFOUND_CATEGORY_BONUS") {
            self.category_bonus = parse("LOSTFOUND_CATEGORY_BONUS", &v)?;
        }
        if let Some(v) = lookup("LOSTFOUND_LOCATION_BONUS") {
            self.location_bonus = parse("LOSTFOUND_LOCATION_BONUS", &v)?;
        }
        if let Some(v) = lookup("LOSTFOUND_MIN_TOKEN_LEN") {
            self.min_token_len = parse("LOSTFOUND_MIN_TOKEN_LEN", &v)?;
        }
        if let Some(v) = lookup("LOSTFOUND_JITTER_MAX") {
            self.jitter_max = parse("LOSTFOUND_JITTER_MAX", &v)?;
        }
        if let Some(v) = lookup("LOSTFOUND_ALLOW_SELF_MATCHES") {
            self.exclude_self_matches = !matches!(v.trim(), "1" | "true" | "TRUE" | "yes");
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threshold > MAX_SCORE {
            return Err(ConfigError::Invalid(format!(
                "threshold must be <= {MAX_SCORE}"
            )));
        }
        if self.min_token_len == 0 {
            return Err(ConfigError::Invalid(
                "min_token_len must be greater than zero".into(),
            ));
        }
        if !self.jitter_max.is_finite() || self.jitter_max < 0.0 {
            return Err(ConfigError::Invalid(
                "jitter_max must be a finite value >= 0.0".into(),
            ));
        }
        Ok(())
    }
}
