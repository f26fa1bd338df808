use std::{path::PathBuf, str::FromStr, time::Duration};

use crate::error::{Error, Result};

/// A pixel is "dark" when every channel is strictly below this value.
pub const DARK_CHANNEL_THRESHOLD: u8 = 90;

/// Images whose dark-pixel fraction exceeds this are inverted before OCR.
pub const DARK_FRACTION_CUTOFF: f32 = 0.7;

/// Largest item accepted by ingest, in bytes.
pub const MAX_ITEM_BYTES: usize = 8_388_119;

/// Search results scoring below this are dropped.
pub const DEFAULT_MIN_SCORE: f32 = 0.5;

/// Maximum number of distinct matches returned by a search.
pub const DEFAULT_RESULT_LIMIT: usize = 10;

pub const DEFAULT_OCR_LANGUAGE: &str = "eng";

/// Scheduling hint passed to `nice -n` when running the OCR engine.
pub const DEFAULT_OCR_NICE: i32 = -3;

pub const DEFAULT_OCR_TIMEOUT: Duration = Duration::from_secs(60);

pub const DEFAULT_TESSERACT_BIN: &str = "tesseract";

/// Unsharp mask radius and threshold.
pub const SHARPEN_SIGMA: f32 = 2.0;
pub const SHARPEN_THRESHOLD: i32 = 3;

/// Which string similarity function ranks search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScorerKind {
    #[default]
    TokenSort,
    Partial,
}

impl FromStr for ScorerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "token-sort" | "token_sort" => Ok(Self::TokenSort),
            "partial" => Ok(Self::Partial),
            other => Err(Error::Config(format!("unknown scorer: {other}"))),
        }
    }
}

impl std::fmt::Display for ScorerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TokenSort => write!(f, "token-sort"),
            Self::Partial => write!(f, "partial"),
        }
    }
}

/// Tunables for the archive. Defaults are the empirically chosen values.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub dark_threshold: u8,
    pub dark_fraction: f32,
    pub max_item_bytes: usize,
    pub min_score: f32,
    pub result_limit: usize,
    pub sharpen_sigma: f32,
    pub sharpen_threshold: i32,
    pub ocr_language: String,
    pub ocr_nice: i32,
    pub ocr_timeout: Duration,
    pub tesseract_bin: PathBuf,
    pub scorer: ScorerKind,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            dark_threshold: DARK_CHANNEL_THRESHOLD,
            dark_fraction: DARK_FRACTION_CUTOFF,
            max_item_bytes: MAX_ITEM_BYTES,
            min_score: DEFAULT_MIN_SCORE,
            result_limit: DEFAULT_RESULT_LIMIT,
            sharpen_sigma: SHARPEN_SIGMA,
            sharpen_threshold: SHARPEN_THRESHOLD,
            ocr_language: DEFAULT_OCR_LANGUAGE.to_string(),
            ocr_nice: DEFAULT_OCR_NICE,
            ocr_timeout: DEFAULT_OCR_TIMEOUT,
            tesseract_bin: PathBuf::from(DEFAULT_TESSERACT_BIN),
            scorer: ScorerKind::default(),
        }
    }
}

impl ArchiveConfig {
    /// Build a config from the defaults, then apply `QUOTEVAULT_*`
    /// environment overrides.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("QUOTEVAULT_MAX_BYTES") {
            config.max_item_bytes = parse_var("QUOTEVAULT_MAX_BYTES", &v)?;
        }
        if let Some(v) = lookup("QUOTEVAULT_OCR_TIMEOUT_SECS") {
            let secs: u64 = parse_var("QUOTEVAULT_OCR_TIMEOUT_SECS", &v)?;
            config.ocr_timeout = Duration::from_secs(secs);
        }
        if let Some(v) = lookup("QUOTEVAULT_OCR_NICE") {
            config.ocr_nice = parse_var("QUOTEVAULT_OCR_NICE", &v)?;
        }
        if let Some(v) = lookup("QUOTEVAULT_OCR_LANG") {
            config.ocr_language = v;
        }
        if let Some(v) = lookup("QUOTEVAULT_TESSERACT") {
            config.tesseract_bin = PathBuf::from(v);
        }
        if let Some(v) = lookup("QUOTEVAULT_SCORER") {
            config.scorer = v.parse()?;
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        Error::Config(format!("invalid value for {key}: {value:?}"))
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_constants() {
        let config = ArchiveConfig::default();
        assert_eq!(config.dark_threshold, 90);
        assert_eq!(config.dark_fraction, 0.7);
        assert_eq!(config.max_item_bytes, 8_388_119);
        assert_eq!(config.min_score, 0.5);
        assert_eq!(config.result_limit, 10);
        assert_eq!(config.ocr_language, "eng");
        assert_eq!(config.ocr_nice, -3);
        assert_eq!(config.scorer, ScorerKind::TokenSort);
    }

    #[test]
    fn env_overrides_apply() {
        let config = ArchiveConfig::from_lookup(lookup_from(&[
            ("QUOTEVAULT_MAX_BYTES", "1024"),
            ("QUOTEVAULT_OCR_TIMEOUT_SECS", "5"),
            ("QUOTEVAULT_OCR_NICE", "0"),
            ("QUOTEVAULT_OCR_LANG", "deu"),
            ("QUOTEVAULT_TESSERACT", "/opt/bin/tesseract"),
            ("QUOTEVAULT_SCORER", "partial"),
        ]))
        .unwrap();

        assert_eq!(config.max_item_bytes, 1024);
        assert_eq!(config.ocr_timeout, Duration::from_secs(5));
        assert_eq!(config.ocr_nice, 0);
        assert_eq!(config.ocr_language, "deu");
        assert_eq!(config.tesseract_bin, PathBuf::from("/opt/bin/tesseract"));
        assert_eq!(config.scorer, ScorerKind::Partial);
    }

    #[test]
    fn malformed_override_is_config_error() {
        let err = ArchiveConfig::from_lookup(lookup_from(&[(
            "QUOTEVAULT_MAX_BYTES",
            "lots",
        )]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn scorer_names() {
        assert_eq!(
            "token-sort".parse::<ScorerKind>().unwrap(),
            ScorerKind::TokenSort
        );
        assert_eq!("PARTIAL".parse::<ScorerKind>().unwrap(), ScorerKind::Partial);
        assert!("wratio".parse::<ScorerKind>().is_err());
        assert_eq!(ScorerKind::Partial.to_string(), "partial");
    }
}
