//! Resolver configuration.
//!
//! Environment variables read by [`ResolverConfig::from_env`]:
//! - `RKVOL_TIE_BREAK`: `name` picks the lexicographically smallest matching
//!   provider, `scan` keeps the first one in cluster listing order.
//!   Defaults to `name`.
//! - `RKVOL_FALLBACK_TYPE`: volume type suggested when nothing matches.
//!   Defaults to `share-file`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VolumeError;
use crate::types::SHARE_FILE_VOLUME_TYPE;

/// How to choose among several providers that satisfy a request.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// First match in the order the cluster listed its storage classes.
    ScanOrder,
    /// Lexicographically smallest storage class name.
    #[default]
    ProviderName,
}

impl FromStr for TieBreak {
    type Err = VolumeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scan" | "scan_order" => Ok(TieBreak::ScanOrder),
            "name" | "provider_name" => Ok(TieBreak::ProviderName),
            other => Err(VolumeError::InvalidInput(format!(
                "unknown tie-break policy {other:?}"
            ))),
        }
    }
}

/// Configuration handed to [`crate::resolver::ProviderResolver`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Volume type suggested when no provider satisfies a request.
    pub fallback_volume_type: String,
    pub tie_break: TieBreak,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fallback_volume_type: SHARE_FILE_VOLUME_TYPE.to_owned(),
            tie_break: TieBreak::default(),
        }
    }
}

impl ResolverConfig {
    /// Read overrides from the process environment.
    ///
    /// Unset variables keep their defaults; a malformed tie-break value is an
    /// error rather than silently ignored.
    pub fn from_env() -> Result<Self, VolumeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, VolumeError> {
        let mut config = Self::default();
        if let Some(tie_break) = lookup("RKVOL_TIE_BREAK") {
            config.tie_break = tie_break.parse()?;
        }
        if let Some(fallback) = lookup("RKVOL_FALLBACK_TYPE")
            && !fallback.trim().is_empty()
        {
            config.fallback_volume_type = fallback.trim().to_owned();
        }
        Ok(config)
    }
}
