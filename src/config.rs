//! Allocator tuning loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! split-factor = 40
//! merge-factor = 1
//! merge-policy = "size-gated"
//! ```
//!
//! Missing keys fall back to [`AllocatorConfig::DEFAULT`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Decides which free neighbors a released block coalesces with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
  /// Merge only with a neighbor whose payload is at least `merge_factor`
  /// times the released block's payload. The left neighbor is tried first
  /// and, when it absorbs the block, the right neighbor is left alone.
  SizeGated,
  /// Merge with every free neighbor regardless of size.
  Always,
}

/// Tunable heuristics of the allocation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AllocatorConfig {
  /// A reused free block is split when its payload is at least this many
  /// times the rounded request.
  pub split_factor: usize,
  /// Size ratio a neighbor must reach under [`MergePolicy::SizeGated`].
  pub merge_factor: usize,
  pub merge_policy: MergePolicy,
}

impl AllocatorConfig {
  pub const DEFAULT: Self = Self {
    split_factor: 40,
    merge_factor: 1,
    merge_policy: MergePolicy::SizeGated,
  };

  /// Loads configuration from a TOML file.
  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.display().to_string(),
      source,
    })?;
    Self::from_toml(&content)
  }

  /// Parses and validates configuration from a TOML string.
  pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
    let config: Self = toml::from_str(toml_str)?;
    config.validate()?;
    Ok(config)
  }

  /// Serialises configuration to TOML.
  pub fn to_toml(&self) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(self)?)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.split_factor == 0 {
      return Err(ConfigError::InvalidSplitFactor(self.split_factor));
    }
    Ok(())
  }

  /// Whether a neighbor of `neighbor_size` may absorb or be absorbed by a
  /// released block of `size`.
  pub fn allows_merge(
    &self,
    neighbor_size: usize,
    size: usize,
  ) -> bool {
    match self.merge_policy {
      MergePolicy::SizeGated => neighbor_size >= size.saturating_mul(self.merge_factor),
      MergePolicy::Always => true,
    }
  }

  /// Whether a free block of `block_size` should be split to serve `request`.
  pub fn allows_split(
    &self,
    block_size: usize,
    request: usize,
  ) -> bool {
    block_size >= request.saturating_mul(self.split_factor)
  }
}

impl Default for AllocatorConfig {
  fn default() -> Self {
    Self::DEFAULT
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = AllocatorConfig::default();
    assert_eq!(config.split_factor, 40);
    assert_eq!(config.merge_factor, 1);
    assert_eq!(config.merge_policy, MergePolicy::SizeGated);
  }

  #[test]
  fn test_from_toml() {
    let toml = r#"
split-factor = 8
merge-factor = 2
merge-policy = "always"
"#;
    let config = AllocatorConfig::from_toml(toml).unwrap();
    assert_eq!(config.split_factor, 8);
    assert_eq!(config.merge_factor, 2);
    assert_eq!(config.merge_policy, MergePolicy::Always);
  }

  #[test]
  fn test_partial_toml_uses_defaults() {
    let config = AllocatorConfig::from_toml("merge-policy = \"always\"").unwrap();
    assert_eq!(config.split_factor, 40);
    assert_eq!(config.merge_factor, 1);
    assert_eq!(config.merge_policy, MergePolicy::Always);
  }

  #[test]
  fn test_toml_roundtrip() {
    let config = AllocatorConfig {
      split_factor: 16,
      ..AllocatorConfig::DEFAULT
    };
    let toml = config.to_toml().unwrap();
    let parsed = AllocatorConfig::from_toml(&toml).unwrap();
    assert_eq!(parsed, config);
  }

  #[test]
  fn test_zero_split_factor_rejected() {
    let result = AllocatorConfig::from_toml("split-factor = 0");
    assert!(matches!(result, Err(ConfigError::InvalidSplitFactor(0))));
  }

  #[test]
  fn test_unknown_policy_rejected() {
    let result = AllocatorConfig::from_toml("merge-policy = \"sometimes\"");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
  }

  #[test]
  fn test_missing_file() {
    let result = AllocatorConfig::from_file(Path::new("/nonexistent/tagheap.toml"));
    assert!(matches!(result, Err(ConfigError::Io { .. })));
  }

  #[test]
  fn test_merge_gate() {
    let gated = AllocatorConfig::DEFAULT;
    assert!(gated.allows_merge(64, 64));
    assert!(gated.allows_merge(128, 64));
    assert!(!gated.allows_merge(32, 64));

    let always = AllocatorConfig {
      merge_policy: MergePolicy::Always,
      ..AllocatorConfig::DEFAULT
    };
    assert!(always.allows_merge(32, 64));
  }

  #[test]
  fn test_split_gate() {
    let config = AllocatorConfig::DEFAULT;
    assert!(config.allows_split(32 * 40, 32));
    assert!(!config.allows_split(32 * 39, 32));
  }
}
