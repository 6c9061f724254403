//! Configuration.
//!
//! Explicit, serializable configuration objects used by higher-level
//! components (CLI, tests, embedders) to control determinism, normalization,
//! hashing, and limits. The core crate itself does not read environment
//! variables or the system clock. All configuration must be provided
//! explicitly by the caller.

use crate::errors::{CoreError, CoreResult};

/// Global configuration container, threaded explicitly through `extract`.
#[derive(Debug, Clone)]
pub struct Config {
    pub normalization: NormalizationConfig,
    pub hashing: HashingConfig,
    pub limits: LimitsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            normalization: NormalizationConfig::default(),
            hashing: HashingConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

impl Config {
    /// Reject internally-inconsistent configuration before a pipeline run starts.
    pub fn validate(&self) -> CoreResult<()> {
        if self.hashing.domain.is_empty() {
            return Err(CoreError::invalid_argument(
                "hashing domain must not be empty",
            ));
        }
        if self.limits.max_depth == 0 {
            return Err(CoreError::invalid_argument(
                "limits.max_depth must be greater than zero",
            ));
        }
        if self.limits.max_declarations == 0 {
            return Err(CoreError::invalid_argument(
                "limits.max_declarations must be greater than zero",
            ));
        }
        if self.limits.max_tag_payload_bytes == 0 {
            return Err(CoreError::invalid_argument(
                "limits.max_tag_payload_bytes must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Normalization-related configuration consumed by the canonical encoder and
/// the facade's span/path handling.
#[derive(Debug, Clone)]
pub struct NormalizationConfig {
    pub path_root: String,
    pub newline: NewlineMode,
    pub encoding: Encoding,
    pub non_finite_number_policy: NonFiniteNumberPolicy,
    pub bigint_policy: BigIntPolicy,
    pub undefined_policy: UndefinedPolicy,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            path_root: "artifact:/".to_string(),
            newline: NewlineMode::Lf,
            encoding: Encoding::Utf8,
            non_finite_number_policy: NonFiniteNumberPolicy::Reject,
            bigint_policy: BigIntPolicy::DecimalString,
            undefined_policy: UndefinedPolicy::Omit,
        }
    }
}

/// Hashing-related configuration.
#[derive(Debug, Clone)]
pub struct HashingConfig {
    pub algorithm: HashAlgorithm,
    pub domain: String,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::Sha256,
            domain: "adtk.ir.v1".to_string(),
        }
    }
}

/// Resource and complexity limits for a single `extract` run.
#[derive(Debug, Clone)]
pub struct LimitsConfig {
    pub max_declarations: usize,
    pub max_depth: usize,
    pub max_tag_payload_bytes: usize,
    pub timeout_hint_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_declarations: 100_000,
            max_depth: 128,
            max_tag_payload_bytes: 8 * 1024,
            timeout_hint_ms: 60_000,
        }
    }
}

/// Supported newline normalization modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewlineMode {
    Lf,
}

impl NewlineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lf => "lf",
        }
    }
}

/// Supported text encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
        }
    }
}

/// Canonical encoder policy for non-finite numbers (`NaN`, `Infinity`, `-Infinity`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonFiniteNumberPolicy {
    Reject,
    AsString,
    AsNull,
}

/// Canonical encoder policy for arbitrary-precision integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BigIntPolicy {
    Reject,
    DecimalString,
    SafeIntegerOrReject,
}

/// Canonical encoder policy for `undefined` values in object fields.
/// Array positions always emit `null` regardless of this policy, to preserve indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndefinedPolicy {
    Omit,
    AsNull,
    Reject,
}

/// Supported hash algorithms. Only sha256 is implemented today; the variant
/// exists so a future algorithm can be threaded through without breaking the
/// `HashingConfig` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn empty_domain_rejected() {
        let mut cfg = Config::default();
        cfg.hashing.domain = String::new();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_max_depth_rejected() {
        let mut cfg = Config::default();
        cfg.limits.max_depth = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_max_declarations_rejected() {
        let mut cfg = Config::default();
        cfg.limits.max_declarations = 0;
        assert!(cfg.validate().is_err());
    }
}
