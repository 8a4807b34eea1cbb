//! Rotation Policy Types
//!
//! Knobs for one rotation run: how hard to hit the platform, how many
//! workflows one rotation may touch, and whether to coerce credential data.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::{RotationError, RotationResult};

/// Pause between consecutive workflow updates.
pub const DEFAULT_THROTTLE_DELAY: Duration = Duration::from_millis(100);

/// Upper bound accepted for [`RotationPolicy::throttle_delay`].
pub const MAX_THROTTLE_DELAY: Duration = Duration::from_secs(60);

/// How a rotation is carried out
///
/// # Examples
///
/// ```
/// use rekey_credential::rotation::RotationPolicy;
/// use std::time::Duration;
///
/// let policy = RotationPolicy::default()
///     .with_throttle_delay(Duration::from_millis(250))
///     .with_max_workflows(50);
/// policy.validate().unwrap();
/// ```
///
/// Deserializes from configuration with humantime durations:
///
/// ```json
/// { "throttle_delay": "250ms", "max_workflows_per_rotation": 50 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationPolicy {
    /// Delay before every workflow update except the first.
    #[serde(with = "humantime_serde")]
    pub throttle_delay: Duration,

    /// Abort (and delete the replacement credential) when more workflows
    /// than this reference the credential. `None` means unlimited.
    pub max_workflows_per_rotation: Option<usize>,

    /// Convert string credential data using the credential-type schema.
    pub coerce_data_types: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            throttle_delay: DEFAULT_THROTTLE_DELAY,
            max_workflows_per_rotation: None,
            coerce_data_types: true,
        }
    }
}

impl RotationPolicy {
    /// Default policy without throttling. Intended for tests and local
    /// platforms without rate limits.
    pub fn no_throttle() -> Self {
        Self {
            throttle_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Set the delay between workflow updates.
    #[must_use]
    pub fn with_throttle_delay(mut self, delay: Duration) -> Self {
        self.throttle_delay = delay;
        self
    }

    /// Cap the number of workflows one rotation may update.
    #[must_use]
    pub fn with_max_workflows(mut self, limit: usize) -> Self {
        self.max_workflows_per_rotation = Some(limit);
        self
    }

    /// Enable or disable schema-driven data coercion.
    #[must_use]
    pub fn with_coerce_data_types(mut self, enabled: bool) -> Self {
        self.coerce_data_types = enabled;
        self
    }

    /// Validate the policy
    pub fn validate(&self) -> RotationResult<()> {
        if self.throttle_delay > MAX_THROTTLE_DELAY {
            return Err(RotationError::InvalidPolicy {
                reason: format!(
                    "throttle delay must be at most {}, got {}",
                    humantime_serde::re::humantime::format_duration(MAX_THROTTLE_DELAY),
                    humantime_serde::re::humantime::format_duration(self.throttle_delay),
                ),
            });
        }

        if self.max_workflows_per_rotation == Some(0) {
            return Err(RotationError::InvalidPolicy {
                reason: "max workflows per rotation must be positive".to_string(),
            });
        }

        Ok(())
    }
}
