//! Lifecycle configuration loaded from environment variables.

use chrono::Duration;
use domain::PaymentPolicy;

/// Payment rules with sensible defaults.
///
/// Reads from environment variables:
/// - `PAYMENT_EXPIRY_SECS`: confirmation window after creation (default: `300`)
/// - `PAYMENT_MAX_ATTEMPTS`: failed confirmations before expiry (default: `3`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleConfig {
    pub payment_expiry_secs: i64,
    pub payment_max_attempts: u32,
}

impl LifecycleConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            payment_expiry_secs: parse_positive("PAYMENT_EXPIRY_SECS")
                .unwrap_or(defaults.payment_expiry_secs),
            payment_max_attempts: parse_positive("PAYMENT_MAX_ATTEMPTS")
                .unwrap_or(defaults.payment_max_attempts),
        }
    }

    pub fn payment_policy(&self) -> PaymentPolicy {
        PaymentPolicy {
            expiry_window: Duration::seconds(self.payment_expiry_secs),
            max_attempts: self.payment_max_attempts,
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            payment_expiry_secs: 300,
            payment_max_attempts: 3,
        }
    }
}

fn parse_positive<T>(name: &str) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .filter(|v| *v > T::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = LifecycleConfig::default();
        assert_eq!(config.payment_expiry_secs, 300);
        assert_eq!(config.payment_max_attempts, 3);
    }

    #[test]
    fn test_policy_matches_domain_default() {
        assert_eq!(
            LifecycleConfig::default().payment_policy(),
            PaymentPolicy::default()
        );
    }
}
