//! Alert thresholds.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PD_ALERT_DAYS: u32 = 60;
pub const DEFAULT_DELIVERY_EXPECTED_DAYS: u32 = 283;
pub const DEFAULT_PD_OVERDUE_DAYS: u32 = 60;

/// Day-count thresholds used by every date computation.
///
/// Passed explicitly into each call; nothing in the engine reads it from
/// global state. Missing fields deserialize to the defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AlertConfig {
    /// Days after AI at which PD becomes due
    pub pd_alert_days: u32,
    /// Gestation length used when no expected delivery date is recorded
    pub delivery_expected_days: u32,
    /// PD is overdue once more than this many days have passed since AI
    pub pd_overdue_days: u32,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            pd_alert_days: DEFAULT_PD_ALERT_DAYS,
            delivery_expected_days: DEFAULT_DELIVERY_EXPECTED_DAYS,
            pd_overdue_days: DEFAULT_PD_OVERDUE_DAYS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AlertConfig::default();
        assert_eq!(cfg.pd_alert_days, 60);
        assert_eq!(cfg.delivery_expected_days, 283);
        assert_eq!(cfg.pd_overdue_days, 60);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: AlertConfig = serde_json::from_str(r#"{"pd_alert_days": 45}"#).unwrap();
        assert_eq!(cfg.pd_alert_days, 45);
        assert_eq!(cfg.delivery_expected_days, 283);
        assert_eq!(cfg.pd_overdue_days, 60);
    }
}
