//! Alert threshold settings.

use rusqlite::params;

use super::{Database, DbResult};
use crate::models::AlertConfig;

const PD_ALERT_DAYS: &str = "pd_alert_days";
const DELIVERY_EXPECTED_DAYS: &str = "delivery_expected_days";
const PD_OVERDUE_DAYS: &str = "pd_overdue_days";

impl Database {
    /// Read alert thresholds. Missing or unparsable keys fall back to defaults.
    pub fn get_alert_config(&self) -> DbResult<AlertConfig> {
        let mut config = AlertConfig::default();

        let mut stmt = self.conn.prepare("SELECT key, value FROM app_settings")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            let slot = match key.as_str() {
                PD_ALERT_DAYS => &mut config.pd_alert_days,
                DELIVERY_EXPECTED_DAYS => &mut config.delivery_expected_days,
                PD_OVERDUE_DAYS => &mut config.pd_overdue_days,
                _ => continue,
            };
            match value.trim().parse::<u32>() {
                Ok(days) => *slot = days,
                Err(_) => tracing::warn!(%key, %value, "ignoring unparsable alert setting"),
            }
        }

        Ok(config)
    }

    /// Persist alert thresholds.
    pub fn set_alert_config(&self, config: &AlertConfig) -> DbResult<()> {
        for (key, value) in [
            (PD_ALERT_DAYS, config.pd_alert_days),
            (DELIVERY_EXPECTED_DAYS, config.delivery_expected_days),
            (PD_OVERDUE_DAYS, config.pd_overdue_days),
        ] {
            self.conn.execute(
                r#"
                INSERT INTO app_settings (key, value, updated_at)
                VALUES (?1, ?2, datetime('now'))
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at
                "#,
                params![key, value.to_string()],
            )?;
        }
        tracing::info!(?config, "saved alert config");
        Ok(())
    }
}
